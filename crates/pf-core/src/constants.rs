//! Physical constants passed explicitly into physics functions.

/// Immutable table of physical constants, handed by reference to every
/// model that needs one.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constants {
    /// Standard gravity (m/s²)
    pub g0: f64,
    /// Specific gas constant of dry air (J/kg/K)
    pub r_air: f64,
    /// Ratio of specific heats for air
    pub gamma_air: f64,
    /// Sea-level standard temperature (K)
    pub t_sl: f64,
    /// Sea-level standard pressure (Pa)
    pub p_sl: f64,
    /// Tropospheric lapse rate (K/m)
    pub lapse_rate: f64,
    /// Tropopause altitude (m)
    pub tropopause_altitude: f64,
    /// Sutherland reference viscosity (Pa·s)
    pub mu_ref: f64,
    /// Sutherland reference temperature (K)
    pub t_mu_ref: f64,
    /// Sutherland constant (K)
    pub sutherland: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            g0: 9.806_65,
            r_air: 287.052_87,
            gamma_air: 1.4,
            t_sl: 288.15,
            p_sl: 101_325.0,
            lapse_rate: 0.0065,
            tropopause_altitude: 11_000.0,
            mu_ref: 1.716e-5,
            t_mu_ref: 273.15,
            sutherland: 110.4,
        }
    }
}

impl Constants {
    /// Specific heat of air at constant pressure (J/kg/K).
    pub fn cp_air(&self) -> f64 {
        self.gamma_air * self.r_air / (self.gamma_air - 1.0)
    }

    /// Sea-level standard density (kg/m³).
    pub fn rho_sl(&self) -> f64 {
        self.p_sl / (self.r_air * self.t_sl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_density() {
        let c = Constants::default();
        assert!((c.rho_sl() - 1.225).abs() < 1e-3);
        assert!((c.cp_air() - 1004.7).abs() < 1.0);
    }
}
