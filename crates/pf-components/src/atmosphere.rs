//! International Standard Atmosphere and freestream conditions.

use pf_core::Constants;

/// Freestream state at one time point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreestreamPoint {
    pub altitude: f64,
    pub velocity: f64,
    pub density: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub speed_of_sound: f64,
    pub dynamic_viscosity: f64,
}

impl FreestreamPoint {
    pub fn mach(&self) -> f64 {
        if self.speed_of_sound > 0.0 {
            self.velocity / self.speed_of_sound
        } else {
            0.0
        }
    }

    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density * self.velocity * self.velocity
    }
}

/// ISA 1976 model up to 20 km with an optional temperature offset.
#[derive(Clone, Copy, Debug)]
pub struct Atmosphere {
    pub constants: Constants,
    /// Temperature deviation from standard (K)
    pub delta_isa: f64,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            constants: Constants::default(),
            delta_isa: 0.0,
        }
    }
}

impl Atmosphere {
    pub fn new(constants: Constants, delta_isa: f64) -> Self {
        Self {
            constants,
            delta_isa,
        }
    }

    /// Freestream state at `altitude` (m) and `velocity` (m/s).
    ///
    /// Altitudes below sea level are clamped to zero, above 20 km to 20 km.
    pub fn freestream(&self, altitude: f64, velocity: f64) -> FreestreamPoint {
        let c = &self.constants;
        let h = altitude.clamp(0.0, 20_000.0);
        let g_over_r = c.g0 / c.r_air;

        let (t_std, p) = if h <= c.tropopause_altitude {
            let t = c.t_sl - c.lapse_rate * h;
            let p = c.p_sl * (t / c.t_sl).powf(g_over_r / c.lapse_rate);
            (t, p)
        } else {
            let t11 = c.t_sl - c.lapse_rate * c.tropopause_altitude;
            let p11 = c.p_sl * (t11 / c.t_sl).powf(g_over_r / c.lapse_rate);
            let p = p11 * (-(h - c.tropopause_altitude) * g_over_r / t11).exp();
            (t11, p)
        };

        let t = t_std + self.delta_isa;
        let density = p / (c.r_air * t);
        let speed_of_sound = (c.gamma_air * c.r_air * t).sqrt();
        let dynamic_viscosity =
            c.mu_ref * (t / c.t_mu_ref).powf(1.5) * (c.t_mu_ref + c.sutherland) / (t + c.sutherland);

        FreestreamPoint {
            altitude,
            velocity,
            density,
            pressure: p,
            temperature: t,
            speed_of_sound,
            dynamic_viscosity,
        }
    }

    /// Density ratio to sea-level standard.
    pub fn density_ratio(&self, point: &FreestreamPoint) -> f64 {
        point.density / self.constants.rho_sl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_standard() {
        let atm = Atmosphere::default();
        let fs = atm.freestream(0.0, 0.0);
        assert_relative_eq!(fs.temperature, 288.15);
        assert_relative_eq!(fs.pressure, 101_325.0);
        assert_relative_eq!(fs.density, 1.225, epsilon = 1e-3);
        assert_relative_eq!(fs.speed_of_sound, 340.29, epsilon = 0.05);
        assert_relative_eq!(fs.dynamic_viscosity, 1.789e-5, epsilon = 1e-7);
    }

    #[test]
    fn tropopause_and_above() {
        let atm = Atmosphere::default();
        let fs11 = atm.freestream(11_000.0, 0.0);
        assert_relative_eq!(fs11.temperature, 216.65, epsilon = 1e-9);
        assert_relative_eq!(fs11.pressure, 22_632.0, epsilon = 10.0);

        let fs15 = atm.freestream(15_000.0, 0.0);
        assert_relative_eq!(fs15.temperature, 216.65, epsilon = 1e-9);
        assert!(fs15.pressure < fs11.pressure);
    }

    #[test]
    fn hot_day_lowers_density() {
        let std = Atmosphere::default().freestream(1000.0, 50.0);
        let hot = Atmosphere::new(Constants::default(), 15.0).freestream(1000.0, 50.0);
        assert!(hot.density < std.density);
        assert_relative_eq!(hot.pressure, std.pressure);
    }
}
