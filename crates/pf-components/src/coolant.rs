//! Coolant and air transport properties.
//!
//! Closed-form fits are enough for the thermal-management loop; all
//! functions take temperature in kelvin and pressure in pascal.

use std::fmt::Debug;

const AIR_PRANDTL: f64 = 0.71;

pub trait FluidProperties: Debug + Send + Sync {
    fn density(&self, temperature: f64, pressure: f64) -> f64;
    fn specific_heat(&self, temperature: f64) -> f64;
    fn viscosity(&self, temperature: f64) -> f64;
    fn conductivity(&self, temperature: f64) -> f64;

    fn prandtl(&self, temperature: f64) -> f64 {
        self.specific_heat(temperature) * self.viscosity(temperature)
            / self.conductivity(temperature)
    }

    /// Gases get the temperature-ratio wall correction, liquids the
    /// viscosity-ratio one.
    fn is_gas(&self) -> bool;
}

/// 50/50 ethylene glycol and water.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlycolWater;

impl FluidProperties for GlycolWater {
    fn density(&self, temperature: f64, _pressure: f64) -> f64 {
        1082.0 - 0.5 * (temperature - 273.15)
    }

    fn specific_heat(&self, temperature: f64) -> f64 {
        3300.0 + 3.5 * (temperature - 273.15)
    }

    fn viscosity(&self, temperature: f64) -> f64 {
        1.473e-6 * (2302.0 / temperature.max(200.0)).exp()
    }

    fn conductivity(&self, temperature: f64) -> f64 {
        0.36 + 0.0005 * (temperature - 273.15)
    }

    fn is_gas(&self) -> bool {
        false
    }
}

/// Dry air as an ideal gas with Sutherland viscosity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DryAir {
    pub gas_constant: f64,
    pub gamma: f64,
}

impl Default for DryAir {
    fn default() -> Self {
        Self {
            gas_constant: 287.052_87,
            gamma: 1.4,
        }
    }
}

impl FluidProperties for DryAir {
    fn density(&self, temperature: f64, pressure: f64) -> f64 {
        pressure / (self.gas_constant * temperature.max(1.0))
    }

    fn specific_heat(&self, _temperature: f64) -> f64 {
        self.gamma * self.gas_constant / (self.gamma - 1.0)
    }

    fn viscosity(&self, temperature: f64) -> f64 {
        let t = temperature.max(1.0);
        1.458e-6 * t.powf(1.5) / (t + 110.4)
    }

    fn conductivity(&self, temperature: f64) -> f64 {
        self.specific_heat(temperature) * self.viscosity(temperature) / AIR_PRANDTL
    }

    fn prandtl(&self, _temperature: f64) -> f64 {
        AIR_PRANDTL
    }

    fn is_gas(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn glycol_water_near_room_temperature() {
        let f = GlycolWater;
        let t = 298.15;
        assert_relative_eq!(f.density(t, 101_325.0), 1069.5);
        assert!(f.viscosity(t) > 2e-3 && f.viscosity(t) < 5e-3);
        assert!(f.prandtl(t) > 20.0);
        assert!(!f.is_gas());
    }

    #[test]
    fn glycol_thins_when_hot() {
        let f = GlycolWater;
        assert!(f.viscosity(340.0) < f.viscosity(290.0));
    }

    #[test]
    fn air_at_sea_level() {
        let a = DryAir::default();
        assert_relative_eq!(a.density(288.15, 101_325.0), 1.225, max_relative = 1e-3);
        assert_relative_eq!(a.viscosity(288.15), 1.789e-5, max_relative = 1e-3);
        assert_relative_eq!(a.prandtl(300.0), 0.71);
        assert!(a.is_gas());
    }
}
