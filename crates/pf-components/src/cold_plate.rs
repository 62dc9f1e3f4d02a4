//! Cold plate between battery cells and the coolant loop.

use crate::common::{EPSILON_MDOT, check_non_negative};
use crate::error::ComponentResult;

/// Wall-to-coolant heat acquisition with a fixed conductance.
///
/// ```text
/// NTU = hA / (mdot cp)
/// eps = 1 - exp(-NTU)
/// Q   = eps mdot cp (T_wall - T_in)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ColdPlate {
    pub tag: String,
    /// Wall-to-coolant conductance (W/K)
    pub conductance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ColdPlatePoint {
    /// Heat picked up by the coolant (W)
    pub heat: f64,
    pub outlet_temperature: f64,
    pub effectiveness: f64,
}

impl ColdPlate {
    pub fn new(tag: impl Into<String>, conductance: f64) -> ComponentResult<Self> {
        check_non_negative(conductance, "cold plate conductance cannot be negative")?;
        Ok(Self {
            tag: tag.into(),
            conductance,
        })
    }

    pub fn evaluate(
        &self,
        wall_temperature: f64,
        inlet_temperature: f64,
        mass_flow: f64,
        specific_heat: f64,
    ) -> ColdPlatePoint {
        let capacity_rate = mass_flow * specific_heat;
        if mass_flow <= EPSILON_MDOT || capacity_rate <= 0.0 {
            return ColdPlatePoint {
                outlet_temperature: inlet_temperature,
                ..ColdPlatePoint::default()
            };
        }
        let effectiveness = 1.0 - (-self.conductance / capacity_rate).exp();
        let heat = effectiveness * capacity_rate * (wall_temperature - inlet_temperature);
        ColdPlatePoint {
            heat,
            outlet_temperature: inlet_temperature + heat / capacity_rate,
            effectiveness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn outlet_approaches_wall_with_large_conductance() {
        let plate = ColdPlate::new("plate", 1e6).unwrap();
        let p = plate.evaluate(320.0, 300.0, 0.1, 3400.0);
        assert_relative_eq!(p.outlet_temperature, 320.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_flow_carries_inlet() {
        let plate = ColdPlate::new("plate", 50.0).unwrap();
        let p = plate.evaluate(320.0, 300.0, 0.0, 3400.0);
        assert_eq!(p.heat, 0.0);
        assert_eq!(p.outlet_temperature, 300.0);
    }

    #[test]
    fn heat_flows_from_wall_to_coolant() {
        let plate = ColdPlate::new("plate", 50.0).unwrap();
        let p = plate.evaluate(320.0, 300.0, 0.05, 3400.0);
        assert!(p.heat > 0.0);
        assert!(p.effectiveness > 0.0 && p.effectiveness < 1.0);
        assert_relative_eq!(p.heat, 0.05 * 3400.0 * (p.outlet_temperature - 300.0));
    }
}
