//! Coolant reservoir.

use crate::common::{check_non_negative, check_positive};
use crate::error::ComponentResult;

/// Well-mixed coolant volume exchanging heat with ambient.
///
/// ```text
/// m cp dT/dt = mdot cp (T_in - T) - hA (T - T_amb)
/// ```
///
/// Stepped with the exact solution for constant inputs over the step, which
/// stays bounded for any `dt`.
#[derive(Clone, Debug, PartialEq)]
pub struct Reservoir {
    pub tag: String,
    /// Coolant mass held (kg)
    pub coolant_mass: f64,
    /// Wall conductance to ambient (W/K)
    pub conductance: f64,
}

impl Reservoir {
    pub fn new(tag: impl Into<String>, coolant_mass: f64, conductance: f64) -> ComponentResult<Self> {
        check_positive(coolant_mass, "reservoir coolant mass must be positive")?;
        check_non_negative(conductance, "reservoir conductance cannot be negative")?;
        Ok(Self {
            tag: tag.into(),
            coolant_mass,
            conductance,
        })
    }

    pub fn step(
        &self,
        temperature: f64,
        inlet_temperature: f64,
        mass_flow: f64,
        specific_heat: f64,
        ambient_temperature: f64,
        dt: f64,
    ) -> f64 {
        let flow = mass_flow.max(0.0) * specific_heat;
        let total = flow + self.conductance;
        if total <= 0.0 {
            return temperature;
        }
        let steady = (flow * inlet_temperature + self.conductance * ambient_temperature) / total;
        let tau = self.coolant_mass * specific_heat / total;
        steady + (temperature - steady) * (-dt / tau).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn relaxes_toward_inlet() {
        let r = Reservoir::new("res", 5.0, 0.0).unwrap();
        let t = r.step(300.0, 310.0, 0.1, 3400.0, 288.0, 1e6);
        assert_relative_eq!(t, 310.0, epsilon = 1e-9);
        let t = r.step(300.0, 310.0, 0.1, 3400.0, 288.0, 10.0);
        assert!(t > 300.0 && t < 310.0);
    }

    #[test]
    fn idle_reservoir_cools_to_ambient() {
        let r = Reservoir::new("res", 5.0, 10.0).unwrap();
        let t = r.step(300.0, 400.0, 0.0, 3400.0, 288.0, 10.0);
        assert!(t < 300.0 && t > 288.0);
    }

    #[test]
    fn sealed_idle_reservoir_holds_temperature() {
        let r = Reservoir::new("res", 5.0, 0.0).unwrap();
        assert_eq!(r.step(300.0, 400.0, 0.0, 3400.0, 288.0, 10.0), 300.0);
    }
}
