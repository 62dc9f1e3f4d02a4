//! Throttle control and thrust demand.

use pf_components::FreestreamPoint;
use pf_core::Constants;
use std::fmt::Debug;

/// How a segment sets its throttle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThrottleControl {
    /// Fixed setting, saturated to [0, 1]
    Fixed(f64),
    /// Throttle is an unknown, trimmed so thrust meets the vehicle's demand
    Trimmed { seed: f64 },
}

impl ThrottleControl {
    pub fn is_trimmed(&self) -> bool {
        matches!(self, ThrottleControl::Trimmed { .. })
    }

    /// Fixed setting or trim seed, saturated to [0, 1].
    pub fn initial(&self) -> f64 {
        let t = match *self {
            ThrottleControl::Fixed(t) => t,
            ThrottleControl::Trimmed { seed } => seed,
        };
        if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
    }
}

/// Required thrust for a flight condition. The aerodynamic model behind it
/// is opaque to the network.
pub trait ThrustDemand: Debug + Send + Sync {
    /// Thrust (N) to hold `flight_path_angle` at `mass` (kg).
    fn required_thrust(
        &self,
        freestream: &FreestreamPoint,
        mass: f64,
        flight_path_angle: f64,
        constants: &Constants,
    ) -> f64;
}

/// `CD = CD0 + k CL^2` drag polar for wing-borne flight.
#[derive(Clone, Debug, PartialEq)]
pub struct ParabolicDragPolar {
    pub reference_area: f64,
    pub cd0: f64,
    /// Induced drag factor
    pub k: f64,
}

impl ThrustDemand for ParabolicDragPolar {
    fn required_thrust(
        &self,
        fs: &FreestreamPoint,
        mass: f64,
        gamma: f64,
        constants: &Constants,
    ) -> f64 {
        let weight = mass * constants.g0;
        let qs = fs.dynamic_pressure() * self.reference_area;
        if qs <= 0.0 {
            return weight;
        }
        let cl = weight * gamma.cos() / qs;
        let drag = qs * (self.cd0 + self.k * cl * cl);
        drag + weight * gamma.sin()
    }
}

/// Thrust equal to weight, for rotor-borne hover.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HoverDemand;

impl ThrustDemand for HoverDemand {
    fn required_thrust(&self, _: &FreestreamPoint, mass: f64, _: f64, constants: &Constants) -> f64 {
        mass * constants.g0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pf_components::Atmosphere;
    use proptest::prelude::*;

    #[test]
    fn level_flight_drag_minimum_at_equal_parasite_and_induced() {
        let polar = ParabolicDragPolar {
            reference_area: 16.0,
            cd0: 0.03,
            k: 0.05,
        };
        let c = Constants::default();
        let atm = Atmosphere::default();
        let mass = 1000.0;
        // CL* = sqrt(CD0 / k)
        let cl_star = (0.03f64 / 0.05).sqrt();
        let rho = atm.freestream(0.0, 0.0).density;
        let v_star = (2.0 * mass * c.g0 / (rho * 16.0 * cl_star)).sqrt();
        let d_star = polar.required_thrust(&atm.freestream(0.0, v_star), mass, 0.0, &c);
        let d_fast = polar.required_thrust(&atm.freestream(0.0, v_star * 1.3), mass, 0.0, &c);
        let d_slow = polar.required_thrust(&atm.freestream(0.0, v_star * 0.8), mass, 0.0, &c);
        assert!(d_star < d_fast && d_star < d_slow);
        assert_relative_eq!(d_star, 2.0 * mass * c.g0 * (0.03f64 * 0.05).sqrt(), max_relative = 1e-9);
    }

    #[test]
    fn hover_supports_weight() {
        let c = Constants::default();
        let fs = Atmosphere::default().freestream(0.0, 0.0);
        assert_relative_eq!(HoverDemand.required_thrust(&fs, 1200.0, 0.0, &c), 1200.0 * c.g0);
    }

    proptest! {
        #[test]
        fn throttle_saturates(t in -10.0f64..10.0) {
            let u = ThrottleControl::Fixed(t).initial();
            prop_assert!((0.0..=1.0).contains(&u));
            if (0.0..=1.0).contains(&t) {
                prop_assert_eq!(u, t);
            }
        }
    }
}
