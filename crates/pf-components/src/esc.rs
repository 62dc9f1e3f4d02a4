//! Electronic speed controller.

use crate::common::check_efficiency;
use crate::error::ComponentResult;
use pf_core::numeric::clamp;

/// Electronic speed controller between a bus and a motor.
///
/// Throttle acts as a duty cycle: the output voltage is the throttle fraction
/// of the input voltage. Throttle outside [0, 1] saturates.
#[derive(Clone, Debug, PartialEq)]
pub struct Esc {
    pub tag: String,
    /// Conversion efficiency (0 < eta <= 1)
    pub efficiency: f64,
}

impl Esc {
    pub fn new(tag: impl Into<String>, efficiency: f64) -> ComponentResult<Self> {
        check_efficiency(efficiency, "ESC efficiency must be in (0,1]")?;
        Ok(Self {
            tag: tag.into(),
            efficiency,
        })
    }

    /// Throttle clamped to [0, 1].
    pub fn duty(throttle: f64) -> f64 {
        clamp(throttle, 0.0, 1.0)
    }

    pub fn output_voltage(&self, throttle: f64, input_voltage: f64) -> f64 {
        Self::duty(throttle) * input_voltage
    }

    /// Back-compute the bus-side current from the motor-side current.
    pub fn input_current(&self, throttle: f64, output_current: f64) -> f64 {
        output_current * Self::duty(throttle) / self.efficiency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_efficiency() {
        assert!(Esc::new("esc", 0.0).is_err());
        assert!(Esc::new("esc", 1.01).is_err());
    }

    #[test]
    fn throttle_saturates() {
        let esc = Esc::new("esc", 0.95).unwrap();
        assert_eq!(esc.output_voltage(-0.5, 400.0), esc.output_voltage(0.0, 400.0));
        assert_eq!(esc.output_voltage(1.5, 400.0), esc.output_voltage(1.0, 400.0));
        assert_eq!(esc.output_voltage(1.5, 400.0), 400.0);
    }

    #[test]
    fn current_closure_accounts_for_losses() {
        let esc = Esc::new("esc", 0.9).unwrap();
        let i_in = esc.input_current(0.5, 90.0);
        assert!((i_in - 50.0).abs() < 1e-12);
    }
}
