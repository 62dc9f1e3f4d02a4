//! Design-point sizing of a DC motor.
//!
//! Given the rotor-side speed and torque a motor must deliver at a design
//! voltage, solve for the speed constant and winding resistance that hit a
//! target efficiency. When the exact equations have no physical solution the
//! target efficiency is relaxed by a tunable slack band and the solve is
//! repeated once.

use crate::common::{check_efficiency, check_non_negative, check_positive};
use crate::error::{ComponentError, ComponentResult};
use crate::motor::DcMotor;
use pf_core::units::{amps, ohms};
use tracing::debug;

/// Default efficiency relaxation for the second sizing stage.
pub const DEFAULT_SLACK: f64 = 0.05;

/// Back-EMF fraction above which a design is treated as unreachable.
const MAX_EMF_FRACTION: f64 = 0.999;

/// Required operating point at the motor's design condition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotorDesignPoint {
    /// Rotor-side angular velocity (rad/s)
    pub omega: f64,
    /// Rotor-side torque (N·m)
    pub torque: f64,
    /// Terminal voltage (V)
    pub voltage: f64,
    /// Target motor efficiency, excluding the gearbox
    pub efficiency: f64,
    /// No-load current (A)
    pub no_load_current: f64,
    pub gear_ratio: f64,
    pub gearbox_efficiency: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SizedMotor {
    pub motor: DcMotor,
    /// Set when the second, slackened stage produced the result.
    pub relaxed: bool,
    /// Efficiency actually used for the sizing equations.
    pub efficiency: f64,
}

/// Size a motor for `point`.
///
/// `slack` is the fractional relaxation of the target efficiency tried when
/// the exact solve fails.
pub fn size_motor(
    tag: &str,
    point: &MotorDesignPoint,
    slack: f64,
) -> ComponentResult<SizedMotor> {
    check_positive(point.omega, "design speed must be positive")?;
    check_positive(point.torque, "design torque must be positive")?;
    check_positive(point.voltage, "design voltage must be positive")?;
    check_efficiency(point.efficiency, "design efficiency must be in (0,1]")?;
    check_non_negative(point.no_load_current, "no-load current cannot be negative")?;
    check_positive(point.gear_ratio, "gear ratio must be positive")?;
    check_efficiency(point.gearbox_efficiency, "gearbox efficiency must be in (0,1]")?;
    if !(0.0..1.0).contains(&slack) {
        return Err(ComponentError::InvalidArg {
            what: "sizing slack must be in [0,1)",
        });
    }

    if let Some(motor) = solve_exact(tag, point, point.efficiency)? {
        return Ok(SizedMotor {
            motor,
            relaxed: false,
            efficiency: point.efficiency,
        });
    }

    let relaxed_efficiency = point.efficiency * (1.0 - slack);
    debug!(
        tag,
        target = point.efficiency,
        relaxed = relaxed_efficiency,
        "exact motor sizing failed, retrying with slack"
    );
    match solve_exact(tag, point, relaxed_efficiency)? {
        Some(motor) => Ok(SizedMotor {
            motor,
            relaxed: true,
            efficiency: relaxed_efficiency,
        }),
        None => Err(ComponentError::Infeasible {
            what: format!(
                "motor '{tag}' cannot reach {:.3} efficiency at {:.1} V",
                relaxed_efficiency, point.voltage
            ),
        }),
    }
}

/// Returns `None` when the design equations have no physical root.
fn solve_exact(
    tag: &str,
    point: &MotorDesignPoint,
    efficiency: f64,
) -> ComponentResult<Option<DcMotor>> {
    let g = point.gear_ratio;
    let v = point.voltage;
    let i0 = point.no_load_current;

    let omega_m = point.omega * g;
    let torque_m = point.torque / (g * point.gearbox_efficiency);
    let p_shaft = torque_m * omega_m;

    let denom = p_shaft - efficiency * i0 * v;
    if !(denom > 0.0) {
        return Ok(None);
    }
    // Back-EMF over terminal voltage
    let x = efficiency * p_shaft / denom;
    if !(x > 0.0 && x < MAX_EMF_FRACTION) {
        return Ok(None);
    }

    let kv = omega_m / (x * v);
    let current = p_shaft / (x * v) + i0;
    let resistance = v * (1.0 - x) / current;

    DcMotor::new(
        tag,
        kv,
        ohms(resistance),
        amps(i0),
        g,
        point.gearbox_efficiency,
    )
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn design() -> MotorDesignPoint {
        MotorDesignPoint {
            omega: 250.0,
            torque: 40.0,
            voltage: 400.0,
            efficiency: 0.9,
            no_load_current: 1.0,
            gear_ratio: 1.0,
            gearbox_efficiency: 1.0,
        }
    }

    #[test]
    fn exact_sizing_reproduces_design_point() {
        let point = design();
        let sized = size_motor("m", &point, DEFAULT_SLACK).unwrap();
        assert!(!sized.relaxed);

        let k = point.torque / (point.omega * point.omega);
        let op = sized.motor.operating_point(point.voltage, k);
        assert_relative_eq!(op.omega, point.omega, max_relative = 1e-9);
        assert_relative_eq!(op.torque, point.torque, max_relative = 1e-9);
        assert_relative_eq!(op.efficiency, 0.9, max_relative = 1e-9);
    }

    #[test]
    fn unreachable_efficiency_falls_back_to_slack() {
        // i0*v = 400 W of no-load loss against 10 kW shaft power caps the
        // efficiency near 0.96
        let point = MotorDesignPoint {
            efficiency: 0.97,
            ..design()
        };
        let sized = size_motor("m", &point, 0.05).unwrap();
        assert!(sized.relaxed);
        assert_relative_eq!(sized.efficiency, 0.97 * 0.95);
    }

    #[test]
    fn hopeless_design_is_infeasible() {
        let point = MotorDesignPoint {
            no_load_current: 200.0,
            ..design()
        };
        let err = size_motor("m", &point, 0.05).unwrap_err();
        assert!(matches!(err, ComponentError::Infeasible { .. }));
    }

    #[test]
    fn geared_design_point_round_trips() {
        let point = MotorDesignPoint {
            gear_ratio: 4.0,
            gearbox_efficiency: 0.97,
            ..design()
        };
        let sized = size_motor("m", &point, DEFAULT_SLACK).unwrap();
        let k = point.torque / (point.omega * point.omega);
        let op = sized.motor.operating_point(point.voltage, k);
        assert_relative_eq!(op.omega, point.omega, max_relative = 1e-9);
    }
}
