//! Rotor and propeller performance.
//!
//! The aerodynamic method is a collaborator behind [`RotorPerformance`]; the
//! crate ships [`CoefficientRotor`], a coefficient map linear in advance
//! ratio, so networks can be evaluated without a blade-element solver.

use crate::atmosphere::FreestreamPoint;
use crate::common::check_positive;
use crate::error::ComponentResult;
use std::f64::consts::PI;
use std::fmt::Debug;

const TWO_PI_CUBED: f64 = (2.0 * PI) * (2.0 * PI) * (2.0 * PI);

/// Load coefficient `k` such that shaft torque is `k * omega^2` for a rotor
/// running at power coefficient `cp`.
///
/// From `P = Cp rho n^3 D^5` with `n = omega / 2 pi` and `Q = P / omega`.
pub fn load_coefficient(cp: f64, density: f64, diameter: f64) -> f64 {
    cp * density * diameter.powi(5) / TWO_PI_CUBED
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotorGeometry {
    /// Tip radius (m)
    pub radius: f64,
    pub blade_count: u32,
}

impl RotorGeometry {
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    pub fn disc_area(&self) -> f64 {
        PI * self.radius * self.radius
    }
}

/// Rotor outputs at one time point.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct RotorLoads {
    /// Thrust along the rotor axis (N)
    pub thrust: f64,
    /// Shaft torque absorbed (N·m)
    pub torque: f64,
    /// Shaft power absorbed (W)
    pub power: f64,
    pub power_coefficient: f64,
    pub thrust_coefficient: f64,
    pub figure_of_merit: f64,
    pub tip_mach: f64,
    pub advance_ratio: f64,
}

/// Aerodynamic rotor evaluator.
///
/// Implementations must be pure and return finite loads for any finite input,
/// including `omega == 0`.
pub trait RotorPerformance: Debug + Send + Sync {
    fn geometry(&self) -> RotorGeometry;

    /// Loads at rotor speed `omega` (rad/s) and collective `pitch` (rad).
    fn performance(&self, omega: f64, freestream: &FreestreamPoint, pitch: f64) -> RotorLoads;

    /// Power coefficient at the rotor's design condition, if known.
    fn design_power_coefficient(&self) -> Option<f64> {
        None
    }

    /// Model-level fallback power coefficient used when no design value exists.
    fn default_power_coefficient(&self) -> Option<f64> {
        None
    }
}

/// Reference rotor model.
///
/// ```text
/// J  = V / (n D)
/// s  = max(1 + pitch_sensitivity * pitch, 0.1)
/// Ct = max(ct0 * s * (1 - J / j0), 0)
/// Cp = cp0 * s * max(1 - 0.5 (J / j0)^2, 0.05)
/// T  = Ct rho n^2 D^4,  P = Cp rho n^3 D^5
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CoefficientRotor {
    pub tag: String,
    pub geometry: RotorGeometry,
    /// Static thrust coefficient
    pub ct0: f64,
    /// Static power coefficient
    pub cp0: f64,
    /// Zero-thrust advance ratio
    pub j0: f64,
    /// Fractional coefficient change per radian of pitch
    pub pitch_sensitivity: f64,
    pub design_cp: Option<f64>,
}

impl CoefficientRotor {
    pub fn new(
        tag: impl Into<String>,
        radius: f64,
        blade_count: u32,
        ct0: f64,
        cp0: f64,
        j0: f64,
    ) -> ComponentResult<Self> {
        check_positive(radius, "rotor radius must be positive")?;
        check_positive(ct0, "static thrust coefficient must be positive")?;
        check_positive(cp0, "static power coefficient must be positive")?;
        check_positive(j0, "zero-thrust advance ratio must be positive")?;

        Ok(Self {
            tag: tag.into(),
            geometry: RotorGeometry {
                radius,
                blade_count: blade_count.max(1),
            },
            ct0,
            cp0,
            j0,
            pitch_sensitivity: 0.0,
            design_cp: None,
        })
    }

    pub fn with_design_power_coefficient(mut self, cp: f64) -> Self {
        self.design_cp = Some(cp);
        self
    }

    pub fn with_pitch_sensitivity(mut self, sensitivity: f64) -> Self {
        self.pitch_sensitivity = sensitivity;
        self
    }

    fn pitch_scale(&self, pitch: f64) -> f64 {
        (1.0 + self.pitch_sensitivity * pitch).max(0.1)
    }

    pub fn thrust_coefficient(&self, advance_ratio: f64, pitch: f64) -> f64 {
        (self.ct0 * self.pitch_scale(pitch) * (1.0 - advance_ratio / self.j0)).max(0.0)
    }

    pub fn power_coefficient(&self, advance_ratio: f64, pitch: f64) -> f64 {
        let r = advance_ratio / self.j0;
        self.cp0 * self.pitch_scale(pitch) * (1.0 - 0.5 * r * r).max(0.05)
    }
}

impl RotorPerformance for CoefficientRotor {
    fn geometry(&self) -> RotorGeometry {
        self.geometry
    }

    fn performance(&self, omega: f64, freestream: &FreestreamPoint, pitch: f64) -> RotorLoads {
        let omega = omega.max(0.0);
        let d = self.geometry.diameter();
        let rho = freestream.density;
        let n = omega / (2.0 * PI);

        let advance_ratio = if n * d > 1e-9 {
            freestream.velocity.max(0.0) / (n * d)
        } else {
            0.0
        };

        let ct = self.thrust_coefficient(advance_ratio, pitch);
        let cp = self.power_coefficient(advance_ratio, pitch);

        let thrust = ct * rho * n * n * d.powi(4);
        let power = cp * rho * n * n * n * d.powi(5);
        let torque = load_coefficient(cp, rho, d) * omega * omega;

        // Ideal induced power over actual power
        let area = self.geometry.disc_area();
        let figure_of_merit = if power > 1e-9 && rho > 0.0 {
            (thrust.powf(1.5) / (2.0 * rho * area).sqrt() / power).min(1.0)
        } else {
            0.0
        };

        let tip_mach = if freestream.speed_of_sound > 0.0 {
            omega * self.geometry.radius / freestream.speed_of_sound
        } else {
            0.0
        };

        RotorLoads {
            thrust,
            torque,
            power,
            power_coefficient: cp,
            thrust_coefficient: ct,
            figure_of_merit,
            tip_mach,
            advance_ratio,
        }
    }

    fn design_power_coefficient(&self) -> Option<f64> {
        self.design_cp
    }

    fn default_power_coefficient(&self) -> Option<f64> {
        Some(self.cp0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Atmosphere;
    use approx::assert_relative_eq;

    fn rotor() -> CoefficientRotor {
        CoefficientRotor::new("rotor", 0.8, 3, 0.12, 0.05, 1.2).unwrap()
    }

    #[test]
    fn static_rotor_uses_static_coefficients() {
        let fs = Atmosphere::default().freestream(0.0, 0.0);
        let loads = rotor().performance(200.0, &fs, 0.0);
        assert_relative_eq!(loads.thrust_coefficient, 0.12);
        assert_relative_eq!(loads.power_coefficient, 0.05);
        assert!(loads.figure_of_merit > 0.0 && loads.figure_of_merit <= 1.0);
    }

    #[test]
    fn torque_matches_load_coefficient() {
        let fs = Atmosphere::default().freestream(1000.0, 40.0);
        let r = rotor();
        let loads = r.performance(150.0, &fs, 0.0);
        let k = load_coefficient(loads.power_coefficient, fs.density, 1.6);
        assert_relative_eq!(loads.torque, k * 150.0 * 150.0, max_relative = 1e-12);
        assert_relative_eq!(loads.power, loads.torque * 150.0, max_relative = 1e-12);
    }

    #[test]
    fn stopped_rotor_is_finite() {
        let fs = Atmosphere::default().freestream(0.0, 50.0);
        let loads = rotor().performance(0.0, &fs, 0.0);
        assert_eq!(loads.thrust, 0.0);
        assert_eq!(loads.power, 0.0);
        assert_eq!(loads.figure_of_merit, 0.0);
        assert!(loads.advance_ratio.is_finite());
    }

    #[test]
    fn windmilling_thrust_is_clamped_at_zero() {
        let fs = Atmosphere::default().freestream(0.0, 100.0);
        // J = 100 / (n D) with n D small
        let loads = rotor().performance(50.0, &fs, 0.0);
        assert!(loads.advance_ratio > 1.2);
        assert_eq!(loads.thrust, 0.0);
        assert!(loads.power > 0.0);
    }

    #[test]
    fn design_value_and_default() {
        let r = rotor();
        assert_eq!(r.design_power_coefficient(), None);
        assert_eq!(r.default_power_coefficient(), Some(0.05));
        let r = r.with_design_power_coefficient(0.04);
        assert_eq!(r.design_power_coefficient(), Some(0.04));
    }

    #[test]
    fn pitch_raises_coefficients() {
        let r = rotor().with_pitch_sensitivity(2.0);
        assert!(r.thrust_coefficient(0.3, 0.1) > r.thrust_coefficient(0.3, 0.0));
        assert!(r.power_coefficient(0.3, 0.1) > r.power_coefficient(0.3, 0.0));
    }
}
