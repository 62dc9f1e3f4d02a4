//! Brushless DC motor with optional gearbox.

use crate::common::{OMEGA_STALL, check_efficiency, check_non_negative, check_positive};
use crate::error::{ComponentError, ComponentResult};
use pf_core::units::{Current, Resistance};

/// DC motor described by its speed constant, winding resistance and no-load
/// current.
///
/// ## Model
///
/// ```text
/// omega_m = G * omega                      (motor shaft from rotor shaft)
/// i       = (v - omega_m / kv) / R         (back-EMF)
/// Q_m     = (i - i0) / kv                  (motor shaft torque)
/// Q       = Q_m * G * eta_g                (torque delivered to the rotor)
/// ```
///
/// The rotor load is `Q_load = k * omega^2` with `k` derived from the rotor
/// power coefficient guess (see [`crate::rotor::load_coefficient`]). Equating
/// the two gives a quadratic in `omega` that is solved in closed form.
///
/// ## Sign conventions
///
/// `omega` and `torque` are reported on the rotor side of the gearbox.
#[derive(Clone, Debug, PartialEq)]
pub struct DcMotor {
    pub tag: String,
    /// Speed constant (rad/s per volt)
    pub kv: f64,
    /// Winding resistance (ohm)
    pub resistance: f64,
    /// No-load current (A)
    pub no_load_current: f64,
    /// Motor speed over rotor speed
    pub gear_ratio: f64,
    /// Gearbox efficiency (0 < eta <= 1)
    pub gearbox_efficiency: f64,
}

/// Motor operating point at one time point.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct MotorPoint {
    /// Rotor-side angular velocity (rad/s)
    pub omega: f64,
    /// Rotor-side torque (N·m)
    pub torque: f64,
    /// Winding current (A)
    pub current: f64,
    /// Shaft power over electrical power
    pub efficiency: f64,
    /// Set when the shaft cannot turn (omega substituted by zero).
    pub stalled: bool,
}

impl DcMotor {
    pub fn new(
        tag: impl Into<String>,
        kv: f64,
        resistance: Resistance,
        no_load_current: Current,
        gear_ratio: f64,
        gearbox_efficiency: f64,
    ) -> ComponentResult<Self> {
        check_positive(kv, "motor kv must be positive")?;
        check_positive(resistance.value, "motor resistance must be positive")?;
        check_non_negative(no_load_current.value, "no-load current cannot be negative")?;
        check_positive(gear_ratio, "gear ratio must be positive")?;
        check_efficiency(gearbox_efficiency, "gearbox efficiency must be in (0,1]")?;

        Ok(Self {
            tag: tag.into(),
            kv,
            resistance: resistance.value,
            no_load_current: no_load_current.value,
            gear_ratio,
            gearbox_efficiency,
        })
    }

    /// Rotor-side torque at a given voltage and rotor speed.
    pub fn torque_at(&self, voltage: f64, omega: f64) -> f64 {
        let g = self.gear_ratio;
        let current = (voltage - g * omega / self.kv) / self.resistance;
        (current - self.no_load_current) * g * self.gearbox_efficiency / self.kv
    }

    /// Solve the torque balance against a quadratic rotor load.
    ///
    /// `load_coefficient` below zero is treated as zero. The result is always
    /// finite: when the shaft cannot turn, `stalled` is set and speed, torque
    /// and efficiency are zero.
    pub fn operating_point(&self, voltage: f64, load_coefficient: f64) -> MotorPoint {
        let g = self.gear_ratio;
        let eta_g = self.gearbox_efficiency;
        let kv = self.kv;
        let r = self.resistance;
        let k = load_coefficient.max(0.0);

        // k w^2 + a w - b = 0
        let a = g * g * eta_g / (kv * kv * r);
        let b = g * eta_g / kv * (voltage / r - self.no_load_current);

        let stall = || MotorPoint {
            omega: 0.0,
            torque: 0.0,
            current: (voltage / r).max(0.0),
            efficiency: 0.0,
            stalled: true,
        };

        if !(b > 0.0) {
            return stall();
        }

        // Stable root form avoids cancellation when k*b << a^2
        let omega = 2.0 * b / (a + (a * a + 4.0 * k * b).sqrt());
        if !(omega >= OMEGA_STALL) {
            return stall();
        }

        let current = (voltage - g * omega / kv) / r;
        let torque = k * omega * omega;
        let p_elec = voltage * current;
        let efficiency = if p_elec > 0.0 {
            (torque * omega / p_elec).clamp(0.0, 1.0)
        } else {
            0.0
        };

        MotorPoint {
            omega,
            torque,
            current,
            efficiency,
            stalled: false,
        }
    }

    /// Strict variant of [`DcMotor::operating_point`] for callers that must not
    /// continue past a stall.
    pub fn try_operating_point(
        &self,
        voltage: f64,
        load_coefficient: f64,
    ) -> ComponentResult<MotorPoint> {
        let point = self.operating_point(voltage, load_coefficient);
        if point.stalled {
            return Err(ComponentError::StallSingularity {
                tag: self.tag.clone(),
                omega: point.omega,
            });
        }
        Ok(point)
    }

    /// True when two motors would produce identical operating points.
    pub fn same_model(&self, other: &DcMotor) -> bool {
        self.kv == other.kv
            && self.resistance == other.resistance
            && self.no_load_current == other.no_load_current
            && self.gear_ratio == other.gear_ratio
            && self.gearbox_efficiency == other.gearbox_efficiency
    }
}
