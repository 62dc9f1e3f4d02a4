//! Reciprocating engine driving a rotor.

use crate::common::{OMEGA_STALL, check_non_negative, check_positive};
use crate::error::ComponentResult;
use pf_core::numeric::clamp;
use pf_core::units::Power;

/// Gagg-Ferrar altitude lapse constant
const GAGG_FERRAR: f64 = 7.55;

/// Normally aspirated piston engine.
///
/// Shaft power lapses with density ratio `sigma` following Gagg-Ferrar and
/// scales linearly with throttle. The shaft speed follows from the power
/// balance against a quadratic rotor load, capped at the governed maximum.
#[derive(Clone, Debug, PartialEq)]
pub struct PistonEngine {
    pub tag: String,
    /// Sea-level rated shaft power (W)
    pub rated_power: f64,
    /// Governed maximum shaft speed (rad/s)
    pub max_speed: f64,
    /// Brake-specific fuel consumption (kg/J)
    pub sfc: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct EnginePoint {
    pub omega: f64,
    pub torque: f64,
    pub power: f64,
    /// Fuel mass flow (kg/s)
    pub fuel_rate: f64,
    pub stalled: bool,
}

impl PistonEngine {
    pub fn new(
        tag: impl Into<String>,
        rated_power: Power,
        max_speed: f64,
        sfc: f64,
    ) -> ComponentResult<Self> {
        check_positive(rated_power.value, "rated power must be positive")?;
        check_positive(max_speed, "maximum engine speed must be positive")?;
        check_non_negative(sfc, "sfc cannot be negative")?;
        Ok(Self {
            tag: tag.into(),
            rated_power: rated_power.value,
            max_speed,
            sfc,
        })
    }

    /// Full-throttle shaft power at density ratio `sigma`.
    pub fn available_power(&self, sigma: f64) -> f64 {
        let sigma = sigma.max(0.0);
        self.rated_power * (sigma - (1.0 - sigma) / GAGG_FERRAR).max(0.0)
    }

    pub fn operating_point(&self, throttle: f64, sigma: f64, load_coefficient: f64) -> EnginePoint {
        let power = self.available_power(sigma) * clamp(throttle, 0.0, 1.0);
        let k = load_coefficient.max(0.0);

        let omega = if k > 0.0 {
            (power / k).cbrt().min(self.max_speed)
        } else {
            self.max_speed
        };

        if power <= 0.0 || omega < OMEGA_STALL {
            return EnginePoint {
                stalled: true,
                ..EnginePoint::default()
            };
        }

        EnginePoint {
            omega,
            torque: power / omega,
            power,
            fuel_rate: self.sfc * power,
            stalled: false,
        }
    }

    pub fn same_model(&self, other: &PistonEngine) -> bool {
        self.rated_power == other.rated_power
            && self.max_speed == other.max_speed
            && self.sfc == other.sfc
    }
}
