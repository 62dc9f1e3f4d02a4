//! Unknown and residual naming.
//!
//! Names are `{line}.{propulsor}.{quantity}` or `{line}.{quantity}`, so every
//! entry in a segment's state vectors traces back to one line and source.

use crate::chain::PropulsorChain;
use crate::error::{NetworkError, NetworkResult};
use crate::segment::Segment;

pub fn power_coefficient(line: &str, propulsor: &str) -> String {
    format!("{line}.{propulsor}.rotor_power_coefficient")
}

pub fn torque(line: &str, propulsor: &str) -> String {
    format!("{line}.{propulsor}.torque")
}

pub fn voltage_under_load(line: &str) -> String {
    format!("{line}.voltage_under_load")
}

pub fn voltage(line: &str) -> String {
    format!("{line}.voltage")
}

pub fn recharge_current(line: &str) -> String {
    format!("{line}.recharge_current")
}

/// Seed for a rotor power-coefficient unknown.
///
/// Order: segment override, rotor design value, rotor-model default. With
/// none available the segment cannot start.
pub fn power_coefficient_seed(
    segment: &Segment,
    line: &str,
    chain: &PropulsorChain,
) -> NetworkResult<f64> {
    let missing = || NetworkError::MissingDesignValue {
        segment: segment.tag.clone(),
        line: line.to_string(),
        propulsor: chain.tag.clone(),
        what: "rotor power coefficient",
    };
    let rotor = chain.rotor().ok_or_else(missing)?;
    let seed = segment
        .settings
        .power_coefficient_override(line, &chain.tag)
        .or_else(|| rotor.design_power_coefficient())
        .or_else(|| rotor.default_power_coefficient())
        .ok_or_else(missing)?;
    if !(seed.is_finite() && seed > 0.0) {
        return Err(NetworkError::InvalidDesignValue {
            segment: segment.tag.clone(),
            line: line.to_string(),
            propulsor: chain.tag.clone(),
            what: "rotor power coefficient",
            value: seed,
        });
    }
    Ok(seed)
}
