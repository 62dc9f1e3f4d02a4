//! Mission results and summaries.

use crate::segment::SegmentResult;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MissionResults {
    pub segments: Vec<SegmentResult>,
}

/// Per-segment digest for reporting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub tag: String,
    pub kind: String,
    pub n_points: usize,
    pub duration: f64,
    pub converged: bool,
    pub iterations: usize,
    pub residual_norm: f64,
    pub start_altitude: f64,
    pub end_altitude: f64,
    pub max_thrust: f64,
    /// Electrical and shaft energy drawn from all lines (J)
    pub energy: f64,
    pub fuel_burned: f64,
    /// End-of-segment state of charge keyed by `"{bus}.{battery}"`
    pub state_of_charge: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissionSummary {
    pub segments: Vec<SegmentSummary>,
    pub all_converged: bool,
    pub total_time: f64,
    pub total_energy: f64,
    pub total_fuel_burned: f64,
}

impl MissionResults {
    pub fn segment(&self, tag: &str) -> Option<&SegmentResult> {
        self.segments.iter().find(|r| r.segment.tag == tag)
    }

    pub fn all_converged(&self) -> bool {
        self.segments.iter().all(|r| r.converged)
    }

    /// State of charge at the end of the mission.
    pub fn final_state_of_charge(&self, bus: &str, battery: &str) -> Option<f64> {
        let last = self.segments.last()?;
        let line = last.segment.conditions.energy.get(bus)?;
        line.batteries.get(battery)?.soc.last().copied()
    }

    pub fn summary(&self) -> MissionSummary {
        let segments: Vec<SegmentSummary> = self.segments.iter().map(summarize).collect();
        MissionSummary {
            all_converged: self.all_converged(),
            total_time: segments.iter().map(|s| s.duration).sum(),
            total_energy: segments.iter().map(|s| s.energy).sum(),
            total_fuel_burned: segments.iter().map(|s| s.fuel_burned).sum(),
            segments,
        }
    }
}

fn summarize(result: &SegmentResult) -> SegmentSummary {
    let seg = &result.segment;
    let cond = &seg.conditions;
    let duration = match (cond.time.first(), cond.time.last()) {
        (Some(a), Some(b)) => b - a,
        _ => 0.0,
    };
    let max_thrust = cond
        .total_thrust
        .iter()
        .map(|[x, y, z]| (x * x + y * y + z * z).sqrt())
        .fold(0.0, f64::max);
    let fuel_burned = match (cond.vehicle_mass.first(), cond.vehicle_mass.last()) {
        (Some(a), Some(b)) => a - b,
        _ => 0.0,
    };

    let mut state_of_charge = BTreeMap::new();
    for (line_tag, line) in cond.energy.iter() {
        for (battery, record) in line.batteries.iter() {
            if let Some(&soc) = record.soc.last() {
                state_of_charge.insert(format!("{line_tag}.{battery}"), soc);
            }
        }
    }

    SegmentSummary {
        tag: seg.tag.clone(),
        kind: seg.kind.name().to_string(),
        n_points: seg.n_points(),
        duration,
        converged: result.converged,
        iterations: result.iterations,
        residual_norm: result.residual_norm,
        start_altitude: cond.freestream.altitude.first().copied().unwrap_or(0.0),
        end_altitude: cond.freestream.altitude.last().copied().unwrap_or(0.0),
        max_thrust,
        energy: trapezoid(&cond.time, &cond.total_power),
        fuel_burned,
        state_of_charge,
    }
}

/// Trapezoidal integral of `y` over `t`.
pub fn trapezoid(t: &[f64], y: &[f64]) -> f64 {
    t.windows(2)
        .zip(y.windows(2))
        .map(|(t, y)| 0.5 * (y[0] + y[1]) * (t[1] - t[0]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn trapezoid_integrates_linear_exactly() {
        let t = [0.0, 1.0, 3.0];
        let y = [0.0, 2.0, 6.0];
        assert_relative_eq!(trapezoid(&t, &y), 9.0);
    }
}
