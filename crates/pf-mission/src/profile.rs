//! Segment flight profiles.
//!
//! A profile fixes the kinematics of a segment (time, altitude, velocity at
//! every point) before the network is solved.

use crate::error::{MissionError, MissionResult};
use pf_components::Atmosphere;
use pf_core::numeric::linspace;
use pf_network::{ConditionBlock, FreestreamSeries, SegmentKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Profile {
    /// Constant true airspeed and climb rate
    Climb {
        start_altitude: f64,
        end_altitude: f64,
        speed: f64,
        climb_rate: f64,
    },
    /// Constant altitude and speed over a distance
    Cruise {
        altitude: f64,
        speed: f64,
        distance: f64,
    },
    Descent {
        start_altitude: f64,
        end_altitude: f64,
        speed: f64,
        descent_rate: f64,
    },
    Hover { altitude: f64, duration: f64 },
    /// Ground charging; `current` is the commanded charge current (A)
    Recharge {
        altitude: f64,
        duration: f64,
        current: Option<f64>,
    },
    /// Ground discharge at a fixed current with propulsors idle
    GroundDischarge {
        altitude: f64,
        duration: f64,
        current: f64,
    },
}

impl Profile {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Profile::Climb { .. } => SegmentKind::Climb,
            Profile::Cruise { .. } => SegmentKind::Cruise,
            Profile::Descent { .. } => SegmentKind::Descent,
            Profile::Hover { .. } => SegmentKind::Hover,
            Profile::Recharge { .. } => SegmentKind::Recharge,
            Profile::GroundDischarge { .. } => SegmentKind::GroundDischarge,
        }
    }

    /// Segment duration (s).
    pub fn duration(&self) -> f64 {
        match *self {
            Profile::Climb {
                start_altitude,
                end_altitude,
                climb_rate,
                ..
            } => (end_altitude - start_altitude) / climb_rate,
            Profile::Cruise {
                speed, distance, ..
            } => distance / speed,
            Profile::Descent {
                start_altitude,
                end_altitude,
                descent_rate,
                ..
            } => (start_altitude - end_altitude) / descent_rate,
            Profile::Hover { duration, .. }
            | Profile::Recharge { duration, .. }
            | Profile::GroundDischarge { duration, .. } => duration,
        }
    }

    /// Flight-path angle (rad), positive climbing.
    pub fn flight_path_angle(&self) -> f64 {
        match *self {
            Profile::Climb {
                speed, climb_rate, ..
            } => (climb_rate / speed).clamp(-1.0, 1.0).asin(),
            Profile::Descent {
                speed,
                descent_rate,
                ..
            } => -(descent_rate / speed).clamp(-1.0, 1.0).asin(),
            _ => 0.0,
        }
    }

    /// Ground current handed to the network, if any.
    pub fn ground_current(&self) -> Option<f64> {
        match *self {
            Profile::Recharge { current, .. } => current,
            Profile::GroundDischarge { current, .. } => Some(current),
            _ => None,
        }
    }

    pub fn validate(&self, segment: &str) -> MissionResult<()> {
        let bad = |what: &str| {
            Err(MissionError::InvalidSegment {
                segment: segment.to_string(),
                what: what.to_string(),
            })
        };
        match *self {
            Profile::Climb {
                start_altitude,
                end_altitude,
                speed,
                climb_rate,
            } => {
                if !(climb_rate > 0.0) || end_altitude <= start_altitude {
                    return bad("climb needs a positive rate and a higher end altitude");
                }
                if !(speed >= climb_rate) {
                    return bad("climb rate cannot exceed airspeed");
                }
            }
            Profile::Cruise {
                speed, distance, ..
            } => {
                if !(speed > 0.0 && distance > 0.0) {
                    return bad("cruise needs positive speed and distance");
                }
            }
            Profile::Descent {
                start_altitude,
                end_altitude,
                speed,
                descent_rate,
            } => {
                if !(descent_rate > 0.0) || end_altitude >= start_altitude {
                    return bad("descent needs a positive rate and a lower end altitude");
                }
                if !(speed >= descent_rate) {
                    return bad("descent rate cannot exceed airspeed");
                }
            }
            Profile::Hover { duration, .. } => {
                if !(duration > 0.0) {
                    return bad("duration must be positive");
                }
            }
            Profile::GroundDischarge {
                duration, current, ..
            } => {
                if !(duration > 0.0) {
                    return bad("duration must be positive");
                }
                if !(current >= 0.0) {
                    return bad("discharge current cannot be negative");
                }
            }
            Profile::Recharge {
                duration, current, ..
            } => {
                if !(duration > 0.0) {
                    return bad("duration must be positive");
                }
                if current.is_some_and(|c| !(c > 0.0)) {
                    return bad("charge current must be positive");
                }
            }
        }
        Ok(())
    }

    /// Write time and freestream arrays for `n` points.
    pub fn fill(&self, conditions: &mut ConditionBlock, atmosphere: &Atmosphere) {
        let n = conditions.n_points;
        let (h0, h1, v) = match *self {
            Profile::Climb {
                start_altitude,
                end_altitude,
                speed,
                ..
            }
            | Profile::Descent {
                start_altitude,
                end_altitude,
                speed,
                ..
            } => (start_altitude, end_altitude, speed),
            Profile::Cruise {
                altitude, speed, ..
            } => (altitude, altitude, speed),
            Profile::Hover { altitude, .. }
            | Profile::Recharge { altitude, .. }
            | Profile::GroundDischarge { altitude, .. } => (altitude, altitude, 0.0),
        };
        conditions.time = linspace(0.0, self.duration(), n);
        let points: Vec<_> = linspace(h0, h1, n)
            .into_iter()
            .map(|h| atmosphere.freestream(h, v))
            .collect();
        conditions.freestream = FreestreamSeries::from_points(&points);
    }
}
