//! Mission segment container.

use crate::conditions::ConditionBlock;
use crate::state_vector::StateVector;
use std::collections::BTreeMap;
use std::fmt;

/// Segment type. Decides which unknowns a network declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Climb,
    Cruise,
    Descent,
    Hover,
    /// Ground charging at a commanded current
    Recharge,
    /// Ground discharge with propulsors idle
    GroundDischarge,
}

impl SegmentKind {
    pub fn is_in_flight(self) -> bool {
        !matches!(self, SegmentKind::Recharge | SegmentKind::GroundDischarge)
    }

    pub fn name(self) -> &'static str {
        match self {
            SegmentKind::Climb => "climb",
            SegmentKind::Cruise => "cruise",
            SegmentKind::Descent => "descent",
            SegmentKind::Hover => "hover",
            SegmentKind::Recharge => "recharge",
            SegmentKind::GroundDischarge => "ground discharge",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-segment design inputs consumed by the networks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentSettings {
    /// Power-coefficient seeds keyed by `"{line}.{propulsor}"` or by
    /// propulsor tag alone
    pub power_coefficient_overrides: BTreeMap<String, f64>,
    /// Charge current for recharge segments, discharge current for ground
    /// discharge segments (A, positive)
    pub ground_current: Option<f64>,
}

impl SegmentSettings {
    /// Override for a propulsor, the qualified key winning over the bare tag.
    pub fn power_coefficient_override(&self, line: &str, propulsor: &str) -> Option<f64> {
        self.power_coefficient_overrides
            .get(&format!("{line}.{propulsor}"))
            .or_else(|| self.power_coefficient_overrides.get(propulsor))
            .copied()
    }
}

/// One mission phase: its conditions, unknowns and residuals.
///
/// The segment owns all three for its own duration only.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub tag: String,
    pub kind: SegmentKind,
    pub settings: SegmentSettings,
    pub conditions: ConditionBlock,
    pub unknowns: StateVector,
    pub residuals: StateVector,
}

impl Segment {
    pub fn new(tag: impl Into<String>, kind: SegmentKind, n_points: usize) -> Self {
        Self {
            tag: tag.into(),
            kind,
            settings: SegmentSettings::default(),
            conditions: ConditionBlock::new(n_points),
            unknowns: StateVector::new(n_points),
            residuals: StateVector::new(n_points),
        }
    }

    pub fn with_settings(mut self, settings: SegmentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn n_points(&self) -> usize {
        self.conditions.n_points
    }
}
