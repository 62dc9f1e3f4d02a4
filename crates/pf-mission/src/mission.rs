//! Mission runner.

use crate::error::{MissionError, MissionResult};
use crate::results::MissionResults;
use crate::segment::{SegmentSpec, SolveContext, solve_segment};
use crate::vehicle::Vehicle;
use pf_components::Atmosphere;
use pf_core::Constants;
use pf_solver::NewtonConfig;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct MissionConfig {
    pub newton: NewtonConfig,
    pub constants: Constants,
    pub atmosphere: Atmosphere,
    /// Turn a non-converged segment into an error instead of a warning
    pub fail_on_nonconvergence: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            newton: NewtonConfig {
                abs_tol: 1e-8,
                ..NewtonConfig::default()
            },
            constants: Constants::default(),
            atmosphere: Atmosphere::default(),
            fail_on_nonconvergence: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Mission {
    pub tag: String,
    pub segments: Vec<SegmentSpec>,
    pub config: MissionConfig,
}

impl Mission {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            segments: Vec::new(),
            config: MissionConfig::default(),
        }
    }

    pub fn with_segment(mut self, segment: SegmentSpec) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_config(mut self, config: MissionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validate(&self) -> MissionResult<()> {
        let mut tags = BTreeSet::new();
        for spec in &self.segments {
            if !tags.insert(spec.tag.as_str()) {
                return Err(MissionError::InvalidSegment {
                    segment: spec.tag.clone(),
                    what: "segment tag used twice".into(),
                });
            }
            spec.validate()?;
        }
        Ok(())
    }

    /// Fly every segment in order. Sources start from their initial values
    /// and carry their state from one segment to the next.
    pub fn run(&self, vehicle: &mut Vehicle) -> MissionResult<MissionResults> {
        self.validate()?;
        vehicle.reset_networks();
        let mut mass = vehicle.mass();
        info!(mission = %self.tag, vehicle = %vehicle.tag, mass, "mission start");

        let mut results = MissionResults::default();
        for spec in &self.segments {
            let ctx = SolveContext {
                constants: &self.config.constants,
                atmosphere: &self.config.atmosphere,
                newton: &self.config.newton,
                thrust_demand: vehicle.thrust_demand.as_deref(),
                initial_mass: mass,
            };
            let result = solve_segment(&mut vehicle.networks, spec, &ctx)?;
            if result.converged {
                info!(
                    segment = %spec.tag,
                    iterations = result.iterations,
                    residual = result.residual_norm,
                    "segment converged"
                );
            } else {
                warn!(
                    segment = %spec.tag,
                    iterations = result.iterations,
                    residual = result.residual_norm,
                    "segment did not converge"
                );
                if self.config.fail_on_nonconvergence {
                    return Err(MissionError::NotConverged {
                        segment: spec.tag.clone(),
                        residual_norm: result.residual_norm,
                    });
                }
            }
            if let Some(&m) = result.segment.conditions.vehicle_mass.last() {
                mass = m;
            }
            results.segments.push(result);
        }
        Ok(results)
    }
}
