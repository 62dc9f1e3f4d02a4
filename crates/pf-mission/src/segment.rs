//! Segment definition and the per-segment solve.
//!
//! The Newton solver sees one flat vector: every network's unknowns plus the
//! throttle when it is trimmed. Each residual evaluation runs the full
//! contract (unpack, evaluate, residuals) on every network.

use crate::error::{MissionError, MissionResult};
use crate::profile::Profile;
use crate::throttle::{ThrottleControl, ThrustDemand};
use nalgebra::DVector;
use pf_components::Atmosphere;
use pf_core::Constants;
use pf_network::{EnergyNetwork, NetworkTotals, Segment, SegmentSettings};
use pf_solver::{Bounds, NewtonConfig, NonlinearSystem, SolverError, SolverResult, solve_system};
use std::collections::BTreeMap;
use tracing::{debug, trace};

pub const THROTTLE: &str = "throttle";
pub const THRUST: &str = "thrust";

/// Lower bound on rotor power-coefficient guesses.
const MIN_POWER_COEFFICIENT: f64 = 1e-6;
/// Lower bound on loaded-voltage guesses (V).
const MIN_VOLTAGE: f64 = 1e-3;

/// One mission segment as configured.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentSpec {
    pub tag: String,
    pub profile: Profile,
    pub n_points: usize,
    pub throttle: ThrottleControl,
    /// Rotor collective pitch (rad)
    pub pitch: f64,
    /// Power-coefficient seeds keyed by `"{line}.{propulsor}"` or propulsor tag
    pub power_coefficient_overrides: BTreeMap<String, f64>,
}

impl SegmentSpec {
    pub fn new(tag: impl Into<String>, profile: Profile, n_points: usize) -> Self {
        Self {
            tag: tag.into(),
            profile,
            n_points,
            throttle: ThrottleControl::Fixed(1.0),
            pitch: 0.0,
            power_coefficient_overrides: BTreeMap::new(),
        }
    }

    pub fn with_throttle(mut self, throttle: ThrottleControl) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_power_coefficient(mut self, key: impl Into<String>, cp: f64) -> Self {
        self.power_coefficient_overrides.insert(key.into(), cp);
        self
    }

    pub fn validate(&self) -> MissionResult<()> {
        if self.n_points < 2 {
            return Err(MissionError::InvalidSegment {
                segment: self.tag.clone(),
                what: format!("needs at least 2 points, got {}", self.n_points),
            });
        }
        self.profile.validate(&self.tag)
    }

    /// Segment with kinematics and throttle filled in, networks not yet
    /// declared.
    pub fn build(&self, atmosphere: &Atmosphere) -> MissionResult<Segment> {
        self.validate()?;
        let settings = SegmentSettings {
            power_coefficient_overrides: self.power_coefficient_overrides.clone(),
            ground_current: self.profile.ground_current(),
        };
        let mut segment =
            Segment::new(self.tag.clone(), self.profile.kind(), self.n_points).with_settings(settings);
        self.profile.fill(&mut segment.conditions, atmosphere);
        segment.conditions.throttle = vec![self.throttle.initial(); self.n_points];
        segment.conditions.pitch = vec![self.pitch; self.n_points];
        Ok(segment)
    }
}

/// Outcome of one solved segment.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentResult {
    pub segment: Segment,
    pub converged: bool,
    pub iterations: usize,
    pub residual_norm: f64,
}

/// Shared inputs for solving a segment.
#[derive(Clone, Copy, Debug)]
pub struct SolveContext<'a> {
    pub constants: &'a Constants,
    pub atmosphere: &'a Atmosphere,
    pub newton: &'a NewtonConfig,
    pub thrust_demand: Option<&'a dyn ThrustDemand>,
    /// Vehicle mass at the first point (kg)
    pub initial_mass: f64,
}

struct SegmentSystem<'a> {
    networks: &'a [EnergyNetwork],
    segment: &'a mut Segment,
    constants: &'a Constants,
    demand: Option<&'a dyn ThrustDemand>,
    flight_path_angle: f64,
    initial_mass: f64,
    /// First typed error raised inside an evaluation
    failure: Option<MissionError>,
}

impl SegmentSystem<'_> {
    fn evaluate(&mut self, x: &DVector<f64>) -> MissionResult<DVector<f64>> {
        let segment = &mut *self.segment;
        segment.unknowns.unpack(x)?;
        if let Some(throttle) = segment.unknowns.get(THROTTLE) {
            segment.conditions.throttle.copy_from_slice(throttle);
        }

        let n = segment.n_points();
        let mut totals = NetworkTotals::zeros(n);
        for network in self.networks {
            network.unpack_unknowns(segment)?;
            totals.accumulate(&network.evaluate_thrust(segment, self.constants)?);
            network.residuals(segment)?;
        }
        totals.write_into(&mut segment.conditions);

        let cond = &mut segment.conditions;
        cond.vehicle_mass[0] = self.initial_mass;
        for i in 1..n {
            let dt = cond.time[i] - cond.time[i - 1];
            cond.vehicle_mass[i] = cond.vehicle_mass[i - 1] - cond.total_mass_rate[i - 1] * dt;
        }

        if let Some(demand) = self.demand {
            let cond = &segment.conditions;
            let r = segment.residuals.require_mut(THRUST)?;
            for (i, r) in r.iter_mut().enumerate() {
                let [x, y, z] = cond.total_thrust[i];
                let thrust = (x * x + y * y + z * z).sqrt();
                let required = demand.required_thrust(
                    &cond.freestream.point(i),
                    cond.vehicle_mass[i],
                    self.flight_path_angle,
                    self.constants,
                );
                *r = thrust - required;
            }
        }

        segment.residuals.ensure_finite()?;
        Ok(segment.residuals.pack())
    }
}

impl NonlinearSystem for SegmentSystem<'_> {
    fn dimension(&self) -> usize {
        self.segment.unknowns.flat_len()
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        match self.evaluate(x) {
            Ok(r) => Ok(r),
            Err(e) => {
                let solver_error = SolverError::from(e.clone());
                self.failure.get_or_insert(e);
                Err(solver_error)
            }
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        let unknowns = &self.segment.unknowns;
        let n = unknowns.n_points();
        let mut lower = Vec::with_capacity(unknowns.flat_len());
        let mut upper = Vec::with_capacity(unknowns.flat_len());
        for name in unknowns.names() {
            let (lo, hi) = bounds_for(name);
            lower.extend(std::iter::repeat_n(lo, n));
            upper.extend(std::iter::repeat_n(hi, n));
        }
        Bounds::new(DVector::from_vec(lower), DVector::from_vec(upper)).ok()
    }
}

fn bounds_for(name: &str) -> (f64, f64) {
    if name == THROTTLE {
        (0.0, 1.0)
    } else if name.ends_with(".rotor_power_coefficient") {
        (MIN_POWER_COEFFICIENT, f64::INFINITY)
    } else if name.ends_with(".voltage_under_load") {
        (MIN_VOLTAGE, f64::INFINITY)
    } else if name.ends_with(".recharge_current") {
        (0.0, f64::INFINITY)
    } else {
        (f64::NEG_INFINITY, f64::INFINITY)
    }
}

/// Declare, seed, solve and finalize one segment on every network.
pub fn solve_segment(
    networks: &mut [EnergyNetwork],
    spec: &SegmentSpec,
    ctx: &SolveContext<'_>,
) -> MissionResult<SegmentResult> {
    let mut segment = spec.build(ctx.atmosphere)?;
    for network in networks.iter() {
        network.declare_unknowns_and_residuals(&mut segment)?;
    }

    let demand = if spec.throttle.is_trimmed() && segment.kind.is_in_flight() {
        let demand = ctx.thrust_demand.ok_or_else(|| MissionError::InvalidSegment {
            segment: spec.tag.clone(),
            what: "trimmed throttle needs a thrust demand model".into(),
        })?;
        segment.unknowns.declare(THROTTLE, spec.throttle.initial())?;
        segment.residuals.declare(THRUST, 0.0)?;
        Some(demand)
    } else {
        None
    };

    for network in networks.iter() {
        network.append_initial_conditions(&mut segment)?;
    }
    debug!(
        segment = %spec.tag,
        kind = %segment.kind,
        unknowns = segment.unknowns.flat_len(),
        "segment declared"
    );

    let x0 = segment.unknowns.pack();
    let result = {
        let mut system = SegmentSystem {
            networks,
            segment: &mut segment,
            constants: ctx.constants,
            demand,
            flight_path_angle: spec.profile.flight_path_angle(),
            initial_mass: ctx.initial_mass,
            failure: None,
        };
        match solve_system(&mut system, x0, ctx.newton) {
            Ok(result) => {
                // Leave the condition block at the returned iterate.
                system.evaluate(&result.x)?;
                result
            }
            Err(e) => return Err(system.failure.take().unwrap_or(e.into())),
        }
    };
    trace!(segment = %spec.tag, iterations = result.iterations, "segment solved");

    for network in networks.iter_mut() {
        network.finalize_segment(&segment)?;
    }

    Ok(SegmentResult {
        segment,
        converged: result.converged,
        iterations: result.iterations,
        residual_norm: result.residual_norm,
    })
}
