//! Energy networks.
//!
//! A network owns its distribution lines and drives them through the
//! segment contract:
//!
//! 1. [`EnergyNetwork::declare_unknowns_and_residuals`] allocates records and
//!    names every unknown with its seed.
//! 2. [`EnergyNetwork::append_initial_conditions`] seeds row 0 of every
//!    carried state.
//! 3. Per solver iteration: [`EnergyNetwork::unpack_unknowns`],
//!    [`EnergyNetwork::evaluate_thrust`], [`EnergyNetwork::residuals`].
//! 4. [`EnergyNetwork::finalize_segment`] stores last rows for the next
//!    segment.

use crate::bus::Bus;
use crate::conditions::{ConditionBlock, CoolantConditions, LineConditions, Vec3, add3};
use crate::coolant_line::CoolantLine;
use crate::error::{NetworkError, NetworkResult};
use crate::fuel_line::FuelLine;
use crate::segment::{Segment, SegmentKind};
use pf_core::{Constants, TagMap};
use std::collections::BTreeSet;
use tracing::debug;

/// Lines making up a network.
#[derive(Clone, Debug, Default)]
pub struct NetworkLines {
    pub buses: TagMap<Bus>,
    pub fuel_lines: TagMap<FuelLine>,
    pub coolant_lines: TagMap<CoolantLine>,
}

impl NetworkLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus(mut self, bus: Bus) -> NetworkResult<Self> {
        self.buses.insert(bus.tag.clone(), bus)?;
        Ok(self)
    }

    pub fn with_fuel_line(mut self, line: FuelLine) -> NetworkResult<Self> {
        self.fuel_lines.insert(line.tag.clone(), line)?;
        Ok(self)
    }

    pub fn with_coolant_line(mut self, line: CoolantLine) -> NetworkResult<Self> {
        self.coolant_lines.insert(line.tag.clone(), line)?;
        Ok(self)
    }

    fn validate(&self) -> NetworkResult<()> {
        let mut tags = BTreeSet::new();
        let all = self
            .buses
            .keys()
            .chain(self.fuel_lines.keys())
            .chain(self.coolant_lines.keys());
        for tag in all {
            if !tags.insert(tag) {
                return Err(NetworkError::Configuration {
                    what: format!("line tag '{tag}' used twice"),
                });
            }
        }
        for bus in self.buses.values() {
            bus.validate()?;
        }
        for line in self.fuel_lines.values() {
            line.validate()?;
        }
        for cl in self.coolant_lines.values() {
            let bus = self.buses.get(&cl.bus).ok_or_else(|| NetworkError::Configuration {
                what: format!("coolant line '{}' references unknown bus '{}'", cl.tag, cl.bus),
            })?;
            if !bus.batteries.contains(&cl.battery) {
                return Err(NetworkError::Configuration {
                    what: format!(
                        "coolant line '{}' references unknown battery '{}.{}'",
                        cl.tag, cl.bus, cl.battery
                    ),
                });
            }
            if cl.active && !bus.active {
                return Err(NetworkError::Configuration {
                    what: format!("coolant line '{}' is active on inactive bus '{}'", cl.tag, cl.bus),
                });
            }
        }
        Ok(())
    }
}

/// Vehicle-level sums over one network's lines, per time point.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkTotals {
    pub thrust: Vec<Vec3>,
    pub moment: Vec<Vec3>,
    pub power: Vec<f64>,
    pub mass_rate: Vec<f64>,
}

impl NetworkTotals {
    pub fn zeros(n: usize) -> Self {
        Self {
            thrust: vec![[0.0; 3]; n],
            moment: vec![[0.0; 3]; n],
            power: vec![0.0; n],
            mass_rate: vec![0.0; n],
        }
    }

    pub fn accumulate(&mut self, other: &NetworkTotals) {
        for i in 0..self.power.len() {
            self.thrust[i] = add3(self.thrust[i], other.thrust[i]);
            self.moment[i] = add3(self.moment[i], other.moment[i]);
            self.power[i] += other.power[i];
            self.mass_rate[i] += other.mass_rate[i];
        }
    }

    /// Overwrite the segment totals.
    pub fn write_into(&self, conditions: &mut ConditionBlock) {
        conditions.total_thrust.clone_from(&self.thrust);
        conditions.total_moment.clone_from(&self.moment);
        conditions.total_power.clone_from(&self.power);
        conditions.total_mass_rate.clone_from(&self.mass_rate);
    }
}

/// Network variants. Each constrains which lines it may hold.
#[derive(Clone, Debug)]
pub enum EnergyNetwork {
    /// Battery buses with electric propulsors
    AllElectric { tag: String, lines: NetworkLines },
    /// Fuel lines only
    ConventionalFuel { tag: String, lines: NetworkLines },
    /// Battery buses without propulsors, loaded by auxiliary power or a
    /// ground current
    IsolatedBatteryCell { tag: String, lines: NetworkLines },
    /// Any mix of buses and fuel lines
    Hybrid { tag: String, lines: NetworkLines },
}

impl EnergyNetwork {
    pub fn all_electric(tag: impl Into<String>, lines: NetworkLines) -> NetworkResult<Self> {
        let tag = tag.into();
        if !lines.fuel_lines.is_empty() {
            return Err(variant_error(&tag, "an all-electric network cannot hold fuel lines"));
        }
        if lines.buses.is_empty() {
            return Err(variant_error(&tag, "an all-electric network needs a bus"));
        }
        lines.validate()?;
        Ok(Self::AllElectric { tag, lines })
    }

    pub fn conventional_fuel(tag: impl Into<String>, lines: NetworkLines) -> NetworkResult<Self> {
        let tag = tag.into();
        if !lines.buses.is_empty() || !lines.coolant_lines.is_empty() {
            return Err(variant_error(&tag, "a fuel network holds fuel lines only"));
        }
        if lines.fuel_lines.is_empty() {
            return Err(variant_error(&tag, "a fuel network needs a fuel line"));
        }
        lines.validate()?;
        Ok(Self::ConventionalFuel { tag, lines })
    }

    pub fn isolated_battery_cell(tag: impl Into<String>, lines: NetworkLines) -> NetworkResult<Self> {
        let tag = tag.into();
        if !lines.fuel_lines.is_empty() {
            return Err(variant_error(&tag, "a battery-cell network cannot hold fuel lines"));
        }
        if lines.buses.values().any(Bus::has_propulsors) {
            return Err(variant_error(&tag, "a battery-cell network has no propulsors"));
        }
        if lines.buses.is_empty() {
            return Err(variant_error(&tag, "a battery-cell network needs a bus"));
        }
        lines.validate()?;
        Ok(Self::IsolatedBatteryCell { tag, lines })
    }

    pub fn hybrid(tag: impl Into<String>, lines: NetworkLines) -> NetworkResult<Self> {
        let tag = tag.into();
        if lines.buses.is_empty() && lines.fuel_lines.is_empty() {
            return Err(variant_error(&tag, "a hybrid network needs at least one line"));
        }
        lines.validate()?;
        Ok(Self::Hybrid { tag, lines })
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::AllElectric { tag, .. }
            | Self::ConventionalFuel { tag, .. }
            | Self::IsolatedBatteryCell { tag, .. }
            | Self::Hybrid { tag, .. } => tag,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::AllElectric { .. } => "all-electric",
            Self::ConventionalFuel { .. } => "conventional fuel",
            Self::IsolatedBatteryCell { .. } => "isolated battery cell",
            Self::Hybrid { .. } => "hybrid",
        }
    }

    pub fn lines(&self) -> &NetworkLines {
        match self {
            Self::AllElectric { lines, .. }
            | Self::ConventionalFuel { lines, .. }
            | Self::IsolatedBatteryCell { lines, .. }
            | Self::Hybrid { lines, .. } => lines,
        }
    }

    fn lines_mut(&mut self) -> &mut NetworkLines {
        match self {
            Self::AllElectric { lines, .. }
            | Self::ConventionalFuel { lines, .. }
            | Self::IsolatedBatteryCell { lines, .. }
            | Self::Hybrid { lines, .. } => lines,
        }
    }

    pub fn supports(&self, kind: SegmentKind) -> bool {
        !matches!(
            (self, kind),
            (Self::ConventionalFuel { .. }, SegmentKind::Recharge)
        )
    }

    fn check_supported(&self, kind: SegmentKind) -> NetworkResult<()> {
        if self.supports(kind) {
            Ok(())
        } else {
            Err(NetworkError::UnsupportedSegment {
                network: self.tag().to_string(),
                kind: kind.name(),
            })
        }
    }

    /// Allocate line records and declare every unknown and residual.
    ///
    /// Fails before any evaluation when a seed is missing.
    pub fn declare_unknowns_and_residuals(&self, segment: &mut Segment) -> NetworkResult<()> {
        self.check_supported(segment.kind)?;
        let lines = self.lines();
        for bus in lines.buses.values().filter(|b| b.active) {
            bus.declare(segment)?;
        }
        for line in lines.fuel_lines.values().filter(|l| l.active) {
            line.declare(segment)?;
        }
        for cl in lines.coolant_lines.values().filter(|c| c.active) {
            let mut record = LineConditions::new(segment.n_points());
            record.coolant = Some(CoolantConditions::new(segment.n_points()));
            segment.conditions.energy.insert(cl.tag.clone(), record)?;
        }
        debug!(
            network = self.tag(),
            segment = %segment.tag,
            unknowns = segment.unknowns.len(),
            "declared unknowns"
        );
        Ok(())
    }

    /// Seed row 0 of every carried state from the previous segment's last
    /// row, or from the initial values on the first segment.
    pub fn append_initial_conditions(&self, segment: &mut Segment) -> NetworkResult<()> {
        let lines = self.lines();
        for bus in lines.buses.values().filter(|b| b.active) {
            bus.append_initial_conditions(segment)?;
        }
        for line in lines.fuel_lines.values().filter(|l| l.active) {
            line.append_initial_conditions(segment)?;
        }
        for cl in lines.coolant_lines.values().filter(|c| c.active) {
            let record = segment
                .conditions
                .line_mut(&cl.tag)?
                .coolant
                .as_mut()
                .ok_or_else(|| NetworkError::Invariant {
                    what: format!("coolant line '{}' has no record", cl.tag),
                })?;
            cl.append_initial_conditions(record);
        }
        Ok(())
    }

    pub fn unpack_unknowns(&self, segment: &mut Segment) -> NetworkResult<()> {
        let lines = self.lines();
        for bus in lines.buses.values().filter(|b| b.active) {
            bus.unpack(segment)?;
        }
        for line in lines.fuel_lines.values().filter(|l| l.active) {
            line.unpack(segment)?;
        }
        Ok(())
    }

    /// Evaluate every line at the current unknowns and sum thrust, moment,
    /// power and fuel flow over the lines.
    pub fn evaluate_thrust(
        &self,
        segment: &mut Segment,
        constants: &Constants,
    ) -> NetworkResult<NetworkTotals> {
        let lines = self.lines();
        let recharging = segment.kind == SegmentKind::Recharge;
        for bus in lines.buses.values().filter(|b| b.active) {
            bus.evaluate_propulsors(segment, constants)?;
            bus.energy_calc(segment, &lines.coolant_lines, recharging)?;
        }
        for line in lines.fuel_lines.values().filter(|l| l.active) {
            line.evaluate_propulsors(segment, constants)?;
            line.energy_calc(segment)?;
        }

        let n = segment.n_points();
        let mut totals = NetworkTotals::zeros(n);
        for tag in lines
            .buses
            .values()
            .filter(|b| b.active)
            .map(|b| &b.tag)
            .chain(lines.fuel_lines.values().filter(|l| l.active).map(|l| &l.tag))
        {
            let line = segment.conditions.line(tag)?;
            for p in line.propulsors.values() {
                for i in 0..n {
                    totals.thrust[i] = add3(totals.thrust[i], p.thrust[i]);
                    totals.moment[i] = add3(totals.moment[i], p.moment[i]);
                }
            }
            for i in 0..n {
                totals.power[i] += line.power[i];
                totals.mass_rate[i] += line.mass_rate[i];
            }
        }
        Ok(totals)
    }

    /// Fill every declared residual and check them for non-finite values.
    pub fn residuals(&self, segment: &mut Segment) -> NetworkResult<()> {
        let lines = self.lines();
        for bus in lines.buses.values().filter(|b| b.active) {
            bus.residuals(segment)?;
        }
        for line in lines.fuel_lines.values().filter(|l| l.active) {
            line.residuals(segment)?;
        }
        segment.residuals.ensure_finite()
    }

    /// One full pass of the per-iteration contract for a vehicle with this
    /// network alone: unpack, evaluate, write totals, residuals.
    pub fn evaluate(&self, segment: &mut Segment, constants: &Constants) -> NetworkResult<()> {
        self.unpack_unknowns(segment)?;
        let totals = self.evaluate_thrust(segment, constants)?;
        totals.write_into(&mut segment.conditions);
        self.residuals(segment)
    }

    /// Store the last row of every carried state for the next segment.
    pub fn finalize_segment(&mut self, segment: &Segment) -> NetworkResult<()> {
        let lines = self.lines_mut();
        for bus in lines.buses.values_mut().filter(|b| b.active) {
            bus.commit(segment)?;
        }
        for line in lines.fuel_lines.values_mut().filter(|l| l.active) {
            line.commit(segment)?;
        }
        for cl in lines.coolant_lines.values_mut().filter(|c| c.active) {
            let record = segment
                .conditions
                .line(&cl.tag)?
                .coolant
                .as_ref()
                .ok_or_else(|| NetworkError::Invariant {
                    what: format!("coolant line '{}' has no record", cl.tag),
                })?;
            cl.commit(record);
        }
        Ok(())
    }

    /// Forget carried states so the next segment starts from initial values.
    pub fn reset(&mut self) {
        let lines = self.lines_mut();
        for bus in lines.buses.values_mut() {
            bus.reset();
        }
        for line in lines.fuel_lines.values_mut() {
            line.reset();
        }
        for cl in lines.coolant_lines.values_mut() {
            cl.reset();
        }
    }

    /// Mass of every battery pack (kg).
    pub fn battery_mass(&self) -> f64 {
        self.lines()
            .buses
            .values()
            .flat_map(|b| b.batteries.values())
            .map(|s| s.pack.mass())
            .sum()
    }
}

fn variant_error(tag: &str, what: &str) -> NetworkError {
    NetworkError::Configuration {
        what: format!("network '{tag}': {what}"),
    }
}
