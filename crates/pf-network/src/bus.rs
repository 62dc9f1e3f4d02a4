//! Electric bus: batteries in parallel feeding ESC-motor-rotor chains.
//!
//! Battery state is integrated sequentially over the segment's time points
//! by forward Euler; everything else is array-wise. Batteries on one bus
//! share the terminal voltage and split the bus current by their internal
//! resistance.

use crate::chain::{ChainInputs, PropulsorChain};
use crate::conditions::{BatteryConditions, CoolantConditions};
use crate::coolant_line::CoolantLine;
use crate::error::{NetworkError, NetworkResult};
use crate::names;
use crate::propulsion;
use crate::segment::{Segment, SegmentKind};
use pf_components::common::EPSILON_POWER;
use pf_components::{BatteryLoad, BatteryPack, BatteryState, ThermalEnvironment};
use pf_core::{Constants, TagMap};
use tracing::{debug, trace};

/// Tolerance on `soc + dod = 1`.
const SOC_DOD_TOLERANCE: f64 = 1e-12;

/// A battery pack and its carried state.
#[derive(Clone, Debug)]
pub struct BatterySource {
    pub pack: BatteryPack,
    /// State of charge at the start of the mission; `None` is an empty pack
    pub initial_soc: Option<f64>,
    pub initial_temperature: f64,
    /// Pins the pack temperature instead of integrating it
    pub temperature_override: Option<f64>,
    /// Convective conductance to the freestream (W/K)
    pub ambient_conductance: f64,
    final_row: Option<BatteryState>,
}

impl BatterySource {
    pub fn new(pack: BatteryPack) -> Self {
        Self {
            initial_temperature: pack.cell.reference_temperature,
            pack,
            initial_soc: None,
            temperature_override: None,
            ambient_conductance: 0.0,
            final_row: None,
        }
    }

    pub fn with_initial_soc(mut self, soc: f64) -> NetworkResult<Self> {
        if !(0.0..=1.0).contains(&soc) {
            return Err(NetworkError::Configuration {
                what: format!("battery '{}' initial SOC {soc} outside [0,1]", self.pack.tag),
            });
        }
        self.initial_soc = Some(soc);
        Ok(self)
    }

    pub fn with_initial_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    pub fn with_temperature_override(mut self, temperature: f64) -> Self {
        self.temperature_override = Some(temperature);
        self
    }

    pub fn with_ambient_conductance(mut self, conductance: f64) -> Self {
        self.ambient_conductance = conductance.max(0.0);
        self
    }

    /// State for row 0 of the next segment.
    pub fn initial_state(&self) -> BatteryState {
        match self.final_row {
            Some(state) => state,
            None => BatteryState {
                soc: self.initial_soc.unwrap_or(0.0),
                temperature: self
                    .temperature_override
                    .unwrap_or(self.initial_temperature),
                ..BatteryState::default()
            },
        }
    }

    pub fn final_row(&self) -> Option<&BatteryState> {
        self.final_row.as_ref()
    }

    pub(crate) fn commit(&mut self, state: BatteryState) {
        self.final_row = Some(state);
    }

    pub(crate) fn reset(&mut self) {
        self.final_row = None;
    }
}

#[derive(Clone, Debug)]
pub struct Bus {
    pub tag: String,
    pub active: bool,
    pub identical_propulsors: bool,
    /// Constant avionics and payload draw (W)
    pub auxiliary_power: f64,
    pub batteries: TagMap<BatterySource>,
    pub propulsors: TagMap<PropulsorChain>,
}

impl Bus {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            active: true,
            identical_propulsors: false,
            auxiliary_power: 0.0,
            batteries: TagMap::new(),
            propulsors: TagMap::new(),
        }
    }

    pub fn with_identical_propulsors(mut self, identical: bool) -> Self {
        self.identical_propulsors = identical;
        self
    }

    pub fn with_auxiliary_power(mut self, power: f64) -> Self {
        self.auxiliary_power = power;
        self
    }

    pub fn add_battery(&mut self, source: BatterySource) -> NetworkResult<()> {
        self.batteries.insert(source.pack.tag.clone(), source)?;
        Ok(())
    }

    pub fn add_propulsor(&mut self, chain: PropulsorChain) -> NetworkResult<()> {
        self.propulsors.insert(chain.tag.clone(), chain)?;
        Ok(())
    }

    pub fn has_propulsors(&self) -> bool {
        !self.propulsors.is_empty()
    }

    /// Seed for the loaded-voltage unknown.
    pub fn nominal_voltage(&self) -> Option<f64> {
        self.batteries.values().next().map(|b| b.pack.nominal_voltage())
    }

    pub fn validate(&self) -> NetworkResult<()> {
        if self.batteries.is_empty() {
            return Err(NetworkError::Configuration {
                what: format!("bus '{}' has no battery", self.tag),
            });
        }
        if let Some(chain) = self.propulsors.values().find(|c| !c.is_electric()) {
            return Err(NetworkError::Configuration {
                what: format!("bus '{}' carries non-electric propulsor '{}'", self.tag, chain.tag),
            });
        }
        if !(self.auxiliary_power.is_finite() && self.auxiliary_power >= 0.0) {
            return Err(NetworkError::Configuration {
                what: format!("bus '{}' auxiliary power must be non-negative", self.tag),
            });
        }
        if self.identical_propulsors {
            propulsion::validate_identical(&self.tag, &self.propulsors)?;
        }
        Ok(())
    }

    /// Allocate this bus's records and declare its unknowns and residuals.
    pub fn declare(&self, segment: &mut Segment) -> NetworkResult<()> {
        let n = segment.n_points();
        let mut line = crate::conditions::LineConditions::new(n);
        propulsion::allocate(&self.propulsors, n, &mut line)?;
        for source in self.batteries.values() {
            line.batteries
                .insert(source.pack.tag.clone(), BatteryConditions::new(n))?;
        }
        segment.conditions.energy.insert(self.tag.clone(), line)?;

        match segment.kind {
            SegmentKind::Recharge => {
                let seed = match segment.settings.ground_current {
                    Some(i) => i,
                    None => self
                        .batteries
                        .values()
                        .map(|b| b.pack.cell.max_charge_current * b.pack.parallel as f64)
                        .sum(),
                };
                segment
                    .unknowns
                    .declare(names::recharge_current(&self.tag), seed)?;
                segment
                    .residuals
                    .declare(names::recharge_current(&self.tag), 0.0)?;
            }
            kind => {
                if kind.is_in_flight() {
                    propulsion::declare(
                        segment,
                        &self.tag,
                        &self.propulsors,
                        self.identical_propulsors,
                    )?;
                }
                let seed = self.nominal_voltage().ok_or_else(|| NetworkError::Configuration {
                    what: format!("bus '{}' has no battery", self.tag),
                })?;
                segment
                    .unknowns
                    .declare(names::voltage_under_load(&self.tag), seed)?;
                segment.residuals.declare(names::voltage(&self.tag), 0.0)?;
            }
        }
        Ok(())
    }

    /// Row 0 of every battery record: the initial state on the first
    /// segment, else the previous segment's last row unchanged.
    pub fn append_initial_conditions(&self, segment: &mut Segment) -> NetworkResult<()> {
        let line = segment.conditions.line_mut(&self.tag)?;
        for source in self.batteries.values() {
            let record = line.batteries.require_mut(&source.pack.tag)?;
            if record.is_empty() {
                continue;
            }
            record.set_state(0, &source.initial_state());
        }
        Ok(())
    }

    pub fn unpack(&self, segment: &mut Segment) -> NetworkResult<()> {
        let unknowns = &segment.unknowns;
        let line = segment.conditions.energy.require_mut(&self.tag)?;
        if segment.kind == SegmentKind::Recharge {
            let guess = unknowns.require(&names::recharge_current(&self.tag))?;
            line.recharge_current.copy_from_slice(guess);
            return Ok(());
        }
        let guess = unknowns.require(&names::voltage_under_load(&self.tag))?;
        line.voltage_under_load.copy_from_slice(guess);
        if segment.kind.is_in_flight() {
            propulsion::unpack(
                unknowns,
                &self.tag,
                &self.propulsors,
                self.identical_propulsors,
                line,
            )?;
        }
        Ok(())
    }

    /// Evaluate the propulsor chains at the current voltage guess.
    ///
    /// Propulsors are idle on the ground.
    pub fn evaluate_propulsors(&self, segment: &mut Segment, constants: &Constants) -> NetworkResult<()> {
        if !segment.kind.is_in_flight() {
            return Ok(());
        }
        let cond = &mut segment.conditions;
        let line = cond.energy.require_mut(&self.tag)?;
        let inputs = ChainInputs {
            freestream: &cond.freestream,
            throttle: &cond.throttle,
            pitch: &cond.pitch,
            bus_voltage: &line.voltage_under_load,
            constants,
        };
        propulsion::evaluate(
            &self.propulsors,
            self.identical_propulsors,
            &inputs,
            &mut line.propulsors,
        )
    }

    /// Sequential battery (and coolant) integration over the segment.
    ///
    /// Coolant loops serving this bus's batteries are advanced in the same
    /// pass; their pump and fan power loads the bus.
    pub fn energy_calc(
        &self,
        segment: &mut Segment,
        coolant_lines: &TagMap<CoolantLine>,
        recharging: bool,
    ) -> NetworkResult<()> {
        let n = segment.n_points();
        let ground_current = segment.settings.ground_current;

        // Coolant records are taken out while the bus record is borrowed.
        let mut loops: Vec<(&CoolantLine, usize, CoolantConditions)> = Vec::new();
        for cl in coolant_lines.values().filter(|c| c.active && c.bus == self.tag) {
            let k = self.batteries.index_of(&cl.battery).ok_or_else(|| {
                NetworkError::Configuration {
                    what: format!("coolant line '{}' cools unknown battery '{}'", cl.tag, cl.battery),
                }
            })?;
            let record = segment
                .conditions
                .line_mut(&cl.tag)?
                .coolant
                .take()
                .ok_or_else(|| NetworkError::Invariant {
                    what: format!("coolant line '{}' has no record", cl.tag),
                })?;
            loops.push((cl, k, record));
        }

        let discharge_current = match segment.kind {
            SegmentKind::GroundDischarge => ground_current.unwrap_or(0.0),
            _ => 0.0,
        };
        let cond = &mut segment.conditions;
        let time = &cond.time;
        let freestream = &cond.freestream;
        let line = cond.energy.require_mut(&self.tag)?;
        let sources: Vec<&BatterySource> = self.batteries.values().collect();

        for i in 0..n {
            let dt = if i + 1 < n { time[i + 1] - time[i] } else { 0.0 };
            let fs = freestream.point(i);
            let states: Vec<BatteryState> = line.batteries.values().map(|b| b.state_at(i)).collect();
            let ocv: Vec<f64> = sources
                .iter()
                .zip(&states)
                .map(|(s, st)| s.pack.open_circuit_voltage(st.soc))
                .collect();
            let resistance: Vec<f64> = sources
                .iter()
                .zip(&states)
                .map(|(s, st)| s.pack.resistance(st))
                .collect();

            let total = if recharging {
                let acceptance: f64 = sources
                    .iter()
                    .zip(&states)
                    .map(|(s, st)| s.pack.allowed_charge_current(st))
                    .sum();
                let allowed = match ground_current {
                    Some(c) => c.min(acceptance),
                    None => acceptance,
                };
                line.allowed_charge_current[i] = allowed;
                line.auxiliary_power[i] = 0.0;
                -line.recharge_current[i]
            } else {
                let aux = self.auxiliary_power
                    + loops.iter().map(|(_, _, c)| c.auxiliary_power(i)).sum::<f64>();
                let v = line.voltage_under_load[i];
                let aux_current = if v.abs() > EPSILON_POWER { aux / v } else { 0.0 };
                let propulsor_current: f64 = line.propulsors.values().map(|p| p.current[i]).sum();
                line.auxiliary_power[i] = aux;
                propulsor_current + aux_current + discharge_current
            };

            let (voltage, currents) = parallel_split(&ocv, &resistance, total);
            line.predicted_voltage[i] = voltage;
            line.current[i] = total;
            line.power[i] = voltage * total;
            if recharging {
                line.voltage_under_load[i] = voltage;
            }

            for (k, (source, record)) in sources.iter().zip(line.batteries.values_mut()).enumerate() {
                let state = states[k];
                let out = source.pack.evaluate(&state, BatteryLoad::Current(currents[k]));
                record.current[i] = out.current;
                record.open_circuit_voltage[i] = out.open_circuit_voltage;
                record.voltage_under_load[i] = out.voltage_under_load;
                record.power[i] = out.power;
                record.resistance[i] = out.resistance;
                record.heat_generated[i] = out.heat_generated;
                record.power_limited[i] = out.power_limited;
                record.recharging[i] = recharging;

                let mut heat_removed = 0.0;
                for (cl, _, c) in loops.iter_mut().filter(|(_, kk, _)| *kk == k) {
                    heat_removed += cl.step(c, i, state.temperature, &fs, dt, i + 1 < n);
                }
                record.heat_removed[i] = heat_removed;

                if i + 1 < n {
                    let env = ThermalEnvironment {
                        ambient_temperature: fs.temperature,
                        conductance: source.ambient_conductance,
                        heat_removed,
                    };
                    let mut next =
                        source
                            .pack
                            .step(&state, &out, dt, &env, source.temperature_override);
                    if i + 2 == n {
                        source.pack.age(&mut next);
                    }
                    record.set_state(i + 1, &next);
                }
            }
            trace!(bus = %self.tag, i, voltage, current = total, "bus point");
        }

        for (tag, record) in line.batteries.iter() {
            check_soc_dod(tag, record)?;
        }

        for (cl, _, record) in loops {
            segment.conditions.line_mut(&cl.tag)?.coolant = Some(record);
        }
        Ok(())
    }

    /// Voltage and charge residuals plus the torque residuals.
    pub fn residuals(&self, segment: &mut Segment) -> NetworkResult<()> {
        let line = segment.conditions.energy.require(&self.tag)?;
        let residuals = &mut segment.residuals;
        if segment.kind == SegmentKind::Recharge {
            let r = residuals.require_mut(&names::recharge_current(&self.tag))?;
            for ((r, guess), allowed) in r
                .iter_mut()
                .zip(&line.recharge_current)
                .zip(&line.allowed_charge_current)
            {
                *r = guess - allowed;
            }
            return Ok(());
        }
        let r = residuals.require_mut(&names::voltage(&self.tag))?;
        for ((r, guess), predicted) in r
            .iter_mut()
            .zip(&line.voltage_under_load)
            .zip(&line.predicted_voltage)
        {
            *r = guess - predicted;
        }
        if segment.kind.is_in_flight() {
            propulsion::residuals(
                residuals,
                &self.tag,
                &self.propulsors,
                self.identical_propulsors,
                line,
            )?;
        }
        Ok(())
    }

    /// Store each battery's last row for the next segment.
    pub(crate) fn commit(&mut self, segment: &Segment) -> NetworkResult<()> {
        let line = segment.conditions.line(&self.tag)?;
        for (tag, source) in self.batteries.iter_mut() {
            let record = line.batteries.require(tag)?;
            if let Some(last) = record.len().checked_sub(1) {
                let state = record.state_at(last);
                debug!(bus = %self.tag, battery = tag, soc = state.soc, "battery final row");
                source.commit(state);
            }
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        for source in self.batteries.values_mut() {
            source.reset();
        }
    }
}

/// Terminal voltage and branch currents for packs in parallel carrying
/// `total` (positive discharging).
pub fn parallel_split(ocv: &[f64], resistance: &[f64], total: f64) -> (f64, Vec<f64>) {
    let conductance: f64 = resistance.iter().map(|r| 1.0 / r).sum();
    let source: f64 = ocv.iter().zip(resistance).map(|(v, r)| v / r).sum();
    let voltage = (source - total) / conductance;
    let currents = ocv
        .iter()
        .zip(resistance)
        .map(|(v, r)| (v - voltage) / r)
        .collect();
    (voltage, currents)
}

fn check_soc_dod(tag: &str, record: &BatteryConditions) -> NetworkResult<()> {
    for (i, (soc, dod)) in record.soc.iter().zip(&record.dod).enumerate() {
        if (soc + dod - 1.0).abs() > SOC_DOD_TOLERANCE {
            return Err(NetworkError::Invariant {
                what: format!("battery '{tag}' row {i}: soc + dod = {}", soc + dod),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pf_components::BatteryCell;

    fn pack(tag: &str) -> BatteryPack {
        BatteryPack::new(tag, BatteryCell::nmc_18650(), 100, 20).unwrap()
    }

    #[test]
    fn single_pack_split_is_ohms_law() {
        let (v, i) = parallel_split(&[400.0], &[0.1], 50.0);
        assert_relative_eq!(v, 395.0, epsilon = 1e-12);
        assert_relative_eq!(i[0], 50.0, epsilon = 1e-12);
    }

    #[test]
    fn parallel_currents_sum_to_total() {
        let (v, i) = parallel_split(&[400.0, 398.0], &[0.1, 0.2], 60.0);
        assert_relative_eq!(i.iter().sum::<f64>(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(400.0 - i[0] * 0.1, v, epsilon = 1e-9);
        assert_relative_eq!(398.0 - i[1] * 0.2, v, epsilon = 1e-9);
    }

    #[test]
    fn unspecified_initial_soc_is_empty() {
        let s = BatterySource::new(pack("p"));
        assert_eq!(s.initial_state().soc, 0.0);
        assert_eq!(s.initial_state().depth_of_discharge(), 1.0);
        let s = BatterySource::new(pack("p")).with_initial_soc(0.4).unwrap();
        assert_eq!(s.initial_state().soc, 0.4);
        assert!(BatterySource::new(pack("p")).with_initial_soc(1.2).is_err());
    }

    #[test]
    fn bus_without_battery_is_rejected() {
        let bus = Bus::new("bus");
        assert!(matches!(bus.validate(), Err(NetworkError::Configuration { .. })));
    }

    #[test]
    fn ground_discharge_drains_at_commanded_current() {
        let mut bus = Bus::new("bus");
        bus.add_battery(BatterySource::new(pack("pack")).with_initial_soc(0.8).unwrap())
            .unwrap();
        let mut seg = Segment::new("ground", SegmentKind::GroundDischarge, 4);
        seg.settings.ground_current = Some(20.0);
        seg.conditions.time = vec![0.0, 60.0, 120.0, 180.0];
        bus.declare(&mut seg).unwrap();
        assert!(seg.unknowns.contains("bus.voltage_under_load"));
        assert!(!seg.unknowns.names().any(|n| n.contains("power_coefficient")));

        bus.append_initial_conditions(&mut seg).unwrap();
        bus.unpack(&mut seg).unwrap();
        bus.energy_calc(&mut seg, &TagMap::new(), false).unwrap();
        let b = seg.conditions.line("bus").unwrap().batteries.require("pack").unwrap();
        assert_eq!(b.soc[0], 0.8);
        assert!(b.soc.windows(2).all(|w| w[1] < w[0]));
        assert!(b.current.iter().all(|&i| (i - 20.0).abs() < 1e-9));
    }
}
