//! Fuel line: tanks feeding piston-rotor or turbojet chains.

use crate::chain::{ChainInputs, PropulsorChain};
use crate::conditions::{FuelTankConditions, LineConditions};
use crate::error::{NetworkError, NetworkResult};
use crate::propulsion;
use crate::segment::Segment;
use pf_components::{FuelTank, FuelTankState};
use pf_core::{Constants, TagMap};
use tracing::{debug, warn};

/// Relative shortfall below which delivery counts as meeting demand.
const STARVATION_TOL: f64 = 1e-9;

#[derive(Clone, Debug)]
pub struct FuelTankSource {
    pub tank: FuelTank,
    /// Fill fraction at the start of the mission
    pub initial_fill: f64,
    final_row: Option<FuelTankState>,
}

impl FuelTankSource {
    pub fn new(tank: FuelTank) -> Self {
        Self {
            tank,
            initial_fill: 1.0,
            final_row: None,
        }
    }

    pub fn with_initial_fill(mut self, fraction: f64) -> NetworkResult<Self> {
        self.tank.filled_to(fraction)?;
        self.initial_fill = fraction;
        Ok(self)
    }

    pub fn initial_state(&self) -> NetworkResult<FuelTankState> {
        match self.final_row {
            Some(state) => Ok(state),
            None => Ok(self.tank.filled_to(self.initial_fill)?),
        }
    }

    pub fn final_row(&self) -> Option<&FuelTankState> {
        self.final_row.as_ref()
    }
}

#[derive(Clone, Debug)]
pub struct FuelLine {
    pub tag: String,
    pub active: bool,
    pub identical_propulsors: bool,
    pub tanks: TagMap<FuelTankSource>,
    pub propulsors: TagMap<PropulsorChain>,
}

impl FuelLine {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            active: true,
            identical_propulsors: false,
            tanks: TagMap::new(),
            propulsors: TagMap::new(),
        }
    }

    pub fn with_identical_propulsors(mut self, identical: bool) -> Self {
        self.identical_propulsors = identical;
        self
    }

    pub fn add_tank(&mut self, source: FuelTankSource) -> NetworkResult<()> {
        self.tanks.insert(source.tank.tag.clone(), source)?;
        Ok(())
    }

    pub fn add_propulsor(&mut self, chain: PropulsorChain) -> NetworkResult<()> {
        self.propulsors.insert(chain.tag.clone(), chain)?;
        Ok(())
    }

    pub fn validate(&self) -> NetworkResult<()> {
        if self.tanks.is_empty() && !self.propulsors.is_empty() {
            return Err(NetworkError::Configuration {
                what: format!("fuel line '{}' has propulsors but no tank", self.tag),
            });
        }
        if let Some(chain) = self.propulsors.values().find(|c| c.is_electric()) {
            return Err(NetworkError::Configuration {
                what: format!("fuel line '{}' carries electric propulsor '{}'", self.tag, chain.tag),
            });
        }
        if self.identical_propulsors {
            propulsion::validate_identical(&self.tag, &self.propulsors)?;
        }
        Ok(())
    }

    pub fn declare(&self, segment: &mut Segment) -> NetworkResult<()> {
        let n = segment.n_points();
        let mut line = LineConditions::new(n);
        propulsion::allocate(&self.propulsors, n, &mut line)?;
        for source in self.tanks.values() {
            line.fuel_tanks
                .insert(source.tank.tag.clone(), FuelTankConditions::new(n))?;
        }
        segment.conditions.energy.insert(self.tag.clone(), line)?;
        if segment.kind.is_in_flight() {
            propulsion::declare(segment, &self.tag, &self.propulsors, self.identical_propulsors)?;
        }
        Ok(())
    }

    pub fn append_initial_conditions(&self, segment: &mut Segment) -> NetworkResult<()> {
        let line = segment.conditions.line_mut(&self.tag)?;
        for source in self.tanks.values() {
            let record = line.fuel_tanks.require_mut(&source.tank.tag)?;
            if let Some(first) = record.fuel_mass.first_mut() {
                *first = source.initial_state()?.fuel_mass;
            }
        }
        Ok(())
    }

    pub fn unpack(&self, segment: &mut Segment) -> NetworkResult<()> {
        if !segment.kind.is_in_flight() {
            return Ok(());
        }
        let line = segment.conditions.energy.require_mut(&self.tag)?;
        propulsion::unpack(
            &segment.unknowns,
            &self.tag,
            &self.propulsors,
            self.identical_propulsors,
            line,
        )
    }

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
            bus_voltage: &[],
            constants,
        };
        propulsion::evaluate(
            &self.propulsors,
            self.identical_propulsors,
            &inputs,
            &mut line.propulsors,
        )
    }

    /// Burn fuel from the tanks in order, moving to the next tank once one
    /// runs dry.
    ///
    /// The line's mass rate is what the tanks deliver, so vehicle mass never
    /// falls faster than the fuel on board. Rows where delivery falls short
    /// of demand are flagged in `fuel_starved`.
    pub fn energy_calc(&self, segment: &mut Segment) -> NetworkResult<()> {
        let n = segment.n_points();
        let cond = &mut segment.conditions;
        let time = &cond.time;
        let line = cond.energy.require_mut(&self.tag)?;

        for i in 0..n {
            let dt = if i + 1 < n { time[i + 1] - time[i] } else { 0.0 };
            let demand: f64 = line.propulsors.values().map(|p| p.fuel_rate[i]).sum();
            line.power[i] = line.propulsors.values().map(|p| p.power[i]).sum();

            let delivered = self.draw(line, i, demand, dt);
            line.mass_rate[i] = delivered;
            line.fuel_starved[i] = demand > 0.0 && delivered < demand * (1.0 - STARVATION_TOL);
        }
        Ok(())
    }

    /// Split `demand` (kg/s) over the tanks at row `i` and step them to
    /// `i + 1`. Returns the rate actually delivered.
    fn draw(&self, line: &mut LineConditions, i: usize, demand: f64, dt: f64) -> f64 {
        let n = line.mass_rate.len();
        let mut remaining = demand;
        let mut delivered = 0.0;
        for (source, record) in self.tanks.values().zip(line.fuel_tanks.values_mut()) {
            let available = record.fuel_mass[i];
            let rate = if remaining <= 0.0 || available <= 0.0 {
                0.0
            } else if dt > 0.0 {
                remaining.min(available / dt)
            } else {
                remaining
            };
            remaining -= rate;
            delivered += rate;
            record.mass_rate[i] = rate;
            if i + 1 < n {
                let state = FuelTankState { fuel_mass: available };
                record.fuel_mass[i + 1] = source.tank.step(&state, rate, dt).fuel_mass;
            }
        }
        delivered
    }

    pub fn residuals(&self, segment: &mut Segment) -> NetworkResult<()> {
        if !segment.kind.is_in_flight() {
            return Ok(());
        }
        let line = segment.conditions.energy.require(&self.tag)?;
        propulsion::residuals(
            &mut segment.residuals,
            &self.tag,
            &self.propulsors,
            self.identical_propulsors,
            line,
        )
    }

    pub(crate) fn commit(&mut self, segment: &Segment) -> NetworkResult<()> {
        let line = segment.conditions.line(&self.tag)?;
        if let Some(row) = line.fuel_starved.iter().position(|&s| s) {
            warn!(
                line = %self.tag,
                segment = %segment.tag,
                time = segment.conditions.time.get(row).copied().unwrap_or(0.0),
                "fuel demand exceeds what the tanks hold"
            );
        }
        for (tag, source) in self.tanks.iter_mut() {
            let record = line.fuel_tanks.require(tag)?;
            if let Some(&fuel_mass) = record.fuel_mass.last() {
                debug!(line = %self.tag, tank = tag, fuel_mass, "tank final row");
                source.final_row = Some(FuelTankState { fuel_mass });
            }
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        for source in self.tanks.values_mut() {
            source.final_row = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentKind;
    use pf_core::units::kg;

    #[test]
    fn tanks_drain_in_order() {
        let mut line = FuelLine::new("fuel");
        line.add_tank(FuelTankSource::new(FuelTank::new("main", kg(1.0)).unwrap()))
            .unwrap();
        line.add_tank(FuelTankSource::new(FuelTank::new("aux", kg(10.0)).unwrap()))
            .unwrap();
        let mut seg = Segment::new("s", SegmentKind::GroundDischarge, 3);
        seg.conditions.time = vec![0.0, 10.0, 20.0];
        line.declare(&mut seg).unwrap();
        line.append_initial_conditions(&mut seg).unwrap();

        let rec = seg.conditions.line_mut("fuel").unwrap();
        assert_eq!(rec.fuel_tanks.require("main").unwrap().fuel_mass[0], 1.0);
        // 0.2 kg/s for 10 s empties "main" after 5 s of the step
        assert!((line.draw(rec, 0, 0.2, 10.0) - 0.2).abs() < 1e-15);
        assert!((line.draw(rec, 1, 0.2, 10.0) - 0.2).abs() < 1e-15);
        let main = rec.fuel_tanks.require("main").unwrap();
        let aux = rec.fuel_tanks.require("aux").unwrap();
        assert_eq!(main.mass_rate[0], 0.1);
        assert_eq!(main.fuel_mass[1], 0.0);
        assert!((aux.mass_rate[0] - 0.1).abs() < 1e-15);
        assert_eq!(main.mass_rate[1], 0.0);
        assert!((aux.mass_rate[1] - 0.2).abs() < 1e-15);
        assert!(aux.fuel_mass[2] < aux.fuel_mass[1]);
    }

    #[test]
    fn dry_tanks_deliver_only_what_they_hold() {
        let mut line = FuelLine::new("fuel");
        line.add_tank(FuelTankSource::new(FuelTank::new("main", kg(0.5)).unwrap()))
            .unwrap();
        let mut seg = Segment::new("s", SegmentKind::GroundDischarge, 3);
        seg.conditions.time = vec![0.0, 10.0, 20.0];
        line.declare(&mut seg).unwrap();
        line.append_initial_conditions(&mut seg).unwrap();

        let rec = seg.conditions.line_mut("fuel").unwrap();
        assert!((line.draw(rec, 0, 0.2, 10.0) - 0.05).abs() < 1e-15);
        assert_eq!(line.draw(rec, 1, 0.2, 10.0), 0.0);
        assert_eq!(rec.fuel_tanks.require("main").unwrap().fuel_mass[2], 0.0);
    }

    #[test]
    fn electric_propulsor_rejected() {
        use pf_components::{CoefficientRotor, DcMotor, Esc};
        use pf_core::units::{amps, ohms};
        use std::sync::Arc;
        let mut line = FuelLine::new("fuel");
        line.add_tank(FuelTankSource::new(FuelTank::new("main", kg(1.0)).unwrap()))
            .unwrap();
        let rotor = CoefficientRotor::new("rotor", 0.8, 3, 0.1, 0.04, 0.8).unwrap();
        line.add_propulsor(PropulsorChain::electric(
            "p",
            Esc::new("esc", 0.95).unwrap(),
            DcMotor::new("m", 9.0, ohms(0.05), amps(2.0), 1.0, 1.0).unwrap(),
            Arc::new(rotor),
        ))
        .unwrap();
        assert!(line.validate().is_err());
    }
}
