//! Liquid coolant loop serving one battery.
//!
//! Loop order is battery cold plate, heat exchanger, reservoir, back to the
//! cold plate. The loop is advanced together with its battery, one explicit
//! step per time point: inputs at `i` produce heat-exchanger outputs and the
//! reservoir temperature at `i + 1`.

use crate::conditions::CoolantConditions;
use crate::error::{NetworkError, NetworkResult};
use pf_components::{
    ColdPlate, CrossFlowHeatExchanger, DryAir, FluidProperties, FreestreamPoint, GlycolWater,
    HexInputs, Reservoir,
};
use pf_core::numeric::clamp;

pub type CoolantHeatExchanger = CrossFlowHeatExchanger<GlycolWater, DryAir>;

#[derive(Clone, Debug)]
pub struct CoolantLine {
    pub tag: String,
    pub active: bool,
    /// Bus holding the cooled battery
    pub bus: String,
    pub battery: String,
    pub cold_plate: ColdPlate,
    pub reservoir: Reservoir,
    pub heat_exchanger: CoolantHeatExchanger,
    /// Fraction of design flow (0 idles the loop)
    pub turndown: f64,
    /// Loop static pressure at the heat-exchanger inlet (Pa)
    pub coolant_pressure: f64,
    pub initial_temperature: f64,
    final_row: Option<CoolantConditions>,
}

impl CoolantLine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tag: impl Into<String>,
        bus: impl Into<String>,
        battery: impl Into<String>,
        cold_plate: ColdPlate,
        reservoir: Reservoir,
        heat_exchanger: CoolantHeatExchanger,
        turndown: f64,
    ) -> NetworkResult<Self> {
        let tag = tag.into();
        if !(0.0..=1.0).contains(&turndown) {
            return Err(NetworkError::Configuration {
                what: format!("coolant line '{tag}' turndown must be in [0,1]"),
            });
        }
        Ok(Self {
            tag,
            active: true,
            bus: bus.into(),
            battery: battery.into(),
            cold_plate,
            reservoir,
            heat_exchanger,
            turndown,
            coolant_pressure: 200_000.0,
            initial_temperature: 298.15,
            final_row: None,
        })
    }

    pub fn with_initial_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    pub fn final_row(&self) -> Option<&CoolantConditions> {
        self.final_row.as_ref()
    }

    pub(crate) fn commit(&mut self, conditions: &CoolantConditions) {
        let last = conditions.turndown.len().saturating_sub(1);
        let mut row = CoolantConditions::new(1);
        copy_row(conditions, last, &mut row, 0);
        self.final_row = Some(row);
    }

    pub(crate) fn reset(&mut self) {
        self.final_row = None;
    }

    /// Seed row 0: the previous segment's last row, or an idle loop at the
    /// initial temperature.
    pub fn append_initial_conditions(&self, conditions: &mut CoolantConditions) {
        match &self.final_row {
            Some(row) => copy_row(row, 0, conditions, 0),
            None => {
                let t0 = self.initial_temperature;
                conditions.turndown[0] = self.turndown;
                conditions.reservoir_temperature[0] = t0;
                conditions.cold_plate_outlet_temperature[0] = t0;
                conditions.hex_coolant_outlet_temperature[0] = t0;
                conditions.hex_air_outlet_temperature[0] = t0;
            }
        }
    }

    /// Advance the loop from `i` to `i + 1` and return the heat picked up
    /// from the battery at `i` (W).
    ///
    /// `next` is false at the last point, where only the cold plate is
    /// evaluated.
    pub fn step(
        &self,
        c: &mut CoolantConditions,
        i: usize,
        battery_temperature: f64,
        freestream: &FreestreamPoint,
        dt: f64,
        next: bool,
    ) -> f64 {
        let turndown = clamp(self.turndown, 0.0, 1.0);
        c.turndown[i] = turndown;
        let t_res = c.reservoir_temperature[i];

        if turndown <= 0.0 {
            c.heat_acquired[i] = 0.0;
            c.cold_plate_outlet_temperature[i] = t_res;
            if next {
                zero_outputs(c, i + 1);
                c.reservoir_temperature[i + 1] = t_res;
                c.hex_coolant_outlet_temperature[i + 1] = c.hex_coolant_outlet_temperature[i];
                c.hex_air_outlet_temperature[i + 1] = c.hex_air_outlet_temperature[i];
            }
            return 0.0;
        }

        let fluid = &self.heat_exchanger.coolant;
        let mdot = self.heat_exchanger.design_coolant_flow * turndown;
        let cp = fluid.specific_heat(t_res);

        let plate = self
            .cold_plate
            .evaluate(battery_temperature, t_res, mdot, cp);
        c.heat_acquired[i] = plate.heat;
        c.cold_plate_outlet_temperature[i] = plate.outlet_temperature;

        if next {
            let hex = self.heat_exchanger.evaluate(&HexInputs {
                coolant_inlet_temperature: plate.outlet_temperature,
                coolant_inlet_pressure: self.coolant_pressure,
                air_inlet_temperature: freestream.temperature,
                air_inlet_pressure: freestream.pressure + freestream.dynamic_pressure(),
                turndown,
            });
            let j = i + 1;
            c.coolant_mass_flow[j] = hex.coolant_mass_flow;
            c.air_mass_flow[j] = hex.air_mass_flow;
            c.hex_coolant_outlet_temperature[j] = hex.coolant_outlet_temperature;
            c.hex_air_outlet_temperature[j] = hex.air_outlet_temperature;
            c.coolant_pressure_drop[j] = hex.coolant_pressure_drop;
            c.air_pressure_drop[j] = hex.air_pressure_drop;
            c.pump_power[j] = hex.pump_power;
            c.fan_power[j] = hex.fan_power;
            c.heat_rejected[j] = hex.heat;
            c.effectiveness[j] = hex.effectiveness;
            c.reservoir_temperature[j] = self.reservoir.step(
                t_res,
                hex.coolant_outlet_temperature,
                hex.coolant_mass_flow,
                cp,
                freestream.temperature,
                dt,
            );
        }
        plate.heat
    }
}

fn zero_outputs(c: &mut CoolantConditions, j: usize) {
    c.coolant_mass_flow[j] = 0.0;
    c.air_mass_flow[j] = 0.0;
    c.coolant_pressure_drop[j] = 0.0;
    c.air_pressure_drop[j] = 0.0;
    c.pump_power[j] = 0.0;
    c.fan_power[j] = 0.0;
    c.heat_rejected[j] = 0.0;
    c.effectiveness[j] = 0.0;
}

fn copy_row(src: &CoolantConditions, si: usize, dst: &mut CoolantConditions, di: usize) {
    dst.turndown[di] = src.turndown[si];
    dst.coolant_mass_flow[di] = src.coolant_mass_flow[si];
    dst.air_mass_flow[di] = src.air_mass_flow[si];
    dst.reservoir_temperature[di] = src.reservoir_temperature[si];
    dst.cold_plate_outlet_temperature[di] = src.cold_plate_outlet_temperature[si];
    dst.hex_coolant_outlet_temperature[di] = src.hex_coolant_outlet_temperature[si];
    dst.hex_air_outlet_temperature[di] = src.hex_air_outlet_temperature[si];
    dst.coolant_pressure_drop[di] = src.coolant_pressure_drop[si];
    dst.air_pressure_drop[di] = src.air_pressure_drop[si];
    dst.pump_power[di] = src.pump_power[si];
    dst.fan_power[di] = src.fan_power[si];
    dst.heat_acquired[di] = src.heat_acquired[si];
    dst.heat_rejected[di] = src.heat_rejected[si];
    dst.effectiveness[di] = src.effectiveness[si];
}
