//! Time-series condition block.
//!
//! Every array holds one value per time point of the owning segment. Stage
//! evaluators write into their own typed struct, found by line tag and then
//! by propulsor or source tag.

use crate::error::{NetworkError, NetworkResult};
use pf_components::{BatteryState, FreestreamPoint};
use pf_core::TagMap;

pub type Vec3 = [f64; 3];

fn zeros(n: usize) -> Vec<f64> {
    vec![0.0; n]
}

fn zeros3(n: usize) -> Vec<Vec3> {
    vec![[0.0; 3]; n]
}

/// Freestream arrays, one entry per time point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FreestreamSeries {
    pub altitude: Vec<f64>,
    pub velocity: Vec<f64>,
    pub density: Vec<f64>,
    pub pressure: Vec<f64>,
    pub temperature: Vec<f64>,
    pub speed_of_sound: Vec<f64>,
    pub dynamic_viscosity: Vec<f64>,
}

impl FreestreamSeries {
    pub fn from_points(points: &[FreestreamPoint]) -> Self {
        Self {
            altitude: points.iter().map(|p| p.altitude).collect(),
            velocity: points.iter().map(|p| p.velocity).collect(),
            density: points.iter().map(|p| p.density).collect(),
            pressure: points.iter().map(|p| p.pressure).collect(),
            temperature: points.iter().map(|p| p.temperature).collect(),
            speed_of_sound: points.iter().map(|p| p.speed_of_sound).collect(),
            dynamic_viscosity: points.iter().map(|p| p.dynamic_viscosity).collect(),
        }
    }

    pub fn point(&self, i: usize) -> FreestreamPoint {
        FreestreamPoint {
            altitude: self.altitude[i],
            velocity: self.velocity[i],
            density: self.density[i],
            pressure: self.pressure[i],
            temperature: self.temperature[i],
            speed_of_sound: self.speed_of_sound[i],
            dynamic_viscosity: self.dynamic_viscosity[i],
        }
    }

    pub fn len(&self) -> usize {
        self.altitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.altitude.is_empty()
    }

    fn lengths_match(&self, n: usize) -> bool {
        [
            &self.altitude,
            &self.velocity,
            &self.density,
            &self.pressure,
            &self.temperature,
            &self.speed_of_sound,
            &self.dynamic_viscosity,
        ]
        .iter()
        .all(|v| v.len() == n)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EscConditions {
    pub throttle: Vec<f64>,
    pub input_voltage: Vec<f64>,
    pub output_voltage: Vec<f64>,
    pub input_current: Vec<f64>,
    pub output_current: Vec<f64>,
}

impl EscConditions {
    pub fn new(n: usize) -> Self {
        Self {
            throttle: zeros(n),
            input_voltage: zeros(n),
            output_voltage: zeros(n),
            input_current: zeros(n),
            output_current: zeros(n),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MotorConditions {
    pub voltage: Vec<f64>,
    pub omega: Vec<f64>,
    pub torque: Vec<f64>,
    pub current: Vec<f64>,
    pub efficiency: Vec<f64>,
    pub stalled: Vec<bool>,
}

impl MotorConditions {
    pub fn new(n: usize) -> Self {
        Self {
            voltage: zeros(n),
            omega: zeros(n),
            torque: zeros(n),
            current: zeros(n),
            efficiency: zeros(n),
            stalled: vec![false; n],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RotorConditions {
    /// Solver guess used to size the shaft load
    pub power_coefficient_guess: Vec<f64>,
    pub pitch: Vec<f64>,
    pub omega: Vec<f64>,
    pub thrust: Vec<f64>,
    pub torque: Vec<f64>,
    pub power: Vec<f64>,
    pub power_coefficient: Vec<f64>,
    pub thrust_coefficient: Vec<f64>,
    pub figure_of_merit: Vec<f64>,
    pub tip_mach: Vec<f64>,
}

impl RotorConditions {
    pub fn new(n: usize) -> Self {
        Self {
            power_coefficient_guess: zeros(n),
            pitch: zeros(n),
            omega: zeros(n),
            thrust: zeros(n),
            torque: zeros(n),
            power: zeros(n),
            power_coefficient: zeros(n),
            thrust_coefficient: zeros(n),
            figure_of_merit: zeros(n),
            tip_mach: zeros(n),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConditions {
    pub throttle: Vec<f64>,
    pub omega: Vec<f64>,
    pub torque: Vec<f64>,
    pub power: Vec<f64>,
    pub fuel_rate: Vec<f64>,
    pub stalled: Vec<bool>,
}

impl EngineConditions {
    pub fn new(n: usize) -> Self {
        Self {
            throttle: zeros(n),
            omega: zeros(n),
            torque: zeros(n),
            power: zeros(n),
            fuel_rate: zeros(n),
            stalled: vec![false; n],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GasTurbineConditions {
    pub throttle: Vec<f64>,
    pub mass_flow: Vec<f64>,
    pub fuel_rate: Vec<f64>,
    pub thrust: Vec<f64>,
    pub t4: Vec<f64>,
    pub spool_power: Vec<f64>,
    pub exit_velocity: Vec<f64>,
    pub choked: Vec<bool>,
}

impl GasTurbineConditions {
    pub fn new(n: usize) -> Self {
        Self {
            throttle: zeros(n),
            mass_flow: zeros(n),
            fuel_rate: zeros(n),
            thrust: zeros(n),
            t4: zeros(n),
            spool_power: zeros(n),
            exit_velocity: zeros(n),
            choked: vec![false; n],
        }
    }
}

/// Stage records of one propulsor, by chain kind.
#[derive(Clone, Debug, PartialEq)]
pub enum StageConditions {
    Electric {
        esc: EscConditions,
        motor: MotorConditions,
        rotor: RotorConditions,
    },
    Piston {
        engine: EngineConditions,
        rotor: RotorConditions,
    },
    Turbojet(GasTurbineConditions),
}

impl StageConditions {
    pub fn rotor(&self) -> Option<&RotorConditions> {
        match self {
            StageConditions::Electric { rotor, .. } | StageConditions::Piston { rotor, .. } => {
                Some(rotor)
            }
            StageConditions::Turbojet(_) => None,
        }
    }

    pub fn rotor_mut(&mut self) -> Option<&mut RotorConditions> {
        match self {
            StageConditions::Electric { rotor, .. } | StageConditions::Piston { rotor, .. } => {
                Some(rotor)
            }
            StageConditions::Turbojet(_) => None,
        }
    }

    /// Shaft torque delivered by the driving stage (motor or engine).
    pub fn drive_torque(&self) -> Option<&[f64]> {
        match self {
            StageConditions::Electric { motor, .. } => Some(&motor.torque),
            StageConditions::Piston { engine, .. } => Some(&engine.torque),
            StageConditions::Turbojet(_) => None,
        }
    }
}

/// Per-propulsor totals plus stage records.
#[derive(Clone, Debug, PartialEq)]
pub struct PropulsorConditions {
    pub thrust: Vec<Vec3>,
    pub moment: Vec<Vec3>,
    /// Power drawn from the line (electrical for a bus, shaft for a fuel line)
    pub power: Vec<f64>,
    /// Current drawn from the bus
    pub current: Vec<f64>,
    pub fuel_rate: Vec<f64>,
    pub stages: StageConditions,
}

impl PropulsorConditions {
    pub fn new(n: usize, stages: StageConditions) -> Self {
        Self {
            thrust: zeros3(n),
            moment: zeros3(n),
            power: zeros(n),
            current: zeros(n),
            fuel_rate: zeros(n),
            stages,
        }
    }

    pub fn thrust_magnitude(&self, i: usize) -> f64 {
        let [x, y, z] = self.thrust[i];
        (x * x + y * y + z * z).sqrt()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatteryConditions {
    pub soc: Vec<f64>,
    pub dod: Vec<f64>,
    pub temperature: Vec<f64>,
    pub current: Vec<f64>,
    pub open_circuit_voltage: Vec<f64>,
    pub voltage_under_load: Vec<f64>,
    pub power: Vec<f64>,
    pub resistance: Vec<f64>,
    pub heat_generated: Vec<f64>,
    pub heat_removed: Vec<f64>,
    pub charge_throughput: Vec<f64>,
    pub cycles: Vec<f64>,
    pub capacity_retained: Vec<f64>,
    pub resistance_growth: Vec<f64>,
    pub power_limited: Vec<bool>,
    pub recharging: Vec<bool>,
}

impl BatteryConditions {
    pub fn new(n: usize) -> Self {
        Self {
            soc: zeros(n),
            dod: zeros(n),
            temperature: zeros(n),
            current: zeros(n),
            open_circuit_voltage: zeros(n),
            voltage_under_load: zeros(n),
            power: zeros(n),
            resistance: zeros(n),
            heat_generated: zeros(n),
            heat_removed: zeros(n),
            charge_throughput: zeros(n),
            cycles: zeros(n),
            capacity_retained: zeros(n),
            resistance_growth: zeros(n),
            power_limited: vec![false; n],
            recharging: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.soc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.soc.is_empty()
    }

    /// Persistent state stored in row `i`.
    pub fn state_at(&self, i: usize) -> BatteryState {
        BatteryState {
            soc: self.soc[i],
            temperature: self.temperature[i],
            charge_throughput: self.charge_throughput[i],
            cycles: self.cycles[i],
            capacity_retained: self.capacity_retained[i],
            resistance_growth: self.resistance_growth[i],
        }
    }

    pub fn set_state(&mut self, i: usize, state: &BatteryState) {
        self.soc[i] = state.soc;
        self.dod[i] = state.depth_of_discharge();
        self.temperature[i] = state.temperature;
        self.charge_throughput[i] = state.charge_throughput;
        self.cycles[i] = state.cycles;
        self.capacity_retained[i] = state.capacity_retained;
        self.resistance_growth[i] = state.resistance_growth;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuelTankConditions {
    pub fuel_mass: Vec<f64>,
    pub mass_rate: Vec<f64>,
}

impl FuelTankConditions {
    pub fn new(n: usize) -> Self {
        Self {
            fuel_mass: zeros(n),
            mass_rate: zeros(n),
        }
    }
}

/// Coolant loop arrays. Heat-exchanger outputs at `i + 1` are produced from
/// inputs at `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct CoolantConditions {
    pub turndown: Vec<f64>,
    pub coolant_mass_flow: Vec<f64>,
    pub air_mass_flow: Vec<f64>,
    pub reservoir_temperature: Vec<f64>,
    pub cold_plate_outlet_temperature: Vec<f64>,
    pub hex_coolant_outlet_temperature: Vec<f64>,
    pub hex_air_outlet_temperature: Vec<f64>,
    pub coolant_pressure_drop: Vec<f64>,
    pub air_pressure_drop: Vec<f64>,
    pub pump_power: Vec<f64>,
    pub fan_power: Vec<f64>,
    pub heat_acquired: Vec<f64>,
    pub heat_rejected: Vec<f64>,
    pub effectiveness: Vec<f64>,
}

impl CoolantConditions {
    pub fn new(n: usize) -> Self {
        Self {
            turndown: zeros(n),
            coolant_mass_flow: zeros(n),
            air_mass_flow: zeros(n),
            reservoir_temperature: zeros(n),
            cold_plate_outlet_temperature: zeros(n),
            hex_coolant_outlet_temperature: zeros(n),
            hex_air_outlet_temperature: zeros(n),
            coolant_pressure_drop: zeros(n),
            air_pressure_drop: zeros(n),
            pump_power: zeros(n),
            fan_power: zeros(n),
            heat_acquired: zeros(n),
            heat_rejected: zeros(n),
            effectiveness: zeros(n),
        }
    }

    /// Auxiliary electrical load of the loop at row `i`.
    pub fn auxiliary_power(&self, i: usize) -> f64 {
        self.pump_power[i] + self.fan_power[i]
    }
}

/// Everything one distribution line writes during a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct LineConditions {
    /// Solver guess of the loaded bus voltage
    pub voltage_under_load: Vec<f64>,
    /// Loaded voltage predicted by the sources
    pub predicted_voltage: Vec<f64>,
    /// Solver guess of the charge current
    pub recharge_current: Vec<f64>,
    /// Charge current the sources accept
    pub allowed_charge_current: Vec<f64>,
    pub current: Vec<f64>,
    pub power: Vec<f64>,
    pub auxiliary_power: Vec<f64>,
    /// Fuel actually delivered by the tanks (kg/s)
    pub mass_rate: Vec<f64>,
    /// Set where the tanks could not meet the propulsors' fuel demand
    pub fuel_starved: Vec<bool>,
    pub propulsors: TagMap<PropulsorConditions>,
    pub batteries: TagMap<BatteryConditions>,
    pub fuel_tanks: TagMap<FuelTankConditions>,
    pub coolant: Option<CoolantConditions>,
}

impl LineConditions {
    pub fn new(n: usize) -> Self {
        Self {
            voltage_under_load: zeros(n),
            predicted_voltage: zeros(n),
            recharge_current: zeros(n),
            allowed_charge_current: zeros(n),
            current: zeros(n),
            power: zeros(n),
            auxiliary_power: zeros(n),
            mass_rate: zeros(n),
            fuel_starved: vec![false; n],
            propulsors: TagMap::new(),
            batteries: TagMap::new(),
            fuel_tanks: TagMap::new(),
            coolant: None,
        }
    }
}

/// Per-segment record of every time-series quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionBlock {
    pub n_points: usize,
    pub time: Vec<f64>,
    pub freestream: FreestreamSeries,
    pub throttle: Vec<f64>,
    pub pitch: Vec<f64>,
    pub total_thrust: Vec<Vec3>,
    pub total_moment: Vec<Vec3>,
    pub total_power: Vec<f64>,
    pub total_mass_rate: Vec<f64>,
    pub vehicle_mass: Vec<f64>,
    pub energy: TagMap<LineConditions>,
}

impl ConditionBlock {
    pub fn new(n_points: usize) -> Self {
        Self {
            n_points,
            time: zeros(n_points),
            freestream: FreestreamSeries {
                altitude: zeros(n_points),
                velocity: zeros(n_points),
                density: zeros(n_points),
                pressure: zeros(n_points),
                temperature: zeros(n_points),
                speed_of_sound: zeros(n_points),
                dynamic_viscosity: zeros(n_points),
            },
            throttle: zeros(n_points),
            pitch: zeros(n_points),
            total_thrust: zeros3(n_points),
            total_moment: zeros3(n_points),
            total_power: zeros(n_points),
            total_mass_rate: zeros(n_points),
            vehicle_mass: zeros(n_points),
            energy: TagMap::new(),
        }
    }

    /// Step length leaving point `i` (zero at the last point).
    pub fn dt(&self, i: usize) -> f64 {
        if i + 1 < self.time.len() {
            self.time[i + 1] - self.time[i]
        } else {
            0.0
        }
    }

    pub fn line(&self, tag: &str) -> NetworkResult<&LineConditions> {
        Ok(self.energy.require(tag)?)
    }

    pub fn line_mut(&mut self, tag: &str) -> NetworkResult<&mut LineConditions> {
        Ok(self.energy.require_mut(tag)?)
    }

    /// Check that the segment-level arrays all have `n_points` entries.
    pub fn check_lengths(&self) -> NetworkResult<()> {
        let n = self.n_points;
        let ok = self.time.len() == n
            && self.freestream.lengths_match(n)
            && self.throttle.len() == n
            && self.pitch.len() == n
            && self.total_thrust.len() == n
            && self.total_moment.len() == n
            && self.total_power.len() == n
            && self.total_mass_rate.len() == n
            && self.vehicle_mass.len() == n
            && self
                .energy
                .values()
                .all(|l| l.current.len() == n && l.voltage_under_load.len() == n);
        if ok {
            Ok(())
        } else {
            Err(NetworkError::Invariant {
                what: format!("condition arrays must have {n} points"),
            })
        }
    }
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn add3(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_state_round_trips_through_row() {
        let mut b = BatteryConditions::new(3);
        let s = BatteryState {
            soc: 0.7,
            temperature: 301.0,
            charge_throughput: 12.0,
            cycles: 2.0,
            capacity_retained: 0.99,
            resistance_growth: 1.01,
        };
        b.set_state(2, &s);
        assert_eq!(b.state_at(2), s);
        assert!((b.soc[2] + b.dod[2] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn block_length_check() {
        let mut block = ConditionBlock::new(4);
        assert!(block.check_lengths().is_ok());
        block.throttle.push(1.0);
        assert!(block.check_lengths().is_err());
    }

    #[test]
    fn cross_product_of_axes() {
        assert_eq!(cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn dt_is_zero_past_the_end() {
        let mut block = ConditionBlock::new(3);
        block.time = vec![0.0, 10.0, 25.0];
        assert_eq!(block.dt(0), 10.0);
        assert_eq!(block.dt(1), 15.0);
        assert_eq!(block.dt(2), 0.0);
    }
}
