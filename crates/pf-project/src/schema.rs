//! Project schema definitions.
//!
//! Quantities carry their unit in the field name (`mass_kg`, `power_w`).

use pf_core::Constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub vehicle: VehicleDef,
    pub mission: MissionDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleDef {
    pub tag: String,
    /// Airframe parts; energy-source masses are added by the compiler.
    #[serde(default)]
    pub parts: Vec<PartDef>,
    #[serde(default)]
    pub networks: Vec<NetworkDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drag: Option<DragDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartDef {
    pub tag: String,
    /// Parent container tag; the vehicle root when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub kind: PartKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PartKindDef {
    Container,
    Component {
        mass_kg: f64,
        #[serde(default)]
        cg_m: [f64; 3],
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DragDef {
    ParabolicPolar {
        reference_area_m2: f64,
        cd0: f64,
        k: f64,
    },
    Hover,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkKindDef {
    AllElectric,
    ConventionalFuel,
    IsolatedBatteryCell,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkDef {
    pub tag: String,
    pub kind: NetworkKindDef,
    #[serde(default)]
    pub buses: Vec<BusDef>,
    #[serde(default)]
    pub fuel_lines: Vec<FuelLineDef>,
    #[serde(default)]
    pub coolant_lines: Vec<CoolantLineDef>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusDef {
    pub tag: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub identical_propulsors: bool,
    #[serde(default)]
    pub auxiliary_power_w: f64,
    #[serde(default)]
    pub batteries: Vec<BatteryDef>,
    #[serde(default)]
    pub propulsors: Vec<PropulsorDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatteryDef {
    pub tag: String,
    pub cell: CellDef,
    pub series: u32,
    pub parallel: u32,
    /// Zero state of charge when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_soc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_temperature_k: Option<f64>,
    /// Pins the cell temperature for every segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_override_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_conductance_w_per_k: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CellDef {
    Nmc18650,
    Custom {
        capacity_ah: f64,
        nominal_voltage_v: f64,
        max_voltage_v: f64,
        resistance_ohm: f64,
        max_charge_current_a: f64,
        mass_kg: f64,
        specific_heat_j_per_kg_k: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropulsorDef {
    pub tag: String,
    #[serde(default)]
    pub origin_m: [f64; 3],
    #[serde(default = "default_thrust_axis")]
    pub thrust_axis: [f64; 3],
    pub chain: ChainDef,
}

fn default_thrust_axis() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ChainDef {
    ElectricRotor {
        esc_efficiency: f64,
        motor: MotorDef,
        rotor: RotorDef,
    },
    PistonRotor {
        rated_power_w: f64,
        max_speed_rad_s: f64,
        sfc_kg_per_j: f64,
        rotor: RotorDef,
    },
    Turbojet(TurbojetDef),
}

fn default_one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MotorDef {
    Explicit {
        kv_rad_per_s_per_v: f64,
        resistance_ohm: f64,
        no_load_current_a: f64,
        #[serde(default = "default_one")]
        gear_ratio: f64,
        #[serde(default = "default_one")]
        gearbox_efficiency: f64,
    },
    /// Sized from a design operating point.
    Sized {
        design_speed_rad_s: f64,
        design_torque_nm: f64,
        design_voltage_v: f64,
        design_efficiency: f64,
        no_load_current_a: f64,
        #[serde(default = "default_one")]
        gear_ratio: f64,
        #[serde(default = "default_one")]
        gearbox_efficiency: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slack: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotorDef {
    pub radius_m: f64,
    pub blades: u32,
    pub ct0: f64,
    pub cp0: f64,
    pub j0: f64,
    #[serde(default)]
    pub pitch_sensitivity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_power_coefficient: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurbojetDef {
    pub compressor_pressure_ratio: f64,
    pub compressor_efficiency: f64,
    pub combustor_efficiency: f64,
    pub combustor_pressure_ratio: f64,
    pub fuel_heating_value_j_per_kg: f64,
    pub turbine_efficiency: f64,
    pub mechanical_efficiency: f64,
    pub nozzle_pressure_ratio: f64,
    pub design_mass_flow_kg_s: f64,
    pub t4_idle_k: f64,
    pub t4_max_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelLineDef {
    pub tag: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub identical_propulsors: bool,
    #[serde(default)]
    pub tanks: Vec<TankDef>,
    #[serde(default)]
    pub propulsors: Vec<PropulsorDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TankDef {
    pub tag: String,
    pub capacity_kg: f64,
    #[serde(default = "default_one")]
    pub initial_fill: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoolantLineDef {
    pub tag: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub bus: String,
    pub battery: String,
    pub turndown: f64,
    pub cold_plate_conductance_w_per_k: f64,
    pub reservoir_mass_kg: f64,
    pub reservoir_conductance_w_per_k: f64,
    pub heat_exchanger: HeatExchangerDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_temperature_k: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeatExchangerDef {
    pub coolant_surface: FinSurfaceDef,
    pub air_surface: FinSurfaceDef,
    pub design_coolant_flow_kg_s: f64,
    pub design_air_flow_kg_s: f64,
    pub pump_efficiency: f64,
    pub fan_efficiency: f64,
    #[serde(default)]
    pub wall_resistance_k_per_w: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinSurfaceDef {
    pub fin_spacing_m: f64,
    pub fin_height_m: f64,
    pub fin_thickness_m: f64,
    pub strip_length_m: f64,
    pub fin_conductivity_w_per_m_k: f64,
    pub frontal_area_m2: f64,
    pub free_flow_ratio: f64,
    pub heat_transfer_area_m2: f64,
    pub fin_area_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionDef {
    pub tag: String,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default)]
    pub delta_isa_k: f64,
    /// Replaces the standard constants table when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constants: Option<Constants>,
    #[serde(default)]
    pub segments: Vec<SegmentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    pub max_iterations: usize,
    pub abs_tol: f64,
    #[serde(default)]
    pub fail_on_nonconvergence: bool,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-8,
            fail_on_nonconvergence: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentDef {
    pub tag: String,
    pub n_points: usize,
    pub profile: ProfileDef,
    #[serde(default)]
    pub throttle: ThrottleDef,
    #[serde(default)]
    pub pitch_rad: f64,
    /// Rotor power-coefficient seeds keyed by `line.propulsor` or propulsor tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub power_coefficients: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ProfileDef {
    Climb {
        start_altitude_m: f64,
        end_altitude_m: f64,
        speed_m_s: f64,
        climb_rate_m_s: f64,
    },
    Cruise {
        altitude_m: f64,
        speed_m_s: f64,
        distance_m: f64,
    },
    Descent {
        start_altitude_m: f64,
        end_altitude_m: f64,
        speed_m_s: f64,
        descent_rate_m_s: f64,
    },
    Hover {
        altitude_m: f64,
        duration_s: f64,
    },
    Recharge {
        altitude_m: f64,
        duration_s: f64,
        /// Sum of pack charge limits when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_a: Option<f64>,
    },
    GroundDischarge {
        altitude_m: f64,
        duration_s: f64,
        current_a: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ThrottleDef {
    Fixed { value: f64 },
    Trimmed { seed: f64 },
}

impl Default for ThrottleDef {
    fn default() -> Self {
        Self::Fixed { value: 1.0 }
    }
}
