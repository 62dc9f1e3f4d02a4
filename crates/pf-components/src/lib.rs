//! pf-components: stage evaluators for aircraft energy networks.
//!
//! Provides pure, stateless models for one physical stage each:
//! - Electronic speed controller, DC motor (plus design-point sizing)
//! - Rotor performance (trait + coefficient-map reference model)
//! - Piston engine and single-spool gas-turbine stages
//! - Battery pack and fuel tank (state stepping; the state itself is owned
//!   by the caller)
//! - Coolant properties, cold plate, cross-flow heat exchanger, reservoir
//! - ISA atmosphere for freestream conditions
//!
//! Every model maps an input condition to an output condition for a single
//! time point; array-wise evaluation and time integration live in
//! `pf-network`.
//!
//! # Example
//!
//! ```
//! use pf_components::{DcMotor, Esc};
//! use pf_core::units::{amps, ohms};
//!
//! let esc = Esc::new("esc", 0.95).unwrap();
//! let motor = DcMotor::new("motor", 9.0, ohms(0.05), amps(2.0), 1.0, 1.0).unwrap();
//!
//! let v = esc.output_voltage(0.8, 400.0);
//! let point = motor.operating_point(v, 1e-4);
//! assert!(!point.stalled);
//! assert!(point.omega > 0.0);
//! ```

pub mod atmosphere;
pub mod battery;
pub mod cold_plate;
pub mod common;
pub mod coolant;
pub mod engine;
pub mod error;
pub mod esc;
pub mod fuel_tank;
pub mod gas_turbine;
pub mod heat_exchanger;
pub mod motor;
pub mod motor_sizing;
pub mod reservoir;
pub mod rotor;

// Re-exports
pub use atmosphere::{Atmosphere, FreestreamPoint};
pub use battery::{
    AgingModel, BatteryCell, BatteryLoad, BatteryPack, BatteryState, BatteryStep, ThermalEnvironment,
};
pub use cold_plate::{ColdPlate, ColdPlatePoint};
pub use coolant::{DryAir, FluidProperties, GlycolWater};
pub use engine::{EnginePoint, PistonEngine};
pub use error::{ComponentError, ComponentResult};
pub use esc::Esc;
pub use fuel_tank::{FuelTank, FuelTankState};
pub use gas_turbine::{Combustor, Compressor, Nozzle, Turbine, Turbojet, TurbojetPoint};
pub use heat_exchanger::{CrossFlowHeatExchanger, FinSurface, HexInputs, HexOutputs};
pub use motor::{DcMotor, MotorPoint};
pub use motor_sizing::{MotorDesignPoint, SizedMotor, size_motor};
pub use reservoir::Reservoir;
pub use rotor::{CoefficientRotor, RotorGeometry, RotorLoads, RotorPerformance, load_coefficient};
