//! pf-network: energy networks and the segment contract.
//!
//! A network groups distribution lines (battery buses, fuel lines, coolant
//! loops) and exposes a fixed contract to the mission driver: declare
//! unknowns and residuals, seed initial conditions, and evaluate the whole
//! powertrain array-wise for a guess of the unknowns. Sources carry their
//! state from one segment to the next.

pub mod bus;
pub mod chain;
pub mod conditions;
pub mod coolant_line;
pub mod error;
pub mod fuel_line;
pub mod names;
pub mod network;
pub mod propulsion;
pub mod segment;
pub mod state_vector;

pub use bus::{BatterySource, Bus, parallel_split};
pub use chain::{ChainInputs, ChainKind, PropulsorChain};
pub use conditions::{
    BatteryConditions, ConditionBlock, CoolantConditions, EngineConditions, EscConditions,
    FreestreamSeries, FuelTankConditions, GasTurbineConditions, LineConditions, MotorConditions,
    PropulsorConditions, RotorConditions, StageConditions, Vec3,
};
pub use coolant_line::{CoolantHeatExchanger, CoolantLine};
pub use error::{NetworkError, NetworkResult};
pub use fuel_line::{FuelLine, FuelTankSource};
pub use network::{EnergyNetwork, NetworkLines, NetworkTotals};
pub use segment::{Segment, SegmentKind, SegmentSettings};
pub use state_vector::StateVector;
