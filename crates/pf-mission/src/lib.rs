//! pf-mission: segment profiles, throttle trim and the mission runner.
//!
//! A [`Mission`] is an ordered list of [`SegmentSpec`]s flown by a
//! [`Vehicle`]. Each segment is discretized in time, its network unknowns
//! are solved by Newton iteration, and the energy sources' last rows seed
//! the next segment.
//!
//! Non-convergence is reported on the [`SegmentResult`] and logged; set
//! [`MissionConfig::fail_on_nonconvergence`] to make it an error.

pub mod error;
pub mod mission;
pub mod profile;
pub mod results;
pub mod segment;
pub mod throttle;
pub mod vehicle;

pub use error::{MissionError, MissionResult};
pub use mission::{Mission, MissionConfig};
pub use profile::Profile;
pub use results::{MissionResults, MissionSummary, SegmentSummary};
pub use segment::{SegmentResult, SegmentSpec, SolveContext, solve_segment};
pub use throttle::{HoverDemand, ParabolicDragPolar, ThrottleControl, ThrustDemand};
pub use vehicle::Vehicle;
