//! pf-core: stable foundation for propflow.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - constants (immutable physical constants table)
//! - ids (arena slot ids for the component tree)
//! - tag_map (insertion-ordered map keyed by component tag)
//! - error (shared error types)

pub mod constants;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod tag_map;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use constants::Constants;
pub use error::{PfError, PfResult};
pub use ids::PartId;
pub use numeric::*;
pub use tag_map::TagMap;
pub use units::*;
