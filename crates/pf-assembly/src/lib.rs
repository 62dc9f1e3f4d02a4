//! pf-assembly: vehicle component tree for propflow.
//!
//! Provides:
//! - An arena of parts (containers and mass-bearing components) with
//!   explicit parent/child indices
//! - Incremental builder with validation
//! - Post-order roll-up of mass, center of gravity and inertia
//!
//! # Example
//!
//! ```
//! use pf_assembly::AssemblyBuilder;
//!
//! let mut builder = AssemblyBuilder::new("vehicle");
//! let root = builder.root();
//! let wing = builder.add_container("wing", root);
//! builder.add_component("spar", wing, 40.0, [2.0, 0.0, 0.0]);
//! builder.add_component("fuselage", root, 60.0, [1.0, 0.0, 0.0]);
//! let assembly = builder.build().unwrap();
//!
//! let props = assembly.mass_properties();
//! assert!((props.mass - 100.0).abs() < 1e-12);
//! assert!((props.cg[0] - 1.4).abs() < 1e-12);
//! ```

pub mod builder;
pub mod error;
pub mod mass;
pub mod tree;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::AssemblyBuilder;
pub use error::AssemblyError;
pub use mass::MassProperties;
pub use tree::{Assembly, Part, PartKind};
