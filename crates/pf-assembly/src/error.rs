//! Assembly-specific error types.

use pf_core::{PartId, PfError};

/// Assembly construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// A part refers to a parent that doesn't exist.
    InvalidParentRef { part: PartId, parent: PartId },

    /// A part's parent is not a container.
    ParentNotContainer { part: PartId, parent: PartId },

    /// Following parent links from a part never reaches the root.
    Cycle { part: PartId },

    /// Two parts share a tag.
    DuplicateTag { tag: String },

    /// Mass must be finite and non-negative.
    InvalidMass { tag: String, mass: f64 },

    /// Child list is inconsistent with the child's parent link.
    InconsistentChildren { part: PartId, child: PartId },
}

impl std::fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssemblyError::InvalidParentRef { part, parent } => {
                write!(f, "Part {} refers to non-existent parent {}", part, parent)
            }
            AssemblyError::ParentNotContainer { part, parent } => {
                write!(f, "Part {} has parent {} which is not a container", part, parent)
            }
            AssemblyError::Cycle { part } => {
                write!(f, "Part {} does not reach the root (cycle)", part)
            }
            AssemblyError::DuplicateTag { tag } => write!(f, "Duplicate part tag '{}'", tag),
            AssemblyError::InvalidMass { tag, mass } => {
                write!(f, "Part '{}' has invalid mass {}", tag, mass)
            }
            AssemblyError::InconsistentChildren { part, child } => {
                write!(
                    f,
                    "Part {} lists child {} but the child points elsewhere",
                    part, child
                )
            }
        }
    }
}

impl std::error::Error for AssemblyError {}

impl From<AssemblyError> for PfError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::DuplicateTag { tag } => PfError::DuplicateTag { tag },
            AssemblyError::InvalidMass { .. } => PfError::InvalidArg {
                what: "part mass must be finite and non-negative",
            },
            _ => PfError::Invariant {
                what: "assembly structure is inconsistent",
            },
        }
    }
}
