//! Assembly validation logic.

use std::collections::HashSet;

use crate::error::AssemblyError;
use crate::tree::{Part, PartKind};

/// Validate the tree: parent references exist and are containers, tags are
/// unique, masses are physical, child lists agree with parent links, and every
/// part reaches the root.
pub(crate) fn validate_structure(parts: &[Part]) -> Result<(), AssemblyError> {
    let mut tags = HashSet::new();
    for part in parts {
        if !tags.insert(part.tag.as_str()) {
            return Err(AssemblyError::DuplicateTag {
                tag: part.tag.clone(),
            });
        }
    }

    for part in parts {
        if let PartKind::Component(props) = &part.kind {
            if !props.mass.is_finite() || props.mass < 0.0 {
                return Err(AssemblyError::InvalidMass {
                    tag: part.tag.clone(),
                    mass: props.mass,
                });
            }
        }

        if let Some(parent) = part.parent {
            let Some(parent_part) = parts.get(parent.slot()) else {
                return Err(AssemblyError::InvalidParentRef {
                    part: part.id,
                    parent,
                });
            };
            if !parent_part.is_container() {
                return Err(AssemblyError::ParentNotContainer {
                    part: part.id,
                    parent,
                });
            }
        }

        for &child in &part.children {
            let consistent = parts
                .get(child.slot())
                .is_some_and(|c| c.parent == Some(part.id));
            if !consistent {
                return Err(AssemblyError::InconsistentChildren {
                    part: part.id,
                    child,
                });
            }
        }
    }

    // Every part must reach the root within parts.len() hops
    for part in parts {
        let mut current = part.parent;
        let mut hops = 0;
        while let Some(p) = current {
            hops += 1;
            if hops > parts.len() {
                return Err(AssemblyError::Cycle { part: part.id });
            }
            current = parts[p.slot()].parent;
        }
    }

    Ok(())
}
