//! Incremental assembly builder.

use pf_core::PartId;

use crate::error::AssemblyError;
use crate::mass::MassProperties;
use crate::tree::{Assembly, Part, PartKind};
use crate::validate;

/// Builder for constructing a vehicle tree incrementally.
///
/// The root container is created up front; use `add_container` and
/// `add_component` to grow the tree, then `build()` to validate and freeze it.
#[derive(Debug)]
pub struct AssemblyBuilder {
    parts: Vec<Part>,
}

impl AssemblyBuilder {
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            parts: vec![Part {
                id: PartId::ROOT,
                tag: root_tag.into(),
                kind: PartKind::Container,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> PartId {
        PartId::ROOT
    }

    fn push(&mut self, tag: String, kind: PartKind, parent: PartId) -> PartId {
        let id = PartId::from_slot(self.parts.len());
        self.parts.push(Part {
            id,
            tag,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        // Unknown parents are reported by build()
        if let Some(p) = self.parts.get_mut(parent.slot()) {
            p.children.push(id);
        }
        id
    }

    pub fn add_container(&mut self, tag: impl Into<String>, parent: PartId) -> PartId {
        self.push(tag.into(), PartKind::Container, parent)
    }

    /// Add a point-mass component.
    pub fn add_component(
        &mut self,
        tag: impl Into<String>,
        parent: PartId,
        mass: f64,
        cg: [f64; 3],
    ) -> PartId {
        self.push(
            tag.into(),
            PartKind::Component(MassProperties::point(mass, cg)),
            parent,
        )
    }

    /// Add a component with its own inertia about its CG.
    pub fn add_component_with_inertia(
        &mut self,
        tag: impl Into<String>,
        parent: PartId,
        props: MassProperties,
    ) -> PartId {
        self.push(tag.into(), PartKind::Component(props), parent)
    }

    pub fn build(self) -> Result<Assembly, AssemblyError> {
        validate::validate_structure(&self.parts)?;
        Ok(Assembly {
            parts: self.parts,
            root: PartId::ROOT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut builder = AssemblyBuilder::new("vehicle");
        let root = builder.root();
        let wing = builder.add_container("wing", root);
        let spar = builder.add_component("spar", wing, 10.0, [0.0; 3]);

        assert_eq!(root.slot(), 0);
        assert_eq!(wing.slot(), 1);
        assert_eq!(spar.slot(), 2);
        assert_eq!(builder.parts[1].children, vec![spar]);
    }

    #[test]
    fn component_cannot_parent() {
        let mut builder = AssemblyBuilder::new("vehicle");
        let root = builder.root();
        let motor = builder.add_component("motor", root, 5.0, [0.0; 3]);
        builder.add_component("magnet", motor, 1.0, [0.0; 3]);
        assert!(matches!(
            builder.build(),
            Err(AssemblyError::ParentNotContainer { .. })
        ));
    }
}
