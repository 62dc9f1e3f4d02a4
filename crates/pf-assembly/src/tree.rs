//! Core tree data structures.

use pf_core::PartId;

use crate::mass::MassProperties;

/// What a part contributes to the roll-up.
#[derive(Debug, Clone, PartialEq)]
pub enum PartKind {
    /// Groups other parts; carries no mass of its own.
    Container,
    /// A mass-bearing leaf.
    Component(MassProperties),
}

/// A node in the vehicle tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub id: PartId,
    pub tag: String,
    pub kind: PartKind,
    pub parent: Option<PartId>,
    pub children: Vec<PartId>,
}

impl Part {
    pub fn is_container(&self) -> bool {
        matches!(self.kind, PartKind::Container)
    }
}

/// A validated arena of parts with a single root container.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub(crate) parts: Vec<Part>,
    pub(crate) root: PartId,
}

impl Assembly {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    /// Get a part by ID (returns None if ID out of bounds).
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.slot())
    }

    pub fn find(&self, tag: &str) -> Option<PartId> {
        self.parts.iter().find(|p| p.tag == tag).map(|p| p.id)
    }

    pub fn children(&self, id: PartId) -> &[PartId] {
        self.part(id).map(|p| p.children.as_slice()).unwrap_or(&[])
    }

    /// Parts in post-order (every child before its parent), starting at `start`.
    ///
    /// Uses an explicit stack so deep trees cannot overflow.
    pub fn post_order_from(&self, start: PartId) -> Vec<PartId> {
        let mut order = Vec::with_capacity(self.parts.len());
        let mut stack = vec![(start, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for &child in self.children(id).iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    pub fn post_order(&self) -> Vec<PartId> {
        self.post_order_from(self.root)
    }

    /// Roll up mass properties of the sub-tree rooted at `id`.
    pub fn mass_properties_of(&self, id: PartId) -> MassProperties {
        if self.part(id).is_none() {
            return MassProperties::default();
        }
        let mut rolled: Vec<Option<MassProperties>> = vec![None; self.parts.len()];
        for pid in self.post_order_from(id) {
            let part = &self.parts[pid.slot()];
            let props = match &part.kind {
                PartKind::Component(props) => *props,
                PartKind::Container => {
                    let children: Vec<MassProperties> = part
                        .children
                        .iter()
                        .filter_map(|c| rolled[c.slot()])
                        .collect();
                    MassProperties::combine(children.iter())
                }
            };
            rolled[pid.slot()] = Some(props);
        }
        rolled[id.slot()].unwrap_or_default()
    }

    pub fn mass_properties(&self) -> MassProperties {
        self.mass_properties_of(self.root)
    }

    /// Update the mass of a component leaf (e.g. after resizing a battery).
    pub fn set_component_mass(&mut self, tag: &str, mass: f64) -> Option<()> {
        let part = self.parts.iter_mut().find(|p| p.tag == tag)?;
        match &mut part.kind {
            PartKind::Component(props) => {
                props.mass = mass;
                Some(())
            }
            PartKind::Container => None,
        }
    }
}
