//! Vehicle: component tree, energy networks and thrust demand.

use crate::error::{MissionError, MissionResult};
use crate::throttle::ThrustDemand;
use pf_assembly::Assembly;
use pf_network::EnergyNetwork;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Vehicle {
    pub tag: String,
    pub assembly: Assembly,
    pub networks: Vec<EnergyNetwork>,
    /// Needed by segments with trimmed throttle
    pub thrust_demand: Option<Arc<dyn ThrustDemand>>,
}

impl Vehicle {
    pub fn new(tag: impl Into<String>, assembly: Assembly) -> Self {
        Self {
            tag: tag.into(),
            assembly,
            networks: Vec::new(),
            thrust_demand: None,
        }
    }

    /// Add a network. Line tags must be unique across the vehicle since they
    /// key the condition block.
    pub fn add_network(&mut self, network: EnergyNetwork) -> MissionResult<()> {
        let mut seen: BTreeSet<String> = self.line_tags().map(str::to_string).collect();
        for tag in line_tags(&network) {
            if !seen.insert(tag.to_string()) {
                return Err(MissionError::InvalidVehicle {
                    vehicle: self.tag.clone(),
                    what: format!("line tag '{tag}' appears in two networks"),
                });
            }
        }
        self.networks.push(network);
        Ok(())
    }

    pub fn with_thrust_demand(mut self, demand: Arc<dyn ThrustDemand>) -> Self {
        self.thrust_demand = Some(demand);
        self
    }

    /// Take-off mass from the component tree (kg).
    pub fn mass(&self) -> f64 {
        self.assembly.mass_properties().mass
    }

    pub fn line_tags(&self) -> impl Iterator<Item = &str> {
        self.networks.iter().flat_map(line_tags)
    }

    pub fn reset_networks(&mut self) {
        for network in &mut self.networks {
            network.reset();
        }
    }
}

fn line_tags(network: &EnergyNetwork) -> impl Iterator<Item = &str> {
    let lines = network.lines();
    lines
        .buses
        .keys()
        .chain(lines.fuel_lines.keys())
        .chain(lines.coolant_lines.keys())
}
