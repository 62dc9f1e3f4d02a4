//! Propulsor bookkeeping shared by buses and fuel lines.
//!
//! With identical propulsors only the first chain on a line carries an
//! unknown and a residual; its outputs are copied onto the others.

use crate::chain::{ChainInputs, PropulsorChain};
use crate::conditions::{LineConditions, PropulsorConditions};
use crate::error::{NetworkError, NetworkResult};
use crate::names;
use crate::segment::Segment;
use crate::state_vector::StateVector;
use pf_core::TagMap;
use tracing::trace;

/// Chains whose power coefficient is solved for.
pub fn matched<'a>(
    chains: &'a TagMap<PropulsorChain>,
    identical: bool,
) -> impl Iterator<Item = &'a PropulsorChain> + 'a {
    let take = if identical { 1 } else { chains.len() };
    chains
        .values()
        .take(take)
        .filter(|c| c.needs_torque_matching())
}

pub fn allocate(
    chains: &TagMap<PropulsorChain>,
    n: usize,
    line: &mut LineConditions,
) -> NetworkResult<()> {
    for chain in chains.values() {
        line.propulsors
            .insert(chain.tag.clone(), chain.new_conditions(n))?;
    }
    Ok(())
}

pub fn declare(
    segment: &mut Segment,
    line_tag: &str,
    chains: &TagMap<PropulsorChain>,
    identical: bool,
) -> NetworkResult<()> {
    for chain in matched(chains, identical) {
        let seed = names::power_coefficient_seed(segment, line_tag, chain)?;
        trace!(line = line_tag, propulsor = %chain.tag, seed, "power coefficient seed");
        segment
            .unknowns
            .declare(names::power_coefficient(line_tag, &chain.tag), seed)?;
        segment
            .residuals
            .declare(names::torque(line_tag, &chain.tag), 0.0)?;
    }
    Ok(())
}

/// Copy power-coefficient guesses into the rotor records.
pub fn unpack(
    unknowns: &StateVector,
    line_tag: &str,
    chains: &TagMap<PropulsorChain>,
    identical: bool,
    line: &mut LineConditions,
) -> NetworkResult<()> {
    for chain in matched(chains, identical) {
        let guess = unknowns.require(&names::power_coefficient(line_tag, &chain.tag))?;
        let rotor = line
            .propulsors
            .require_mut(&chain.tag)?
            .stages
            .rotor_mut()
            .ok_or_else(|| NetworkError::Invariant {
                what: format!("propulsor '{}' has no rotor record", chain.tag),
            })?;
        rotor.power_coefficient_guess.copy_from_slice(guess);
    }
    Ok(())
}

pub fn evaluate(
    chains: &TagMap<PropulsorChain>,
    identical: bool,
    inputs: &ChainInputs<'_>,
    outputs: &mut TagMap<PropulsorConditions>,
) -> NetworkResult<()> {
    if identical {
        let mut rest_chains = chains.values();
        let Some(first_chain) = rest_chains.next() else {
            return Ok(());
        };
        let Some((first_out, rest_out)) = outputs.split_first_mut() else {
            return Ok(());
        };
        first_chain.evaluate(inputs, first_out)?;
        for (chain, (_, out)) in rest_chains.zip(rest_out) {
            chain.copy_from(first_out, out);
        }
    } else {
        for chain in chains.values() {
            chain.evaluate(inputs, outputs.require_mut(&chain.tag)?)?;
        }
    }
    Ok(())
}

/// Drive-shaft torque minus rotor torque for every matched chain.
pub fn residuals(
    residuals: &mut StateVector,
    line_tag: &str,
    chains: &TagMap<PropulsorChain>,
    identical: bool,
    line: &LineConditions,
) -> NetworkResult<()> {
    for chain in matched(chains, identical) {
        let out = line.propulsors.require(&chain.tag)?;
        let drive = out.stages.drive_torque().ok_or_else(|| NetworkError::Invariant {
            what: format!("propulsor '{}' has no drive shaft", chain.tag),
        })?;
        let rotor = out.stages.rotor().ok_or_else(|| NetworkError::Invariant {
            what: format!("propulsor '{}' has no rotor record", chain.tag),
        })?;
        let r = residuals.require_mut(&names::torque(line_tag, &chain.tag))?;
        for ((r, q), q_rotor) in r.iter_mut().zip(drive).zip(&rotor.torque) {
            *r = q - q_rotor;
        }
    }
    Ok(())
}

/// Every chain must reproduce the first chain's outputs.
pub fn validate_identical(line_tag: &str, chains: &TagMap<PropulsorChain>) -> NetworkResult<()> {
    let mut rest = chains.values();
    let Some(first) = rest.next() else {
        return Ok(());
    };
    for chain in rest {
        first
            .same_configuration(chain)
            .map_err(|what| NetworkError::NotIdentical {
                line: line_tag.to_string(),
                first: first.tag.clone(),
                propulsor: chain.tag.clone(),
                what,
            })?;
    }
    Ok(())
}
