//! Fuel tank.

use crate::common::check_positive;
use crate::error::{ComponentError, ComponentResult};
use pf_core::units::Mass;

#[derive(Clone, Debug, PartialEq)]
pub struct FuelTank {
    pub tag: String,
    /// Usable fuel capacity (kg)
    pub capacity: f64,
}

/// Persistent tank state carried across segments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelTankState {
    pub fuel_mass: f64,
}

impl FuelTank {
    pub fn new(tag: impl Into<String>, capacity: Mass) -> ComponentResult<Self> {
        check_positive(capacity.value, "tank capacity must be positive")?;
        Ok(Self {
            tag: tag.into(),
            capacity: capacity.value,
        })
    }

    pub fn full(&self) -> FuelTankState {
        FuelTankState {
            fuel_mass: self.capacity,
        }
    }

    /// State holding `fraction` of capacity.
    pub fn filled_to(&self, fraction: f64) -> ComponentResult<FuelTankState> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ComponentError::InvalidArg {
                what: "fill fraction must be in [0,1]",
            });
        }
        Ok(FuelTankState {
            fuel_mass: self.capacity * fraction,
        })
    }

    /// Deplete by `mass_rate` (kg/s) over `dt`. Fuel mass never goes negative
    /// and negative rates are ignored.
    pub fn step(&self, state: &FuelTankState, mass_rate: f64, dt: f64) -> FuelTankState {
        FuelTankState {
            fuel_mass: (state.fuel_mass - mass_rate.max(0.0) * dt).max(0.0),
        }
    }
}
