//! Lithium-ion battery pack.
//!
//! The pack is stateless: [`BatteryState`] is owned by the caller and
//! advanced one explicit step at a time. Positive current discharges the
//! pack, negative current charges it.

use crate::common::{check_non_negative, check_positive};
use crate::error::{ComponentError, ComponentResult};
use pf_core::numeric::clamp;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Single cell parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BatteryCell {
    /// Rated capacity (Ah)
    pub capacity: f64,
    /// Voltage used for sizing and seeding (V)
    pub nominal_voltage: f64,
    /// Charge cut-off voltage (V)
    pub max_voltage: f64,
    /// Internal resistance at `reference_temperature` (ohm)
    pub resistance: f64,
    pub reference_temperature: f64,
    /// Arrhenius activation temperature E/R (K)
    pub activation_temperature: f64,
    /// Constant-current charge limit (A)
    pub max_charge_current: f64,
    pub mass: f64,
    /// Specific heat (J/kg/K)
    pub specific_heat: f64,
}

impl BatteryCell {
    /// Generic 18650 NMC cell.
    pub fn nmc_18650() -> Self {
        Self {
            capacity: 3.0,
            nominal_voltage: 3.6,
            max_voltage: 4.2,
            resistance: 0.02,
            reference_temperature: 298.15,
            activation_temperature: 2000.0,
            max_charge_current: 3.0,
            mass: 0.048,
            specific_heat: 1100.0,
        }
    }

    fn validate(&self) -> ComponentResult<()> {
        check_positive(self.capacity, "cell capacity must be positive")?;
        check_positive(self.nominal_voltage, "cell nominal voltage must be positive")?;
        check_positive(self.max_voltage, "cell maximum voltage must be positive")?;
        check_positive(self.resistance, "cell resistance must be positive")?;
        check_positive(self.reference_temperature, "reference temperature must be positive")?;
        check_non_negative(self.activation_temperature, "activation temperature cannot be negative")?;
        check_non_negative(self.max_charge_current, "charge current limit cannot be negative")?;
        check_positive(self.mass, "cell mass must be positive")?;
        check_positive(self.specific_heat, "cell specific heat must be positive")?;
        Ok(())
    }

    /// Open-circuit voltage as a cubic in state of charge.
    pub fn open_circuit_voltage(&self, soc: f64) -> f64 {
        let s = clamp(soc, 0.0, 1.0);
        3.2 + s * (1.4 + s * (-1.7 + s * 1.3))
    }

    pub fn resistance_at(&self, temperature: f64, growth: f64) -> f64 {
        let t = temperature.max(1.0);
        let arrhenius =
            (self.activation_temperature * (1.0 / t - 1.0 / self.reference_temperature)).exp();
        self.resistance * arrhenius * growth.max(0.0)
    }
}

/// Capacity fade and resistance growth with charge throughput.
///
/// ```text
/// retained = 1 - fade_coefficient * sqrt(Ah)
/// growth   = 1 + growth_coefficient * Ah
/// ```
/// `Ah` is throughput per cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgingModel {
    pub fade_coefficient: f64,
    pub growth_coefficient: f64,
}

impl Default for AgingModel {
    fn default() -> Self {
        Self {
            fade_coefficient: 1e-3,
            growth_coefficient: 1e-4,
        }
    }
}

/// Persistent pack state carried across segments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatteryState {
    pub soc: f64,
    /// Cell temperature (K)
    pub temperature: f64,
    /// Cumulative charge moved through one cell (Ah)
    pub charge_throughput: f64,
    /// Equivalent full cycles
    pub cycles: f64,
    /// Fraction of rated capacity still available
    pub capacity_retained: f64,
    /// Multiplier on internal resistance
    pub resistance_growth: f64,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            soc: 1.0,
            temperature: 298.15,
            charge_throughput: 0.0,
            cycles: 0.0,
            capacity_retained: 1.0,
            resistance_growth: 1.0,
        }
    }
}

impl BatteryState {
    pub fn depth_of_discharge(&self) -> f64 {
        1.0 - self.soc
    }
}

/// Demand placed on the pack for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BatteryLoad {
    /// Terminal power drawn (W); negative charges the pack
    Power(f64),
    /// Terminal current (A); negative charges the pack
    Current(f64),
}

/// Heat exchange with the surroundings over one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThermalEnvironment {
    pub ambient_temperature: f64,
    /// Convective conductance to ambient (W/K)
    pub conductance: f64,
    /// Heat carried away by the coolant loop (W)
    pub heat_removed: f64,
}

impl ThermalEnvironment {
    pub fn adiabatic(ambient_temperature: f64) -> Self {
        Self {
            ambient_temperature,
            conductance: 0.0,
            heat_removed: 0.0,
        }
    }
}

/// Pack outputs at one time point.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct BatteryStep {
    pub current: f64,
    pub open_circuit_voltage: f64,
    pub voltage_under_load: f64,
    pub power: f64,
    pub resistance: f64,
    /// Joule heating (W)
    pub heat_generated: f64,
    /// Set when a power demand exceeded the pack's maximum deliverable power
    pub power_limited: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatteryPack {
    pub tag: String,
    pub cell: BatteryCell,
    pub series: u32,
    pub parallel: u32,
    pub aging: AgingModel,
}

impl BatteryPack {
    pub fn new(
        tag: impl Into<String>,
        cell: BatteryCell,
        series: u32,
        parallel: u32,
    ) -> ComponentResult<Self> {
        cell.validate()?;
        if series == 0 || parallel == 0 {
            return Err(ComponentError::InvalidArg {
                what: "pack needs at least one cell in series and in parallel",
            });
        }
        Ok(Self {
            tag: tag.into(),
            cell,
            series,
            parallel,
            aging: AgingModel::default(),
        })
    }

    pub fn with_aging(mut self, aging: AgingModel) -> Self {
        self.aging = aging;
        self
    }

    pub fn cell_count(&self) -> u32 {
        self.series * self.parallel
    }

    pub fn mass(&self) -> f64 {
        self.cell.mass * self.cell_count() as f64
    }

    pub fn heat_capacity(&self) -> f64 {
        self.mass() * self.cell.specific_heat
    }

    pub fn nominal_voltage(&self) -> f64 {
        self.series as f64 * self.cell.nominal_voltage
    }

    pub fn max_voltage(&self) -> f64 {
        self.series as f64 * self.cell.max_voltage
    }

    /// Usable capacity in amp-hours.
    pub fn capacity(&self, state: &BatteryState) -> f64 {
        self.cell.capacity * self.parallel as f64 * state.capacity_retained
    }

    pub fn open_circuit_voltage(&self, soc: f64) -> f64 {
        self.series as f64 * self.cell.open_circuit_voltage(soc)
    }

    pub fn resistance(&self, state: &BatteryState) -> f64 {
        self.cell.resistance_at(state.temperature, state.resistance_growth) * self.series as f64
            / self.parallel as f64
    }

    /// Current satisfying `P = I (Voc - I R)`, clamped at the maximum-power
    /// point `I = Voc / 2R`. Returns the current and whether it was clamped.
    pub fn current_for_power(&self, state: &BatteryState, power: f64) -> (f64, bool) {
        let voc = self.open_circuit_voltage(state.soc);
        let r = self.resistance(state);
        let disc = voc * voc - 4.0 * r * power;
        if disc < 0.0 {
            return (voc / (2.0 * r), true);
        }
        // Low-current root, stable form
        (2.0 * power / (voc + disc.sqrt()), false)
    }

    /// Constant-current / constant-voltage charge acceptance (A, positive).
    pub fn allowed_charge_current(&self, state: &BatteryState) -> f64 {
        let cc = self.cell.max_charge_current * self.parallel as f64;
        let voc = self.open_circuit_voltage(state.soc);
        let r = self.resistance(state);
        let cv = ((self.max_voltage() - voc) / r).max(0.0);
        cc.min(cv)
    }

    /// Terminal quantities for `load` without advancing the state.
    pub fn evaluate(&self, state: &BatteryState, load: BatteryLoad) -> BatteryStep {
        let (current, power_limited) = match load {
            BatteryLoad::Power(p) => self.current_for_power(state, p),
            BatteryLoad::Current(i) => (i, false),
        };
        let voc = self.open_circuit_voltage(state.soc);
        let r = self.resistance(state);
        let voltage = voc - current * r;
        BatteryStep {
            current,
            open_circuit_voltage: voc,
            voltage_under_load: voltage,
            power: voltage * current,
            resistance: r,
            heat_generated: current * current * r,
            power_limited,
        }
    }

    /// Forward-Euler step of length `dt`.
    ///
    /// State of charge is clamped to [0, 1]. A `temperature_override`
    /// replaces the thermal balance result.
    pub fn step(
        &self,
        state: &BatteryState,
        out: &BatteryStep,
        dt: f64,
        env: &ThermalEnvironment,
        temperature_override: Option<f64>,
    ) -> BatteryState {
        let capacity = self.capacity(state);
        let dq = out.current * dt / SECONDS_PER_HOUR;
        let soc = if capacity > 0.0 {
            clamp(state.soc - dq / capacity, 0.0, 1.0)
        } else {
            state.soc
        };

        let temperature = match temperature_override {
            Some(t) => t,
            None => {
                let q_net = out.heat_generated
                    - env.heat_removed
                    - env.conductance * (state.temperature - env.ambient_temperature);
                state.temperature + dt * q_net / self.heat_capacity()
            }
        };

        BatteryState {
            soc,
            temperature,
            charge_throughput: state.charge_throughput + dq.abs() / self.parallel as f64,
            ..*state
        }
    }

    /// Fold accumulated throughput into cycle count, fade and growth.
    pub fn age(&self, state: &mut BatteryState) {
        let ah = state.charge_throughput.max(0.0);
        state.cycles = ah / (2.0 * self.cell.capacity);
        state.capacity_retained = clamp(1.0 - self.aging.fade_coefficient * ah.sqrt(), 0.0, 1.0);
        state.resistance_growth = 1.0 + self.aging.growth_coefficient * ah;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn pack() -> BatteryPack {
        BatteryPack::new("pack", BatteryCell::nmc_18650(), 100, 20).unwrap()
    }

    #[test]
    fn open_circuit_voltage_is_monotone() {
        let cell = BatteryCell::nmc_18650();
        let mut prev = cell.open_circuit_voltage(0.0);
        for i in 1..=100 {
            let v = cell.open_circuit_voltage(i as f64 / 100.0);
            assert!(v > prev);
            prev = v;
        }
        assert_relative_eq!(cell.open_circuit_voltage(1.0), 4.2, epsilon = 1e-12);
    }

    #[test]
    fn power_demand_satisfies_terminal_balance() {
        let p = pack();
        let s = BatteryState::default();
        let out = p.evaluate(&s, BatteryLoad::Power(40e3));
        assert!(!out.power_limited);
        assert_relative_eq!(out.power, 40e3, max_relative = 1e-10);
        assert!(out.voltage_under_load < out.open_circuit_voltage);
    }

    #[test]
    fn excessive_power_clamps_at_max_power_point() {
        let p = pack();
        let s = BatteryState::default();
        let out = p.evaluate(&s, BatteryLoad::Power(1e9));
        assert!(out.power_limited);
        assert_relative_eq!(out.voltage_under_load, 0.5 * out.open_circuit_voltage);
    }

    #[test]
    fn discharge_lowers_soc_and_charge_raises_it() {
        let p = pack();
        let s = BatteryState {
            soc: 0.5,
            ..BatteryState::default()
        };
        let env = ThermalEnvironment::adiabatic(298.15);

        let out = p.evaluate(&s, BatteryLoad::Current(50.0));
        let next = p.step(&s, &out, 10.0, &env, None);
        assert!(next.soc < s.soc);
        assert!(next.temperature > s.temperature);
        assert_relative_eq!(next.soc + next.depth_of_discharge(), 1.0);

        let out = p.evaluate(&s, BatteryLoad::Current(-50.0));
        let next = p.step(&s, &out, 10.0, &env, None);
        assert!(next.soc > s.soc);
        assert!(out.voltage_under_load > out.open_circuit_voltage);
    }

    #[test]
    fn soc_never_leaves_unit_interval() {
        let p = pack();
        let s = BatteryState {
            soc: 0.001,
            ..BatteryState::default()
        };
        let out = p.evaluate(&s, BatteryLoad::Current(500.0));
        let next = p.step(&s, &out, 3600.0, &ThermalEnvironment::adiabatic(298.15), None);
        assert_eq!(next.soc, 0.0);
    }

    #[test]
    fn temperature_override_wins() {
        let p = pack();
        let s = BatteryState::default();
        let out = p.evaluate(&s, BatteryLoad::Current(200.0));
        let next = p.step(&s, &out, 60.0, &ThermalEnvironment::adiabatic(298.15), Some(305.0));
        assert_eq!(next.temperature, 305.0);
    }

    #[test]
    fn coolant_removes_heat() {
        let p = pack();
        let s = BatteryState::default();
        let out = p.evaluate(&s, BatteryLoad::Current(200.0));
        let hot = p.step(&s, &out, 60.0, &ThermalEnvironment::adiabatic(298.15), None);
        let env = ThermalEnvironment {
            heat_removed: out.heat_generated,
            ..ThermalEnvironment::adiabatic(298.15)
        };
        let cooled = p.step(&s, &out, 60.0, &env, None);
        assert!(cooled.temperature < hot.temperature);
        assert_relative_eq!(cooled.temperature, s.temperature, epsilon = 1e-12);
    }

    #[test]
    fn charge_acceptance_tapers_near_full() {
        let p = pack();
        let low = BatteryState {
            soc: 0.2,
            ..BatteryState::default()
        };
        let full = BatteryState::default();
        assert_relative_eq!(p.allowed_charge_current(&low), 60.0);
        assert_abs_diff_eq!(p.allowed_charge_current(&full), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn aging_reduces_capacity_and_raises_resistance() {
        let p = pack();
        let mut s = BatteryState {
            charge_throughput: 400.0,
            ..BatteryState::default()
        };
        let fresh = BatteryState::default();
        p.age(&mut s);
        assert!(p.capacity(&s) < p.capacity(&fresh));
        assert!(p.resistance(&s) > p.resistance(&fresh));
        assert_relative_eq!(s.cycles, 400.0 / 6.0);
    }

    #[test]
    fn cold_cells_have_higher_resistance() {
        let cell = BatteryCell::nmc_18650();
        assert!(cell.resistance_at(263.15, 1.0) > cell.resistance_at(298.15, 1.0));
        assert_relative_eq!(cell.resistance_at(298.15, 1.0), 0.02);
    }
}
