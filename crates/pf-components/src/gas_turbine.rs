//! Single-spool turbojet cycle.
//!
//! Stations follow the usual numbering: 0 freestream, 2 compressor face,
//! 3 compressor exit, 4 turbine inlet, 5 turbine exit, 9 nozzle exit. Total
//! quantities carry a `t` suffix.

use crate::atmosphere::FreestreamPoint;
use crate::common::{EPSILON_MDOT, check_efficiency, check_positive};
use crate::error::{ComponentError, ComponentResult};
use pf_core::Constants;
use pf_core::numeric::clamp;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Compressor {
    pub pressure_ratio: f64,
    pub polytropic_efficiency: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combustor {
    /// Combustion efficiency
    pub efficiency: f64,
    /// Total pressure ratio across the burner (< 1)
    pub pressure_ratio: f64,
    /// Fuel lower heating value (J/kg)
    pub lower_heating_value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Turbine {
    pub polytropic_efficiency: f64,
    pub mechanical_efficiency: f64,
}

/// Convergent nozzle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nozzle {
    /// Total pressure ratio across the nozzle (< 1)
    pub pressure_ratio: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TurbojetPoint {
    /// Core air mass flow (kg/s)
    pub mass_flow: f64,
    pub fuel_rate: f64,
    pub thrust: f64,
    /// Turbine inlet total temperature (K)
    pub t4: f64,
    /// Compressor shaft power (W)
    pub spool_power: f64,
    pub exit_velocity: f64,
    pub choked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Turbojet {
    pub tag: String,
    pub compressor: Compressor,
    pub combustor: Combustor,
    pub turbine: Turbine,
    pub nozzle: Nozzle,
    /// Sea-level static corrected air flow (kg/s)
    pub design_mass_flow: f64,
    pub t4_idle: f64,
    pub t4_max: f64,
    /// Hot-section specific heat (J/kg/K)
    pub hot_cp: f64,
    pub hot_gamma: f64,
}

impl Turbojet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tag: impl Into<String>,
        compressor: Compressor,
        combustor: Combustor,
        turbine: Turbine,
        nozzle: Nozzle,
        design_mass_flow: f64,
        t4_idle: f64,
        t4_max: f64,
    ) -> ComponentResult<Self> {
        if !(compressor.pressure_ratio >= 1.0) {
            return Err(ComponentError::InvalidArg {
                what: "compressor pressure ratio must be at least 1",
            });
        }
        check_efficiency(compressor.polytropic_efficiency, "compressor efficiency must be in (0,1]")?;
        check_efficiency(combustor.efficiency, "combustion efficiency must be in (0,1]")?;
        check_efficiency(combustor.pressure_ratio, "burner pressure ratio must be in (0,1]")?;
        check_positive(combustor.lower_heating_value, "heating value must be positive")?;
        check_efficiency(turbine.polytropic_efficiency, "turbine efficiency must be in (0,1]")?;
        check_efficiency(turbine.mechanical_efficiency, "spool efficiency must be in (0,1]")?;
        check_efficiency(nozzle.pressure_ratio, "nozzle pressure ratio must be in (0,1]")?;
        check_positive(design_mass_flow, "design mass flow must be positive")?;
        check_positive(t4_idle, "idle turbine inlet temperature must be positive")?;
        if !(t4_max >= t4_idle) {
            return Err(ComponentError::InvalidArg {
                what: "maximum turbine inlet temperature below idle",
            });
        }

        Ok(Self {
            tag: tag.into(),
            compressor,
            combustor,
            turbine,
            nozzle,
            design_mass_flow,
            t4_idle,
            t4_max,
            hot_cp: 1148.0,
            hot_gamma: 4.0 / 3.0,
        })
    }

    /// Evaluate the cycle. Throttle scales turbine inlet temperature between
    /// idle and maximum.
    pub fn evaluate(
        &self,
        throttle: f64,
        freestream: &FreestreamPoint,
        constants: &Constants,
    ) -> TurbojetPoint {
        let gamma_c = constants.gamma_air;
        let cp_c = constants.cp_air();
        let gamma_h = self.hot_gamma;
        let cp_h = self.hot_cp;
        let r_h = cp_h * (gamma_h - 1.0) / gamma_h;

        let t0 = freestream.temperature;
        let p0 = freestream.pressure;
        let v0 = freestream.velocity.max(0.0);
        let mach = freestream.mach();

        // Inlet, full recovery
        let ram = 1.0 + 0.5 * (gamma_c - 1.0) * mach * mach;
        let tt2 = t0 * ram;
        let pt2 = p0 * ram.powf(gamma_c / (gamma_c - 1.0));

        let delta = pt2 / constants.p_sl;
        let theta = tt2 / constants.t_sl;
        let mass_flow = self.design_mass_flow * delta / theta.sqrt();
        if !(mass_flow > EPSILON_MDOT) {
            return TurbojetPoint::default();
        }

        // Compressor
        let pi_c = self.compressor.pressure_ratio;
        let tau_c = pi_c.powf((gamma_c - 1.0) / (gamma_c * self.compressor.polytropic_efficiency));
        let tt3 = tt2 * tau_c;
        let pt3 = pt2 * pi_c;
        let work_c = cp_c * (tt3 - tt2);

        // Combustor energy balance
        let t4 = self.t4_idle + clamp(throttle, 0.0, 1.0) * (self.t4_max - self.t4_idle);
        let heat = self.combustor.efficiency * self.combustor.lower_heating_value - cp_h * t4;
        let far = if heat > 0.0 {
            ((cp_h * t4 - cp_c * tt3) / heat).max(0.0)
        } else {
            0.0
        };
        let pt4 = pt3 * self.combustor.pressure_ratio;

        // Spool balance
        let hot_flow = 1.0 + far;
        let tt5 = t4 - work_c / (hot_flow * cp_h * self.turbine.mechanical_efficiency);
        if !(tt5 > 0.0) || far == 0.0 {
            return TurbojetPoint {
                mass_flow,
                t4,
                spool_power: mass_flow * work_c,
                ..TurbojetPoint::default()
            };
        }
        let pi_t = (tt5 / t4)
            .powf(gamma_h / ((gamma_h - 1.0) * self.turbine.polytropic_efficiency));
        let pt9 = pt4 * pi_t * self.nozzle.pressure_ratio;

        let (exit_velocity, exit_pressure, exit_temperature, choked) =
            expand_convergent(tt5, pt9, p0, gamma_h, cp_h);

        let exit_flow = mass_flow * hot_flow;
        let pressure_thrust = if choked && exit_velocity > 0.0 {
            let rho_e = exit_pressure / (r_h * exit_temperature);
            let area = exit_flow / (rho_e * exit_velocity);
            area * (exit_pressure - p0)
        } else {
            0.0
        };

        TurbojetPoint {
            mass_flow,
            fuel_rate: mass_flow * far,
            thrust: exit_flow * exit_velocity - mass_flow * v0 + pressure_thrust,
            t4,
            spool_power: mass_flow * work_c,
            exit_velocity,
            choked,
        }
    }

    pub fn same_model(&self, other: &Turbojet) -> bool {
        self.compressor == other.compressor
            && self.combustor == other.combustor
            && self.turbine == other.turbine
            && self.nozzle == other.nozzle
            && self.design_mass_flow == other.design_mass_flow
            && self.t4_idle == other.t4_idle
            && self.t4_max == other.t4_max
    }
}

/// Returns exit velocity, static pressure, static temperature and the choked
/// flag for a convergent nozzle.
fn expand_convergent(tt: f64, pt: f64, p_amb: f64, gamma: f64, cp: f64) -> (f64, f64, f64, bool) {
    if !(pt > p_amb) {
        return (0.0, p_amb, tt, false);
    }
    let critical = (0.5 * (gamma + 1.0)).powf(gamma / (gamma - 1.0));
    if pt / p_amb >= critical {
        let te = 2.0 * tt / (gamma + 1.0);
        let r = cp * (gamma - 1.0) / gamma;
        ((gamma * r * te).sqrt(), pt / critical, te, true)
    } else {
        let te = tt * (p_amb / pt).powf((gamma - 1.0) / gamma);
        ((2.0 * cp * (tt - te)).max(0.0).sqrt(), p_amb, te, false)
    }
}
