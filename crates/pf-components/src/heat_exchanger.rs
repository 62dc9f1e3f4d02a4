//! Cross-flow plate-fin heat exchanger between a coolant loop and ram air.
//!
//! Two bounded fixed-point loops are solved per call:
//!
//! 1. Thermal: outlet temperatures and effectiveness, with properties taken
//!    at the mean of inlet and guessed outlet temperature.
//! 2. Pressure: outlet pressures from the Kays-London core loss with
//!    entrance/exit losses and a wall-temperature friction correction.
//!
//! Each loop stops once every tracked quantity moves less than
//! [`LOOP_TOLERANCE`] or after [`MAX_LOOP_ITERATIONS`] passes, returning the
//! last estimate either way.

use crate::coolant::FluidProperties;
use crate::common::{EPSILON_MDOT, check_efficiency, check_non_negative, check_positive};
use crate::error::{ComponentError, ComponentResult};
use pf_core::numeric::clamp;
use tracing::debug;

pub const LOOP_TOLERANCE: f64 = 0.01;
pub const MAX_LOOP_ITERATIONS: usize = 10;

/// Offset-strip fin surface on one side of the core.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinSurface {
    /// Clear spacing between fins (m)
    pub fin_spacing: f64,
    /// Fin height between parting sheets (m)
    pub fin_height: f64,
    pub fin_thickness: f64,
    /// Strip length in the flow direction (m)
    pub strip_length: f64,
    /// Fin material conductivity (W/m/K)
    pub fin_conductivity: f64,
    /// Core frontal area seen by this stream (m^2)
    pub frontal_area: f64,
    /// Minimum free-flow area over frontal area
    pub free_flow_ratio: f64,
    /// Total wetted heat-transfer area (m^2)
    pub heat_transfer_area: f64,
    /// Fin area over total area
    pub fin_area_ratio: f64,
}

impl FinSurface {
    fn validate(&self) -> ComponentResult<()> {
        check_positive(self.fin_spacing, "fin spacing must be positive")?;
        check_positive(self.fin_height, "fin height must be positive")?;
        check_positive(self.fin_thickness, "fin thickness must be positive")?;
        check_positive(self.strip_length, "strip length must be positive")?;
        check_positive(self.fin_conductivity, "fin conductivity must be positive")?;
        check_positive(self.frontal_area, "frontal area must be positive")?;
        check_efficiency(self.free_flow_ratio, "free-flow ratio must be in (0,1]")?;
        check_positive(self.heat_transfer_area, "heat transfer area must be positive")?;
        if !(0.0..=1.0).contains(&self.fin_area_ratio) {
            return Err(ComponentError::InvalidArg {
                what: "fin area ratio must be in [0,1]",
            });
        }
        Ok(())
    }

    /// Manglik-Bergles hydraulic diameter.
    pub fn hydraulic_diameter(&self) -> f64 {
        let (s, h, t, l) = (
            self.fin_spacing,
            self.fin_height,
            self.fin_thickness,
            self.strip_length,
        );
        4.0 * s * h * l / (2.0 * (s * l + h * l + t * h) + t * s)
    }

    pub fn free_flow_area(&self) -> f64 {
        self.free_flow_ratio * self.frontal_area
    }

    /// Manglik-Bergles Colburn j and Fanning f.
    pub fn colburn_and_friction(&self, reynolds: f64) -> (f64, f64) {
        let re = reynolds.max(1.0);
        let alpha = self.fin_spacing / self.fin_height;
        let delta = self.fin_thickness / self.strip_length;
        let gamma = self.fin_thickness / self.fin_spacing;

        let j = 0.6522
            * re.powf(-0.5403)
            * alpha.powf(-0.1541)
            * delta.powf(0.1499)
            * gamma.powf(-0.0678)
            * (1.0
                + 5.269e-5
                    * re.powf(1.340)
                    * alpha.powf(0.504)
                    * delta.powf(0.456)
                    * gamma.powf(-1.055))
            .powf(0.1);
        let f = 9.6243
            * re.powf(-0.7422)
            * alpha.powf(-0.1856)
            * delta.powf(0.3053)
            * gamma.powf(-0.2659)
            * (1.0
                + 7.669e-8
                    * re.powf(4.429)
                    * alpha.powf(0.920)
                    * delta.powf(3.767)
                    * gamma.powf(0.236))
            .powf(0.1);
        (j, f)
    }
}

/// Boundary conditions for one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexInputs {
    pub coolant_inlet_temperature: f64,
    pub coolant_inlet_pressure: f64,
    pub air_inlet_temperature: f64,
    pub air_inlet_pressure: f64,
    /// Fraction of design flow on both streams
    pub turndown: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct HexOutputs {
    pub coolant_mass_flow: f64,
    pub air_mass_flow: f64,
    pub coolant_outlet_temperature: f64,
    pub air_outlet_temperature: f64,
    pub coolant_pressure_drop: f64,
    pub air_pressure_drop: f64,
    pub pump_power: f64,
    pub fan_power: f64,
    /// Heat moved from coolant to air (W)
    pub heat: f64,
    pub effectiveness: f64,
    pub thermal_iterations: usize,
    pub pressure_iterations: usize,
}

/// Film-side quantities at one loop pass.
#[derive(Clone, Copy, Debug)]
struct SideFilm {
    mass_velocity: f64,
    fanning: f64,
    /// Overall-surface-efficiency weighted conductance (W/K)
    conductance: f64,
    specific_heat: f64,
}

#[derive(Clone, Debug)]
pub struct CrossFlowHeatExchanger<C: FluidProperties, A: FluidProperties> {
    pub tag: String,
    pub coolant: C,
    pub air: A,
    pub coolant_surface: FinSurface,
    pub air_surface: FinSurface,
    /// Parting-sheet thermal resistance (K/W)
    pub wall_resistance: f64,
    pub design_coolant_flow: f64,
    pub design_air_flow: f64,
    pub pump_efficiency: f64,
    pub fan_efficiency: f64,
}

impl<C: FluidProperties, A: FluidProperties> CrossFlowHeatExchanger<C, A> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tag: impl Into<String>,
        coolant: C,
        air: A,
        coolant_surface: FinSurface,
        air_surface: FinSurface,
        design_coolant_flow: f64,
        design_air_flow: f64,
        pump_efficiency: f64,
        fan_efficiency: f64,
    ) -> ComponentResult<Self> {
        coolant_surface.validate()?;
        air_surface.validate()?;
        check_non_negative(design_coolant_flow, "design coolant flow cannot be negative")?;
        check_non_negative(design_air_flow, "design air flow cannot be negative")?;
        check_efficiency(pump_efficiency, "pump efficiency must be in (0,1]")?;
        check_efficiency(fan_efficiency, "fan efficiency must be in (0,1]")?;
        Ok(Self {
            tag: tag.into(),
            coolant,
            air,
            coolant_surface,
            air_surface,
            wall_resistance: 0.0,
            design_coolant_flow,
            design_air_flow,
            pump_efficiency,
            fan_efficiency,
        })
    }

    pub fn with_wall_resistance(mut self, resistance: f64) -> Self {
        self.wall_resistance = resistance.max(0.0);
        self
    }

    /// Solve the thermal and pressure loops for one time point.
    ///
    /// A turndown of zero (or any flow below the mass-flow floor) returns
    /// zero flows and powers with the inlet temperatures carried through.
    pub fn evaluate(&self, inputs: &HexInputs) -> HexOutputs {
        let turndown = clamp(inputs.turndown, 0.0, 1.0);
        let mdot_c = self.design_coolant_flow * turndown;
        let mdot_a = self.design_air_flow * turndown;

        if turndown <= 0.0 || mdot_c <= EPSILON_MDOT || mdot_a <= EPSILON_MDOT {
            return HexOutputs {
                coolant_outlet_temperature: inputs.coolant_inlet_temperature,
                air_outlet_temperature: inputs.air_inlet_temperature,
                ..HexOutputs::default()
            };
        }

        let tc_in = inputs.coolant_inlet_temperature;
        let ta_in = inputs.air_inlet_temperature;
        let pc = inputs.coolant_inlet_pressure;
        let pa = inputs.air_inlet_pressure;

        // Thermal loop
        let mut tc_out = tc_in;
        let mut ta_out = ta_in;
        let mut effectiveness = 0.0;
        let mut heat = 0.0;
        let mut thermal_iterations = 0;
        let mut converged = false;
        let mut films = (
            self.film(&self.coolant, &self.coolant_surface, mdot_c, tc_in),
            self.film(&self.air, &self.air_surface, mdot_a, ta_in),
        );

        while thermal_iterations < MAX_LOOP_ITERATIONS {
            thermal_iterations += 1;
            let tc_mean = 0.5 * (tc_in + tc_out);
            let ta_mean = 0.5 * (ta_in + ta_out);
            let fc = self.film(&self.coolant, &self.coolant_surface, mdot_c, tc_mean);
            let fa = self.film(&self.air, &self.air_surface, mdot_a, ta_mean);

            let ua = 1.0 / (1.0 / fc.conductance + self.wall_resistance + 1.0 / fa.conductance);
            let cap_c = mdot_c * fc.specific_heat;
            let cap_a = mdot_a * fa.specific_heat;
            let eps_new = cross_flow_unmixed(ua, cap_c, cap_a);

            heat = eps_new * cap_c.min(cap_a) * (tc_in - ta_in);
            let tc_new = tc_in - heat / cap_c;
            let ta_new = ta_in + heat / cap_a;

            let change = (tc_new - tc_out)
                .abs()
                .max((ta_new - ta_out).abs())
                .max((eps_new - effectiveness).abs());
            tc_out = tc_new;
            ta_out = ta_new;
            effectiveness = eps_new;
            films = (fc, fa);

            if change < LOOP_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            debug!(tag = %self.tag, "heat exchanger thermal loop hit iteration cap");
        }

        // Pressure loop
        let (fc, fa) = films;
        let conductance_sum = fc.conductance + fa.conductance;
        let tc_mean = 0.5 * (tc_in + tc_out);
        let ta_mean = 0.5 * (ta_in + ta_out);
        let wall_temperature = (fc.conductance * tc_mean + fa.conductance * ta_mean) / conductance_sum;

        let mut dp_c = 0.0;
        let mut dp_a = 0.0;
        let mut pressure_iterations = 0;
        converged = false;
        while pressure_iterations < MAX_LOOP_ITERATIONS {
            pressure_iterations += 1;
            let dp_c_new = self.core_pressure_drop(
                &self.coolant,
                &self.coolant_surface,
                &fc,
                (tc_in, tc_out),
                (pc, pc - dp_c),
                wall_temperature,
            );
            let dp_a_new = self.core_pressure_drop(
                &self.air,
                &self.air_surface,
                &fa,
                (ta_in, ta_out),
                (pa, pa - dp_a),
                wall_temperature,
            );
            let change = (dp_c_new - dp_c).abs().max((dp_a_new - dp_a).abs());
            dp_c = dp_c_new;
            dp_a = dp_a_new;
            if change < LOOP_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            debug!(tag = %self.tag, "heat exchanger pressure loop hit iteration cap");
        }

        let rho_c = self.coolant.density(tc_in, pc);
        let rho_a = self.air.density(ta_in, pa);

        HexOutputs {
            coolant_mass_flow: mdot_c,
            air_mass_flow: mdot_a,
            coolant_outlet_temperature: tc_out,
            air_outlet_temperature: ta_out,
            coolant_pressure_drop: dp_c,
            air_pressure_drop: dp_a,
            pump_power: mdot_c * dp_c / (rho_c * self.pump_efficiency),
            fan_power: mdot_a * dp_a / (rho_a * self.fan_efficiency),
            heat,
            effectiveness,
            thermal_iterations,
            pressure_iterations,
        }
    }

    fn film<F: FluidProperties>(
        &self,
        fluid: &F,
        surface: &FinSurface,
        mass_flow: f64,
        temperature: f64,
    ) -> SideFilm {
        let g = mass_flow / surface.free_flow_area();
        let dh = surface.hydraulic_diameter();
        let mu = fluid.viscosity(temperature);
        let cp = fluid.specific_heat(temperature);
        let re = g * dh / mu;
        let (j, f) = surface.colburn_and_friction(re);
        let h = j * g * cp / fluid.prandtl(temperature).powf(2.0 / 3.0);

        // Straight fin between two parting sheets, adiabatic at mid-height
        let m = (2.0 * h / (surface.fin_conductivity * surface.fin_thickness)).sqrt();
        let ml = m * 0.5 * surface.fin_height;
        let fin_eff = if ml > 1e-9 { ml.tanh() / ml } else { 1.0 };
        let surface_eff = 1.0 - surface.fin_area_ratio * (1.0 - fin_eff);

        SideFilm {
            mass_velocity: g,
            fanning: f,
            conductance: (surface_eff * h * surface.heat_transfer_area).max(1e-12),
            specific_heat: cp,
        }
    }

    /// Kays-London core pressure drop with entrance and exit losses.
    fn core_pressure_drop<F: FluidProperties>(
        &self,
        fluid: &F,
        surface: &FinSurface,
        film: &SideFilm,
        (t_in, t_out): (f64, f64),
        (p_in, p_out): (f64, f64),
        wall_temperature: f64,
    ) -> f64 {
        let sigma = surface.free_flow_ratio;
        let t_mean = 0.5 * (t_in + t_out);
        let rho_in = fluid.density(t_in, p_in);
        let rho_out = fluid.density(t_out, p_out.max(0.01 * p_in));
        let rho_mean = 2.0 / (1.0 / rho_in + 1.0 / rho_out);

        let kc = 0.42 * (1.0 - sigma * sigma).powi(2);
        let ke = (1.0 - sigma).powi(2);

        let correction = if fluid.is_gas() {
            (wall_temperature / t_mean).powf(0.81)
        } else {
            (fluid.viscosity(wall_temperature) / fluid.viscosity(t_mean)).powf(0.5)
        };
        let fanning = film.fanning * correction;
        let area_ratio = surface.heat_transfer_area / surface.free_flow_area();

        let g = film.mass_velocity;
        let dp = g * g / (2.0 * rho_in)
            * ((1.0 - sigma * sigma + kc) + 2.0 * (rho_in / rho_out - 1.0)
                + fanning * area_ratio * rho_in / rho_mean
                - (1.0 - sigma * sigma - ke) * rho_in / rho_out);
        // Keep the outlet pressure physical
        clamp(dp, 0.0, 0.99 * p_in)
    }
}

/// Cross-flow effectiveness with both streams unmixed.
fn cross_flow_unmixed(ua: f64, cap_a: f64, cap_b: f64) -> f64 {
    let c_min = cap_a.min(cap_b);
    let c_max = cap_a.max(cap_b);
    if c_min <= 0.0 {
        return 0.0;
    }
    let ntu = ua / c_min;
    let cr = c_min / c_max;
    let eps = if cr < 1e-9 {
        1.0 - (-ntu).exp()
    } else {
        1.0 - ((ntu.powf(0.22) / cr) * ((-cr * ntu.powf(0.78)).exp() - 1.0)).exp()
    };
    clamp(eps, 0.0, 1.0)
}
