//! Propulsor chains.
//!
//! A chain evaluates its stages in a fixed order for every time point:
//! ESC, motor, rotor, then the ESC current closure (or engine then rotor,
//! or the turbojet cycle). Each stage writes only its own record.

use crate::conditions::{
    EngineConditions, EscConditions, FreestreamSeries, GasTurbineConditions, MotorConditions,
    PropulsorConditions, RotorConditions, StageConditions, Vec3, cross,
};
use crate::error::{NetworkError, NetworkResult};
use pf_components::{
    Atmosphere, DcMotor, Esc, PistonEngine, RotorPerformance, Turbojet, load_coefficient,
};
use pf_core::Constants;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum ChainKind {
    ElectricRotor {
        esc: Esc,
        motor: DcMotor,
        rotor: Arc<dyn RotorPerformance>,
    },
    PistonRotor {
        engine: PistonEngine,
        rotor: Arc<dyn RotorPerformance>,
    },
    Turbojet(Turbojet),
}

/// Shared inputs for one chain evaluation.
#[derive(Clone, Copy, Debug)]
pub struct ChainInputs<'a> {
    pub freestream: &'a FreestreamSeries,
    pub throttle: &'a [f64],
    pub pitch: &'a [f64],
    /// Loaded bus voltage; empty for fuel lines
    pub bus_voltage: &'a [f64],
    pub constants: &'a Constants,
}

#[derive(Clone, Debug)]
pub struct PropulsorChain {
    pub tag: String,
    pub kind: ChainKind,
    /// Thrust application point relative to the vehicle reference (m)
    pub origin: Vec3,
    /// Unit thrust direction
    pub thrust_axis: Vec3,
}

impl PropulsorChain {
    pub fn new(tag: impl Into<String>, kind: ChainKind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            origin: [0.0; 3],
            thrust_axis: [1.0, 0.0, 0.0],
        }
    }

    pub fn electric(
        tag: impl Into<String>,
        esc: Esc,
        motor: DcMotor,
        rotor: Arc<dyn RotorPerformance>,
    ) -> Self {
        Self::new(tag, ChainKind::ElectricRotor { esc, motor, rotor })
    }

    pub fn piston(tag: impl Into<String>, engine: PistonEngine, rotor: Arc<dyn RotorPerformance>) -> Self {
        Self::new(tag, ChainKind::PistonRotor { engine, rotor })
    }

    pub fn turbojet(tag: impl Into<String>, jet: Turbojet) -> Self {
        Self::new(tag, ChainKind::Turbojet(jet))
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Set the thrust direction; normalized, must be non-zero.
    pub fn with_thrust_axis(mut self, axis: Vec3) -> NetworkResult<Self> {
        let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(NetworkError::Configuration {
                what: format!("propulsor '{}' thrust axis must be non-zero", self.tag),
            });
        }
        self.thrust_axis = [axis[0] / norm, axis[1] / norm, axis[2] / norm];
        Ok(self)
    }

    pub fn is_electric(&self) -> bool {
        matches!(self.kind, ChainKind::ElectricRotor { .. })
    }

    /// Rotor-driven chains carry a power-coefficient unknown and a torque
    /// residual.
    pub fn needs_torque_matching(&self) -> bool {
        self.rotor().is_some()
    }

    pub fn rotor(&self) -> Option<&dyn RotorPerformance> {
        match &self.kind {
            ChainKind::ElectricRotor { rotor, .. } | ChainKind::PistonRotor { rotor, .. } => {
                Some(rotor.as_ref())
            }
            ChainKind::Turbojet(_) => None,
        }
    }

    /// Zeroed condition record matching this chain's stages.
    pub fn new_conditions(&self, n: usize) -> PropulsorConditions {
        let stages = match &self.kind {
            ChainKind::ElectricRotor { .. } => StageConditions::Electric {
                esc: EscConditions::new(n),
                motor: MotorConditions::new(n),
                rotor: RotorConditions::new(n),
            },
            ChainKind::PistonRotor { .. } => StageConditions::Piston {
                engine: EngineConditions::new(n),
                rotor: RotorConditions::new(n),
            },
            ChainKind::Turbojet(_) => StageConditions::Turbojet(GasTurbineConditions::new(n)),
        };
        PropulsorConditions::new(n, stages)
    }

    /// Evaluate every time point into `out`.
    ///
    /// Rotor-driven chains read their power-coefficient guess from the rotor
    /// record, which must have been unpacked beforehand.
    pub fn evaluate(&self, inputs: &ChainInputs<'_>, out: &mut PropulsorConditions) -> NetworkResult<()> {
        let n = inputs.throttle.len();
        let rho_sl = inputs.constants.rho_sl();

        match (&self.kind, &mut out.stages) {
            (ChainKind::ElectricRotor { esc, motor, rotor }, StageConditions::Electric {
                esc: esc_out,
                motor: motor_out,
                rotor: rotor_out,
            }) => {
                if inputs.bus_voltage.len() != n {
                    return Err(NetworkError::Configuration {
                        what: format!("electric propulsor '{}' has no bus voltage", self.tag),
                    });
                }
                let diameter = rotor.geometry().diameter();
                for i in 0..n {
                    let fs = inputs.freestream.point(i);
                    let throttle = inputs.throttle[i];
                    let v_bus = inputs.bus_voltage[i];

                    let v_motor = esc.output_voltage(throttle, v_bus);
                    esc_out.throttle[i] = Esc::duty(throttle);
                    esc_out.input_voltage[i] = v_bus;
                    esc_out.output_voltage[i] = v_motor;

                    let cp = rotor_out.power_coefficient_guess[i];
                    let k = load_coefficient(cp, fs.density, diameter);
                    let mp = motor.operating_point(v_motor, k);
                    motor_out.voltage[i] = v_motor;
                    motor_out.omega[i] = mp.omega;
                    motor_out.torque[i] = mp.torque;
                    motor_out.current[i] = mp.current;
                    motor_out.efficiency[i] = mp.efficiency;
                    motor_out.stalled[i] = mp.stalled;

                    let pitch = inputs.pitch.get(i).copied().unwrap_or(0.0);
                    write_rotor(rotor.as_ref(), mp.omega, &fs, pitch, rotor_out, i);

                    let i_bus = esc.input_current(throttle, mp.current);
                    esc_out.output_current[i] = mp.current;
                    esc_out.input_current[i] = i_bus;

                    out.current[i] = i_bus;
                    out.power[i] = i_bus * v_bus;
                    out.fuel_rate[i] = 0.0;
                    out.thrust[i] = self.thrust_vector(rotor_out.thrust[i]);
                }
            }
            (ChainKind::PistonRotor { engine, rotor }, StageConditions::Piston {
                engine: engine_out,
                rotor: rotor_out,
            }) => {
                let diameter = rotor.geometry().diameter();
                for i in 0..n {
                    let fs = inputs.freestream.point(i);
                    let throttle = inputs.throttle[i];
                    let sigma = fs.density / rho_sl;

                    let cp = rotor_out.power_coefficient_guess[i];
                    let k = load_coefficient(cp, fs.density, diameter);
                    let ep = engine.operating_point(throttle, sigma, k);
                    engine_out.throttle[i] = throttle;
                    engine_out.omega[i] = ep.omega;
                    engine_out.torque[i] = ep.torque;
                    engine_out.power[i] = ep.power;
                    engine_out.fuel_rate[i] = ep.fuel_rate;
                    engine_out.stalled[i] = ep.stalled;

                    let pitch = inputs.pitch.get(i).copied().unwrap_or(0.0);
                    write_rotor(rotor.as_ref(), ep.omega, &fs, pitch, rotor_out, i);

                    out.current[i] = 0.0;
                    out.power[i] = ep.power;
                    out.fuel_rate[i] = ep.fuel_rate;
                    out.thrust[i] = self.thrust_vector(rotor_out.thrust[i]);
                }
            }
            (ChainKind::Turbojet(jet), StageConditions::Turbojet(jet_out)) => {
                for i in 0..n {
                    let fs = inputs.freestream.point(i);
                    let throttle = inputs.throttle[i];
                    let tp = jet.evaluate(throttle, &fs, inputs.constants);
                    jet_out.throttle[i] = throttle;
                    jet_out.mass_flow[i] = tp.mass_flow;
                    jet_out.fuel_rate[i] = tp.fuel_rate;
                    jet_out.thrust[i] = tp.thrust;
                    jet_out.t4[i] = tp.t4;
                    jet_out.spool_power[i] = tp.spool_power;
                    jet_out.exit_velocity[i] = tp.exit_velocity;
                    jet_out.choked[i] = tp.choked;

                    out.current[i] = 0.0;
                    out.power[i] = tp.spool_power;
                    out.fuel_rate[i] = tp.fuel_rate;
                    out.thrust[i] = self.thrust_vector(tp.thrust);
                }
            }
            _ => {
                return Err(NetworkError::Invariant {
                    what: format!("condition record of '{}' does not match its chain", self.tag),
                });
            }
        }

        self.write_moments(out);
        Ok(())
    }

    fn thrust_vector(&self, thrust: f64) -> Vec3 {
        [
            thrust * self.thrust_axis[0],
            thrust * self.thrust_axis[1],
            thrust * self.thrust_axis[2],
        ]
    }

    /// Moment of this chain's thrust about the vehicle reference.
    pub fn write_moments(&self, out: &mut PropulsorConditions) {
        for (m, f) in out.moment.iter_mut().zip(out.thrust.iter()) {
            *m = cross(self.origin, *f);
        }
    }

    /// Copy `source` into `out`, keeping this chain's own moments.
    pub fn copy_from(&self, source: &PropulsorConditions, out: &mut PropulsorConditions) {
        out.clone_from(source);
        self.write_moments(out);
    }

    /// Check that `other` would produce the same stage outputs as `self`.
    pub fn same_configuration(&self, other: &PropulsorChain) -> Result<(), &'static str> {
        // Copied thrust vectors keep the first chain's direction.
        if self.thrust_axis != other.thrust_axis {
            return Err("thrust axis");
        }
        match (&self.kind, &other.kind) {
            (
                ChainKind::ElectricRotor { esc, motor, rotor },
                ChainKind::ElectricRotor {
                    esc: esc_b,
                    motor: motor_b,
                    rotor: rotor_b,
                },
            ) => {
                if esc.efficiency != esc_b.efficiency {
                    return Err("ESC efficiency");
                }
                if !motor.same_model(motor_b) {
                    return Err("motor parameters");
                }
                same_rotor(rotor.as_ref(), rotor_b.as_ref())
            }
            (
                ChainKind::PistonRotor { engine, rotor },
                ChainKind::PistonRotor {
                    engine: engine_b,
                    rotor: rotor_b,
                },
            ) => {
                if !engine.same_model(engine_b) {
                    return Err("engine parameters");
                }
                same_rotor(rotor.as_ref(), rotor_b.as_ref())
            }
            (ChainKind::Turbojet(a), ChainKind::Turbojet(b)) => {
                if a.same_model(b) {
                    Ok(())
                } else {
                    Err("turbojet cycle parameters")
                }
            }
            _ => Err("chain type"),
        }
    }
}

fn write_rotor(
    rotor: &dyn RotorPerformance,
    omega: f64,
    fs: &pf_components::FreestreamPoint,
    pitch: f64,
    out: &mut RotorConditions,
    i: usize,
) {
    let loads = rotor.performance(omega, fs, pitch);
    out.pitch[i] = pitch;
    out.omega[i] = omega;
    out.thrust[i] = loads.thrust;
    out.torque[i] = loads.torque;
    out.power[i] = loads.power;
    out.power_coefficient[i] = loads.power_coefficient;
    out.thrust_coefficient[i] = loads.thrust_coefficient;
    out.figure_of_merit[i] = loads.figure_of_merit;
    out.tip_mach[i] = loads.tip_mach;
}

/// Rotor models are opaque, so compare geometry, seeds and a few probe
/// evaluations.
fn same_rotor(a: &dyn RotorPerformance, b: &dyn RotorPerformance) -> Result<(), &'static str> {
    if a.geometry() != b.geometry() {
        return Err("rotor geometry");
    }
    if a.design_power_coefficient() != b.design_power_coefficient()
        || a.default_power_coefficient() != b.default_power_coefficient()
    {
        return Err("rotor design power coefficient");
    }
    let atmosphere = Atmosphere::default();
    let probes = [
        (atmosphere.freestream(0.0, 0.0), 100.0, 0.0),
        (atmosphere.freestream(1000.0, 50.0), 250.0, 0.05),
    ];
    for (fs, omega, pitch) in probes {
        if a.performance(omega, &fs, pitch) != b.performance(omega, &fs, pitch) {
            return Err("rotor performance");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pf_components::CoefficientRotor;
    use pf_core::units::{amps, ohms};

    fn electric(tag: &str, kv: f64) -> PropulsorChain {
        PropulsorChain::electric(
            tag,
            Esc::new("esc", 0.95).unwrap(),
            DcMotor::new("motor", kv, ohms(0.05), amps(2.0), 1.0, 1.0).unwrap(),
            Arc::new(CoefficientRotor::new("rotor", 0.8, 3, 0.12, 0.05, 1.2).unwrap()),
        )
    }

    fn series(n: usize) -> FreestreamSeries {
        let fs = Atmosphere::default().freestream(500.0, 40.0);
        FreestreamSeries::from_points(&vec![fs; n])
    }

    #[test]
    fn electric_chain_writes_every_stage() {
        let chain = electric("prop", 1.5).with_origin([0.0, 2.0, 0.0]);
        let n = 3;
        let fs = series(n);
        let constants = Constants::default();
        let throttle = vec![0.8; n];
        let voltage = vec![400.0; n];
        let mut out = chain.new_conditions(n);
        if let StageConditions::Electric { rotor, .. } = &mut out.stages {
            rotor.power_coefficient_guess.fill(0.04);
        }
        let inputs = ChainInputs {
            freestream: &fs,
            throttle: &throttle,
            pitch: &[],
            bus_voltage: &voltage,
            constants: &constants,
        };
        chain.evaluate(&inputs, &mut out).unwrap();

        let StageConditions::Electric { esc, motor, rotor } = &out.stages else {
            panic!("wrong stage record");
        };
        assert_relative_eq!(esc.output_voltage[0], 320.0);
        assert!(motor.omega[0] > 0.0);
        assert!(rotor.thrust[0] > 0.0);
        assert_relative_eq!(out.current[0], motor.current[0] * 0.8 / 0.95);
        // thrust along +x at y = 2 gives a yawing moment about -z
        assert!(out.moment[0][2] < 0.0);
    }

    #[test]
    fn identical_chains_pass_validation() {
        assert!(electric("a", 1.5).same_configuration(&electric("b", 1.5)).is_ok());
        assert_eq!(
            electric("a", 1.5).same_configuration(&electric("b", 1.6)),
            Err("motor parameters")
        );
    }

    #[test]
    fn zero_thrust_axis_rejected() {
        assert!(electric("a", 1.5).with_thrust_axis([0.0; 3]).is_err());
        let c = electric("a", 1.5).with_thrust_axis([0.0, 0.0, -2.0]).unwrap();
        assert_eq!(c.thrust_axis, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn copy_keeps_own_moment() {
        let a = electric("a", 1.5).with_origin([0.0, 2.0, 0.0]);
        let b = electric("b", 1.5).with_origin([0.0, -2.0, 0.0]);
        let mut src = a.new_conditions(1);
        src.thrust[0] = [100.0, 0.0, 0.0];
        a.write_moments(&mut src);
        let mut dst = b.new_conditions(1);
        b.copy_from(&src, &mut dst);
        assert_eq!(dst.thrust, src.thrust);
        assert_eq!(dst.moment[0][2], -src.moment[0][2]);
    }
}
