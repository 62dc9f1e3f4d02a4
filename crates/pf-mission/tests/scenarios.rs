//! End-to-end missions on small reference vehicles.

use approx::assert_relative_eq;
use pf_assembly::AssemblyBuilder;
use pf_components::{
    BatteryCell, BatteryPack, CoefficientRotor, DcMotor, Esc, FuelTank, PistonEngine,
};
use pf_core::units::{amps, kg, ohms, watts};
use pf_mission::{
    HoverDemand, Mission, MissionConfig, MissionError, Profile, SegmentSpec, ThrottleControl,
    Vehicle,
};
use pf_network::{
    BatterySource, Bus, EnergyNetwork, FuelLine, FuelTankSource, NetworkLines, PropulsorChain,
    StageConditions,
};
use std::sync::Arc;

fn rotor() -> Arc<CoefficientRotor> {
    Arc::new(CoefficientRotor::new("rotor", 0.9, 3, 0.11, 0.045, 1.1).unwrap())
}

fn electric_prop(tag: &str, y: f64, axis: [f64; 3]) -> PropulsorChain {
    PropulsorChain::electric(
        tag,
        Esc::new("esc", 0.95).unwrap(),
        DcMotor::new("motor", 1.2, ohms(0.04), amps(3.0), 1.0, 1.0).unwrap(),
        rotor(),
    )
    .with_origin([0.0, y, 0.0])
    .with_thrust_axis(axis)
    .unwrap()
}

fn electric_vehicle(identical: bool, soc: f64, axis: [f64; 3]) -> Vehicle {
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 110, 60).unwrap();
    let pack_mass = pack.mass();
    let mut bus = Bus::new("bus").with_identical_propulsors(identical);
    bus.add_battery(BatterySource::new(pack).with_initial_soc(soc).unwrap())
        .unwrap();
    bus.add_propulsor(electric_prop("prop_1", 2.0, axis)).unwrap();
    bus.add_propulsor(electric_prop("prop_2", -2.0, axis)).unwrap();
    let network =
        EnergyNetwork::all_electric("electric", NetworkLines::new().with_bus(bus).unwrap()).unwrap();

    let mut builder = AssemblyBuilder::new("vehicle");
    let root = builder.root();
    builder.add_component("battery", root, pack_mass, [1.0, 0.0, 0.0]);
    builder.add_component("structure", root, 300.0, [1.5, 0.0, 0.0]);
    let mut vehicle = Vehicle::new("demo", builder.build().unwrap());
    vehicle.add_network(network).unwrap();
    vehicle
}

fn cruise(n: usize) -> SegmentSpec {
    SegmentSpec::new(
        "cruise",
        Profile::Cruise {
            altitude: 500.0,
            speed: 45.0,
            distance: 2700.0,
        },
        n,
    )
    .with_throttle(ThrottleControl::Fixed(0.8))
}

#[test]
fn two_propulsor_cruise_balances_torque() {
    let mut vehicle = electric_vehicle(true, 0.9, [1.0, 0.0, 0.0]);
    let mission = Mission::new("m").with_segment(cruise(5));
    let results = mission.run(&mut vehicle).unwrap();
    let r = &results.segments[0];
    assert!(r.converged);
    assert!(r.residual_norm < 1e-6);
    assert!(r.segment.residuals.max_abs() < 1e-6);

    let line = r.segment.conditions.line("bus").unwrap();
    let p1 = line.propulsors.require("prop_1").unwrap();
    let p2 = line.propulsors.require("prop_2").unwrap();
    assert_eq!(p1.thrust, p2.thrust);
    for i in 0..5 {
        assert!(p1.thrust[i][0] > 0.0);
        assert_relative_eq!(p1.moment[i][2], -p2.moment[i][2]);
        assert!(p1.moment[i][2] != p2.moment[i][2]);
    }

    let StageConditions::Electric { motor, rotor, .. } = &p1.stages else {
        panic!("electric stages expected");
    };
    for i in 0..5 {
        assert!(!motor.stalled[i]);
        assert!((motor.torque[i] - rotor.torque[i]).abs() < 1e-6);
    }

    let battery = line.batteries.require("pack").unwrap();
    assert_eq!(battery.soc[0], 0.9);
    assert!(battery.soc.windows(2).all(|w| w[1] < w[0]));
    for (soc, dod) in battery.soc.iter().zip(&battery.dod) {
        assert!((soc + dod - 1.0).abs() < 1e-12);
    }
    for i in 0..5 {
        assert_relative_eq!(line.voltage_under_load[i], line.predicted_voltage[i], epsilon = 1e-6);
    }
}

#[test]
fn non_identical_flag_gives_same_thrust_for_same_chains() {
    let mut a = electric_vehicle(true, 0.9, [1.0, 0.0, 0.0]);
    let mut b = electric_vehicle(false, 0.9, [1.0, 0.0, 0.0]);
    let mission = Mission::new("m").with_segment(cruise(3));
    let ra = mission.run(&mut a).unwrap();
    let rb = mission.run(&mut b).unwrap();
    assert!(ra.all_converged() && rb.all_converged());
    let ta = ra.segments[0].segment.conditions.total_thrust[2][0];
    let tb = rb.segments[0].segment.conditions.total_thrust[2][0];
    assert_relative_eq!(ta, tb, max_relative = 1e-6);
}

#[test]
fn recharge_after_cruise_charges_at_commanded_current() {
    let mut vehicle = electric_vehicle(false, 0.9, [1.0, 0.0, 0.0]);
    let mission = Mission::new("m").with_segment(cruise(4)).with_segment(SegmentSpec::new(
        "charge",
        Profile::Recharge {
            altitude: 0.0,
            duration: 300.0,
            current: Some(100.0),
        },
        5,
    ));
    let results = mission.run(&mut vehicle).unwrap();
    assert!(results.all_converged());

    let charge = &results.segment("charge").unwrap().segment;
    let names: Vec<&str> = charge.unknowns.names().collect();
    assert_eq!(names, ["bus.recharge_current"]);

    let line = charge.conditions.line("bus").unwrap();
    for &i in &line.recharge_current {
        assert_relative_eq!(i, 100.0, epsilon = 1e-6);
    }
    let battery = line.batteries.require("pack").unwrap();
    assert!(battery.recharging.iter().all(|&r| r));
    assert!(battery.soc.windows(2).all(|w| w[1] >= w[0]));

    let cruise_end = results.segment("cruise").unwrap().segment.conditions.line("bus").unwrap();
    let cruise_battery = cruise_end.batteries.require("pack").unwrap();
    assert_eq!(cruise_battery.state_at(3), battery.state_at(0));
    assert!(results.final_state_of_charge("bus", "pack").unwrap() > battery.soc[0]);
}

#[test]
fn climb_then_cruise_chains_state_bit_for_bit() {
    let mut vehicle = electric_vehicle(false, 0.95, [1.0, 0.0, 0.0]);
    let climb = SegmentSpec::new(
        "climb",
        Profile::Climb {
            start_altitude: 0.0,
            end_altitude: 500.0,
            speed: 45.0,
            climb_rate: 5.0,
        },
        4,
    )
    .with_throttle(ThrottleControl::Fixed(0.9));
    let mission = Mission::new("m").with_segment(climb).with_segment(cruise(4));
    let results = mission.run(&mut vehicle).unwrap();

    let a = results.segments[0].segment.conditions.line("bus").unwrap();
    let b = results.segments[1].segment.conditions.line("bus").unwrap();
    let a = a.batteries.require("pack").unwrap();
    let b = b.batteries.require("pack").unwrap();
    assert_eq!(a.soc[3].to_bits(), b.soc[0].to_bits());
    assert_eq!(a.temperature[3].to_bits(), b.temperature[0].to_bits());
    assert_eq!(a.charge_throughput[3].to_bits(), b.charge_throughput[0].to_bits());

    let summary = results.summary();
    assert_eq!(summary.segments.len(), 2);
    assert!(summary.total_energy > 0.0);
    assert!(summary.segments[1].state_of_charge["bus.pack"] < summary.segments[0].state_of_charge["bus.pack"]);
}

#[test]
fn trimmed_hover_holds_weight() {
    let mut vehicle = electric_vehicle(true, 0.9, [0.0, 0.0, -1.0])
        .with_thrust_demand(Arc::new(HoverDemand));
    let hover = SegmentSpec::new(
        "hover",
        Profile::Hover {
            altitude: 50.0,
            duration: 30.0,
        },
        3,
    )
    .with_throttle(ThrottleControl::Trimmed { seed: 0.7 });
    let mission = Mission::new("m").with_segment(hover);
    let results = mission.run(&mut vehicle).unwrap();
    let r = &results.segments[0];
    assert!(r.converged);

    let cond = &r.segment.conditions;
    let g0 = mission.config.constants.g0;
    for i in 0..3 {
        assert!(cond.throttle[i] > 0.0 && cond.throttle[i] < 1.0);
        let weight = cond.vehicle_mass[i] * g0;
        assert_relative_eq!(-cond.total_thrust[i][2], weight, max_relative = 1e-8);
    }
}

#[test]
fn trimmed_segment_without_demand_is_rejected() {
    let mut vehicle = electric_vehicle(false, 0.9, [1.0, 0.0, 0.0]);
    let mission = Mission::new("m").with_segment(cruise(3).with_throttle(ThrottleControl::Trimmed { seed: 0.5 }));
    let err = mission.run(&mut vehicle).unwrap_err();
    assert!(matches!(err, MissionError::InvalidSegment { .. }));
}

#[test]
fn nonconvergence_escalates_when_configured() {
    let mut vehicle = electric_vehicle(false, 0.9, [1.0, 0.0, 0.0]);
    let mut config = MissionConfig::default();
    config.newton.max_iterations = 0;

    let lenient = Mission::new("m").with_segment(cruise(3)).with_config(config.clone());
    let results = lenient.run(&mut vehicle).unwrap();
    assert!(!results.all_converged());

    config.fail_on_nonconvergence = true;
    let strict = Mission::new("m").with_segment(cruise(3)).with_config(config);
    let err = strict.run(&mut vehicle).unwrap_err();
    assert!(matches!(err, MissionError::NotConverged { ref segment, .. } if segment == "cruise"));
}

#[test]
fn piston_climb_burns_fuel() {
    let mut line = FuelLine::new("fuel");
    line.add_tank(FuelTankSource::new(FuelTank::new("main", kg(120.0)).unwrap()))
        .unwrap();
    line.add_propulsor(PropulsorChain::piston(
        "engine",
        PistonEngine::new("engine", watts(150_000.0), 280.0, 8.5e-8).unwrap(),
        rotor(),
    ))
    .unwrap();
    let network =
        EnergyNetwork::conventional_fuel("fuel", NetworkLines::new().with_fuel_line(line).unwrap())
            .unwrap();

    let mut builder = AssemblyBuilder::new("vehicle");
    let root = builder.root();
    builder.add_component("airframe", root, 900.0, [1.0, 0.0, 0.0]);
    let mut vehicle = Vehicle::new("piston", builder.build().unwrap());
    vehicle.add_network(network).unwrap();

    let climb = SegmentSpec::new(
        "climb",
        Profile::Climb {
            start_altitude: 0.0,
            end_altitude: 1000.0,
            speed: 40.0,
            climb_rate: 4.0,
        },
        5,
    )
    .with_throttle(ThrottleControl::Fixed(0.4));
    let results = Mission::new("m").with_segment(climb).run(&mut vehicle).unwrap();
    let r = &results.segments[0];
    assert!(r.converged);

    let cond = &r.segment.conditions;
    let tank = cond.line("fuel").unwrap().fuel_tanks.require("main").unwrap();
    assert!(tank.fuel_mass.windows(2).all(|w| w[1] <= w[0]));
    assert!(tank.fuel_mass[4] < 120.0);
    assert!(cond.vehicle_mass.windows(2).all(|w| w[1] < w[0]));
    assert_relative_eq!(cond.vehicle_mass[0], 900.0);
}
