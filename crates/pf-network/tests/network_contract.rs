//! Segment contract checks on small networks, without a solver.

use pf_components::{
    Atmosphere, BatteryCell, BatteryPack, CoefficientRotor, DcMotor, Esc, FreestreamPoint,
    FuelTank, PistonEngine, RotorGeometry, RotorLoads, RotorPerformance,
};
use pf_core::Constants;
use pf_core::units::{amps, kg, ohms, watts};
use pf_network::{
    BatterySource, Bus, EnergyNetwork, FreestreamSeries, FuelLine, FuelTankSource, NetworkError,
    NetworkLines, PropulsorChain, Segment, SegmentKind,
};
use std::sync::Arc;

fn rotor() -> CoefficientRotor {
    CoefficientRotor::new("rotor", 0.9, 3, 0.11, 0.045, 1.1).unwrap()
}

fn prop(tag: &str, y: f64) -> PropulsorChain {
    PropulsorChain::electric(
        tag,
        Esc::new("esc", 0.95).unwrap(),
        DcMotor::new("motor", 1.2, ohms(0.04), amps(3.0), 1.0, 1.0).unwrap(),
        Arc::new(rotor()),
    )
    .with_origin([0.0, y, 0.0])
}

fn electric_network(identical: bool, soc: f64) -> EnergyNetwork {
    let mut bus = Bus::new("bus").with_identical_propulsors(identical);
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 110, 60).unwrap();
    bus.add_battery(BatterySource::new(pack).with_initial_soc(soc).unwrap())
        .unwrap();
    bus.add_propulsor(prop("prop_1", 2.0)).unwrap();
    bus.add_propulsor(prop("prop_2", -2.0)).unwrap();
    EnergyNetwork::all_electric("net", NetworkLines::new().with_bus(bus).unwrap()).unwrap()
}

fn flown(tag: &str, kind: SegmentKind, n: usize, duration: f64) -> Segment {
    let mut seg = Segment::new(tag, kind, n);
    let fs = Atmosphere::default().freestream(500.0, if kind.is_in_flight() { 45.0 } else { 0.0 });
    seg.conditions.freestream = FreestreamSeries::from_points(&vec![fs; n]);
    seg.conditions.time = pf_core::numeric::linspace(0.0, duration, n);
    seg.conditions.throttle = vec![0.8; n];
    seg
}

fn prepared(net: &EnergyNetwork, seg: &mut Segment) {
    net.declare_unknowns_and_residuals(seg).unwrap();
    net.append_initial_conditions(seg).unwrap();
}

#[test]
fn electric_cruise_declares_rotor_and_voltage_unknowns() {
    let net = electric_network(false, 0.9);
    let mut seg = flown("cruise", SegmentKind::Cruise, 5, 60.0);
    prepared(&net, &mut seg);
    let names: Vec<&str> = seg.unknowns.names().collect();
    assert_eq!(
        names,
        [
            "bus.prop_1.rotor_power_coefficient",
            "bus.prop_2.rotor_power_coefficient",
            "bus.voltage_under_load",
        ]
    );
    assert!(seg.residuals.contains("bus.prop_1.torque"));
    assert!(seg.residuals.contains("bus.voltage"));
    assert_eq!(seg.unknowns.require("bus.prop_1.rotor_power_coefficient").unwrap()[0], 0.045);
}

#[test]
fn identical_propulsors_declare_first_only_and_copy_thrust() {
    let net = electric_network(true, 0.9);
    let mut seg = flown("cruise", SegmentKind::Cruise, 3, 30.0);
    prepared(&net, &mut seg);
    assert!(seg.unknowns.contains("bus.prop_1.rotor_power_coefficient"));
    assert!(!seg.unknowns.contains("bus.prop_2.rotor_power_coefficient"));

    net.evaluate(&mut seg, &Constants::default()).unwrap();
    let line = seg.conditions.line("bus").unwrap();
    let a = line.propulsors.require("prop_1").unwrap();
    let b = line.propulsors.require("prop_2").unwrap();
    assert_eq!(a.thrust, b.thrust);
    assert_eq!(a.moment[0][2], -b.moment[0][2]);
    assert!(a.moment[0][2] != 0.0);
}

#[test]
fn identical_flag_rejects_mismatched_propulsors() {
    let mut bus = Bus::new("bus").with_identical_propulsors(true);
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 110, 60).unwrap();
    bus.add_battery(BatterySource::new(pack)).unwrap();
    bus.add_propulsor(prop("prop_1", 2.0)).unwrap();
    bus.add_propulsor(PropulsorChain::electric(
        "prop_2",
        Esc::new("esc", 0.95).unwrap(),
        DcMotor::new("motor", 1.3, ohms(0.04), amps(3.0), 1.0, 1.0).unwrap(),
        Arc::new(rotor()),
    ))
    .unwrap();
    let err = EnergyNetwork::all_electric("net", NetworkLines::new().with_bus(bus).unwrap())
        .unwrap_err();
    assert!(matches!(err, NetworkError::NotIdentical { ref propulsor, .. } if propulsor == "prop_2"));
}

#[test]
fn identical_flag_rejects_differing_thrust_axes() {
    let mut bus = Bus::new("bus").with_identical_propulsors(true);
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 110, 60).unwrap();
    bus.add_battery(BatterySource::new(pack)).unwrap();
    bus.add_propulsor(prop("lift", 2.0).with_thrust_axis([0.0, 0.0, -1.0]).unwrap())
        .unwrap();
    bus.add_propulsor(prop("push", -2.0).with_thrust_axis([1.0, 0.0, 0.0]).unwrap())
        .unwrap();
    let err = EnergyNetwork::all_electric("net", NetworkLines::new().with_bus(bus).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        NetworkError::NotIdentical { ref propulsor, what: "thrust axis", .. } if propulsor == "push"
    ));
}

/// Rotor with no design value and no model default.
#[derive(Debug)]
struct BareRotor(CoefficientRotor);

impl RotorPerformance for BareRotor {
    fn geometry(&self) -> RotorGeometry {
        self.0.geometry()
    }

    fn performance(&self, omega: f64, freestream: &FreestreamPoint, pitch: f64) -> RotorLoads {
        self.0.performance(omega, freestream, pitch)
    }
}

#[test]
fn missing_power_coefficient_fails_before_evaluation() {
    let mut bus = Bus::new("bus");
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 110, 60).unwrap();
    bus.add_battery(BatterySource::new(pack)).unwrap();
    bus.add_propulsor(prop("prop_1", 2.0)).unwrap();
    bus.add_propulsor(PropulsorChain::electric(
        "prop_2",
        Esc::new("esc", 0.95).unwrap(),
        DcMotor::new("motor", 1.2, ohms(0.04), amps(3.0), 1.0, 1.0).unwrap(),
        Arc::new(BareRotor(rotor())),
    ))
    .unwrap();
    let net = EnergyNetwork::all_electric("net", NetworkLines::new().with_bus(bus).unwrap()).unwrap();

    let mut seg = flown("climb", SegmentKind::Climb, 3, 30.0);
    let err = net.declare_unknowns_and_residuals(&mut seg).unwrap_err();
    match err {
        NetworkError::MissingDesignValue {
            segment,
            line,
            propulsor,
            ..
        } => {
            assert_eq!(segment, "climb");
            assert_eq!(line, "bus");
            assert_eq!(propulsor, "prop_2");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // A segment override supplies the seed.
    let mut seg = flown("climb", SegmentKind::Climb, 3, 30.0);
    seg.settings
        .power_coefficient_overrides
        .insert("bus.prop_2".into(), 0.04);
    net.declare_unknowns_and_residuals(&mut seg).unwrap();
    assert_eq!(seg.unknowns.require("bus.prop_2.rotor_power_coefficient").unwrap()[0], 0.04);
}

#[test]
fn rotor_design_value_seeds_before_model_default() {
    let designed = || {
        PropulsorChain::electric(
            "prop_1",
            Esc::new("esc", 0.95).unwrap(),
            DcMotor::new("motor", 1.2, ohms(0.04), amps(3.0), 1.0, 1.0).unwrap(),
            Arc::new(rotor().with_design_power_coefficient(0.04)),
        )
    };
    let mut bus = Bus::new("bus");
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 110, 60).unwrap();
    bus.add_battery(BatterySource::new(pack)).unwrap();
    bus.add_propulsor(designed()).unwrap();
    let net = EnergyNetwork::all_electric("net", NetworkLines::new().with_bus(bus).unwrap()).unwrap();

    let mut seg = flown("cruise", SegmentKind::Cruise, 3, 30.0);
    net.declare_unknowns_and_residuals(&mut seg).unwrap();
    let seed = seg.unknowns.require("bus.prop_1.rotor_power_coefficient").unwrap();
    assert!(seed.iter().all(|&cp| cp == 0.04));

    let mut seg = flown("cruise", SegmentKind::Cruise, 3, 30.0);
    seg.settings
        .power_coefficient_overrides
        .insert("bus.prop_1".into(), 0.05);
    net.declare_unknowns_and_residuals(&mut seg).unwrap();
    let seed = seg.unknowns.require("bus.prop_1.rotor_power_coefficient").unwrap();
    assert!(seed.iter().all(|&cp| cp == 0.05));
}

#[test]
fn nonpositive_seed_names_its_segment() {
    let net = electric_network(false, 0.9);
    for bad in [0.0, -1.0, f64::NAN] {
        let mut seg = flown("descent", SegmentKind::Descent, 3, 30.0);
        seg.settings
            .power_coefficient_overrides
            .insert("bus.prop_2".into(), bad);
        match net.declare_unknowns_and_residuals(&mut seg).unwrap_err() {
            NetworkError::InvalidDesignValue {
                segment,
                line,
                propulsor,
                ..
            } => {
                assert_eq!(segment, "descent");
                assert_eq!(line, "bus");
                assert_eq!(propulsor, "prop_2");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn recharge_has_no_thrust_unknowns_and_charges() {
    let net = electric_network(false, 0.5);
    let mut seg = flown("charge", SegmentKind::Recharge, 5, 600.0);
    seg.settings.ground_current = Some(100.0);
    prepared(&net, &mut seg);
    let names: Vec<&str> = seg.unknowns.names().collect();
    assert_eq!(names, ["bus.recharge_current"]);

    net.evaluate(&mut seg, &Constants::default()).unwrap();
    let line = seg.conditions.line("bus").unwrap();
    assert!(line.allowed_charge_current.iter().all(|&a| a <= 100.0));
    let b = line.batteries.require("pack").unwrap();
    assert!(b.recharging.iter().all(|&r| r));
    assert!(b.soc.windows(2).all(|w| w[1] >= w[0]));
    assert!(b.soc[4] > 0.5);
    assert!(seg.conditions.total_thrust.iter().all(|t| *t == [0.0; 3]));
}

#[test]
fn battery_state_chains_bit_for_bit() {
    let mut net = electric_network(false, 0.9);
    let mut first = flown("climb", SegmentKind::Climb, 4, 45.0);
    prepared(&net, &mut first);
    net.evaluate(&mut first, &Constants::default()).unwrap();
    net.finalize_segment(&first).unwrap();

    let mut second = flown("cruise", SegmentKind::Cruise, 4, 45.0);
    prepared(&net, &mut second);
    let a = first.conditions.line("bus").unwrap().batteries.require("pack").unwrap();
    let b = second.conditions.line("bus").unwrap().batteries.require("pack").unwrap();
    assert_eq!(a.state_at(3), b.state_at(0));
    assert_eq!(a.soc[3].to_bits(), b.soc[0].to_bits());
    assert_eq!(a.temperature[3].to_bits(), b.temperature[0].to_bits());
    assert!(b.soc[0] < 0.9);

    net.reset();
    let mut fresh = flown("climb", SegmentKind::Climb, 4, 45.0);
    prepared(&net, &mut fresh);
    let c = fresh.conditions.line("bus").unwrap().batteries.require("pack").unwrap();
    assert_eq!(c.soc[0], 0.9);
}

fn fuel_network() -> EnergyNetwork {
    let mut line = FuelLine::new("fuel");
    line.add_tank(FuelTankSource::new(FuelTank::new("main", kg(150.0)).unwrap()))
        .unwrap();
    line.add_propulsor(PropulsorChain::piston(
        "engine",
        PistonEngine::new("engine", watts(150_000.0), 280.0, 8.5e-8).unwrap(),
        Arc::new(rotor()),
    ))
    .unwrap();
    EnergyNetwork::conventional_fuel("fuel_net", NetworkLines::new().with_fuel_line(line).unwrap())
        .unwrap()
}

#[test]
fn fuel_network_cannot_recharge() {
    let net = fuel_network();
    let mut seg = flown("charge", SegmentKind::Recharge, 3, 60.0);
    let err = net.declare_unknowns_and_residuals(&mut seg).unwrap_err();
    assert!(matches!(err, NetworkError::UnsupportedSegment { kind: "recharge", .. }));
}

#[test]
fn fuel_mass_never_increases() {
    let net = fuel_network();
    let mut seg = flown("cruise", SegmentKind::Cruise, 5, 120.0);
    prepared(&net, &mut seg);
    assert!(seg.unknowns.contains("fuel.engine.rotor_power_coefficient"));
    net.evaluate(&mut seg, &Constants::default()).unwrap();
    let tank = seg.conditions.line("fuel").unwrap().fuel_tanks.require("main").unwrap();
    assert_eq!(tank.fuel_mass[0], 150.0);
    assert!(tank.fuel_mass.windows(2).all(|w| w[1] <= w[0]));
    assert!(seg.conditions.total_mass_rate.iter().all(|&m| m >= 0.0));
}

#[test]
fn variant_constructors_enforce_line_kinds() {
    let mut bus = Bus::new("bus");
    let pack = BatteryPack::new("pack", BatteryCell::nmc_18650(), 10, 2).unwrap();
    bus.add_battery(BatterySource::new(pack)).unwrap();
    let lines = NetworkLines::new().with_bus(bus.clone()).unwrap();
    assert!(EnergyNetwork::conventional_fuel("n", lines.clone()).is_err());
    assert!(EnergyNetwork::isolated_battery_cell("n", lines).is_ok());

    bus.add_propulsor(prop("p", 0.0)).unwrap();
    let lines = NetworkLines::new().with_bus(bus).unwrap();
    assert!(EnergyNetwork::isolated_battery_cell("n", lines).is_err());
}

#[test]
fn dry_tank_limits_fuel_flow_and_flags_starvation() {
    let mut line = FuelLine::new("fuel");
    line.add_tank(FuelTankSource::new(FuelTank::new("sip", kg(0.05)).unwrap()))
        .unwrap();
    line.add_propulsor(PropulsorChain::piston(
        "engine",
        PistonEngine::new("engine", watts(150_000.0), 280.0, 8.5e-8).unwrap(),
        Arc::new(rotor()),
    ))
    .unwrap();
    let net =
        EnergyNetwork::conventional_fuel("fuel_net", NetworkLines::new().with_fuel_line(line).unwrap())
            .unwrap();

    let mut seg = flown("cruise", SegmentKind::Cruise, 5, 600.0);
    prepared(&net, &mut seg);
    net.evaluate(&mut seg, &Constants::default()).unwrap();

    let line = seg.conditions.line("fuel").unwrap();
    let tank = line.fuel_tanks.require("sip").unwrap();
    let engine = line.propulsors.require("engine").unwrap();
    assert!(engine.fuel_rate.iter().all(|&r| r > 0.0));
    for i in 0..5 {
        assert_eq!(line.mass_rate[i], tank.mass_rate[i]);
        assert!(line.mass_rate[i] <= engine.fuel_rate[i]);
    }

    let time = &seg.conditions.time;
    let burned: f64 = (0..4).map(|i| line.mass_rate[i] * (time[i + 1] - time[i])).sum();
    assert!((burned - 0.05).abs() < 1e-12);
    assert!(tank.fuel_mass[4].abs() < 1e-12);
    assert!(line.fuel_starved[4]);
    assert!(line.fuel_starved.iter().all(|&s| s));

    let total: f64 = (0..4)
        .map(|i| seg.conditions.total_mass_rate[i] * (time[i + 1] - time[i]))
        .sum();
    assert!(total <= 0.05 + 1e-12);
}
