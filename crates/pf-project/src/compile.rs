//! Compile a validated project into runtime vehicle and mission objects.

use std::collections::HashMap;
use std::sync::Arc;

use pf_assembly::AssemblyBuilder;
use pf_components::motor_sizing::DEFAULT_SLACK;
use pf_components::{
    Atmosphere, BatteryCell, BatteryPack, CoefficientRotor, ColdPlate, Combustor, Compressor,
    CrossFlowHeatExchanger, DcMotor, DryAir, Esc, FinSurface, FuelTank, GlycolWater,
    MotorDesignPoint, Nozzle, PistonEngine, Reservoir, Turbine, Turbojet, size_motor,
};
use pf_core::PartId;
use pf_core::units::{amps, kg, ohms, watts};
use pf_mission::{
    HoverDemand, Mission, MissionConfig, ParabolicDragPolar, Profile, SegmentSpec,
    ThrottleControl, ThrustDemand, Vehicle,
};
use pf_network::{
    BatterySource, Bus, CoolantLine, EnergyNetwork, FuelLine, FuelTankSource, NetworkLines,
    PropulsorChain,
};
use tracing::{debug, info};

use crate::ProjectResult;
use crate::schema::{
    BatteryDef, BusDef, CellDef, ChainDef, CoolantLineDef, DragDef, FinSurfaceDef, FuelLineDef,
    MissionDef, MotorDef, NetworkDef, NetworkKindDef, PartKindDef, ProfileDef, Project,
    PropulsorDef, RotorDef, SegmentDef, ThrottleDef, TurbojetDef, VehicleDef,
};
use crate::validate::validate_project;

/// Runtime objects built from a project file.
#[derive(Debug)]
pub struct CompiledProject {
    pub vehicle: Vehicle,
    pub mission: Mission,
}

pub fn compile(project: &Project) -> ProjectResult<CompiledProject> {
    validate_project(project)?;
    let vehicle = compile_vehicle(&project.vehicle)?;
    let mission = compile_mission(&project.mission)?;
    info!(
        project = %project.name,
        mass = vehicle.mass(),
        segments = mission.segments.len(),
        "project compiled"
    );
    Ok(CompiledProject { vehicle, mission })
}

fn compile_vehicle(def: &VehicleDef) -> ProjectResult<Vehicle> {
    let networks = def
        .networks
        .iter()
        .map(compile_network)
        .collect::<ProjectResult<Vec<_>>>()?;

    let mut builder = AssemblyBuilder::new(def.tag.clone());
    let mut ids: HashMap<&str, PartId> = HashMap::new();
    ids.insert(&def.tag, builder.root());
    for part in &def.parts {
        let parent = part
            .parent
            .as_deref()
            .and_then(|p| ids.get(p).copied())
            .unwrap_or_else(|| builder.root());
        let id = match &part.kind {
            PartKindDef::Container => builder.add_container(part.tag.clone(), parent),
            PartKindDef::Component { mass_kg, cg_m } => {
                builder.add_component(part.tag.clone(), parent, *mass_kg, *cg_m)
            }
        };
        ids.insert(&part.tag, id);
    }
    let root = builder.root();
    for (tag, mass) in energy_source_masses(&networks) {
        debug!(tag = %tag, mass, "energy source mass");
        builder.add_component(tag, root, mass, [0.0; 3]);
    }

    let mut vehicle = Vehicle::new(def.tag.clone(), builder.build()?);
    for network in networks {
        vehicle.add_network(network)?;
    }
    if let Some(drag) = &def.drag {
        let demand: Arc<dyn ThrustDemand> = match drag {
            DragDef::ParabolicPolar {
                reference_area_m2,
                cd0,
                k,
            } => Arc::new(ParabolicDragPolar {
                reference_area: *reference_area_m2,
                cd0: *cd0,
                k: *k,
            }),
            DragDef::Hover => Arc::new(HoverDemand),
        };
        vehicle = vehicle.with_thrust_demand(demand);
    }
    Ok(vehicle)
}

/// Battery pack and loaded fuel masses, tagged `line.source`.
fn energy_source_masses(networks: &[EnergyNetwork]) -> Vec<(String, f64)> {
    let mut masses = Vec::new();
    for network in networks {
        let lines = network.lines();
        for bus in lines.buses.values() {
            for battery in bus.batteries.values() {
                masses.push((format!("{}.{}", bus.tag, battery.pack.tag), battery.pack.mass()));
            }
        }
        for line in lines.fuel_lines.values() {
            for tank in line.tanks.values() {
                let fuel = tank.initial_state().map(|s| s.fuel_mass).unwrap_or(0.0);
                masses.push((format!("{}.{}", line.tag, tank.tank.tag), fuel));
            }
        }
    }
    masses
}

fn compile_network(def: &NetworkDef) -> ProjectResult<EnergyNetwork> {
    let mut lines = NetworkLines::new();
    for bus in &def.buses {
        lines = lines.with_bus(compile_bus(bus)?)?;
    }
    for line in &def.fuel_lines {
        lines = lines.with_fuel_line(compile_fuel_line(line)?)?;
    }
    for line in &def.coolant_lines {
        lines = lines.with_coolant_line(compile_coolant_line(line)?)?;
    }
    let network = match def.kind {
        NetworkKindDef::AllElectric => EnergyNetwork::all_electric(def.tag.clone(), lines)?,
        NetworkKindDef::ConventionalFuel => EnergyNetwork::conventional_fuel(def.tag.clone(), lines)?,
        NetworkKindDef::IsolatedBatteryCell => {
            EnergyNetwork::isolated_battery_cell(def.tag.clone(), lines)?
        }
        NetworkKindDef::Hybrid => EnergyNetwork::hybrid(def.tag.clone(), lines)?,
    };
    Ok(network)
}

fn compile_bus(def: &BusDef) -> ProjectResult<Bus> {
    let mut bus = Bus::new(def.tag.clone())
        .with_identical_propulsors(def.identical_propulsors)
        .with_auxiliary_power(def.auxiliary_power_w);
    bus.active = def.active;
    for battery in &def.batteries {
        bus.add_battery(compile_battery(battery)?)?;
    }
    for prop in &def.propulsors {
        bus.add_propulsor(compile_propulsor(prop)?)?;
    }
    Ok(bus)
}

fn compile_battery(def: &BatteryDef) -> ProjectResult<BatterySource> {
    let cell = match &def.cell {
        CellDef::Nmc18650 => BatteryCell::nmc_18650(),
        CellDef::Custom {
            capacity_ah,
            nominal_voltage_v,
            max_voltage_v,
            resistance_ohm,
            max_charge_current_a,
            mass_kg,
            specific_heat_j_per_kg_k,
        } => BatteryCell {
            capacity: *capacity_ah,
            nominal_voltage: *nominal_voltage_v,
            max_voltage: *max_voltage_v,
            resistance: *resistance_ohm,
            max_charge_current: *max_charge_current_a,
            mass: *mass_kg,
            specific_heat: *specific_heat_j_per_kg_k,
            ..BatteryCell::nmc_18650()
        },
    };
    let pack = BatteryPack::new(def.tag.clone(), cell, def.series, def.parallel)?;
    let mut source = BatterySource::new(pack);
    if let Some(soc) = def.initial_soc {
        source = source.with_initial_soc(soc)?;
    }
    if let Some(t) = def.initial_temperature_k {
        source = source.with_initial_temperature(t);
    }
    if let Some(t) = def.temperature_override_k {
        source = source.with_temperature_override(t);
    }
    if let Some(g) = def.ambient_conductance_w_per_k {
        source = source.with_ambient_conductance(g);
    }
    Ok(source)
}

fn compile_rotor(tag: &str, def: &RotorDef) -> ProjectResult<Arc<CoefficientRotor>> {
    let mut rotor = CoefficientRotor::new(
        format!("{tag}.rotor"),
        def.radius_m,
        def.blades,
        def.ct0,
        def.cp0,
        def.j0,
    )?
    .with_pitch_sensitivity(def.pitch_sensitivity);
    if let Some(cp) = def.design_power_coefficient {
        rotor = rotor.with_design_power_coefficient(cp);
    }
    Ok(Arc::new(rotor))
}

fn compile_motor(tag: &str, def: &MotorDef) -> ProjectResult<DcMotor> {
    let tag = format!("{tag}.motor");
    let motor = match *def {
        MotorDef::Explicit {
            kv_rad_per_s_per_v,
            resistance_ohm,
            no_load_current_a,
            gear_ratio,
            gearbox_efficiency,
        } => DcMotor::new(
            tag,
            kv_rad_per_s_per_v,
            ohms(resistance_ohm),
            amps(no_load_current_a),
            gear_ratio,
            gearbox_efficiency,
        )?,
        MotorDef::Sized {
            design_speed_rad_s,
            design_torque_nm,
            design_voltage_v,
            design_efficiency,
            no_load_current_a,
            gear_ratio,
            gearbox_efficiency,
            slack,
        } => {
            let point = MotorDesignPoint {
                omega: design_speed_rad_s,
                torque: design_torque_nm,
                voltage: design_voltage_v,
                efficiency: design_efficiency,
                no_load_current: no_load_current_a,
                gear_ratio,
                gearbox_efficiency,
            };
            let sized = size_motor(&tag, &point, slack.unwrap_or(DEFAULT_SLACK))?;
            debug!(
                motor = %tag,
                kv = sized.motor.kv,
                relaxed = sized.relaxed,
                "motor sized"
            );
            sized.motor
        }
    };
    Ok(motor)
}

fn compile_turbojet(tag: &str, def: &TurbojetDef) -> ProjectResult<Turbojet> {
    Ok(Turbojet::new(
        tag,
        Compressor {
            pressure_ratio: def.compressor_pressure_ratio,
            polytropic_efficiency: def.compressor_efficiency,
        },
        Combustor {
            efficiency: def.combustor_efficiency,
            pressure_ratio: def.combustor_pressure_ratio,
            lower_heating_value: def.fuel_heating_value_j_per_kg,
        },
        Turbine {
            polytropic_efficiency: def.turbine_efficiency,
            mechanical_efficiency: def.mechanical_efficiency,
        },
        Nozzle {
            pressure_ratio: def.nozzle_pressure_ratio,
        },
        def.design_mass_flow_kg_s,
        def.t4_idle_k,
        def.t4_max_k,
    )?)
}

fn compile_propulsor(def: &PropulsorDef) -> ProjectResult<PropulsorChain> {
    let tag = def.tag.as_str();
    let chain = match &def.chain {
        ChainDef::ElectricRotor {
            esc_efficiency,
            motor,
            rotor,
        } => PropulsorChain::electric(
            tag,
            Esc::new(format!("{tag}.esc"), *esc_efficiency)?,
            compile_motor(tag, motor)?,
            compile_rotor(tag, rotor)?,
        ),
        ChainDef::PistonRotor {
            rated_power_w,
            max_speed_rad_s,
            sfc_kg_per_j,
            rotor,
        } => PropulsorChain::piston(
            tag,
            PistonEngine::new(
                format!("{tag}.engine"),
                watts(*rated_power_w),
                *max_speed_rad_s,
                *sfc_kg_per_j,
            )?,
            compile_rotor(tag, rotor)?,
        ),
        ChainDef::Turbojet(jet) => PropulsorChain::turbojet(tag, compile_turbojet(tag, jet)?),
    };
    Ok(chain.with_origin(def.origin_m).with_thrust_axis(def.thrust_axis)?)
}

fn compile_fuel_line(def: &FuelLineDef) -> ProjectResult<FuelLine> {
    let mut line = FuelLine::new(def.tag.clone()).with_identical_propulsors(def.identical_propulsors);
    line.active = def.active;
    for tank in &def.tanks {
        let source = FuelTankSource::new(FuelTank::new(tank.tag.clone(), kg(tank.capacity_kg))?)
            .with_initial_fill(tank.initial_fill)?;
        line.add_tank(source)?;
    }
    for prop in &def.propulsors {
        line.add_propulsor(compile_propulsor(prop)?)?;
    }
    Ok(line)
}

fn fin_surface(def: &FinSurfaceDef) -> FinSurface {
    FinSurface {
        fin_spacing: def.fin_spacing_m,
        fin_height: def.fin_height_m,
        fin_thickness: def.fin_thickness_m,
        strip_length: def.strip_length_m,
        fin_conductivity: def.fin_conductivity_w_per_m_k,
        frontal_area: def.frontal_area_m2,
        free_flow_ratio: def.free_flow_ratio,
        heat_transfer_area: def.heat_transfer_area_m2,
        fin_area_ratio: def.fin_area_ratio,
    }
}

fn compile_coolant_line(def: &CoolantLineDef) -> ProjectResult<CoolantLine> {
    let hex = &def.heat_exchanger;
    let heat_exchanger = CrossFlowHeatExchanger::new(
        format!("{}.heat_exchanger", def.tag),
        GlycolWater,
        DryAir::default(),
        fin_surface(&hex.coolant_surface),
        fin_surface(&hex.air_surface),
        hex.design_coolant_flow_kg_s,
        hex.design_air_flow_kg_s,
        hex.pump_efficiency,
        hex.fan_efficiency,
    )?
    .with_wall_resistance(hex.wall_resistance_k_per_w);
    let mut line = CoolantLine::new(
        def.tag.clone(),
        def.bus.clone(),
        def.battery.clone(),
        ColdPlate::new(format!("{}.cold_plate", def.tag), def.cold_plate_conductance_w_per_k)?,
        Reservoir::new(
            format!("{}.reservoir", def.tag),
            def.reservoir_mass_kg,
            def.reservoir_conductance_w_per_k,
        )?,
        heat_exchanger,
        def.turndown,
    )?;
    if let Some(t) = def.initial_temperature_k {
        line = line.with_initial_temperature(t);
    }
    line.active = def.active;
    Ok(line)
}

fn compile_profile(def: &ProfileDef) -> Profile {
    match *def {
        ProfileDef::Climb {
            start_altitude_m,
            end_altitude_m,
            speed_m_s,
            climb_rate_m_s,
        } => Profile::Climb {
            start_altitude: start_altitude_m,
            end_altitude: end_altitude_m,
            speed: speed_m_s,
            climb_rate: climb_rate_m_s,
        },
        ProfileDef::Cruise {
            altitude_m,
            speed_m_s,
            distance_m,
        } => Profile::Cruise {
            altitude: altitude_m,
            speed: speed_m_s,
            distance: distance_m,
        },
        ProfileDef::Descent {
            start_altitude_m,
            end_altitude_m,
            speed_m_s,
            descent_rate_m_s,
        } => Profile::Descent {
            start_altitude: start_altitude_m,
            end_altitude: end_altitude_m,
            speed: speed_m_s,
            descent_rate: descent_rate_m_s,
        },
        ProfileDef::Hover {
            altitude_m,
            duration_s,
        } => Profile::Hover {
            altitude: altitude_m,
            duration: duration_s,
        },
        ProfileDef::Recharge {
            altitude_m,
            duration_s,
            current_a,
        } => Profile::Recharge {
            altitude: altitude_m,
            duration: duration_s,
            current: current_a,
        },
        ProfileDef::GroundDischarge {
            altitude_m,
            duration_s,
            current_a,
        } => Profile::GroundDischarge {
            altitude: altitude_m,
            duration: duration_s,
            current: current_a,
        },
    }
}

fn compile_segment(def: &SegmentDef) -> SegmentSpec {
    let throttle = match def.throttle {
        ThrottleDef::Fixed { value } => ThrottleControl::Fixed(value),
        ThrottleDef::Trimmed { seed } => ThrottleControl::Trimmed { seed },
    };
    let mut spec = SegmentSpec::new(def.tag.clone(), compile_profile(&def.profile), def.n_points)
        .with_throttle(throttle);
    spec.pitch = def.pitch_rad;
    for (key, cp) in &def.power_coefficients {
        spec = spec.with_power_coefficient(key.clone(), *cp);
    }
    spec
}

fn compile_mission(def: &MissionDef) -> ProjectResult<Mission> {
    let mut config = MissionConfig::default();
    config.newton.max_iterations = def.solver.max_iterations;
    config.newton.abs_tol = def.solver.abs_tol;
    if let Some(constants) = def.constants {
        config.constants = constants;
    }
    config.atmosphere = Atmosphere::new(config.constants, def.delta_isa_k);
    config.fail_on_nonconvergence = def.solver.fail_on_nonconvergence;
    let mut mission = Mission::new(def.tag.clone()).with_config(config);
    for segment in &def.segments {
        mission = mission.with_segment(compile_segment(segment));
    }
    mission.validate()?;
    Ok(mission)
}
