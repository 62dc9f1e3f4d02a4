//! Project validation logic.

use crate::schema::{
    BatteryDef, BusDef, CellDef, ChainDef, CoolantLineDef, FuelLineDef, HeatExchangerDef,
    MissionDef, MotorDef, NetworkDef, NetworkKindDef, PartKindDef, ProfileDef, Project,
    PropulsorDef, RotorDef, SegmentDef, ThrottleDef, VehicleDef,
};
use std::collections::{HashMap, HashSet};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate tag: {tag} in {context}")]
    DuplicateTag { tag: String, context: String },

    #[error("Missing reference: {tag} in {context}")]
    MissingReference { tag: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version == 0 || project.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    validate_vehicle(&project.vehicle)?;
    validate_mission(&project.mission, &project.vehicle)?;
    Ok(())
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "cannot be negative"))
    }
}

fn fraction(field: &str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value, "must be in [0,1]"))
    }
}

fn efficiency(field: &str, value: f64) -> Result<(), ValidationError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be in (0,1]"))
    }
}

fn insert_unique<'a>(
    seen: &mut HashSet<&'a str>,
    tag: &'a str,
    context: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    if seen.insert(tag) {
        Ok(())
    } else {
        Err(ValidationError::DuplicateTag {
            tag: tag.to_string(),
            context: context(),
        })
    }
}

/// Assembly tags reserved for energy-source masses, as `line.source`.
pub fn energy_source_tags(vehicle: &VehicleDef) -> Vec<String> {
    let mut tags = Vec::new();
    for network in &vehicle.networks {
        for bus in &network.buses {
            tags.extend(bus.batteries.iter().map(|b| format!("{}.{}", bus.tag, b.tag)));
        }
        for line in &network.fuel_lines {
            tags.extend(line.tanks.iter().map(|t| format!("{}.{}", line.tag, t.tag)));
        }
    }
    tags
}

fn validate_vehicle(vehicle: &VehicleDef) -> Result<(), ValidationError> {
    let reserved: HashSet<String> = energy_source_tags(vehicle).into_iter().collect();

    let mut containers: HashSet<&str> = HashSet::new();
    containers.insert(vehicle.tag.as_str());
    let mut part_tags: HashSet<&str> = HashSet::new();
    part_tags.insert(vehicle.tag.as_str());
    for part in &vehicle.parts {
        insert_unique(&mut part_tags, &part.tag, || "vehicle parts".to_string())?;
        if reserved.contains(&part.tag) {
            return Err(ValidationError::DuplicateTag {
                tag: part.tag.clone(),
                context: "vehicle parts (reserved for an energy source)".to_string(),
            });
        }
        // Parents must be declared first
        if let Some(parent) = &part.parent {
            if !containers.contains(parent.as_str()) {
                return Err(ValidationError::MissingReference {
                    tag: parent.clone(),
                    context: format!("parent of part '{}'", part.tag),
                });
            }
        }
        match &part.kind {
            PartKindDef::Container => {
                containers.insert(&part.tag);
            }
            PartKindDef::Component { mass_kg, cg_m } => {
                non_negative(&format!("part '{}' mass_kg", part.tag), *mass_kg)?;
                if cg_m.iter().any(|c| !c.is_finite()) {
                    return Err(invalid(
                        format!("part '{}' cg_m", part.tag),
                        format!("{cg_m:?}"),
                        "must be finite",
                    ));
                }
            }
        }
    }

    if let Some(crate::schema::DragDef::ParabolicPolar {
        reference_area_m2,
        cd0,
        k,
    }) = &vehicle.drag
    {
        positive("drag reference_area_m2", *reference_area_m2)?;
        non_negative("drag cd0", *cd0)?;
        non_negative("drag k", *k)?;
    }

    let mut network_tags = HashSet::new();
    let mut line_tags = HashSet::new();
    for network in &vehicle.networks {
        insert_unique(&mut network_tags, &network.tag, || "networks".to_string())?;
        for tag in network
            .buses
            .iter()
            .map(|b| b.tag.as_str())
            .chain(network.fuel_lines.iter().map(|l| l.tag.as_str()))
            .chain(network.coolant_lines.iter().map(|l| l.tag.as_str()))
        {
            insert_unique(&mut line_tags, tag, || "distribution lines".to_string())?;
        }
        validate_network(network)?;
    }
    Ok(())
}

fn validate_network(network: &NetworkDef) -> Result<(), ValidationError> {
    let kind_error = |reason: &str| {
        invalid(
            format!("network '{}' kind", network.tag),
            format!("{:?}", network.kind),
            reason,
        )
    };
    match network.kind {
        NetworkKindDef::AllElectric | NetworkKindDef::IsolatedBatteryCell => {
            if !network.fuel_lines.is_empty() {
                return Err(kind_error("cannot hold fuel lines"));
            }
        }
        NetworkKindDef::ConventionalFuel => {
            if !network.buses.is_empty() || !network.coolant_lines.is_empty() {
                return Err(kind_error("holds fuel lines only"));
            }
        }
        NetworkKindDef::Hybrid => {
            if network.buses.is_empty() && network.fuel_lines.is_empty() {
                return Err(kind_error("needs at least one line"));
            }
        }
    }

    let mut batteries: HashMap<&str, HashSet<&str>> = HashMap::new();
    for bus in &network.buses {
        validate_bus(bus)?;
        batteries.insert(&bus.tag, bus.batteries.iter().map(|b| b.tag.as_str()).collect());
    }
    for line in &network.fuel_lines {
        validate_fuel_line(line)?;
    }
    for line in &network.coolant_lines {
        let Some(packs) = batteries.get(line.bus.as_str()) else {
            return Err(ValidationError::MissingReference {
                tag: line.bus.clone(),
                context: format!("bus of coolant line '{}'", line.tag),
            });
        };
        if !packs.contains(line.battery.as_str()) {
            return Err(ValidationError::MissingReference {
                tag: line.battery.clone(),
                context: format!("battery of coolant line '{}'", line.tag),
            });
        }
        validate_coolant_line(line)?;
    }
    Ok(())
}

fn validate_bus(bus: &BusDef) -> Result<(), ValidationError> {
    non_negative(&format!("bus '{}' auxiliary_power_w", bus.tag), bus.auxiliary_power_w)?;
    if bus.batteries.is_empty() {
        return Err(ValidationError::MissingReference {
            tag: bus.tag.clone(),
            context: "bus needs at least one battery".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for battery in &bus.batteries {
        insert_unique(&mut seen, &battery.tag, || format!("bus '{}' batteries", bus.tag))?;
        validate_battery(&bus.tag, battery)?;
    }
    let mut seen = HashSet::new();
    for prop in &bus.propulsors {
        insert_unique(&mut seen, &prop.tag, || format!("bus '{}' propulsors", bus.tag))?;
        if !matches!(prop.chain, ChainDef::ElectricRotor { .. }) {
            return Err(invalid(
                format!("bus '{}' propulsor '{}'", bus.tag, prop.tag),
                "chain",
                "a bus drives electric propulsors only",
            ));
        }
        validate_propulsor(&bus.tag, prop)?;
    }
    Ok(())
}

fn validate_battery(bus: &str, battery: &BatteryDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("bus '{bus}' battery '{}' {name}", battery.tag);
    if battery.series == 0 {
        return Err(invalid(field("series"), 0, "must be at least 1"));
    }
    if battery.parallel == 0 {
        return Err(invalid(field("parallel"), 0, "must be at least 1"));
    }
    if let Some(soc) = battery.initial_soc {
        fraction(&field("initial_soc"), soc)?;
    }
    if let Some(t) = battery.initial_temperature_k {
        positive(&field("initial_temperature_k"), t)?;
    }
    if let Some(t) = battery.temperature_override_k {
        positive(&field("temperature_override_k"), t)?;
    }
    if let Some(g) = battery.ambient_conductance_w_per_k {
        non_negative(&field("ambient_conductance_w_per_k"), g)?;
    }
    if let CellDef::Custom {
        capacity_ah,
        nominal_voltage_v,
        max_voltage_v,
        resistance_ohm,
        max_charge_current_a,
        mass_kg,
        specific_heat_j_per_kg_k,
    } = &battery.cell
    {
        positive(&field("cell capacity_ah"), *capacity_ah)?;
        positive(&field("cell nominal_voltage_v"), *nominal_voltage_v)?;
        positive(&field("cell resistance_ohm"), *resistance_ohm)?;
        non_negative(&field("cell max_charge_current_a"), *max_charge_current_a)?;
        positive(&field("cell mass_kg"), *mass_kg)?;
        positive(&field("cell specific_heat_j_per_kg_k"), *specific_heat_j_per_kg_k)?;
        if !(max_voltage_v >= nominal_voltage_v) {
            return Err(invalid(
                field("cell max_voltage_v"),
                max_voltage_v,
                "below nominal voltage",
            ));
        }
    }
    Ok(())
}

fn validate_propulsor(line: &str, prop: &PropulsorDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("line '{line}' propulsor '{}' {name}", prop.tag);
    let norm = prop.thrust_axis.iter().map(|a| a * a).sum::<f64>().sqrt();
    if !(norm.is_finite() && norm > 0.0) {
        return Err(invalid(
            field("thrust_axis"),
            format!("{:?}", prop.thrust_axis),
            "must be a non-zero vector",
        ));
    }
    match &prop.chain {
        ChainDef::ElectricRotor {
            esc_efficiency,
            motor,
            rotor,
        } => {
            efficiency(&field("esc_efficiency"), *esc_efficiency)?;
            validate_motor(&field("motor"), motor)?;
            validate_rotor(&field("rotor"), rotor)?;
        }
        ChainDef::PistonRotor {
            rated_power_w,
            max_speed_rad_s,
            sfc_kg_per_j,
            rotor,
        } => {
            positive(&field("rated_power_w"), *rated_power_w)?;
            positive(&field("max_speed_rad_s"), *max_speed_rad_s)?;
            non_negative(&field("sfc_kg_per_j"), *sfc_kg_per_j)?;
            validate_rotor(&field("rotor"), rotor)?;
        }
        ChainDef::Turbojet(jet) => {
            if !(jet.compressor_pressure_ratio >= 1.0) {
                return Err(invalid(
                    field("compressor_pressure_ratio"),
                    jet.compressor_pressure_ratio,
                    "must be at least 1",
                ));
            }
            efficiency(&field("compressor_efficiency"), jet.compressor_efficiency)?;
            efficiency(&field("combustor_efficiency"), jet.combustor_efficiency)?;
            efficiency(&field("combustor_pressure_ratio"), jet.combustor_pressure_ratio)?;
            positive(&field("fuel_heating_value_j_per_kg"), jet.fuel_heating_value_j_per_kg)?;
            efficiency(&field("turbine_efficiency"), jet.turbine_efficiency)?;
            efficiency(&field("mechanical_efficiency"), jet.mechanical_efficiency)?;
            efficiency(&field("nozzle_pressure_ratio"), jet.nozzle_pressure_ratio)?;
            positive(&field("design_mass_flow_kg_s"), jet.design_mass_flow_kg_s)?;
            positive(&field("t4_idle_k"), jet.t4_idle_k)?;
            if !(jet.t4_max_k >= jet.t4_idle_k) {
                return Err(invalid(field("t4_max_k"), jet.t4_max_k, "below idle temperature"));
            }
        }
    }
    Ok(())
}

fn validate_motor(prefix: &str, motor: &MotorDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("{prefix} {name}");
    match motor {
        MotorDef::Explicit {
            kv_rad_per_s_per_v,
            resistance_ohm,
            no_load_current_a,
            gear_ratio,
            gearbox_efficiency,
        } => {
            positive(&field("kv_rad_per_s_per_v"), *kv_rad_per_s_per_v)?;
            positive(&field("resistance_ohm"), *resistance_ohm)?;
            non_negative(&field("no_load_current_a"), *no_load_current_a)?;
            positive(&field("gear_ratio"), *gear_ratio)?;
            efficiency(&field("gearbox_efficiency"), *gearbox_efficiency)?;
        }
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
            positive(&field("design_speed_rad_s"), *design_speed_rad_s)?;
            positive(&field("design_torque_nm"), *design_torque_nm)?;
            positive(&field("design_voltage_v"), *design_voltage_v)?;
            efficiency(&field("design_efficiency"), *design_efficiency)?;
            non_negative(&field("no_load_current_a"), *no_load_current_a)?;
            positive(&field("gear_ratio"), *gear_ratio)?;
            efficiency(&field("gearbox_efficiency"), *gearbox_efficiency)?;
            if let Some(s) = slack {
                if !(0.0..1.0).contains(s) {
                    return Err(invalid(field("slack"), s, "must be in [0,1)"));
                }
            }
        }
    }
    Ok(())
}

fn validate_rotor(prefix: &str, rotor: &RotorDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("{prefix} {name}");
    positive(&field("radius_m"), rotor.radius_m)?;
    if rotor.blades == 0 {
        return Err(invalid(field("blades"), 0, "must be at least 1"));
    }
    positive(&field("ct0"), rotor.ct0)?;
    positive(&field("cp0"), rotor.cp0)?;
    positive(&field("j0"), rotor.j0)?;
    if let Some(cp) = rotor.design_power_coefficient {
        positive(&field("design_power_coefficient"), cp)?;
    }
    Ok(())
}

fn validate_fuel_line(line: &FuelLineDef) -> Result<(), ValidationError> {
    if line.tanks.is_empty() && !line.propulsors.is_empty() {
        return Err(ValidationError::MissingReference {
            tag: line.tag.clone(),
            context: "fuel line with propulsors needs a tank".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for tank in &line.tanks {
        insert_unique(&mut seen, &tank.tag, || format!("fuel line '{}' tanks", line.tag))?;
        positive(&format!("tank '{}' capacity_kg", tank.tag), tank.capacity_kg)?;
        fraction(&format!("tank '{}' initial_fill", tank.tag), tank.initial_fill)?;
    }
    let mut seen = HashSet::new();
    for prop in &line.propulsors {
        insert_unique(&mut seen, &prop.tag, || format!("fuel line '{}' propulsors", line.tag))?;
        if matches!(prop.chain, ChainDef::ElectricRotor { .. }) {
            return Err(invalid(
                format!("fuel line '{}' propulsor '{}'", line.tag, prop.tag),
                "chain",
                "a fuel line cannot drive electric propulsors",
            ));
        }
        validate_propulsor(&line.tag, prop)?;
    }
    Ok(())
}

fn validate_coolant_line(line: &CoolantLineDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("coolant line '{}' {name}", line.tag);
    fraction(&field("turndown"), line.turndown)?;
    positive(&field("cold_plate_conductance_w_per_k"), line.cold_plate_conductance_w_per_k)?;
    positive(&field("reservoir_mass_kg"), line.reservoir_mass_kg)?;
    non_negative(&field("reservoir_conductance_w_per_k"), line.reservoir_conductance_w_per_k)?;
    if let Some(t) = line.initial_temperature_k {
        positive(&field("initial_temperature_k"), t)?;
    }
    validate_heat_exchanger(&field("heat_exchanger"), &line.heat_exchanger)
}

fn validate_heat_exchanger(prefix: &str, hex: &HeatExchangerDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("{prefix} {name}");
    non_negative(&field("design_coolant_flow_kg_s"), hex.design_coolant_flow_kg_s)?;
    non_negative(&field("design_air_flow_kg_s"), hex.design_air_flow_kg_s)?;
    efficiency(&field("pump_efficiency"), hex.pump_efficiency)?;
    efficiency(&field("fan_efficiency"), hex.fan_efficiency)?;
    non_negative(&field("wall_resistance_k_per_w"), hex.wall_resistance_k_per_w)?;
    for (side, s) in [("coolant_surface", &hex.coolant_surface), ("air_surface", &hex.air_surface)] {
        let f = |name: &str| format!("{prefix} {side} {name}");
        positive(&f("fin_spacing_m"), s.fin_spacing_m)?;
        positive(&f("fin_height_m"), s.fin_height_m)?;
        positive(&f("fin_thickness_m"), s.fin_thickness_m)?;
        positive(&f("strip_length_m"), s.strip_length_m)?;
        positive(&f("fin_conductivity_w_per_m_k"), s.fin_conductivity_w_per_m_k)?;
        positive(&f("frontal_area_m2"), s.frontal_area_m2)?;
        efficiency(&f("free_flow_ratio"), s.free_flow_ratio)?;
        positive(&f("heat_transfer_area_m2"), s.heat_transfer_area_m2)?;
        fraction(&f("fin_area_ratio"), s.fin_area_ratio)?;
    }
    Ok(())
}

fn validate_mission(mission: &MissionDef, vehicle: &VehicleDef) -> Result<(), ValidationError> {
    if mission.solver.max_iterations == 0 {
        return Err(invalid("solver max_iterations", 0, "must be at least 1"));
    }
    positive("solver abs_tol", mission.solver.abs_tol)?;
    if !mission.delta_isa_k.is_finite() {
        return Err(invalid("delta_isa_k", mission.delta_isa_k, "must be finite"));
    }

    let mut seen = HashSet::new();
    if let Some(c) = &mission.constants {
        positive("constants g0", c.g0)?;
        positive("constants r_air", c.r_air)?;
        positive("constants gamma_air", c.gamma_air)?;
        positive("constants t_sl", c.t_sl)?;
        positive("constants p_sl", c.p_sl)?;
        non_negative("constants lapse_rate", c.lapse_rate)?;
        positive("constants tropopause_altitude", c.tropopause_altitude)?;
        positive("constants mu_ref", c.mu_ref)?;
        positive("constants t_mu_ref", c.t_mu_ref)?;
        positive("constants sutherland", c.sutherland)?;
    }
    for segment in &mission.segments {
        insert_unique(&mut seen, &segment.tag, || "mission segments".to_string())?;
        validate_segment(segment, vehicle)?;
    }
    Ok(())
}

fn validate_segment(segment: &SegmentDef, vehicle: &VehicleDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("segment '{}' {name}", segment.tag);
    if segment.n_points < 2 {
        return Err(invalid(field("n_points"), segment.n_points, "must be at least 2"));
    }
    let in_flight = match &segment.profile {
        ProfileDef::Climb {
            start_altitude_m,
            end_altitude_m,
            speed_m_s,
            climb_rate_m_s,
        } => {
            positive(&field("speed_m_s"), *speed_m_s)?;
            positive(&field("climb_rate_m_s"), *climb_rate_m_s)?;
            if !(end_altitude_m > start_altitude_m) {
                return Err(invalid(
                    field("end_altitude_m"),
                    end_altitude_m,
                    "must be above the start altitude",
                ));
            }
            true
        }
        ProfileDef::Cruise {
            speed_m_s,
            distance_m,
            ..
        } => {
            positive(&field("speed_m_s"), *speed_m_s)?;
            positive(&field("distance_m"), *distance_m)?;
            true
        }
        ProfileDef::Descent {
            start_altitude_m,
            end_altitude_m,
            speed_m_s,
            descent_rate_m_s,
        } => {
            positive(&field("speed_m_s"), *speed_m_s)?;
            positive(&field("descent_rate_m_s"), *descent_rate_m_s)?;
            if !(end_altitude_m < start_altitude_m) {
                return Err(invalid(
                    field("end_altitude_m"),
                    end_altitude_m,
                    "must be below the start altitude",
                ));
            }
            true
        }
        ProfileDef::Hover { duration_s, .. } => {
            positive(&field("duration_s"), *duration_s)?;
            true
        }
        ProfileDef::Recharge {
            duration_s,
            current_a,
            ..
        } => {
            positive(&field("duration_s"), *duration_s)?;
            if let Some(i) = current_a {
                positive(&field("current_a"), *i)?;
            }
            false
        }
        ProfileDef::GroundDischarge {
            duration_s,
            current_a,
            ..
        } => {
            positive(&field("duration_s"), *duration_s)?;
            non_negative(&field("current_a"), *current_a)?;
            false
        }
    };

    match segment.throttle {
        ThrottleDef::Fixed { value } => fraction(&field("throttle"), value)?,
        ThrottleDef::Trimmed { seed } => {
            fraction(&field("throttle seed"), seed)?;
            if in_flight && vehicle.drag.is_none() {
                return Err(ValidationError::MissingReference {
                    tag: "drag".to_string(),
                    context: format!("trimmed segment '{}' needs a vehicle drag model", segment.tag),
                });
            }
        }
    }
    for (key, cp) in &segment.power_coefficients {
        positive(&field(&format!("power coefficient '{key}'")), *cp)?;
    }
    Ok(())
}
