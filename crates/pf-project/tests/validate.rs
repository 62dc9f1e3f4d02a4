use pf_project::schema::*;
use pf_project::{ValidationError, load_yaml, validate_project};
use pf_core::Constants;
use std::path::PathBuf;

fn demo(name: &str) -> Project {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf();
    load_yaml(&root.join("demos/projects").join(name)).unwrap()
}

fn electric() -> Project {
    demo("01_electric_cruise.yaml")
}

#[test]
fn duplicate_segment_tag_rejected() {
    let mut project = electric();
    let copy = project.mission.segments[0].clone();
    project.mission.segments.push(copy);
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::DuplicateTag { ref tag, .. }) if tag == "cruise"
    ));
}

#[test]
fn duplicate_line_tag_across_networks_rejected() {
    let mut project = electric();
    let mut second = project.vehicle.networks[0].clone();
    second.tag = "electric_2".to_string();
    project.vehicle.networks.push(second);
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::DuplicateTag { ref tag, .. }) if tag == "bus"
    ));
}

#[test]
fn single_point_segment_rejected() {
    let mut project = electric();
    project.mission.segments[0].n_points = 1;
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn efficiency_out_of_range_rejected() {
    let mut project = electric();
    let prop = &mut project.vehicle.networks[0].buses[0].propulsors[0];
    if let ChainDef::ElectricRotor { esc_efficiency, .. } = &mut prop.chain {
        *esc_efficiency = 1.2;
    }
    let err = validate_project(&project).unwrap_err();
    assert!(err.to_string().contains("esc_efficiency"));
}

#[test]
fn initial_soc_outside_unit_interval_rejected() {
    let mut project = electric();
    project.vehicle.networks[0].buses[0].batteries[0].initial_soc = Some(1.5);
    assert!(validate_project(&project).is_err());
}

#[test]
fn unknown_parent_rejected() {
    let mut project = electric();
    project.vehicle.parts[1].parent = Some("nacelle".to_string());
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::MissingReference { ref tag, .. }) if tag == "nacelle"
    ));
}

#[test]
fn part_tag_reserved_for_energy_source() {
    let mut project = electric();
    project.vehicle.parts.push(PartDef {
        tag: "bus.pack".to_string(),
        parent: None,
        kind: PartKindDef::Component {
            mass_kg: 1.0,
            cg_m: [0.0; 3],
        },
    });
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::DuplicateTag { .. })
    ));
}

#[test]
fn trimmed_segment_needs_drag_model() {
    let mut project = electric();
    project.vehicle.drag = None;
    project.mission.segments[0].throttle = ThrottleDef::Trimmed { seed: 0.5 };
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::MissingReference { ref tag, .. }) if tag == "drag"
    ));
}

#[test]
fn coolant_line_must_reference_a_battery_on_its_bus() {
    let mut project = demo("03_cooled_ground_run.yaml");
    project.vehicle.networks[0].coolant_lines[0].battery = "spare".to_string();
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::MissingReference { ref tag, .. }) if tag == "spare"
    ));
}

#[test]
fn fuel_network_cannot_hold_buses() {
    let mut project = demo("02_piston_climb.yaml");
    let bus = electric().vehicle.networks[0].buses[0].clone();
    project.vehicle.networks[0].buses.push(bus);
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn future_version_rejected() {
    let mut project = electric();
    project.version = 7;
    assert_eq!(
        validate_project(&project),
        Err(ValidationError::UnsupportedVersion { version: 7 })
    );
}

#[test]
fn nonpositive_gravity_rejected() {
    let mut project = electric();
    project.mission.constants = Some(Constants {
        g0: 0.0,
        ..Constants::default()
    });
    assert!(matches!(
        validate_project(&project),
        Err(ValidationError::InvalidValue { ref field, .. }) if field == "constants g0"
    ));
}
