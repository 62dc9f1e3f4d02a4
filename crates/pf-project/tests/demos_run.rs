use approx::assert_relative_eq;
use pf_project::{compile, load};
use std::path::PathBuf;

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("demos/projects")
}

#[test]
fn demos_validate_and_compile() {
    let demos = [
        "01_electric_cruise.yaml",
        "02_piston_climb.yaml",
        "03_cooled_ground_run.yaml",
    ];
    for name in demos {
        let path = demos_dir().join(name);
        let project = load(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let compiled = compile(&project);
        assert!(compiled.is_ok(), "{name} failed to compile: {:?}", compiled.err());
    }
}

#[test]
fn compiled_mass_includes_energy_sources() {
    let project = load(&demos_dir().join("01_electric_cruise.yaml")).unwrap();
    let compiled = compile(&project).unwrap();
    // 6600 cells at 48 g plus 300 kg of airframe
    assert_relative_eq!(compiled.vehicle.mass(), 300.0 + 6600.0 * 0.048, max_relative = 1e-12);

    let project = load(&demos_dir().join("02_piston_climb.yaml")).unwrap();
    let compiled = compile(&project).unwrap();
    assert_relative_eq!(compiled.vehicle.mass(), 900.0 + 90.0, max_relative = 1e-12);
}

#[test]
fn electric_demo_flies_and_recharges() {
    let project = load(&demos_dir().join("01_electric_cruise.yaml")).unwrap();
    let mut compiled = compile(&project).unwrap();
    let results = compiled.mission.run(&mut compiled.vehicle).unwrap();
    assert!(results.all_converged());

    let summary = results.summary();
    let cruise = &summary.segments[0];
    let charge = &summary.segments[1];
    assert!(cruise.state_of_charge["bus.pack"] < 0.9);
    assert!(charge.state_of_charge["bus.pack"] > cruise.state_of_charge["bus.pack"]);
    assert_eq!(charge.max_thrust, 0.0);
}

#[test]
fn cooled_ground_run_converges() {
    let project = load(&demos_dir().join("03_cooled_ground_run.yaml")).unwrap();
    let mut compiled = compile(&project).unwrap();
    let results = compiled.mission.run(&mut compiled.vehicle).unwrap();
    assert!(results.all_converged());

    let discharge = &results.segment("discharge").unwrap().segment;
    let coolant = discharge.conditions.line("coolant").unwrap();
    let coolant = coolant.coolant.as_ref().expect("coolant record");
    assert!(coolant.pump_power.iter().all(|&p| p >= 0.0));
    let line = discharge.conditions.line("bus").unwrap();
    let battery = line.batteries.require("pack").unwrap();
    assert!(battery.soc.windows(2).all(|w| w[1] < w[0]));
}
