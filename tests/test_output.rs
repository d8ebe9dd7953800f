extern crate holos;

mod common;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use assert_approx_eq::assert_approx_eq;
use holos::output::{backup_path, get_history_writer, read_history, read_snapshot, truncate_history, write_snapshot};
use holos::{DynamicsError, IntegratorType, Particle, Simulation, System};

fn simulation_case(integrator: IntegratorType) -> Simulation {
    let (time_step, time_limit, historic_snapshot_period, recovery_snapshot_period) = common::simulation_properties();
    let system = common::star_and_planet(0.2);
    Simulation::new(system, integrator, time_step, time_limit, historic_snapshot_period, recovery_snapshot_period).unwrap()
}

#[test]
fn system_snapshot_round_trip() {
    for extension in ["json", "bin"].iter() {
        let path = common::temporary_path("system_snapshot", extension);
        let mut system = common::three_bodies();
        system.name = Some("three bodies".to_string());
        system.add_particle(Particle::new(0.1, holos::Axes::new(3., 0., 0.), holos::Axes::zero()).with_tag("moon").fixed()).unwrap();
        system.step(0.01, IntegratorType::LeapFrog).unwrap();
        system.record_baseline().unwrap();
        system.save(&path).unwrap();

        let restored = System::load(&path).unwrap();
        assert_eq!(restored.particles(), system.particles());
        assert_eq!(restored.name, system.name);
        assert_eq!(restored.softening(), system.softening());
        assert_eq!(restored.n_steps(), 1);
        assert_approx_eq!(restored.time(), 0.01);
        assert!(restored.check_conservation(1e-12).unwrap());
        assert!(!restored.has_ode_solver());
        let _ = fs::remove_file(&path);
    }
}

#[test]
fn json_snapshots_are_human_readable() {
    let path = common::temporary_path("readable", "json");
    write_snapshot(&path, &common::free_particle()).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"gravitational_constant\""));
    assert!(content.contains("\"velocity\""));
    let _ = fs::remove_file(&path);
}

#[test]
fn loading_a_missing_snapshot_fails() {
    let path = common::temporary_path("missing", "bin");
    assert!(System::load(&path).is_err());
    assert!(read_snapshot::<Simulation>(&path).is_err());
}

#[test]
fn simulation_writes_history_until_the_time_limit() {
    let history_path = common::temporary_path("history", "csv");
    let snapshot_path = common::temporary_path("history_snapshot", "bin");
    let mut simulation = simulation_case(IntegratorType::Verlet);
    common::simulation::iterate(&mut simulation, &history_path, &snapshot_path, false);

    assert_eq!(simulation.system.n_steps(), 100);
    assert_approx_eq!(simulation.system.time(), 1., 1e-9);

    let records = read_history(&history_path).unwrap();
    assert_eq!(records.len(), simulation.n_history_records());
    assert_eq!(records.len(), 2 * simulation.n_historic_snapshots());
    assert!(simulation.n_historic_snapshots() >= 10);
    assert_eq!(records[0].time, 0.);
    assert_eq!(records[0].id, 0);
    assert_eq!(records[1].id, 1);
    let last = &records[records.len() - 1];
    assert_eq!(last.step, 100);
    assert_approx_eq!(last.time, 1., 1e-9);
    assert!(((last.total_energy - records[0].total_energy) / records[0].total_energy).abs() < 1e-3);
    for pair in records.windows(2) {
        assert!(pair[1].time >= pair[0].time);
    }

    let restored = Simulation::load(&snapshot_path).unwrap();
    assert_eq!(restored.system.particles(), simulation.system.particles());
    let _ = fs::remove_file(&history_path);
    let _ = fs::remove_file(&snapshot_path);
}

#[test]
fn resumed_simulation_matches_an_uninterrupted_one() {
    let history_path = common::temporary_path("uninterrupted", "csv");
    let snapshot_path = common::temporary_path("uninterrupted", "bin");
    let mut reference = simulation_case(IntegratorType::RungeKutta4);
    common::simulation::iterate(&mut reference, &history_path, &snapshot_path, false);
    let reference_records = read_history(&history_path).unwrap();

    let interrupted_history_path = common::temporary_path("interrupted", "csv");
    let interrupted_snapshot_path = common::temporary_path("interrupted", "bin");
    let mut interrupted = simulation_case(IntegratorType::RungeKutta4);
    // Recovery snapshots are saved after the first iteration and once half of the time has passed
    common::simulation::iterate_until(&mut interrupted, &interrupted_history_path, &interrupted_snapshot_path, 60);

    let mut resumed = Simulation::load(&interrupted_snapshot_path).unwrap();
    assert!(resumed.system.time() > 0.5 && resumed.system.time() < 0.6);
    common::simulation::iterate(&mut resumed, &interrupted_history_path, &interrupted_snapshot_path, true);

    assert_eq!(resumed.system.n_steps(), reference.system.n_steps());
    assert_eq!(resumed.system.particles(), reference.system.particles());
    let resumed_records = read_history(&interrupted_history_path).unwrap();
    assert_eq!(resumed_records, reference_records);

    for path in [history_path, snapshot_path, interrupted_history_path, interrupted_snapshot_path].iter() {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn resume_discards_a_partially_written_row() {
    let history_path = common::temporary_path("complete", "csv");
    let snapshot_path = common::temporary_path("complete", "bin");
    let mut reference = simulation_case(IntegratorType::RungeKutta4);
    common::simulation::iterate(&mut reference, &history_path, &snapshot_path, false);
    let reference_records = read_history(&history_path).unwrap();

    let interrupted_history_path = common::temporary_path("partial_row", "csv");
    let interrupted_snapshot_path = common::temporary_path("partial_row", "bin");
    let mut interrupted = simulation_case(IntegratorType::RungeKutta4);
    common::simulation::iterate_until(&mut interrupted, &interrupted_history_path, &interrupted_snapshot_path, 60);
    // Interrupted while the buffered rows were being written
    let mut history_file = OpenOptions::new().append(true).open(&interrupted_history_path).unwrap();
    history_file.write_all(b"0.61,0.01,61,0,0.7").unwrap();
    drop(history_file);
    assert!(read_history(&interrupted_history_path).is_err());

    let mut resumed = Simulation::load(&interrupted_snapshot_path).unwrap();
    common::simulation::iterate(&mut resumed, &interrupted_history_path, &interrupted_snapshot_path, true);
    let resumed_records = read_history(&interrupted_history_path).unwrap();
    assert_eq!(resumed_records, reference_records);
    assert_eq!(fs::metadata(&interrupted_history_path).unwrap().len(), resumed.n_history_bytes());

    for path in [history_path, snapshot_path, interrupted_history_path, interrupted_snapshot_path].iter() {
        let _ = fs::remove_file(path);
        let _ = fs::remove_file(backup_path(path));
    }
}

#[test]
fn resume_requires_the_whole_history() {
    let history_path = common::temporary_path("short_history", "csv");
    let snapshot_path = common::temporary_path("short_history", "bin");
    let mut simulation = simulation_case(IntegratorType::Verlet);
    common::simulation::iterate_until(&mut simulation, &history_path, &snapshot_path, 60);
    let restored = Simulation::load(&snapshot_path).unwrap();
    let expected_n_bytes = restored.n_history_bytes();
    assert!(expected_n_bytes > 0);
    assert!(restored.n_history_records() > 0);

    let history_file = OpenOptions::new().write(true).open(&history_path).unwrap();
    history_file.set_len(expected_n_bytes - 10).unwrap();
    drop(history_file);
    match truncate_history(&history_path, expected_n_bytes) {
        Err(DynamicsError::IncompleteHistory { current_n_bytes, .. }) => assert_eq!(current_n_bytes, expected_n_bytes - 10),
        other => panic!("unexpected outcome {:?}", other),
    }

    fs::remove_file(&history_path).unwrap();
    match truncate_history(&history_path, expected_n_bytes) {
        Err(DynamicsError::IncompleteHistory { current_n_bytes: 0, .. }) => {},
        other => panic!("unexpected outcome {:?}", other),
    }
    // Nothing to keep for a simulation that has not written any history yet
    truncate_history(&history_path, 0).unwrap();

    let _ = fs::remove_file(&snapshot_path);
    let _ = fs::remove_file(backup_path(&snapshot_path));
}

#[test]
fn corrupted_recovery_snapshot_falls_back_to_the_previous_one() {
    for extension in ["bin", "json"].iter() {
        let history_path = common::temporary_path("corrupted", "csv");
        let snapshot_path = common::temporary_path("corrupted", extension);
        let _ = fs::remove_file(backup_path(&snapshot_path));
        let mut simulation = simulation_case(IntegratorType::Verlet);
        let mut history_writer = get_history_writer(&history_path, false).unwrap();
        simulation.write_recovery_snapshot(&snapshot_path, &mut history_writer).unwrap();
        assert!(!backup_path(&snapshot_path).exists());
        for _ in 0..3 {
            simulation.iterate(&mut history_writer, true).unwrap();
        }
        simulation.write_recovery_snapshot(&snapshot_path, &mut history_writer).unwrap();
        assert!(backup_path(&snapshot_path).exists());
        assert_eq!(Simulation::load(&snapshot_path).unwrap().system.n_steps(), 3);

        // Interrupted while the snapshot was being written
        let content = fs::read(&snapshot_path).unwrap();
        fs::write(&snapshot_path, &content[..2]).unwrap();
        let restored = Simulation::load(&snapshot_path).unwrap();
        assert_eq!(restored.system.n_steps(), 0);
        assert_eq!(restored.n_history_bytes(), 0);

        fs::remove_file(backup_path(&snapshot_path)).unwrap();
        assert!(Simulation::load(&snapshot_path).is_err());
        let _ = fs::remove_file(&snapshot_path);
        let _ = fs::remove_file(&history_path);
    }
}

#[test]
fn loaded_systems_never_reuse_ids() {
    let path = common::temporary_path("ids", "json");
    let mut system = common::three_bodies();
    system.remove_particle(2).unwrap();
    system.save(&path).unwrap();

    let mut value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    value["next_id"] = serde_json::json!(0);
    fs::write(&path, value.to_string()).unwrap();
    let mut restored = System::load(&path).unwrap();
    let index = restored.add_particle(Particle::new(0.1, holos::Axes::new(3., 0., 0.), holos::Axes::zero())).unwrap();
    assert_eq!(restored.particle(index).unwrap().id, 2);

    // Bookkeeping fields can be omitted
    if let Some(fields) = value.as_object_mut() {
        fields.remove("next_id");
    }
    fs::write(&path, value.to_string()).unwrap();
    let mut restored = System::load(&path).unwrap();
    let index = restored.add_particle(Particle::new(0.1, holos::Axes::new(3., 0., 0.), holos::Axes::zero())).unwrap();
    assert_eq!(restored.particle(index).unwrap().id, 2);

    value["particles"][1]["id"] = serde_json::json!(0);
    fs::write(&path, value.to_string()).unwrap();
    assert!(matches!(System::load(&path), Err(DynamicsError::InvalidParameter { name: "particle id", .. })));
    let _ = fs::remove_file(&path);
}

#[test]
fn drift_warning_is_not_repeated_after_resume() {
    let history_path = common::temporary_path("drift", "csv");
    let snapshot_path = common::temporary_path("drift", "bin");
    let mut simulation = simulation_case(IntegratorType::Euler);
    simulation.set_conservation_tolerance(Some(1e-12)).unwrap();
    assert!(!simulation.drift_reported());
    common::simulation::iterate_until(&mut simulation, &history_path, &snapshot_path, 60);
    assert!(simulation.drift_reported());

    let restored = Simulation::load(&snapshot_path).unwrap();
    assert!(restored.drift_reported());
    let _ = fs::remove_file(&history_path);
    let _ = fs::remove_file(&snapshot_path);
    let _ = fs::remove_file(backup_path(&snapshot_path));
}

#[test]
fn external_ode_simulation_recovers_its_solver() {
    let history_path = common::temporary_path("ode_history", "csv");
    let snapshot_path = common::temporary_path("ode_snapshot", "json");
    let mut simulation = simulation_case(IntegratorType::ExternalOde);
    assert!(simulation.system.has_ode_solver());
    simulation.set_conservation_tolerance(Some(1e-6)).unwrap();
    common::simulation::iterate(&mut simulation, &history_path, &snapshot_path, false);
    assert!(simulation.system.check_conservation(1e-6).unwrap());

    // The JSON recovery snapshot doubles as a case description
    let mut restored = Simulation::load(&snapshot_path).unwrap();
    assert!(restored.system.has_ode_solver());
    restored.set_time_limit(2.).unwrap();
    common::simulation::iterate(&mut restored, &history_path, &snapshot_path, true);
    assert_approx_eq!(restored.system.time(), 2., 1e-9);
    let _ = fs::remove_file(&history_path);
    let _ = fs::remove_file(&snapshot_path);
}

#[test]
fn simulation_parameters_are_validated() {
    let system = common::star_and_planet(0.);
    assert!(Simulation::new(system.clone(), IntegratorType::Verlet, 0., 1., 0.1, 0.1).is_err());
    assert!(Simulation::new(system.clone(), IntegratorType::Verlet, 0.01, -1., 0.1, 0.1).is_err());
    assert!(Simulation::new(system.clone(), IntegratorType::Verlet, 0.01, 1., 0., 0.1).is_err());
    assert!(Simulation::new(System::new(0).unwrap(), IntegratorType::Verlet, 0.01, 1., 0.1, 0.1).is_err());
    let mut simulation = Simulation::new(system, IntegratorType::Verlet, 0.01, 1., 0.1, 0.1).unwrap();
    assert!(simulation.set_conservation_tolerance(Some(-1.)).is_err());
}

#[test]
fn case_description_starts_a_simulation() {
    let mut simulation = Simulation::load(std::path::Path::new("cases/two_body.json")).unwrap();
    assert_eq!(simulation.system.len(), 2);
    assert_eq!(simulation.integrator, IntegratorType::LeapFrog);
    assert_eq!(simulation.n_historic_snapshots(), 0);
    assert_eq!(simulation.system.find_particle(1).unwrap().tag, Some("planet".to_string()));
    assert_approx_eq!(simulation.system.total_momentum().unwrap().norm(), 0., 1e-12);
    simulation.system.step(simulation.time_step(), simulation.integrator).unwrap();
}
