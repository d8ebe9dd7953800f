#![allow(dead_code)]
pub mod simulation;

use holos::{Axes, IntegratorType, Particle, System};

pub fn simulation_properties() -> (f64, f64, f64, f64) {
    let time_step: f64 = 0.01;
    let time_limit: f64 = 1.;
    let historic_snapshot_period: f64 = 0.1;
    let recovery_snapshot_period: f64 = 0.5;
    (time_step, time_limit, historic_snapshot_period, recovery_snapshot_period)
}

/// Unique path under the temporary directory, removed first if it exists.
pub fn temporary_path(test_name: &str, extension: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("holos-{}-{}.{}", test_name, std::process::id(), extension));
    let _ = std::fs::remove_file(&path);
    path
}

pub fn free_particle() -> System {
    System::from_particles(vec![
        Particle::new(1., Axes::new(1., 2., 3.), Axes::new(0.5, -1., 0.25)),
    ]).unwrap()
}

/// Star and planet on a barycentric orbit (G = 1, semi-major axis 1).
pub fn star_and_planet(eccentricity: f64) -> System {
    let particles = holos::tools::calculate_two_body_orbit(1., 1., 1.0e-3, 1., eccentricity).unwrap();
    System::from_particles(particles).unwrap()
}

pub fn star_and_planet_period() -> f64 {
    holos::tools::calculate_orbital_period(1. + 1.0e-3, 1.)
}

/// Three bodies with comparable masses and a non-zero net momentum.
pub fn three_bodies() -> System {
    let mut system = System::from_particles(vec![
        Particle::new(1.0, Axes::new(0., 0., 0.), Axes::new(0.05, 0., 0.01)),
        Particle::new(0.5, Axes::new(1., 0.2, 0.), Axes::new(0., 0.8, 0.)),
        Particle::new(0.3, Axes::new(-0.5, 1., 0.1), Axes::new(-0.6, -0.3, 0.)),
    ]).unwrap();
    system.set_softening(true, 0.05).unwrap();
    system
}

pub fn relative_position(system: &System) -> Axes {
    system.particles()[1].position - system.particles()[0].position
}

pub fn integrate(system: &mut System, integrator: IntegratorType, time_step: f64, n_steps: usize) {
    for _ in 0..n_steps {
        system.step(time_step, integrator).unwrap();
    }
}

/// Largest relative energy deviation seen while integrating.
pub fn max_energy_error(system: &mut System, integrator: IntegratorType, time_step: f64, n_steps: usize) -> f64 {
    let initial_energy = system.total_energy().unwrap();
    let mut max_error: f64 = 0.;
    for _ in 0..n_steps {
        system.step(time_step, integrator).unwrap();
        let error = ((system.total_energy().unwrap() - initial_energy) / initial_energy).abs();
        max_error = max_error.max(error);
    }
    max_error
}
