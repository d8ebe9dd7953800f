extern crate holos;

mod common;
use std::sync::Arc;
use assert_approx_eq::assert_approx_eq;
use holos::{Axes, CenterOfMassFrame, DormandPrince, DynamicsError, IntegratorType, Particle, System};

#[test]
fn center_of_mass_frame_is_kept_after_every_step() {
    for integrator in IntegratorType::all().iter() {
        // Net momentum, so the center of mass would otherwise drift away
        let mut system = common::three_bodies();
        if *integrator == IntegratorType::ExternalOde {
            system.set_ode_solver(Box::new(DormandPrince::default()));
        }
        system.add_constraint(Arc::new(CenterOfMassFrame));
        assert!(system.has_constraints());
        common::integrate(&mut system, *integrator, 0.01, 20);
        let (position, velocity) = system.center_of_mass().unwrap();
        assert!(position.norm() < 1e-14, "{}", integrator);
        assert!(velocity.norm() < 1e-14, "{}", integrator);
        assert_eq!(system.n_steps(), 20);
    }
}

#[test]
fn constraints_see_the_end_of_the_step() {
    let mut system = common::free_particle();
    // Keeps the particle above the z = 3.1 plane
    system.add_constraint_fn("floor", |particles: &mut [Particle], time: f64| {
        assert!(time > 0.);
        for particle in particles.iter_mut() {
            if particle.position.z < 3.1 {
                particle.position.z = 3.1;
                particle.velocity.z = 0.;
            }
        }
        Ok(())
    });
    system.particles_mut()[0].velocity.z = -1.;
    common::integrate(&mut system, IntegratorType::Verlet, 0.1, 5);
    let particle = &system.particles()[0];
    assert_eq!(particle.position.z, 3.1);
    assert_eq!(particle.velocity.z, 0.);
    assert_approx_eq!(particle.position.x, 1.25, 1e-12);
}

#[test]
fn failing_constraint_rolls_back_the_step() {
    let mut system = common::star_and_planet(0.);
    system.add_constraint_fn("limit", |_particles: &mut [Particle], time: f64| {
        if time > 0.025 {
            Err(DynamicsError::InvalidParameter { name: "time", value: time })
        } else {
            Ok(())
        }
    });
    common::integrate(&mut system, IntegratorType::RungeKutta4, 0.01, 2);
    let before = system.particles().to_vec();
    assert!(system.step(0.01, IntegratorType::RungeKutta4).is_err());
    assert_eq!(system.particles(), &before[..]);
    assert_eq!(system.n_steps(), 2);
    assert_approx_eq!(system.time(), 0.02);
}

#[test]
fn user_constraints_run_after_fixed_particles() {
    let mut system = System::from_particles(vec![
        Particle::new(1., Axes::new(1., 0., 0.), Axes::zero()).fixed(),
        Particle::new(1.0e-3, Axes::new(2., 0., 0.), Axes::new(0., 1., 0.)),
    ]).unwrap();
    system.add_constraint_fn("shift", |particles: &mut [Particle], _time: f64| {
        for particle in particles.iter_mut() {
            particle.position.y += 1.;
        }
        Ok(())
    });
    system.step(0.01, IntegratorType::LeapFrog).unwrap();
    // The built-in constraint runs before the user ones
    assert_eq!(system.particles()[0].position, Axes::new(1., 1., 0.));
    assert!(system.particles()[1].position.y > 1.);
}

#[test]
fn constraints_can_be_applied_between_steps() {
    let mut system = common::three_bodies();
    assert!(!system.has_constraints());
    system.apply_constraints().unwrap();
    assert_eq!(system.particles(), common::three_bodies().particles());

    system.add_constraint(Arc::new(CenterOfMassFrame));
    system.apply_constraints().unwrap();
    let (position, velocity) = system.center_of_mass().unwrap();
    assert!(position.norm() < 1e-14);
    assert!(velocity.norm() < 1e-14);
    assert_eq!(system.n_steps(), 0);

    system.add_constraint_fn("broken", |particles: &mut [Particle], _time: f64| {
        particles[0].position.x = f64::NAN;
        Ok(())
    });
    let before = system.particles().to_vec();
    assert!(matches!(system.apply_constraints(), Err(DynamicsError::NonFiniteState { index: 0 })));
    assert_eq!(system.particles(), &before[..]);

    system.clear_constraints();
    assert!(!system.has_constraints());
    assert!(System::new(0).unwrap().apply_constraints().is_err());
}

#[test]
fn constraints_are_shared_by_clones_but_not_saved() {
    let mut system = common::three_bodies();
    system.add_constraint(Arc::new(CenterOfMassFrame));
    let copy = system.clone();
    assert_eq!(copy.constraint_names(), vec!["center of mass frame".to_string()]);

    let path = common::temporary_path("constraints", "json");
    system.save(&path).unwrap();
    let restored = System::load(&path).unwrap();
    assert!(!restored.has_constraints());
    let _ = std::fs::remove_file(&path);
}
