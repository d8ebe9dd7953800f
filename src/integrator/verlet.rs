use super::super::errors::Result;
use super::super::particles::{Axes, System};

/// Velocity Verlet, a second order symplectic integrator:
///   x <- x + v dt + 1/2 a(t) dt^2
///   v <- v + 1/2 (a(t) + a(t+dt)) dt
///
/// Forces are evaluated at both ends of the step, so they are current for the
/// final positions once the step is done.
pub(crate) fn step(system: &mut System, time_step: f64) -> Result<()> {
    let half_time_step = 0.5 * time_step;
    let end_time = system.time() + time_step;

    system.compute_forces()?;
    let initial_accelerations: Vec<Axes> = system.particles().iter().map(|particle| particle.acceleration()).collect();

    for (particle, acceleration) in system.particles_mut().iter_mut().zip(initial_accelerations.iter()) {
        if particle.fixed {
            continue;
        }
        particle.position += particle.velocity * time_step + *acceleration * (half_time_step * time_step);
    }

    system.compute_forces_at(end_time)?;

    for (particle, initial_acceleration) in system.particles_mut().iter_mut().zip(initial_accelerations) {
        if particle.fixed {
            continue;
        }
        let acceleration = particle.acceleration();
        particle.velocity += (initial_acceleration + acceleration) * half_time_step;
    }
    Ok(())
}
