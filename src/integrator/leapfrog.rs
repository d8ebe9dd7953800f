use super::super::errors::Result;
use super::super::particles::System;

/// LeapFrog is a second order symplectic integrator (Drift-Kick-Drift):
/// positions drift for half a time step keeping the velocities fixed, the
/// velocities are kicked for a full time step with the forces evaluated at
/// the midpoint, and positions drift the remaining half step.
///
/// Velocities are synchronized with positions at the step boundaries, hence
/// no initial half kick is needed.
pub(crate) fn step(system: &mut System, time_step: f64) -> Result<()> {
    let half_time_step = 0.5 * time_step;
    let midpoint_time = system.time() + half_time_step;

    drift(system, half_time_step);
    system.compute_forces_at(midpoint_time)?;

    for particle in system.particles_mut().iter_mut().filter(|particle| !particle.fixed) {
        let acceleration = particle.acceleration();
        particle.velocity += acceleration * time_step;
        particle.position += particle.velocity * half_time_step;
    }
    Ok(())
}

fn drift(system: &mut System, time_step: f64) {
    for particle in system.particles_mut().iter_mut().filter(|particle| !particle.fixed) {
        particle.position += particle.velocity * time_step;
    }
}
