use super::super::errors::Result;
use super::super::particles::System;

/// First order Euler step. Velocities are kicked first and the drift uses the
/// updated velocity (semi-implicit Euler):
///   v <- v + a dt
///   x <- x + v dt
pub(crate) fn step(system: &mut System, time_step: f64) -> Result<()> {
    system.compute_forces()?;
    for particle in system.particles_mut().iter_mut().filter(|particle| !particle.fixed) {
        let acceleration = particle.acceleration();
        particle.velocity += acceleration * time_step;
        particle.position += particle.velocity * time_step;
    }
    Ok(())
}
