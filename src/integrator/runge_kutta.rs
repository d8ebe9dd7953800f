use super::super::errors::Result;
use super::super::particles::{Axes, System};

/// Classic fourth order Runge-Kutta on the (position, velocity) state:
///   k1 = f(t, y)
///   k2 = f(t + dt/2, y + k1 dt/2)
///   k3 = f(t + dt/2, y + k2 dt/2)
///   k4 = f(t + dt, y + k3 dt)
///   y <- y + dt/6 (k1 + 2 k2 + 2 k3 + k4)
/// The intermediate stages are evaluated on a scratch copy of the particles.
pub(crate) fn step(system: &mut System, time_step: f64) -> Result<()> {
    let time = system.time();
    let half_time_step = 0.5 * time_step;
    let fixed: Vec<bool> = system.particles().iter().map(|particle| particle.fixed).collect();
    let positions: Vec<Axes> = system.particles().iter().map(|particle| particle.position).collect();
    let velocities: Vec<Axes> = system.particles().iter().map(|particle| particle.velocity).collect();

    let k1_accelerations = system.accelerations_at(time, &positions, &velocities)?;
    let (k2_positions, k2_velocities) = advance(&positions, &velocities, &velocities, &k1_accelerations, &fixed, half_time_step);
    let k2_accelerations = system.accelerations_at(time + half_time_step, &k2_positions, &k2_velocities)?;
    let (k3_positions, k3_velocities) = advance(&positions, &velocities, &k2_velocities, &k2_accelerations, &fixed, half_time_step);
    let k3_accelerations = system.accelerations_at(time + half_time_step, &k3_positions, &k3_velocities)?;
    let (k4_positions, k4_velocities) = advance(&positions, &velocities, &k3_velocities, &k3_accelerations, &fixed, time_step);
    let k4_accelerations = system.accelerations_at(time + time_step, &k4_positions, &k4_velocities)?;

    let factor = time_step / 6.;
    for (i, particle) in system.particles_mut().iter_mut().enumerate() {
        if fixed[i] {
            continue;
        }
        particle.position += (velocities[i] + k2_velocities[i] * 2. + k3_velocities[i] * 2. + k4_velocities[i]) * factor;
        particle.velocity += (k1_accelerations[i] + k2_accelerations[i] * 2. + k3_accelerations[i] * 2. + k4_accelerations[i]) * factor;
    }
    Ok(())
}

// y + k h, for the position and velocity blocks
fn advance(positions: &[Axes], velocities: &[Axes], position_derivatives: &[Axes], velocity_derivatives: &[Axes], fixed: &[bool], time_step: f64) -> (Vec<Axes>, Vec<Axes>) {
    let mut new_positions = Vec::with_capacity(positions.len());
    let mut new_velocities = Vec::with_capacity(velocities.len());
    for i in 0..positions.len() {
        if fixed[i] {
            new_positions.push(positions[i]);
            new_velocities.push(velocities[i]);
        } else {
            new_positions.push(positions[i] + position_derivatives[i] * time_step);
            new_velocities.push(velocities[i] + velocity_derivatives[i] * time_step);
        }
    }
    (new_positions, new_velocities)
}
