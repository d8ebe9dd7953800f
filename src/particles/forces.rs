use std::fmt;
use super::super::constants::MIN_RELATIVE_SEPARATION_2;
use super::super::errors::{DynamicsError, Result};
use super::{Axes, Particle};

/// A force law accumulates forces on the particles of a system.
///
/// Forces are zeroed by the system before `accumulate_forces` is called, so
/// implementations must add to `particle.force` and never assign it. A system
/// holds exactly one active law at a time: the built-in [`PairwiseGravity`]
/// unless a custom law has been set.
pub trait ForceLaw: Send + Sync {
    fn name(&self) -> &str;

    fn accumulate_forces(&self, particles: &mut [Particle], time: f64) -> Result<()>;

    /// Potential energy associated with the law, used by the energy diagnostics.
    fn potential_energy(&self, _particles: &[Particle]) -> f64 {
        0.
    }
}

/// Newtonian gravity summed over every unordered pair of particles, O(N^2).
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairwiseGravity {
    pub gravitational_constant: f64,
    pub softening_length: f64, // 0 when softening is disabled
}

impl PairwiseGravity {
    pub fn new(gravitational_constant: f64, softening_length: f64) -> PairwiseGravity {
        PairwiseGravity {
            gravitational_constant: gravitational_constant,
            softening_length: softening_length,
        }
    }

    fn softening_length_2(&self) -> f64 {
        self.softening_length * self.softening_length
    }

    /// Net gravitational force on every particle, without touching the particles.
    pub fn calculate_forces(&self, particles: &[Particle]) -> Result<Vec<Axes>> {
        validate_masses(particles)?;
        let softening_length_2 = self.softening_length_2();
        let mut forces = vec![Axes::zero(); particles.len()];

        for (i, particle_a) in particles.iter().enumerate() {
            for (offset, particle_b) in particles[i+1..].iter().enumerate() {
                let j = i + 1 + offset;
                let separation = particle_b.position - particle_a.position;
                let distance_2 = separation.norm_squared() + softening_length_2;
                if is_hazardous(distance_2, particle_a.position, particle_b.position) {
                    return Err(DynamicsError::NumericalHazard { first: i, second: j, distance_2: distance_2 });
                }
                let prefactor = self.gravitational_constant * particle_a.mass * particle_b.mass / (distance_2 * distance_2.sqrt());
                let force = separation * prefactor;
                if !force.is_finite() {
                    return Err(DynamicsError::NumericalHazard { first: i, second: j, distance_2: distance_2 });
                }
                // Newton's third law: computed once, applied twice
                forces[i] += force;
                forces[j] -= force;
            }
        }
        Ok(forces)
    }
}

impl ForceLaw for PairwiseGravity {
    fn name(&self) -> &str {
        "pairwise gravity"
    }

    fn accumulate_forces(&self, particles: &mut [Particle], _time: f64) -> Result<()> {
        let forces = self.calculate_forces(particles)?;
        for (particle, force) in particles.iter_mut().zip(forces) {
            particle.force += force;
        }
        Ok(())
    }

    fn potential_energy(&self, particles: &[Particle]) -> f64 {
        let softening_length_2 = self.softening_length_2();
        let mut e_pot = 0.;
        for (i, particle_a) in particles.iter().enumerate() {
            for particle_b in particles[i+1..].iter() {
                let distance_2 = (particle_b.position - particle_a.position).norm_squared() + softening_length_2;
                e_pot -= self.gravitational_constant * particle_a.mass * particle_b.mass / distance_2.sqrt();
            }
        }
        e_pot
    }
}

/// Wraps a closure so it can be used as a force law. Anything the law needs
/// (the equivalent of user data) is captured by the closure.
pub struct ForceFn<F> {
    name: String,
    function: F,
}

impl<F> ForceFn<F>
    where F: Fn(&mut [Particle], f64) -> Result<()> + Send + Sync {
    pub fn new(name: &str, function: F) -> ForceFn<F> {
        ForceFn { name: name.to_string(), function: function }
    }
}

impl<F> fmt::Debug for ForceFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceFn").field("name", &self.name).finish()
    }
}

impl<F> ForceLaw for ForceFn<F>
    where F: Fn(&mut [Particle], f64) -> Result<()> + Send + Sync {
    fn name(&self) -> &str {
        &self.name
    }

    fn accumulate_forces(&self, particles: &mut [Particle], time: f64) -> Result<()> {
        (self.function)(particles, time)
    }
}

// The separation is meaningless once it is lost in the rounding of the
// positions themselves, whatever the unit system.
fn is_hazardous(distance_2: f64, position_a: Axes, position_b: Axes) -> bool {
    let scale_2 = position_a.norm_squared().max(position_b.norm_squared());
    !(distance_2 > 0.) || distance_2 < MIN_RELATIVE_SEPARATION_2 * scale_2
}

pub fn validate_masses(particles: &[Particle]) -> Result<()> {
    for (index, particle) in particles.iter().enumerate() {
        if !(particle.mass > 0.) || !particle.mass.is_finite() {
            return Err(DynamicsError::InvalidMass { index: index, mass: particle.mass });
        }
    }
    Ok(())
}
