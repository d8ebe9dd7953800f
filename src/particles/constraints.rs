use std::fmt;
use super::super::errors::{DynamicsError, Result};
use super::{Axes, Particle};

/// A constraint corrects the particles once an integrator has advanced them.
///
/// Constraints run after every successful step, in the order they were added,
/// and are part of the step: if one fails the whole step is rolled back.
/// `previous` holds the particles as they were at the start of the step (same
/// order and length as `particles`).
pub trait Constraint: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, particles: &mut [Particle], previous: &[Particle], time: f64) -> Result<()>;
}

/// Built-in constraint, always applied first: fixed particles end every step
/// with the position and velocity they started it with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedParticles;

impl Constraint for FixedParticles {
    fn name(&self) -> &str {
        "fixed particles"
    }

    fn apply(&self, particles: &mut [Particle], previous: &[Particle], _time: f64) -> Result<()> {
        for (particle, previous_particle) in particles.iter_mut().zip(previous).filter(|(particle, _)| particle.fixed) {
            particle.position = previous_particle.position;
            particle.velocity = previous_particle.velocity;
        }
        Ok(())
    }
}

/// Moves the system to its barycentric frame: the center of mass is kept at
/// the origin and at rest. Fixed particles are shifted like the others.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CenterOfMassFrame;

impl Constraint for CenterOfMassFrame {
    fn name(&self) -> &str {
        "center of mass frame"
    }

    fn apply(&self, particles: &mut [Particle], _previous: &[Particle], _time: f64) -> Result<()> {
        let mut center_of_mass_position = Axes::zero();
        let mut center_of_mass_velocity = Axes::zero();
        let mut center_of_mass_mass = 0.;
        for particle in particles.iter() {
            center_of_mass_position += particle.position * particle.mass;
            center_of_mass_velocity += particle.velocity * particle.mass;
            center_of_mass_mass += particle.mass;
        }
        if !(center_of_mass_mass > 0.) {
            return Err(DynamicsError::InvalidMass { index: 0, mass: center_of_mass_mass });
        }
        center_of_mass_position = center_of_mass_position / center_of_mass_mass;
        center_of_mass_velocity = center_of_mass_velocity / center_of_mass_mass;
        for particle in particles.iter_mut() {
            particle.position -= center_of_mass_position;
            particle.velocity -= center_of_mass_velocity;
        }
        Ok(())
    }
}

/// Wraps a closure so it can be used as a constraint.
pub struct ConstraintFn<F> {
    name: String,
    function: F,
}

impl<F> ConstraintFn<F>
    where F: Fn(&mut [Particle], f64) -> Result<()> + Send + Sync {
    pub fn new(name: &str, function: F) -> ConstraintFn<F> {
        ConstraintFn { name: name.to_string(), function: function }
    }
}

impl<F> fmt::Debug for ConstraintFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintFn").field("name", &self.name).finish()
    }
}

impl<F> Constraint for ConstraintFn<F>
    where F: Fn(&mut [Particle], f64) -> Result<()> + Send + Sync {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, particles: &mut [Particle], _previous: &[Particle], time: f64) -> Result<()> {
        (self.function)(particles, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn fixed_particles_are_put_back() {
        let previous = vec![
            Particle::new(1., Axes::zero(), Axes::new(1., 0., 0.)).fixed(),
            Particle::new(1., Axes::new(1., 0., 0.), Axes::zero()),
        ];
        let mut particles = previous.clone();
        particles[0].position = Axes::new(0.5, 0., 0.);
        particles[1].position = Axes::new(2., 0., 0.);
        FixedParticles.apply(&mut particles, &previous, 0.).unwrap();
        assert_eq!(particles[0], previous[0]);
        assert_eq!(particles[1].position, Axes::new(2., 0., 0.));
    }

    #[test]
    fn center_of_mass_frame() {
        let mut particles = vec![
            Particle::new(1., Axes::new(1., 0., 0.), Axes::new(0., 1., 0.)),
            Particle::new(3., Axes::new(5., 0., 0.), Axes::new(0., 1., 0.)),
        ];
        let previous = particles.clone();
        CenterOfMassFrame.apply(&mut particles, &previous, 0.).unwrap();
        assert_approx_eq!(particles[0].position.x, -3.);
        assert_approx_eq!(particles[1].position.x, 1.);
        assert_eq!(particles[0].velocity, Axes::zero());
        assert_eq!(particles[1].velocity, Axes::zero());
    }
}
