use std::fmt;
use std::path::Path;
use std::sync::Arc;
use super::super::constants::{DEFAULT_GRAVITATIONAL_CONSTANT, MAX_PARTICLES};
use super::super::errors::{DynamicsError, Result};
use super::super::integrator::{IntegratorType, OdeSolver};
use super::super::integrator::{euler, leapfrog, ode, runge_kutta, verlet};
use super::super::integrator::output::{read_snapshot, write_snapshot};
use super::constraints::{Constraint, ConstraintFn, FixedParticles};
use super::forces::{validate_masses, ForceFn, ForceLaw, PairwiseGravity};
use super::{Axes, Particle};

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Softening {
    pub enabled: bool,
    pub length: f64,
}

impl Softening {
    pub fn length(&self) -> f64 {
        if self.enabled { self.length } else { 0. }
    }
}

/// Conserved quantities recorded at a reference instant.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Baseline {
    pub time: f64,
    pub total_energy: f64,
    pub total_momentum: Axes,
    pub total_angular_momentum: Axes,
    pub momentum_scale: f64, // sum(m |v|), used to normalize momentum drift
}

/// Ordered collection of particles plus the global parameters of the simulation.
///
/// The system exclusively owns its particles. Indices identify particles
/// positionally and change on removal (swap-remove); ids are stable.
#[derive(Serialize, Deserialize)]
pub struct System {
    pub name: Option<String>,
    particles: Vec<Particle>,
    gravitational_constant: f64,
    softening: Softening,
    #[serde(default)]
    time: f64,
    #[serde(default)]
    last_time_step: f64,
    #[serde(default)]
    n_steps: u64,
    #[serde(default)]
    next_id: usize,
    #[serde(default)]
    baseline: Option<Baseline>,
    #[serde(skip)]
    force_law: Option<Arc<dyn ForceLaw>>,
    #[serde(skip)]
    constraints: Vec<Arc<dyn Constraint>>,
    #[serde(skip)]
    ode_solver: Option<Box<dyn OdeSolver>>,
}

impl System {
    /// Allocates a system holding `n_particles` zero-initialized particles
    /// (mass 0, zero vectors). Masses must be set before forces are computed.
    pub fn new(n_particles: usize) -> Result<System> {
        if n_particles > MAX_PARTICLES {
            return Err(DynamicsError::TooManyParticles { requested: n_particles, maximum: MAX_PARTICLES });
        }
        let mut particles: Vec<Particle> = Vec::new();
        particles.try_reserve_exact(n_particles)
                 .map_err(|_| DynamicsError::AllocationFailed { requested: n_particles })?;
        for id in 0..n_particles {
            particles.push(Particle { id: id, ..Particle::default() });
        }
        Ok(System {
            name: None,
            particles: particles,
            gravitational_constant: DEFAULT_GRAVITATIONAL_CONSTANT,
            softening: Softening { enabled: false, length: 0. },
            time: 0.,
            last_time_step: 0.,
            n_steps: 0,
            next_id: n_particles,
            baseline: None,
            force_law: None,
            constraints: Vec::new(),
            ode_solver: None,
        })
    }

    /// Builds a system from already initialized particles, assigning ids in order.
    pub fn from_particles(particles: Vec<Particle>) -> Result<System> {
        let mut system = System::new(0)?;
        system.reserve(particles.len())?;
        for particle in particles {
            system.add_particle(particle)?;
        }
        Ok(system)
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        let requested = self.particles.len() + additional;
        if requested > MAX_PARTICLES {
            return Err(DynamicsError::TooManyParticles { requested: requested, maximum: MAX_PARTICLES });
        }
        self.particles.try_reserve(additional)
                      .map_err(|_| DynamicsError::AllocationFailed { requested: requested })
    }

    /// Releases every particle and the solver workspace. Calling it again is a no-op.
    pub fn clear(&mut self) {
        self.particles = Vec::new();
        self.ode_solver = None;
        self.baseline = None;
    }

    ////////////////////////////////////////////////////////////////////////////
    // Particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn particle(&self, index: usize) -> Result<&Particle> {
        let len = self.particles.len();
        self.particles.get(index).ok_or(DynamicsError::IndexOutOfRange { index: index, len: len })
    }

    pub fn particle_mut(&mut self, index: usize) -> Result<&mut Particle> {
        let len = self.particles.len();
        self.particles.get_mut(index).ok_or(DynamicsError::IndexOutOfRange { index: index, len: len })
    }

    /// Appends a particle and returns its index. The system assigns its id.
    pub fn add_particle(&mut self, mut particle: Particle) -> Result<usize> {
        if !(particle.mass > 0.) || !particle.mass.is_finite() {
            return Err(DynamicsError::InvalidMass { index: self.particles.len(), mass: particle.mass });
        }
        self.reserve(1)?;
        particle.id = self.next_id;
        self.next_id += 1;
        self.particles.push(particle);
        Ok(self.particles.len() - 1)
    }

    /// Removes the particle at `index`; the last particle moves into its slot.
    pub fn remove_particle(&mut self, index: usize) -> Result<Particle> {
        if index >= self.particles.len() {
            return Err(DynamicsError::IndexOutOfRange { index: index, len: self.particles.len() });
        }
        Ok(self.particles.swap_remove(index))
    }

    /// Checks that ids are unique and moves `next_id` past the largest one, so
    /// that ids read from a file are never handed out again.
    pub(crate) fn reconcile_ids(&mut self) -> Result<()> {
        let mut ids: Vec<usize> = self.particles.iter().map(|particle| particle.id).collect();
        ids.sort_unstable();
        for pair in ids.windows(2) {
            if pair[0] == pair[1] {
                return Err(DynamicsError::InvalidParameter { name: "particle id", value: pair[0] as f64 });
            }
        }
        if let Some(max_id) = ids.last() {
            self.next_id = self.next_id.max(max_id + 1);
        }
        Ok(())
    }

    pub fn find_particle(&self, id: usize) -> Option<&Particle> {
        self.particles.iter().find(|particle| particle.id == id)
    }

    pub fn find_particle_mut(&mut self, id: usize) -> Option<&mut Particle> {
        self.particles.iter_mut().find(|particle| particle.id == id)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Configuration
    pub fn gravitational_constant(&self) -> f64 {
        self.gravitational_constant
    }

    pub fn set_gravitational_constant(&mut self, gravitational_constant: f64) -> Result<()> {
        if !gravitational_constant.is_finite() {
            return Err(DynamicsError::InvalidParameter { name: "gravitational constant", value: gravitational_constant });
        }
        self.gravitational_constant = gravitational_constant;
        Ok(())
    }

    pub fn softening(&self) -> Softening {
        self.softening
    }

    pub fn set_softening(&mut self, enabled: bool, length: f64) -> Result<()> {
        if !(length >= 0.) || !length.is_finite() {
            return Err(DynamicsError::InvalidParameter { name: "softening length", value: length });
        }
        self.softening = Softening { enabled: enabled, length: length };
        Ok(())
    }

    /// Replaces the built-in pairwise gravity by a custom force law.
    pub fn set_force_law(&mut self, force_law: Arc<dyn ForceLaw>) {
        self.force_law = Some(force_law);
    }

    pub fn set_force_fn<F>(&mut self, name: &str, function: F)
        where F: Fn(&mut [Particle], f64) -> Result<()> + Send + Sync + 'static {
        self.set_force_law(Arc::new(ForceFn::new(name, function)));
    }

    /// Goes back to the built-in pairwise gravity.
    pub fn clear_force_law(&mut self) {
        self.force_law = None;
    }

    pub fn pairwise_gravity(&self) -> PairwiseGravity {
        PairwiseGravity::new(self.gravitational_constant, self.softening.length())
    }

    pub(crate) fn with_force_law<R, F: FnOnce(&dyn ForceLaw) -> R>(&self, f: F) -> R {
        match &self.force_law {
            Some(force_law) => f(force_law.as_ref()),
            None => f(&self.pairwise_gravity()),
        }
    }

    pub fn force_law_name(&self) -> String {
        self.with_force_law(|force_law| force_law.name().to_string())
    }

    /// Adds a constraint applied after every step, after the ones already added.
    pub fn add_constraint(&mut self, constraint: Arc<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    pub fn add_constraint_fn<F>(&mut self, name: &str, function: F)
        where F: Fn(&mut [Particle], f64) -> Result<()> + Send + Sync + 'static {
        self.add_constraint(Arc::new(ConstraintFn::new(name, function)));
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    /// Whether constraints other than the built-in fixed particles are present.
    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    pub fn constraint_names(&self) -> Vec<String> {
        self.constraints.iter().map(|constraint| constraint.name().to_string()).collect()
    }

    /// Applies the constraints to the current state, outside of a step. On
    /// error the particles are restored.
    pub fn apply_constraints(&mut self) -> Result<()> {
        self.ensure_not_empty()?;
        let backup = self.particles.clone();
        let time = self.time;
        let outcome = self.enforce_constraints(&backup, time).and_then(|_| self.ensure_finite_state());
        if outcome.is_err() {
            self.particles = backup;
        }
        outcome
    }

    fn enforce_constraints(&mut self, previous: &[Particle], time: f64) -> Result<()> {
        FixedParticles.apply(&mut self.particles, previous, time)?;
        for constraint in self.constraints.iter() {
            constraint.apply(&mut self.particles, previous, time)?;
        }
        Ok(())
    }

    /// Attaches the solver used by `IntegratorType::ExternalOde`. The system owns it.
    pub fn set_ode_solver(&mut self, ode_solver: Box<dyn OdeSolver>) {
        self.ode_solver = Some(ode_solver);
    }

    pub fn has_ode_solver(&self) -> bool {
        self.ode_solver.is_some()
    }

    pub(crate) fn take_ode_solver(&mut self) -> Option<Box<dyn OdeSolver>> {
        self.ode_solver.take()
    }

    pub(crate) fn restore_ode_solver(&mut self, ode_solver: Box<dyn OdeSolver>) {
        self.ode_solver = Some(ode_solver);
    }

    ////////////////////////////////////////////////////////////////////////////
    // Time
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn last_time_step(&self) -> f64 {
        self.last_time_step
    }

    pub fn n_steps(&self) -> u64 {
        self.n_steps
    }

    pub(crate) fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub(crate) fn set_baseline(&mut self, baseline: Baseline) {
        self.baseline = Some(baseline);
    }

    ////////////////////////////////////////////////////////////////////////////
    // Forces
    pub fn zero_forces(&mut self) {
        for particle in self.particles.iter_mut() {
            particle.force = Axes::zero();
        }
    }

    /// Accumulates pairwise gravity on top of the current forces. On error the
    /// forces are left untouched.
    pub fn compute_pairwise_gravity(&mut self) -> Result<()> {
        self.ensure_not_empty()?;
        let time = self.time;
        let gravity = self.pairwise_gravity();
        gravity.accumulate_forces(&mut self.particles, time)
    }

    /// Zeroes the forces and applies the active force law (custom law if set,
    /// pairwise gravity otherwise). On error the previous forces are restored.
    pub fn compute_forces(&mut self) -> Result<()> {
        let time = self.time;
        self.compute_forces_at(time)
    }

    /// Same as `compute_forces` for integrators evaluating forces inside a step.
    pub(crate) fn compute_forces_at(&mut self, time: f64) -> Result<()> {
        self.ensure_not_empty()?;
        let previous_forces: Vec<Axes> = self.particles.iter().map(|particle| particle.force).collect();
        self.zero_forces();
        let outcome = match &self.force_law {
            Some(force_law) => force_law.accumulate_forces(&mut self.particles, time),
            None => self.pairwise_gravity().accumulate_forces(&mut self.particles, time),
        };
        if outcome.is_err() {
            for (particle, force) in self.particles.iter_mut().zip(previous_forces) {
                particle.force = force;
            }
        }
        outcome
    }

    /// Accelerations the active force law produces for an arbitrary phase-space
    /// state, evaluated on a scratch copy of the particles. Fixed particles
    /// report zero acceleration.
    pub fn accelerations_at(&self, time: f64, positions: &[Axes], velocities: &[Axes]) -> Result<Vec<Axes>> {
        let mut scratch = self.particles.clone();
        for ((particle, position), velocity) in scratch.iter_mut().zip(positions).zip(velocities) {
            particle.position = *position;
            particle.velocity = *velocity;
            particle.force = Axes::zero();
        }
        self.with_force_law(|force_law| force_law.accumulate_forces(&mut scratch, time))?;
        Ok(scratch.iter()
                  .map(|particle| if particle.fixed { Axes::zero() } else { particle.acceleration() })
                  .collect())
    }

    ////////////////////////////////////////////////////////////////////////////
    // Integration
    /// Advances the system by `time_step` with the selected scheme and applies
    /// the constraints. Forces are evaluated by the integrator itself; on error
    /// the particles are restored to their state before the call.
    pub fn step(&mut self, time_step: f64, integrator: IntegratorType) -> Result<()> {
        if !(time_step > 0.) || !time_step.is_finite() {
            return Err(DynamicsError::InvalidTimeStep(time_step));
        }
        self.ensure_not_empty()?;
        validate_masses(&self.particles)?;

        let backup = self.particles.clone();
        let outcome = match integrator {
            IntegratorType::Euler => euler::step(self, time_step),
            IntegratorType::Verlet => verlet::step(self, time_step),
            IntegratorType::LeapFrog => leapfrog::step(self, time_step),
            IntegratorType::RungeKutta4 => runge_kutta::step(self, time_step),
            IntegratorType::ExternalOde => ode::step(self, time_step),
        }.and_then(|_| self.enforce_constraints(&backup, self.time + time_step))
         .and_then(|_| self.ensure_finite_state());

        match outcome {
            Ok(()) => {
                self.time += time_step;
                self.last_time_step = time_step;
                self.n_steps += 1;
                Ok(())
            },
            Err(e) => {
                self.particles = backup;
                Err(e)
            },
        }
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<()> {
        if self.particles.is_empty() {
            Err(DynamicsError::EmptySystem)
        } else {
            Ok(())
        }
    }

    fn ensure_finite_state(&self) -> Result<()> {
        for (index, particle) in self.particles.iter().enumerate() {
            if !particle.position.is_finite() || !particle.velocity.is_finite() {
                return Err(DynamicsError::NonFiniteState { index: index });
            }
        }
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////
    // Persistence
    /// Saves the system as JSON when the extension is `.json`, as bincode otherwise.
    /// The force law and the ODE solver are not persisted.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_snapshot(path, self)
    }

    pub fn load(path: &Path) -> Result<System> {
        let mut system: System = read_snapshot(path)?;
        system.reconcile_ids()?;
        Ok(system)
    }
}

impl Clone for System {
    /// Deep copy. The ODE solver workspace is never shared: the clone starts without one.
    fn clone(&self) -> System {
        System {
            name: self.name.clone(),
            particles: self.particles.clone(),
            gravitational_constant: self.gravitational_constant,
            softening: self.softening,
            time: self.time,
            last_time_step: self.last_time_step,
            n_steps: self.n_steps,
            next_id: self.next_id,
            baseline: self.baseline,
            force_law: self.force_law.clone(),
            constraints: self.constraints.clone(),
            ode_solver: None,
        }
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
         .field("name", &self.name)
         .field("particles", &self.particles)
         .field("gravitational_constant", &self.gravitational_constant)
         .field("softening", &self.softening)
         .field("time", &self.time)
         .field("last_time_step", &self.last_time_step)
         .field("n_steps", &self.n_steps)
         .field("force_law", &self.force_law_name())
         .field("constraints", &self.constraint_names())
         .field("ode_solver", &self.ode_solver.as_ref().map(|solver| solver.name().to_string()))
         .finish()
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "System '{}': {} particles, t={} (step {}, dt={}), G={:e}, softening={}, force law: {}",
                 self.name.as_deref().unwrap_or("unnamed"), self.particles.len(), self.time, self.n_steps,
                 self.last_time_step, self.gravitational_constant, self.softening.length(), self.force_law_name())?;
        for particle in self.particles.iter() {
            writeln!(f, "  {}", particle)?;
        }
        Ok(())
    }
}
