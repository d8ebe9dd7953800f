use super::super::errors::{DynamicsError, Result};
use super::system::{Baseline, System};
use super::Axes;

/// Drift of the conserved quantities with respect to the recorded baseline.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConservationDrift {
    pub energy: f64,   // |E - E0| / |E0| (absolute when E0 == 0)
    pub momentum: f64, // |p - p0| / max(|p0|, sum(m |v|) at baseline) (absolute when both are 0)
}

impl ConservationDrift {
    pub fn within(&self, tolerance: f64) -> bool {
        self.energy <= tolerance && self.momentum <= tolerance
    }
}

impl System {
    pub fn kinetic_energy(&self) -> Result<f64> {
        self.ensure_not_empty()?;
        Ok(self.particles().iter().map(|particle| particle.kinetic_energy()).sum())
    }

    /// Kinetic temperature T = 2 K / (3 N k_B) of the particles that are free
    /// to move, with `boltzmann_constant` in the units of the system.
    /// Zero when every particle is fixed.
    pub fn kinetic_temperature(&self, boltzmann_constant: f64) -> Result<f64> {
        self.ensure_not_empty()?;
        if !(boltzmann_constant > 0.) || !boltzmann_constant.is_finite() {
            return Err(DynamicsError::InvalidParameter { name: "boltzmann_constant", value: boltzmann_constant });
        }
        let mobile = self.particles().iter().filter(|particle| !particle.fixed);
        let (n_mobile, kinetic_energy) = mobile.fold((0usize, 0.), |(n, e_kin), particle| (n + 1, e_kin + particle.kinetic_energy()));
        if n_mobile == 0 {
            return Ok(0.);
        }
        Ok(2. * kinetic_energy / (3. * n_mobile as f64 * boltzmann_constant))
    }

    /// Potential energy of the active force law. For pairwise gravity:
    /// -sum_{i<j} G m_i m_j / sqrt(|r_j - r_i|^2 + eps^2)
    pub fn potential_energy(&self) -> Result<f64> {
        self.ensure_not_empty()?;
        Ok(self.with_force_law(|force_law| force_law.potential_energy(self.particles())))
    }

    pub fn total_energy(&self) -> Result<f64> {
        Ok(self.kinetic_energy()? + self.potential_energy()?)
    }

    pub fn total_momentum(&self) -> Result<Axes> {
        self.ensure_not_empty()?;
        let mut total_momentum = Axes::zero();
        for particle in self.particles().iter() {
            total_momentum += particle.momentum();
        }
        Ok(total_momentum)
    }

    /// Total angular momentum about `reference`: sum m_i (r_i - reference) x v_i
    pub fn total_angular_momentum(&self, reference: Axes) -> Result<Axes> {
        self.ensure_not_empty()?;
        let mut total_angular_momentum = Axes::zero();
        for particle in self.particles().iter() {
            let position = particle.position - reference;
            total_angular_momentum += position.cross(&particle.velocity) * particle.mass;
        }
        Ok(total_angular_momentum)
    }

    /// Mass-weighted position and velocity. Fails if the total mass is not positive.
    pub fn center_of_mass(&self) -> Result<(Axes, Axes)> {
        self.ensure_not_empty()?;
        let mut center_of_mass_position = Axes::zero();
        let mut center_of_mass_velocity = Axes::zero();
        let mut center_of_mass_mass = 0.;
        for particle in self.particles().iter() {
            center_of_mass_position += particle.position * particle.mass;
            center_of_mass_velocity += particle.velocity * particle.mass;
            center_of_mass_mass += particle.mass;
        }
        if !(center_of_mass_mass > 0.) {
            return Err(DynamicsError::InvalidMass { index: 0, mass: center_of_mass_mass });
        }
        Ok((center_of_mass_position / center_of_mass_mass, center_of_mass_velocity / center_of_mass_mass))
    }

    /// Moment of inertia tensor about `origin`: I_ab = sum m (|r|^2 delta_ab - r_a r_b)
    pub fn moment_of_inertia(&self, origin: Axes) -> Result<[[f64; 3]; 3]> {
        self.ensure_not_empty()?;
        let mut inertia = [[0.; 3]; 3];
        for particle in self.particles().iter() {
            let r = (particle.position - origin).as_array();
            let r_2 = r[0]*r[0] + r[1]*r[1] + r[2]*r[2];
            for a in 0..3 {
                for b in 0..3 {
                    let delta = if a == b { r_2 } else { 0. };
                    inertia[a][b] += particle.mass * (delta - r[a]*r[b]);
                }
            }
        }
        Ok(inertia)
    }

    /// Stores the current energy, momentum and angular momentum as the reference
    /// for later conservation checks.
    pub fn record_baseline(&mut self) -> Result<Baseline> {
        let baseline = Baseline {
            time: self.time(),
            total_energy: self.total_energy()?,
            total_momentum: self.total_momentum()?,
            total_angular_momentum: self.total_angular_momentum(Axes::zero())?,
            momentum_scale: self.particles().iter().map(|particle| particle.mass * particle.velocity.norm()).sum(),
        };
        self.set_baseline(baseline);
        Ok(baseline)
    }

    pub fn conservation_drift(&self) -> Result<ConservationDrift> {
        let baseline = *self.baseline().ok_or(DynamicsError::MissingBaseline)?;

        let energy_difference = (self.total_energy()? - baseline.total_energy).abs();
        let energy = if baseline.total_energy != 0. {
            energy_difference / baseline.total_energy.abs()
        } else {
            energy_difference
        };

        let momentum_difference = (self.total_momentum()? - baseline.total_momentum).norm();
        let momentum_scale = baseline.total_momentum.norm().max(baseline.momentum_scale);
        let momentum = if momentum_scale > 0. {
            momentum_difference / momentum_scale
        } else {
            momentum_difference
        };

        Ok(ConservationDrift { energy: energy, momentum: momentum })
    }

    /// `true` when energy and momentum stayed within `tolerance` of the baseline.
    /// A diagnostic signal only: it never stops the simulation.
    pub fn check_conservation(&self, tolerance: f64) -> Result<bool> {
        if !(tolerance >= 0.) {
            return Err(DynamicsError::InvalidParameter { name: "tolerance", value: tolerance });
        }
        Ok(self.conservation_drift()?.within(tolerance))
    }
}
