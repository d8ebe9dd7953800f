use std::fmt;
use super::Axes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Particle {
    pub id: usize, // Unique identifier, to be set by the system
    pub mass: f64,
    pub position: Axes,
    pub velocity: Axes,
    #[serde(default)]
    pub force: Axes, // Net force, recomputed every step
    #[serde(default)]
    pub charge: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub fixed: bool, // Immobile: integrators never move it
    #[serde(default)]
    pub tag: Option<String>,
}

impl Particle {
    pub fn new(mass: f64, position: Axes, velocity: Axes) -> Particle {
        Particle {
            id: 0,
            mass: mass,
            position: position,
            velocity: velocity,
            force: Axes::zero(),
            charge: 0.,
            radius: 0.,
            fixed: false,
            tag: None,
        }
    }

    pub fn with_charge(mut self, charge: f64) -> Particle {
        self.charge = charge;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Particle {
        self.radius = radius;
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Particle {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn fixed(mut self) -> Particle {
        self.fixed = true;
        self
    }

    /// Acceleration produced by the accumulated force (a = F/m).
    /// Only meaningful for particles with a positive mass.
    pub fn acceleration(&self) -> Axes {
        self.force / self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    pub fn momentum(&self) -> Axes {
        self.velocity * self.mass
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} m={:e} r={} v={} F={}", self.id, self.mass, self.position, self.velocity, self.force)?;
        if self.charge != 0. {
            write!(f, " q={:e}", self.charge)?;
        }
        if self.fixed {
            write!(f, " fixed")?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " [{}]", tag)?;
        }
        Ok(())
    }
}
