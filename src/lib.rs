extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate bincode;
extern crate csv;
extern crate time;

pub mod constants;

mod errors;
pub use self::errors::{DynamicsError, Result};

mod particles;
pub use self::particles::System;
pub use self::particles::Softening;
pub use self::particles::Baseline;
pub use self::particles::Particle;
pub use self::particles::Axes;
pub use self::particles::ForceLaw;
pub use self::particles::ForceFn;
pub use self::particles::PairwiseGravity;
pub use self::particles::Constraint;
pub use self::particles::ConstraintFn;
pub use self::particles::FixedParticles;
pub use self::particles::CenterOfMassFrame;
pub use self::particles::ConservationDrift;

mod integrator;
pub use self::integrator::*;

pub mod tools;
