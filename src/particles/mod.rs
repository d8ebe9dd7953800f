mod particle;
pub mod system;
pub mod forces;
pub mod constraints;
mod diagnostics;
mod axes;

pub use self::particle::Particle;
pub use self::system::{System, Softening, Baseline};
pub use self::forces::{ForceLaw, ForceFn, PairwiseGravity};
pub use self::constraints::{Constraint, ConstraintFn, FixedParticles, CenterOfMassFrame};
pub use self::diagnostics::ConservationDrift;
pub use self::axes::Axes;
