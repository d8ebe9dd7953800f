pub const MAX_PARTICLES : usize = 1 << 20; // Upper bound accepted by System::new and add_particle
pub const MIN_RELATIVE_SEPARATION_2 : f64 = 1.0e-20; // Squared (softened) separation, relative to the squared distance of the pair to the origin, below which pairwise gravity is reported as a numerical hazard

//// Adaptive ODE solver defaults (Dormand-Prince 5(4))
pub const ODE_ABSOLUTE_TOLERANCE : f64 = 1.0e-10;
pub const ODE_RELATIVE_TOLERANCE : f64 = 1.0e-10;
pub const ODE_MIN_TIME_STEP : f64 = 1.0e-14;   // Relative to the integration span
pub const ODE_MAX_STEPS : usize = 100_000;     // Per call to integrate
pub const ODE_SAFETY_FACTOR : f64 = 0.9;
pub const ODE_MIN_STEP_FACTOR : f64 = 0.2;     // Maximum decrease of consecutive accepted steps
pub const ODE_MAX_STEP_FACTOR : f64 = 5.0;     // Maximum increase of consecutive accepted steps

//// Physical constants
pub const DEFAULT_GRAVITATIONAL_CONSTANT : f64 = 1.0; // Natural units
pub const BOLTZMANN_CONSTANT_SI : f64 = 1.380649e-23; // J/K, for kinetic temperatures in SI units
pub const TWO_PI : f64 = std::f64::consts::PI * 2.;
