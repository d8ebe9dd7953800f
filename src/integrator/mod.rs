pub(crate) mod euler;
pub(crate) mod verlet;
pub(crate) mod leapfrog;
pub(crate) mod runge_kutta;
pub mod ode;
pub mod output;
mod simulation;

pub use self::ode::{OdeSolver, DormandPrince, RightHandSide};
pub use self::simulation::{Simulation, Iteration};

use std::fmt;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IntegratorType {
    Euler,       // Semi-implicit: the position update uses the updated velocity
    Verlet,      // Velocity Verlet, forces evaluated at both ends of the step
    LeapFrog,    // Drift-Kick-Drift
    RungeKutta4,
    ExternalOde, // Delegates to the OdeSolver owned by the system
}

impl IntegratorType {
    pub fn all() -> [IntegratorType; 5] {
        [IntegratorType::Euler, IntegratorType::Verlet, IntegratorType::LeapFrog,
         IntegratorType::RungeKutta4, IntegratorType::ExternalOde]
    }

    /// Order of the local truncation error (adaptive solvers report their embedded order).
    pub fn order(&self) -> usize {
        match self {
            IntegratorType::Euler => 1,
            IntegratorType::Verlet => 2,
            IntegratorType::LeapFrog => 2,
            IntegratorType::RungeKutta4 => 4,
            IntegratorType::ExternalOde => 5,
        }
    }

    pub fn is_symplectic(&self) -> bool {
        match self {
            IntegratorType::Euler | IntegratorType::Verlet | IntegratorType::LeapFrog => true,
            IntegratorType::RungeKutta4 | IntegratorType::ExternalOde => false,
        }
    }
}

impl fmt::Display for IntegratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegratorType::Euler => "Euler",
            IntegratorType::Verlet => "Verlet",
            IntegratorType::LeapFrog => "LeapFrog",
            IntegratorType::RungeKutta4 => "RK4",
            IntegratorType::ExternalOde => "ODE",
        };
        write!(f, "{}", name)
    }
}
