use std::error::Error;
use std::fmt;
use std::io;
use bincode;
use csv;
use serde_json;

pub type Result<T> = std::result::Result<T, DynamicsError>;

#[derive(Debug)]
pub enum DynamicsError {
    EmptySystem,
    TooManyParticles { requested: usize, maximum: usize },
    AllocationFailed { requested: usize },
    InvalidMass { index: usize, mass: f64 },
    InvalidTimeStep(f64),
    InvalidParameter { name: &'static str, value: f64 },
    IndexOutOfRange { index: usize, len: usize },
    // Near-singular separation between two particles without enough softening
    NumericalHazard { first: usize, second: usize, distance_2: f64 },
    NonFiniteState { index: usize },
    MissingOdeSolver,
    OdeFailure(String),
    MissingBaseline,
    // The history file is shorter than what the recovery snapshot accounts for
    IncompleteHistory { expected_n_bytes: u64, current_n_bytes: u64 },
    Io(io::Error),
    Json(serde_json::Error),
    Bincode(bincode::Error),
    Csv(csv::Error),
}

impl fmt::Display for DynamicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicsError::EmptySystem => write!(f, "the system does not contain any particle"),
            DynamicsError::TooManyParticles { requested, maximum } => {
                write!(f, "{} particles requested but only {} are allowed", requested, maximum)
            },
            DynamicsError::AllocationFailed { requested } => {
                write!(f, "could not allocate storage for {} particles", requested)
            },
            DynamicsError::InvalidMass { index, mass } => {
                write!(f, "particle {} has a non-positive mass ({})", index, mass)
            },
            DynamicsError::InvalidTimeStep(time_step) => {
                write!(f, "time step must be positive and finite (got {})", time_step)
            },
            DynamicsError::InvalidParameter { name, value } => {
                write!(f, "invalid value for {} ({})", name, value)
            },
            DynamicsError::IndexOutOfRange { index, len } => {
                write!(f, "particle index {} is out of range (system has {} particles)", index, len)
            },
            DynamicsError::NumericalHazard { first, second, distance_2 } => {
                write!(f, "particles {} and {} are too close (squared separation {:e}), enable softening", first, second, distance_2)
            },
            DynamicsError::NonFiniteState { index } => {
                write!(f, "particle {} reached a non-finite position or velocity", index)
            },
            DynamicsError::MissingOdeSolver => write!(f, "no ODE solver attached to the system"),
            DynamicsError::OdeFailure(reason) => write!(f, "ODE solver failed: {}", reason),
            DynamicsError::MissingBaseline => write!(f, "no conservation baseline has been recorded"),
            DynamicsError::IncompleteHistory { expected_n_bytes, current_n_bytes } => {
                write!(f, "historic snapshots do not contain all the expected history ({} bytes) as indicated by the recovery snapshot ({} bytes)",
                       current_n_bytes, expected_n_bytes)
            },
            DynamicsError::Io(e) => write!(f, "I/O error: {}", e),
            DynamicsError::Json(e) => write!(f, "JSON error: {}", e),
            DynamicsError::Bincode(e) => write!(f, "binary snapshot error: {}", e),
            DynamicsError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl Error for DynamicsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DynamicsError::Io(e) => Some(e),
            DynamicsError::Json(e) => Some(e),
            DynamicsError::Bincode(e) => Some(e),
            DynamicsError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DynamicsError {
    fn from(e: io::Error) -> Self {
        DynamicsError::Io(e)
    }
}

impl From<serde_json::Error> for DynamicsError {
    fn from(e: serde_json::Error) -> Self {
        DynamicsError::Json(e)
    }
}

impl From<bincode::Error> for DynamicsError {
    fn from(e: bincode::Error) -> Self {
        DynamicsError::Bincode(e)
    }
}

impl From<csv::Error> for DynamicsError {
    fn from(e: csv::Error) -> Self {
        DynamicsError::Csv(e)
    }
}
