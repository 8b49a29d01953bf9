//! Error types for fcsmpc.

use thiserror::Error;

use crate::switch::SwitchPosition;

/// Errors that can occur while setting up or solving an MPC problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Converter level count outside the supported set {2, 3}.
    #[error("Converter level count must be 2 or 3, got {0}")]
    InvalidLevelCount(u8),

    /// Prediction horizon of zero steps.
    #[error("Prediction horizon must be at least 1 step, got {0}")]
    InvalidHorizon(usize),

    /// Matrix or vector dimensions do not agree.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Switch position holds a level the converter cannot produce.
    #[error("Switch position {position} is not valid for a {levels}-level converter")]
    InvalidSwitchPosition {
        position: SwitchPosition,
        levels: u8,
    },

    /// Cost weights are negative, non-finite, asymmetric or indefinite.
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    /// Solver configuration does not fit the problem.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stage cost evaluated to NaN or infinity.
    #[error("Non-finite cost at prediction step {step}")]
    NonFiniteCost { step: usize },

    /// No switching sequence satisfies the switching constraints.
    #[error("No switching sequence satisfies the switching constraints")]
    Infeasible,

    /// The lattice reformulation has no positive definite Hessian.
    #[error("Problem matrix is not positive definite: {0}")]
    SingularProblem(String),
}

/// Result type for fcsmpc operations.
pub type Result<T> = std::result::Result<T, Error>;
