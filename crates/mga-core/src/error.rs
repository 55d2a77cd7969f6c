use mga_solver::{ProblemError, SolutionStatus};
use thiserror::Error;

/// Errors that stop an MGA run or reject a model mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MgaError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid slack {0}: must be a finite value >= 0")]
    InvalidSlack(f64),
    #[error("Model has no investment variables")]
    NoInvestmentVariables,
    #[error("Model state error: {0}")]
    ModelState(String),
    #[error("Constraint '{0}' already exists on the model")]
    DuplicateConstraint(String),
    #[error("Baseline solve failed ({status}): {detail}")]
    Systemic { status: SolutionStatus, detail: String },
    #[error("Model error: {0}")]
    Model(ProblemError),
    #[error("Cannot build worker pool: {0}")]
    WorkerPool(String),
}

impl From<ProblemError> for MgaError {
    fn from(err: ProblemError) -> Self {
        match err {
            ProblemError::DuplicateConstraint(name) => MgaError::DuplicateConstraint(name),
            ProblemError::InvalidSense(sense) => {
                MgaError::Configuration(format!("invalid sense '{}', expected 'min' or 'max'", sense))
            }
            other => MgaError::Model(other),
        }
    }
}

/// A non-fatal failure of one alternative solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Target '{target}' (#{position}) failed ({status}): {detail}")]
pub struct SolveFailure {
    pub target: String,
    /// Position of the target in the request
    pub position: usize,
    pub status: SolutionStatus,
    pub detail: String,
}
