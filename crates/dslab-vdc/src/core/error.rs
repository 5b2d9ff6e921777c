//! Errors reported by placement strategies, controllers and the data center.

use thiserror::Error;

use crate::core::solver::status::SolverStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No host can admit the VM.
    #[error("no host can admit vm {vm_id}")]
    PlacementFailure { vm_id: u32 },

    /// Unknown strategy, controller or solver kind, or malformed configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// External solver finished with a status other than normal completion.
    #[error("solver finished with status '{status}': {message}")]
    Solver { status: SolverStatus, message: String },

    /// Negative or NaN amount, unsupported resource category.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Share is requested for a VM which is not hosted on the controlled machine.
    #[error("vm {vm_id} is not controlled by host {host_id}")]
    NotControlled { vm_id: u32, host_id: u32 },

    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn solver<S: Into<String>>(status: SolverStatus, message: S) -> Self {
        Error::Solver {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the failed operation may succeed when repeated (solver hit an iteration or resource limit).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Solver { status, .. } => status.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
