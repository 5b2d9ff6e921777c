//! Contract with external mathematical programming solvers.

pub mod ampl;
pub mod contract;
pub mod params;
pub mod service;
pub mod status;

pub use contract::{SolverRequest, SolverResponse};
pub use params::{OptimalSolverParams, SolverCategory, SolverInputMethod};
pub use service::{ProcessSolverService, SolverService, SolverServiceRegistry};
pub use status::SolverStatus;
