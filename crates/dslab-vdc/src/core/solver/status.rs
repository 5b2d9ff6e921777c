//! Solver completion status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Closed set of statuses reported by external optimization solvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SolverStatus {
    NormalCompletion,
    IterationLimit,
    ResourceLimit,
    SolverFailure,
    Infeasible,
    Unknown,
}

impl SolverStatus {
    /// Maps textual status reported by a solver to the status value.
    ///
    /// Matching is case-insensitive, underscores and dashes are treated as spaces.
    /// Unrecognized text is mapped to `Unknown`.
    pub fn from_text(text: &str) -> Self {
        let normalized = text.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "normal completion" | "normalcompletion" | "optimal" | "solved" | "locally optimal"
            | "integer optimal" | "success" => SolverStatus::NormalCompletion,
            s if s.contains("infeasible") => SolverStatus::Infeasible,
            s if s.contains("iteration") => SolverStatus::IterationLimit,
            s if s.contains("resource") || s.contains("time limit") || s.contains("memory limit") => {
                SolverStatus::ResourceLimit
            }
            s if s.contains("failure") || s.contains("error") => SolverStatus::SolverFailure,
            _ => SolverStatus::Unknown,
        }
    }

    /// Limit-exceeded statuses, the same request may be solved when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SolverStatus::IterationLimit | SolverStatus::ResourceLimit)
    }
}

impl Display for SolverStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SolverStatus::NormalCompletion => write!(f, "normal_completion"),
            SolverStatus::IterationLimit => write!(f, "iteration_limit"),
            SolverStatus::ResourceLimit => write!(f, "resource_limit"),
            SolverStatus::SolverFailure => write!(f, "solver_failure"),
            SolverStatus::Infeasible => write!(f, "infeasible"),
            SolverStatus::Unknown => write!(f, "unknown"),
        }
    }
}
