//! Parameters of the optimal placement solver.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::core::config::options::ConfigOptions;
use crate::core::error::{Error, Result};

/// Mathematical programming problem class the solver is able to handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverCategory {
    Lp,
    Milp,
    Nlp,
    Minlp,
}

impl FromStr for SolverCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lp" => Ok(SolverCategory::Lp),
            "milp" => Ok(SolverCategory::Milp),
            "nlp" => Ok(SolverCategory::Nlp),
            "minlp" => Ok(SolverCategory::Minlp),
            _ => Err(Error::Configuration(format!("unknown solver category '{}'", s))),
        }
    }
}

impl Display for SolverCategory {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SolverCategory::Lp => write!(f, "lp"),
            SolverCategory::Milp => write!(f, "milp"),
            SolverCategory::Nlp => write!(f, "nlp"),
            SolverCategory::Minlp => write!(f, "minlp"),
        }
    }
}

/// Format in which the problem is passed to the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverInputMethod {
    Json,
    Ampl,
}

impl FromStr for SolverInputMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SolverInputMethod::Json),
            "ampl" => Ok(SolverInputMethod::Ampl),
            _ => Err(Error::Configuration(format!("unknown solver input method '{}'", s))),
        }
    }
}

/// Identifies the solver and the way it is invoked.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimalSolverParams {
    pub category: SolverCategory,
    pub input_method: SolverInputMethod,
    /// Solver name passed to the proxy, e.g. `couenne` or `bonmin`.
    pub solver_id: String,
    /// Name of the proxy (transport) used to call the solver.
    pub proxy: String,
}

impl OptimalSolverParams {
    /// Reads params from options `category`, `input_method`, `solver` and `proxy`.
    pub fn from_options(options: &ConfigOptions) -> Result<Self> {
        Ok(Self {
            category: options.get_or("category", SolverCategory::Minlp)?,
            input_method: options.get_or("input_method", SolverInputMethod::Json)?,
            solver_id: options.get_or("solver", "couenne".to_string())?,
            proxy: options.get_or("proxy", "process".to_string())?,
        })
    }
}

impl Default for OptimalSolverParams {
    fn default() -> Self {
        Self {
            category: SolverCategory::Minlp,
            input_method: SolverInputMethod::Json,
            solver_id: "couenne".to_string(),
            proxy: "process".to_string(),
        }
    }
}
