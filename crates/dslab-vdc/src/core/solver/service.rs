//! Solver invocation.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::core::config::options::ConfigOptions;
use crate::core::error::{Error, Result};
use crate::core::solver::contract::{SolverRequest, SolverResponse};
use crate::core::solver::params::{OptimalSolverParams, SolverCategory};
use crate::core::solver::status::SolverStatus;

/// Capability of solving placement problems.
///
/// The call is blocking: simulation time does not advance while the solver runs.
/// Implementations return the response as is, mapping of its status is done by the caller.
pub trait SolverService {
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse>;
}

/// Runs the solver proxy program, passes the rendered request to its stdin and reads JSON response from stdout.
///
/// The response is always parsed as JSON. With the AMPL input method the program receives the AMPL script, whose
/// `display` commands print the solution in AMPL format, so the proxy must translate this output into the JSON
/// response format.
pub struct ProcessSolverService {
    program: String,
    args: Vec<String>,
}

impl ProcessSolverService {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Reads options `command` (required) and `args` (space-separated).
    pub fn from_options(options: &ConfigOptions) -> Result<Self> {
        let program: String = options.require("command")?;
        let args = options
            .raw("args")
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(Self::new(&program, args))
    }
}

impl SolverService for ProcessSolverService {
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse> {
        let input = request.render()?;
        let failure = |message: String| Error::solver(SolverStatus::SolverFailure, message);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("can't run {}: {}", self.program, e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| failure(format!("can't write request to {}: {}", self.program, e)))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| failure(format!("{} did not finish: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(failure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        SolverResponse::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

////////////////////////////////////////////////////////////////////////////////

type SolverServiceBuilder = Box<dyn Fn(&OptimalSolverParams, &ConfigOptions) -> Result<Box<dyn SolverService>>>;

/// Table of solver services keyed by solver category and proxy name.
pub struct SolverServiceRegistry {
    builders: BTreeMap<(SolverCategory, String), SolverServiceBuilder>,
}

impl SolverServiceRegistry {
    /// Creates registry without services.
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, category: SolverCategory, proxy: &str, builder: F)
    where
        F: Fn(&OptimalSolverParams, &ConfigOptions) -> Result<Box<dyn SolverService>> + 'static,
    {
        self.builders.insert((category, proxy.to_string()), Box::new(builder));
    }

    /// Creates the service for params, fails if the (category, proxy) combination is not registered.
    pub fn resolve(&self, params: &OptimalSolverParams, options: &ConfigOptions) -> Result<Box<dyn SolverService>> {
        match self.builders.get(&(params.category, params.proxy.clone())) {
            Some(builder) => builder(params, options),
            None => Err(Error::Configuration(format!(
                "no solver proxy '{}' for {} problems",
                params.proxy, params.category
            ))),
        }
    }
}

impl Default for SolverServiceRegistry {
    /// Registers process proxy for MINLP and MILP solvers.
    fn default() -> Self {
        let mut registry = Self::empty();
        for category in [SolverCategory::Minlp, SolverCategory::Milp] {
            registry.register(category, "process", |_, options| {
                Ok(Box::new(ProcessSolverService::from_options(options)?))
            });
        }
        registry
    }
}
