//! Request and response exchanged with the external solver.

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::resource::{ResourceCategory, ResourceVector};
use crate::core::snapshot::DataCenterSnapshot;
use crate::core::solver::ampl::render_ampl;
use crate::core::solver::params::{OptimalSolverParams, SolverCategory, SolverInputMethod};
use crate::core::solver::status::SolverStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostResourceEntry {
    pub category: ResourceCategory,
    pub capacity: f64,
    pub threshold: f64,
    pub committed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostEntry {
    pub id: u32,
    pub resources: Vec<HostResourceEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VmEntry {
    pub id: u32,
    pub demand: ResourceVector,
}

/// Placement problem passed to the solver.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolverRequest {
    pub solver: String,
    pub category: SolverCategory,
    pub input_method: SolverInputMethod,
    pub reference_share_penalty: f64,
    pub hosts: Vec<HostEntry>,
    pub vms: Vec<VmEntry>,
}

impl SolverRequest {
    /// Builds request from the snapshot, hosts are listed in ascending ID order.
    pub fn new(
        params: &OptimalSolverParams,
        reference_share_penalty: f64,
        snapshot: &DataCenterSnapshot,
        vms: Vec<VmEntry>,
    ) -> Self {
        let hosts = snapshot
            .hosts()
            .map(|(id, host)| HostEntry {
                id,
                resources: host
                    .resources
                    .iter()
                    .map(|(category, resource)| HostResourceEntry {
                        category: *category,
                        capacity: resource.capacity,
                        threshold: resource.threshold,
                        committed: resource.committed,
                    })
                    .collect(),
            })
            .collect();
        Self {
            solver: params.solver_id.clone(),
            category: params.category,
            input_method: params.input_method,
            reference_share_penalty,
            hosts,
            vms,
        }
    }

    /// Renders the request in its input method format.
    pub fn render(&self) -> Result<String> {
        match self.input_method {
            SolverInputMethod::Json => serde_json::to_string(self)
                .map_err(|e| Error::solver(SolverStatus::SolverFailure, format!("can't encode request: {}", e))),
            SolverInputMethod::Ampl => Ok(render_ampl(self)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub vm: u32,
    pub host: u32,
    /// Initial shares of the VM, the VM demand is used if absent.
    #[serde(default)]
    pub shares: Option<ResourceVector>,
}

/// Solver response, status is kept as reported and mapped by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverResponse {
    pub status: String,
    #[serde(default)]
    pub assignment: Vec<AssignmentEntry>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SolverResponse {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            Error::solver(
                SolverStatus::SolverFailure,
                format!("can't decode solver response: {}", e),
            )
        })
    }

    pub fn status(&self) -> SolverStatus {
        SolverStatus::from_text(&self.status)
    }
}
