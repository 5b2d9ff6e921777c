//! Placement computed by an external optimization solver.

use std::collections::BTreeSet;

use crate::core::common::CAPACITY_EPSILON;
use crate::core::config::options::ConfigOptions;
use crate::core::error::{Error, Result};
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategy::{validate_penalty, validate_requests, PlacementRequest, PlacementStrategy};
use crate::core::snapshot::DataCenterSnapshot;
use crate::core::solver::contract::{SolverRequest, SolverResponse, VmEntry};
use crate::core::solver::params::OptimalSolverParams;
use crate::core::solver::service::{SolverService, SolverServiceRegistry};
use crate::core::solver::status::SolverStatus;

/// Passes the placement problem to a solver service and converts its answer to placement.
///
/// Any status other than normal completion is reported as solver error, the caller decides whether to retry
/// the call or to fall back to a heuristic. Solver answers are checked: every requested VM must be assigned
/// exactly once to a known host which admits it, and the shares reported by the solver must not exceed the VM
/// demand. Otherwise the error with `Unknown` status is returned.
pub struct OptimalPlacement {
    params: OptimalSolverParams,
    reference_share_penalty: f64,
    service: Box<dyn SolverService>,
}

const OPTIONS: [&str; 7] = [
    "reference_share_penalty",
    "category",
    "input_method",
    "solver",
    "proxy",
    "command",
    "args",
];

impl OptimalPlacement {
    pub fn new(
        params: OptimalSolverParams,
        reference_share_penalty: f64,
        service: Box<dyn SolverService>,
    ) -> Result<Self> {
        Ok(Self {
            params,
            reference_share_penalty: validate_penalty(reference_share_penalty)?,
            service,
        })
    }

    /// Resolves solver service for the configured category and proxy.
    pub fn from_options(options: &ConfigOptions, solvers: &SolverServiceRegistry) -> Result<Self> {
        options.ensure_only(&OPTIONS)?;
        let params = OptimalSolverParams::from_options(options)?;
        let service = solvers.resolve(&params, options)?;
        Self::new(params, options.get_or("reference_share_penalty", 0.)?, service)
    }

    pub fn params(&self) -> &OptimalSolverParams {
        &self.params
    }

    fn decode(
        &self,
        response: SolverResponse,
        snapshot: &DataCenterSnapshot,
        vms: &[PlacementRequest],
    ) -> Result<VirtualMachinesPlacement> {
        let malformed = |message: String| Error::solver(SolverStatus::Unknown, message);

        let requested: BTreeSet<u32> = vms.iter().map(|vm| vm.vm_id).collect();
        if response.assignment.len() != vms.len() {
            return Err(malformed(format!(
                "solver assigned {} vms instead of {}",
                response.assignment.len(),
                vms.len()
            )));
        }

        let mut state = snapshot.clone();
        let mut placement = VirtualMachinesPlacement::new();
        for entry in response.assignment {
            if !requested.contains(&entry.vm) || placement.host_of(entry.vm).is_some() {
                return Err(malformed(format!("unexpected or repeated vm {} in assignment", entry.vm)));
            }
            let demand = vms
                .iter()
                .find(|vm| vm.vm_id == entry.vm)
                .map(|vm| &vm.demand)
                .ok_or_else(|| malformed(format!("unexpected vm {} in assignment", entry.vm)))?;
            if state.host(entry.host).is_none() {
                return Err(malformed(format!("unknown host {} in assignment", entry.host)));
            }
            if !state.admits(entry.host, demand, self.reference_share_penalty) {
                return Err(malformed(format!("vm {} does not fit host {}", entry.vm, entry.host)));
            }
            let shares = entry.shares.unwrap_or_else(|| demand.clone());
            shares.validate().map_err(|e| malformed(e.to_string()))?;
            // shares are bounded by the admitted demand, so they fit the host spare capacity
            if let Some((category, amount)) = shares
                .iter()
                .find(|(category, amount)| *amount > demand.get(*category) + CAPACITY_EPSILON)
            {
                return Err(malformed(format!(
                    "vm {} share {} of {} exceeds its demand {}",
                    entry.vm,
                    amount,
                    category,
                    demand.get(category)
                )));
            }
            state.commit(entry.host, entry.vm, demand)?;
            placement.assign(entry.vm, entry.host, shares);
        }
        Ok(placement)
    }
}

impl PlacementStrategy for OptimalPlacement {
    fn name(&self) -> String {
        format!(
            "Optimal[solver={},category={},reference_share_penalty={}]",
            self.params.solver_id, self.params.category, self.reference_share_penalty
        )
    }

    fn place(&self, snapshot: &DataCenterSnapshot, vms: &[PlacementRequest]) -> Result<VirtualMachinesPlacement> {
        validate_requests(vms)?;
        if vms.is_empty() {
            return Ok(VirtualMachinesPlacement::new());
        }
        let entries = vms
            .iter()
            .map(|vm| VmEntry {
                id: vm.vm_id,
                demand: vm.demand.clone(),
            })
            .collect();
        let request = SolverRequest::new(&self.params, self.reference_share_penalty, snapshot, entries);
        let response = self.service.solve(&request)?;
        match response.status() {
            SolverStatus::NormalCompletion => self.decode(response, snapshot, vms),
            status => Err(Error::solver(
                status,
                response
                    .message
                    .unwrap_or_else(|| format!("solver reported '{}'", response.status)),
            )),
        }
    }
}
