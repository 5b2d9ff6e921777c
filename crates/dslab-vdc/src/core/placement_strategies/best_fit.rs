//! Best Fit strategy.

use crate::core::common::CAPACITY_EPSILON;
use crate::core::config::options::ConfigOptions;
use crate::core::error::{Error, Result};
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategy::{validate_penalty, validate_requests, PlacementRequest, PlacementStrategy};
use crate::core::snapshot::DataCenterSnapshot;

/// Uses the admitting host with the least normalized spare capacity left after placing the VM.
///
/// Normalized spare of a host is the sum of spare to effective capacity ratios over the categories demanded by
/// the VM, resources not used by the VM do not affect the choice.
/// Ties are broken in favor of the lower host ID.
pub struct BestFit {
    reference_share_penalty: f64,
}

impl BestFit {
    pub fn new(reference_share_penalty: f64) -> Result<Self> {
        Ok(Self {
            reference_share_penalty: validate_penalty(reference_share_penalty)?,
        })
    }

    pub fn from_options(options: &ConfigOptions) -> Result<Self> {
        options.ensure_only(&["reference_share_penalty"])?;
        Self::new(options.get_or("reference_share_penalty", 0.)?)
    }
}

impl PlacementStrategy for BestFit {
    fn name(&self) -> String {
        format!("BestFit[reference_share_penalty={}]", self.reference_share_penalty)
    }

    fn place(&self, snapshot: &DataCenterSnapshot, vms: &[PlacementRequest]) -> Result<VirtualMachinesPlacement> {
        validate_requests(vms)?;
        let penalty = self.reference_share_penalty;
        let mut state = snapshot.clone();
        let mut placement = VirtualMachinesPlacement::new();
        for vm in vms {
            let mut result: Option<u32> = None;
            let mut min_spare = f64::MAX;

            for (host_id, host) in state.hosts() {
                if !host.admits(&vm.demand, penalty) {
                    continue;
                }
                let mut after = host.clone();
                after.commit(vm.vm_id, &vm.demand);
                let spare = after.normalized_spare(&vm.demand, penalty);
                if spare < min_spare - CAPACITY_EPSILON {
                    min_spare = spare;
                    result = Some(host_id);
                }
            }

            let host_id = result.ok_or(Error::PlacementFailure { vm_id: vm.vm_id })?;
            state.commit(host_id, vm.vm_id, &vm.demand)?;
            placement.assign(vm.vm_id, host_id, vm.demand.clone());
        }
        Ok(placement)
    }
}
