//! First Fit strategy.

use crate::core::config::options::ConfigOptions;
use crate::core::error::{Error, Result};
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategy::{validate_penalty, validate_requests, PlacementRequest, PlacementStrategy};
use crate::core::snapshot::DataCenterSnapshot;

/// Places each VM to the first (by ID) host which admits it.
pub struct FirstFit {
    reference_share_penalty: f64,
}

impl FirstFit {
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

impl PlacementStrategy for FirstFit {
    fn name(&self) -> String {
        format!("FirstFit[reference_share_penalty={}]", self.reference_share_penalty)
    }

    fn place(&self, snapshot: &DataCenterSnapshot, vms: &[PlacementRequest]) -> Result<VirtualMachinesPlacement> {
        validate_requests(vms)?;
        let mut state = snapshot.clone();
        let mut placement = VirtualMachinesPlacement::new();
        for vm in vms {
            let host_id = state
                .hosts()
                .find(|(_, host)| host.admits(&vm.demand, self.reference_share_penalty))
                .map(|(id, _)| id)
                .ok_or(Error::PlacementFailure { vm_id: vm.vm_id })?;
            state.commit(host_id, vm.vm_id, &vm.demand)?;
            placement.assign(vm.vm_id, host_id, vm.demand.clone());
        }
        Ok(placement)
    }
}
