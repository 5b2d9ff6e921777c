//! Placement of virtual machines to hosts.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::resource::ResourceVector;

/// Host selected for a VM and the initial resource shares of the VM on this host.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementDecision {
    pub host_id: u32,
    pub shares: ResourceVector,
}

/// Mapping from VM IDs to placement decisions.
///
/// A new placement is produced for every decision point, consumed by the data center and discarded.
/// Decisions are kept in the order they were made.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VirtualMachinesPlacement {
    decisions: IndexMap<u32, PlacementDecision>,
}

impl VirtualMachinesPlacement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records placement decision, replacing the previous decision for the same VM.
    pub fn assign(&mut self, vm_id: u32, host_id: u32, shares: ResourceVector) {
        self.decisions.insert(vm_id, PlacementDecision { host_id, shares });
    }

    pub fn host_of(&self, vm_id: u32) -> Option<u32> {
        self.decisions.get(&vm_id).map(|decision| decision.host_id)
    }

    pub fn decision(&self, vm_id: u32) -> Option<&PlacementDecision> {
        self.decisions.get(&vm_id)
    }

    /// Iterates over `(vm_id, decision)` pairs in the decision order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PlacementDecision)> {
        self.decisions.iter().map(|(vm_id, decision)| (*vm_id, decision))
    }

    pub fn vm_ids(&self) -> Vec<u32> {
        self.decisions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Returns VM to host mapping ordered by VM ID.
    pub fn hosts_mapping(&self) -> BTreeMap<u32, u32> {
        self.iter().map(|(vm_id, decision)| (vm_id, decision.host_id)).collect()
    }

    /// Sums shares of VMs placed on the specified host.
    pub fn host_shares(&self, host_id: u32) -> ResourceVector {
        let mut total = ResourceVector::new();
        for (_, decision) in self.iter().filter(|(_, decision)| decision.host_id == host_id) {
            total.add(&decision.shares);
        }
        total
    }
}
