//! Conservative controller.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::Result;
use crate::core::machine_controller::{check_demands, HostView, MachineController};
use crate::core::resource::ResourceVector;

/// Never reduces previously allocated shares.
///
/// VMs are served in a stable priority order (the order in which they first appeared on the host). Shares of
/// known VMs may only grow into spare capacity up to their demand, a newly admitted VM receives
/// `min(demand, effective_capacity - committed)`, possibly zero. VMs which left the host are forgotten.
#[derive(Default)]
pub struct ConservativeController {
    priority: Vec<u32>,
    allocated: BTreeMap<u32, ResourceVector>,
}

impl ConservativeController {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MachineController for ConservativeController {
    fn name(&self) -> &str {
        "Conservative"
    }

    fn allocate(
        &mut self,
        host: &HostView,
        demands: &[(u32, ResourceVector)],
    ) -> Result<BTreeMap<u32, ResourceVector>> {
        check_demands(host, demands)?;

        let present: BTreeSet<u32> = demands.iter().map(|(vm_id, _)| *vm_id).collect();
        self.priority.retain(|vm_id| present.contains(vm_id));
        self.allocated.retain(|vm_id, _| present.contains(vm_id));
        for (vm_id, _) in demands {
            if !self.priority.contains(vm_id) {
                self.priority.push(*vm_id);
            }
        }
        let demands: BTreeMap<u32, &ResourceVector> =
            demands.iter().map(|(vm_id, demand)| (*vm_id, demand)).collect();

        let mut result: BTreeMap<u32, ResourceVector> = BTreeMap::new();
        for resource in host.machine.resources() {
            let category = resource.category();
            let committed: f64 = self.allocated.values().map(|shares| shares.get(category)).sum();
            let mut available = (resource.effective_capacity() - committed).max(0.);

            for vm_id in &self.priority {
                let demand = demands.get(vm_id).map_or(0., |demand| demand.get(category));
                let share = match self.allocated.get(vm_id) {
                    Some(previous) => {
                        let previous = previous.get(category);
                        let growth = (demand - previous).clamp(0., available);
                        available -= growth;
                        previous + growth
                    }
                    None => {
                        let share = demand.min(available).max(0.);
                        available -= share;
                        share
                    }
                };
                result.entry(*vm_id).or_default().set(category, share);
            }
        }
        for vm_id in &self.priority {
            result.entry(*vm_id).or_default();
        }

        self.allocated = result.clone();
        Ok(result)
    }
}
