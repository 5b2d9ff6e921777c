//! Proportional share controller.

use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::core::machine_controller::{check_demands, HostView, MachineController};
use crate::core::resource::{ResourceCategory, ResourceVector};

/// Passes demands through while they fit into the effective capacity.
/// Otherwise scales all shares of the overloaded category by `effective_capacity / total_demand`.
#[derive(Default)]
pub struct ProportionalController;

impl ProportionalController {
    pub fn new() -> Self {
        Self {}
    }
}

impl MachineController for ProportionalController {
    fn name(&self) -> &str {
        "Proportional"
    }

    fn allocate(
        &mut self,
        host: &HostView,
        demands: &[(u32, ResourceVector)],
    ) -> Result<BTreeMap<u32, ResourceVector>> {
        check_demands(host, demands)?;

        let mut total_demand: BTreeMap<ResourceCategory, f64> = BTreeMap::new();
        for (_, demand) in demands {
            for (category, amount) in demand.iter() {
                *total_demand.entry(category).or_insert(0.) += amount;
            }
        }

        let mut scale: BTreeMap<ResourceCategory, f64> = BTreeMap::new();
        for (category, total) in total_demand {
            if total <= 0. {
                continue;
            }
            let capacity = host.machine.effective_capacity(category)?;
            if total > capacity {
                scale.insert(category, capacity / total);
            }
        }

        Ok(demands
            .iter()
            .map(|(vm_id, demand)| {
                let shares = demand
                    .iter()
                    .map(|(category, amount)| (category, amount * scale.get(&category).copied().unwrap_or(1.)))
                    .collect();
                (*vm_id, shares)
            })
            .collect())
    }
}
