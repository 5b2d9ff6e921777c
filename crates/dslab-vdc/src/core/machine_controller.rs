//! Policies apportioning host resources among co-resident VMs.

use std::collections::BTreeMap;

use indexmap::IndexSet;

use crate::core::config::options::{parse_config_value, ConfigOptions};
use crate::core::error::{Error, Result};
use crate::core::machine_controllers::conservative::ConservativeController;
use crate::core::machine_controllers::dummy::DummyController;
use crate::core::machine_controllers::proportional::ProportionalController;
use crate::core::physical_machine::PhysicalMachine;
use crate::core::resource::ResourceVector;

/// Read-only view of a host passed to a machine controller.
pub struct HostView<'a> {
    pub machine: &'a PhysicalMachine,
    /// VMs running on the machine in the order of their admission (including VMs migrating from it).
    pub vms: &'a IndexSet<u32>,
}

/// Trait for implementation of machine controller policies.
///
/// The policy receives current demands of the VMs hosted on the machine, in the order of their admission to the
/// machine, and returns resource shares for each of them.
pub trait MachineController {
    fn name(&self) -> &str;

    fn allocate(&mut self, host: &HostView, demands: &[(u32, ResourceVector)])
        -> Result<BTreeMap<u32, ResourceVector>>;
}

/// Checks that all VMs are hosted on the machine and their demands are valid.
///
/// Zero demand for a category missing on the host is allowed.
pub fn check_demands(host: &HostView, demands: &[(u32, ResourceVector)]) -> Result<()> {
    for (vm_id, demand) in demands {
        if !host.vms.contains(vm_id) {
            return Err(Error::NotControlled {
                vm_id: *vm_id,
                host_id: host.machine.id(),
            });
        }
        demand.validate()?;
        for (category, amount) in demand.iter() {
            if amount > 0. {
                host.machine.resource(category)?;
            }
        }
    }
    Ok(())
}

/// Creates machine controller from config string like `Proportional[sampling_time=5]`.
///
/// The `sampling_time` option is read by the host controller component.
pub fn machine_controller_resolver(config_str: &str) -> Result<(Box<dyn MachineController>, ConfigOptions)> {
    let (name, options) = parse_config_value(config_str)?;
    options.ensure_only(&["sampling_time"])?;
    let controller: Box<dyn MachineController> = match name.as_str() {
        "Dummy" => Box::new(DummyController::new()),
        "Proportional" => Box::new(ProportionalController::new()),
        "Conservative" => Box::new(ConservativeController::new()),
        _ => {
            return Err(Error::Configuration(format!(
                "can't resolve machine controller: {}",
                config_str
            )))
        }
    };
    Ok((controller, options))
}
