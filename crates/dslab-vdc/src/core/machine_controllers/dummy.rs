//! Dummy controller.

use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::core::machine_controller::{check_demands, HostView, MachineController};
use crate::core::resource::ResourceVector;

/// Allocates exactly the demanded amounts without checking host capacity, so the host may be overcommitted.
#[derive(Default)]
pub struct DummyController;

impl DummyController {
    pub fn new() -> Self {
        Self {}
    }
}

impl MachineController for DummyController {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn allocate(
        &mut self,
        host: &HostView,
        demands: &[(u32, ResourceVector)],
    ) -> Result<BTreeMap<u32, ResourceVector>> {
        check_demands(host, demands)?;
        Ok(demands.iter().cloned().collect())
    }
}
