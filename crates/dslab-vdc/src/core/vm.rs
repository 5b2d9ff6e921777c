//! Representations of virtual machine and its status.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::load_model::LoadModel;
use crate::core::resource::{ResourceCategory, ResourceVector};

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    /// VM is created but not assigned to any host yet.
    Pending,
    Running,
    Migrating,
    Finished,
    FailedToAllocate,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Pending => write!(f, "pending"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Migrating => write!(f, "migrating"),
            VmStatus::Finished => write!(f, "finished"),
            VmStatus::FailedToAllocate => write!(f, "failed_to_allocate"),
        }
    }
}

/// Request for a new VM: requested resources, lifetime and load models.
///
/// Categories without an explicit load model are fully loaded (the VM demands all requested amount).
#[derive(Clone, Serialize)]
pub struct VmSpec {
    pub demand: ResourceVector,
    /// VM is destroyed after running for this time, runs until the end of simulation if not set.
    pub lifetime: Option<f64>,
    #[serde(skip)]
    pub load_models: BTreeMap<ResourceCategory, Box<dyn LoadModel>>,
}

impl VmSpec {
    pub fn new(demand: ResourceVector) -> Self {
        Self {
            demand,
            lifetime: None,
            load_models: BTreeMap::new(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: f64) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_load_model(mut self, category: ResourceCategory, load_model: Box<dyn LoadModel>) -> Self {
        self.load_models.insert(category, load_model);
        self
    }
}

/// Represents virtual machine (VM).
///
/// VM consumes resource shares from at most one host at a time. While migrating, the VM keeps running on its
/// source host and has the resources reserved on the target host.
#[derive(Clone)]
pub struct VirtualMachine {
    pub id: u32,
    spec: VmSpec,
    host: Option<u32>,
    migration_target: Option<u32>,
    allocated: ResourceVector,
    status: VmStatus,
    arrival_time: f64,
    start_time: f64,
}

impl VirtualMachine {
    pub fn new(id: u32, spec: VmSpec, arrival_time: f64) -> Self {
        Self {
            id,
            spec,
            host: None,
            migration_target: None,
            allocated: ResourceVector::new(),
            status: VmStatus::Pending,
            arrival_time,
            start_time: -1.,
        }
    }

    /// Returns the requested resource amounts, which are reserved on the host.
    pub fn requested(&self) -> &ResourceVector {
        &self.spec.demand
    }

    /// Returns the current demand computed by applying load models to requested amounts.
    pub fn demand(&self, time: f64) -> ResourceVector {
        let time_from_start = if self.start_time < 0. { 0. } else { time - self.start_time };
        self.spec
            .demand
            .iter()
            .map(|(category, amount)| {
                let load = self
                    .spec
                    .load_models
                    .get(&category)
                    .map_or(1., |model| model.load(time, time_from_start));
                (category, amount * load)
            })
            .collect()
    }

    pub fn lifetime(&self) -> Option<f64> {
        self.spec.lifetime
    }

    pub fn host(&self) -> Option<u32> {
        self.host
    }

    pub fn migration_target(&self) -> Option<u32> {
        self.migration_target
    }

    pub fn allocated(&self) -> &ResourceVector {
        &self.allocated
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Returns true if VM runs on some host (including migrating VMs).
    pub fn is_hosted(&self) -> bool {
        self.host.is_some()
    }

    pub(crate) fn start_on(&mut self, host: u32, shares: ResourceVector, time: f64) {
        self.host = Some(host);
        self.allocated = shares;
        self.status = VmStatus::Running;
        self.start_time = time;
    }

    pub(crate) fn set_allocated(&mut self, shares: ResourceVector) {
        self.allocated = shares;
    }

    pub(crate) fn begin_migration(&mut self, target: u32) {
        self.migration_target = Some(target);
        self.status = VmStatus::Migrating;
    }

    /// Moves VM to the migration target, the time from start is reset.
    pub(crate) fn complete_migration(&mut self, time: f64) {
        if let Some(target) = self.migration_target.take() {
            self.host = Some(target);
            self.status = VmStatus::Running;
            self.start_time = time;
        }
    }
}
