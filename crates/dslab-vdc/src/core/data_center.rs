//! Data center owning hosts and virtual machines.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use serde::Serialize;

use dslab_core::cast;
use dslab_core::context::SimulationContext;
use dslab_core::event::Event;
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_error, log_info, log_warn};

use crate::core::common::IdGenerator;
use crate::core::error::{Error, Result};
use crate::core::events::migration::{MigrateVm, VmMigrationCompleted};
use crate::core::events::vm::{VmLifetimeExpired, VmsArrived};
use crate::core::machine_controller::HostView;
use crate::core::physical_machine::{PhysicalMachine, PowerStatus};
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategy::{PlacementRequest, PlacementStrategy};
use crate::core::resource::{PhysicalResource, ResourceCategory, ResourceVector};
use crate::core::snapshot::DataCenterSnapshot;
use crate::core::stats::{DataCenterStats, EnergyMeter};
use crate::core::vm::{VirtualMachine, VmSpec, VmStatus};

#[derive(Serialize)]
pub struct SampleDataCenter {}

/// Placement strategies used by the data center.
pub struct PlacementStrategies {
    pub initial: Box<dyn PlacementStrategy>,
    pub incremental: Box<dyn PlacementStrategy>,
    pub fallback: Option<Box<dyn PlacementStrategy>>,
}

/// Computes placement with the primary strategy.
///
/// Solver errors with limit-exceeded status are retried up to `retry_limit` times. If the primary strategy still
/// fails with a solver error, the fallback strategy is used when configured.
fn place_with_retries(
    primary: &dyn PlacementStrategy,
    fallback: Option<&dyn PlacementStrategy>,
    retry_limit: u32,
    snapshot: &DataCenterSnapshot,
    requests: &[PlacementRequest],
    ctx: &SimulationContext,
    stats: &mut DataCenterStats,
) -> Result<VirtualMachinesPlacement> {
    let mut attempt = 0;
    loop {
        match primary.place(snapshot, requests) {
            Ok(placement) => return Ok(placement),
            Err(e) if e.is_retryable() && attempt < retry_limit => {
                attempt += 1;
                stats.solver_retries += 1;
                log_warn!(ctx, "{} failed: {}, retry {}/{}", primary.name(), e, attempt, retry_limit);
            }
            Err(e @ Error::Solver { .. }) => match fallback {
                Some(fallback) => {
                    log_warn!(ctx, "{} failed: {}, using {}", primary.name(), e, fallback.name());
                    stats.solver_fallbacks += 1;
                    return fallback.place(snapshot, requests);
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

/// Data center component.
///
/// Owns hosts and VMs, places arriving VMs, executes migration commands and accounts host energy consumption.
/// Resource shares of VMs are written by host controllers via [`DataCenter::apply_shares`].
pub struct DataCenter {
    hosts: BTreeMap<u32, PhysicalMachine>,
    host_names: BTreeMap<String, u32>,
    // VMs running on each host in the order of their admission, migrating VMs stay on the source host
    host_vms: BTreeMap<u32, IndexSet<u32>>,
    vms: BTreeMap<u32, VirtualMachine>,
    retired_vms: BTreeMap<u32, VmStatus>,
    host_ids: IdGenerator,
    vm_ids: IdGenerator,
    strategies: PlacementStrategies,
    energy_meters: BTreeMap<u32, EnergyMeter>,
    stats: DataCenterStats,
    sampling_period: f64,
    network_throughput: f64,
    solver_retry_limit: u32,
    ctx: SimulationContext,
}

impl DataCenter {
    pub fn new(
        strategies: PlacementStrategies,
        sampling_period: f64,
        network_throughput: f64,
        solver_retry_limit: u32,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            hosts: BTreeMap::new(),
            host_names: BTreeMap::new(),
            host_vms: BTreeMap::new(),
            vms: BTreeMap::new(),
            retired_vms: BTreeMap::new(),
            host_ids: IdGenerator::new(),
            vm_ids: IdGenerator::new(),
            strategies,
            energy_meters: BTreeMap::new(),
            stats: DataCenterStats::default(),
            sampling_period,
            network_throughput,
            solver_retry_limit,
            ctx,
        }
    }

    pub fn id(&self) -> u32 {
        self.ctx.id()
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Hosts
    ////////////////////////////////////////////////////////////////////////////////

    /// Adds host with the given resources and returns its ID.
    pub fn add_host(&mut self, name: &str, resources: Vec<PhysicalResource>) -> Result<u32> {
        if self.host_names.contains_key(name) {
            return Err(Error::Configuration(format!("duplicate host name {}", name)));
        }
        if resources.is_empty() {
            return Err(Error::Configuration(format!("host {} has no resources", name)));
        }
        let id = self.host_ids.issued();
        let mut machine = PhysicalMachine::new(id, name);
        for resource in resources {
            machine.add_resource(resource)?;
        }
        let id = self.host_ids.next_id();
        self.hosts.insert(id, machine);
        self.host_names.insert(name.to_string(), id);
        self.host_vms.insert(id, IndexSet::new());
        self.energy_meters.insert(id, EnergyMeter::new());
        self.update_energy(id);
        log_debug!(self.ctx, "added host {} with id {}", name, id);
        Ok(id)
    }

    pub fn host(&self, host_id: u32) -> Result<&PhysicalMachine> {
        self.hosts
            .get(&host_id)
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))
    }

    pub fn host_ids(&self) -> Vec<u32> {
        self.hosts.keys().copied().collect()
    }

    pub fn lookup_host(&self, name: &str) -> Option<u32> {
        self.host_names.get(name).copied()
    }

    pub fn set_power_status(&mut self, host_id: u32, status: PowerStatus) -> Result<()> {
        self.hosts
            .get_mut(&host_id)
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))?
            .power_status = status;
        self.update_energy(host_id);
        Ok(())
    }

    /// Returns VMs running on the host in the order of their admission.
    pub fn host_vms(&self, host_id: u32) -> Result<Vec<u32>> {
        self.host_vms
            .get(&host_id)
            .map(|vms| vms.iter().copied().collect())
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))
    }

    pub fn host_view(&self, host_id: u32) -> Result<HostView> {
        let machine = self.host(host_id)?;
        let vms = self
            .host_vms
            .get(&host_id)
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))?;
        Ok(HostView { machine, vms })
    }

    /// Returns current demands of VMs running on the host in the order of their admission.
    pub fn current_demands(&self, host_id: u32) -> Result<Vec<(u32, ResourceVector)>> {
        let time = self.ctx.time();
        Ok(self
            .host_vms(host_id)?
            .into_iter()
            .filter_map(|vm_id| self.vms.get(&vm_id).map(|vm| (vm_id, vm.demand(time))))
            .collect())
    }

    /// Writes resource shares computed by the host controller.
    pub fn apply_shares(&mut self, host_id: u32, shares: BTreeMap<u32, ResourceVector>) -> Result<()> {
        let host_vms = self
            .host_vms
            .get(&host_id)
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))?;
        if let Some(vm_id) = shares.keys().find(|vm_id| !host_vms.contains(*vm_id)) {
            return Err(Error::NotControlled { vm_id: *vm_id, host_id });
        }
        for (vm_id, vm_shares) in shares {
            if let Some(vm) = self.vms.get_mut(&vm_id) {
                vm.set_allocated(vm_shares);
            }
        }
        Ok(())
    }

    /// Returns sum of resource shares allocated on the host.
    pub fn host_allocated(&self, host_id: u32) -> Result<ResourceVector> {
        let mut total = ResourceVector::new();
        for vm_id in self.host_vms(host_id)? {
            if let Some(vm) = self.vms.get(&vm_id) {
                total.add(vm.allocated());
            }
        }
        Ok(total)
    }

    /// Returns ratio of allocated to total capacity of host resource.
    pub fn host_utilization(&self, host_id: u32, category: ResourceCategory) -> Result<f64> {
        let capacity = self.host(host_id)?.resource(category)?.capacity();
        Ok(self.host_allocated(host_id)?.get(category) / capacity)
    }

    /// Returns current host power consumption, powered off and suspended hosts consume nothing.
    pub fn host_power(&self, host_id: u32) -> Result<f64> {
        let machine = self.host(host_id)?;
        if machine.power_status != PowerStatus::PoweredOn {
            return Ok(0.);
        }
        let allocated = self.host_allocated(host_id)?;
        let time = self.ctx.time();
        Ok(machine
            .resources()
            .map(|resource| {
                let utilization = allocated.get(resource.category()) / resource.capacity();
                resource.energy_model().power(time, utilization)
            })
            .sum())
    }

    fn update_energy(&mut self, host_id: u32) {
        match self.host_power(host_id) {
            Ok(power) => {
                let time = self.ctx.time();
                if let Some(meter) = self.energy_meters.get_mut(&host_id) {
                    meter.update(time, power);
                }
            }
            Err(e) => log_error!(self.ctx, "can't compute power of host {}: {}", host_id, e),
        }
    }

    pub fn host_energy_consumed(&self, host_id: u32) -> Result<f64> {
        self.energy_meters
            .get(&host_id)
            .map(|meter| meter.energy_consumed(self.ctx.time()))
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))
    }

    pub fn total_energy_consumed(&self) -> f64 {
        let time = self.ctx.time();
        self.energy_meters.values().map(|meter| meter.energy_consumed(time)).sum()
    }

    ////////////////////////////////////////////////////////////////////////////////
    // VMs
    ////////////////////////////////////////////////////////////////////////////////

    /// Registers new pending VM arriving at `arrival_time`.
    pub fn create_vm(&mut self, spec: VmSpec, arrival_time: f64) -> Result<u32> {
        spec.demand.validate()?;
        let id = self.vm_ids.next_id();
        self.vms.insert(id, VirtualMachine::new(id, spec, arrival_time));
        Ok(id)
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    /// Returns status of existing or removed VM.
    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.vms
            .get(&vm_id)
            .map(|vm| vm.status())
            .or_else(|| self.retired_vms.get(&vm_id).copied())
    }

    pub fn vm_location(&self, vm_id: u32) -> Option<u32> {
        self.vms.get(&vm_id).and_then(|vm| vm.host())
    }

    pub fn stats(&self) -> &DataCenterStats {
        &self.stats
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Placement
    ////////////////////////////////////////////////////////////////////////////////

    /// Builds snapshot of hosts, VM requested amounts are committed to their hosts and migration targets.
    pub fn snapshot(&self) -> DataCenterSnapshot {
        let mut snapshot = DataCenterSnapshot::new();
        for (host_id, machine) in &self.hosts {
            for resource in machine.resources() {
                snapshot.add_resource(
                    *host_id,
                    resource.category(),
                    resource.capacity(),
                    resource.utilization_threshold(),
                );
            }
        }
        for vm in self.vms.values() {
            for host_id in vm.host().into_iter().chain(vm.migration_target()) {
                // hosts are never removed, so commit can't fail here
                let _ = snapshot.commit(host_id, vm.id, vm.requested());
            }
        }
        snapshot
    }

    /// Returns running VMs which are not migrating, ordered by ID.
    pub fn movable_vms(&self) -> Vec<PlacementRequest> {
        self.vms
            .values()
            .filter(|vm| vm.status() == VmStatus::Running)
            .map(|vm| PlacementRequest::new(vm.id, vm.requested().clone()))
            .collect()
    }

    /// Returns snapshot in which movable VMs are released from their hosts along with these VMs.
    pub fn released_snapshot(&self) -> (DataCenterSnapshot, Vec<PlacementRequest>) {
        let mut snapshot = self.snapshot();
        let movable = self.movable_vms();
        for request in &movable {
            if let Some(host_id) = self.vm_location(request.vm_id) {
                let _ = snapshot.release(host_id, request.vm_id, &request.demand);
            }
        }
        (snapshot, movable)
    }

    /// Returns placement of running VMs with their current shares.
    pub fn current_placement(&self) -> VirtualMachinesPlacement {
        let mut placement = VirtualMachinesPlacement::new();
        for vm in self.vms.values() {
            if let Some(host_id) = vm.host() {
                placement.assign(vm.id, host_id, vm.allocated().clone());
            }
        }
        placement
    }

    fn pending_requests(&self, vm_ids: &[u32]) -> Vec<PlacementRequest> {
        vm_ids
            .iter()
            .filter_map(|vm_id| self.vms.get(vm_id))
            .filter(|vm| vm.status() == VmStatus::Pending)
            .map(|vm| PlacementRequest::new(vm.id, vm.requested().clone()))
            .collect()
    }

    /// Places batch of pending VMs using the initial placement strategy.
    ///
    /// On failure VMs are marked as failed to allocate and removed, the error is returned to the caller.
    pub fn deploy_initial(&mut self, vm_ids: &[u32]) -> Result<VirtualMachinesPlacement> {
        let requests = self.pending_requests(vm_ids);
        let snapshot = self.snapshot();
        let result = place_with_retries(
            self.strategies.initial.as_ref(),
            self.strategies.fallback.as_deref(),
            self.solver_retry_limit,
            &snapshot,
            &requests,
            &self.ctx,
            &mut self.stats,
        );
        match result {
            Ok(placement) => {
                log_info!(self.ctx, "initial placement of {} vms computed", placement.len());
                self.apply_placement(&placement);
                Ok(placement)
            }
            Err(e) => {
                log_error!(self.ctx, "initial placement failed: {}", e);
                self.reject_vms(&requests);
                Err(e)
            }
        }
    }

    fn on_vms_arrived(&mut self, vm_ids: Vec<u32>) {
        let requests = self.pending_requests(&vm_ids);
        if requests.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        let result = place_with_retries(
            self.strategies.incremental.as_ref(),
            self.strategies.fallback.as_deref(),
            self.solver_retry_limit,
            &snapshot,
            &requests,
            &self.ctx,
            &mut self.stats,
        );
        match result {
            Ok(placement) => self.apply_placement(&placement),
            Err(e) => {
                log_warn!(self.ctx, "failed to place {} arrived vms: {}", requests.len(), e);
                self.reject_vms(&requests);
            }
        }
    }

    fn reject_vms(&mut self, requests: &[PlacementRequest]) {
        for request in requests {
            if self.vms.remove(&request.vm_id).is_some() {
                self.retired_vms.insert(request.vm_id, VmStatus::FailedToAllocate);
                self.stats.failed_admissions += 1;
            }
        }
    }

    fn apply_placement(&mut self, placement: &VirtualMachinesPlacement) {
        let time = self.ctx.time();
        for (vm_id, decision) in placement.iter() {
            let lifetime = match self.vms.get_mut(&vm_id) {
                Some(vm) => {
                    vm.start_on(decision.host_id, decision.shares.clone(), time);
                    vm.lifetime()
                }
                None => continue,
            };
            if let Some(vms) = self.host_vms.get_mut(&decision.host_id) {
                vms.insert(vm_id);
            }
            if let Some(host) = self.hosts.get_mut(&decision.host_id) {
                host.power_status = PowerStatus::PoweredOn;
            }
            self.update_energy(decision.host_id);
            if let Some(lifetime) = lifetime {
                self.ctx.emit_self(VmLifetimeExpired { vm_id }, lifetime);
            }
            self.stats.admitted_vms += 1;
            log_debug!(self.ctx, "vm {} started on host {}", vm_id, decision.host_id);
        }
    }

    fn on_vm_lifetime_expired(&mut self, vm_id: u32) {
        let vm = match self.vms.remove(&vm_id) {
            Some(vm) => vm,
            None => return,
        };
        if let Some(host_id) = vm.host() {
            if let Some(vms) = self.host_vms.get_mut(&host_id) {
                vms.shift_remove(&vm_id);
            }
            self.update_energy(host_id);
        }
        self.retired_vms.insert(vm_id, VmStatus::Finished);
        self.stats.finished_vms += 1;
        log_debug!(self.ctx, "vm {} finished", vm_id);
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Migration
    ////////////////////////////////////////////////////////////////////////////////

    /// Checks that the VM can be migrated between hosts.
    fn check_migration(&self, vm_id: u32, from: u32, to: u32) -> Result<&VirtualMachine> {
        let vm = self
            .vms
            .get(&vm_id)
            .ok_or_else(|| Error::NotFound(format!("vm {}", vm_id)))?;
        if vm.status() != VmStatus::Running {
            return Err(Error::InvalidInput(format!("vm {} is {}", vm_id, vm.status())));
        }
        if vm.host() != Some(from) || from == to {
            return Err(Error::InvalidInput(format!("vm {} can't be moved from host {} to {}", vm_id, from, to)));
        }
        if !self.snapshot().admits(to, vm.requested(), 0.) {
            return Err(Error::PlacementFailure { vm_id });
        }
        Ok(vm)
    }

    fn on_migrate_vm(&mut self, vm_id: u32, from: u32, to: u32) {
        let duration = match self.check_migration(vm_id, from, to) {
            Ok(vm) => vm.requested().get(ResourceCategory::Memory) / self.network_throughput,
            Err(e) => {
                log_warn!(self.ctx, "migration of vm {} rejected: {}", vm_id, e);
                self.stats.migrations_rejected += 1;
                return;
            }
        };
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.begin_migration(to);
        }
        if let Some(host) = self.hosts.get_mut(&to) {
            host.power_status = PowerStatus::PoweredOn;
        }
        self.update_energy(to);
        self.stats.migrations_started += 1;
        log_debug!(self.ctx, "vm {} migrates from host {} to host {} for {}", vm_id, from, to, duration);
        self.ctx.emit_self(VmMigrationCompleted { vm_id, from, to }, duration);
    }

    fn on_migration_completed(&mut self, vm_id: u32, from: u32, to: u32) {
        let time = self.ctx.time();
        match self.vms.get_mut(&vm_id) {
            Some(vm) if vm.migration_target() == Some(to) => vm.complete_migration(time),
            _ => return,
        }
        if let Some(vms) = self.host_vms.get_mut(&from) {
            vms.shift_remove(&vm_id);
        }
        if let Some(vms) = self.host_vms.get_mut(&to) {
            vms.insert(vm_id);
        }
        self.update_energy(from);
        self.update_energy(to);
        self.stats.migrations_completed += 1;
        log_debug!(self.ctx, "vm {} migrated from host {} to host {}", vm_id, from, to);
    }

    fn on_sample(&mut self) {
        for host_id in self.host_ids() {
            self.update_energy(host_id);
        }
        self.ctx.emit_self(SampleDataCenter {}, self.sampling_period);
    }
}

impl EventHandler for DataCenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmsArrived { vm_ids } => {
                self.on_vms_arrived(vm_ids);
            }
            VmLifetimeExpired { vm_id } => {
                self.on_vm_lifetime_expired(vm_id);
            }
            MigrateVm { vm_id, from, to } => {
                self.on_migrate_vm(vm_id, from, to);
            }
            VmMigrationCompleted { vm_id, from, to } => {
                self.on_migration_completed(vm_id, from, to);
            }
            SampleDataCenter {} => {
                self.on_sample();
            }
        })
    }
}
