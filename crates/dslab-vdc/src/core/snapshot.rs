//! Data center snapshot used by placement strategies.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::common::CAPACITY_EPSILON;
use crate::core::error::{Error, Result};
use crate::core::resource::{ResourceCategory, ResourceVector};

/// Capacity, utilization threshold and committed amount of a single host resource.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceState {
    pub capacity: f64,
    pub threshold: f64,
    pub committed: f64,
}

impl ResourceState {
    pub fn effective_capacity(&self) -> f64 {
        self.capacity * self.threshold
    }

    /// Returns the amount still available after applying the reference share penalty.
    pub fn spare(&self, penalty: f64) -> f64 {
        self.effective_capacity() * (1. - penalty) - self.committed
    }
}

/// Stores host resources and VMs currently committed to the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HostState {
    pub resources: BTreeMap<ResourceCategory, ResourceState>,
    pub vms: BTreeSet<u32>,
}

impl HostState {
    /// Checks that every positively demanded category exists on the host and has enough spare capacity.
    pub fn admits(&self, demand: &ResourceVector, penalty: f64) -> bool {
        demand.iter().filter(|(_, amount)| *amount > 0.).all(|(category, amount)| {
            self.resources
                .get(&category)
                .map_or(false, |resource| resource.spare(penalty) + CAPACITY_EPSILON >= amount)
        })
    }

    /// Returns the sum of spare to effective capacity ratios over host resources of the positively demanded
    /// categories.
    pub fn normalized_spare(&self, demand: &ResourceVector, penalty: f64) -> f64 {
        demand
            .iter()
            .filter(|(_, amount)| *amount > 0.)
            .filter_map(|(category, _)| self.resources.get(&category))
            .map(|resource| resource.spare(penalty) / resource.effective_capacity())
            .sum()
    }

    pub fn commit(&mut self, vm_id: u32, demand: &ResourceVector) {
        for (category, amount) in demand.iter() {
            if let Some(resource) = self.resources.get_mut(&category) {
                resource.committed += amount;
            }
        }
        self.vms.insert(vm_id);
    }

    pub fn release(&mut self, vm_id: u32, demand: &ResourceVector) {
        if !self.vms.remove(&vm_id) {
            return;
        }
        for (category, amount) in demand.iter() {
            if let Some(resource) = self.resources.get_mut(&category) {
                resource.committed = (resource.committed - amount).max(0.);
            }
        }
    }
}

/// Snapshot of data center hosts with their capacities and commitments.
///
/// Hosts are iterated in ascending ID order, which placement strategies rely on for tie-breaking.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DataCenterSnapshot {
    hosts: BTreeMap<u32, HostState>,
}

impl DataCenterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds host resource, the host is created on the first call.
    pub fn add_resource(&mut self, host_id: u32, category: ResourceCategory, capacity: f64, threshold: f64) {
        self.hosts.entry(host_id).or_default().resources.insert(
            category,
            ResourceState {
                capacity,
                threshold,
                committed: 0.,
            },
        );
    }

    pub fn hosts(&self) -> impl Iterator<Item = (u32, &HostState)> {
        self.hosts.iter().map(|(id, state)| (*id, state))
    }

    pub fn host_ids(&self) -> Vec<u32> {
        self.hosts.keys().copied().collect()
    }

    pub fn host(&self, host_id: u32) -> Option<&HostState> {
        self.hosts.get(&host_id)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn admits(&self, host_id: u32, demand: &ResourceVector, penalty: f64) -> bool {
        self.hosts
            .get(&host_id)
            .map_or(false, |host| host.admits(demand, penalty))
    }

    pub fn commit(&mut self, host_id: u32, vm_id: u32, demand: &ResourceVector) -> Result<()> {
        self.hosts
            .get_mut(&host_id)
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))?
            .commit(vm_id, demand);
        Ok(())
    }

    pub fn release(&mut self, host_id: u32, vm_id: u32, demand: &ResourceVector) -> Result<()> {
        self.hosts
            .get_mut(&host_id)
            .ok_or_else(|| Error::NotFound(format!("host {}", host_id)))?
            .release(vm_id, demand);
        Ok(())
    }
}
