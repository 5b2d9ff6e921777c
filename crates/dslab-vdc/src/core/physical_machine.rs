//! Physical machine (host) owning a set of resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::resource::{PhysicalResource, ResourceCategory};

/// Power state of physical machine. Transitions are not validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerStatus {
    PoweredOn,
    PoweredOff,
    Suspended,
}

/// Physical machine exclusively owns its resources, at most one resource per category.
#[derive(Clone)]
pub struct PhysicalMachine {
    id: u32,
    name: String,
    resources: BTreeMap<ResourceCategory, PhysicalResource>,
    pub power_status: PowerStatus,
}

impl PhysicalMachine {
    /// Creates powered on machine without resources.
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            resources: BTreeMap::new(),
            power_status: PowerStatus::PoweredOn,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds resource to the machine, fails if the machine already has a resource of the same category.
    pub fn add_resource(&mut self, resource: PhysicalResource) -> Result<()> {
        let category = resource.category();
        if self.resources.contains_key(&category) {
            return Err(Error::Configuration(format!(
                "host {} already has {} resource",
                self.name, category
            )));
        }
        self.resources.insert(category, resource);
        Ok(())
    }

    pub fn resource(&self, category: ResourceCategory) -> Result<&PhysicalResource> {
        self.resources
            .get(&category)
            .ok_or_else(|| Error::NotFound(format!("{} resource on host {}", category, self.name)))
    }

    pub fn has_resource(&self, category: ResourceCategory) -> bool {
        self.resources.contains_key(&category)
    }

    /// Returns resources ordered by category.
    pub fn resources(&self) -> impl Iterator<Item = &PhysicalResource> {
        self.resources.values()
    }

    pub fn effective_capacity(&self, category: ResourceCategory) -> Result<f64> {
        Ok(self.resource(category)?.effective_capacity())
    }
}
