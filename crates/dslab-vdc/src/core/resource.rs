//! Resource model: resource categories, per-category amounts and physical resources.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::energy_model::EnergyModel;
use crate::core::error::{Error, Result};

/// Category of a capacity-bearing resource.
///
/// Network resources are not modeled, so `"network"` (and any other name) is rejected when parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceCategory {
    Cpu,
    Memory,
    Storage,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 3] = [ResourceCategory::Cpu, ResourceCategory::Memory, ResourceCategory::Storage];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceCategory::Cpu => "cpu",
            ResourceCategory::Memory => "memory",
            ResourceCategory::Storage => "storage",
        }
    }
}

impl Display for ResourceCategory {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ResourceCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(ResourceCategory::Cpu),
            "memory" => Ok(ResourceCategory::Memory),
            "storage" => Ok(ResourceCategory::Storage),
            "network" => Err(Error::InvalidInput("network resources are not supported".to_string())),
            other => Err(Error::InvalidInput(format!("unknown resource category '{}'", other))),
        }
    }
}

impl TryFrom<String> for ResourceCategory {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceCategory> for String {
    fn from(category: ResourceCategory) -> Self {
        category.name().to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Amounts of resources keyed by category, used for VM demands and allocated shares.
///
/// Missing categories are treated as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector {
    amounts: BTreeMap<ResourceCategory, f64>,
}

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, category: ResourceCategory, amount: f64) -> Self {
        self.set(category, amount);
        self
    }

    pub fn get(&self, category: ResourceCategory) -> f64 {
        self.amounts.get(&category).copied().unwrap_or(0.)
    }

    pub fn set(&mut self, category: ResourceCategory, amount: f64) {
        self.amounts.insert(category, amount);
    }

    pub fn add(&mut self, other: &ResourceVector) {
        for (category, amount) in other.iter() {
            *self.amounts.entry(category).or_insert(0.) += amount;
        }
    }

    pub fn subtract(&mut self, other: &ResourceVector) {
        for (category, amount) in other.iter() {
            *self.amounts.entry(category).or_insert(0.) -= amount;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceCategory, f64)> + '_ {
        self.amounts.iter().map(|(category, amount)| (*category, *amount))
    }

    pub fn categories(&self) -> impl Iterator<Item = ResourceCategory> + '_ {
        self.amounts.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Checks that every amount is a finite non-negative number.
    pub fn validate(&self) -> Result<()> {
        for (category, amount) in self.iter() {
            if amount.is_nan() || amount < 0. || amount.is_infinite() {
                return Err(Error::InvalidInput(format!(
                    "{} amount must be finite and non-negative, got {}",
                    category, amount
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(ResourceCategory, f64)> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = (ResourceCategory, f64)>>(iter: I) -> Self {
        Self {
            amounts: iter.into_iter().collect(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Capacity-bearing resource of a physical machine.
///
/// The usable (effective) capacity of the resource is `capacity * utilization_threshold`.
/// The attached energy model is not used here, it is consumed by the data center to account host energy.
#[derive(Clone)]
pub struct PhysicalResource {
    category: ResourceCategory,
    capacity: f64,
    utilization_threshold: f64,
    energy_model: Box<dyn EnergyModel>,
}

impl PhysicalResource {
    /// Creates resource, `capacity` must be positive and `utilization_threshold` must lie in (0, 1].
    pub fn new(
        category: ResourceCategory,
        capacity: f64,
        utilization_threshold: f64,
        energy_model: Box<dyn EnergyModel>,
    ) -> Result<Self> {
        if !(capacity > 0.) || capacity.is_infinite() {
            return Err(Error::Configuration(format!(
                "{} capacity must be positive, got {}",
                category, capacity
            )));
        }
        if !(utilization_threshold > 0. && utilization_threshold <= 1.) {
            return Err(Error::Configuration(format!(
                "{} utilization threshold must be in (0, 1], got {}",
                category, utilization_threshold
            )));
        }
        Ok(Self {
            category,
            capacity,
            utilization_threshold,
            energy_model,
        })
    }

    pub fn category(&self) -> ResourceCategory {
        self.category
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn utilization_threshold(&self) -> f64 {
        self.utilization_threshold
    }

    pub fn effective_capacity(&self) -> f64 {
        self.capacity * self.utilization_threshold
    }

    pub fn energy_model(&self) -> &dyn EnergyModel {
        self.energy_model.as_ref()
    }
}
