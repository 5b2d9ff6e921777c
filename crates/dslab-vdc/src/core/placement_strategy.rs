//! Virtual machine placement strategies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::config::options::{parse_config_value, ConfigOptions};
use crate::core::error::{Error, Result};
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategies::best_fit::BestFit;
use crate::core::placement_strategies::first_fit::FirstFit;
use crate::core::placement_strategies::optimal::OptimalPlacement;
use crate::core::resource::ResourceVector;
use crate::core::snapshot::DataCenterSnapshot;
use crate::core::solver::service::SolverServiceRegistry;

/// VM to be placed along with its requested resources.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementRequest {
    pub vm_id: u32,
    pub demand: ResourceVector,
}

impl PlacementRequest {
    pub fn new(vm_id: u32, demand: ResourceVector) -> Self {
        Self { vm_id, demand }
    }
}

/// Trait for implementation of VM placement strategies.
///
/// The strategy is defined as a function of the data center snapshot and the list of VMs to place, which returns
/// the placement of all VMs or an error. Partial placements are never returned.
///
/// Strategies are stateless, so the same strategy instance can be used for many decisions.
/// It is possible to implement arbitrary strategy and add it to [`PlacementStrategyRegistry`].
pub trait PlacementStrategy {
    fn name(&self) -> String;

    fn place(&self, snapshot: &DataCenterSnapshot, vms: &[PlacementRequest]) -> Result<VirtualMachinesPlacement>;
}

/// Checks that the reference share penalty lies in [0, 1).
pub fn validate_penalty(penalty: f64) -> Result<f64> {
    if (0. ..1.).contains(&penalty) {
        Ok(penalty)
    } else {
        Err(Error::Configuration(format!(
            "reference share penalty must be in [0, 1), got {}",
            penalty
        )))
    }
}

/// Validates demands of VMs to be placed.
pub fn validate_requests(vms: &[PlacementRequest]) -> Result<()> {
    for vm in vms {
        vm.demand.validate()?;
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////

type StrategyBuilder = Box<dyn Fn(&ConfigOptions, &SolverServiceRegistry) -> Result<Box<dyn PlacementStrategy>>>;

/// Table of placement strategies resolved from config strings like `BestFit[reference_share_penalty=0.1]`.
pub struct PlacementStrategyRegistry {
    builders: BTreeMap<String, StrategyBuilder>,
    solvers: SolverServiceRegistry,
}

impl PlacementStrategyRegistry {
    /// Creates registry without strategies, which uses the given solver services.
    pub fn empty(solvers: SolverServiceRegistry) -> Self {
        Self {
            builders: BTreeMap::new(),
            solvers,
        }
    }

    pub fn register<F>(&mut self, name: &str, builder: F)
    where
        F: Fn(&ConfigOptions, &SolverServiceRegistry) -> Result<Box<dyn PlacementStrategy>> + 'static,
    {
        self.builders.insert(name.to_string(), Box::new(builder));
    }

    pub fn solvers(&self) -> &SolverServiceRegistry {
        &self.solvers
    }

    pub fn solvers_mut(&mut self) -> &mut SolverServiceRegistry {
        &mut self.solvers
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Creates strategy from config string, fails on unknown strategy name or invalid options.
    pub fn resolve(&self, config_str: &str) -> Result<Box<dyn PlacementStrategy>> {
        let (name, options) = parse_config_value(config_str)?;
        match self.builders.get(&name) {
            Some(builder) => builder(&options, &self.solvers),
            None => Err(Error::Configuration(format!("can't resolve placement strategy: {}", config_str))),
        }
    }
}

impl Default for PlacementStrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty(SolverServiceRegistry::default());
        registry.register("FirstFit", |options, _| Ok(Box::new(FirstFit::from_options(options)?)));
        registry.register("BestFit", |options, _| Ok(Box::new(BestFit::from_options(options)?)));
        registry.register("Optimal", |options, solvers| {
            Ok(Box::new(OptimalPlacement::from_options(options, solvers)?))
        });
        registry
    }
}
