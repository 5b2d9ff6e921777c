//! Simulation facade used to build and run data center simulations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use dslab_core::context::SimulationContext;
use dslab_core::simulation::Simulation;

use crate::core::config::sim_config::{HostConfig, ResourceConfig};
use crate::core::config::SimulationConfig;
use crate::core::data_center::{DataCenter, PlacementStrategies, SampleDataCenter};
use crate::core::energy_model::energy_model_resolver;
use crate::core::error::{Error, Result};
use crate::core::events::migration::MigrateVm;
use crate::core::events::vm::VmsArrived;
use crate::core::host_controller::{HostController, SampleHost};
use crate::core::machine_controller::machine_controller_resolver;
use crate::core::migration_controller::{EvaluatePlacement, MigrationController};
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategy::PlacementStrategyRegistry;
use crate::core::resource::{PhysicalResource, ResourceVector};
use crate::core::vm::{VmSpec, VmStatus};

const DEFAULT_ENERGY_MODEL: &str = "Constant[power=0]";

/// Builds resource from its config, the energy model is resolved from string.
pub fn resource_from_config(config: &ResourceConfig) -> Result<PhysicalResource> {
    PhysicalResource::new(
        config.category.parse()?,
        config.capacity,
        config.utilization_threshold.unwrap_or(1.),
        energy_model_resolver(config.energy_model.as_deref().unwrap_or(DEFAULT_ENERGY_MODEL))?,
    )
}

pub struct DataCenterSimulation {
    data_center: Rc<RefCell<DataCenter>>,
    data_center_id: u32,
    host_controllers: BTreeMap<u32, Rc<RefCell<HostController>>>,
    migration_controller: Option<Rc<RefCell<MigrationController>>>,
    registry: PlacementStrategyRegistry,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl DataCenterSimulation {
    /// Creates simulation with the default placement strategies registry.
    pub fn new(sim: Simulation, sim_config: SimulationConfig) -> Result<Self> {
        Self::with_registry(sim, sim_config, PlacementStrategyRegistry::default())
    }

    /// Creates simulation, strategies and host controllers are resolved from config strings at this point,
    /// so configuration errors are reported before the simulation starts.
    pub fn with_registry(
        mut sim: Simulation,
        sim_config: SimulationConfig,
        registry: PlacementStrategyRegistry,
    ) -> Result<Self> {
        sim_config.validate()?;
        let strategies = PlacementStrategies {
            initial: registry.resolve(&sim_config.initial_placement)?,
            incremental: registry.resolve(&sim_config.incremental_placement)?,
            fallback: match &sim_config.fallback_placement {
                Some(config_str) => Some(registry.resolve(config_str)?),
                None => None,
            },
        };
        let data_center = rc!(refcell!(DataCenter::new(
            strategies,
            sim_config.sampling_period,
            sim_config.network_throughput,
            sim_config.solver_retry_limit,
            sim.create_context("data_center"),
        )));
        let data_center_id = sim.add_handler("data_center", data_center.clone());
        let mut ctx = sim.create_context("simulation");
        // start energy sampling
        ctx.emit_now(SampleDataCenter {}, data_center_id);

        let mut simulation = Self {
            data_center,
            data_center_id,
            host_controllers: BTreeMap::new(),
            migration_controller: None,
            registry,
            sim,
            ctx,
            sim_config: rc!(sim_config.clone()),
        };
        for host in &sim_config.hosts {
            simulation.add_hosts_from_config(host)?;
        }
        if let Some(migration) = &sim_config.migration {
            simulation.add_migration_controller(migration.sampling_time, &migration.strategy)?;
        }
        Ok(simulation)
    }

    fn add_hosts_from_config(&mut self, config: &HostConfig) -> Result<()> {
        for name in config.host_names()? {
            let resources = config
                .resources
                .iter()
                .map(resource_from_config)
                .collect::<Result<Vec<_>>>()?;
            self.add_host(&name, resources, config.controller())?;
        }
        Ok(())
    }

    /// Adds host with resources controlled by the machine controller resolved from `controller` config string.
    pub fn add_host(&mut self, name: &str, resources: Vec<PhysicalResource>, controller: &str) -> Result<u32> {
        let (policy, options) = machine_controller_resolver(controller)?;
        let sampling_time = options.get_or("sampling_time", self.sim_config.sampling_period)?;
        if !(sampling_time > 0.) {
            return Err(Error::Configuration(format!(
                "sampling_time must be positive, got {} in '{}'",
                sampling_time, controller
            )));
        }
        let host_id = self.data_center.borrow_mut().add_host(name, resources)?;
        let host_controller = rc!(refcell!(HostController::new(
            host_id,
            sampling_time,
            policy,
            self.data_center.clone(),
            self.sim.create_context(name),
        )));
        let component_id = self.sim.add_handler(name, host_controller.clone());
        self.host_controllers.insert(host_id, host_controller);
        // start host sampling
        self.ctx.emit_now(SampleHost {}, component_id);
        Ok(host_id)
    }

    /// Adds migration controller using the strategy resolved from config string.
    pub fn add_migration_controller(&mut self, sampling_time: f64, strategy: &str) -> Result<()> {
        if !(sampling_time > 0.) {
            return Err(Error::Configuration(format!(
                "migration sampling_time must be positive, got {}",
                sampling_time
            )));
        }
        if self.migration_controller.is_some() {
            return Err(Error::Configuration("migration controller is already added".to_string()));
        }
        let strategy = self.registry.resolve(strategy)?;
        let controller = rc!(refcell!(MigrationController::new(
            strategy,
            sampling_time,
            self.data_center.clone(),
            self.sim.create_context("migration_controller"),
        )));
        let id = self.sim.add_handler("migration_controller", controller.clone());
        self.migration_controller = Some(controller);
        self.ctx.emit(EvaluatePlacement {}, id, sampling_time);
        Ok(())
    }

    /// Places the batch of VMs with the initial placement strategy, VMs start immediately.
    pub fn deploy_initial_vms(&mut self, specs: Vec<VmSpec>) -> Result<Vec<u32>> {
        let time = self.ctx.time();
        let mut data_center = self.data_center.borrow_mut();
        let vm_ids = specs
            .into_iter()
            .map(|spec| data_center.create_vm(spec, time))
            .collect::<Result<Vec<_>>>()?;
        data_center.deploy_initial(&vm_ids)?;
        Ok(vm_ids)
    }

    /// Returns the placement of all running VMs.
    pub fn current_placement(&self) -> VirtualMachinesPlacement {
        self.data_center.borrow().current_placement()
    }

    pub fn spawn_vm_now(&mut self, spec: VmSpec) -> Result<u32> {
        self.spawn_vm_with_delay(spec, 0.)
    }

    /// Creates VM arriving after `delay`, it is placed by the incremental placement strategy.
    pub fn spawn_vm_with_delay(&mut self, spec: VmSpec, delay: f64) -> Result<u32> {
        let vm_id = self
            .data_center
            .borrow_mut()
            .create_vm(spec, self.ctx.time() + delay)?;
        self.ctx.emit(VmsArrived { vm_ids: vec![vm_id] }, self.data_center_id, delay);
        Ok(vm_id)
    }

    /// Creates VMs arriving together, they are placed by a single call of the incremental placement strategy.
    pub fn spawn_vms_now(&mut self, specs: Vec<VmSpec>) -> Result<Vec<u32>> {
        let time = self.ctx.time();
        let vm_ids = {
            let mut data_center = self.data_center.borrow_mut();
            specs
                .into_iter()
                .map(|spec| data_center.create_vm(spec, time))
                .collect::<Result<Vec<_>>>()?
        };
        self.ctx.emit_now(
            VmsArrived {
                vm_ids: vm_ids.clone(),
            },
            self.data_center_id,
        );
        Ok(vm_ids)
    }

    /// Sends migration command for the VM to the data center, the command is validated there.
    pub fn migrate_vm_to_host(&mut self, vm_id: u32, target_host: u32) -> Result<()> {
        let from = self
            .vm_location(vm_id)
            .ok_or_else(|| Error::NotFound(format!("vm {}", vm_id)))?;
        self.ctx.emit_now(
            MigrateVm {
                vm_id,
                from,
                to: target_host,
            },
            self.data_center_id,
        );
        Ok(())
    }

    pub fn data_center(&self) -> Rc<RefCell<DataCenter>> {
        self.data_center.clone()
    }

    pub fn host_controller(&self, host_id: u32) -> Option<Rc<RefCell<HostController>>> {
        self.host_controllers.get(&host_id).cloned()
    }

    pub fn migration_controller(&self) -> Option<Rc<RefCell<MigrationController>>> {
        self.migration_controller.clone()
    }

    pub fn registry_mut(&mut self) -> &mut PlacementStrategyRegistry {
        &mut self.registry
    }

    pub fn lookup_host(&self, name: &str) -> Option<u32> {
        self.data_center.borrow().lookup_host(name)
    }

    pub fn vm_location(&self, vm_id: u32) -> Option<u32> {
        self.data_center.borrow().vm_location(vm_id)
    }

    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.data_center.borrow().vm_status(vm_id)
    }

    pub fn vm_shares(&self, vm_id: u32) -> Option<ResourceVector> {
        self.data_center.borrow().vm(vm_id).map(|vm| vm.allocated().clone())
    }

    pub fn total_energy_consumed(&self) -> f64 {
        self.data_center.borrow().total_energy_consumed()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, time: f64) {
        self.sim.step_for_duration(time);
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }
}
