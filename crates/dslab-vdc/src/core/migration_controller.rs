//! Migration controller.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dslab_core::cast;
use dslab_core::context::SimulationContext;
use dslab_core::event::Event;
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_error, log_info, log_warn};

use crate::core::data_center::DataCenter;
use crate::core::events::migration::MigrateVm;
use crate::core::placement::VirtualMachinesPlacement;
use crate::core::placement_strategy::PlacementStrategy;

#[derive(Serialize)]
pub struct EvaluatePlacement {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MigrationControllerState {
    Idle,
    Evaluating,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MigrationStats {
    pub evaluations: u64,
    pub failed_evaluations: u64,
    pub commands_issued: u64,
}

/// Returns migration commands for VMs whose host differs between the current and target placements.
///
/// VMs missing in the current placement are skipped. Commands follow the order of the target placement.
pub fn diff_placements(current: &VirtualMachinesPlacement, target: &VirtualMachinesPlacement) -> Vec<MigrateVm> {
    target
        .iter()
        .filter_map(|(vm_id, decision)| match current.host_of(vm_id) {
            Some(from) if from != decision.host_id => Some(MigrateVm {
                vm_id,
                from,
                to: decision.host_id,
            }),
            _ => None,
        })
        .collect()
}

/// Periodically computes the target placement of running VMs and sends migration commands to the data center.
///
/// Commands are not tracked after sending, the data center validates and executes them. If the strategy fails,
/// nothing is sent and the current placement is kept.
pub struct MigrationController {
    strategy: Box<dyn PlacementStrategy>,
    sampling_time: f64,
    state: MigrationControllerState,
    stats: MigrationStats,
    data_center: Rc<RefCell<DataCenter>>,
    data_center_id: u32,
    ctx: SimulationContext,
}

impl MigrationController {
    pub fn new(
        strategy: Box<dyn PlacementStrategy>,
        sampling_time: f64,
        data_center: Rc<RefCell<DataCenter>>,
        ctx: SimulationContext,
    ) -> Self {
        let data_center_id = data_center.borrow().id();
        Self {
            strategy,
            sampling_time,
            state: MigrationControllerState::Idle,
            stats: MigrationStats::default(),
            data_center,
            data_center_id,
            ctx,
        }
    }

    pub fn state(&self) -> MigrationControllerState {
        self.state
    }

    pub fn stats(&self) -> &MigrationStats {
        &self.stats
    }

    pub fn sampling_time(&self) -> f64 {
        self.sampling_time
    }

    /// Evaluates placement once and returns the issued commands.
    pub fn evaluate(&mut self) -> Vec<MigrateVm> {
        self.state = MigrationControllerState::Evaluating;
        self.stats.evaluations += 1;

        let (snapshot, requests, current) = {
            let data_center = self.data_center.borrow();
            let (snapshot, requests) = data_center.released_snapshot();
            (snapshot, requests, data_center.current_placement())
        };

        let commands = if requests.is_empty() {
            Vec::new()
        } else {
            match self.strategy.place(&snapshot, &requests) {
                Ok(target) => diff_placements(&current, &target),
                Err(e) => {
                    if e.is_retryable() {
                        log_warn!(self.ctx, "{} failed: {}", self.strategy.name(), e);
                    } else {
                        log_error!(self.ctx, "{} failed: {}", self.strategy.name(), e);
                    }
                    self.stats.failed_evaluations += 1;
                    Vec::new()
                }
            }
        };

        for command in &commands {
            log_debug!(
                self.ctx,
                "migrate vm {} from host {} to host {}",
                command.vm_id,
                command.from,
                command.to
            );
            self.ctx.emit(command.clone(), self.data_center_id, 0.);
        }
        if !commands.is_empty() {
            log_info!(self.ctx, "issued {} migration commands", commands.len());
        }
        self.stats.commands_issued += commands.len() as u64;
        self.state = MigrationControllerState::Idle;
        commands
    }
}

impl EventHandler for MigrationController {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            EvaluatePlacement {} => {
                self.evaluate();
                self.ctx.emit_self(EvaluatePlacement {}, self.sampling_time);
            }
        })
    }
}
