//! Component periodically applying machine controller policy to a host.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dslab_core::cast;
use dslab_core::context::SimulationContext;
use dslab_core::event::Event;
use dslab_core::handler::EventHandler;
use dslab_core::{log_error, log_trace};

use crate::core::data_center::DataCenter;
use crate::core::error::Result;
use crate::core::machine_controller::MachineController;

#[derive(Serialize)]
pub struct SampleHost {}

/// Reads current demands of VMs running on the host, computes their shares with the policy and writes the shares
/// to the data center. Failures are logged, previous shares stay in effect until the next sample.
pub struct HostController {
    host_id: u32,
    sampling_time: f64,
    policy: Box<dyn MachineController>,
    data_center: Rc<RefCell<DataCenter>>,
    ctx: SimulationContext,
}

impl HostController {
    pub fn new(
        host_id: u32,
        sampling_time: f64,
        policy: Box<dyn MachineController>,
        data_center: Rc<RefCell<DataCenter>>,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            host_id,
            sampling_time,
            policy,
            data_center,
            ctx,
        }
    }

    pub fn host_id(&self) -> u32 {
        self.host_id
    }

    pub fn sampling_time(&self) -> f64 {
        self.sampling_time
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Applies the policy once.
    pub fn sample(&mut self) -> Result<()> {
        let shares = {
            let data_center = self.data_center.borrow();
            let demands = data_center.current_demands(self.host_id)?;
            let host = data_center.host_view(self.host_id)?;
            self.policy.allocate(&host, &demands)?
        };
        log_trace!(self.ctx, "host {}: computed shares of {} vms", self.host_id, shares.len());
        self.data_center.borrow_mut().apply_shares(self.host_id, shares)
    }

    fn on_sample(&mut self) {
        if let Err(e) = self.sample() {
            log_error!(self.ctx, "host {}: {} failed: {}", self.host_id, self.policy.name(), e);
        }
        self.ctx.emit_self(SampleHost {}, self.sampling_time);
    }
}

impl EventHandler for HostController {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            SampleHost {} => {
                self.on_sample();
            }
        })
    }
}
