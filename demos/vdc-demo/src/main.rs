use std::io::Write;

use clap::Parser;
use env_logger::Builder;
use log::info;
use rand::prelude::*;
use rand_pcg::Pcg64;

use dslab_core::simulation::Simulation;
use dslab_vdc::core::config::SimulationConfig;
use dslab_vdc::core::error::Error;
use dslab_vdc::core::load_model::{ConstantLoadModel, StepLoadModel};
use dslab_vdc::core::resource::{ResourceCategory, ResourceVector};
use dslab_vdc::core::vm::VmSpec;
use dslab_vdc::simulation::DataCenterSimulation;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to simulation config
    #[clap(short, long, default_value = "config.yaml")]
    config: String,

    /// Number of initially deployed VMs
    #[clap(long, default_value_t = 12)]
    initial_vms: u32,

    /// Number of VMs arriving during the simulation
    #[clap(long, default_value_t = 30)]
    arriving_vms: u32,

    /// Simulation duration in seconds
    #[clap(short, long, default_value_t = 600.)]
    duration: f64,

    /// Random seed
    #[clap(short, long, default_value_t = 123)]
    seed: u64,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn random_spec(rng: &mut Pcg64, arriving: bool) -> VmSpec {
    let cpu = rng.gen_range(1..=8) as f64;
    let memory = rng.gen_range(2..=32) as f64;
    let spec = VmSpec::new(
        ResourceVector::new()
            .with(ResourceCategory::Cpu, cpu)
            .with(ResourceCategory::Memory, memory),
    );
    if !arriving {
        return spec.with_load_model(ResourceCategory::Cpu, Box::new(ConstantLoadModel::new(0.8)));
    }
    let switch_time = rng.gen_range(50.0..300.0);
    spec.with_lifetime(rng.gen_range(60.0..400.0)).with_load_model(
        ResourceCategory::Cpu,
        Box::new(StepLoadModel::new(0.5, 1.1, switch_time)),
    )
}

fn main() -> Result<(), Error> {
    init_logger();
    let args = Args::parse();
    let config = SimulationConfig::from_file(&args.config)?;
    let mut sim = DataCenterSimulation::new(Simulation::new(args.seed), config)?;
    let mut rng = Pcg64::seed_from_u64(args.seed);

    let initial = (0..args.initial_vms).map(|_| random_spec(&mut rng, false)).collect();
    let vm_ids = sim.deploy_initial_vms(initial)?;
    info!("deployed {} initial vms", vm_ids.len());
    for _ in 0..args.arriving_vms {
        let delay = rng.gen_range(0.0..args.duration / 2.);
        let spec = random_spec(&mut rng, true);
        sim.spawn_vm_with_delay(spec, delay)?;
    }

    sim.step_for_duration(args.duration);

    let data_center = sim.data_center();
    let data_center = data_center.borrow();
    for host_id in data_center.host_ids() {
        let host = data_center.host(host_id)?;
        info!(
            "host {}: {} vms, cpu utilization {:.2}, energy {:.1}",
            host.name(),
            data_center.host_vms(host_id)?.len(),
            data_center.host_utilization(host_id, ResourceCategory::Cpu)?,
            data_center.host_energy_consumed(host_id)?,
        );
    }
    let stats = data_center.stats();
    info!(
        "time {:.1}: admitted {}, failed {}, finished {}, migrations {}/{}, total energy {:.1}",
        sim.current_time(),
        stats.admitted_vms,
        stats.failed_admissions,
        stats.finished_vms,
        stats.migrations_completed,
        stats.migrations_started,
        data_center.total_energy_consumed(),
    );
    if let Some(controller) = sim.migration_controller() {
        info!("migration controller: {:?}", controller.borrow().stats());
    }
    Ok(())
}
