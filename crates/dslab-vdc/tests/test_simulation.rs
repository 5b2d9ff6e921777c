use approx::assert_relative_eq;

use dslab_core::simulation::Simulation;

use dslab_vdc::core::config::SimulationConfig;
use dslab_vdc::core::error::Error;
use dslab_vdc::core::load_model::ConstantLoadModel;
use dslab_vdc::core::resource::{ResourceCategory, ResourceVector};
use dslab_vdc::core::vm::{VmSpec, VmStatus};
use dslab_vdc::simulation::DataCenterSimulation;

fn simulation(config: &str) -> DataCenterSimulation {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SimulationConfig::from_file(config).unwrap();
    DataCenterSimulation::new(Simulation::new(123), config).unwrap()
}

fn cpu_spec(cpu: f64) -> VmSpec {
    VmSpec::new(ResourceVector::new().with(ResourceCategory::Cpu, cpu))
}

#[test]
fn test_hosts_from_config() {
    let sim = simulation("test-configs/config.yaml");
    assert_eq!(sim.lookup_host("h1"), Some(0));
    assert_eq!(sim.lookup_host("h2"), Some(1));
    assert_eq!(sim.lookup_host("h3"), None);
    assert!(sim.host_controller(0).is_some());
    assert!(sim.migration_controller().is_none());

    let data_center = sim.data_center();
    let data_center = data_center.borrow();
    let host = data_center.host(1).unwrap();
    assert_eq!(host.name(), "h2");
    assert_eq!(host.resource(ResourceCategory::Cpu).unwrap().effective_capacity(), 9.);
}

#[test]
// Initial VMs are placed by first fit, arriving VMs by best fit.
fn test_vm_lifecycle() {
    let mut sim = simulation("test-configs/config.yaml");
    let initial = sim.deploy_initial_vms(vec![cpu_spec(4.)]).unwrap();
    assert_eq!(sim.vm_location(initial[0]), Some(0));
    assert_eq!(sim.vm_status(initial[0]), Some(VmStatus::Running));

    let vm = sim.spawn_vm_now(cpu_spec(3.).with_lifetime(5.)).unwrap();
    assert_eq!(sim.vm_status(vm), Some(VmStatus::Pending));
    sim.step_for_duration(1.);
    assert_eq!(sim.vm_location(vm), Some(0));
    assert_eq!(sim.current_placement().len(), 2);

    sim.step_for_duration(5.);
    assert_eq!(sim.vm_status(vm), Some(VmStatus::Finished));
    assert_eq!(sim.vm_location(vm), None);
    assert_eq!(sim.data_center().borrow().host_vms(0).unwrap(), initial);

    let stats = sim.data_center().borrow().stats().clone();
    assert_eq!(stats.admitted_vms, 2);
    assert_eq!(stats.finished_vms, 1);
}

#[test]
// VM which does not fit anywhere is rejected, other VMs are unaffected.
fn test_failed_admission() {
    let mut sim = simulation("test-configs/config.yaml");
    let vms = sim.spawn_vms_now(vec![cpu_spec(20.)]).unwrap();
    let other = sim.spawn_vm_with_delay(cpu_spec(2.), 1.).unwrap();
    sim.step_for_duration(2.);

    assert_eq!(sim.vm_status(vms[0]), Some(VmStatus::FailedToAllocate));
    assert_eq!(sim.vm_status(other), Some(VmStatus::Running));
    assert_eq!(sim.data_center().borrow().stats().failed_admissions, 1);

    assert!(sim.deploy_initial_vms(vec![cpu_spec(5.), cpu_spec(5.), cpu_spec(5.)]).is_err());
    assert_eq!(sim.data_center().borrow().stats().failed_admissions, 4);
}

#[test]
// Each host consumes 10 W regardless of load.
fn test_constant_energy() {
    let mut sim = simulation("test-configs/config.yaml");
    sim.step_for_duration(10.);
    assert_eq!(sim.current_time(), 10.);
    assert_relative_eq!(sim.total_energy_consumed(), 200., epsilon = 1e-9);
    assert_relative_eq!(sim.data_center().borrow().host_power(0).unwrap(), 10.);
}

#[test]
// The host with a VM using half of its CPU consumes 150 W.
fn test_linear_energy() {
    let mut sim = simulation("test-configs/config_energy.yaml");
    sim.deploy_initial_vms(vec![cpu_spec(5.)]).unwrap();
    sim.step_for_duration(10.);
    assert_relative_eq!(sim.total_energy_consumed(), 1500., epsilon = 1e-9);
    let host = sim.lookup_host("h").unwrap();
    assert_relative_eq!(sim.data_center().borrow().host_utilization(host, ResourceCategory::Cpu).unwrap(), 0.5);
}

#[test]
// Both VMs demand 120% of requested CPU, so the total demand 10.8 exceeds effective capacity 9.
// Proportional controller scales shares back to 4.5.
fn test_proportional_shares() {
    let mut sim = simulation("test-configs/config.yaml");
    let spec = cpu_spec(4.5).with_load_model(ResourceCategory::Cpu, Box::new(ConstantLoadModel::new(1.2)));
    let vms = sim.deploy_initial_vms(vec![spec.clone(), spec]).unwrap();
    assert_eq!(sim.vm_location(vms[0]), Some(0));
    assert_eq!(sim.vm_location(vms[1]), Some(0));

    sim.step_for_duration(1.);
    for vm in vms {
        assert_relative_eq!(sim.vm_shares(vm).unwrap().get(ResourceCategory::Cpu), 4.5, epsilon = 1e-9);
    }
}

#[test]
fn test_invalid_configs() {
    let config = SimulationConfig::from_file("test-configs/config_unknown_controller.yaml").unwrap();
    assert!(matches!(
        DataCenterSimulation::new(Simulation::new(123), config),
        Err(Error::Configuration(_))
    ));

    let config = SimulationConfig::from_file("test-configs/config_network.yaml").unwrap();
    assert!(matches!(
        DataCenterSimulation::new(Simulation::new(123), config),
        Err(Error::InvalidInput(_))
    ));

    let mut config = SimulationConfig::from_file("test-configs/config.yaml").unwrap();
    config.initial_placement = "WorstFit".to_string();
    assert!(matches!(
        DataCenterSimulation::new(Simulation::new(123), config),
        Err(Error::Configuration(_))
    ));

    assert!(matches!(
        SimulationConfig::from_file("test-configs/missing.yaml"),
        Err(Error::Configuration(_))
    ));
}
