use rand::prelude::*;
use rand_pcg::Pcg64;

use dslab_vdc::core::error::Error;
use dslab_vdc::core::placement::VirtualMachinesPlacement;
use dslab_vdc::core::placement_strategies::best_fit::BestFit;
use dslab_vdc::core::placement_strategies::first_fit::FirstFit;
use dslab_vdc::core::placement_strategy::{PlacementRequest, PlacementStrategy, PlacementStrategyRegistry};
use dslab_vdc::core::resource::{ResourceCategory, ResourceVector};
use dslab_vdc::core::snapshot::DataCenterSnapshot;

fn cpu_mem(cpu: f64, memory: f64) -> ResourceVector {
    ResourceVector::new()
        .with(ResourceCategory::Cpu, cpu)
        .with(ResourceCategory::Memory, memory)
}

fn snapshot(hosts: &[(f64, f64)]) -> DataCenterSnapshot {
    let mut snapshot = DataCenterSnapshot::new();
    for (id, (cpu, memory)) in hosts.iter().enumerate() {
        snapshot.add_resource(id as u32, ResourceCategory::Cpu, *cpu, 1.);
        snapshot.add_resource(id as u32, ResourceCategory::Memory, *memory, 1.);
    }
    snapshot
}

fn requests(demands: &[(f64, f64)]) -> Vec<PlacementRequest> {
    demands
        .iter()
        .enumerate()
        .map(|(id, (cpu, memory))| PlacementRequest::new(id as u32, cpu_mem(*cpu, *memory)))
        .collect()
}

// Checks that the sum of shares on each host does not exceed its effective capacity.
fn check_capacity(snapshot: &DataCenterSnapshot, placement: &VirtualMachinesPlacement) {
    for (host_id, host) in snapshot.hosts() {
        let shares = placement.host_shares(host_id);
        for (category, resource) in &host.resources {
            assert!(resource.committed + shares.get(*category) <= resource.effective_capacity() + 1e-9);
        }
    }
}

#[test]
// First fit selects the first (by ID) host which admits the VM.
fn test_first_fit() {
    let snapshot = snapshot(&[(4., 4.), (10., 10.), (10., 10.)]);
    let strategy = FirstFit::new(0.).unwrap();
    let placement = strategy.place(&snapshot, &requests(&[(5., 1.), (3., 1.), (6., 6.)])).unwrap();

    assert_eq!(placement.host_of(0), Some(1));
    assert_eq!(placement.host_of(1), Some(0));
    assert_eq!(placement.host_of(2), Some(2));
    assert_eq!(placement.vm_ids(), vec![0, 1, 2]);
    assert_eq!(placement.decision(2).unwrap().shares, cpu_mem(6., 6.));
    check_capacity(&snapshot, &placement);
}

#[test]
// Hosts missing a demanded category are skipped, zero demand for such category is allowed.
fn test_missing_category() {
    let mut snapshot = DataCenterSnapshot::new();
    snapshot.add_resource(0, ResourceCategory::Cpu, 10., 1.);
    snapshot.add_resource(1, ResourceCategory::Cpu, 10., 1.);
    snapshot.add_resource(1, ResourceCategory::Storage, 100., 1.);
    let strategy = FirstFit::new(0.).unwrap();

    let with_storage = PlacementRequest::new(0, ResourceVector::new().with(ResourceCategory::Storage, 10.));
    let zero_storage = PlacementRequest::new(
        1,
        ResourceVector::new()
            .with(ResourceCategory::Cpu, 1.)
            .with(ResourceCategory::Storage, 0.),
    );
    let placement = strategy.place(&snapshot, &[with_storage, zero_storage]).unwrap();
    assert_eq!(placement.host_of(0), Some(1));
    assert_eq!(placement.host_of(1), Some(0));
}

#[test]
// The whole batch fails if some VM can't be placed.
fn test_first_fit_failure() {
    let snapshot = snapshot(&[(4., 4.), (4., 4.)]);
    let strategy = FirstFit::new(0.).unwrap();
    let result = strategy.place(&snapshot, &requests(&[(3., 3.), (3., 3.), (3., 3.)]));
    assert_eq!(result, Err(Error::PlacementFailure { vm_id: 2 }));
}

#[test]
// Identical inputs produce identical placements and capacities are never exceeded.
fn test_first_fit_is_deterministic() {
    let mut rng = Pcg64::seed_from_u64(123);
    let hosts: Vec<(f64, f64)> = (0..20)
        .map(|_| (rng.gen_range(16..=32) as f64, rng.gen_range(32..=64) as f64))
        .collect();
    let demands: Vec<(f64, f64)> = (0..50)
        .map(|_| (rng.gen_range(1..=4) as f64, rng.gen_range(1..=8) as f64))
        .collect();
    let snapshot = snapshot(&hosts);
    let vms = requests(&demands);

    let strategy = FirstFit::new(0.).unwrap();
    let first = strategy.place(&snapshot, &vms).unwrap();
    let second = FirstFit::new(0.).unwrap().place(&snapshot.clone(), &vms).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), vms.len());
    check_capacity(&snapshot, &first);
}

#[test]
// Best fit selects the host with the least spare capacity left after placement.
fn test_best_fit() {
    let mut snapshot = snapshot(&[(10., 10.), (10., 10.), (10., 10.)]);
    snapshot.commit(1, 100, &cpu_mem(6., 6.)).unwrap();
    snapshot.commit(2, 101, &cpu_mem(2., 2.)).unwrap();
    let strategy = BestFit::new(0.).unwrap();

    let placement = strategy.place(&snapshot, &requests(&[(3., 3.)])).unwrap();
    assert_eq!(placement.host_of(0), Some(1));

    // host 1 can't admit the VM anymore
    let placement = strategy.place(&snapshot, &requests(&[(5., 1.)])).unwrap();
    assert_eq!(placement.host_of(0), Some(2));

    // placed VMs are accounted for subsequent VMs of the batch
    let placement = strategy.place(&snapshot, &requests(&[(4., 4.), (4., 4.)])).unwrap();
    assert_eq!(placement.host_of(0), Some(1));
    assert_eq!(placement.host_of(1), Some(2));
    check_capacity(&snapshot, &placement);
}

#[test]
// Hosts with equal spare capacity are tie-broken by ascending ID.
fn test_best_fit_tie_break() {
    let snapshot = snapshot(&[(10., 10.), (10., 10.), (10., 10.)]);
    let strategy = BestFit::new(0.).unwrap();
    let placement = strategy.place(&snapshot, &requests(&[(1., 1.)])).unwrap();
    assert_eq!(placement.host_of(0), Some(0));
}

#[test]
// Resources not demanded by the VM don't make a host look less loaded.
fn test_best_fit_mixed_hosts() {
    let mut snapshot = DataCenterSnapshot::new();
    snapshot.add_resource(0, ResourceCategory::Cpu, 10., 1.);
    snapshot.add_resource(1, ResourceCategory::Cpu, 10., 1.);
    snapshot.add_resource(1, ResourceCategory::Storage, 100., 1.);
    snapshot
        .commit(1, 100, &ResourceVector::new().with(ResourceCategory::Cpu, 8.))
        .unwrap();
    let strategy = BestFit::new(0.).unwrap();

    let vm = [PlacementRequest::new(0, ResourceVector::new().with(ResourceCategory::Cpu, 1.))];
    let placement = strategy.place(&snapshot, &vm).unwrap();
    assert_eq!(placement.host_of(0), Some(1));

    // both hosts have the same spare CPU, the lower ID wins
    snapshot
        .release(1, 100, &ResourceVector::new().with(ResourceCategory::Cpu, 8.))
        .unwrap();
    let placement = strategy.place(&snapshot, &vm).unwrap();
    assert_eq!(placement.host_of(0), Some(0));
}

#[test]
// Best fit never places VM to a host with insufficient capacity and never returns a partial result.
fn test_best_fit_failure() {
    let mut snapshot = snapshot(&[(10., 10.), (10., 10.)]);
    snapshot.commit(0, 100, &cpu_mem(8., 1.)).unwrap();
    snapshot.commit(1, 101, &cpu_mem(1., 8.)).unwrap();
    let strategy = BestFit::new(0.).unwrap();

    let result = strategy.place(&snapshot, &requests(&[(1., 1.), (3., 3.)]));
    assert_eq!(result, Err(Error::PlacementFailure { vm_id: 1 }));
}

#[test]
// The penalty holds back a fraction of effective capacity.
fn test_reference_share_penalty() {
    let mut snapshot = DataCenterSnapshot::new();
    snapshot.add_resource(0, ResourceCategory::Cpu, 10., 0.8);
    snapshot.add_resource(1, ResourceCategory::Cpu, 20., 0.8);
    let vm = [PlacementRequest::new(0, ResourceVector::new().with(ResourceCategory::Cpu, 6.))];

    let placement = FirstFit::new(0.).unwrap().place(&snapshot, &vm).unwrap();
    assert_eq!(placement.host_of(0), Some(0));
    let placement = FirstFit::new(0.5).unwrap().place(&snapshot, &vm).unwrap();
    assert_eq!(placement.host_of(0), Some(1));

    assert!(matches!(FirstFit::new(1.), Err(Error::Configuration(_))));
    assert!(matches!(BestFit::new(-0.1), Err(Error::Configuration(_))));
}

#[test]
fn test_invalid_demands() {
    let snapshot = snapshot(&[(10., 10.)]);
    let negative = [PlacementRequest::new(0, cpu_mem(-1., 1.))];
    let nan = [PlacementRequest::new(0, cpu_mem(f64::NAN, 1.))];
    assert!(matches!(
        FirstFit::new(0.).unwrap().place(&snapshot, &negative),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        BestFit::new(0.).unwrap().place(&snapshot, &nan),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        "network".parse::<ResourceCategory>(),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_registry() {
    let registry = PlacementStrategyRegistry::default();
    assert!(registry.resolve("FirstFit").is_ok());
    let strategy = registry.resolve("BestFit[reference_share_penalty=0.25]").unwrap();
    assert_eq!(strategy.name(), "BestFit[reference_share_penalty=0.25]");

    for config_str in [
        "WorstFit",
        "BestFit[reference_share_penalty=1.5]",
        "BestFit[reference_share_penalty=abc]",
        "BestFit[threshold=0.5]",
        "FirstFit[",
        "Optimal[category=lp,command=solver]",
        "Optimal[proxy=remote,command=solver]",
    ] {
        assert!(
            matches!(registry.resolve(config_str), Err(Error::Configuration(_))),
            "{} should be rejected",
            config_str
        );
    }
}
