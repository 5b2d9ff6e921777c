use std::cell::RefCell;
use std::rc::Rc;

use dslab_core::simulation::Simulation;

use dslab_vdc::core::config::SimulationConfig;
use dslab_vdc::core::error::{Error, Result};
use dslab_vdc::core::placement_strategies::optimal::OptimalPlacement;
use dslab_vdc::core::placement_strategy::{PlacementRequest, PlacementStrategy, PlacementStrategyRegistry};
use dslab_vdc::core::resource::{ResourceCategory, ResourceVector};
use dslab_vdc::core::snapshot::DataCenterSnapshot;
use dslab_vdc::core::solver::contract::AssignmentEntry;
use dslab_vdc::core::solver::{
    OptimalSolverParams, SolverCategory, SolverRequest, SolverResponse, SolverService, SolverStatus,
};
use dslab_vdc::core::vm::{VmSpec, VmStatus};
use dslab_vdc::simulation::DataCenterSimulation;

/// Returns canned responses and records received requests.
#[derive(Clone, Default)]
struct StubSolver {
    responses: Rc<RefCell<Vec<SolverResponse>>>,
    requests: Rc<RefCell<Vec<SolverRequest>>>,
}

impl StubSolver {
    fn new(responses: Vec<SolverResponse>) -> Self {
        Self {
            responses: Rc::new(RefCell::new(responses)),
            requests: Rc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl SolverService for StubSolver {
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse> {
        self.requests.borrow_mut().push(request.clone());
        let mut responses = self.responses.borrow_mut();
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            responses
                .first()
                .cloned()
                .ok_or_else(|| Error::solver(SolverStatus::SolverFailure, "no response"))
        }
    }
}

fn response(status: &str, assignment: &[(u32, u32)]) -> SolverResponse {
    SolverResponse {
        status: status.to_string(),
        assignment: assignment
            .iter()
            .map(|(vm, host)| AssignmentEntry {
                vm: *vm,
                host: *host,
                shares: None,
            })
            .collect(),
        message: None,
    }
}

fn snapshot() -> DataCenterSnapshot {
    let mut snapshot = DataCenterSnapshot::new();
    for host_id in 0..2 {
        snapshot.add_resource(host_id, ResourceCategory::Cpu, 10., 1.);
        snapshot.add_resource(host_id, ResourceCategory::Memory, 10., 1.);
    }
    snapshot
}

fn requests() -> Vec<PlacementRequest> {
    (0..2)
        .map(|id| {
            PlacementRequest::new(
                id,
                ResourceVector::new()
                    .with(ResourceCategory::Cpu, 6.)
                    .with(ResourceCategory::Memory, 2.),
            )
        })
        .collect()
}

fn strategy(solver: &StubSolver) -> OptimalPlacement {
    OptimalPlacement::new(OptimalSolverParams::default(), 0., Box::new(solver.clone())).unwrap()
}

#[test]
// Normal completion is converted to placement, missing shares default to VM demand.
fn test_optimal_placement() {
    let solver = StubSolver::new(vec![response("optimal", &[(0, 1), (1, 0)])]);
    let placement = strategy(&solver).place(&snapshot(), &requests()).unwrap();

    assert_eq!(placement.host_of(0), Some(1));
    assert_eq!(placement.host_of(1), Some(0));
    assert_eq!(placement.decision(0).unwrap().shares.get(ResourceCategory::Cpu), 6.);

    let request = &solver.requests.borrow()[0];
    assert_eq!(request.category, SolverCategory::Minlp);
    assert_eq!(request.hosts.len(), 2);
    assert_eq!(request.vms.len(), 2);
}

#[test]
fn test_solver_statuses() {
    for (text, status) in [
        ("iteration_limit", SolverStatus::IterationLimit),
        ("resource limit", SolverStatus::ResourceLimit),
        ("solver_failure", SolverStatus::SolverFailure),
        ("infeasible", SolverStatus::Infeasible),
        ("strange", SolverStatus::Unknown),
    ] {
        let solver = StubSolver::new(vec![response(text, &[])]);
        match strategy(&solver).place(&snapshot(), &requests()) {
            Err(Error::Solver { status: actual, .. }) => assert_eq!(actual, status),
            _ => panic!("status '{}' should produce solver error", text),
        }
    }
    let e = Error::solver(SolverStatus::IterationLimit, "");
    assert!(e.is_retryable());
    assert!(!Error::solver(SolverStatus::Infeasible, "").is_retryable());
}

#[test]
// Assignments violating capacities, missing or repeating VMs, or using unknown hosts are rejected.
fn test_malformed_assignments() {
    for assignment in [
        vec![(0, 0), (1, 0)],
        vec![(0, 0)],
        vec![(0, 0), (0, 1)],
        vec![(0, 0), (1, 7)],
        vec![(0, 0), (1, 1), (2, 1)],
    ] {
        let solver = StubSolver::new(vec![response("normal_completion", &assignment)]);
        match strategy(&solver).place(&snapshot(), &requests()) {
            Err(Error::Solver { status, .. }) => assert_eq!(status, SolverStatus::Unknown),
            _ => panic!("assignment {:?} should be rejected", assignment),
        }
    }

    // shares above VM demand would exceed the host capacity
    let mut oversized = response("optimal", &[(0, 0), (1, 1)]);
    oversized.assignment[0].shares = Some(ResourceVector::new().with(ResourceCategory::Cpu, 100.));
    let solver = StubSolver::new(vec![oversized]);
    match strategy(&solver).place(&snapshot(), &requests()) {
        Err(Error::Solver { status, .. }) => assert_eq!(status, SolverStatus::Unknown),
        _ => panic!("oversized shares should be rejected"),
    }
}

#[test]
// Shares below the demand reported by the solver are kept.
fn test_solver_shares() {
    let mut answer = response("optimal", &[(0, 0), (1, 1)]);
    answer.assignment[1].shares = Some(
        ResourceVector::new()
            .with(ResourceCategory::Cpu, 4.)
            .with(ResourceCategory::Memory, 2.),
    );
    let solver = StubSolver::new(vec![answer]);
    let placement = strategy(&solver).place(&snapshot(), &requests()).unwrap();
    assert_eq!(placement.decision(1).unwrap().shares.get(ResourceCategory::Cpu), 4.);
    assert_eq!(placement.decision(0).unwrap().shares.get(ResourceCategory::Cpu), 6.);
}

#[test]
// Custom solver proxies are registered per solver category.
fn test_solver_registry() {
    let solver = StubSolver::new(vec![response("optimal", &[(0, 0)])]);
    let mut registry = PlacementStrategyRegistry::default();
    let stub = solver.clone();
    registry
        .solvers_mut()
        .register(SolverCategory::Milp, "stub", move |_, _| Ok(Box::new(stub.clone())));

    let strategy = registry.resolve("Optimal[category=milp,proxy=stub,solver=cbc]").unwrap();
    let placement = strategy.place(&snapshot(), &requests()[..1]).unwrap();
    assert_eq!(placement.host_of(0), Some(0));
    assert_eq!(solver.requests.borrow()[0].solver, "cbc");

    assert!(matches!(
        registry.resolve("Optimal[category=minlp,proxy=stub]"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        registry.resolve("Optimal[category=milp,proxy=stub,input_method=xml]"),
        Err(Error::Configuration(_))
    ));
}

fn simulation(solver: &StubSolver, config: &str) -> DataCenterSimulation {
    let mut registry = PlacementStrategyRegistry::default();
    let stub = solver.clone();
    registry
        .solvers_mut()
        .register(SolverCategory::Minlp, "stub", move |_, _| Ok(Box::new(stub.clone())));
    let config: SimulationConfig = config.parse().unwrap();
    DataCenterSimulation::with_registry(Simulation::new(123), config, registry).unwrap()
}

const CONFIG: &str = r#"
solver_retry_limit: 2
initial_placement: Optimal[proxy=stub]
fallback_placement: FirstFit
hosts:
  - name_prefix: h
    count: 2
    resources:
      - category: cpu
        capacity: 10
"#;

fn cpu_spec(cpu: f64) -> VmSpec {
    VmSpec::new(ResourceVector::new().with(ResourceCategory::Cpu, cpu))
}

#[test]
// Limit-exceeded statuses are retried, then the fallback strategy is used.
fn test_retry_then_fallback() {
    let solver = StubSolver::new(vec![response("iteration_limit", &[])]);
    let mut sim = simulation(&solver, CONFIG);

    let vms = sim.deploy_initial_vms(vec![cpu_spec(4.), cpu_spec(4.)]).unwrap();
    assert_eq!(solver.calls(), 3);
    assert_eq!(sim.vm_location(vms[0]), Some(0));
    assert_eq!(sim.vm_location(vms[1]), Some(0));

    let data_center = sim.data_center();
    assert_eq!(data_center.borrow().stats().solver_retries, 2);
    assert_eq!(data_center.borrow().stats().solver_fallbacks, 1);
}

#[test]
// Retry succeeds after the solver hit the limit once.
fn test_retry_succeeds() {
    let solver = StubSolver::new(vec![
        response("resource_limit", &[]),
        response("optimal", &[(0, 1), (1, 1)]),
    ]);
    let mut sim = simulation(&solver, CONFIG);

    let vms = sim.deploy_initial_vms(vec![cpu_spec(4.), cpu_spec(4.)]).unwrap();
    assert_eq!(solver.calls(), 2);
    assert_eq!(sim.vm_location(vms[0]), Some(1));
    assert_eq!(sim.vm_location(vms[1]), Some(1));
    assert_eq!(sim.data_center().borrow().stats().solver_fallbacks, 0);
}

#[test]
// Fatal statuses are not retried and the error is propagated without fallback.
fn test_fatal_status_without_fallback() {
    let solver = StubSolver::new(vec![response("infeasible", &[])]);
    let config = CONFIG.replace("fallback_placement: FirstFit\n", "");
    let mut sim = simulation(&solver, &config);

    let result = sim.deploy_initial_vms(vec![cpu_spec(4.)]);
    assert!(matches!(
        result,
        Err(Error::Solver {
            status: SolverStatus::Infeasible,
            ..
        })
    ));
    assert_eq!(solver.calls(), 1);
    assert_eq!(sim.vm_status(0), Some(VmStatus::FailedToAllocate));
}
