//! AMPL rendering of the placement problem.

use std::fmt::Write;

use crate::core::resource::ResourceCategory;
use crate::core::solver::contract::SolverRequest;

const MODEL: &str = "\
set HOSTS;
set VMS;
set RESOURCES;

param capacity {HOSTS, RESOURCES} >= 0, default 0;
param threshold {HOSTS, RESOURCES} >= 0, <= 1, default 0;
param committed {HOSTS, RESOURCES} >= 0, default 0;
param demand {VMS, RESOURCES} >= 0, default 0;
param penalty >= 0, < 1;

var x {VMS, HOSTS} binary;
var y {HOSTS} binary;

minimize cost:
    sum {h in HOSTS} y[h]
    + sum {h in HOSTS, r in RESOURCES: capacity[h, r] > 0}
        ((committed[h, r] + sum {v in VMS} demand[v, r] * x[v, h]) / capacity[h, r]) ^ 2;

subject to assign {v in VMS}:
    sum {h in HOSTS} x[v, h] = 1;

subject to capacity_limit {h in HOSTS, r in RESOURCES}:
    committed[h, r] + sum {v in VMS} demand[v, r] * x[v, h]
        <= capacity[h, r] * threshold[h, r] * (1 - penalty) * y[h] + committed[h, r] * (1 - y[h]);

subject to unavailable {v in VMS, h in HOSTS, r in RESOURCES: demand[v, r] > 0 and capacity[h, r] = 0}:
    x[v, h] = 0;
";

/// Renders complete AMPL model, data section and solve commands.
pub fn render_ampl(request: &SolverRequest) -> String {
    let mut out = String::from(MODEL);
    let hosts: Vec<String> = request.hosts.iter().map(|h| format!("h{}", h.id)).collect();
    let vms: Vec<String> = request.vms.iter().map(|v| format!("v{}", v.id)).collect();
    let resources: Vec<&str> = ResourceCategory::ALL.iter().map(|c| c.name()).collect();

    out.push_str("\ndata;\n\n");
    let _ = writeln!(out, "set HOSTS := {};", hosts.join(" "));
    let _ = writeln!(out, "set VMS := {};", vms.join(" "));
    let _ = writeln!(out, "set RESOURCES := {};", resources.join(" "));
    let _ = writeln!(out, "param penalty := {};", request.reference_share_penalty);

    out.push_str("\nparam: capacity threshold committed :=\n");
    for host in &request.hosts {
        for resource in &host.resources {
            let _ = writeln!(
                out,
                "    h{} {} {} {} {}",
                host.id, resource.category, resource.capacity, resource.threshold, resource.committed
            );
        }
    }
    out.push_str(";\n\nparam demand :=\n");
    for vm in &request.vms {
        for (category, amount) in vm.demand.iter() {
            let _ = writeln!(out, "    v{} {} {}", vm.id, category, amount);
        }
    }
    out.push_str(";\n\nmodel;\n");
    let _ = writeln!(out, "option solver {};", request.solver);
    out.push_str("solve;\n");
    out.push_str("display solve_result;\n");
    out.push_str("display {v in VMS, h in HOSTS: x[v, h] > 0.5} x[v, h];\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::ResourceVector;
    use crate::core::snapshot::DataCenterSnapshot;
    use crate::core::solver::contract::VmEntry;
    use crate::core::solver::params::{OptimalSolverParams, SolverInputMethod};

    #[test]
    fn ampl_text() {
        let mut snapshot = DataCenterSnapshot::new();
        snapshot.add_resource(0, ResourceCategory::Cpu, 10., 0.9);
        snapshot.add_resource(1, ResourceCategory::Memory, 32., 1.);
        let params = OptimalSolverParams {
            input_method: SolverInputMethod::Ampl,
            solver_id: "bonmin".to_string(),
            ..OptimalSolverParams::default()
        };
        let vms = vec![VmEntry {
            id: 5,
            demand: ResourceVector::new().with(ResourceCategory::Memory, 4.),
        }];
        let text = SolverRequest::new(&params, 0., &snapshot, vms).render().unwrap();
        assert!(text.contains("set HOSTS := h0 h1;"));
        assert!(text.contains("set VMS := v5;"));
        assert!(text.contains("h0 cpu 10 0.9 0"));
        assert!(text.contains("v5 memory 4"));
        assert!(text.contains("option solver bonmin;"));
    }
}
