//! Pre-defined simulation scenarios
//!
//! Includes the canonical two-node find-and-report example and larger
//! probabilistic runs for eyeballing emergent behavior.

use tracing::info;

use crate::simulation::{SimConfig, Simulation};
use crate::topology;
use crate::types::NodeId;

/// Run the canonical two-node scenario:
///
/// ```text
/// Two nodes sit 10 units apart, well within radio range.
/// An event fires at node 0 at tick 5.
/// At tick 10 a request goes out from node 1 looking for it.
/// The request reaches node 0, finds the distance-0 entry plus the hosted
/// event, backtracks one hop, and reports at node 1.
/// ```
pub fn run_two_node_scenario() -> Simulation {
    info!("=== Running Two-Node Scenario ===");

    let field = topology::pair(10, topology::DEFAULT_RADIUS);
    println!("{}", field.visualize());

    let mut sim = Simulation::new(
        field,
        SimConfig {
            event_probability: 0.0,       // manual control
            agent_spawn_probability: 0.0, // keep the field quiet
            seed: Some(42),
            trace_events: true,
            ..SimConfig::default()
        },
    )
    .expect("two-node field is not empty")
    .with_request_nodes(vec![]);

    println!("--- Tick 5: event fires at node 0 ---");
    sim.run_ticks(5);
    let event = sim.inject_event(NodeId(0));

    println!("--- Tick 10: request dispatched from node 1 ---");
    sim.run_ticks(5);
    sim.dispatch_request(NodeId(1), event);

    sim.run_ticks(20);
    print_outcome(&sim);
    sim
}

/// A corridor of nodes: the event fires at one end, requests start at the
/// other, and success depends on agents seeding the corridor with routing
/// knowledge before the request's TTL runs dry.
pub fn run_corridor_scenario(length: usize, seed: u64) -> Simulation {
    info!("=== Running Corridor Scenario ({length} nodes) ===");

    let field = topology::line(length, 10, topology::DEFAULT_RADIUS);
    println!("{}", field.visualize());

    let mut sim = Simulation::new(
        field,
        SimConfig {
            event_probability: 0.0,
            agent_spawn_probability: 1.0, // always seed knowledge
            seed: Some(seed),
            ..SimConfig::default()
        },
    )
    .expect("corridor field is not empty")
    .with_request_nodes(vec![]);

    let event = sim.inject_event(NodeId(0));
    // Let the agent walk the corridor before asking. It comes to rest at the
    // far end once every neighbor is visited, so the request starts one node
    // short of it.
    sim.run_ticks(length as u64 * 2);

    sim.dispatch_request(NodeId(length - 2), event);
    sim.run_ticks(4 * sim.config.request_ttl as u64);

    print_outcome(&sim);
    sim
}

/// Full probabilistic run over a grid field with the reference parameters:
/// random events, coin-flip agents, periodic request dispatch.
pub fn run_grid_scenario(width: usize, height: usize, ticks: u64, seed: u64) -> Simulation {
    info!("=== Running Grid Scenario ({width}x{height}, {ticks} ticks) ===");

    let field = topology::grid(width, height, 10, topology::DEFAULT_RADIUS);

    let mut sim = Simulation::new(
        field,
        SimConfig {
            max_ticks: ticks,
            // Denser events than the reference 1/10000 so short demo runs
            // still have something to find.
            event_probability: 1.0 / 1_000.0,
            request_period: 400,
            seed: Some(seed),
            ..SimConfig::default()
        },
    )
    .expect("grid field is not empty");

    while sim.tick < ticks {
        sim.step();
        if sim.tick.is_multiple_of(1_000) {
            println!("{}", sim.state_summary());
        }
    }

    print_outcome(&sim);
    sim
}

fn print_outcome(sim: &Simulation) {
    for report in &sim.reports {
        println!("{report}");
    }
    println!("{}", sim.summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_node_scenario_reports() {
        let sim = run_two_node_scenario();
        assert_eq!(sim.stats.events_found, 1);
        assert_eq!(sim.reports.len(), 1);
        assert_eq!(sim.reports[0].created_at, 5);
    }

    #[test]
    fn corridor_scenario_finds_event() {
        let sim = run_corridor_scenario(6, 42);
        assert_eq!(sim.stats.events_found, 1);
    }

    #[test]
    fn grid_scenario_runs_to_budget() {
        let sim = run_grid_scenario(4, 4, 2_000, 7);
        assert_eq!(sim.tick, 2_000);
        assert!(sim.stats.events_found <= sim.stats.requests_sent);
    }
}
