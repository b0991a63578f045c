//! End-to-end integration scenarios
//!
//! Longer probabilistic runs that check the emergent invariants of the
//! protocol rather than single-actor mechanics.

use crate::simulation::{SimConfig, Simulation};
use crate::topology;
use crate::types::NodeId;

fn busy_grid(seed: u64, ticks: u64) -> Simulation {
    let field = topology::grid(6, 6, 10, topology::DEFAULT_RADIUS);
    let mut sim = Simulation::new(
        field,
        SimConfig {
            max_ticks: ticks,
            event_probability: 1.0 / 500.0,
            request_period: 100,
            seed: Some(seed),
            ..SimConfig::default()
        },
    )
    .unwrap();
    sim.run();
    sim
}

#[test]
fn self_hosting_invariant_survives_a_busy_run() {
    let sim = busy_grid(99, 5_000);
    assert!(sim.stats.events_created > 0);

    // Every node that hosts an event must still point at itself with
    // distance 0, no matter how many agents passed through: pushing agent
    // knowledge into a node requires a strict distance improvement, and
    // nothing beats 0.
    for id in sim.field.node_ids() {
        let node = sim.field.node(id);
        for &event in node.event_table().keys() {
            let entry = node
                .routing_entry(event)
                .expect("hosting node lost its own routing entry");
            assert_eq!(entry.distance, 0);
            assert_eq!(entry.next_hop, id);
        }
    }
}

#[test]
fn routing_tables_keep_one_entry_per_event() {
    let sim = busy_grid(7, 5_000);

    for id in sim.field.node_ids() {
        for (&event, entry) in sim.field.node(id).routing_table() {
            // Keyed by event id: the key and the entry can never disagree.
            assert_eq!(entry.event, event);
            assert!(entry.next_hop.0 < sim.field.node_count());
        }
    }
}

#[test]
fn request_bookkeeping_is_consistent() {
    let sim = busy_grid(123, 10_000);

    assert!(sim.stats.requests_sent > 0);
    // Every dispatched request is found, abandoned, or still pending.
    assert_eq!(
        sim.stats.requests_sent,
        sim.stats.events_found + sim.stats.requests_abandoned + sim.pending_requests() as u64
    );
    assert_eq!(sim.reports.len() as u64, sim.stats.events_found);
    // Resends never outnumber dispatches.
    assert!(sim.stats.requests_resent <= sim.stats.requests_sent);
}

#[test]
fn agents_seed_a_corridor_with_aged_distances() {
    // One agent walks a line end to end; each node along the way must learn
    // the origin event at a distance equal to its hop count from the origin.
    let field = topology::line(5, 10, topology::DEFAULT_RADIUS);
    let mut sim = Simulation::new(
        field,
        SimConfig {
            event_probability: 0.0,
            agent_spawn_probability: 1.0,
            seed: Some(42),
            ..SimConfig::default()
        },
    )
    .unwrap()
    .with_request_nodes(vec![]);

    let event = sim.inject_event(NodeId(0));
    sim.run_ticks(10);

    for hop in 0..5usize {
        let entry = sim
            .field
            .node(NodeId(hop))
            .routing_entry(event)
            .expect("corridor node never learned the event");
        assert_eq!(entry.distance, hop as u32);
        // The aged entries still name the hosting node as the hop target.
        assert_eq!(entry.next_hop, NodeId(0));
    }
}

#[test]
fn greedy_request_outruns_its_ttl_budget() {
    // With the corridor seeded, a request two hops of knowledge away needs
    // no random walking at all: greedy hops are TTL-free.
    let field = topology::line(6, 10, topology::DEFAULT_RADIUS);
    let mut sim = Simulation::new(
        field,
        SimConfig {
            event_probability: 0.0,
            agent_spawn_probability: 1.0,
            request_ttl: 1, // would die instantly on a random walk
            seed: Some(42),
            ..SimConfig::default()
        },
    )
    .unwrap()
    .with_request_nodes(vec![]);

    let event = sim.inject_event(NodeId(0));
    sim.run_ticks(12);

    let request = sim.dispatch_request(NodeId(4), event);
    sim.run_ticks(10);

    assert_eq!(sim.stats.events_found, 1);
    assert!(sim.request(request).is_none());
}
