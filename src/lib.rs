//! # Rumor Routing
//!
//! A simulation of the rumor routing protocol for sensor networks where
//! nodes lack global topology knowledge.
//!
//! ## Overview
//!
//! Events fire at random nodes in a 2-D sensor field. Hosting an event may
//! spawn an **agent**: a random-walking actor that carries a routing table
//! and trades entries with every node it visits, leaving behind hop-distance
//! knowledge about events. **Requests** dispatched from designated origin
//! nodes chase that knowledge toward an event, falling back to a random walk
//! where no knowledge exists, then retrace their recorded path to report the
//! find at their source.
//!
//! ## Architecture
//!
//! - **Types** (`types.rs`): identifiers, positions, routing/event records,
//!   the simulation event log
//! - **Topology** (`topology.rs`): the sensor field, proximity adjacency,
//!   layout file parsing
//! - **Node** (`node.rs`): per-node tables, FIFO message queue, busy flag
//! - **Agent / Request** (`agent.rs`, `request.rs`): the two actor variants
//!   and the routing-table reconciliation
//! - **Simulation** (`simulation.rs`): the deterministic tick loop
//! - **Scenarios** (`scenarios.rs`): pre-built runnable setups
//!
//! ## Example: two-node find
//!
//! ```rust
//! use rumor_routing::{topology, NodeId, SimConfig, Simulation};
//!
//! let field = topology::pair(10, topology::DEFAULT_RADIUS);
//! let mut sim = Simulation::new(field, SimConfig {
//!     event_probability: 0.0,       // manual control
//!     agent_spawn_probability: 0.0,
//!     seed: Some(42),
//!     ..SimConfig::default()
//! })
//! .unwrap()
//! .with_request_nodes(vec![]);
//!
//! // An event fires at node 0; node 1 asks for it.
//! let event = sim.inject_event(NodeId(0));
//! sim.dispatch_request(NodeId(1), event);
//! sim.run_ticks(10);
//!
//! assert_eq!(sim.stats.events_found, 1);
//! ```
//!
//! ## Scheduling model
//!
//! There is no concurrency: one tick processes at most one message per node,
//! in node order, and a per-tick busy flag keeps two actors from entering
//! the same node within a tick. A failed move just leaves the actor queued
//! for the next tick. The only random source is a single seedable RNG, so a
//! fixed seed reproduces a run exactly.

pub mod agent;
pub mod message;
pub mod node;
pub mod request;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod types;

#[cfg(test)]
mod integration_scenarios;

// Re-export main types
pub use types::{
    DropReason, EventId, EventRecord, FoundReport, NodeId, Position, RequestId, RoutingEntry,
    SimEvent,
};

pub use agent::{Agent, merge_tables};
pub use message::Message;
pub use node::Node;
pub use request::Request;
pub use topology::{DEFAULT_RADIUS, Field, LayoutError, parse_layout};

pub use simulation::{SimConfig, SimError, SimStats, Simulation};
