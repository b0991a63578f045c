//! Agent: random-walk knowledge disseminator
//!
//! An agent carries a routing table seeded with its origin event and trades
//! entries with every node it visits. It walks a uniformly random permutation
//! of its host's neighbors, never revisits a node, never enters a busy node,
//! and dies silently when its TTL runs out. Its only lasting effect is the
//! routing knowledge it leaves behind.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::topology::Field;
use crate::types::{EventId, NodeId, RoutingEntry};

#[derive(Debug, Clone)]
pub struct Agent {
    current: NodeId,
    ttl: u32,
    event: EventId,
    /// Do-not-revisit set, seeded with the origin node
    visited: BTreeSet<NodeId>,
    /// The agent's own routing knowledge, distances relative to `current`
    table: BTreeMap<EventId, RoutingEntry>,
}

impl Agent {
    /// Create an agent rooted at `origin`, seeded with the single fact that
    /// its event is hosted right here at distance 0.
    pub fn new(origin: NodeId, ttl: u32, event: EventId) -> Self {
        let mut table = BTreeMap::new();
        table.insert(event, RoutingEntry::new(event, 0, origin));
        Self {
            current: origin,
            ttl,
            event,
            visited: BTreeSet::from([origin]),
            table,
        }
    }

    pub fn current_node(&self) -> NodeId {
        self.current
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn event(&self) -> EventId {
        self.event
    }

    pub fn routing_table(&self) -> &BTreeMap<EventId, RoutingEntry> {
        &self.table
    }

    /// Attempt one move: scan a fresh random permutation of the current
    /// node's neighbors for the first one that is neither visited nor busy.
    ///
    /// On success the agent ages every owned routing entry by one hop,
    /// spends one tick of TTL, moves, reconciles tables with the arrival
    /// node, and returns the destination for the caller to enqueue it at.
    /// Returns `None` when no eligible neighbor exists this tick; the agent
    /// stays queued and retries with a reshuffled order next tick.
    pub fn step<R: Rng>(&mut self, field: &mut Field, rng: &mut R) -> Option<NodeId> {
        let mut order: Vec<NodeId> = field.neighbors(self.current).to_vec();
        order.shuffle(rng);

        for next in order {
            if self.visited.contains(&next) || field.node(next).is_busy() {
                continue;
            }

            self.visited.insert(self.current);

            // Age before merging: stored distances must be hop counts from
            // the agent's new position, not from where the facts were learned.
            for entry in self.table.values_mut() {
                entry.increase_distance();
            }
            self.ttl -= 1;
            self.current = next;

            merge_tables(&mut self.table, field.node_mut(next).routing_table_mut());
            trace!(agent_event = %self.event, to = %next, ttl = self.ttl, "agent moved");
            return Some(next);
        }
        None
    }
}

/// Bidirectional min-distance reconciliation between an agent's table and a
/// node's table: pull, then push.
///
/// The node's entry wins the pull on a tie (`<=`), but pushing the agent's
/// entry into the node requires a strict improvement (`<`). The asymmetry
/// keeps equal-distance entries from overwriting each other back and forth.
/// Entries are copied, never shared.
pub fn merge_tables(
    agent: &mut BTreeMap<EventId, RoutingEntry>,
    node: &mut BTreeMap<EventId, RoutingEntry>,
) {
    for (&event, node_entry) in node.iter() {
        let adopt = match agent.get(&event) {
            Some(agent_entry) => node_entry.distance <= agent_entry.distance,
            None => true,
        };
        if adopt {
            agent.insert(event, *node_entry);
        }
    }

    for (&event, agent_entry) in agent.iter() {
        let push = match node.get(&event) {
            Some(node_entry) => agent_entry.distance < node_entry.distance,
            None => true,
        };
        if push {
            node.insert(event, *agent_entry);
        }
    }
}
