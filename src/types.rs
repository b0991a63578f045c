//! Core types for the rumor routing simulation
//!
//! Models a field of sensor nodes at 2-D positions. Events fire at nodes,
//! roaming agents spread distance-vector knowledge about them, and requests
//! chase that knowledge to locate the event that hosts it.

use serde::{Deserialize, Serialize};

/// Stable index of a node in the field (assigned at setup, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Unique identifier for an event (monotonic counter owned by the loop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Unique identifier for a dispatched request
///
/// Node queues reference requests by id because the simulation loop also
/// tracks every live request for the resend/abandon lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A 2-D integer coordinate in the sensor field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = f64::from(other.x - self.x);
        let dy = f64::from(other.y - self.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.x, self.y)
    }
}

/// Immutable fact recorded when an event fires at a node
///
/// Lives only in the hosting node's event table; only routing knowledge
/// about it propagates through the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: EventId,
    /// Simulation tick at which the event fired
    pub created_at: u64,
}

impl EventRecord {
    pub fn new(event: EventId, created_at: u64) -> Self {
        Self { event, created_at }
    }
}

/// One routing fact: known hop-distance to an event and the neighbor to
/// move through to reach it
///
/// Each node and each agent owns its table entries outright; merges copy
/// entries, never alias them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub event: EventId,
    /// Hop count from the table owner to the event's hosting node
    pub distance: u32,
    pub next_hop: NodeId,
}

impl RoutingEntry {
    pub fn new(event: EventId, distance: u32, next_hop: NodeId) -> Self {
        Self {
            event,
            distance,
            next_hop,
        }
    }

    /// Age the entry by one hop (called once per agent move)
    pub fn increase_distance(&mut self) {
        self.distance += 1;
    }
}

/// Snapshot captured by a request at the moment it discovers its event,
/// reported verbatim once the request returns to its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundReport {
    pub event: EventId,
    /// Position of the node hosting the event
    pub position: Position,
    /// Tick at which the event was created
    pub created_at: u64,
}

impl std::fmt::Display for FoundReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event ID: {} At Position: {} Created Time: {}",
            self.event.0, self.position, self.created_at
        )
    }
}

/// Why a tracked request left the pending set without reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// TTL exhausted a second time after one resend
    Abandoned,
}

/// Entries of the append-only simulation event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimEvent {
    /// An event fired at a node
    EventCreated {
        event: EventId,
        node: NodeId,
        tick: u64,
    },
    /// Hosting the event spawned a disseminating agent
    AgentSpawned {
        event: EventId,
        node: NodeId,
        tick: u64,
    },
    /// An agent's TTL ran out and its host node dropped it
    AgentExpired { event: EventId, node: NodeId, tick: u64 },
    /// A request was dispatched from a request-origin node
    RequestDispatched {
        request: RequestId,
        source: NodeId,
        target: EventId,
        tick: u64,
    },
    /// A request reached the node hosting its target event
    RequestFound {
        request: RequestId,
        node: NodeId,
        tick: u64,
    },
    /// A request finished backtracking and reported at its source
    RequestReturned {
        request: RequestId,
        report: FoundReport,
        tick: u64,
    },
    /// A request exhausted its TTL once and was reset to its source
    RequestResent {
        request: RequestId,
        source: NodeId,
        tick: u64,
    },
    /// A request left the pending set without reporting
    RequestDropped {
        request: RequestId,
        reason: DropReason,
        tick: u64,
    },
}
