//! Sensor node state
//!
//! Each node owns its routing table, its event table (only for events that
//! fired here), a FIFO message queue, and the per-tick busy flag that stops
//! two actors from entering the node in the same tick.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;

use crate::agent::Agent;
use crate::message::Message;
use crate::types::{EventId, EventRecord, NodeId, Position, RequestId, RoutingEntry};

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: Position,
    /// Fixed after topology setup
    neighbors: Vec<NodeId>,
    routing: BTreeMap<EventId, RoutingEntry>,
    events: BTreeMap<EventId, EventRecord>,
    queue: VecDeque<Message>,
    /// True iff a message entered this node already this tick
    busy: bool,
}

impl Node {
    pub fn new(id: NodeId, position: Position) -> Self {
        Self {
            id,
            position,
            neighbors: Vec::new(),
            routing: BTreeMap::new(),
            events: BTreeMap::new(),
            queue: VecDeque::new(),
            busy: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn set_neighbors(&mut self, neighbors: Vec<NodeId>) {
        self.neighbors = neighbors;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Append a message to the queue; the node is occupied receiving it
    /// for the rest of this tick.
    pub fn enqueue(&mut self, message: Message) {
        self.queue.push_back(message);
        self.busy = true;
    }

    /// Put a message back at the head of the queue after a failed move
    /// attempt, preserving its position for the next tick.
    pub fn requeue_front(&mut self, message: Message) {
        self.queue.push_front(message);
    }

    pub fn peek_message(&self) -> Option<&Message> {
        self.queue.front()
    }

    pub fn pop_message(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Drop every queued reference to the given request (used when the loop
    /// resends or abandons it, which moves or retires the actor).
    pub fn purge_request(&mut self, request: RequestId) {
        self.queue
            .retain(|message| !matches!(message, Message::Request(id) if *id == request));
    }

    /// Register an event that fired at this node: record it in the event
    /// table, insert the self-referencing distance-0 routing entry, and with
    /// `spawn_probability` spawn a disseminating agent rooted here.
    ///
    /// Returns true if an agent spawned.
    pub fn host_event<R: Rng>(
        &mut self,
        record: EventRecord,
        agent_ttl: u32,
        spawn_probability: f64,
        rng: &mut R,
    ) -> bool {
        let event = record.event;
        self.routing
            .insert(event, RoutingEntry::new(event, 0, self.id));
        self.events.insert(event, record);

        if rng.random::<f64>() < spawn_probability {
            let agent = Agent::new(self.id, agent_ttl, event);
            self.enqueue(Message::Agent(agent));
            true
        } else {
            false
        }
    }

    pub fn routing_entry(&self, event: EventId) -> Option<&RoutingEntry> {
        self.routing.get(&event)
    }

    pub fn routing_table(&self) -> &BTreeMap<EventId, RoutingEntry> {
        &self.routing
    }

    pub fn routing_table_mut(&mut self) -> &mut BTreeMap<EventId, RoutingEntry> {
        &mut self.routing
    }

    /// True iff the event originally fired at this node
    pub fn hosts_event(&self, event: EventId) -> bool {
        self.events.contains_key(&event)
    }

    pub fn event_record(&self, event: EventId) -> Option<&EventRecord> {
        self.events.get(&event)
    }

    pub fn event_table(&self) -> &BTreeMap<EventId, EventRecord> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn node() -> Node {
        Node::new(NodeId(0), Position::new(0, 0))
    }

    #[test]
    fn enqueue_marks_busy() {
        let mut node = node();
        assert!(!node.is_busy());
        node.enqueue(Message::Agent(Agent::new(NodeId(0), 10, EventId(0))));
        assert!(node.is_busy());
        assert_eq!(node.queue_len(), 1);
    }

    #[test]
    fn host_event_installs_self_entry() {
        let mut node = node();
        let mut rng = StdRng::seed_from_u64(1);
        // spawn_probability 0.0: never spawns an agent
        let spawned = node.host_event(EventRecord::new(EventId(3), 17), 50, 0.0, &mut rng);

        assert!(!spawned);
        assert!(node.hosts_event(EventId(3)));
        let entry = node.routing_entry(EventId(3)).unwrap();
        assert_eq!(entry.distance, 0);
        assert_eq!(entry.next_hop, NodeId(0));
        assert_eq!(node.queue_len(), 0);
    }

    #[test]
    fn host_event_can_spawn_agent() {
        let mut node = node();
        let mut rng = StdRng::seed_from_u64(1);
        let spawned = node.host_event(EventRecord::new(EventId(0), 0), 50, 1.0, &mut rng);

        assert!(spawned);
        assert_eq!(node.queue_len(), 1);
        assert!(node.is_busy());
        match node.peek_message().unwrap() {
            Message::Agent(agent) => {
                assert_eq!(agent.event(), EventId(0));
                assert_eq!(agent.ttl(), 50);
            }
            other => panic!("expected agent, got {other:?}"),
        }
    }

    #[test]
    fn purge_request_removes_only_that_request() {
        let mut node = node();
        node.enqueue(Message::Request(RequestId(1)));
        node.enqueue(Message::Agent(Agent::new(NodeId(0), 10, EventId(0))));
        node.enqueue(Message::Request(RequestId(2)));

        node.purge_request(RequestId(1));
        assert_eq!(node.queue_len(), 2);
        assert!(!matches!(
            node.peek_message().unwrap(),
            Message::Request(RequestId(1))
        ));
    }
}
