//! Request: greedy event search with path backtracking
//!
//! A request chases routing knowledge toward its target event. With a usable
//! routing entry it hops greedily along `next_hop`; with none it random-walks
//! and pays TTL for it. Once it stands on the node that actually hosts the
//! event it captures a report and retraces its recorded route, one hop per
//! tick, back to its source. The walk home is free: backtracking never
//! consumes TTL.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::trace;

use crate::topology::Field;
use crate::types::{EventId, FoundReport, NodeId, RequestId};

#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    source: NodeId,
    current: NodeId,
    ttl: u32,
    target: EventId,
    /// Stack of visited nodes, seeded with the source; popped to backtrack
    route: Vec<NodeId>,
    sent_twice: bool,
    found: bool,
    returned: bool,
    report: Option<FoundReport>,
}

impl Request {
    pub fn new(id: RequestId, source: NodeId, ttl: u32, target: EventId) -> Self {
        Self {
            id,
            source,
            current: source,
            ttl,
            target,
            route: vec![source],
            sent_twice: false,
            found: false,
            returned: false,
            report: None,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn current_node(&self) -> NodeId {
        self.current
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn target(&self) -> EventId {
        self.target
    }

    pub fn route(&self) -> &[NodeId] {
        &self.route
    }

    pub fn is_sent_twice(&self) -> bool {
        self.sent_twice
    }

    /// True once the request stands (or stood) on the hosting node
    pub fn has_found_target(&self) -> bool {
        self.found
    }

    pub fn has_returned(&self) -> bool {
        self.returned
    }

    pub fn report(&self) -> Option<&FoundReport> {
        self.report.as_ref()
    }

    /// Attempt one move. Returns the destination node when the request
    /// advanced (the caller enqueues it there), or `None` when it is blocked
    /// this tick.
    pub fn step<R: Rng>(&mut self, field: &mut Field, rng: &mut R) -> Option<NodeId> {
        if self.returned {
            return None;
        }
        if self.found {
            return self.backtrack_if_clear(field);
        }

        let entry = field.node(self.current).routing_entry(self.target).copied();

        if let Some(entry) = entry
            && entry.distance == 0
            && field.node(self.current).hosts_event(self.target)
        {
            // Discovery: the event fired right here. Capture the report now;
            // the node's tables may keep changing while we walk home.
            let node = field.node(self.current);
            let created_at = node
                .event_record(self.target)
                .map(|record| record.created_at)
                .unwrap_or_default();
            self.report = Some(FoundReport {
                event: self.target,
                position: node.position(),
                created_at,
            });
            self.found = true;
            trace!(request = %self.id, node = %self.current, "request found its event");
            return self.backtrack_if_clear(field);
        }

        if let Some(entry) = entry
            && !field.node(entry.next_hop).is_busy()
        {
            // Greedy, knowledge-guided hop; costs no TTL.
            self.route.push(self.current);
            self.current = entry.next_hop;
            return Some(entry.next_hop);
        }

        // No usable knowledge: uniform random walk, no busy or visited
        // filtering, one tick of TTL per hop.
        let next = field.neighbors(self.current).choose(rng).copied()?;
        self.route.push(self.current);
        self.current = next;
        self.ttl = self.ttl.saturating_sub(1);
        Some(next)
    }

    /// Pop one hop off the route stack if the node there is free this tick.
    /// The request has returned once the stack empties.
    fn backtrack_if_clear(&mut self, field: &Field) -> Option<NodeId> {
        let &back = self.route.last()?;
        if field.node(back).is_busy() {
            return None;
        }
        self.route.pop();
        self.current = back;
        if self.route.is_empty() {
            self.returned = true;
        }
        Some(back)
    }

    /// Reset the request to its source with a fresh TTL. Called once by the
    /// simulation loop when the first TTL budget runs out while searching.
    pub fn resend(&mut self, ttl: u32) {
        self.current = self.source;
        self.ttl = ttl;
        self.sent_twice = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{self, Field};
    use crate::types::{EventRecord, Position, RoutingEntry};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn host_event_at(field: &mut Field, node: NodeId, event: EventId, tick: u64) {
        let mut rng = rng();
        field
            .node_mut(node)
            .host_event(EventRecord::new(event, tick), 50, 0.0, &mut rng);
    }

    #[test]
    fn greedy_hop_follows_next_hop_without_ttl_cost() {
        let mut field = topology::line(3, 10, topology::DEFAULT_RADIUS);
        field
            .node_mut(NodeId(0))
            .routing_table_mut()
            .insert(EventId(0), RoutingEntry::new(EventId(0), 2, NodeId(1)));

        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(0));
        let dest = request.step(&mut field, &mut rng());

        assert_eq!(dest, Some(NodeId(1)));
        assert_eq!(request.ttl(), 45);
        assert_eq!(request.route(), &[NodeId(0), NodeId(0)]);
    }

    #[test]
    fn greedy_hop_blocked_by_busy_next_hop_falls_back_to_walk() {
        let mut field = topology::line(3, 10, topology::DEFAULT_RADIUS);
        field
            .node_mut(NodeId(1))
            .routing_table_mut()
            .insert(EventId(0), RoutingEntry::new(EventId(0), 2, NodeId(2)));
        field.node_mut(NodeId(2)).set_busy(true);

        let mut request = Request::new(RequestId(0), NodeId(1), 45, EventId(0));
        let dest = request.step(&mut field, &mut rng()).unwrap();

        // Random walk may still land on the busy node; requests do not
        // filter, but they do pay TTL for the exploratory hop.
        assert!(dest == NodeId(0) || dest == NodeId(2));
        assert_eq!(request.ttl(), 44);
    }

    #[test]
    fn random_walk_consumes_ttl() {
        let mut field = topology::pair(10, topology::DEFAULT_RADIUS);
        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(9));

        let dest = request.step(&mut field, &mut rng());
        assert_eq!(dest, Some(NodeId(1)));
        assert_eq!(request.ttl(), 44);
    }

    #[test]
    fn stuck_on_isolated_node() {
        let mut field = Field::from_positions(&[Position::new(0, 0)], topology::DEFAULT_RADIUS);
        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(0));
        assert!(request.step(&mut field, &mut rng()).is_none());
        assert_eq!(request.ttl(), 45);
    }

    #[test]
    fn discovery_requires_hosted_event_not_just_distance_zero() {
        let mut field = topology::pair(10, topology::DEFAULT_RADIUS);
        // A distance-0 entry without the event table record is stale
        // knowledge, not a discovery.
        field
            .node_mut(NodeId(0))
            .routing_table_mut()
            .insert(EventId(0), RoutingEntry::new(EventId(0), 0, NodeId(0)));

        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(0));
        request.step(&mut field, &mut rng());
        assert!(!request.has_found_target());
    }

    #[test]
    fn discovery_captures_report_and_backtracks_in_route_order() {
        let mut field = topology::line(4, 10, topology::DEFAULT_RADIUS);
        host_event_at(&mut field, NodeId(3), EventId(0), 5);

        // Simulate a request that walked S=0, A=1, B=2 and now stands on Y=3.
        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(0));
        request.route = vec![NodeId(0), NodeId(1), NodeId(2)];
        request.current = NodeId(3);

        // Discovery tick: capture + first backtrack hop to B=2.
        assert_eq!(request.step(&mut field, &mut rng()), Some(NodeId(2)));
        assert!(request.has_found_target());
        let report = request.report().unwrap();
        assert_eq!(report.event, EventId(0));
        assert_eq!(report.created_at, 5);
        assert_eq!(report.position, field.node(NodeId(3)).position());

        // Remaining hops: A=1 then S=0, in exactly that order.
        assert_eq!(request.step(&mut field, &mut rng()), Some(NodeId(1)));
        assert!(!request.has_returned());
        assert_eq!(request.step(&mut field, &mut rng()), Some(NodeId(0)));
        assert!(request.has_returned());
        assert!(request.route().is_empty());

        // A returned request never moves again.
        assert!(request.step(&mut field, &mut rng()).is_none());
    }

    #[test]
    fn backtrack_waits_for_busy_node() {
        let mut field = topology::pair(10, topology::DEFAULT_RADIUS);
        host_event_at(&mut field, NodeId(1), EventId(0), 0);

        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(0));
        request.route = vec![NodeId(0)];
        request.current = NodeId(1);

        field.node_mut(NodeId(0)).set_busy(true);
        assert!(request.step(&mut field, &mut rng()).is_none());
        assert!(request.has_found_target());
        assert!(!request.has_returned());

        // Busy flag cleared next tick: the walk home resumes.
        field.node_mut(NodeId(0)).set_busy(false);
        assert_eq!(request.step(&mut field, &mut rng()), Some(NodeId(0)));
        assert!(request.has_returned());
    }

    #[test]
    fn backtrack_does_not_consume_ttl() {
        let mut field = topology::line(3, 10, topology::DEFAULT_RADIUS);
        host_event_at(&mut field, NodeId(2), EventId(0), 0);

        let mut request = Request::new(RequestId(0), NodeId(0), 45, EventId(0));
        request.route = vec![NodeId(0), NodeId(1)];
        request.current = NodeId(2);
        request.ttl = 0;

        // TTL is spent, but the way home is already known and free.
        assert_eq!(request.step(&mut field, &mut rng()), Some(NodeId(1)));
        assert_eq!(request.step(&mut field, &mut rng()), Some(NodeId(0)));
        assert!(request.has_returned());
        assert_eq!(request.ttl(), 0);
    }

    #[test]
    fn resend_resets_to_source_with_fresh_ttl() {
        let mut field = topology::line(3, 10, topology::DEFAULT_RADIUS);
        let mut request = Request::new(RequestId(0), NodeId(0), 2, EventId(0));
        request.step(&mut field, &mut rng());
        request.step(&mut field, &mut rng());
        assert_eq!(request.ttl(), 0);

        request.resend(45);
        assert_eq!(request.current_node(), NodeId(0));
        assert_eq!(request.ttl(), 45);
        assert!(request.is_sent_twice());
    }
}
