//! Simulation engine for rumor routing
//!
//! Drives the discrete tick loop:
//! - Periodic request dispatch from the request-origin nodes
//! - The resend/abandon lifecycle sweep over tracked requests
//! - Random event generation (which may spawn disseminating agents)
//! - One message delivery attempt per node per tick
//! - End-of-tick busy-flag reset
//!
//! Everything is single-threaded and deterministic for a fixed seed: the
//! only random source is one seedable RNG owned by the engine.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::message::Message;
use crate::request::Request;
use crate::topology::Field;
use crate::types::{
    DropReason, EventId, EventRecord, FoundReport, NodeId, RequestId, SimEvent,
};

/// Configuration for the simulation
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Total ticks to run
    pub max_ticks: u64,
    /// TTL for disseminating agents
    pub agent_ttl: u32,
    /// TTL for each request attempt (one full budget per send)
    pub request_ttl: u32,
    /// Number of designated request-origin nodes
    pub request_node_count: usize,
    /// Dispatch one request per origin node every this many ticks
    pub request_period: u64,
    /// Per-node per-tick probability of a new event firing
    pub event_probability: f64,
    /// Probability that hosting a new event spawns an agent
    pub agent_spawn_probability: f64,
    /// Seed for the simulation RNG (None = seeded from the OS)
    pub seed: Option<u64>,
    /// Enable detailed tracing of every log entry
    pub trace_events: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_ticks: 10_000,
            agent_ttl: 50,
            request_ttl: 45,
            request_node_count: 4,
            request_period: 400,
            event_probability: 1.0 / 10_000.0,
            agent_spawn_probability: 0.5,
            seed: None,
            trace_events: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot simulate an empty field")]
    EmptyField,
}

/// Run-wide tallies, owned by the loop rather than ambient globals
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimStats {
    pub nodes_created: u64,
    pub events_created: u64,
    pub requests_sent: u64,
    pub events_found: u64,
    pub agents_spawned: u64,
    pub agents_expired: u64,
    pub requests_resent: u64,
    pub requests_abandoned: u64,
}

/// The simulation state
#[derive(Debug)]
pub struct Simulation {
    /// The sensor field
    pub field: Field,
    /// Current simulation tick
    pub tick: u64,
    /// Configuration
    pub config: SimConfig,
    rng: StdRng,
    /// Next event id; doubles as the count of events ever created
    next_event: u64,
    next_request: u64,
    request_nodes: Vec<NodeId>,
    /// Every live request, keyed by id; node queues reference into this set
    requests: BTreeMap<RequestId, Request>,
    /// Global append-only log of everything that happened
    pub event_log: Vec<SimEvent>,
    /// One report per successfully returned request, in completion order
    pub reports: Vec<FoundReport>,
    /// Statistics
    pub stats: SimStats,
}

impl Simulation {
    /// Create a new simulation over the given field. Request-origin nodes
    /// are sampled with replacement from the field.
    pub fn new(field: Field, config: SimConfig) -> Result<Self, SimError> {
        if field.is_empty() {
            return Err(SimError::EmptyField);
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let request_nodes = (0..config.request_node_count)
            .map(|_| NodeId(rng.random_range(0..field.node_count())))
            .collect();

        let stats = SimStats {
            nodes_created: field.node_count() as u64,
            ..SimStats::default()
        };

        Ok(Self {
            field,
            tick: 0,
            config,
            rng,
            next_event: 0,
            next_request: 0,
            request_nodes,
            requests: BTreeMap::new(),
            event_log: Vec::new(),
            reports: Vec::new(),
            stats,
        })
    }

    /// Pin the request-origin nodes instead of sampling them (scenarios and
    /// tests use this for reproducible setups).
    pub fn with_request_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.request_nodes = nodes;
        self
    }

    pub fn request_nodes(&self) -> &[NodeId] {
        &self.request_nodes
    }

    /// Count of events ever created
    pub fn events_created(&self) -> u64 {
        self.next_event
    }

    /// Requests still tracked by the lifecycle sweep
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    /// Run a single simulation tick
    pub fn step(&mut self) {
        trace!("=== Tick {} ===", self.tick);

        // 1. Periodic request dispatch, once events exist to ask for
        if self.next_event > 0 && self.tick.is_multiple_of(self.config.request_period) {
            self.dispatch_periodic_requests();
        }

        // 2. Request lifecycle sweep: returned / resend / abandon
        self.sweep_requests();

        // 3. Random event generation
        self.generate_events();

        // 4. One delivery attempt per node
        for node in self.field.node_ids() {
            self.deliver_one(node);
        }

        // 5. Advance time; occupancy is strictly per-tick
        self.tick += 1;
        self.field.clear_busy_flags();
    }

    /// Run until the configured tick budget is spent
    pub fn run(&mut self) {
        while self.tick < self.config.max_ticks {
            self.step();
        }
        info!("Simulation complete at tick {}", self.tick);
        info!("Stats: {:?}", self.stats);
    }

    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Fire the next event at the given node (scenarios and tests inject
    /// events directly; the loop itself uses the configured probability).
    pub fn inject_event(&mut self, node: NodeId) -> EventId {
        let event = EventId(self.next_event);
        self.next_event += 1;

        let record = EventRecord::new(event, self.tick);
        let spawned = self.field.node_mut(node).host_event(
            record,
            self.config.agent_ttl,
            self.config.agent_spawn_probability,
            &mut self.rng,
        );

        self.stats.events_created += 1;
        debug!(%event, %node, tick = self.tick, "event created");
        self.emit_event(SimEvent::EventCreated {
            event,
            node,
            tick: self.tick,
        });
        if spawned {
            self.stats.agents_spawned += 1;
            self.emit_event(SimEvent::AgentSpawned {
                event,
                node,
                tick: self.tick,
            });
        }
        event
    }

    /// Dispatch a request for `target` from `source` and track it
    pub fn dispatch_request(&mut self, source: NodeId, target: EventId) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;

        let request = Request::new(id, source, self.config.request_ttl, target);
        self.requests.insert(id, request);
        self.field.node_mut(source).enqueue(Message::Request(id));

        self.stats.requests_sent += 1;
        debug!(request = %id, %source, %target, tick = self.tick, "request dispatched");
        self.emit_event(SimEvent::RequestDispatched {
            request: id,
            source,
            target,
            tick: self.tick,
        });
        id
    }

    fn dispatch_periodic_requests(&mut self) {
        for source in self.request_nodes.clone() {
            let target = EventId(self.rng.random_range(0..self.next_event));
            self.dispatch_request(source, target);
        }
    }

    /// Returned requests are counted and retired; searching requests whose
    /// TTL ran out are resent once from their source, then abandoned on the
    /// second exhaustion. Requests that already found their event are busy
    /// walking home and are left alone.
    fn sweep_requests(&mut self) {
        let ids: Vec<RequestId> = self.requests.keys().copied().collect();

        for id in ids {
            let Some(request) = self.requests.get(&id) else {
                continue;
            };
            let (returned, found, ttl, sent_twice, source) = (
                request.has_returned(),
                request.has_found_target(),
                request.ttl(),
                request.is_sent_twice(),
                request.source(),
            );

            if returned {
                self.requests.remove(&id);
                self.purge_from_queues(id);
                self.stats.events_found += 1;
            } else if found {
                // Backtracking is TTL-free; the request always gets home.
                continue;
            } else if ttl == 0 {
                if !sent_twice {
                    self.purge_from_queues(id);
                    if let Some(request) = self.requests.get_mut(&id) {
                        request.resend(self.config.request_ttl);
                    }
                    self.field.node_mut(source).enqueue(Message::Request(id));
                    self.stats.requests_resent += 1;
                    debug!(request = %id, %source, tick = self.tick, "request resent");
                    self.emit_event(SimEvent::RequestResent {
                        request: id,
                        source,
                        tick: self.tick,
                    });
                } else {
                    self.requests.remove(&id);
                    self.purge_from_queues(id);
                    self.stats.requests_abandoned += 1;
                    debug!(request = %id, tick = self.tick, "request abandoned");
                    self.emit_event(SimEvent::RequestDropped {
                        request: id,
                        reason: DropReason::Abandoned,
                        tick: self.tick,
                    });
                }
            }
        }
    }

    fn generate_events(&mut self) {
        for node in self.field.node_ids() {
            if self.rng.random::<f64>() < self.config.event_probability {
                self.inject_event(node);
            }
        }
    }

    /// Process at most one message at the given node this tick.
    ///
    /// Expired queue heads are dropped iteratively (never recursively) until
    /// a live head remains. A successful step dequeues the message, marks
    /// this node busy, and enqueues the message at its destination; a failed
    /// step puts the message back at the head for a retry next tick.
    fn deliver_one(&mut self, node: NodeId) {
        loop {
            let expired = match self.field.node(node).peek_message() {
                None => return,
                Some(Message::Agent(agent)) => agent.ttl() == 0,
                Some(Message::Request(id)) => match self.requests.get(id) {
                    // Found-but-backtracking requests ride for free.
                    Some(request) => request.ttl() == 0 && !request.has_found_target(),
                    // Stale entry for an already-retired request.
                    None => true,
                },
            };
            if !expired {
                break;
            }
            if let Some(Message::Agent(agent)) = self.field.node_mut(node).pop_message() {
                self.stats.agents_expired += 1;
                self.emit_event(SimEvent::AgentExpired {
                    event: agent.event(),
                    node,
                    tick: self.tick,
                });
            }
        }

        let Some(mut message) = self.field.node_mut(node).pop_message() else {
            return;
        };

        let request_id = match &message {
            Message::Request(id) => Some(*id),
            Message::Agent(_) => None,
        };
        let (found_before, returned_before) = match request_id.and_then(|id| self.requests.get(&id))
        {
            Some(request) => (request.has_found_target(), request.has_returned()),
            None => (false, false),
        };

        let destination = match &mut message {
            Message::Agent(agent) => agent.step(&mut self.field, &mut self.rng),
            Message::Request(id) => match self.requests.get_mut(id) {
                Some(request) => request.step(&mut self.field, &mut self.rng),
                None => None,
            },
        };

        match destination {
            Some(destination) => {
                self.field.node_mut(node).set_busy(true);
                self.field.node_mut(destination).enqueue(message);
            }
            None => {
                // Discovery can happen without a move when the backtrack
                // path is blocked; the message stays parked for a retry.
                self.field.node_mut(node).requeue_front(message);
            }
        }

        if let Some(id) = request_id {
            self.note_request_transitions(id, found_before, returned_before);
        }
    }

    /// Emit found/returned log entries for a request whose step just
    /// crossed either transition.
    fn note_request_transitions(&mut self, id: RequestId, found_before: bool, returned_before: bool) {
        let Some(request) = self.requests.get(&id) else {
            return;
        };
        let found_now = request.has_found_target();
        let current_node = request.current_node();
        let returned_now = request.has_returned();
        let report_now = request.report().copied();

        if found_now && !found_before {
            self.emit_event(SimEvent::RequestFound {
                request: id,
                node: current_node,
                tick: self.tick,
            });
        }

        if returned_now
            && !returned_before
            && let Some(report) = report_now
        {
            info!("{report}");
            self.reports.push(report);
            self.emit_event(SimEvent::RequestReturned {
                request: id,
                report,
                tick: self.tick,
            });
        }
    }

    fn purge_from_queues(&mut self, request: RequestId) {
        for node in self.field.node_ids() {
            self.field.node_mut(node).purge_request(request);
        }
    }

    fn emit_event(&mut self, event: SimEvent) {
        if self.config.trace_events {
            trace!("Event: {:?}", event);
        }
        self.event_log.push(event);
    }

    /// The per-run summary report, in the classic format
    pub fn summary(&self) -> String {
        format!(
            "Number of nodes created: {}\n\
             Number of events created: {}\n\
             Number of sent requests: {}\n\
             Number of found events: {}",
            self.stats.nodes_created,
            self.stats.events_created,
            self.stats.requests_sent,
            self.stats.events_found
        )
    }

    /// One-line progress summary for interactive inspection
    pub fn state_summary(&self) -> String {
        format!(
            "Tick {}: {} events, {} pending requests, {} queued messages",
            self.tick,
            self.next_event,
            self.requests.len(),
            self.field.queued_messages()
        )
    }
}
