//! The discrete-event simulator.
//!
//! Owns the nodes, the link topology and the event queue. Nodes only ever
//! react: a frame delivery or a wakeup calls into the node, outgoing frames
//! are collected immediately afterwards, and the node's next timer deadline
//! is turned into a future wakeup event. Identical seeds and scenarios give
//! identical runs.

use std::collections::BinaryHeap;
use std::sync::Arc;

use dvmesh::{
    Config, ConfigError, MeshNode, NodeId, OutboundFrame, SharedCoordination, Timestamp,
};
use hashbrown::HashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::event::{Event, ScheduledEvent, SequenceNumber};
use crate::metrics::{SimMetrics, SimulationResult, TableSnapshot};
use crate::topology::Topology;

pub struct Simulator {
    nodes: HashMap<NodeId, MeshNode>,
    /// Node ids in creation order, for deterministic iteration.
    order: Vec<NodeId>,
    topology: Topology,
    queue: BinaryHeap<ScheduledEvent>,
    time: Timestamp,
    next_seq: SequenceNumber,
    seed: u64,
    rng: SmallRng,
    metrics: SimMetrics,
    coord: Arc<SharedCoordination>,
    /// Earliest pending wakeup per node, to keep the queue lean.
    scheduled_wakeups: HashMap<NodeId, Timestamp>,
    events_processed: u64,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Simulator {
            nodes: HashMap::new(),
            order: Vec::new(),
            topology: Topology::new(),
            queue: BinaryHeap::new(),
            time: Timestamp::ZERO,
            next_seq: 0,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            metrics: SimMetrics::default(),
            coord: Arc::new(SharedCoordination::new(seed)),
            scheduled_wakeups: HashMap::new(),
            events_processed: 0,
        }
    }

    pub fn coord(&self) -> &Arc<SharedCoordination> {
        &self.coord
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    pub fn node(&self, id: NodeId) -> Option<&MeshNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MeshNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn set_topology(&mut self, topology: Topology) {
        self.topology = topology;
    }

    /// Create a node. All nodes must be added before [`initialize_all`]
    /// so the failure subset sees the whole population.
    ///
    /// [`initialize_all`]: Self::initialize_all
    pub fn add_node(&mut self, id: NodeId, cfg: Config) -> Result<(), ConfigError> {
        let node = MeshNode::new(id, cfg, Arc::clone(&self.coord), self.seed)?;
        self.nodes.insert(id, node);
        self.order.push(id);
        Ok(())
    }

    /// Arm every node's initial timers and schedule their first wakeups.
    pub fn initialize_all(&mut self) {
        for id in self.order.clone() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.initialize(self.time);
            }
            self.flush_node(id);
        }
    }

    pub fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent { time, seq, event });
    }

    pub fn schedule_app_send(&mut self, at: Timestamp, from: NodeId, to: NodeId) {
        self.schedule(at, Event::AppSend { from, to });
    }

    pub fn schedule_snapshot(&mut self, at: Timestamp) {
        self.schedule(at, Event::Snapshot);
    }

    /// Process events up to and including `limit`. Returns the number of
    /// events processed.
    pub fn run_until(&mut self, limit: Timestamp) -> u64 {
        let mut processed = 0;
        while let Some(next) = self.queue.peek() {
            if next.time > limit {
                break;
            }
            let scheduled = match self.queue.pop() {
                Some(ev) => ev,
                None => break,
            };
            self.time = scheduled.time;
            self.events_processed += 1;
            processed += 1;
            self.process(scheduled);
        }
        self.time = limit;
        processed
    }

    pub fn run_for(&mut self, duration: dvmesh::Duration) -> u64 {
        self.run_until(self.time + duration)
    }

    /// Summarize the run so far.
    pub fn result(&self) -> SimulationResult {
        let phases = self
            .order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|n| (*id, n.phase())))
            .collect();
        SimulationResult {
            end_time: self.time,
            events_processed: self.events_processed,
            metrics: self.metrics.clone(),
            phases,
            failing_nodes: self.coord.failing_nodes(),
        }
    }

    fn process(&mut self, scheduled: ScheduledEvent) {
        match scheduled.event {
            Event::FrameDelivery { to, from, frame } => {
                if let Some(node) = self.nodes.get_mut(&to) {
                    self.metrics.frames_delivered += 1;
                    node.handle_frame(from, &frame, self.time);
                    self.flush_node(to);
                }
            }
            Event::Wakeup { node } => {
                if self.scheduled_wakeups.get(&node) == Some(&scheduled.time) {
                    self.scheduled_wakeups.remove(&node);
                }
                if let Some(n) = self.nodes.get_mut(&node) {
                    n.handle_wakeup(self.time);
                    self.flush_node(node);
                }
            }
            Event::AppSend { from, to } => {
                if let Some(node) = self.nodes.get_mut(&from) {
                    node.queue_data(to, self.time);
                    self.flush_node(from);
                }
            }
            Event::LinkDown { a, b } => self.topology.set_active(a, b, false),
            Event::LinkUp { a, b } => self.topology.set_active(a, b, true),
            Event::Snapshot => self.record_snapshot(),
        }
    }

    /// Drain a node's outbound queue onto the air and reschedule its wakeup.
    fn flush_node(&mut self, id: NodeId) {
        let frames = match self.nodes.get_mut(&id) {
            Some(node) => node.take_outgoing(),
            None => return,
        };
        for frame in frames {
            self.broadcast(id, frame);
        }
        self.schedule_wakeup(id);
    }

    fn broadcast(&mut self, sender: NodeId, frame: OutboundFrame) {
        self.metrics.frames_sent += 1;
        for neighbour in self.topology.neighbors(sender) {
            let Some(link) = self.topology.link(sender, neighbour) else {
                continue;
            };
            if self.rng.gen::<f64>() < link.loss_rate {
                self.metrics.frames_lost += 1;
                trace!(from = sender, to = neighbour, "frame lost");
                continue;
            }
            let mut delivered = frame.packet.clone();
            delivered.options.rssi = link.rssi;
            let arrival = self.time + frame.airtime + link.delay;
            self.schedule(
                arrival,
                Event::FrameDelivery {
                    to: neighbour,
                    from: sender,
                    frame: delivered,
                },
            );
        }
    }

    fn schedule_wakeup(&mut self, id: NodeId) {
        let Some(at) = self.nodes.get(&id).and_then(|n| n.next_wakeup()) else {
            return;
        };
        let at = at.max(self.time);
        // Skip when an earlier (or equal) wakeup is already queued; it will
        // reschedule on firing.
        if let Some(&pending) = self.scheduled_wakeups.get(&id) {
            if pending >= self.time && pending <= at {
                return;
            }
        }
        self.scheduled_wakeups.insert(id, at);
        self.schedule(at, Event::Wakeup { node: id });
    }

    fn record_snapshot(&mut self) {
        let mut unique = HashMap::new();
        let mut frozen = HashMap::new();
        for id in &self.order {
            if let Some(node) = self.nodes.get(id) {
                unique.insert(*id, node.table().unique_destinations());
                frozen.insert(*id, node.table().frozen());
            }
        }
        self.metrics.snapshots.push(TableSnapshot {
            time: self.time,
            unique_destinations: unique,
            frozen,
        });
    }
}
