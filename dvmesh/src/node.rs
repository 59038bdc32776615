//! The mesh node: timers, send arbitration, duty cycling, state machines.
//!
//! A node is driven entirely from outside: the harness delivers frames via
//! [`MeshNode::handle_frame`], fires [`MeshNode::handle_wakeup`] when the
//! earliest armed timer (exposed through [`MeshNode::next_wakeup`]) is due,
//! and drains [`MeshNode::take_outgoing`] after every call. The node never
//! reads a clock and never sleeps.
//!
//! Two small state machines govern behaviour: `RoutingPhase` walks
//! `Active -> LocallyConverged -> Frozen` (freeze only when enabled) and
//! never walks back; `Liveness` is `Alive -> Failed`, terminal.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::config::Config;
use crate::coord::SharedCoordination;
use crate::error::ConfigError;
use crate::failure::draw_failure_time;
use crate::forward::{classify, Classification, Forwarder, PacketKey};
use crate::protocol::DvEngine;
use crate::stats::NodeStats;
use crate::table::RoutingTable;
use crate::time::{Duration, Timestamp};
use crate::timer::{TimerKind, Timers};
use crate::types::{
    MessageKind, NodeId, Packet, PacketOptions, BROADCAST_ADDRESS,
};

/// How often the table is swept for expired routes.
const EXPIRY_SWEEP: Duration = Duration::from_secs(10);

/// Payload size of an application-level ACK.
const ACK_PAYLOAD_BYTES: u32 = 8;

/// Routing convergence state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPhase {
    /// Still learning the topology.
    Active,
    /// Announced local convergence; table keeps evolving.
    LocallyConverged,
    /// Table frozen: expiry suspended; only improving updates and routes to
    /// previously unknown destinations are accepted.
    Frozen,
}

/// Whether the node still transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// Terminal: receives and accounts, never transmits again.
    Failed,
}

/// A frame this node wants on the air, with its computed airtime.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    pub packet: Packet,
    pub airtime: Duration,
}

/// One traffic class for send arbitration and duty-cycle gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendClass {
    Routing,
    DsdvFull,
    DsdvTriggered,
    Data,
    Forward,
}

impl SendClass {
    fn timer(self) -> TimerKind {
        match self {
            SendClass::Routing => TimerKind::Routing,
            SendClass::DsdvFull => TimerKind::DsdvFull,
            SendClass::DsdvTriggered => TimerKind::DsdvTriggered,
            SendClass::Data => TimerKind::Data,
            SendClass::Forward => TimerKind::Forward,
        }
    }

    fn is_routing(self) -> bool {
        matches!(
            self,
            SendClass::Routing | SendClass::DsdvFull | SendClass::DsdvTriggered
        )
    }
}

/// One wireless mesh node.
pub struct MeshNode {
    id: NodeId,
    cfg: Config,
    table: RoutingTable,
    engine: DvEngine,
    forwarder: Forwarder,
    stats: NodeStats,
    timers: Timers,
    phase: RoutingPhase,
    liveness: Liveness,
    frozen_at: Option<Timestamp>,
    /// Latched when the run-wide stop fired and routing traffic ceased.
    routing_stopped: bool,
    app_ack_received: bool,
    stop_generating_data: bool,
    acked_nodes: HashSet<NodeId>,
    coord: Arc<SharedCoordination>,
    rng: SmallRng,
    /// Own data and acks awaiting a send slot.
    own_queue: VecDeque<Packet>,
    outgoing: Vec<OutboundFrame>,
    duty_cycle_end: Timestamp,
    next_routing_tx: Timestamp,
    next_dsdv_tx: Timestamp,
    next_data_tx: Timestamp,
    next_forward_tx: Timestamp,
    own_data_seq: u32,
    routing_frame_seq: u32,
}

impl MeshNode {
    pub fn new(
        id: NodeId,
        cfg: Config,
        coord: Arc<SharedCoordination>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        coord.register_node(id);
        Ok(MeshNode {
            id,
            table: RoutingTable::for_protocol(cfg.protocol),
            engine: DvEngine::new(cfg.protocol),
            forwarder: Forwarder::new(cfg.forward_buffer_capacity, cfg.forwarded_history_capacity),
            stats: NodeStats::default(),
            timers: Timers::new(),
            phase: RoutingPhase::Active,
            liveness: Liveness::Alive,
            frozen_at: None,
            routing_stopped: false,
            app_ack_received: false,
            stop_generating_data: false,
            acked_nodes: HashSet::new(),
            coord,
            rng: SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
            own_queue: VecDeque::new(),
            outgoing: Vec::new(),
            duty_cycle_end: Timestamp::ZERO,
            next_routing_tx: Timestamp::ZERO,
            next_dsdv_tx: Timestamp::ZERO,
            next_data_tx: Timestamp::ZERO,
            next_forward_tx: Timestamp::ZERO,
            own_data_seq: 0,
            routing_frame_seq: 0,
            cfg,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn phase(&self) -> RoutingPhase {
        self.phase
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn is_failed(&self) -> bool {
        self.liveness == Liveness::Failed
    }

    pub fn frozen_at(&self) -> Option<Timestamp> {
        self.frozen_at
    }

    pub fn acked_nodes(&self) -> &HashSet<NodeId> {
        &self.acked_nodes
    }

    /// Drop routes to relay nodes, keeping end-node destinations only.
    pub fn retain_end_node_routes(&mut self) -> usize {
        self.table.filter_to_end_nodes()
    }

    /// Arm the initial timers. Call once before the first event.
    pub fn initialize(&mut self, now: Timestamp) {
        self.timers.arm(TimerKind::Expiry, now + EXPIRY_SWEEP);

        if self.cfg.protocol == crate::config::Protocol::Dsdv {
            // Desynchronize full dumps across the population.
            let offset =
                Duration::from_micros(self.rng.gen_range(0..=self.cfg.dsdv_full_interval.as_micros()));
            self.timers.arm(TimerKind::DsdvFull, now + offset);
        } else {
            let gap = self.cfg.routing_pacing.sample(&mut self.rng);
            self.timers.arm(TimerKind::Routing, now + gap);
        }

        if let Some(failure) = self.cfg.failure {
            if self.coord.is_failing(self.id, &failure) {
                let at = draw_failure_time(&mut self.rng, &failure);
                self.timers.arm(TimerKind::Failure, at);
                debug!(node = self.id, at = at.as_millis(), "failure scheduled");
            }
        }
    }

    /// Queue an own data packet towards `destination`.
    pub fn queue_data(&mut self, destination: NodeId, now: Timestamp) {
        if self.stop_generating_data || self.is_failed() {
            return;
        }
        self.own_data_seq += 1;
        let pkt = Packet {
            kind: MessageKind::Data,
            source: self.id,
            destination,
            via: BROADCAST_ADDRESS,
            ttl: self.cfg.packet_ttl,
            seq: self.own_data_seq,
            frag_index: 0,
            frag_total: 1,
            payload_bytes: self.cfg.data_packet_bytes,
            departure_time: now,
            routes: Vec::new(),
            full_dump: false,
            options: PacketOptions {
                rssi: 0.0,
                spreading_factor: self.cfg.radio.spreading_factor,
                app_ack_requested: self.cfg.request_app_ack,
                adr_command: false,
            },
        };
        self.own_queue.push_back(pkt);
        if !self.timers.is_armed(TimerKind::Data) {
            let gap = self.cfg.data_pacing.sample(&mut self.rng);
            self.timers.arm(TimerKind::Data, now + gap);
        }
    }

    /// Earliest armed deadline, for the scheduler.
    pub fn next_wakeup(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    /// Frames queued since the last drain.
    pub fn take_outgoing(&mut self) -> Vec<OutboundFrame> {
        std::mem::take(&mut self.outgoing)
    }

    /// Process one received frame. `from` is the transmitting neighbour.
    pub fn handle_frame(&mut self, from: NodeId, pkt: &Packet, now: Timestamp) {
        self.stats.received_packets += 1;
        self.stats.note_rx(now);
        self.engine.note_heard(from, now);

        match pkt.kind {
            MessageKind::Data => self.stats.received_data_packets += 1,
            MessageKind::Ack => self.stats.received_ack_packets += 1,
            MessageKind::Routing => self.stats.received_routing_packets += 1,
            MessageKind::Dsdv => self.stats.received_dsdv_packets += 1,
        }

        match classify(pkt, self.id, self.cfg.route_discovery) {
            Classification::FromMe => {
                self.stats.received_packets_from_me += 1;
            }
            Classification::ForMe => self.handle_for_me(pkt, now),
            Classification::RoutingBroadcast => {
                let changed = self.engine.apply_routing_frame(
                    &mut self.table,
                    &self.cfg,
                    pkt,
                    self.id,
                    now,
                    &mut self.stats,
                );
                if changed {
                    self.after_table_change(now);
                    self.schedule_triggered_update(now);
                }
            }
            Classification::ToForward => self.handle_to_forward(pkt, now),
            Classification::WrongNextHop => {
                if !pkt.is_undirected() {
                    self.stats.unicast_wrong_next_hop_drops += 1;
                    trace!(
                        node = self.id,
                        via = pkt.via,
                        source = pkt.source,
                        "unicast for another relay dropped"
                    );
                }
            }
        }

        if self.cfg.routes_from_data_packets
            && matches!(pkt.kind, MessageKind::Data | MessageKind::Ack)
        {
            let changed = self.engine.learn_neighbour(
                &mut self.table,
                &self.cfg,
                from,
                pkt.options.rssi,
                now,
                &mut self.stats,
            );
            if changed {
                self.after_table_change(now);
            }
        }
    }

    fn handle_for_me(&mut self, pkt: &Packet, now: Timestamp) {
        let key = PacketKey::of(pkt);
        match pkt.kind {
            MessageKind::Data => {
                self.stats.received_data_packets_for_me += 1;
                if self.forwarder.record_delivery(key) {
                    self.stats.received_data_packets_for_me_unique += 1;
                    let latency = now.saturating_sub(pkt.departure_time);
                    self.stats.latency.record(latency);
                    if self.cfg.adr_enabled && pkt.options.adr_command {
                        self.stats.received_adr_commands += 1;
                    }
                    if pkt.options.app_ack_requested && !self.is_failed() {
                        self.queue_ack(pkt, now);
                    }
                }
            }
            MessageKind::Ack => {
                self.stats.received_ack_packets_for_me += 1;
                if self.forwarder.record_delivery(key) {
                    self.stats.received_ack_packets_for_me_unique += 1;
                    self.acked_nodes.insert(pkt.source);
                    self.app_ack_received = true;
                    if self.cfg.stop_on_first_ack {
                        self.stop_generating_data = true;
                    }
                }
            }
            // Routing traffic is never addressed to a single node.
            MessageKind::Routing | MessageKind::Dsdv => {}
        }
    }

    fn handle_to_forward(&mut self, pkt: &Packet, now: Timestamp) {
        match pkt.kind {
            MessageKind::Data => self.stats.received_data_packets_to_forward += 1,
            MessageKind::Ack => self.stats.received_ack_packets_to_forward += 1,
            _ => return,
        }
        if self.forwarder.accept(pkt.clone(), &mut self.stats)
            && !self.is_failed()
            && !self.timers.is_armed(TimerKind::Forward)
        {
            let gap = self.cfg.forward_pacing.sample(&mut self.rng);
            self.timers.arm(TimerKind::Forward, now + gap);
        }
    }

    fn queue_ack(&mut self, data: &Packet, now: Timestamp) {
        let ack = Packet {
            kind: MessageKind::Ack,
            source: self.id,
            destination: data.source,
            via: BROADCAST_ADDRESS,
            ttl: self.cfg.packet_ttl,
            seq: data.seq,
            frag_index: 0,
            frag_total: 1,
            payload_bytes: ACK_PAYLOAD_BYTES,
            departure_time: now,
            routes: Vec::new(),
            full_dump: false,
            options: PacketOptions {
                rssi: 0.0,
                spreading_factor: self.cfg.radio.spreading_factor,
                app_ack_requested: false,
                adr_command: false,
            },
        };
        self.own_queue.push_back(ack);
        if !self.timers.is_armed(TimerKind::Data) {
            let gap = self.cfg.data_pacing.sample(&mut self.rng);
            self.timers.arm(TimerKind::Data, now + gap);
        }
    }

    /// Convergence check after any table mutation.
    fn after_table_change(&mut self, now: Timestamp) {
        if self.phase != RoutingPhase::Active {
            return;
        }
        if self.table.unique_destinations() < self.cfg.convergence_threshold() {
            return;
        }
        // Exactly-once local announcement: leaving Active guards re-entry.
        self.phase = RoutingPhase::LocallyConverged;
        let stop = self.coord.announce_converged(self.id);
        debug!(
            node = self.id,
            destinations = self.table.unique_destinations(),
            "locally converged"
        );
        if self.cfg.convergence.freeze_enabled {
            self.table
                .freeze(now, self.cfg.convergence.freeze_validity_horizon);
            self.frozen_at = Some(now);
            self.phase = RoutingPhase::Frozen;
        }
        if stop.all_converged && self.cfg.convergence.stop_routing_when_all_converged {
            self.stop_routing_traffic();
        }
    }

    fn stop_routing_traffic(&mut self) {
        self.routing_stopped = true;
        self.timers.cancel(TimerKind::Routing);
        self.timers.cancel(TimerKind::DsdvFull);
        self.timers.cancel(TimerKind::DsdvTriggered);
    }

    /// Dispatch every due timer. The harness calls this whenever the time
    /// reported by [`next_wakeup`](Self::next_wakeup) arrives; spurious
    /// wakeups are harmless.
    pub fn handle_wakeup(&mut self, now: Timestamp) {
        if self.timers.take_due(TimerKind::Failure, now) {
            self.fail(now);
        }

        if self.timers.take_due(TimerKind::Expiry, now) {
            let expired = self.table.expire_stale(now);
            self.stats.routes_expired += expired as u64;
            if expired > 0 {
                trace!(node = self.id, expired, "routes expired");
            }
            self.timers.arm(TimerKind::Expiry, now + EXPIRY_SWEEP);
        }

        if self.is_failed() {
            return;
        }

        // Nodes that have not converged themselves also fall silent once
        // the run-wide stop fires.
        if !self.routing_stopped
            && self.cfg.convergence.stop_routing_when_all_converged
            && self.coord.global_stop_fired()
        {
            self.stop_routing_traffic();
        }

        self.dispatch_sends(now);
    }

    /// Serve the due send classes, earliest deadline first, with the
    /// configured priority draws breaking routing/data and own/forward ties.
    fn dispatch_sends(&mut self, now: Timestamp) {
        let mut due: Vec<(Timestamp, SendClass)> = Vec::new();
        for class in [
            SendClass::Routing,
            SendClass::DsdvFull,
            SendClass::DsdvTriggered,
            SendClass::Data,
            SendClass::Forward,
        ] {
            if let Some(deadline) = self.timers.deadline(class.timer()) {
                if deadline <= now {
                    self.timers.cancel(class.timer());
                    due.push((deadline, class));
                }
            }
        }
        if due.is_empty() {
            return;
        }
        due.sort_by_key(|(deadline, _)| *deadline);

        // Priority draws reorder same-deadline contenders.
        if due.len() >= 2 && due[0].0 == due[1].0 {
            let routing_side = due.iter().position(|(_, c)| c.is_routing());
            let data_side = due.iter().position(|(_, c)| !c.is_routing());
            if let (Some(r), Some(d)) = (routing_side, data_side) {
                let routing_first = self.rng.gen_bool(self.cfg.routing_packet_priority);
                if (routing_first && r > d) || (!routing_first && d > r) {
                    due.swap(r, d);
                }
            }
            let own = due.iter().position(|(_, c)| *c == SendClass::Data);
            let fwd = due.iter().position(|(_, c)| *c == SendClass::Forward);
            if let (Some(o), Some(f)) = (own, fwd) {
                let own_first = self.rng.gen_bool(self.cfg.own_data_priority);
                if (own_first && o > f) || (!own_first && f > o) {
                    due.swap(o, f);
                }
            }
        }

        for (_, class) in due {
            self.attempt_send(class, now);
        }
    }

    fn attempt_send(&mut self, class: SendClass, now: Timestamp) {
        if class.is_routing() && self.routing_stopped {
            return;
        }
        let class_gate = match class {
            SendClass::Routing => self.next_routing_tx,
            SendClass::DsdvFull | SendClass::DsdvTriggered => self.next_dsdv_tx,
            SendClass::Data => self.next_data_tx,
            SendClass::Forward => self.next_forward_tx,
        };
        let gate = class_gate.max(self.duty_cycle_end);
        if now < gate {
            // Blocked by the duty cycle; try again when the gate opens.
            self.timers.arm(class.timer(), gate);
            return;
        }
        match class {
            SendClass::Routing => self.send_metric_routing(now),
            SendClass::DsdvFull => self.send_dsdv_full(now),
            SendClass::DsdvTriggered => self.send_dsdv_triggered(now),
            SendClass::Data => self.send_own(now),
            SendClass::Forward => self.send_forward(now),
        }
    }

    fn send_metric_routing(&mut self, now: Timestamp) {
        let routes = self.engine.build_metric_dump(&self.table);
        self.send_routing_frame(MessageKind::Routing, routes, false, now);
        self.stats.sent_routing_packets += 1;
        let gap = self.cfg.routing_pacing.sample(&mut self.rng);
        self.timers.arm(TimerKind::Routing, now + gap);
        self.next_routing_tx = self.duty_cycle_end;
    }

    fn send_dsdv_full(&mut self, now: Timestamp) {
        let routes = self.engine.build_full_dump(&self.table, self.id);
        self.send_routing_frame(MessageKind::Dsdv, routes, true, now);
        self.stats.sent_dsdv_packets += 1;
        self.timers
            .arm(TimerKind::DsdvFull, now + self.cfg.dsdv_full_interval);
        self.next_dsdv_tx = self.duty_cycle_end;
    }

    fn send_dsdv_triggered(&mut self, now: Timestamp) {
        if !self
            .engine
            .triggered_update_ready(now, self.cfg.dsdv_triggered_min_interval)
        {
            return;
        }
        let routes = self.engine.build_incremental(&self.table, now);
        if routes.is_empty() {
            return;
        }
        self.send_routing_frame(MessageKind::Dsdv, routes, false, now);
        self.stats.sent_dsdv_packets += 1;
        self.next_dsdv_tx = self.duty_cycle_end;
    }

    fn send_routing_frame(
        &mut self,
        kind: MessageKind,
        routes: Vec<crate::types::AdvertisedRoute>,
        full_dump: bool,
        now: Timestamp,
    ) {
        self.routing_frame_seq += 1;
        let pkt = Packet {
            kind,
            source: self.id,
            destination: BROADCAST_ADDRESS,
            via: BROADCAST_ADDRESS,
            ttl: 1,
            seq: self.routing_frame_seq,
            frag_index: 0,
            frag_total: 1,
            payload_bytes: self.cfg.routing_packet_bytes,
            departure_time: now,
            routes,
            full_dump,
            options: PacketOptions {
                rssi: 0.0,
                spreading_factor: self.cfg.radio.spreading_factor,
                app_ack_requested: false,
                adr_command: false,
            },
        };
        self.transmit(pkt, now);
    }

    fn send_own(&mut self, now: Timestamp) {
        let Some(mut pkt) = self.own_queue.pop_front() else {
            return;
        };
        match self.table.lookup_next_hop(pkt.destination, now) {
            Some(hop) => {
                pkt.via = hop.via;
                if let Some(sf) = hop.spreading_factor {
                    pkt.options.spreading_factor = sf;
                }
                pkt.departure_time = now;
                match pkt.kind {
                    MessageKind::Ack => self.stats.sent_ack_packets += 1,
                    _ => self.stats.sent_data_packets += 1,
                }
                self.transmit(pkt, now);
                self.next_data_tx = self.duty_cycle_end;
            }
            None if self.cfg.route_discovery => {
                pkt.via = BROADCAST_ADDRESS;
                pkt.departure_time = now;
                self.stats.unicast_fallback_broadcasts += 1;
                self.stats.broadcast_data_packets += 1;
                match pkt.kind {
                    MessageKind::Ack => self.stats.sent_ack_packets += 1,
                    _ => self.stats.sent_data_packets += 1,
                }
                self.transmit(pkt, now);
                self.next_data_tx = self.duty_cycle_end;
            }
            None => {
                self.stats.unicast_no_route_drops += 1;
                trace!(
                    node = self.id,
                    destination = pkt.destination,
                    "own packet dropped, no route"
                );
            }
        }
        if !self.own_queue.is_empty() {
            let gap = self.cfg.data_pacing.sample(&mut self.rng);
            self.timers.arm(TimerKind::Data, now + gap);
        }
    }

    fn send_forward(&mut self, now: Timestamp) {
        let Some(mut pkt) = self.forwarder.pop_pending() else {
            return;
        };
        let key = PacketKey::of(&pkt);
        match self.table.lookup_next_hop(pkt.destination, now) {
            Some(hop) => {
                pkt.via = hop.via;
                if let Some(sf) = hop.spreading_factor {
                    pkt.options.spreading_factor = sf;
                }
                self.record_forward_sent(&pkt, key, now);
            }
            None if self.cfg.route_discovery => {
                pkt.via = BROADCAST_ADDRESS;
                self.stats.unicast_fallback_broadcasts += 1;
                self.stats.broadcast_forwarded_packets += 1;
                self.record_forward_sent(&pkt, key, now);
            }
            None => {
                self.stats.forward_no_route_drops += 1;
            }
        }
        if self.forwarder.has_pending() {
            let gap = self.cfg.forward_pacing.sample(&mut self.rng);
            self.timers.arm(TimerKind::Forward, now + gap);
        }
    }

    fn record_forward_sent(&mut self, pkt: &Packet, key: PacketKey, now: Timestamp) {
        self.forwarder.record_forwarded(key);
        self.stats.forwarded_packets += 1;
        match pkt.kind {
            MessageKind::Ack => self.stats.forwarded_ack_packets += 1,
            _ => self.stats.forwarded_data_packets += 1,
        }
        self.transmit(pkt.clone(), now);
        self.next_forward_tx = self.duty_cycle_end;
    }

    /// Hand a frame to the radio, advancing the duty-cycle gate.
    fn transmit(&mut self, pkt: Packet, now: Timestamp) {
        let airtime = self
            .cfg
            .radio
            .time_on_air(pkt.payload_bytes, pkt.options.spreading_factor);
        let budget = if self.cfg.enforce_duty_cycle {
            Duration::from_secs_f64(airtime.as_secs_f64() / self.cfg.duty_cycle)
        } else {
            airtime
        };
        self.duty_cycle_end = now + budget;
        self.stats.sent_packets += 1;
        self.stats.note_tx(now);
        self.outgoing.push(OutboundFrame {
            packet: pkt,
            airtime,
        });
    }

    fn fail(&mut self, now: Timestamp) {
        self.liveness = Liveness::Failed;
        self.timers.cancel(TimerKind::Routing);
        self.timers.cancel(TimerKind::DsdvFull);
        self.timers.cancel(TimerKind::DsdvTriggered);
        self.timers.cancel(TimerKind::Data);
        self.timers.cancel(TimerKind::Forward);
        self.own_queue.clear();
        debug!(node = self.id, at = now.as_millis(), "node failed");
    }

    /// Table changes made by routing frames may leave a pending triggered
    /// update; arm its timer when the protocol calls for one.
    pub fn schedule_triggered_update(&mut self, now: Timestamp) {
        if self.cfg.protocol == crate::config::Protocol::Dsdv
            && self.engine.has_changes()
            && !self.routing_stopped
            && !self.is_failed()
            && !self.timers.is_armed(TimerKind::DsdvTriggered)
        {
            self.timers.arm(
                TimerKind::DsdvTriggered,
                now + self.cfg.dsdv_triggered_min_interval,
            );
        }
    }
}
