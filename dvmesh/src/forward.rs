//! Packet classification and the forwarding pipeline.
//!
//! Classification is a pure function over the frame header. Everything
//! stateful (duplicate suppression, the bounded pending buffer, delivery
//! uniqueness) lives in [`Forwarder`].
//!
//! Unicast is strict: a data or ack frame is forwardable only when this node
//! is the named `via`. Frames heard because radio is broadcast but naming
//! another relay are dropped and counted, never forwarded.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::stats::NodeStats;
use crate::types::{MessageKind, NodeId, Packet};

/// What a received frame means to this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Echo of a frame this node originated.
    FromMe,
    /// Addressed to this node.
    ForMe,
    /// Routing traffic, consumed by every listener.
    RoutingBroadcast,
    /// This node is expected to relay it.
    ToForward,
    /// Unicast naming some other relay (or undirected data while the
    /// discovery fallback is off): heard, dropped, counted.
    WrongNextHop,
}

/// Classify a received frame. `route_discovery` admits undirected data for
/// forwarding (legacy flooding); strict operation leaves it off.
pub fn classify(pkt: &Packet, self_id: NodeId, route_discovery: bool) -> Classification {
    if pkt.source == self_id {
        return Classification::FromMe;
    }
    if pkt.destination == self_id {
        return Classification::ForMe;
    }
    if matches!(pkt.kind, MessageKind::Routing | MessageKind::Dsdv) {
        return Classification::RoutingBroadcast;
    }
    if pkt.via == self_id {
        return Classification::ToForward;
    }
    if pkt.is_undirected() && route_discovery {
        return Classification::ToForward;
    }
    Classification::WrongNextHop
}

/// Identity of a packet for duplicate suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketKey {
    pub kind: MessageKind,
    pub source: NodeId,
    pub destination: NodeId,
    pub seq: u32,
}

impl PacketKey {
    pub fn of(pkt: &Packet) -> Self {
        PacketKey {
            kind: pkt.kind,
            source: pkt.source,
            destination: pkt.destination,
            seq: pkt.seq,
        }
    }
}

/// Bounded FIFO of packet keys with O(1) membership.
#[derive(Debug, Default)]
struct KeyHistory {
    order: VecDeque<PacketKey>,
    set: HashSet<PacketKey>,
    capacity: usize,
}

impl KeyHistory {
    fn new(capacity: usize) -> Self {
        KeyHistory {
            order: VecDeque::new(),
            set: HashSet::new(),
            capacity,
        }
    }

    fn contains(&self, key: &PacketKey) -> bool {
        self.set.contains(key)
    }

    /// Insert, evicting the oldest entry at capacity. Returns false when the
    /// key was already present.
    fn insert(&mut self, key: PacketKey) -> bool {
        if !self.set.insert(key) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.set.remove(&evicted);
            }
        }
        true
    }

    fn remove(&mut self, key: &PacketKey) {
        if self.set.remove(key) {
            self.order.retain(|k| k != key);
        }
    }
}

/// The forwarding pipeline state of one node.
#[derive(Debug)]
pub struct Forwarder {
    /// Frames accepted for relaying, waiting for a send slot.
    pending: VecDeque<Packet>,
    pending_keys: HashSet<PacketKey>,
    /// Frames already relayed, for duplicate suppression.
    forwarded: KeyHistory,
    /// For-me deliveries already seen, for uniqueness accounting.
    delivered: KeyHistory,
    capacity: usize,
}

impl Forwarder {
    pub fn new(capacity: usize, history_capacity: usize) -> Self {
        Forwarder {
            pending: VecDeque::new(),
            pending_keys: HashSet::new(),
            forwarded: KeyHistory::new(history_capacity),
            delivered: KeyHistory::new(history_capacity),
            capacity,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Run a to-forward frame through expiry, duplicate suppression and the
    /// bounded buffer. Returns true when the frame was queued.
    pub fn accept(&mut self, mut pkt: Packet, stats: &mut NodeStats) -> bool {
        let is_ack = pkt.kind == MessageKind::Ack;
        if is_ack {
            stats.received_ack_packets_to_forward_correct += 1;
        } else {
            stats.received_data_packets_to_forward_correct += 1;
        }

        if pkt.ttl <= 1 {
            if is_ack {
                stats.received_ack_packets_to_forward_expired += 1;
            } else {
                stats.received_data_packets_to_forward_expired += 1;
            }
            return false;
        }

        let key = PacketKey::of(&pkt);
        if self.forwarded.contains(&key) || self.pending_keys.contains(&key) {
            stats.forward_packets_duplicate_avoid += 1;
            return false;
        }

        if is_ack {
            stats.received_ack_packets_to_forward_unique += 1;
        } else {
            stats.received_data_packets_to_forward_unique += 1;
        }

        if self.pending.len() >= self.capacity {
            stats.forward_buffer_full += 1;
            return false;
        }

        pkt.ttl -= 1;
        self.pending_keys.insert(key);
        self.pending.push_back(pkt);
        true
    }

    /// Next frame due for relaying, oldest first.
    pub fn pop_pending(&mut self) -> Option<Packet> {
        let pkt = self.pending.pop_front()?;
        self.pending_keys.remove(&PacketKey::of(&pkt));
        Some(pkt)
    }

    /// Remember a frame as relayed so later copies are suppressed.
    pub fn record_forwarded(&mut self, key: PacketKey) {
        self.forwarded.insert(key);
    }

    /// Record a for-me delivery. Returns true the first time this packet
    /// identity is seen.
    pub fn record_delivery(&mut self, key: PacketKey) -> bool {
        self.delivered.insert(key)
    }

    /// Forget a specific relayed frame (test hook and table-reset support).
    pub fn forget_forwarded(&mut self, key: &PacketKey) {
        self.forwarded.remove(key);
    }
}
