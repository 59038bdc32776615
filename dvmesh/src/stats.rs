//! Per-node traffic counters.
//!
//! Counter names follow the classification the forwarder performs: received
//! traffic splits into for-me / from-me / to-forward, and to-forward further
//! into correct / expired / unique. Drops always increment exactly one
//! counter, so the sums stay reconcilable after a run.

use crate::time::{Duration, Timestamp};

/// Everything a node counts over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStats {
    // Transmitted frames by class.
    pub sent_packets: u64,
    pub sent_data_packets: u64,
    pub sent_ack_packets: u64,
    pub sent_routing_packets: u64,
    pub sent_dsdv_packets: u64,
    pub forwarded_packets: u64,
    pub forwarded_data_packets: u64,
    pub forwarded_ack_packets: u64,
    /// Own data that left without a named next hop (legacy discovery only).
    pub broadcast_data_packets: u64,
    /// Forwarded frames that left undirected (legacy discovery only).
    pub broadcast_forwarded_packets: u64,

    // Received frames by class.
    pub received_packets: u64,
    pub received_routing_packets: u64,
    pub received_dsdv_packets: u64,
    pub received_data_packets: u64,
    pub received_data_packets_for_me: u64,
    pub received_data_packets_for_me_unique: u64,
    pub received_ack_packets: u64,
    pub received_ack_packets_for_me: u64,
    pub received_ack_packets_for_me_unique: u64,
    /// Echoes of frames this node originated.
    pub received_packets_from_me: u64,
    /// Link ADR commands accepted in for-me data frames.
    pub received_adr_commands: u64,

    // Forwarding pipeline.
    pub received_data_packets_to_forward: u64,
    pub received_data_packets_to_forward_correct: u64,
    pub received_data_packets_to_forward_expired: u64,
    pub received_data_packets_to_forward_unique: u64,
    pub received_ack_packets_to_forward: u64,
    pub received_ack_packets_to_forward_correct: u64,
    pub received_ack_packets_to_forward_expired: u64,
    pub received_ack_packets_to_forward_unique: u64,
    /// Duplicates suppressed against history and pending buffer.
    pub forward_packets_duplicate_avoid: u64,
    /// Unique forward candidates dropped because the buffer was full.
    pub forward_buffer_full: u64,

    /// Frames dropped for malformed metric or fragment fields.
    pub malformed_drops: u64,

    // Strict-unicast accounting.
    pub unicast_no_route_drops: u64,
    pub unicast_wrong_next_hop_drops: u64,
    /// Nonzero only when the legacy discovery fallback is enabled.
    pub unicast_fallback_broadcasts: u64,
    /// Relay candidates whose route vanished before the send slot.
    pub forward_no_route_drops: u64,

    // Routing table churn.
    pub routes_installed: u64,
    pub routes_replaced: u64,
    pub routes_expired: u64,
    pub stale_seq_rejects: u64,

    // Timeline.
    pub first_tx: Option<Timestamp>,
    pub last_tx: Option<Timestamp>,
    pub first_rx: Option<Timestamp>,
    pub last_rx: Option<Timestamp>,

    pub latency: LatencyStats,
}

impl NodeStats {
    pub fn note_tx(&mut self, now: Timestamp) {
        if self.first_tx.is_none() {
            self.first_tx = Some(now);
        }
        self.last_tx = Some(now);
    }

    pub fn note_rx(&mut self, now: Timestamp) {
        if self.first_rx.is_none() {
            self.first_rx = Some(now);
        }
        self.last_rx = Some(now);
    }
}

/// End-to-end latency aggregate over uniquely delivered for-me data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub sum: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl LatencyStats {
    pub fn record(&mut self, latency: Duration) {
        self.count += 1;
        self.sum += latency;
        self.min = Some(self.min.map_or(latency, |m| m.min(latency)));
        self.max = Some(self.max.map_or(latency, |m| m.max(latency)));
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            None
        } else {
            Some(Duration::from_micros(self.sum.as_micros() / self.count))
        }
    }
}
