//! Event queue types.
//!
//! Events are ordered by `(time, seq)`: the sequence number is assigned at
//! scheduling time, so same-time events pop in insertion order and a run is
//! fully determined by its seed and scenario. No protocol invariant may rely
//! on that tiebreak.

use std::cmp::Ordering;

use dvmesh::{NodeId, Packet, Timestamp};

/// Monotonic per-simulation sequence number.
pub type SequenceNumber = u64;

/// What can happen in the simulated world.
#[derive(Debug, Clone)]
pub enum Event {
    /// A frame arrives at a node's radio.
    FrameDelivery {
        to: NodeId,
        from: NodeId,
        frame: Packet,
    },
    /// A node's earliest timer deadline arrives.
    Wakeup { node: NodeId },
    /// The application on `from` queues a data packet towards `to`.
    AppSend { from: NodeId, to: NodeId },
    /// Scenario actions.
    LinkDown { a: NodeId, b: NodeId },
    LinkUp { a: NodeId, b: NodeId },
    /// Record a table snapshot across all nodes.
    Snapshot,
}

/// An event with its place in the timeline.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time: Timestamp,
    pub seq: SequenceNumber,
    pub event: Event,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed so the std max-heap pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn ev(time_ms: u64, seq: SequenceNumber) -> ScheduledEvent {
        ScheduledEvent {
            time: Timestamp::from_millis(time_ms),
            seq,
            event: Event::Snapshot,
        }
    }

    #[test]
    fn test_heap_pops_earliest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(ev(30, 0));
        heap.push(ev(10, 1));
        heap.push(ev(20, 2));
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop())
            .map(|e| e.time.as_millis())
            .collect();
        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn test_same_time_pops_in_insertion_order() {
        let mut heap = BinaryHeap::new();
        heap.push(ev(10, 5));
        heap.push(ev(10, 3));
        heap.push(ev(10, 4));
        let order: Vec<SequenceNumber> = std::iter::from_fn(|| heap.pop()).map(|e| e.seq).collect();
        assert_eq!(order, vec![3, 4, 5]);
    }
}
