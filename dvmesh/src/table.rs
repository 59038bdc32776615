//! Routing table store.
//!
//! Three route shapes share one generic table: plain single-metric routes,
//! dual-metric routes ranked lexicographically, and sequenced routes whose
//! freshness (a destination-owned sequence number) strictly dominates the
//! metric. [`RoutingTable`] is the tagged variant the node holds; it
//! dispatches the mode-independent operations to the generic [`Table`].
//!
//! Ranking lives in [`Route::better_than`] so that insertion, lookup and the
//! freeze acceptance rule all agree on what "better" means.

use crate::time::{Duration, Timestamp};
use crate::types::{NodeId, END_NODE_ID_BASE, INFINITE_METRIC};
use crate::config::Protocol;

/// Rolling window of routing-advertisement receptions over one link.
///
/// Each slot records whether the expected advertisement was heard. The ETX
/// metric reads the window as `len / heard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryWindow {
    bits: u32,
    len: u8,
    cap: u8,
}

impl DeliveryWindow {
    pub fn new(cap: usize) -> Self {
        debug_assert!(cap >= 1 && cap <= 32);
        DeliveryWindow {
            bits: 0,
            len: 0,
            cap: cap as u8,
        }
    }

    fn mask(&self) -> u32 {
        if self.cap == 32 {
            u32::MAX
        } else {
            (1u32 << self.cap) - 1
        }
    }

    /// Record one expected advertisement slot.
    pub fn record(&mut self, heard: bool) {
        self.bits = ((self.bits << 1) | heard as u32) & self.mask();
        self.len = (self.len + 1).min(self.cap);
    }

    /// Record `n` consecutive missed slots (sequence-number gap).
    pub fn record_missed(&mut self, n: u32) {
        if n >= self.cap as u32 {
            self.bits = 0;
            self.len = self.cap;
        } else {
            self.bits = (self.bits << n) & self.mask();
            self.len = (self.len as u32 + n).min(self.cap as u32) as u8;
        }
    }

    pub fn heard(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Expected transmissions for one delivery over this link.
    pub fn expected_tx(&self) -> f64 {
        if self.heard() == 0 {
            f64::INFINITY
        } else {
            self.len as f64 / self.heard() as f64
        }
    }
}

/// Common surface over the three route shapes.
pub trait Route {
    fn destination(&self) -> NodeId;
    fn next_hop(&self) -> NodeId;
    fn valid_until(&self) -> Timestamp;
    fn set_valid_until(&mut self, t: Timestamp);

    /// Whether the route may carry traffic at all. Sequenced routes go
    /// invalid when marked unreachable; the others are valid until expiry.
    fn is_valid(&self) -> bool {
        true
    }

    /// Strict ranking against another route for the same destination.
    fn better_than(&self, other: &Self) -> bool;
}

/// Route ranked by one scalar metric.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleMetricRoute {
    pub destination: NodeId,
    pub via: NodeId,
    pub metric: f64,
    pub valid_until: Timestamp,
    pub installed_at: Timestamp,
    pub window: DeliveryWindow,
}

impl Route for SingleMetricRoute {
    fn destination(&self) -> NodeId {
        self.destination
    }

    fn next_hop(&self) -> NodeId {
        self.via
    }

    fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    fn set_valid_until(&mut self, t: Timestamp) {
        self.valid_until = t;
    }

    fn better_than(&self, other: &Self) -> bool {
        if self.metric != other.metric {
            self.metric < other.metric
        } else {
            self.valid_until > other.valid_until
        }
    }
}

/// Route ranked lexicographically by `(primary, secondary)`, carrying the
/// spreading factor the next hop listens on.
#[derive(Debug, Clone, PartialEq)]
pub struct DualMetricRoute {
    pub destination: NodeId,
    pub via: NodeId,
    pub spreading_factor: u8,
    pub primary: f64,
    pub secondary: f64,
    pub valid_until: Timestamp,
    pub installed_at: Timestamp,
    pub window: DeliveryWindow,
}

impl Route for DualMetricRoute {
    fn destination(&self) -> NodeId {
        self.destination
    }

    fn next_hop(&self) -> NodeId {
        self.via
    }

    fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    fn set_valid_until(&mut self, t: Timestamp) {
        self.valid_until = t;
    }

    fn better_than(&self, other: &Self) -> bool {
        if self.primary != other.primary {
            return self.primary < other.primary;
        }
        if self.secondary != other.secondary {
            return self.secondary < other.secondary;
        }
        self.valid_until > other.valid_until
    }
}

/// Route whose freshness strictly dominates its metric. The sequence number
/// is owned by the destination; only the destination ever creates a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedRoute {
    pub destination: NodeId,
    pub via: NodeId,
    pub metric: u32,
    pub seq: u32,
    pub valid_until: Timestamp,
    pub installed_at: Timestamp,
}

impl Route for SequencedRoute {
    fn destination(&self) -> NodeId {
        self.destination
    }

    fn next_hop(&self) -> NodeId {
        self.via
    }

    fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    fn set_valid_until(&mut self, t: Timestamp) {
        self.valid_until = t;
    }

    fn is_valid(&self) -> bool {
        self.metric < INFINITE_METRIC
    }

    fn better_than(&self, other: &Self) -> bool {
        if self.seq != other.seq {
            return self.seq > other.seq;
        }
        self.metric < other.metric
    }
}

/// Outcome of an insert attempt, for counter bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Installed,
    Replaced,
    Rejected,
}

/// Generic route store, linear over a small entry set.
#[derive(Debug, Clone, Default)]
pub struct Table<R> {
    entries: Vec<R>,
    frozen: bool,
}

impl<R: Route> Table<R> {
    pub fn new() -> Self {
        Table {
            entries: Vec::new(),
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.entries.iter_mut()
    }

    pub fn entry(&self, destination: NodeId, via: NodeId) -> Option<&R> {
        self.entries
            .iter()
            .find(|r| r.destination() == destination && r.next_hop() == via)
    }

    pub fn entry_mut(&mut self, destination: NodeId, via: NodeId) -> Option<&mut R> {
        self.entries
            .iter_mut()
            .find(|r| r.destination() == destination && r.next_hop() == via)
    }

    pub fn entry_for_destination(&self, destination: NodeId) -> Option<&R> {
        self.best_index(destination).map(|i| &self.entries[i])
    }

    pub fn entry_for_destination_mut(&mut self, destination: NodeId) -> Option<&mut R> {
        let i = self.best_index(destination)?;
        Some(&mut self.entries[i])
    }

    fn best_index(&self, destination: NodeId) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, route) in self.entries.iter().enumerate() {
            if route.destination() != destination {
                continue;
            }
            match best {
                None => best = Some(i),
                Some(b) if route.better_than(&self.entries[b]) => best = Some(i),
                _ => {}
            }
        }
        best
    }

    /// Insert or update a route.
    ///
    /// With `best_only` the table keeps a single entry per destination and a
    /// candidate must outrank the incumbent to replace it. Otherwise entries
    /// are keyed by `(destination, via)` and a repeat advertisement through
    /// the same neighbour refreshes the pair in place.
    ///
    /// A frozen table only accepts candidates that outrank an existing entry
    /// for the same destination, or that reach a destination it has never
    /// seen.
    pub fn insert_or_update(&mut self, route: R, best_only: bool) -> Upsert {
        if best_only {
            return match self.best_index(route.destination()) {
                None => {
                    // A destination first heard of after the freeze is
                    // still news.
                    self.entries.push(route);
                    Upsert::Installed
                }
                Some(i) => {
                    if route.better_than(&self.entries[i]) {
                        self.entries[i] = route;
                        Upsert::Replaced
                    } else {
                        Upsert::Rejected
                    }
                }
            };
        }

        let existing = self
            .entries
            .iter()
            .position(|r| r.destination() == route.destination() && r.next_hop() == route.next_hop());
        match existing {
            Some(i) => {
                if self.frozen && !route.better_than(&self.entries[i]) {
                    return Upsert::Rejected;
                }
                self.entries[i] = route;
                Upsert::Replaced
            }
            None => {
                // New vias for destinations the frozen table already covers
                // stay out; unknown destinations get in.
                if self.frozen && self.best_index(route.destination()).is_some() {
                    Upsert::Rejected
                } else {
                    self.entries.push(route);
                    Upsert::Installed
                }
            }
        }
    }

    /// Best valid, unexpired route towards `destination`.
    pub fn lookup(&self, destination: NodeId, now: Timestamp) -> Option<&R> {
        let mut best: Option<&R> = None;
        for route in &self.entries {
            if route.destination() != destination || !route.is_valid() {
                continue;
            }
            if !self.frozen && route.valid_until() < now {
                continue;
            }
            match best {
                None => best = Some(route),
                Some(b) if route.better_than(b) => best = Some(route),
                _ => {}
            }
        }
        best
    }

    /// Drop expired entries. Suspended entirely while frozen.
    pub fn expire_stale(&mut self, now: Timestamp) -> usize {
        if self.frozen {
            return 0;
        }
        let before = self.entries.len();
        self.entries.retain(|r| r.valid_until() >= now);
        before - self.entries.len()
    }

    /// Freeze the table: extend every valid route's lifetime to at least
    /// `now + horizon` and stop expiring.
    pub fn freeze(&mut self, now: Timestamp, horizon: Duration) {
        self.frozen = true;
        let floor = now + horizon;
        for route in &mut self.entries {
            if route.is_valid() && route.valid_until() < floor {
                route.set_valid_until(floor);
            }
        }
    }

    /// Keep only routes towards end nodes.
    pub fn filter_to_end_nodes(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|r| r.destination() >= END_NODE_ID_BASE);
        before - self.entries.len()
    }

    /// Distinct destinations with a valid route, for convergence detection.
    pub fn unique_destinations(&self) -> usize {
        let mut seen: Vec<NodeId> = self
            .entries
            .iter()
            .filter(|r| r.is_valid())
            .map(|r| r.destination())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// Next-hop answer from a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    pub via: NodeId,
    /// Spreading factor to transmit with, known in dual-metric mode only.
    pub spreading_factor: Option<u8>,
}

/// The table a node actually holds: tagged by protocol mode.
#[derive(Debug, Clone)]
pub enum RoutingTable {
    Single(Table<SingleMetricRoute>),
    Dual(Table<DualMetricRoute>),
    Sequenced(Table<SequencedRoute>),
}

impl RoutingTable {
    pub fn for_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::SingleMetric(_) => RoutingTable::Single(Table::new()),
            Protocol::DualMetric(_) => RoutingTable::Dual(Table::new()),
            Protocol::Dsdv => RoutingTable::Sequenced(Table::new()),
        }
    }

    pub fn lookup_next_hop(&self, destination: NodeId, now: Timestamp) -> Option<NextHop> {
        match self {
            RoutingTable::Single(t) => t.lookup(destination, now).map(|r| NextHop {
                via: r.via,
                spreading_factor: None,
            }),
            RoutingTable::Dual(t) => t.lookup(destination, now).map(|r| NextHop {
                via: r.via,
                spreading_factor: Some(r.spreading_factor),
            }),
            RoutingTable::Sequenced(t) => t.lookup(destination, now).map(|r| NextHop {
                via: r.via,
                spreading_factor: None,
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RoutingTable::Single(t) => t.len(),
            RoutingTable::Dual(t) => t.len(),
            RoutingTable::Sequenced(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frozen(&self) -> bool {
        match self {
            RoutingTable::Single(t) => t.frozen(),
            RoutingTable::Dual(t) => t.frozen(),
            RoutingTable::Sequenced(t) => t.frozen(),
        }
    }

    pub fn unique_destinations(&self) -> usize {
        match self {
            RoutingTable::Single(t) => t.unique_destinations(),
            RoutingTable::Dual(t) => t.unique_destinations(),
            RoutingTable::Sequenced(t) => t.unique_destinations(),
        }
    }

    pub fn expire_stale(&mut self, now: Timestamp) -> usize {
        match self {
            RoutingTable::Single(t) => t.expire_stale(now),
            RoutingTable::Dual(t) => t.expire_stale(now),
            RoutingTable::Sequenced(t) => t.expire_stale(now),
        }
    }

    pub fn freeze(&mut self, now: Timestamp, horizon: Duration) {
        match self {
            RoutingTable::Single(t) => t.freeze(now, horizon),
            RoutingTable::Dual(t) => t.freeze(now, horizon),
            RoutingTable::Sequenced(t) => t.freeze(now, horizon),
        }
    }

    pub fn filter_to_end_nodes(&mut self) -> usize {
        match self {
            RoutingTable::Single(t) => t.filter_to_end_nodes(),
            RoutingTable::Dual(t) => t.filter_to_end_nodes(),
            RoutingTable::Sequenced(t) => t.filter_to_end_nodes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(dest: NodeId, via: NodeId, metric: f64, valid_secs: u64) -> SingleMetricRoute {
        SingleMetricRoute {
            destination: dest,
            via,
            metric,
            valid_until: Timestamp::from_secs(valid_secs),
            installed_at: Timestamp::ZERO,
            window: DeliveryWindow::new(16),
        }
    }

    fn sequenced(dest: NodeId, via: NodeId, metric: u32, seq: u32) -> SequencedRoute {
        SequencedRoute {
            destination: dest,
            via,
            metric,
            seq,
            valid_until: Timestamp::from_secs(600),
            installed_at: Timestamp::ZERO,
        }
    }

    #[test]
    fn test_delivery_window_etx() {
        let mut w = DeliveryWindow::new(4);
        assert_eq!(w.expected_tx(), f64::INFINITY);
        w.record(true);
        w.record(true);
        assert_eq!(w.expected_tx(), 1.0);
        w.record(false);
        w.record(false);
        assert_eq!(w.expected_tx(), 2.0);
        // Window saturates at its capacity.
        w.record_missed(10);
        assert_eq!(w.len(), 4);
        assert_eq!(w.heard(), 0);
    }

    #[test]
    fn test_pairwise_insert_and_refresh() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        assert_eq!(t.insert_or_update(single(5, 1, 3.0, 100), false), Upsert::Installed);
        assert_eq!(t.insert_or_update(single(5, 2, 2.0, 100), false), Upsert::Installed);
        // Same (destination, via) pair refreshes in place.
        assert_eq!(t.insert_or_update(single(5, 1, 1.0, 200), false), Upsert::Replaced);
        assert_eq!(t.len(), 2);
        let hop = t.lookup(5, Timestamp::ZERO).map(|r| r.via);
        assert_eq!(hop, Some(1));
    }

    #[test]
    fn test_best_only_keeps_single_entry() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        assert_eq!(t.insert_or_update(single(5, 1, 3.0, 100), true), Upsert::Installed);
        assert_eq!(t.insert_or_update(single(5, 2, 2.0, 100), true), Upsert::Replaced);
        assert_eq!(t.insert_or_update(single(5, 3, 4.0, 100), true), Upsert::Rejected);
        assert_eq!(t.len(), 1);
        assert_eq!(t.lookup(5, Timestamp::ZERO).map(|r| r.via), Some(2));
    }

    #[test]
    fn test_equal_metric_later_validity_wins() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(5, 1, 2.0, 100), true);
        assert_eq!(t.insert_or_update(single(5, 2, 2.0, 300), true), Upsert::Replaced);
        assert_eq!(t.lookup(5, Timestamp::ZERO).map(|r| r.via), Some(2));
    }

    #[test]
    fn test_lookup_skips_expired() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(5, 1, 1.0, 10), false);
        t.insert_or_update(single(5, 2, 5.0, 100), false);
        let hop = t.lookup(5, Timestamp::from_secs(50)).map(|r| r.via);
        assert_eq!(hop, Some(2));
    }

    #[test]
    fn test_expire_stale_removes_and_counts() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(5, 1, 1.0, 10), false);
        t.insert_or_update(single(6, 1, 1.0, 100), false);
        assert_eq!(t.expire_stale(Timestamp::from_secs(50)), 1);
        assert_eq!(t.len(), 1);
        assert_eq!(t.unique_destinations(), 1);
    }

    #[test]
    fn test_freeze_extends_validity_and_suspends_expiry() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(5, 1, 1.0, 10), false);
        t.freeze(Timestamp::from_secs(8), Duration::from_secs(100));
        assert!(t.frozen());
        assert_eq!(
            t.iter().next().map(|r| r.valid_until),
            Some(Timestamp::from_secs(108))
        );
        assert_eq!(t.expire_stale(Timestamp::from_secs(1_000)), 0);
        assert_eq!(t.len(), 1);
        // Frozen lookup still answers past the original validity.
        assert!(t.lookup(5, Timestamp::from_secs(500)).is_some());
    }

    #[test]
    fn test_frozen_table_rejects_worse_accepts_better() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(5, 1, 2.0, 100), true);
        t.freeze(Timestamp::ZERO, Duration::from_secs(50));
        assert_eq!(t.insert_or_update(single(5, 2, 9.0, 100), true), Upsert::Rejected);
        assert_eq!(t.insert_or_update(single(5, 2, 1.0, 100), true), Upsert::Replaced);
    }

    #[test]
    fn test_frozen_table_accepts_unknown_destination() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(5, 1, 2.0, 100), true);
        t.freeze(Timestamp::ZERO, Duration::from_secs(50));
        assert_eq!(t.insert_or_update(single(7, 2, 1.0, 100), true), Upsert::Installed);
        assert!(t.lookup(7, Timestamp::ZERO).is_some());

        // Pair mode: new vias for known destinations stay out, unknown
        // destinations still get in.
        let mut p: Table<SingleMetricRoute> = Table::new();
        p.insert_or_update(single(5, 1, 2.0, 100), false);
        p.freeze(Timestamp::ZERO, Duration::from_secs(50));
        assert_eq!(p.insert_or_update(single(5, 2, 1.0, 100), false), Upsert::Rejected);
        assert_eq!(p.insert_or_update(single(8, 2, 1.0, 100), false), Upsert::Installed);
    }

    #[test]
    fn test_sequenced_freshness_dominates_metric() {
        let newer_worse = sequenced(5, 2, 9, 6);
        let older_better = sequenced(5, 1, 1, 4);
        assert!(newer_worse.better_than(&older_better));
        assert!(!older_better.better_than(&newer_worse));

        let equal_seq_better = sequenced(5, 3, 1, 6);
        assert!(equal_seq_better.better_than(&newer_worse));
    }

    #[test]
    fn test_sequenced_unreachable_is_invalid() {
        let mut t: Table<SequencedRoute> = Table::new();
        t.insert_or_update(sequenced(5, 1, INFINITE_METRIC, 7), true);
        assert!(t.lookup(5, Timestamp::ZERO).is_none());
        assert_eq!(t.unique_destinations(), 0);
    }

    #[test]
    fn test_filter_to_end_nodes() {
        let mut t: Table<SingleMetricRoute> = Table::new();
        t.insert_or_update(single(3, 1, 1.0, 100), false);
        t.insert_or_update(single(END_NODE_ID_BASE + 1, 1, 1.0, 100), false);
        assert_eq!(t.filter_to_end_nodes(), 1);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_dual_metric_lexicographic() {
        let a = DualMetricRoute {
            destination: 5,
            via: 1,
            spreading_factor: 7,
            primary: 1.0,
            secondary: 9.0,
            valid_until: Timestamp::from_secs(100),
            installed_at: Timestamp::ZERO,
            window: DeliveryWindow::new(16),
        };
        let mut b = a.clone();
        b.via = 2;
        b.primary = 2.0;
        b.secondary = 0.0;
        // Lower primary wins regardless of secondary.
        assert!(a.better_than(&b));
        b.primary = 1.0;
        assert!(b.better_than(&a));
    }

    #[test]
    fn test_routing_table_dispatch() {
        let mut table = RoutingTable::for_protocol(Protocol::Dsdv);
        if let RoutingTable::Sequenced(t) = &mut table {
            t.insert_or_update(sequenced(5, 2, 2, 10), true);
        }
        let hop = table.lookup_next_hop(5, Timestamp::ZERO);
        assert_eq!(
            hop,
            Some(NextHop {
                via: 2,
                spreading_factor: None
            })
        );
        assert_eq!(table.unique_destinations(), 1);
    }
}
