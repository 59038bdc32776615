//! Distance-vector protocol engine.
//!
//! One engine drives all three protocol modes. Advertisements are applied
//! entry by entry against the routing table; in sequenced mode the rules are
//! strict and ordered:
//!
//! 1. entries about this node are dropped,
//! 2. malformed entries are dropped,
//! 3. a strictly newer sequence number installs, whatever its metric,
//! 4. an equal sequence number installs only with a strictly better metric,
//! 5. an older sequence number is dropped, whatever its metric.
//!
//! Installs and replacements land in the changed set, which feeds triggered
//! (incremental) updates. The full table dump is the only operation that
//! advances this node's own sequence number.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::config::{Config, DualMetric, Metric, Protocol};
use crate::stats::NodeStats;
use crate::table::{
    DeliveryWindow, DualMetricRoute, Route, RoutingTable, SequencedRoute, SingleMetricRoute,
    Table, Upsert,
};
use crate::time::{Duration, Timestamp};
use crate::types::{AdvertisedRoute, NodeId, Packet, INFINITE_METRIC};

/// Protocol state beyond the routing table itself.
#[derive(Debug)]
pub struct DvEngine {
    protocol: Protocol,
    /// This node's destination-owned sequence number. Even by convention;
    /// the odd successor marks an unreachable report about us by a neighbour.
    pub own_seq: u32,
    /// Destinations touched since the last advertisement went out.
    changed: HashSet<NodeId>,
    /// Last time each neighbour was heard at all.
    pub last_heard: HashMap<NodeId, Timestamp>,
    /// Last routing-frame sequence number per neighbour, for window gaps.
    last_routing_seq: HashMap<NodeId, u32>,
    last_triggered_update: Option<Timestamp>,
}

impl DvEngine {
    pub fn new(protocol: Protocol) -> Self {
        DvEngine {
            protocol,
            own_seq: 0,
            changed: HashSet::new(),
            last_heard: HashMap::new(),
            last_routing_seq: HashMap::new(),
            last_triggered_update: None,
        }
    }

    /// Record that `neighbour` transmitted something we heard.
    pub fn note_heard(&mut self, neighbour: NodeId, now: Timestamp) {
        self.last_heard.insert(neighbour, now);
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn mark_changed(&mut self, destination: NodeId) {
        self.changed.insert(destination);
    }

    /// Whether an incremental update may go out now: something changed and
    /// the debounce interval has elapsed.
    pub fn triggered_update_ready(&self, now: Timestamp, min_interval: Duration) -> bool {
        if self.changed.is_empty() {
            return false;
        }
        match self.last_triggered_update {
            None => true,
            Some(t) => now.saturating_sub(t) >= min_interval,
        }
    }

    /// Apply one received routing advertisement. Returns true when the
    /// table changed.
    pub fn apply_routing_frame(
        &mut self,
        table: &mut RoutingTable,
        cfg: &Config,
        pkt: &Packet,
        self_id: NodeId,
        now: Timestamp,
        stats: &mut NodeStats,
    ) -> bool {
        if pkt.frag_total == 0 || pkt.frag_index >= pkt.frag_total {
            stats.malformed_drops += 1;
            return false;
        }
        match (self.protocol, table) {
            (Protocol::SingleMetric(metric), RoutingTable::Single(t)) => {
                self.apply_single(t, cfg, metric, pkt, self_id, now, stats)
            }
            (Protocol::DualMetric(variant), RoutingTable::Dual(t)) => {
                self.apply_dual(t, cfg, variant, pkt, self_id, now, stats)
            }
            (Protocol::Dsdv, RoutingTable::Sequenced(t)) => {
                self.apply_sequenced(t, cfg, pkt, self_id, now, stats)
            }
            // Table shape always matches the protocol it was built for.
            _ => false,
        }
    }

    fn apply_single(
        &mut self,
        table: &mut Table<SingleMetricRoute>,
        cfg: &Config,
        metric: Metric,
        pkt: &Packet,
        self_id: NodeId,
        now: Timestamp,
        stats: &mut NodeStats,
    ) -> bool {
        let neighbour = pkt.source;
        let gap = self.routing_seq_gap(neighbour, pkt.seq);
        for route in table.iter_mut() {
            if route.via == neighbour {
                route.window.record_missed(gap);
                route.window.record(true);
            }
        }

        let link_cost = match metric {
            Metric::HopCount => 1.0,
            Metric::RssiSum | Metric::RssiProd => pkt.options.rssi.abs(),
            Metric::Etx => table
                .entry(neighbour, neighbour)
                .map(|r| r.window.expected_tx())
                .unwrap_or(1.0),
        };

        let mut changed = false;
        let neighbour_route = SingleMetricRoute {
            destination: neighbour,
            via: neighbour,
            metric: link_cost,
            valid_until: now + cfg.route_timeout,
            installed_at: now,
            window: self.carry_window_single(table, neighbour, neighbour, cfg),
        };
        changed |= self.track_upsert(
            table.insert_or_update(neighbour_route, cfg.store_best_routes_only),
            neighbour,
            stats,
        );

        for advert in &pkt.routes {
            if advert.destination == self_id {
                continue;
            }
            if !advert.metric.is_finite() || advert.metric < 0.0 {
                stats.malformed_drops += 1;
                continue;
            }
            let candidate_metric = match metric {
                Metric::HopCount => advert.metric + 1.0,
                Metric::RssiSum | Metric::Etx => advert.metric + link_cost,
                Metric::RssiProd => advert.metric * link_cost.max(1.0),
            };
            let route = SingleMetricRoute {
                destination: advert.destination,
                via: neighbour,
                metric: candidate_metric,
                valid_until: now + cfg.route_timeout,
                installed_at: now,
                window: self.carry_window_single(table, advert.destination, neighbour, cfg),
            };
            changed |= self.track_upsert(
                table.insert_or_update(route, cfg.store_best_routes_only),
                advert.destination,
                stats,
            );
        }
        changed
    }

    fn apply_dual(
        &mut self,
        table: &mut Table<DualMetricRoute>,
        cfg: &Config,
        variant: DualMetric,
        pkt: &Packet,
        self_id: NodeId,
        now: Timestamp,
        stats: &mut NodeStats,
    ) -> bool {
        let neighbour = pkt.source;
        let sf = pkt.options.spreading_factor;
        let link_primary = cfg
            .radio
            .time_on_air(cfg.routing_packet_bytes, sf)
            .as_secs_f64();
        let link_secondary = match variant {
            DualMetric::AirtimeHopCount => 1.0,
            DualMetric::AirtimeSfCost => (1u32 << (sf.saturating_sub(7))) as f64,
        };

        let gap = self.routing_seq_gap(neighbour, pkt.seq);
        for route in table.iter_mut() {
            if route.via == neighbour {
                route.window.record_missed(gap);
                route.window.record(true);
            }
        }

        let mut changed = false;
        let neighbour_route = DualMetricRoute {
            destination: neighbour,
            via: neighbour,
            spreading_factor: sf,
            primary: link_primary,
            secondary: link_secondary,
            valid_until: now + cfg.route_timeout,
            installed_at: now,
            window: self.carry_window_dual(table, neighbour, neighbour, cfg),
        };
        changed |= self.track_upsert(
            table.insert_or_update(neighbour_route, cfg.store_best_routes_only),
            neighbour,
            stats,
        );

        for advert in &pkt.routes {
            if advert.destination == self_id {
                continue;
            }
            if !advert.metric.is_finite()
                || advert.metric < 0.0
                || !advert.secondary_metric.is_finite()
                || advert.secondary_metric < 0.0
            {
                stats.malformed_drops += 1;
                continue;
            }
            let route = DualMetricRoute {
                destination: advert.destination,
                via: neighbour,
                spreading_factor: sf,
                primary: advert.metric + link_primary,
                secondary: advert.secondary_metric + link_secondary,
                valid_until: now + cfg.route_timeout,
                installed_at: now,
                window: self.carry_window_dual(table, advert.destination, neighbour, cfg),
            };
            changed |= self.track_upsert(
                table.insert_or_update(route, cfg.store_best_routes_only),
                advert.destination,
                stats,
            );
        }
        changed
    }

    fn apply_sequenced(
        &mut self,
        table: &mut Table<SequencedRoute>,
        cfg: &Config,
        pkt: &Packet,
        self_id: NodeId,
        now: Timestamp,
        stats: &mut NodeStats,
    ) -> bool {
        let neighbour = pkt.source;
        let mut changed = false;
        for advert in &pkt.routes {
            if advert.destination == self_id {
                continue;
            }
            if !advert.metric.is_finite()
                || advert.metric < 0.0
                || advert.metric > INFINITE_METRIC as f64
            {
                stats.malformed_drops += 1;
                continue;
            }
            let advertised_metric = advert.metric as u32;
            let candidate_metric = if advertised_metric >= INFINITE_METRIC {
                INFINITE_METRIC
            } else {
                (advertised_metric + 1).min(INFINITE_METRIC)
            };

            if let Some(existing) = table.entry_for_destination(advert.destination) {
                if advert.seq < existing.seq {
                    stats.stale_seq_rejects += 1;
                    trace!(
                        destination = advert.destination,
                        stored_seq = existing.seq,
                        advert_seq = advert.seq,
                        "stale sequence rejected"
                    );
                    continue;
                }
            }

            let route = SequencedRoute {
                destination: advert.destination,
                via: neighbour,
                metric: candidate_metric,
                seq: advert.seq,
                valid_until: now + cfg.route_timeout,
                installed_at: now,
            };
            let unreachable = !route.is_valid();
            if self.track_upsert(table.insert_or_update(route, true), advert.destination, stats) {
                if unreachable {
                    debug!(
                        destination = advert.destination,
                        seq = advert.seq,
                        "destination marked unreachable"
                    );
                }
                changed = true;
            }
        }
        changed
    }

    /// Learn or refresh the neighbour route from an overheard non-routing
    /// frame. Only single-metric operation uses this.
    pub fn learn_neighbour(
        &mut self,
        table: &mut RoutingTable,
        cfg: &Config,
        neighbour: NodeId,
        rssi: f64,
        now: Timestamp,
        stats: &mut NodeStats,
    ) -> bool {
        let (Protocol::SingleMetric(metric), RoutingTable::Single(t)) = (self.protocol, table)
        else {
            return false;
        };
        let link_cost = match metric {
            Metric::HopCount => 1.0,
            Metric::RssiSum | Metric::RssiProd => rssi.abs(),
            Metric::Etx => t
                .entry(neighbour, neighbour)
                .map(|r| r.window.expected_tx())
                .unwrap_or(1.0),
        };
        let route = SingleMetricRoute {
            destination: neighbour,
            via: neighbour,
            metric: link_cost,
            valid_until: now + cfg.route_timeout,
            installed_at: now,
            window: self.carry_window_single(t, neighbour, neighbour, cfg),
        };
        self.track_upsert(
            t.insert_or_update(route, cfg.store_best_routes_only),
            neighbour,
            stats,
        )
    }

    fn track_upsert(&mut self, outcome: Upsert, destination: NodeId, stats: &mut NodeStats) -> bool {
        match outcome {
            Upsert::Installed => {
                stats.routes_installed += 1;
                self.changed.insert(destination);
                true
            }
            Upsert::Replaced => {
                stats.routes_replaced += 1;
                self.changed.insert(destination);
                true
            }
            Upsert::Rejected => false,
        }
    }

    fn routing_seq_gap(&mut self, neighbour: NodeId, seq: u32) -> u32 {
        let gap = match self.last_routing_seq.get(&neighbour) {
            Some(&last) if seq > last => seq - last - 1,
            _ => 0,
        };
        self.last_routing_seq.insert(neighbour, seq);
        gap
    }

    fn carry_window_single(
        &self,
        table: &Table<SingleMetricRoute>,
        destination: NodeId,
        via: NodeId,
        cfg: &Config,
    ) -> DeliveryWindow {
        table
            .entry(destination, via)
            .map(|r| r.window)
            .unwrap_or_else(|| DeliveryWindow::new(cfg.window_size))
    }

    fn carry_window_dual(
        &self,
        table: &Table<DualMetricRoute>,
        destination: NodeId,
        via: NodeId,
        cfg: &Config,
    ) -> DeliveryWindow {
        table
            .entry(destination, via)
            .map(|r| r.window)
            .unwrap_or_else(|| DeliveryWindow::new(cfg.window_size))
    }

    /// Routes carried by a plain (single/dual metric) routing frame: the
    /// whole table as this node sees it.
    pub fn build_metric_dump(&self, table: &RoutingTable) -> Vec<AdvertisedRoute> {
        match table {
            RoutingTable::Single(t) => t
                .iter()
                .map(|r| AdvertisedRoute {
                    destination: r.destination,
                    metric: r.metric,
                    secondary_metric: 0.0,
                    seq: 0,
                })
                .collect(),
            RoutingTable::Dual(t) => t
                .iter()
                .map(|r| AdvertisedRoute {
                    destination: r.destination,
                    metric: r.primary,
                    secondary_metric: r.secondary,
                    seq: 0,
                })
                .collect(),
            RoutingTable::Sequenced(_) => Vec::new(),
        }
    }

    /// Full sequenced dump: advances this node's own sequence number (the
    /// only place that happens) and clears the changed set.
    pub fn build_full_dump(&mut self, table: &RoutingTable, self_id: NodeId) -> Vec<AdvertisedRoute> {
        self.own_seq = self.own_seq.wrapping_add(2);
        let mut routes = vec![AdvertisedRoute {
            destination: self_id,
            metric: 0.0,
            secondary_metric: 0.0,
            seq: self.own_seq,
        }];
        if let RoutingTable::Sequenced(t) = table {
            routes.extend(t.iter().map(|r| AdvertisedRoute {
                destination: r.destination,
                metric: r.metric as f64,
                secondary_metric: 0.0,
                seq: r.seq,
            }));
        }
        self.changed.clear();
        routes
    }

    /// Incremental sequenced update: only destinations touched since the
    /// last advertisement. Empty when nothing changed survives in the table.
    pub fn build_incremental(
        &mut self,
        table: &RoutingTable,
        now: Timestamp,
    ) -> Vec<AdvertisedRoute> {
        let mut routes = Vec::new();
        if let RoutingTable::Sequenced(t) = table {
            for r in t.iter() {
                if self.changed.contains(&r.destination) {
                    routes.push(AdvertisedRoute {
                        destination: r.destination,
                        metric: r.metric as f64,
                        secondary_metric: 0.0,
                        seq: r.seq,
                    });
                }
            }
        }
        self.last_triggered_update = Some(now);
        self.changed.clear();
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageKind, PacketOptions, BROADCAST_ADDRESS};

    fn routing_pkt(source: NodeId, kind: MessageKind, routes: Vec<AdvertisedRoute>) -> Packet {
        Packet {
            kind,
            source,
            destination: BROADCAST_ADDRESS,
            via: BROADCAST_ADDRESS,
            ttl: 1,
            seq: 1,
            frag_index: 0,
            frag_total: 1,
            payload_bytes: 40,
            departure_time: Timestamp::ZERO,
            routes,
            full_dump: false,
            options: PacketOptions {
                rssi: -90.0,
                spreading_factor: 7,
                app_ack_requested: false,
                adr_command: false,
            },
        }
    }

    fn advert(destination: NodeId, metric: f64, seq: u32) -> AdvertisedRoute {
        AdvertisedRoute {
            destination,
            metric,
            secondary_metric: 0.0,
            seq,
        }
    }

    fn dsdv_setup() -> (DvEngine, RoutingTable, Config, NodeStats) {
        let mut cfg = Config::default();
        cfg.protocol = Protocol::Dsdv;
        cfg.total_nodes = 10;
        let engine = DvEngine::new(cfg.protocol);
        let table = RoutingTable::for_protocol(cfg.protocol);
        (engine, table, cfg, NodeStats::default())
    }

    #[test]
    fn test_hop_count_learns_neighbour_and_relayed() {
        let mut cfg = Config::default();
        cfg.total_nodes = 10;
        cfg.store_best_routes_only = false;
        let mut engine = DvEngine::new(cfg.protocol);
        let mut table = RoutingTable::for_protocol(cfg.protocol);
        let mut stats = NodeStats::default();

        let pkt = routing_pkt(2, MessageKind::Routing, vec![advert(7, 3.0, 0)]);
        let changed =
            engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, Timestamp::from_secs(1), &mut stats);
        assert!(changed);
        assert_eq!(stats.routes_installed, 2);

        let RoutingTable::Single(t) = &table else {
            panic!("wrong table shape")
        };
        assert_eq!(t.entry(2, 2).map(|r| r.metric), Some(1.0));
        assert_eq!(t.entry(7, 2).map(|r| r.metric), Some(4.0));
    }

    #[test]
    fn test_entries_about_self_are_dropped() {
        let mut cfg = Config::default();
        cfg.total_nodes = 10;
        let mut engine = DvEngine::new(cfg.protocol);
        let mut table = RoutingTable::for_protocol(cfg.protocol);
        let mut stats = NodeStats::default();

        let pkt = routing_pkt(2, MessageKind::Routing, vec![advert(0, 1.0, 0)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, Timestamp::from_secs(1), &mut stats);
        // Only the neighbour route got in.
        assert_eq!(table.len(), 1);
        assert!(table.lookup_next_hop(0, Timestamp::from_secs(1)).is_none());
    }

    #[test]
    fn test_rssi_sum_costs_through_sender() {
        let mut cfg = Config::default();
        cfg.protocol = Protocol::SingleMetric(Metric::RssiSum);
        cfg.total_nodes = 10;
        cfg.store_best_routes_only = false;
        let mut engine = DvEngine::new(cfg.protocol);
        let mut table = RoutingTable::for_protocol(cfg.protocol);
        let mut stats = NodeStats::default();

        let pkt = routing_pkt(2, MessageKind::Routing, vec![advert(7, 80.0, 0)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, Timestamp::from_secs(1), &mut stats);

        let RoutingTable::Single(t) = &table else {
            panic!("wrong table shape")
        };
        assert_eq!(t.entry(2, 2).map(|r| r.metric), Some(90.0));
        assert_eq!(t.entry(7, 2).map(|r| r.metric), Some(170.0));
    }

    fn dual_setup(variant: DualMetric) -> (DvEngine, RoutingTable, Config, NodeStats) {
        let mut cfg = Config::default();
        cfg.protocol = Protocol::DualMetric(variant);
        cfg.total_nodes = 10;
        let engine = DvEngine::new(cfg.protocol);
        let table = RoutingTable::for_protocol(cfg.protocol);
        (engine, table, cfg, NodeStats::default())
    }

    fn dual_advert(destination: NodeId, primary: f64, secondary: f64) -> AdvertisedRoute {
        AdvertisedRoute {
            destination,
            metric: primary,
            secondary_metric: secondary,
            seq: 0,
        }
    }

    #[test]
    fn test_dual_metric_prefers_shorter_airtime() {
        let (mut engine, mut table, cfg, mut stats) = dual_setup(DualMetric::AirtimeSfCost);
        let now = Timestamp::from_secs(1);

        let pkt = routing_pkt(2, MessageKind::Routing, vec![dual_advert(9, 0.0, 0.0)]);
        assert!(engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));

        // Same destination via an SF9 neighbour loses on airtime.
        let mut pkt = routing_pkt(3, MessageKind::Routing, vec![dual_advert(9, 0.0, 0.0)]);
        pkt.options.spreading_factor = 9;
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);

        let hop = table.lookup_next_hop(9, now).unwrap();
        assert_eq!(hop.via, 2);
        assert_eq!(hop.spreading_factor, Some(7));

        let RoutingTable::Dual(t) = &table else {
            panic!("wrong table shape")
        };
        let sf7_airtime = cfg
            .radio
            .time_on_air(cfg.routing_packet_bytes, 7)
            .as_secs_f64();
        assert_eq!(t.entry(9, 2).map(|r| r.primary), Some(sf7_airtime));
        // The direct SF9 neighbour route carries the longer link airtime.
        assert!(t.entry(3, 3).map(|r| r.primary).unwrap() > sf7_airtime);
    }

    #[test]
    fn test_dual_metric_secondary_breaks_airtime_ties() {
        let (mut engine, mut table, cfg, mut stats) = dual_setup(DualMetric::AirtimeSfCost);
        let now = Timestamp::from_secs(1);

        let pkt = routing_pkt(2, MessageKind::Routing, vec![dual_advert(9, 0.0, 4.0)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);
        // Equal airtime, lower spreading-factor cost: replaces.
        let pkt = routing_pkt(3, MessageKind::Routing, vec![dual_advert(9, 0.0, 1.0)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);

        let RoutingTable::Dual(t) = &table else {
            panic!("wrong table shape")
        };
        let route = t.entry_for_destination(9).unwrap();
        assert_eq!(route.via, 3);
        // Advertised 1 plus the SF7 link cost of 1.
        assert_eq!(route.secondary, 2.0);
        assert_eq!(stats.routes_replaced, 1);
    }

    #[test]
    fn test_dual_metric_rejects_malformed_secondary() {
        let (mut engine, mut table, cfg, mut stats) = dual_setup(DualMetric::AirtimeHopCount);
        let pkt = routing_pkt(
            2,
            MessageKind::Routing,
            vec![dual_advert(9, 1.0, f64::NAN), dual_advert(8, 1.0, -2.0)],
        );
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, Timestamp::from_secs(1), &mut stats);
        assert_eq!(stats.malformed_drops, 2);
        // Only the neighbour route survives.
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sequence_dominance_scenario() {
        let (mut engine, mut table, cfg, mut stats) = dsdv_setup();
        let now = Timestamp::from_secs(1);

        // seq 5, metric 1 installs.
        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, 1.0, 5)]);
        assert!(engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));

        // Stale seq 4 with a great metric is ignored.
        let pkt = routing_pkt(3, MessageKind::Dsdv, vec![advert(7, 0.0, 4)]);
        assert!(!engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));
        assert_eq!(stats.stale_seq_rejects, 1);

        // Newer seq 6 replaces despite a worse metric.
        let pkt = routing_pkt(3, MessageKind::Dsdv, vec![advert(7, 3.0, 6)]);
        assert!(engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));

        let RoutingTable::Sequenced(t) = &table else {
            panic!("wrong table shape")
        };
        let route = t.entry_for_destination(7).unwrap();
        assert_eq!((route.seq, route.metric, route.via), (6, 4, 3));
    }

    #[test]
    fn test_equal_seq_better_metric_replaces() {
        let (mut engine, mut table, cfg, mut stats) = dsdv_setup();
        let now = Timestamp::from_secs(1);

        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, 4.0, 6)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);
        // Equal seq, worse or equal metric: dropped.
        let pkt = routing_pkt(3, MessageKind::Dsdv, vec![advert(7, 4.0, 6)]);
        assert!(!engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));
        // Equal seq, strictly better metric: replaced.
        let pkt = routing_pkt(3, MessageKind::Dsdv, vec![advert(7, 1.0, 6)]);
        assert!(engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));

        let RoutingTable::Sequenced(t) = &table else {
            panic!("wrong table shape")
        };
        assert_eq!(t.entry_for_destination(7).map(|r| r.via), Some(3));
    }

    #[test]
    fn test_unreachable_advert_invalidates_route() {
        let (mut engine, mut table, cfg, mut stats) = dsdv_setup();
        let now = Timestamp::from_secs(1);

        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, 1.0, 6)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);
        assert!(table.lookup_next_hop(7, now).is_some());

        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, INFINITE_METRIC as f64, 7)]);
        assert!(engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats));
        assert!(table.lookup_next_hop(7, now).is_none());
        // The break lands in the changed set for a triggered update.
        assert!(engine.has_changes());
    }

    #[test]
    fn test_full_dump_advances_own_seq_by_two() {
        let (mut engine, mut table, cfg, mut stats) = dsdv_setup();
        let now = Timestamp::from_secs(1);
        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, 1.0, 6)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);

        let dump = engine.build_full_dump(&table, 0);
        assert_eq!(engine.own_seq, 2);
        assert_eq!(dump[0].destination, 0);
        assert_eq!(dump[0].seq, 2);
        assert_eq!(dump.len(), 2); // self + the learned destination
        assert!(!engine.has_changes());

        engine.build_full_dump(&table, 0);
        assert_eq!(engine.own_seq, 4);
    }

    #[test]
    fn test_triggered_update_debounce() {
        let (mut engine, mut table, mut cfg, mut stats) = dsdv_setup();
        cfg.dsdv_triggered_min_interval = Duration::from_secs(5);
        let now = Timestamp::from_secs(10);

        assert!(!engine.triggered_update_ready(now, cfg.dsdv_triggered_min_interval));
        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, 1.0, 6)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);
        assert!(engine.triggered_update_ready(now, cfg.dsdv_triggered_min_interval));

        let routes = engine.build_incremental(&table, now);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].destination, 7);

        // A fresh change inside the debounce window must wait.
        let pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(8, 1.0, 2)]);
        engine.apply_routing_frame(&mut table, &cfg, &pkt, 0, now, &mut stats);
        assert!(!engine.triggered_update_ready(
            Timestamp::from_secs(12),
            cfg.dsdv_triggered_min_interval
        ));
        assert!(engine.triggered_update_ready(
            Timestamp::from_secs(15),
            cfg.dsdv_triggered_min_interval
        ));
    }

    #[test]
    fn test_malformed_entries_counted_and_skipped() {
        let (mut engine, mut table, cfg, mut stats) = dsdv_setup();
        let pkt = routing_pkt(
            2,
            MessageKind::Dsdv,
            vec![advert(7, f64::NAN, 5), advert(8, -1.0, 5)],
        );
        assert!(!engine.apply_routing_frame(
            &mut table,
            &cfg,
            &pkt,
            0,
            Timestamp::from_secs(1),
            &mut stats
        ));
        assert_eq!(stats.malformed_drops, 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_malformed_fragment_drops_frame() {
        let (mut engine, mut table, cfg, mut stats) = dsdv_setup();
        let mut pkt = routing_pkt(2, MessageKind::Dsdv, vec![advert(7, 1.0, 5)]);
        pkt.frag_index = 3;
        pkt.frag_total = 2;
        assert!(!engine.apply_routing_frame(
            &mut table,
            &cfg,
            &pkt,
            0,
            Timestamp::from_secs(1),
            &mut stats
        ));
        assert_eq!(stats.malformed_drops, 1);
    }
}
