//! Whole-network scenario tests: multi-hop delivery, strict unicast,
//! convergence and freezing, sequenced routing, failure injection.

use dvmesh::{
    Config, ConvergenceConfig, DualMetric, Duration, FailureConfig, Pacing, Protocol, Route,
    RoutingPhase, RoutingTable, Timestamp,
};
use dvsim::{ScenarioBuilder, Simulator, TopologyKind};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Fast timers so scenarios settle in simulated minutes.
fn quick(cfg: &mut Config) {
    cfg.enforce_duty_cycle = false;
    cfg.routing_pacing = Pacing::uniform(Duration::from_secs(2), Duration::from_secs(8));
    cfg.data_pacing = Pacing::uniform(Duration::from_millis(100), Duration::from_millis(500));
    cfg.forward_pacing = Pacing::uniform(Duration::from_millis(100), Duration::from_millis(500));
}

fn total<F: Fn(&dvmesh::NodeStats) -> u64>(sim: &Simulator, f: F) -> u64 {
    sim.nodes().map(|n| f(n.stats())).sum()
}

#[test]
fn test_full_mesh_converges() {
    init_logging();
    let (sim, result) = ScenarioBuilder::new(5)
        .seed(7)
        .tweak(quick)
        .snapshots_every(Duration::from_secs(30), Timestamp::from_secs(600))
        .run_for(Duration::from_secs(600));
    for node in sim.nodes() {
        assert_eq!(node.table().unique_destinations(), 4, "node {}", node.id());
    }
    assert!(result.metrics.convergence_time(4).is_some());
}

#[test]
fn test_chain_multi_hop_delivery() {
    init_logging();
    let mut sim = ScenarioBuilder::new(4)
        .seed(21)
        .topology(TopologyKind::Chain)
        .tweak(quick)
        .app_send(Timestamp::from_secs(600), 0, 3)
        .build();
    sim.run_until(Timestamp::from_secs(900));

    let receiver = sim.node(3).unwrap();
    assert_eq!(receiver.stats().received_data_packets_for_me_unique, 1);
    assert_eq!(receiver.stats().latency.count, 1);
    for relay in [1, 2] {
        assert!(
            sim.node(relay).unwrap().stats().forwarded_data_packets >= 1,
            "relay {relay} never forwarded"
        );
    }
}

#[test]
fn test_strict_unicast_never_floods() {
    init_logging();
    let mut sim = ScenarioBuilder::new(4)
        .seed(33)
        .topology(TopologyKind::Chain)
        .tweak(quick)
        // Before any routing frame has arrived: must drop, not flood.
        .app_send(Timestamp::from_millis(10), 0, 3)
        .app_send(Timestamp::from_secs(600), 0, 3)
        .build();
    sim.run_until(Timestamp::from_secs(900));

    assert_eq!(total(&sim, |s| s.unicast_fallback_broadcasts), 0);
    assert_eq!(total(&sim, |s| s.broadcast_data_packets), 0);
    assert!(sim.node(0).unwrap().stats().unicast_no_route_drops >= 1);
    // A relay's directed forward is overheard by the node behind it.
    assert!(total(&sim, |s| s.unicast_wrong_next_hop_drops) >= 1);
    assert_eq!(
        sim.node(3).unwrap().stats().received_data_packets_for_me_unique,
        1
    );
}

#[test]
fn test_route_discovery_fallback_floods() {
    init_logging();
    let mut sim = ScenarioBuilder::new(3)
        .seed(5)
        .route_discovery(true)
        .tweak(quick)
        .app_send(Timestamp::from_millis(10), 0, 2)
        .build();
    sim.run_until(Timestamp::from_secs(30));

    assert!(sim.node(0).unwrap().stats().unicast_fallback_broadcasts >= 1);
    assert_eq!(
        sim.node(2).unwrap().stats().received_data_packets_for_me_unique,
        1
    );
}

#[test]
fn test_sequenced_chain_converges_loop_free() {
    init_logging();
    let (sim, _) = ScenarioBuilder::new(4)
        .seed(17)
        .protocol(Protocol::Dsdv)
        .topology(TopologyKind::Chain)
        .tweak(|cfg| {
            quick(cfg);
            cfg.dsdv_full_interval = Duration::from_secs(20);
            cfg.dsdv_triggered_min_interval = Duration::from_secs(2);
        })
        .run_for(Duration::from_secs(600));

    for node in sim.nodes() {
        assert_eq!(node.table().unique_destinations(), 3, "node {}", node.id());
        let RoutingTable::Sequenced(table) = node.table() else {
            panic!("sequenced protocol must build a sequenced table");
        };
        for route in table.iter() {
            assert_ne!(route.via, node.id(), "route points back at its owner");
            // Destinations only ever advance their own number by two.
            assert_eq!(route.seq % 2, 0);
            assert!(route.metric >= 1);
        }
    }
}

#[test]
fn test_dual_metric_mesh_converges_and_delivers() {
    init_logging();
    let mut sim = ScenarioBuilder::new(3)
        .seed(29)
        .protocol(Protocol::DualMetric(DualMetric::AirtimeSfCost))
        .tweak(quick)
        .app_send(Timestamp::from_secs(300), 0, 2)
        .build();
    sim.run_until(Timestamp::from_secs(600));

    for node in sim.nodes() {
        assert_eq!(node.table().unique_destinations(), 2, "node {}", node.id());
        let RoutingTable::Dual(table) = node.table() else {
            panic!("dual-metric protocol must build a dual table");
        };
        for route in table.iter() {
            assert!(route.primary > 0.0, "airtime cost must be positive");
            assert!(route.secondary >= 1.0, "at least one link's SF cost");
            assert_eq!(route.spreading_factor, 7);
        }
    }
    assert_eq!(
        sim.node(2).unwrap().stats().received_data_packets_for_me_unique,
        1
    );
}

#[test]
fn test_freeze_then_global_stop_silences_routing() {
    init_logging();
    let horizon = Duration::from_secs(7_200);
    let mut sim = ScenarioBuilder::new(3)
        .seed(9)
        .convergence(ConvergenceConfig {
            freeze_enabled: true,
            freeze_unique_count: None,
            freeze_validity_horizon: horizon,
            stop_routing_when_all_converged: true,
        })
        .tweak(quick)
        .build();
    sim.run_for(Duration::from_secs(1_200));

    assert!(sim.coord().global_stop_fired());
    let result = sim.result();
    assert!(result.all_converged());
    for node in sim.nodes() {
        assert_eq!(node.phase(), RoutingPhase::Frozen);
        assert!(node.table().frozen());
        let frozen_at = node.frozen_at().unwrap();
        let RoutingTable::Single(table) = node.table() else {
            panic!("default protocol must build a single-metric table");
        };
        for route in table.iter() {
            assert!(route.valid_until() >= frozen_at + horizon);
        }
    }

    // After the stop latch fires no further routing frames go out.
    let before = total(&sim, |s| s.sent_routing_packets + s.sent_dsdv_packets);
    sim.run_for(Duration::from_secs(1_800));
    let after = total(&sim, |s| s.sent_routing_packets + s.sent_dsdv_packets);
    assert_eq!(before, after);
}

#[test]
fn test_single_failure_goes_silent() {
    init_logging();
    let failure = FailureConfig {
        subset_count: 1,
        start: Timestamp::from_secs(120),
        exp_mean: Duration::from_secs(30),
        jitter_frac: 0.0,
    };
    let mut sim = ScenarioBuilder::new(10)
        .seed(101)
        .failures(failure)
        .tweak(quick)
        .build();
    sim.run_for(Duration::from_secs(1_200));

    let failing = sim.result().failing_nodes;
    assert_eq!(failing.len(), 1);
    let victim = failing[0];
    assert!(sim.node(victim).unwrap().is_failed());
    assert!(sim.node(victim).unwrap().stats().last_tx.is_some());

    let sent_at_death = sim.node(victim).unwrap().stats().sent_packets;
    sim.run_for(Duration::from_secs(600));
    assert_eq!(sim.node(victim).unwrap().stats().sent_packets, sent_at_death);

    // Same seed, same victim.
    let mut rerun = ScenarioBuilder::new(10)
        .seed(101)
        .failures(failure)
        .tweak(quick)
        .build();
    rerun.run_for(Duration::from_secs(1_200));
    assert_eq!(rerun.result().failing_nodes, vec![victim]);
}

#[test]
fn test_partition_heals_and_routes_return() {
    init_logging();
    let mut sim = ScenarioBuilder::new(4)
        .seed(13)
        .tweak(|cfg| {
            quick(cfg);
            cfg.route_timeout = Duration::from_secs(60);
        })
        .build();
    sim.run_for(Duration::from_secs(300));
    assert_eq!(sim.node(0).unwrap().table().unique_destinations(), 3);

    sim.topology_mut().partition(&[0]);
    sim.run_for(Duration::from_secs(300));
    assert_eq!(
        sim.node(0).unwrap().table().unique_destinations(),
        0,
        "isolated node must age out every route"
    );

    sim.topology_mut().heal();
    sim.run_for(Duration::from_secs(300));
    assert_eq!(sim.node(0).unwrap().table().unique_destinations(), 3);
}
