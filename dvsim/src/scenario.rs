//! Scenario builder: declarative setup for common simulations.

use dvmesh::{
    Config, ConvergenceConfig, Duration, FailureConfig, NodeId, Protocol, Timestamp,
};

use crate::metrics::SimulationResult;
use crate::sim::Simulator;
use crate::topology::{Link, Topology};

/// Link graph shapes the builder knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    FullyConnected,
    Chain,
    /// Node 0 is the hub.
    Star,
}

/// Builder for a simulator with `n` identically configured nodes.
pub struct ScenarioBuilder {
    num_nodes: usize,
    seed: u64,
    topology: TopologyKind,
    link: Link,
    config: Config,
    app_sends: Vec<(Timestamp, NodeId, NodeId)>,
    snapshots: Vec<Timestamp>,
}

impl ScenarioBuilder {
    pub fn new(num_nodes: usize) -> Self {
        let mut config = Config::default();
        config.total_nodes = num_nodes;
        ScenarioBuilder {
            num_nodes,
            seed: 1,
            topology: TopologyKind::FullyConnected,
            link: Link::default(),
            config,
            app_sends: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    pub fn topology(mut self, kind: TopologyKind) -> Self {
        self.topology = kind;
        self
    }

    pub fn loss_rate(mut self, loss: f64) -> Self {
        self.link.loss_rate = loss;
        self
    }

    pub fn link_delay(mut self, delay: Duration) -> Self {
        self.link.delay = delay;
        self
    }

    pub fn rssi(mut self, rssi: f64) -> Self {
        self.link.rssi = rssi;
        self
    }

    pub fn route_discovery(mut self, enabled: bool) -> Self {
        self.config.route_discovery = enabled;
        self
    }

    pub fn convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.config.convergence = convergence;
        self
    }

    pub fn failures(mut self, failure: FailureConfig) -> Self {
        self.config.failure = Some(failure);
        self
    }

    /// Arbitrary configuration adjustments on top of the builder knobs.
    pub fn tweak(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn app_send(mut self, at: Timestamp, from: NodeId, to: NodeId) -> Self {
        self.app_sends.push((at, from, to));
        self
    }

    pub fn snapshot_at(mut self, at: Timestamp) -> Self {
        self.snapshots.push(at);
        self
    }

    pub fn snapshots_every(mut self, interval: Duration, until: Timestamp) -> Self {
        let mut at = Timestamp::ZERO + interval;
        while at <= until {
            self.snapshots.push(at);
            at += interval;
        }
        self
    }

    /// Construct the simulator: nodes, topology, initial timers, scheduled
    /// scenario events.
    pub fn build(self) -> Simulator {
        let ids: Vec<NodeId> = (0..self.num_nodes as NodeId).collect();
        let mut sim = Simulator::new(self.seed);
        for &id in &ids {
            sim.add_node(id, self.config.clone())
                .expect("scenario configuration must validate");
        }
        let topology = match self.topology {
            TopologyKind::FullyConnected => Topology::fully_connected(&ids, self.link),
            TopologyKind::Chain => Topology::chain(&ids, self.link),
            TopologyKind::Star => Topology::star(ids[0], &ids[1..], self.link),
        };
        sim.set_topology(topology);
        sim.initialize_all();
        for (at, from, to) in self.app_sends {
            sim.schedule_app_send(at, from, to);
        }
        for at in self.snapshots {
            sim.schedule_snapshot(at);
        }
        sim
    }

    /// Build, run for `duration`, and summarize.
    pub fn run_for(self, duration: Duration) -> (Simulator, SimulationResult) {
        let mut sim = self.build();
        sim.run_for(duration);
        let result = sim.result();
        (sim, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_creates_all_nodes() {
        let sim = ScenarioBuilder::new(5).seed(3).build();
        assert_eq!(sim.node_ids().len(), 5);
        assert_eq!(sim.coord().nodes_expecting(), 5);
        for id in sim.node_ids() {
            assert!(sim.node(*id).unwrap().next_wakeup().is_some());
        }
    }

    #[test]
    fn test_chain_topology_wiring() {
        let sim = ScenarioBuilder::new(4)
            .topology(TopologyKind::Chain)
            .build();
        assert_eq!(sim.topology().neighbors(0), vec![1]);
        assert_eq!(sim.topology().neighbors(2), vec![1, 3]);
    }

    #[test]
    fn test_snapshots_every_schedules_grid() {
        let (sim, _) = ScenarioBuilder::new(2)
            .snapshots_every(Duration::from_secs(10), Timestamp::from_secs(30))
            .run_for(Duration::from_secs(40));
        assert_eq!(sim.metrics().snapshots.len(), 3);
    }

    #[test]
    #[should_panic(expected = "scenario configuration must validate")]
    fn test_invalid_config_panics_at_build() {
        ScenarioBuilder::new(3)
            .tweak(|cfg| cfg.duty_cycle = 0.0)
            .build();
    }
}
