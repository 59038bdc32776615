//! Simulation-level metrics and results.

use dvmesh::{NodeId, RoutingPhase, Timestamp};
use hashbrown::HashMap;

/// Routing-table state across all nodes at one instant.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub time: Timestamp,
    /// Distinct valid destinations per node.
    pub unique_destinations: HashMap<NodeId, usize>,
    pub frozen: HashMap<NodeId, bool>,
}

impl TableSnapshot {
    /// Whether every listed node knows at least `expected` destinations.
    pub fn all_know_at_least(&self, expected: usize) -> bool {
        !self.unique_destinations.is_empty()
            && self.unique_destinations.values().all(|&n| n >= expected)
    }
}

/// Frame-level counters for one run.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    pub frames_sent: u64,
    pub frames_delivered: u64,
    pub frames_lost: u64,
    pub snapshots: Vec<TableSnapshot>,
}

impl SimMetrics {
    /// First snapshot time at which every node knew `expected` destinations.
    pub fn convergence_time(&self, expected: usize) -> Option<Timestamp> {
        self.snapshots
            .iter()
            .find(|s| s.all_know_at_least(expected))
            .map(|s| s.time)
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub end_time: Timestamp,
    pub events_processed: u64,
    pub metrics: SimMetrics,
    /// Per-node convergence phase at the end of the run.
    pub phases: HashMap<NodeId, RoutingPhase>,
    pub failing_nodes: Vec<NodeId>,
}

impl SimulationResult {
    pub fn all_converged(&self) -> bool {
        !self.phases.is_empty()
            && self.phases.values().all(|&p| p != RoutingPhase::Active)
    }
}
