//! Process-wide coordination shared by every node in a run.
//!
//! Holds the convergence counters with their exactly-once global-stop latch,
//! and the failure subset. Nodes hold it behind an `Arc`; the mutex keeps the
//! latch correct even when node handlers run on real threads.

use parking_lot::Mutex;
use tracing::info;

use crate::config::FailureConfig;
use crate::failure::FailureSubset;
use crate::types::NodeId;

/// Answer to a local-convergence announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalStop {
    /// Every expecting node has now converged.
    pub all_converged: bool,
    /// This announcement is the one that tripped the latch. True at most
    /// once per run across all nodes.
    pub fired_now: bool,
}

#[derive(Debug, Default)]
struct CoordState {
    registered: Vec<NodeId>,
    nodes_expecting: usize,
    nodes_converged: usize,
    global_stop_fired: bool,
    failure: FailureSubset,
}

/// Shared convergence and failure state for one run.
#[derive(Debug)]
pub struct SharedCoordination {
    seed: u64,
    inner: Mutex<CoordState>,
}

impl SharedCoordination {
    pub fn new(seed: u64) -> Self {
        SharedCoordination {
            seed,
            inner: Mutex::new(CoordState::default()),
        }
    }

    /// Register a node as expecting to converge. Every node registers before
    /// any node initializes, so the failure subset sees the full population.
    pub fn register_node(&self, id: NodeId) {
        let mut state = self.inner.lock();
        if !state.registered.contains(&id) {
            state.registered.push(id);
            state.nodes_expecting += 1;
        }
    }

    pub fn nodes_expecting(&self) -> usize {
        self.inner.lock().nodes_expecting
    }

    pub fn nodes_converged(&self) -> usize {
        self.inner.lock().nodes_converged
    }

    pub fn global_stop_fired(&self) -> bool {
        self.inner.lock().global_stop_fired
    }

    /// Record one node's local convergence. Each node calls this at most
    /// once, guarded by its routing phase leaving `Active`.
    pub fn announce_converged(&self, id: NodeId) -> GlobalStop {
        let mut state = self.inner.lock();
        state.nodes_converged += 1;
        let all_converged =
            state.nodes_expecting > 0 && state.nodes_converged >= state.nodes_expecting;
        let fired_now = all_converged && !state.global_stop_fired;
        if fired_now {
            state.global_stop_fired = true;
            info!(node = id, converged = state.nodes_converged, "all nodes converged");
        }
        GlobalStop {
            all_converged,
            fired_now,
        }
    }

    /// Whether `id` is in the failing subset, drawing the subset from the
    /// registered population on first use.
    pub fn is_failing(&self, id: NodeId, cfg: &FailureConfig) -> bool {
        let mut state = self.inner.lock();
        if !state.failure.is_initialized() {
            let population = state.registered.clone();
            state.failure.ensure_init(&population, cfg.subset_count, self.seed);
        }
        state.failure.contains(id)
    }

    /// The failing subset as drawn, empty before first use.
    pub fn failing_nodes(&self) -> Vec<NodeId> {
        let state = self.inner.lock();
        let mut chosen: Vec<NodeId> = state.failure.chosen().iter().copied().collect();
        chosen.sort_unstable();
        chosen
    }
}
