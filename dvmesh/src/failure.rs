//! Failure injection: which nodes die, and when.
//!
//! The failing subset is process-wide state (all nodes must agree on it) and
//! lives inside the shared coordination object; this module holds the subset
//! itself and the per-node failure-time draw.

use hashbrown::HashSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::FailureConfig;
use crate::time::{Duration, Timestamp};
use crate::types::NodeId;

/// The subset of nodes chosen to fail during a run.
///
/// Initialized lazily by whichever node first asks, from the full
/// registered population, and read-only afterwards. The population is
/// sorted before sampling so registration order cannot change the outcome.
#[derive(Debug, Default)]
pub struct FailureSubset {
    initialized: bool,
    chosen: HashSet<NodeId>,
    total_nodes_observed: usize,
}

impl FailureSubset {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn total_nodes_observed(&self) -> usize {
        self.total_nodes_observed
    }

    pub fn chosen(&self) -> &HashSet<NodeId> {
        &self.chosen
    }

    /// Draw the subset on first use; later calls are no-ops.
    pub fn ensure_init(&mut self, population: &[NodeId], count: usize, seed: u64) {
        if self.initialized {
            return;
        }
        let mut sorted: Vec<NodeId> = population.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut rng = SmallRng::seed_from_u64(seed);
        let take = count.min(sorted.len());
        let picks = rand::seq::index::sample(&mut rng, sorted.len(), take);
        self.chosen = picks.iter().map(|i| sorted[i]).collect();
        self.total_nodes_observed = sorted.len();
        self.initialized = true;
        debug!(chosen = ?self.chosen, population = sorted.len(), "failure subset drawn");
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.chosen.contains(&id)
    }
}

/// When a chosen node dies: `start + Exp(mean) * (1 ± jitter)`.
pub fn draw_failure_time<R: Rng>(rng: &mut R, cfg: &FailureConfig) -> Timestamp {
    let u: f64 = rng.gen();
    // Inverse CDF; 1-u keeps ln() finite.
    let delay = -cfg.exp_mean.as_secs_f64() * (1.0 - u).ln();
    let jitter = 1.0 + cfg.jitter_frac * (2.0 * rng.gen::<f64>() - 1.0);
    cfg.start + Duration::from_secs_f64(delay * jitter.max(0.0))
}
