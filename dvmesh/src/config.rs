//! Runtime configuration for a mesh node.
//!
//! Every knob is a per-run scenario parameter, so configuration is a plain
//! runtime struct (serde-friendly for scenario files) rather than anything
//! compile-time. `Config::validate()` is called at node construction and
//! fails fast; nothing downstream re-checks these invariants.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::{Duration, Timestamp};
use crate::types::{RadioParams, MAX_WINDOW_SIZE};

/// Single-metric route cost model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Hop count; neighbour link costs 1.
    HopCount,
    /// Sum of |RSSI| along the path.
    RssiSum,
    /// Product of |RSSI| along the path.
    RssiProd,
    /// Expected transmission count from the per-route delivery window.
    Etx,
}

/// Dual-metric ranking, lexicographic on `(primary, secondary)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DualMetric {
    /// Primary airtime cost, secondary hop count.
    AirtimeHopCount,
    /// Primary airtime cost, secondary spreading-factor cost.
    AirtimeSfCost,
}

/// Which routing protocol the node speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    SingleMetric(Metric),
    DualMetric(DualMetric),
    /// Destination-sequenced distance vector: freshness dominates metric.
    Dsdv,
}

/// Inter-packet gap distribution for one traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacingDist {
    /// Uniform over `[min, max]`.
    Uniform,
    /// Exponential with the configured mean, clamped to `[min, max]`.
    Exponential,
}

/// Traffic pacing for one send class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    pub dist: PacingDist,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
}

impl Pacing {
    pub const fn uniform(min: Duration, max: Duration) -> Self {
        Pacing {
            dist: PacingDist::Uniform,
            min,
            max,
            mean: Duration::ZERO,
        }
    }

    pub const fn exponential(mean: Duration, min: Duration, max: Duration) -> Self {
        Pacing {
            dist: PacingDist::Exponential,
            min,
            max,
            mean,
        }
    }

    /// Draw the gap until the next packet of this class.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        match self.dist {
            PacingDist::Uniform => {
                if self.min >= self.max {
                    self.min
                } else {
                    Duration::from_micros(rng.gen_range(self.min.as_micros()..=self.max.as_micros()))
                }
            }
            PacingDist::Exponential => {
                // Inverse CDF on a uniform draw; 1-u keeps ln() finite.
                let u: f64 = rng.gen();
                let gap = Duration::from_secs_f64(-self.mean.as_secs_f64() * (1.0 - u).ln());
                gap.max(self.min).min(self.max)
            }
        }
    }
}

/// Deterministic failure injection for a subset of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureConfig {
    /// How many nodes fail over the run, drawn without replacement.
    pub subset_count: usize,
    /// No failure fires before this time.
    pub start: Timestamp,
    /// Mean of the exponential delay added to `start`.
    pub exp_mean: Duration,
    /// Multiplicative jitter fraction applied to the drawn delay.
    pub jitter_frac: f64,
}

/// Convergence detection and the optional routing freeze.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    /// Freeze the table once the unique-destination threshold is reached.
    pub freeze_enabled: bool,
    /// Distinct destinations counted as "converged". `None` derives
    /// `total_nodes - 1` (every other node known).
    pub freeze_unique_count: Option<usize>,
    /// How far each valid route's validity is pushed out at freeze time.
    pub freeze_validity_horizon: Duration,
    /// Stop all routing traffic once every expecting node has converged.
    pub stop_routing_when_all_converged: bool,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        ConvergenceConfig {
            freeze_enabled: false,
            freeze_unique_count: None,
            freeze_validity_horizon: Duration::from_secs(3_600),
            stop_routing_when_all_converged: false,
        }
    }
}

/// Full per-node runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub protocol: Protocol,
    /// Node population of the scenario, end nodes included.
    pub total_nodes: usize,

    /// Keep only the best route per destination instead of one per
    /// `(destination, via)` pair.
    pub store_best_routes_only: bool,
    /// Legacy discovery fallback: with no route, data is flooded instead of
    /// dropped. Off in strict-unicast operation.
    pub route_discovery: bool,
    /// Learn a neighbour route from overheard data frames too.
    pub routes_from_data_packets: bool,
    /// Count link ADR commands carried in for-me data frames. The engine
    /// does not run a rate-adaptation loop; the spreading factor stays
    /// fixed at `radio.spreading_factor`.
    pub adr_enabled: bool,

    /// Delivery-window length for ETX and route scoring, 1..=32.
    pub window_size: usize,
    /// Validity horizon granted to a route on install/refresh.
    pub route_timeout: Duration,
    pub packet_ttl: u8,
    pub forward_buffer_capacity: usize,
    /// Bounded duplicate-suppression history (FIFO eviction).
    pub forwarded_history_capacity: usize,

    pub enforce_duty_cycle: bool,
    /// Allowed transmit fraction, e.g. 0.01 for the 1% sub-band.
    pub duty_cycle: f64,

    pub routing_pacing: Pacing,
    pub data_pacing: Pacing,
    pub forward_pacing: Pacing,
    /// When routing and data traffic are due together, routing wins with
    /// this probability.
    pub routing_packet_priority: f64,
    /// When own data and forwarded data are due together, own data wins
    /// with this probability.
    pub own_data_priority: f64,

    /// Period of the sequenced full-table dump.
    pub dsdv_full_interval: Duration,
    /// Debounce floor between triggered (incremental) updates.
    pub dsdv_triggered_min_interval: Duration,

    pub failure: Option<FailureConfig>,
    pub convergence: ConvergenceConfig,

    pub radio: RadioParams,
    pub routing_packet_bytes: u32,
    pub data_packet_bytes: u32,
    /// Ask the destination for an application-level ACK on own data.
    pub request_app_ack: bool,
    /// Stop generating own data after the first ACK arrives.
    pub stop_on_first_ack: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            protocol: Protocol::SingleMetric(Metric::HopCount),
            total_nodes: 2,
            store_best_routes_only: true,
            route_discovery: false,
            routes_from_data_packets: false,
            adr_enabled: false,
            window_size: 16,
            route_timeout: Duration::from_secs(600),
            packet_ttl: 8,
            forward_buffer_capacity: 64,
            forwarded_history_capacity: 256,
            enforce_duty_cycle: true,
            duty_cycle: 0.01,
            routing_pacing: Pacing::exponential(
                Duration::from_secs(30),
                Duration::from_secs(5),
                Duration::from_secs(120),
            ),
            data_pacing: Pacing::uniform(Duration::from_secs(20), Duration::from_secs(60)),
            forward_pacing: Pacing::uniform(Duration::from_secs(1), Duration::from_secs(5)),
            routing_packet_priority: 0.9,
            own_data_priority: 0.5,
            dsdv_full_interval: Duration::from_secs(60),
            dsdv_triggered_min_interval: Duration::from_secs(5),
            failure: None,
            convergence: ConvergenceConfig::default(),
            radio: RadioParams::default(),
            routing_packet_bytes: 40,
            data_packet_bytes: 20,
            request_app_ack: false,
            stop_on_first_ack: false,
        }
    }
}

impl Config {
    /// Distinct destinations required before this node counts as converged.
    pub fn convergence_threshold(&self) -> usize {
        self.convergence
            .freeze_unique_count
            .unwrap_or(self.total_nodes.saturating_sub(1))
    }

    /// Reject invalid parameter combinations before any node state exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_nodes < 2 {
            return Err(ConfigError::TooFewNodes(self.total_nodes));
        }
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowSize {
                got: self.window_size,
                max: MAX_WINDOW_SIZE,
            });
        }
        if !(self.duty_cycle > 0.0 && self.duty_cycle <= 1.0) {
            return Err(ConfigError::DutyCycle(self.duty_cycle));
        }
        if !(7..=12).contains(&self.radio.spreading_factor) {
            return Err(ConfigError::SpreadingFactor(self.radio.spreading_factor));
        }
        if !(1..=4).contains(&self.radio.coding_rate) {
            return Err(ConfigError::CodingRate(self.radio.coding_rate));
        }
        if self.packet_ttl == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.forward_buffer_capacity == 0 {
            return Err(ConfigError::ZeroForwardBuffer);
        }
        for pacing in [&self.routing_pacing, &self.data_pacing, &self.forward_pacing] {
            if pacing.min > pacing.max {
                return Err(ConfigError::PacingBounds {
                    min_us: pacing.min.as_micros(),
                    max_us: pacing.max.as_micros(),
                });
            }
        }
        for priority in [self.routing_packet_priority, self.own_data_priority] {
            if !(0.0..=1.0).contains(&priority) {
                return Err(ConfigError::SendPriority(priority));
            }
        }
        let reachable = self.total_nodes - 1;
        if let Some(threshold) = self.convergence.freeze_unique_count {
            if threshold > reachable {
                return Err(ConfigError::FreezeThreshold {
                    threshold,
                    reachable,
                });
            }
        }
        if let Some(failure) = &self.failure {
            if failure.subset_count > self.total_nodes {
                return Err(ConfigError::FailureSubset {
                    count: failure.subset_count,
                    total: self.total_nodes,
                });
            }
        }
        Ok(())
    }
}
