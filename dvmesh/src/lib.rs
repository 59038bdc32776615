//! Distance-vector routing and forwarding for duty-cycled wireless mesh
//! nodes.
//!
//! The crate models the routing layer of a battery-powered LoRa mesh node:
//! a routing-table store with single-metric, dual-metric and sequenced
//! (freshness-dominated) variants, the distance-vector protocol engine that
//! feeds it, a strict-unicast packet classifier and forwarder, convergence
//! detection with an optional table freeze, and deterministic failure
//! injection.
//!
//! Nothing here touches a clock, a radio or a thread: every node is driven
//! by delivering frames and firing wakeups with explicit timestamps, which
//! keeps runs reproducible under a discrete-event harness (see the `dvsim`
//! crate).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dvmesh::{Config, MeshNode, SharedCoordination, Timestamp};
//!
//! let coord = Arc::new(SharedCoordination::new(42));
//! let mut node = MeshNode::new(0, Config::default(), coord, 7).unwrap();
//! node.initialize(Timestamp::ZERO);
//! assert!(node.next_wakeup().is_some());
//! ```

pub mod config;
pub mod coord;
pub mod error;
pub mod export;
pub mod failure;
pub mod forward;
pub mod node;
pub mod protocol;
pub mod stats;
pub mod table;
pub mod time;
pub mod timer;
pub mod types;

pub use config::{Config, ConvergenceConfig, DualMetric, FailureConfig, Metric, Pacing, PacingDist, Protocol};
pub use coord::{GlobalStop, SharedCoordination};
pub use error::ConfigError;
pub use forward::{classify, Classification, Forwarder, PacketKey};
pub use node::{Liveness, MeshNode, OutboundFrame, RoutingPhase};
pub use protocol::DvEngine;
pub use stats::{LatencyStats, NodeStats};
pub use table::{
    DeliveryWindow, DualMetricRoute, NextHop, Route, RoutingTable, SequencedRoute,
    SingleMetricRoute, Table,
};
pub use time::{Duration, Timestamp};
pub use timer::{TimerKind, Timers};
pub use types::{
    AdvertisedRoute, MessageKind, NodeId, Packet, PacketOptions, RadioParams, BROADCAST_ADDRESS,
    END_NODE_ID_BASE, INFINITE_METRIC, MAX_WINDOW_SIZE,
};
