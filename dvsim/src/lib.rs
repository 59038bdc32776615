//! Deterministic discrete-event simulator for `dvmesh` networks.
//!
//! Events are ordered by `(time, sequence)`; all randomness flows from one
//! seed, so a run is reproducible bit for bit. Nodes are pure reactors: the
//! simulator delivers frames, fires wakeups at the deadlines nodes expose,
//! and collects outgoing frames after every call.
//!
//! # Example
//!
//! ```
//! use dvsim::{ScenarioBuilder, TopologyKind};
//! use dvmesh::Duration;
//!
//! let (sim, result) = ScenarioBuilder::new(4)
//!     .seed(42)
//!     .topology(TopologyKind::Chain)
//!     .run_for(Duration::from_secs(300));
//! assert_eq!(result.end_time, sim.time());
//! ```

pub mod event;
pub mod metrics;
pub mod scenario;
pub mod sim;
pub mod topology;

pub use event::{Event, ScheduledEvent, SequenceNumber};
pub use metrics::{SimMetrics, SimulationResult, TableSnapshot};
pub use scenario::{ScenarioBuilder, TopologyKind};
pub use sim::Simulator;
pub use topology::{Link, Topology};
