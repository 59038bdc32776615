//! Error taxonomy.
//!
//! Only configuration problems surface as `Err`: they are programming or
//! scenario mistakes and abort node construction. Everything that can go
//! wrong at runtime (no route, duplicate, stale sequence, full buffer,
//! expired TTL) is an expected protocol event and is recorded in the node
//! counters instead.

use thiserror::Error;

/// Rejected configuration, reported from `Config::validate()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window size must be 1..={max}, got {got}")]
    WindowSize { got: usize, max: usize },

    #[error("duty cycle must be within (0, 1], got {0}")]
    DutyCycle(f64),

    #[error("spreading factor {0} outside 7..=12")]
    SpreadingFactor(u8),

    #[error("coding rate {0} outside 1..=4")]
    CodingRate(u8),

    #[error("packet TTL must be nonzero")]
    ZeroTtl,

    #[error("forward buffer capacity must be nonzero")]
    ZeroForwardBuffer,

    #[error("freeze threshold {threshold} exceeds reachable destinations {reachable}")]
    FreezeThreshold { threshold: usize, reachable: usize },

    #[error("failure subset {count} exceeds node population {total}")]
    FailureSubset { count: usize, total: usize },

    #[error("pacing bounds inverted: min {min_us}us > max {max_us}us")]
    PacingBounds { min_us: u64, max_us: u64 },

    #[error("send priority must be within [0, 1], got {0}")]
    SendPriority(f64),

    #[error("node population must be at least 2, got {0}")]
    TooFewNodes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ConfigError::FreezeThreshold {
            threshold: 16,
            reachable: 9,
        };
        assert_eq!(
            e.to_string(),
            "freeze threshold 16 exceeds reachable destinations 9"
        );
    }
}
