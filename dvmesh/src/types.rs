//! Core types for the distance-vector mesh engine.
//!
//! Frames are in-memory structs handed between nodes by the harness; there is
//! no wire codec at this layer.

use serde::{Deserialize, Serialize};

use crate::time::{Duration, Timestamp};

/// Node address. Relay nodes count from 0, end nodes from
/// [`END_NODE_ID_BASE`].
pub type NodeId = u32;

/// Destination/via sentinel meaning "everyone in range".
pub const BROADCAST_ADDRESS: NodeId = NodeId::MAX;

/// End-node (leaf) addresses start here; everything below is a relay.
pub const END_NODE_ID_BASE: NodeId = 1000;

/// Unreachable-metric sentinel carried in sequenced advertisements
/// (14-bit metric field, all ones).
pub const INFINITE_METRIC: u32 = 0x3FFF;

/// Largest per-route delivery window the engine supports.
pub const MAX_WINDOW_SIZE: usize = 32;

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Application payload.
    Data,
    /// Application-level acknowledgement travelling back to a data source.
    Ack,
    /// Single- or dual-metric routing advertisement.
    Routing,
    /// Sequenced (destination-owned sequence number) routing advertisement.
    Dsdv,
}

/// Per-frame reception metadata and flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketOptions {
    /// Received signal strength at the last hop, dBm. Set by the harness on
    /// delivery; meaningless on frames this node originated.
    pub rssi: f64,
    /// Spreading factor the frame was (or will be) sent with.
    pub spreading_factor: u8,
    /// Source asked the final destination for an application-level ACK.
    pub app_ack_requested: bool,
    /// Frame carries a link ADR command for the receiver.
    pub adr_command: bool,
}

impl Default for PacketOptions {
    fn default() -> Self {
        PacketOptions {
            rssi: 0.0,
            spreading_factor: 7,
            app_ack_requested: false,
            adr_command: false,
        }
    }
}

/// One routing-table entry as carried inside a routing or sequenced frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvertisedRoute {
    pub destination: NodeId,
    /// Primary metric as seen by the advertiser. Integral in hop-count and
    /// sequenced operation, fractional for RSSI/ETX/airtime costs.
    pub metric: f64,
    /// Secondary metric, zero outside dual-metric operation.
    pub secondary_metric: f64,
    /// Destination-owned sequence number, zero outside sequenced operation.
    pub seq: u32,
}

/// A frame as delivered between nodes.
///
/// `via` names the single neighbour expected to relay the frame; it is
/// [`BROADCAST_ADDRESS`] for undirected traffic (routing advertisements, or
/// data sent without a route when the legacy discovery fallback is enabled).
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: MessageKind,
    pub source: NodeId,
    pub destination: NodeId,
    pub via: NodeId,
    pub ttl: u8,
    /// Source-scoped sequence number identifying this packet.
    pub seq: u32,
    pub frag_index: u16,
    pub frag_total: u16,
    /// Application payload size, drives airtime.
    pub payload_bytes: u32,
    /// When the source handed the frame to the radio.
    pub departure_time: Timestamp,
    /// Advertised routes, empty on data/ack frames.
    pub routes: Vec<AdvertisedRoute>,
    /// Sequenced advertisement covers the full table rather than the
    /// changed subset.
    pub full_dump: bool,
    pub options: PacketOptions,
}

impl Packet {
    /// True when `via` addresses no single relay.
    #[inline]
    pub fn is_undirected(&self) -> bool {
        self.via == BROADCAST_ADDRESS
    }
}

/// Radio parameters used for airtime and duty-cycle accounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioParams {
    pub tx_power_dbm: f64,
    pub center_frequency_hz: u64,
    /// Spreading factor, 7..=12.
    pub spreading_factor: u8,
    pub bandwidth_hz: u32,
    /// Coding rate denominator offset, 1..=4 for 4/5..4/8.
    pub coding_rate: u8,
    /// Explicit PHY header present.
    pub use_header: bool,
    /// Preamble symbols before the sync word.
    pub preamble_symbols: u32,
}

impl Default for RadioParams {
    fn default() -> Self {
        RadioParams {
            tx_power_dbm: 14.0,
            center_frequency_hz: 868_000_000,
            spreading_factor: 7,
            bandwidth_hz: 125_000,
            coding_rate: 1,
            use_header: true,
            preamble_symbols: 8,
        }
    }
}

impl RadioParams {
    /// LoRa time on air for a payload of `payload_bytes`.
    ///
    /// Standard SX127x formula: preamble time plus payload symbols, with
    /// low-data-rate optimisation engaged at SF11/SF12 on 125 kHz.
    pub fn time_on_air(&self, payload_bytes: u32, spreading_factor: u8) -> Duration {
        let sf = spreading_factor as f64;
        let symbol_time = 2f64.powf(sf) / self.bandwidth_hz as f64;
        let preamble_time = (self.preamble_symbols as f64 + 4.25) * symbol_time;

        let de = if spreading_factor >= 11 && self.bandwidth_hz <= 125_000 {
            1.0
        } else {
            0.0
        };
        let header = if self.use_header { 0.0 } else { 1.0 };
        let numerator =
            8.0 * payload_bytes as f64 - 4.0 * sf + 28.0 + 16.0 - 20.0 * header;
        let denominator = 4.0 * (sf - 2.0 * de);
        let payload_symbols =
            8.0 + ((numerator / denominator).ceil() * (self.coding_rate as f64 + 4.0)).max(0.0);

        Duration::from_secs_f64(preamble_time + payload_symbols * symbol_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_sentinel_is_not_a_node() {
        assert!(BROADCAST_ADDRESS > END_NODE_ID_BASE);
    }

    #[test]
    fn test_undirected_detection() {
        let mut pkt = Packet {
            kind: MessageKind::Data,
            source: 3,
            destination: 1001,
            via: BROADCAST_ADDRESS,
            ttl: 8,
            seq: 0,
            frag_index: 0,
            frag_total: 1,
            payload_bytes: 20,
            departure_time: Timestamp::ZERO,
            routes: Vec::new(),
            full_dump: false,
            options: PacketOptions::default(),
        };
        assert!(pkt.is_undirected());
        pkt.via = 7;
        assert!(!pkt.is_undirected());
    }

    #[test]
    fn test_time_on_air_sf7_reference() {
        // 10-byte payload, SF7/125kHz/CR4:5, explicit header, 8 preamble
        // symbols: ~41.2 ms per the SX1276 datasheet calculator.
        let radio = RadioParams::default();
        let toa = radio.time_on_air(10, 7);
        let ms = toa.as_micros() as f64 / 1_000.0;
        assert!((ms - 41.2).abs() < 1.0, "got {ms} ms");
    }

    #[test]
    fn test_time_on_air_grows_with_sf() {
        let radio = RadioParams::default();
        let mut last = Duration::ZERO;
        for sf in 7..=12 {
            let toa = radio.time_on_air(20, sf);
            assert!(toa > last, "SF{sf} not longer than SF{}", sf - 1);
            last = toa;
        }
    }

    #[test]
    fn test_low_data_rate_optimisation_kicks_in() {
        let radio = RadioParams::default();
        // At SF12 the DE flag shrinks the payload symbol count versus the
        // formula without it; just pin the value to catch regressions.
        let toa = radio.time_on_air(20, 12);
        let ms = toa.as_micros() / 1_000;
        assert!(ms > 1_000 && ms < 1_400, "got {ms} ms");
    }
}
