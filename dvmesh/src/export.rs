//! End-of-run CSV export.
//!
//! Write-only records, produced off the hot path once a run has ended.
//! Row ordering is stable (destination, then via) so diffs between runs
//! are meaningful.

use std::io::{self, Write};

use crate::stats::NodeStats;
use crate::table::RoutingTable;
use crate::types::NodeId;

pub const ROUTING_CSV_HEADER: &str = "node,dest,via,metric,sec_metric,sf,seq,valid_until_us";
pub const COUNTERS_CSV_HEADER: &str = "node,counter,value";

/// One CSV row per routing-table entry, sorted by destination then via.
pub fn routing_csv_rows(node: NodeId, table: &RoutingTable) -> Vec<String> {
    let mut keyed: Vec<(NodeId, NodeId, String)> = match table {
        RoutingTable::Single(t) => t
            .iter()
            .map(|r| {
                (
                    r.destination,
                    r.via,
                    format!(
                        "{node},{},{},{},,,,{}",
                        r.destination,
                        r.via,
                        r.metric,
                        r.valid_until.as_micros()
                    ),
                )
            })
            .collect(),
        RoutingTable::Dual(t) => t
            .iter()
            .map(|r| {
                (
                    r.destination,
                    r.via,
                    format!(
                        "{node},{},{},{},{},{},,{}",
                        r.destination,
                        r.via,
                        r.primary,
                        r.secondary,
                        r.spreading_factor,
                        r.valid_until.as_micros()
                    ),
                )
            })
            .collect(),
        RoutingTable::Sequenced(t) => t
            .iter()
            .map(|r| {
                (
                    r.destination,
                    r.via,
                    format!(
                        "{node},{},{},{},,,{},{}",
                        r.destination,
                        r.via,
                        r.metric,
                        r.seq,
                        r.valid_until.as_micros()
                    ),
                )
            })
            .collect(),
    };
    keyed.sort_by_key(|(dest, via, _)| (*dest, *via));
    keyed.into_iter().map(|(_, _, row)| row).collect()
}

/// One `node,counter,value` row per counter, in a fixed order.
pub fn counters_csv_rows(node: NodeId, stats: &NodeStats) -> Vec<String> {
    let pairs: Vec<(&str, u64)> = vec![
        ("sent_packets", stats.sent_packets),
        ("sent_data_packets", stats.sent_data_packets),
        ("sent_ack_packets", stats.sent_ack_packets),
        ("sent_routing_packets", stats.sent_routing_packets),
        ("sent_dsdv_packets", stats.sent_dsdv_packets),
        ("forwarded_packets", stats.forwarded_packets),
        ("forwarded_data_packets", stats.forwarded_data_packets),
        ("forwarded_ack_packets", stats.forwarded_ack_packets),
        ("broadcast_data_packets", stats.broadcast_data_packets),
        ("broadcast_forwarded_packets", stats.broadcast_forwarded_packets),
        ("received_packets", stats.received_packets),
        ("received_routing_packets", stats.received_routing_packets),
        ("received_dsdv_packets", stats.received_dsdv_packets),
        ("received_data_packets", stats.received_data_packets),
        ("received_data_packets_for_me", stats.received_data_packets_for_me),
        (
            "received_data_packets_for_me_unique",
            stats.received_data_packets_for_me_unique,
        ),
        ("received_ack_packets", stats.received_ack_packets),
        ("received_ack_packets_for_me", stats.received_ack_packets_for_me),
        (
            "received_ack_packets_for_me_unique",
            stats.received_ack_packets_for_me_unique,
        ),
        ("received_packets_from_me", stats.received_packets_from_me),
        ("received_adr_commands", stats.received_adr_commands),
        (
            "received_data_packets_to_forward",
            stats.received_data_packets_to_forward,
        ),
        (
            "received_data_packets_to_forward_correct",
            stats.received_data_packets_to_forward_correct,
        ),
        (
            "received_data_packets_to_forward_expired",
            stats.received_data_packets_to_forward_expired,
        ),
        (
            "received_data_packets_to_forward_unique",
            stats.received_data_packets_to_forward_unique,
        ),
        (
            "received_ack_packets_to_forward",
            stats.received_ack_packets_to_forward,
        ),
        (
            "received_ack_packets_to_forward_expired",
            stats.received_ack_packets_to_forward_expired,
        ),
        (
            "received_ack_packets_to_forward_unique",
            stats.received_ack_packets_to_forward_unique,
        ),
        (
            "forward_packets_duplicate_avoid",
            stats.forward_packets_duplicate_avoid,
        ),
        ("forward_buffer_full", stats.forward_buffer_full),
        ("malformed_drops", stats.malformed_drops),
        ("unicast_no_route_drops", stats.unicast_no_route_drops),
        (
            "unicast_wrong_next_hop_drops",
            stats.unicast_wrong_next_hop_drops,
        ),
        (
            "unicast_fallback_broadcasts",
            stats.unicast_fallback_broadcasts,
        ),
        ("forward_no_route_drops", stats.forward_no_route_drops),
        ("routes_installed", stats.routes_installed),
        ("routes_replaced", stats.routes_replaced),
        ("routes_expired", stats.routes_expired),
        ("stale_seq_rejects", stats.stale_seq_rejects),
        ("latency_count", stats.latency.count),
        ("latency_sum_us", stats.latency.sum.as_micros()),
        (
            "latency_min_us",
            stats.latency.min.map(|d| d.as_micros()).unwrap_or(0),
        ),
        (
            "latency_max_us",
            stats.latency.max.map(|d| d.as_micros()).unwrap_or(0),
        ),
    ];
    pairs
        .into_iter()
        .map(|(name, value)| format!("{node},{name},{value}"))
        .collect()
}

/// Write a header plus rows to any sink.
pub fn write_csv<W: Write>(sink: &mut W, header: &str, rows: &[String]) -> io::Result<()> {
    writeln!(sink, "{header}")?;
    for row in rows {
        writeln!(sink, "{row}")?;
    }
    Ok(())
}
