//! Metrics instrumentation for fleet-dns.
//!
//! All metrics are prefixed with `fleet_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Success => "success",
        QueryResult::NoData => "nodata",
        QueryResult::NxDomain => "nxdomain",
    };

    counter!("fleet_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("fleet_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records successfully.
    Success,
    /// Name exists but holds nothing of the requested type.
    NoData,
    /// Domain not found.
    NxDomain,
}

/// Record the outcome of one refresh cycle.
pub fn record_refresh(result: RefreshResult, duration: std::time::Duration) {
    let result_str = match result {
        RefreshResult::Updated => "updated",
        RefreshResult::PeerUnreachable => "peer_unreachable",
        RefreshResult::BadStatus => "bad_status",
        RefreshResult::Malformed => "malformed",
        RefreshResult::InvalidUpdate => "invalid_update",
    };

    counter!("fleet_dns.refresh.count", "result" => result_str).increment(1);
    histogram!("fleet_dns.refresh.duration.seconds").record(duration.as_secs_f64());
}

/// Refresh cycle outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshResult {
    /// Membership replaced with the peer's list.
    Updated,
    /// Connection failure or timeout.
    PeerUnreachable,
    /// Peer answered with a non-success status.
    BadStatus,
    /// Body was not a non-empty JSON array of addresses.
    Malformed,
    /// Store rejected the update.
    InvalidUpdate,
}

/// Record the current membership size.
pub fn record_membership_size(size: usize) {
    gauge!("fleet_dns.membership.size").set(size as f64);
}

/// Record the SOA serial number.
pub fn record_serial(serial: u32) {
    gauge!("fleet_dns.membership.serial").set(serial as f64);
}

/// Record the server lifecycle phase.
pub fn record_phase(phase: u8) {
    gauge!("fleet_dns.server.phase").set(phase as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
