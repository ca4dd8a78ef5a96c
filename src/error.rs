//! Error types for fleet-dns.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur in the DNS server and the membership refresher.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Failed to parse address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// No seed addresses were configured; the store cannot be initialized.
    #[error("membership is empty - at least one seed address is required")]
    EmptyMembership,

    /// Attempt to replace the membership with an empty set.
    #[error("refusing to replace membership with an empty set")]
    InvalidUpdate,

    /// Connection failure or timeout while polling a peer.
    #[error("peer {peer} unreachable: {source}")]
    PeerUnreachable {
        /// Peer that was polled.
        peer: SocketAddr,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Peer answered with a non-success HTTP status.
    #[error("peer {peer} answered with status {status}")]
    PeerStatus {
        /// Peer that was polled.
        peer: SocketAddr,
        /// HTTP status returned.
        status: reqwest::StatusCode,
    },

    /// Peer body is not a non-empty JSON array of address strings.
    #[error("malformed membership response from {peer}: {reason}")]
    MalformedMembershipResponse {
        /// Peer that was polled.
        peer: SocketAddr,
        /// What was wrong with the body.
        reason: String,
    },
}
