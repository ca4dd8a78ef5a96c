//! Configuration types for fleet-dns.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::DnsError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Peer discovery configuration.
    pub peers: PeerConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Check the invariants the server relies on at startup.
    pub fn validate(&self) -> Result<(), DnsError> {
        self.dns.validate()?;
        self.peers.validate()
    }
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Service name answered with fleet addresses (e.g., "alternator.example.com").
    /// Also used as the zone origin.
    pub service_name: String,

    /// TTL for answer records in seconds. Kept short so clients re-resolve
    /// as the fleet changes.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Idle timeout for TCP DNS connections in seconds.
    #[serde(default = "default_tcp_timeout_secs")]
    pub tcp_timeout_secs: u64,

    /// SOA record configuration.
    #[serde(default)]
    pub soa: SoaConfig,
}

impl DnsConfig {
    /// TCP idle timeout as a `Duration`.
    pub fn tcp_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_timeout_secs)
    }

    fn validate(&self) -> Result<(), DnsError> {
        if self.service_name.trim().is_empty() {
            return Err(DnsError::Config("dns.service_name must not be empty".into()));
        }
        Ok(())
    }
}

/// Peer discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Seed addresses used until the first successful refresh.
    pub seeds: Vec<IpAddr>,

    /// HTTP port every peer serves the membership list on.
    #[serde(default = "default_peer_port")]
    pub port: u16,

    /// HTTP path of the membership list.
    #[serde(default = "default_peer_path")]
    pub path: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_peer_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between refresh cycles in milliseconds.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl PeerConfig {
    /// Create a peer configuration with default port, path and timings.
    pub fn with_seeds(seeds: Vec<IpAddr>) -> Self {
        Self {
            seeds,
            port: default_peer_port(),
            path: default_peer_path(),
            timeout_ms: default_peer_timeout_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }

    /// Peer request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay between refresh cycles.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    fn validate(&self) -> Result<(), DnsError> {
        if self.seeds.is_empty() {
            return Err(DnsError::EmptyMembership);
        }
        if self.timeout_ms == 0 {
            return Err(DnsError::Config("peers.timeout_ms must be positive".into()));
        }
        if self.refresh_interval_ms == 0 {
            return Err(DnsError::Config(
                "peers.refresh_interval_ms must be positive".into(),
            ));
        }
        if !self.path.starts_with('/') {
            return Err(DnsError::Config(format!(
                "peers.path must start with '/': {}",
                self.path
            )));
        }
        Ok(())
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "fleet_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            prometheus_addr: None,
            opentelemetry: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "fleet-dns".to_string()
}

/// SOA (Start of Authority) record configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary nameserver hostname (e.g., "ns1.example.com").
    pub mname: String,

    /// Admin email in DNS format (e.g., "admin.example.com" for admin@example.com).
    pub rname: String,

    /// Refresh interval in seconds.
    #[serde(default = "default_refresh")]
    pub refresh: u32,

    /// Retry interval in seconds.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Expire time in seconds.
    #[serde(default = "default_expire")]
    pub expire: u32,

    /// Minimum TTL in seconds.
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8053))
}

fn default_ttl() -> u32 {
    4
}

fn default_tcp_timeout_secs() -> u64 {
    30
}

fn default_peer_port() -> u16 {
    8000
}

fn default_peer_path() -> String {
    "/localnodes".to_string()
}

fn default_peer_timeout_ms() -> u64 {
    1000
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

fn default_refresh() -> u32 {
    3600
}

fn default_retry() -> u32 {
    600
}

fn default_expire() -> u32 {
    604800
}

fn default_minimum() -> u32 {
    4
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            mname: "ns1.example.com".to_string(),
            rname: "admin.example.com".to_string(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
        }
    }
}
