//! Fleet DNS - a DNS load balancer for a fleet that knows its own membership.
//!
//! Clients resolve one fixed service name and get back a single address,
//! picked at random from the live members, with a short TTL. Callers
//! re-resolve often, so load spreads across the fleet and follows
//! membership changes without a central coordinator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           fleet-dns                              │
//! │                                                                  │
//! │  ┌──────────────────┐  replace  ┌──────────────────┐             │
//! │  │    Refresher     │──────────▶│ MembershipStore  │             │
//! │  │ (every interval) │           │  (Arc swap)      │             │
//! │  └────────┬─────────┘           └────────┬─────────┘             │
//! │           │                              │ snapshot              │
//! │           │ GET /localnodes              ▼                       │
//! │           │ (random member)     ┌──────────────────┐             │
//! │           ▼                     │  Hickory DNS     │◀── UDP/TCP  │
//! │      fleet member               │  FleetAuthority  │             │
//! │                                 └──────────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed refresh leaves the membership untouched; the resolver keeps
//! answering from the last good list.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use fleet_dns::{DnsConfig, DnsServer, PeerConfig, SoaConfig};
//! use tripwire::Tripwire;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dns = DnsConfig {
//!         listen_addr: "127.0.0.1:8053".parse().unwrap(),
//!         service_name: "alternator.example.com".to_string(),
//!         ttl: 4,
//!         tcp_timeout_secs: 30,
//!         soa: SoaConfig::default(),
//!     };
//!     let peers = PeerConfig::with_seeds(vec!["127.0.0.1".parse().unwrap()]);
//!
//!     let (tripwire, worker) = Tripwire::new_signals();
//!     tokio::spawn(worker);
//!
//!     let server = DnsServer::new(dns, peers).unwrap();
//!     server.run(tripwire).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod authority;
pub mod config;
pub mod error;
pub mod membership;
pub mod metrics;
pub mod refresher;
pub mod server;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, LogFormat, PeerConfig, SoaConfig, TelemetryConfig};
pub use error::DnsError;
pub use membership::{AddressSet, MembershipStore, Snapshot};
pub use refresher::{PeerClient, Refresher};
pub use server::{DnsServer, Listener};
