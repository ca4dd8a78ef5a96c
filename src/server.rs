//! DNS server setup and lifecycle management.

use hickory_server::authority::{AuthorityObject, Catalog};
use hickory_server::ServerFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, error, info, warn};
use tripwire::Tripwire;

use crate::authority::FleetAuthority;
use crate::config::{DnsConfig, PeerConfig};
use crate::error::DnsError;
use crate::membership::MembershipStore;
use crate::metrics;
use crate::refresher::Refresher;

/// Interval for emitting state metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Process lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Store seeded, sockets being bound.
    Starting = 0,
    /// Serving queries and refreshing membership.
    Running = 1,
    /// Shutdown requested; draining in-flight queries.
    Stopping = 2,
    /// Ports released and background tasks joined.
    Stopped = 3,
}

impl Phase {
    fn enter(self) {
        info!(phase = ?self, "server phase");
        metrics::record_phase(self as u8);
    }
}

/// Periodically emit state metrics.
async fn metrics_loop(store: MembershipStore, mut tripwire: Tripwire) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                store.emit_metrics();
                debug!(
                    members = store.len(),
                    serial = store.serial(),
                    "emitted state metrics"
                );
            }
            _ = &mut tripwire => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// Build a catalog holding the service zone.
pub fn build_catalog(config: DnsConfig, store: MembershipStore) -> Result<Catalog, DnsError> {
    let authority = FleetAuthority::new(config, store)?;

    let mut catalog = Catalog::new();
    let authority: Arc<dyn AuthorityObject> = Arc::new(authority);
    catalog.upsert(authority.origin().clone(), vec![authority]);
    Ok(catalog)
}

/// DNS load balancer over a self-refreshing fleet membership.
pub struct DnsServer {
    dns: DnsConfig,
    peers: PeerConfig,
    store: MembershipStore,
}

impl DnsServer {
    /// Create a new server, seeding the membership from `peers.seeds`.
    ///
    /// Fails with [`DnsError::EmptyMembership`] when no seed is configured.
    pub fn new(dns: DnsConfig, peers: PeerConfig) -> Result<Self, DnsError> {
        let store = MembershipStore::new(peers.seeds.iter().copied())?;
        Ok(Self { dns, peers, store })
    }

    /// Get a reference to the membership store.
    pub fn store(&self) -> &MembershipStore {
        &self.store
    }

    /// Bind the UDP and TCP sockets.
    ///
    /// TCP is bound to the address UDP ended up on, so a configured port of
    /// 0 yields one shared port for both transports.
    pub async fn bind(self) -> Result<Listener, DnsError> {
        Phase::Starting.enter();
        info!(
            listen_addr = %self.dns.listen_addr,
            service_name = %self.dns.service_name,
            seeds = self.store.len(),
            peer_port = self.peers.port,
            "Starting fleet-dns server"
        );

        let listen_addr = self.dns.listen_addr;
        let refresher = Refresher::new(&self.peers, self.store.clone())?;
        let tcp_timeout = self.dns.tcp_timeout();
        let catalog = build_catalog(self.dns, self.store.clone())?;

        let mut server = ServerFuture::new(catalog);

        // Bind UDP
        let udp_socket = UdpSocket::bind(listen_addr).await?;
        let local_addr = udp_socket.local_addr()?;
        info!(addr = %local_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(local_addr).await?;
        info!(addr = %local_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, tcp_timeout);

        Ok(Listener {
            server,
            local_addr,
            store: self.store,
            refresher,
        })
    }

    /// Bind and serve until the tripwire is triggered.
    pub async fn run(self, tripwire: Tripwire) -> Result<(), DnsError> {
        self.bind().await?.serve(tripwire).await
    }
}

/// Bound DNS sockets plus the background refresher, ready to serve.
pub struct Listener {
    server: ServerFuture<Catalog>,
    local_addr: SocketAddr,
    store: MembershipStore,
    refresher: Refresher,
}

impl Listener {
    /// Address both transports are bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve queries and refresh membership until the tripwire is triggered.
    pub async fn serve(self, tripwire: Tripwire) -> Result<(), DnsError> {
        let Listener {
            mut server,
            local_addr,
            store,
            refresher,
        } = self;

        let refresher_handle = tokio::spawn(refresher.run(tripwire.clone()));

        let metrics_handle = tokio::spawn(metrics_loop(store.clone(), tripwire.clone()));

        // Emit initial metrics
        store.emit_metrics();

        Phase::Running.enter();
        info!(addr = %local_addr, members = store.len(), "DNS server ready to serve queries");

        let requested = tokio::select! {
            _ = tripwire => {
                info!("DNS server shutdown requested");
                true
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
                false
            }
        };

        Phase::Stopping.enter();

        // Stop accepting, let in-flight requests finish
        if let Err(e) = server.shutdown_gracefully().await {
            warn!("DNS server did not shut down cleanly: {}", e);
        }

        if !requested {
            // The server ended on its own; nothing else will fire the tripwire.
            refresher_handle.abort();
            metrics_handle.abort();
        }

        let _ = metrics_handle.await;

        info!("Waiting for membership refresher to stop...");
        let _ = refresher_handle.await;

        Phase::Stopped.enter();
        info!("DNS server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoaConfig;

    fn dns_config() -> DnsConfig {
        DnsConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            service_name: "alternator.example.com".to_string(),
            ttl: 4,
            tcp_timeout_secs: 30,
            soa: SoaConfig::default(),
        }
    }

    #[test]
    fn test_server_creation() {
        let peers = PeerConfig::with_seeds(vec!["10.0.0.1".parse().unwrap()]);

        let server = DnsServer::new(dns_config(), peers).unwrap();
        assert_eq!(server.store().len(), 1);
    }

    #[test]
    fn test_server_requires_seeds() {
        let peers = PeerConfig::with_seeds(Vec::new());

        let result = DnsServer::new(dns_config(), peers);
        assert!(matches!(result, Err(DnsError::EmptyMembership)));
    }

    #[test]
    fn test_build_catalog_rejects_bad_name() {
        let store = MembershipStore::new(["10.0.0.1".parse().unwrap()]).unwrap();
        let config = DnsConfig {
            service_name: format!("{}.example.com", "a".repeat(64)),
            ..dns_config()
        };

        assert!(matches!(build_catalog(config, store), Err(DnsError::Proto(_))));
    }
}
