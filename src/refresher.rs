//! Background refresh of the fleet membership from its own members.
//!
//! Each cycle asks one random known member for `GET http://<ip>:<port>/localnodes`
//! and swaps the store to the returned list. Any failure leaves the store as
//! it was; the next cycle simply tries again, likely against another member.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tripwire::Tripwire;

use crate::config::PeerConfig;
use crate::error::DnsError;
use crate::membership::{AddressSet, MembershipStore};
use crate::metrics::{self, RefreshResult, Timer};

/// Parse a membership body: a non-empty JSON array of IP address strings.
fn parse_membership(body: &[u8]) -> Result<AddressSet, String> {
    let entries: Vec<String> = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    if entries.is_empty() {
        return Err("empty membership list".to_string());
    }

    let addrs = entries
        .iter()
        .map(|entry| {
            entry
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| format!("invalid address {:?}", entry))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AddressSet::new(addrs))
}

/// HTTP client for the peer membership endpoint.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    port: u16,
    path: String,
}

impl PeerClient {
    /// Create a client; every request is bounded by `config.timeout_ms`.
    pub fn new(config: &PeerConfig) -> Result<Self, DnsError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            port: config.port,
            path: config.path.clone(),
        })
    }

    /// Membership URL of a peer.
    pub fn url(&self, peer: IpAddr) -> String {
        format!("http://{}{}", SocketAddr::new(peer, self.port), self.path)
    }

    /// Fetch the membership list as seen by `peer`.
    pub async fn fetch(&self, peer: IpAddr) -> Result<AddressSet, DnsError> {
        let addr = SocketAddr::new(peer, self.port);
        let url = self.url(peer);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| DnsError::PeerUnreachable { peer: addr, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DnsError::PeerStatus { peer: addr, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| DnsError::PeerUnreachable { peer: addr, source })?;

        parse_membership(&body)
            .map_err(|reason| DnsError::MalformedMembershipResponse { peer: addr, reason })
    }
}

/// Periodically refreshes a [`MembershipStore`] from a random member.
pub struct Refresher {
    client: PeerClient,
    store: MembershipStore,
    interval: Duration,
}

impl Refresher {
    /// Create a refresher for the given store.
    pub fn new(config: &PeerConfig, store: MembershipStore) -> Result<Self, DnsError> {
        Ok(Self {
            client: PeerClient::new(config)?,
            store,
            interval: config.refresh_interval(),
        })
    }

    /// Run one refresh cycle. Returns the new membership size.
    ///
    /// On error the store is untouched.
    pub async fn refresh_once(&self) -> Result<usize, DnsError> {
        let snapshot = self.store.snapshot();
        let peer = snapshot
            .choose(&mut rand::rng())
            .ok_or(DnsError::EmptyMembership)?;

        debug!(url = %self.client.url(peer), "updating membership");
        let set = self.client.fetch(peer).await?;
        let size = set.len();
        self.store.replace(set)?;
        Ok(size)
    }

    async fn cycle(&self) {
        let timer = Timer::start();

        match self.refresh_once().await {
            Ok(size) => {
                info!(size, serial = self.store.serial(), "membership updated");
                metrics::record_refresh(RefreshResult::Updated, timer.elapsed());
                self.store.emit_metrics();
            }
            Err(e) => {
                warn!(error = %e, size = self.store.len(), "membership refresh failed, keeping current list");
                metrics::record_refresh(classify(&e), timer.elapsed());
            }
        }
    }

    /// Refresh on a fixed interval until the tripwire is triggered.
    ///
    /// Shutdown is observed between cycles; an in-flight request is bounded
    /// by the peer timeout.
    pub async fn run(self, mut tripwire: Tripwire) {
        info!(interval_ms = self.interval.as_millis() as u64, "starting membership refresher");

        loop {
            if tripwire.is_shutting_down() {
                info!("Membership refresher shutting down");
                return;
            }

            self.cycle().await;

            tokio::select! {
                biased;

                _ = &mut tripwire => {
                    info!("Membership refresher received shutdown signal");
                    return;
                }

                _ = sleep(self.interval) => {}
            }
        }
    }
}

fn classify(error: &DnsError) -> RefreshResult {
    match error {
        DnsError::PeerUnreachable { .. } => RefreshResult::PeerUnreachable,
        DnsError::PeerStatus { .. } => RefreshResult::BadStatus,
        DnsError::MalformedMembershipResponse { .. } => RefreshResult::Malformed,
        _ => RefreshResult::InvalidUpdate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_membership_valid() {
        let set = parse_membership(br#"["10.0.0.2","10.0.0.3"]"#).unwrap();
        assert_eq!(set.as_slice(), &[ip("10.0.0.2"), ip("10.0.0.3")]);
    }

    #[test]
    fn test_parse_membership_mixed_families() {
        let set = parse_membership(br#"["10.0.0.2", " fd00::2 "]"#).unwrap();
        assert_eq!(set.as_slice(), &[ip("10.0.0.2"), ip("fd00::2")]);
    }

    #[test]
    fn test_parse_membership_not_json() {
        assert!(parse_membership(b"not json").is_err());
    }

    #[test]
    fn test_parse_membership_empty_array() {
        let err = parse_membership(b"[]").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_parse_membership_non_string_elements() {
        assert!(parse_membership(b"[1, 2, 3]").is_err());
        assert!(parse_membership(br#"{"nodes": ["10.0.0.1"]}"#).is_err());
    }

    #[test]
    fn test_parse_membership_invalid_address() {
        let err = parse_membership(br#"["10.0.0.2", "node-3.local"]"#).unwrap_err();
        assert!(err.contains("node-3.local"));
    }

    #[test]
    fn test_url_brackets_ipv6() {
        let client = PeerClient::new(&PeerConfig::with_seeds(vec![ip("10.0.0.1")])).unwrap();
        assert_eq!(client.url(ip("10.0.0.1")), "http://10.0.0.1:8000/localnodes");
        assert_eq!(client.url(ip("fd00::1")), "http://[fd00::1]:8000/localnodes");
    }

    #[test]
    fn test_classify() {
        let peer: SocketAddr = "10.0.0.1:8000".parse().unwrap();
        assert_eq!(
            classify(&DnsError::PeerStatus {
                peer,
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            }),
            RefreshResult::BadStatus
        );
        assert_eq!(
            classify(&DnsError::MalformedMembershipResponse {
                peer,
                reason: "x".into(),
            }),
            RefreshResult::Malformed
        );
        assert_eq!(classify(&DnsError::InvalidUpdate), RefreshResult::InvalidUpdate);
    }
}
