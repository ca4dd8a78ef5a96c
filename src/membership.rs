//! In-memory fleet membership shared between the refresher and the resolver.
//!
//! The current [`AddressSet`] sits behind an `Arc` that is swapped whole on
//! every successful refresh. Readers clone the `Arc` under a read lock, so a
//! [`Snapshot`] is always one complete set, old or new.

use hickory_proto::rr::RecordType;
use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::error::DnsError;
use crate::metrics;

/// A set of fleet member addresses in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    addrs: Vec<IpAddr>,
}

impl AddressSet {
    /// Build a set, dropping duplicate addresses.
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut seen = HashSet::new();
        let addrs = addrs.into_iter().filter(|a| seen.insert(*a)).collect();
        Self { addrs }
    }

    /// Number of addresses.
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// True if the set holds no address.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Check membership of an address.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.addrs.contains(addr)
    }

    /// Iterate over the addresses.
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addrs.iter()
    }

    /// Addresses as a slice.
    pub fn as_slice(&self) -> &[IpAddr] {
        &self.addrs
    }

    /// Pick one address uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<IpAddr> {
        self.addrs.choose(rng).copied()
    }

    /// Pick one address of the family matching `rtype` (IPv4 for A, IPv6
    /// for AAAA) uniformly among the addresses of that family.
    pub fn choose_for<R: Rng + ?Sized>(&self, rtype: RecordType, rng: &mut R) -> Option<IpAddr> {
        let eligible: Vec<IpAddr> = match rtype {
            RecordType::A => self.addrs.iter().filter(|a| a.is_ipv4()).copied().collect(),
            RecordType::AAAA => self.addrs.iter().filter(|a| a.is_ipv6()).copied().collect(),
            _ => return None,
        };
        eligible.choose(rng).copied()
    }
}

impl FromIterator<IpAddr> for AddressSet {
    fn from_iter<T: IntoIterator<Item = IpAddr>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Immutable point-in-time view of the membership.
pub type Snapshot = Arc<AddressSet>;

/// Thread-safe holder of the current fleet membership.
#[derive(Debug, Clone)]
pub struct MembershipStore {
    inner: Arc<RwLock<MembershipInner>>,
}

#[derive(Debug)]
struct MembershipInner {
    current: Snapshot,

    /// Serial number for SOA (incremented on every replace)
    serial: u32,
}

impl MembershipStore {
    /// Create a store seeded with the given addresses.
    ///
    /// Fails with [`DnsError::EmptyMembership`] when no seed is given: the
    /// store never holds an empty set.
    pub fn new(seeds: impl IntoIterator<Item = IpAddr>) -> Result<Self, DnsError> {
        let seeds = AddressSet::new(seeds);
        if seeds.is_empty() {
            return Err(DnsError::EmptyMembership);
        }

        debug!(size = seeds.len(), "seeded membership");
        Ok(Self {
            inner: Arc::new(RwLock::new(MembershipInner {
                current: Arc::new(seeds),
                serial: 0,
            })),
        })
    }

    /// Current membership. Never empty.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().current.clone()
    }

    /// Atomically replace the whole membership.
    ///
    /// An empty set is rejected with [`DnsError::InvalidUpdate`] and the
    /// store keeps its current contents.
    pub fn replace(&self, set: AddressSet) -> Result<(), DnsError> {
        if set.is_empty() {
            return Err(DnsError::InvalidUpdate);
        }

        let next = Arc::new(set);
        let mut inner = self.inner.write();
        inner.current = next;
        inner.serial = inner.serial.wrapping_add(1);
        debug!(size = inner.current.len(), serial = inner.serial, "replaced membership");
        Ok(())
    }

    /// Current SOA serial.
    pub fn serial(&self) -> u32 {
        self.inner.read().serial
    }

    /// Number of addresses currently known.
    pub fn len(&self) -> usize {
        self.inner.read().current.len()
    }

    /// Always false: the store cannot become empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().current.is_empty()
    }

    /// Emit current state metrics.
    pub fn emit_metrics(&self) {
        let inner = self.inner.read();
        metrics::record_membership_size(inner.current.len());
        metrics::record_serial(inner.serial);
    }
}
