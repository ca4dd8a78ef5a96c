//! Hickory DNS authority answering the service name with one random fleet member.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA, NS, SOA};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, Record, RecordSet, RecordType};
use hickory_server::authority::{
    Authority, LookupControlFlow, LookupError, LookupOptions, LookupRecords, MessageRequest,
    UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::DnsConfig;
use crate::membership::MembershipStore;
use crate::metrics::{self, QueryResult, Timer};

/// Authority for the service zone, backed by the membership store.
///
/// Every A/AAAA answer for the service name holds exactly one record,
/// picked uniformly at random from the current membership.
pub struct FleetAuthority {
    origin: LowerName,
    store: MembershipStore,
    config: Arc<DnsConfig>,
}

impl FleetAuthority {
    /// Create a new authority for the given configuration and store.
    pub fn new(
        config: DnsConfig,
        store: MembershipStore,
    ) -> Result<Self, hickory_proto::ProtoError> {
        let origin = Name::from_ascii(&config.service_name)?.into();

        Ok(Self {
            origin,
            store,
            config: Arc::new(config),
        })
    }

    /// Build a single-record answer for the given name and address.
    fn build_address_record(&self, name: Name, ip: IpAddr) -> RecordSet {
        let (rtype, rdata) = match ip {
            IpAddr::V4(v4) => (RecordType::A, RData::A(A::from(v4))),
            IpAddr::V6(v6) => (RecordType::AAAA, RData::AAAA(AAAA::from(v6))),
        };

        let mut record_set = RecordSet::new(name.clone(), rtype, 0);
        let mut record = Record::from_rdata(name, self.config.ttl, rdata);
        record.set_dns_class(DNSClass::IN);
        record_set.insert(record, 0);

        record_set
    }

    /// Build the SOA record for this zone.
    fn build_soa_record(&self) -> RecordSet {
        let serial = self.store.serial();
        let soa = SOA::new(
            Name::from_ascii(&self.config.soa.mname).unwrap_or_else(|_| Name::root()),
            Name::from_ascii(&self.config.soa.rname).unwrap_or_else(|_| Name::root()),
            serial,
            self.config.soa.refresh as i32,
            self.config.soa.retry as i32,
            self.config.soa.expire as i32,
            self.config.soa.minimum,
        );

        let name = Name::from(self.origin.clone());
        let mut record_set = RecordSet::new(name.clone(), RecordType::SOA, serial);
        let mut record = Record::from_rdata(name, self.config.ttl, RData::SOA(soa));
        record.set_dns_class(DNSClass::IN);
        record_set.insert(record, serial);

        record_set
    }

    /// Build an NS record for this zone.
    fn build_ns_record(&self) -> RecordSet {
        let name = Name::from(self.origin.clone());
        let ns_name = Name::from_ascii(&self.config.soa.mname).unwrap_or_else(|_| Name::root());

        let mut record_set = RecordSet::new(name.clone(), RecordType::NS, 0);
        let mut record = Record::from_rdata(name, self.config.ttl, RData::NS(NS(ns_name)));
        record.set_dns_class(DNSClass::IN);
        record_set.insert(record, 0);

        record_set
    }

    /// Answer an A or AAAA query for the service name.
    fn lookup_address(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
        timer: Timer,
    ) -> LookupControlFlow<LookupRecords> {
        let rtype_str = format!("{:?}", rtype);

        let snapshot = self.store.snapshot();
        let picked = snapshot.choose_for(rtype, &mut rand::rng());

        match picked {
            Some(ip) => {
                debug!(name = %name, ip = %ip, members = snapshot.len(), "answering with fleet member");
                metrics::record_query(&rtype_str, QueryResult::Success, timer.elapsed());
                let record_set = Arc::new(self.build_address_record(Name::from(name.clone()), ip));
                LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
            }
            None => {
                debug!(name = %name, rtype = ?rtype, members = snapshot.len(), "no member of requested family");
                metrics::record_query(&rtype_str, QueryResult::NoData, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
            }
        }
    }
}

#[async_trait]
impl Authority for FleetAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        let timer = Timer::start();
        trace!(name = %name, rtype = ?rtype, "DNS lookup");

        if *name != self.origin {
            debug!(name = %name, "name below service zone: NXDOMAIN");
            metrics::record_query(&format!("{:?}", rtype), QueryResult::NxDomain, timer.elapsed());
            return LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NXDomain)));
        }

        match rtype {
            RecordType::A | RecordType::AAAA => self.lookup_address(name, rtype, lookup_options, timer),
            RecordType::SOA => {
                debug!(name = %name, "SOA lookup");
                let record_set = Arc::new(self.build_soa_record());
                LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
            }
            RecordType::NS => {
                debug!(name = %name, "NS lookup");
                let record_set = Arc::new(self.build_ns_record());
                LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
            }
            _ => {
                trace!(name = %name, rtype = ?rtype, "Unsupported record type");
                metrics::record_query(&format!("{:?}", rtype), QueryResult::NoData, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
            }
        }
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // DNSSEC not supported
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        // Dynamic updates not supported
        Err(ResponseCode::NotImp)
    }
}
