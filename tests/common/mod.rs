//! Shared test infrastructure for resolver and server integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{Catalog, MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use fleet_dns::config::{DnsConfig, PeerConfig, SoaConfig};
use fleet_dns::membership::MembershipStore;
use fleet_dns::server::build_catalog;

// --- Constants ---

pub const SERVICE_NAME: &str = "alternator.example.com";
pub const TTL: u32 = 4;

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// The response is serialized via `MessageResponse::destructive_emit()` and
/// stored as raw wire-format bytes, parsed back with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Builders ---

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn ips(addrs: &[&str]) -> Vec<IpAddr> {
    addrs.iter().map(|a| ip(a)).collect()
}

pub fn test_dns_config() -> DnsConfig {
    DnsConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        service_name: SERVICE_NAME.to_string(),
        ttl: TTL,
        tcp_timeout_secs: 5,
        soa: SoaConfig::default(),
    }
}

/// Peer config pointing at `port` with short timings for tests.
pub fn test_peer_config(seeds: &[&str], port: u16) -> PeerConfig {
    PeerConfig {
        port,
        timeout_ms: 200,
        refresh_interval_ms: 20,
        ..PeerConfig::with_seeds(ips(seeds))
    }
}

pub fn test_store(addrs: &[&str]) -> MembershipStore {
    MembershipStore::new(ips(addrs)).expect("seeds must not be empty")
}

pub fn test_catalog(store: MembershipStore) -> Catalog {
    build_catalog(test_dns_config(), store).expect("failed to build catalog")
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Build a full `Request` as if received over UDP.
pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let mut decoder = BinDecoder::new(&bytes);
    let msg = MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest");
    let src: SocketAddr = "10.9.9.9:12345".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

/// Execute a query through the catalog and return the parsed response.
pub async fn execute_query(
    catalog: &Catalog,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, id);
    let handler = TestResponseHandler::new();
    catalog.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

// --- Response helpers ---

/// Extract A and AAAA addresses from the answer section.
pub fn extract_ips(msg: &Message) -> Vec<IpAddr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(IpAddr::V4(Ipv4Addr::from(*a))),
            RData::AAAA(aaaa) => Some(IpAddr::V6(Ipv6Addr::from(*aaaa))),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert a successful answer holding exactly one address drawn from
/// `members`, carrying the configured TTL. Returns that address.
pub fn assert_single_member_answer(msg: &Message, members: &[IpAddr]) -> IpAddr {
    assert_response_code(msg, ResponseCode::NoError);
    assert_eq!(msg.answers().len(), 1, "expected one answer: {:?}", msg.answers());
    assert_eq!(msg.answers()[0].ttl(), TTL);

    let answered = extract_ips(msg);
    assert_eq!(answered.len(), 1);
    assert!(
        members.contains(&answered[0]),
        "{} is not a member of {:?}",
        answered[0],
        members
    );
    answered[0]
}
