use bytes::Bytes;
use fleet_dns_domain::{AddressFamily, ResolveError};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Decoded view of one response datagram.
///
/// Only the fields the demultiplexer acts on are surfaced; everything else
/// (authority/additional sections, flags beyond QR) stays inside the codec.
/// Serde derives let test codecs ship these structs over a trivial format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    pub txid: u16,
    /// QR bit: true when the header marks the message as a response.
    pub is_response: bool,
    /// Response code; 0 is NOERROR.
    pub rcode: u16,
    pub questions: Vec<WireQuestion>,
    pub answers: Vec<WireAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireQuestion {
    /// Question name with the trailing root label stripped.
    pub name: String,
    /// True when the question class is IN.
    pub class_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAnswer {
    pub class_in: bool,
    pub ttl: u32,
    pub data: WireData,
}

/// Typed record payloads. Address lengths are validated by the codec, so a
/// `V4`/`V6` value is always well-formed; records the codec cannot type
/// (or whose data is malformed for their type) surface as `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireData {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    Cname(String),
    Other(u16),
}

/// DNS wire-format codec.
pub trait WireCodec: Send + Sync {
    /// Encode a single-question recursive query for `hostname`.
    ///
    /// `edns_payload` advertises an EDNS0 OPT additional with the given max
    /// payload size when present.
    fn encode_query(
        &self,
        hostname: &str,
        family: AddressFamily,
        txid: u16,
        edns_payload: Option<u16>,
    ) -> Result<Bytes, ResolveError>;

    fn decode_response(&self, payload: &[u8]) -> Result<WireResponse, ResolveError>;
}
