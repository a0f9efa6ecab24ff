//! DNS wire-format codec on top of `hickory-proto`.
//!
//! Encoding builds a standard single-question recursive query, optionally
//! with an EDNS0 OPT additional advertising the receive buffer size.
//! Decoding surfaces only the fields the demultiplexer acts on.

use bytes::Bytes;
use fleet_dns_application::ports::{
    WireAnswer, WireCodec, WireData, WireQuestion, WireResponse,
};
use fleet_dns_domain::{AddressFamily, ResolveError};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;

pub struct HickoryCodec;

impl HickoryCodec {
    fn record_type(family: AddressFamily) -> RecordType {
        match family {
            AddressFamily::V4 => RecordType::A,
            AddressFamily::V6 => RecordType::AAAA,
        }
    }

    /// Question names come back with the root label; strip it so they
    /// compare against the hostname the caller supplied.
    fn strip_root(name: &Name) -> String {
        let mut text = name.to_utf8();
        if text.len() > 1 && text.ends_with('.') {
            text.pop();
        }
        text
    }
}

impl WireCodec for HickoryCodec {
    fn encode_query(
        &self,
        hostname: &str,
        family: AddressFamily,
        txid: u16,
        edns_payload: Option<u16>,
    ) -> Result<Bytes, ResolveError> {
        let name = Name::from_str(hostname).map_err(|e| {
            ResolveError::Codec(format!("invalid query name '{hostname}': {e}"))
        })?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(Self::record_type(family));
        query.set_query_class(DNSClass::IN);

        let mut message = Message::new(txid, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        if let Some(max_payload) = edns_payload {
            let mut edns = Edns::new();
            edns.set_max_payload(max_payload);
            *message.extensions_mut() = Some(edns);
        }

        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        message
            .emit(&mut encoder)
            .map_err(|e| ResolveError::Codec(format!("failed to serialize query: {e}")))?;

        Ok(Bytes::from(buf))
    }

    /// Decode a response datagram.
    ///
    /// Parsing is all-or-nothing: one malformed record fails the whole
    /// datagram and the engine treats it as never received, leaving the
    /// retry path to recover. Records with an unrecognized type decode
    /// fine and surface as `WireData::Other`.
    fn decode_response(&self, payload: &[u8]) -> Result<WireResponse, ResolveError> {
        let message = Message::from_vec(payload)
            .map_err(|e| ResolveError::Codec(format!("failed to parse response: {e}")))?;

        let questions = message
            .queries()
            .iter()
            .map(|q| WireQuestion {
                name: Self::strip_root(q.name()),
                class_in: q.query_class() == DNSClass::IN,
            })
            .collect();

        let answers = message
            .answers()
            .iter()
            .map(|record| WireAnswer {
                class_in: record.dns_class() == DNSClass::IN,
                ttl: record.ttl(),
                data: match record.data() {
                    RData::A(a) => WireData::V4(a.0),
                    RData::AAAA(aaaa) => WireData::V6(aaaa.0),
                    RData::CNAME(canonical) => WireData::Cname(Self::strip_root(canonical)),
                    other => WireData::Other(u16::from(other.record_type())),
                },
            })
            .collect();

        Ok(WireResponse {
            txid: message.id(),
            is_response: message.message_type() == MessageType::Response,
            rcode: u16::from(message.response_code()),
            questions,
            answers,
        })
    }
}
