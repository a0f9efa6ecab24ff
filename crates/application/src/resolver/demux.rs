//! Response validation and record extraction.
//!
//! Pure checks over the codec's decoded view; correlation against the query
//! table and status bookkeeping stay in the engine.

use fleet_dns_domain::{AddressFamily, FamilyAnswer};
use std::net::IpAddr;
use tracing::trace;

use crate::ports::{WireData, WireQuestion, WireResponse};

/// Structural checks applied before any table lookup. A failure discards
/// the datagram.
pub(crate) fn validate(resp: &WireResponse) -> Result<&WireQuestion, &'static str> {
    if !resp.is_response {
        return Err("not a response");
    }
    if resp.questions.len() != 1 {
        return Err("question count is not 1");
    }
    let question = &resp.questions[0];
    if question.name.is_empty() {
        return Err("empty question name");
    }
    if !question.class_in {
        return Err("unexpected question class");
    }
    Ok(question)
}

/// Walk the answer section and keep the records usable for `family`: class
/// IN and the matching address type. CNAMEs and other types are acknowledged
/// but not stored. Returns `None` when no record survives; the sub-query is
/// still considered resolved in that case.
pub(crate) fn extract_answer(resp: &WireResponse, family: AddressFamily) -> Option<FamilyAnswer> {
    let mut addrs: Vec<IpAddr> = Vec::new();
    let mut min_ttl = u32::MAX;

    for record in &resp.answers {
        if !record.class_in {
            trace!(txid = resp.txid, "skipping record with unexpected class");
            continue;
        }
        let addr = match (&record.data, family) {
            (WireData::V4(ip), AddressFamily::V4) => IpAddr::V4(*ip),
            (WireData::V6(ip), AddressFamily::V6) => IpAddr::V6(*ip),
            (WireData::Cname(target), _) => {
                trace!(txid = resp.txid, cname = %target, "cname record");
                continue;
            }
            _ => continue,
        };
        addrs.push(addr);
        min_ttl = min_ttl.min(record.ttl);
    }

    if addrs.is_empty() {
        return None;
    }
    Some(FamilyAnswer {
        family,
        addrs,
        min_ttl,
    })
}
