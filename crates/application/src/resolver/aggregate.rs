//! Final-result assembly and waiter fan-out support.

use fleet_dns_domain::{Resolution, ResolveStatus};
use std::net::IpAddr;

use super::query::PendingQuery;

/// Merge a query's per-family answers into the final address list.
///
/// The family whose non-empty answer arrived first is emitted first, then
/// the other; each family contributes at most once and IPv4 addresses are
/// rendered in IPv6-mapped form so the list is homogeneous. The TTL basis is
/// the minimum across the families that produced records.
pub(crate) fn finalize(
    query: &PendingQuery,
    status: ResolveStatus,
    server: Option<String>,
) -> Resolution {
    let total: usize = query.answers.iter().map(|a| a.addrs.len()).sum();
    let mut addresses = Vec::with_capacity(total);
    for answer in &query.answers {
        for addr in &answer.addrs {
            addresses.push(match addr {
                IpAddr::V4(v4) => v4.to_ipv6_mapped(),
                IpAddr::V6(v6) => *v6,
            });
        }
    }

    Resolution {
        hostname: query.hostname.clone(),
        status,
        addresses,
        ttl: query.answers.iter().map(|a| a.min_ttl).min(),
        server,
    }
}
