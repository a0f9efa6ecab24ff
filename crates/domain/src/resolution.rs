use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr};

/// Address family of one sub-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn record_type(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "A",
            AddressFamily::V6 => "AAAA",
        }
    }
}

/// Aggregate outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    /// At least one family produced usable records.
    Ok,
    /// Upstream answered with a non-success response code before any family
    /// succeeded.
    Upstream(u16),
    /// Internal or transport failure: invalid hostname, retry exhaustion,
    /// empty responses, teardown.
    Internal,
}

impl ResolveStatus {
    /// Numeric form: 0 = success, positive = upstream DNS response code,
    /// negative = internal/transport error.
    pub fn code(&self) -> i32 {
        match self {
            ResolveStatus::Ok => 0,
            ResolveStatus::Upstream(rcode) => *rcode as i32,
            ResolveStatus::Internal => -1,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResolveStatus::Ok)
    }
}

/// Records accepted from one successful response: a non-empty address list of
/// a single family plus the minimum TTL observed among the kept records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyAnswer {
    pub family: AddressFamily,
    pub addrs: Vec<IpAddr>,
    pub min_ttl: u32,
}

/// Final result handed to every waiter of a query.
///
/// IPv4 addresses are rendered in IPv6-mapped form so the list is
/// homogeneous. `server` is the display string of the upstream that produced
/// the completing response; absent when the query failed on a timer.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub hostname: String,
    pub status: ResolveStatus,
    pub addresses: Vec<Ipv6Addr>,
    /// Minimum TTL across the families that produced records.
    pub ttl: Option<u32>,
    pub server: Option<String>,
}

impl Resolution {
    pub fn failure(hostname: impl Into<String>, status: ResolveStatus) -> Self {
        Self {
            hostname: hostname.into(),
            status,
            addresses: Vec::new(),
            ttl: None,
            server: None,
        }
    }

    pub fn code(&self) -> i32 {
        self.status.code()
    }

    /// Addresses in caller-friendly form, un-mapping IPv4.
    pub fn ip_addrs(&self) -> Vec<IpAddr> {
        self.addresses
            .iter()
            .map(|a| match a.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(*a),
            })
            .collect()
    }
}
