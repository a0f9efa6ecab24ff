use bytes::Bytes;
use fleet_dns_domain::{AddressFamily, FamilyAnswer, Resolution, ResolveStatus};
use smallvec::SmallVec;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::time::delay_queue;

/// One wire-format question belonging to a query, with its correlation id.
#[derive(Debug)]
pub(crate) struct SubQuery {
    pub txid: u16,
    /// Cleared once a response with a matching transaction id arrives,
    /// regardless of that response's outcome.
    pub needed: bool,
    pub wire: Bytes,
}

impl SubQuery {
    pub fn new(txid: u16, wire: Bytes) -> Self {
        Self {
            txid,
            needed: true,
            wire,
        }
    }
}

/// A caller waiting on a query. The id makes the pair addressable for
/// cancellation; the sender fires exactly once.
#[derive(Debug)]
pub(crate) struct Waiter {
    pub id: u64,
    pub tx: oneshot::Sender<Resolution>,
}

/// State machine for one in-flight hostname resolution.
///
/// Lives in the query table from the first send until the final result has
/// been delivered to all waiters — even if every waiter cancels first.
#[derive(Debug)]
pub(crate) struct PendingQuery {
    pub key: u64,
    pub hostname: String,
    pub sub4: SubQuery,
    /// Present only when IPv6 resolution is enabled.
    pub sub6: Option<SubQuery>,
    /// Accepted per-family answers, in arrival order. Never more than one
    /// entry per family, never an empty address list.
    pub answers: SmallVec<[FamilyAnswer; 2]>,
    pub status: ResolveStatus,
    pub tries_left: u32,
    pub first_send: Instant,
    pub timer: Option<delay_queue::Key>,
    pub waiters: SmallVec<[Waiter; 2]>,
}

impl PendingQuery {
    pub fn new(
        key: u64,
        hostname: String,
        sub4: SubQuery,
        sub6: Option<SubQuery>,
        max_tries: u32,
    ) -> Self {
        Self {
            key,
            hostname,
            sub4,
            sub6,
            answers: SmallVec::new(),
            status: ResolveStatus::Internal,
            tries_left: max_tries,
            first_send: Instant::now(),
            timer: None,
            waiters: SmallVec::new(),
        }
    }

    /// Correlate a response id against the still-needed sub-queries and mark
    /// the matching family resolved.
    pub fn match_txid(&mut self, txid: u16) -> Option<AddressFamily> {
        if self.sub4.needed && self.sub4.txid == txid {
            self.sub4.needed = false;
            return Some(AddressFamily::V4);
        }
        if let Some(sub6) = self.sub6.as_mut() {
            if sub6.needed && sub6.txid == txid {
                sub6.needed = false;
                return Some(AddressFamily::V6);
            }
        }
        None
    }

    /// True once every enabled family has seen its response.
    pub fn resolved(&self) -> bool {
        !self.sub4.needed && self.sub6.as_ref().map_or(true, |s| !s.needed)
    }
}
