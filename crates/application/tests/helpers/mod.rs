//! In-memory port implementations for exercising the resolver engine
//! without real sockets or real wire encoding.

use async_trait::async_trait;
use bytes::Bytes;
use fleet_dns_application::ports::{
    DatagramSocket, DatagramTransport, Inbound, TxidSource, WireAnswer, WireCodec, WireData,
    WireQuestion, WireResponse,
};
use fleet_dns_domain::{AddressFamily, ResolveError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What the stub codec writes into an outgoing datagram: the query fields,
/// JSON-encoded so the test can read back exactly what the engine asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubQuery {
    pub hostname: String,
    pub family: AddressFamily,
    pub txid: u16,
    pub edns_payload: Option<u16>,
}

pub struct StubCodec;

impl WireCodec for StubCodec {
    fn encode_query(
        &self,
        hostname: &str,
        family: AddressFamily,
        txid: u16,
        edns_payload: Option<u16>,
    ) -> Result<Bytes, ResolveError> {
        let query = StubQuery {
            hostname: hostname.to_string(),
            family,
            txid,
            edns_payload,
        };
        let encoded =
            serde_json::to_vec(&query).map_err(|e| ResolveError::Codec(e.to_string()))?;
        Ok(Bytes::from(encoded))
    }

    fn decode_response(&self, payload: &[u8]) -> Result<WireResponse, ResolveError> {
        serde_json::from_slice(payload).map_err(|e| ResolveError::Codec(e.to_string()))
    }
}

/// Deterministic transaction ids so tests can predict them if they need to.
pub struct SequentialTxids(AtomicU16);

impl SequentialTxids {
    pub fn new() -> Self {
        Self(AtomicU16::new(0x1000))
    }
}

impl TxidSource for SequentialTxids {
    fn next_txid(&self) -> u16 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct Sent {
    pub server: SocketAddr,
    pub query: StubQuery,
}

#[derive(Default)]
struct TransportState {
    sent: Vec<Sent>,
    inbound: HashMap<SocketAddr, mpsc::Sender<Inbound>>,
    failing: HashSet<SocketAddr>,
}

/// Transport stub: records every datagram the engine sends and lets the
/// test inject responses as if they arrived from a given server.
#[derive(Clone, Default)]
pub struct StubTransport {
    state: Arc<Mutex<TransportState>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to this server fails until further notice.
    pub fn fail_server(&self, server: SocketAddr) {
        self.state.lock().unwrap().failing.insert(server);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    /// Deliver `resp` to the engine as a datagram from `server`.
    pub async fn reply(&self, server: SocketAddr, resp: WireResponse) {
        let tx = self
            .state
            .lock()
            .unwrap()
            .inbound
            .get(&server)
            .cloned()
            .expect("no socket connected to that server");
        let payload = serde_json::to_vec(&resp).unwrap();
        tx.send(Inbound { server, payload }).await.unwrap();
    }
}

#[async_trait]
impl DatagramTransport for StubTransport {
    async fn connect(
        &self,
        server: SocketAddr,
        inbound: mpsc::Sender<Inbound>,
    ) -> Result<Box<dyn DatagramSocket>, ResolveError> {
        self.state.lock().unwrap().inbound.insert(server, inbound);
        Ok(Box::new(StubSocket {
            server,
            state: self.state.clone(),
        }))
    }
}

struct StubSocket {
    server: SocketAddr,
    state: Arc<Mutex<TransportState>>,
}

#[async_trait]
impl DatagramSocket for StubSocket {
    async fn send(&self, payload: &[u8]) -> Result<usize, ResolveError> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&self.server) {
            return Err(ResolveError::Transport {
                server: self.server.to_string(),
                message: "connection refused".into(),
            });
        }
        let query: StubQuery = serde_json::from_slice(payload)
            .map_err(|e| ResolveError::Codec(e.to_string()))?;
        state.sent.push(Sent {
            server: self.server,
            query,
        });
        Ok(payload.len())
    }
}

/// Well-formed response answering `query` with the given records.
pub fn answer(query: &StubQuery, rcode: u16, addrs: &[IpAddr], ttl: u32) -> WireResponse {
    WireResponse {
        txid: query.txid,
        is_response: true,
        rcode,
        questions: vec![WireQuestion {
            name: query.hostname.clone(),
            class_in: true,
        }],
        answers: addrs
            .iter()
            .map(|addr| WireAnswer {
                class_in: true,
                ttl,
                data: match addr {
                    IpAddr::V4(v4) => WireData::V4(*v4),
                    IpAddr::V6(v6) => WireData::V6(*v6),
                },
            })
            .collect(),
    }
}
