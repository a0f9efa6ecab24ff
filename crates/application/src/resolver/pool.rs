use fleet_dns_domain::ServerAddr;
use std::net::SocketAddr;

use crate::ports::DatagramSocket;

/// Per-server counters exposed for introspection and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStats {
    pub server: String,
    pub queries_sent: u64,
    pub connected: bool,
}

/// One upstream server. The socket is created lazily on first use and
/// dropped again when a send fails; the next use reconnects.
pub(crate) struct Upstream {
    pub endpoint: ServerAddr,
    pub socket: Option<Box<dyn DatagramSocket>>,
    pub queries_sent: u64,
}

/// Ordered upstream list with a persistent round-robin cursor.
#[derive(Default)]
pub(crate) struct ServerPool {
    servers: Vec<Upstream>,
    cursor: usize,
}

impl ServerPool {
    pub fn add(&mut self, endpoint: ServerAddr) {
        self.servers.push(Upstream {
            endpoint,
            socket: None,
            queries_sent: 0,
        });
    }

    /// Round-robin selection: returns the current server and advances the
    /// cursor, wrapping at the end of the list.
    pub fn next_index(&mut self) -> Option<usize> {
        if self.servers.is_empty() {
            return None;
        }
        let ix = self.cursor % self.servers.len();
        self.cursor = (ix + 1) % self.servers.len();
        Some(ix)
    }

    pub fn get(&self, ix: usize) -> &Upstream {
        &self.servers[ix]
    }

    pub fn get_mut(&mut self, ix: usize) -> &mut Upstream {
        &mut self.servers[ix]
    }

    /// Display string of the server that owns `addr`, for result attribution.
    pub fn display_of(&self, addr: SocketAddr) -> Option<String> {
        self.servers
            .iter()
            .find(|s| s.endpoint.addr() == addr)
            .map(|s| s.endpoint.display().to_string())
    }

    pub fn stats(&self) -> Vec<ServerStats> {
        self.servers
            .iter()
            .map(|s| ServerStats {
                server: s.endpoint.display().to_string(),
                queries_sent: s.queries_sent,
                connected: s.socket.is_some(),
            })
            .collect()
    }

    pub fn disconnect_all(&mut self) {
        for server in &mut self.servers {
            server.socket = None;
        }
    }
}
