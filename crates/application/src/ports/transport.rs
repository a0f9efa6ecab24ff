use async_trait::async_trait;
use fleet_dns_domain::ResolveError;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// One datagram handed to the engine by a server socket's receive loop.
///
/// The payload is detached from the socket's receive buffer; it must not be
/// held beyond one demultiplexer pass.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub server: SocketAddr,
    pub payload: Vec<u8>,
}

/// Factory for connected, non-blocking UDP associations.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Bind a wildcard local address matching `server`'s family, connect to
    /// `server`, and start delivering received datagrams into `inbound`.
    ///
    /// Dropping the returned socket closes the association and stops the
    /// receive loop.
    async fn connect(
        &self,
        server: SocketAddr,
        inbound: mpsc::Sender<Inbound>,
    ) -> Result<Box<dyn DatagramSocket>, ResolveError>;
}

/// Send half of one connected association.
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    async fn send(&self, payload: &[u8]) -> Result<usize, ResolveError>;
}
