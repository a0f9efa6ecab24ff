//! Connected-UDP datagram transport (RFC 1035 §4.2.1).
//!
//! One socket per upstream server, bound to an ephemeral local port and
//! connected so the kernel filters datagrams from other sources. A receive
//! task per socket forwards inbound payloads to the engine; dropping the
//! socket stops the task.

use async_trait::async_trait;
use fleet_dns_application::ports::{DatagramSocket, DatagramTransport, Inbound};
use fleet_dns_domain::ResolveError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const RECV_BUFFER_SIZE: usize = 256 * 1024;
const SEND_BUFFER_SIZE: usize = 128 * 1024;

pub struct UdpDatagramTransport {
    /// Receive buffer per datagram; responses larger than this are truncated
    /// by the kernel, matching the EDNS payload size we advertise.
    buf_size: usize,
}

impl UdpDatagramTransport {
    pub fn new(buf_size: usize) -> Self {
        Self { buf_size }
    }

    fn transport_err(server: SocketAddr, context: &str, e: std::io::Error) -> ResolveError {
        ResolveError::Transport {
            server: server.to_string(),
            message: format!("{context}: {e}"),
        }
    }

    fn create_socket(server: SocketAddr) -> std::io::Result<std::net::UdpSocket> {
        use socket2::{Domain, Protocol, Socket, Type};

        let domain = if server.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_recv_buffer_size(RECV_BUFFER_SIZE)?;
        socket.set_send_buffer_size(SEND_BUFFER_SIZE)?;

        let bind_addr = if server.is_ipv4() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
        } else {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
        };
        socket.bind(&bind_addr.into())?;
        socket.set_nonblocking(true)?;

        Ok(socket.into())
    }
}

#[async_trait]
impl DatagramTransport for UdpDatagramTransport {
    async fn connect(
        &self,
        server: SocketAddr,
        inbound: mpsc::Sender<Inbound>,
    ) -> Result<Box<dyn DatagramSocket>, ResolveError> {
        let socket = Self::create_socket(server)
            .map_err(|e| Self::transport_err(server, "failed to create UDP socket", e))?;
        let socket = UdpSocket::from_std(socket)
            .map_err(|e| Self::transport_err(server, "failed to register UDP socket", e))?;
        socket
            .connect(server)
            .await
            .map_err(|e| Self::transport_err(server, "failed to connect UDP socket", e))?;

        let socket = Arc::new(socket);
        let recv_task = tokio::spawn(recv_loop(
            socket.clone(),
            server,
            inbound,
            self.buf_size,
        ));

        debug!(server = %server, "UDP association established");
        Ok(Box::new(ConnectedUdp {
            server,
            socket,
            recv_task,
        }))
    }
}

async fn recv_loop(
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    inbound: mpsc::Sender<Inbound>,
    buf_size: usize,
) {
    let mut buf = vec![0u8; buf_size];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => {
                let datagram = Inbound {
                    server,
                    payload: buf[..len].to_vec(),
                };
                if inbound.send(datagram).await.is_err() {
                    // Engine gone.
                    break;
                }
            }
            Err(e) => {
                warn!(server = %server, error = %e, "UDP receive failed, stopping receive loop");
                break;
            }
        }
    }
}

struct ConnectedUdp {
    server: SocketAddr,
    socket: Arc<UdpSocket>,
    recv_task: JoinHandle<()>,
}

#[async_trait]
impl DatagramSocket for ConnectedUdp {
    async fn send(&self, payload: &[u8]) -> Result<usize, ResolveError> {
        self.socket
            .send(payload)
            .await
            .map_err(|e| UdpDatagramTransport::transport_err(self.server, "send failed", e))
    }
}

impl Drop for ConnectedUdp {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}
