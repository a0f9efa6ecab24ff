//! Asynchronous hostname resolver.
//!
//! [`Resolver`] is a cheap, cloneable handle. All state lives inside a
//! single engine task, so identical concurrent requests share one network
//! exchange and no locking is needed anywhere.

mod aggregate;
mod demux;
mod engine;
mod pool;
mod query;
mod table;

pub use pool::ServerStats;
pub(crate) use pool::ServerPool;

use fleet_dns_domain::{Resolution, ResolveError, ResolveStatus, ResolverConfig, ServerAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::ports::{DatagramTransport, TxidSource, WireCodec};
use query::Waiter;

pub(crate) enum Command {
    Resolve {
        hostname: String,
        waiter: Waiter,
    },
    Cancel {
        hostname: String,
        waiter_id: u64,
        ack: oneshot::Sender<Result<(), ResolveError>>,
    },
    AddServer {
        server: ServerAddr,
    },
    Stats {
        ack: oneshot::Sender<Vec<ServerStats>>,
    },
    Shutdown,
}

/// Handle to the resolver engine. Cloning shares the same engine task;
/// dropping the last handle stops it and fails any pending queries.
#[derive(Clone, Debug)]
pub struct Resolver {
    commands: mpsc::UnboundedSender<Command>,
    waiter_ids: Arc<AtomicU64>,
}

/// An in-flight resolution held by one caller. Obtain the result with
/// [`PendingResolution::outcome`], or hand the value to
/// [`Resolver::cancel`] to detach from the query.
pub struct PendingResolution {
    hostname: String,
    waiter_id: u64,
    outcome: oneshot::Receiver<Resolution>,
}

impl PendingResolution {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Wait for the final result. Delivered exactly once per waiter, also
    /// on failure and on engine shutdown.
    pub async fn outcome(self) -> Resolution {
        let hostname = self.hostname;
        self.outcome
            .await
            .unwrap_or_else(|_| Resolution::failure(hostname, ResolveStatus::Internal))
    }
}

impl Resolver {
    /// Validate the configuration, spawn the engine task and return a
    /// handle to it.
    pub fn new(
        config: ResolverConfig,
        codec: Arc<dyn WireCodec>,
        transport: Arc<dyn DatagramTransport>,
        txids: Arc<dyn TxidSource>,
    ) -> Result<Self, ResolveError> {
        config.validate()?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let engine = engine::Engine::new(config, codec, transport, txids, commands_rx);
        tokio::spawn(engine.run());
        Ok(Self {
            commands: commands_tx,
            waiter_ids: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Register an upstream server. `server` is either `ip:port` or a bare
    /// IP, which implies port 53.
    pub fn add_server(&self, server: &str) -> Result<(), ResolveError> {
        let server: ServerAddr = server.parse()?;
        self.commands
            .send(Command::AddServer { server })
            .map_err(|_| ResolveError::Shutdown)
    }

    /// Begin resolving `hostname` and return a handle to the pending
    /// result. Identical in-flight requests are coalesced.
    pub fn start_resolve(&self, hostname: &str) -> PendingResolution {
        let waiter_id = self.waiter_ids.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let pending = PendingResolution {
            hostname: hostname.to_string(),
            waiter_id,
            outcome: rx,
        };
        let send = self.commands.send(Command::Resolve {
            hostname: hostname.to_string(),
            waiter: Waiter { id: waiter_id, tx },
        });
        if let Err(mpsc::error::SendError(cmd)) = send {
            // Engine already gone; complete the waiter directly.
            if let Command::Resolve { hostname, waiter } = cmd {
                let _ = waiter
                    .tx
                    .send(Resolution::failure(hostname, ResolveStatus::Internal));
            }
        }
        pending
    }

    /// Resolve `hostname` and wait for the result.
    pub async fn resolve(&self, hostname: &str) -> Resolution {
        self.start_resolve(hostname).outcome().await
    }

    /// Detach one waiter from its query. The query itself keeps running;
    /// cancelling a pair the engine does not know is an error.
    pub async fn cancel(&self, pending: PendingResolution) -> Result<(), ResolveError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Cancel {
                hostname: pending.hostname,
                waiter_id: pending.waiter_id,
                ack: ack_tx,
            })
            .map_err(|_| ResolveError::Shutdown)?;
        ack_rx.await.map_err(|_| ResolveError::Shutdown)?
    }

    /// Per-server send counters and connection state.
    pub async fn server_stats(&self) -> Result<Vec<ServerStats>, ResolveError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Stats { ack: ack_tx })
            .map_err(|_| ResolveError::Shutdown)?;
        ack_rx.await.map_err(|_| ResolveError::Shutdown)
    }

    /// Stop the engine. Pending queries are failed and their waiters
    /// notified before the task exits.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
