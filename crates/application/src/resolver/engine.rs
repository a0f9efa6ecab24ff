use bytes::Bytes;
use fleet_dns_domain::{
    host_key, is_valid_hostname, AddressFamily, Resolution, ResolveError, ResolveStatus,
    ResolverConfig,
};
use futures::StreamExt;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::time::DelayQueue;
use tracing::{debug, error, warn};

use super::query::{PendingQuery, SubQuery, Waiter};
use super::table::QueryTable;
use super::{aggregate, demux, Command, ServerPool};
use crate::ports::{DatagramTransport, Inbound, TxidSource, WireCodec};

/// Inbound datagram channel depth. Receive loops back off when the engine
/// falls behind instead of growing without bound.
const INBOUND_CHANNEL_DEPTH: usize = 64;

/// Owns all mutable resolver state and serializes every mutation on one
/// task: commands from `Resolver` handles, datagrams from server sockets and
/// retry-timer expiries are multiplexed through a single `select!` loop.
pub(crate) struct Engine {
    config: ResolverConfig,
    codec: Arc<dyn WireCodec>,
    transport: Arc<dyn DatagramTransport>,
    txids: Arc<dyn TxidSource>,
    commands: mpsc::UnboundedReceiver<Command>,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    table: QueryTable,
    pool: ServerPool,
    /// Retry timers, one armed per in-flight query, keyed by the query key.
    timers: DelayQueue<u64>,
}

impl Engine {
    pub(crate) fn new(
        config: ResolverConfig,
        codec: Arc<dyn WireCodec>,
        transport: Arc<dyn DatagramTransport>,
        txids: Arc<dyn TxidSource>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_DEPTH);
        Self {
            config,
            codec,
            transport,
            txids,
            commands,
            inbound_tx,
            inbound_rx,
            table: QueryTable::default(),
            pool: ServerPool::default(),
            timers: DelayQueue::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("resolver engine started");
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Resolve { hostname, waiter }) => {
                        self.on_resolve(hostname, waiter).await;
                    }
                    Some(Command::Cancel { hostname, waiter_id, ack }) => {
                        let _ = ack.send(self.on_cancel(&hostname, waiter_id));
                    }
                    Some(Command::AddServer { server }) => {
                        debug!(server = %server, "upstream server added");
                        self.pool.add(server);
                    }
                    Some(Command::Stats { ack }) => {
                        let _ = ack.send(self.pool.stats());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(inbound) = self.inbound_rx.recv() => self.on_datagram(inbound),
                Some(expired) = self.timers.next() => self.on_timer(expired.into_inner()).await,
            }
        }
        self.teardown();
    }

    /// Start a resolution, or attach the waiter to an identical in-flight
    /// query. Preparation failures notify the single caller immediately.
    async fn on_resolve(&mut self, hostname: String, waiter: Waiter) {
        if !is_valid_hostname(&hostname) {
            error!(host = %hostname, "invalid hostname");
            let _ = waiter
                .tx
                .send(Resolution::failure(hostname, ResolveStatus::Internal));
            return;
        }

        let key = host_key(&hostname);
        if let Some(q) = self.table.get_mut(key) {
            if q.hostname != hostname {
                error!(host = %hostname, existing = %q.hostname, "hash collision with in-flight query");
                let _ = waiter
                    .tx
                    .send(Resolution::failure(hostname, ResolveStatus::Internal));
                return;
            }
            debug!(host = %hostname, waiters = q.waiters.len() + 1, "query hit, attaching waiter");
            q.waiters.push(waiter);
            return;
        }

        let edns_payload = if self.config.edns {
            Some(self.config.buf_size as u16)
        } else {
            None
        };

        let txid4 = self.txids.next_txid();
        let wire4 = match self
            .codec
            .encode_query(&hostname, AddressFamily::V4, txid4, edns_payload)
        {
            Ok(wire) => wire,
            Err(e) => {
                error!(host = %hostname, error = %e, "failed to encode A query");
                let _ = waiter
                    .tx
                    .send(Resolution::failure(hostname, ResolveStatus::Internal));
                return;
            }
        };

        let sub6 = if self.config.enable_ipv6 {
            let txid6 = self.txids.next_txid();
            match self
                .codec
                .encode_query(&hostname, AddressFamily::V6, txid6, edns_payload)
            {
                Ok(wire) => Some(SubQuery::new(txid6, wire)),
                Err(e) => {
                    error!(host = %hostname, error = %e, "failed to encode AAAA query");
                    let _ = waiter
                        .tx
                        .send(Resolution::failure(hostname, ResolveStatus::Internal));
                    return;
                }
            }
        } else {
            None
        };

        let mut query = PendingQuery::new(
            key,
            hostname,
            SubQuery::new(txid4, wire4),
            sub6,
            self.config.max_tries,
        );
        query.waiters.push(waiter);
        self.table.insert(query);

        self.send_query(key, false).await;
    }

    /// Detach one waiter from an in-flight query. The query itself keeps
    /// running to completion even with an empty waiter list.
    fn on_cancel(&mut self, hostname: &str, waiter_id: u64) -> Result<(), ResolveError> {
        let key = host_key(hostname);
        let Some(q) = self.table.get_mut(key) else {
            warn!(host = %hostname, "cancel: no in-flight query");
            return Err(ResolveError::CancelNoQuery(hostname.to_string()));
        };
        if q.hostname != hostname {
            warn!(host = %hostname, existing = %q.hostname, "cancel: hash collision");
            return Err(ResolveError::CancelNoQuery(hostname.to_string()));
        }
        match q.waiters.iter().position(|w| w.id == waiter_id) {
            Some(ix) => {
                q.waiters.remove(ix);
                debug!(host = %hostname, remaining = q.waiters.len(), "cancel: waiter detached");
                Ok(())
            }
            None => {
                warn!(host = %hostname, "cancel: no matching waiter");
                Err(ResolveError::CancelNoWaiter(hostname.to_string()))
            }
        }
    }

    /// Transmit the still-needed sub-queries, rotating servers until a send
    /// succeeds. Every loop turn consumes one unit of the retry budget; the
    /// query fails once the budget is spent.
    async fn send_query(&mut self, key: u64, resend: bool) {
        loop {
            let Some(q) = self.table.get_mut(key) else {
                return;
            };
            if q.tries_left == 0 {
                error!(host = %q.hostname, "reached max_tries limit");
                self.finish(key, Some(ResolveStatus::Internal), None);
                return;
            }
            q.tries_left -= 1;

            let Some(server_ix) = self.pool.next_index() else {
                error!(host = %q.hostname, "no upstream servers configured");
                self.finish(key, Some(ResolveStatus::Internal), None);
                return;
            };

            match self.send_to_server(key, server_ix, resend).await {
                Ok(()) => {
                    if let Some(q) = self.table.get_mut(key) {
                        if let Some(old) = q.timer.take() {
                            self.timers.try_remove(&old);
                        }
                        let timeout = Duration::from_millis(self.config.retry_timeout_ms);
                        q.timer = Some(self.timers.insert(key, timeout));
                    }
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "send failed, rotating to next server");
                }
            }
        }
    }

    /// Send every still-needed sub-query of one query to one server,
    /// connecting it lazily first. A failure closes the server's socket so
    /// the next use reconnects.
    async fn send_to_server(
        &mut self,
        key: u64,
        server_ix: usize,
        resend: bool,
    ) -> Result<(), ResolveError> {
        self.ensure_connected(server_ix).await?;

        let Some(q) = self.table.get_mut(key) else {
            return Ok(());
        };
        let hostname = q.hostname.clone();

        let mut frames: SmallVec<[(AddressFamily, u16, Bytes); 2]> = SmallVec::new();
        if let Some(sub6) = q.sub6.as_ref().filter(|s| s.needed) {
            frames.push((AddressFamily::V6, sub6.txid, sub6.wire.clone()));
        }
        if q.sub4.needed {
            frames.push((AddressFamily::V4, q.sub4.txid, q.sub4.wire.clone()));
        }

        for (family, txid, wire) in frames {
            let server = self.pool.get_mut(server_ix);
            let server_display = server.endpoint.display().to_string();
            let sent = match server.socket.as_deref() {
                Some(socket) => socket.send(&wire).await,
                None => Err(ResolveError::Transport {
                    server: server_display.clone(),
                    message: "socket closed".into(),
                }),
            };
            match sent {
                Ok(n) if n == wire.len() => {
                    server.queries_sent += 1;
                    debug!(
                        host = %hostname,
                        server = %server_display,
                        txid,
                        family = family.record_type(),
                        resend,
                        server_queries = server.queries_sent,
                        pending = self.table.len(),
                        "query sent"
                    );
                }
                Ok(n) => {
                    warn!(server = %server_display, sent = n, expected = wire.len(), "short send, closing server socket");
                    server.socket = None;
                    return Err(ResolveError::Transport {
                        server: server_display,
                        message: "short send".into(),
                    });
                }
                Err(e) => {
                    warn!(server = %server_display, error = %e, "send failed, closing server socket");
                    server.socket = None;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn ensure_connected(&mut self, server_ix: usize) -> Result<(), ResolveError> {
        if self.pool.get(server_ix).socket.is_some() {
            return Ok(());
        }
        let endpoint = self.pool.get(server_ix).endpoint.clone();
        match self
            .transport
            .connect(endpoint.addr(), self.inbound_tx.clone())
            .await
        {
            Ok(socket) => {
                debug!(server = %endpoint, "server socket connected");
                self.pool.get_mut(server_ix).socket = Some(socket);
                Ok(())
            }
            Err(e) => {
                warn!(server = %endpoint, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// Correlate one received datagram with an in-flight query and apply it.
    /// Any validation failure discards the datagram; the query's retry timer
    /// keeps running.
    fn on_datagram(&mut self, inbound: Inbound) {
        let Inbound { server, payload } = inbound;
        debug!(server = %server, bytes = payload.len(), "received response");

        let resp = match self.codec.decode_response(&payload) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(server = %server, error = %e, "undecodable datagram discarded");
                return;
            }
        };

        let name = match demux::validate(&resp) {
            Ok(question) => question.name.clone(),
            Err(reason) => {
                warn!(server = %server, txid = resp.txid, reason, "response discarded");
                return;
            }
        };

        let key = host_key(&name);
        let Some(q) = self.table.get_mut(key) else {
            warn!(host = %name, txid = resp.txid, "unexpected response, no matching query");
            return;
        };
        if q.hostname != name {
            // Hash collision guard: never mutate a query for a different name.
            warn!(host = %name, existing = %q.hostname, "question name mismatch, discarded");
            return;
        }
        let Some(family) = q.match_txid(resp.txid) else {
            warn!(host = %name, txid = resp.txid, "request/response ids don't match");
            return;
        };

        if resp.rcode != 0 {
            warn!(host = %name, txid = resp.txid, rcode = resp.rcode, "upstream error response");
            // An error only becomes the aggregate status while no family
            // has succeeded.
            if q.answers.is_empty() {
                q.status = ResolveStatus::Upstream(resp.rcode);
            }
        } else if let Some(answer) = demux::extract_answer(&resp, family) {
            debug!(
                host = %name,
                family = family.record_type(),
                addrs = answer.addrs.len(),
                min_ttl = answer.min_ttl,
                "answer accepted"
            );
            q.answers.push(answer);
            q.status = ResolveStatus::Ok;
        } else {
            debug!(host = %name, txid = resp.txid, "no useful records in response");
            if q.answers.is_empty() {
                q.status = ResolveStatus::Internal;
            }
        }

        debug!(
            host = %name,
            family = family.record_type(),
            elapsed_ms = q.first_send.elapsed().as_millis() as u64,
            "family resolved"
        );

        if !q.resolved() {
            // Waiting for the second family.
            return;
        }

        let display = self
            .pool
            .display_of(server)
            .unwrap_or_else(|| server.to_string());
        self.finish(key, None, Some(display));
    }

    /// Retry timer fired while at least one family is still unresolved.
    async fn on_timer(&mut self, key: u64) {
        let Some(q) = self.table.get_mut(key) else {
            return;
        };
        q.timer = None;
        if q.tries_left == 0 {
            error!(host = %q.hostname, "reached max_tries limit");
            self.finish(key, Some(ResolveStatus::Internal), None);
            return;
        }
        debug!(host = %q.hostname, tries_left = q.tries_left, "retry timer expired, resending");
        self.send_query(key, true).await;
    }

    /// Remove the query, build the final result and notify every waiter in
    /// list order, exactly once each.
    fn finish(&mut self, key: u64, status_override: Option<ResolveStatus>, server: Option<String>) {
        let Some(mut q) = self.table.remove(key) else {
            return;
        };
        if let Some(timer_key) = q.timer.take() {
            self.timers.try_remove(&timer_key);
        }

        let status = status_override.unwrap_or(q.status);
        let resolution = aggregate::finalize(&q, status, server);
        debug!(
            host = %q.hostname,
            status = resolution.code(),
            addrs = resolution.addresses.len(),
            waiters = q.waiters.len(),
            pending = self.table.len(),
            "query done"
        );

        for waiter in q.waiters.drain(..) {
            let _ = waiter.tx.send(resolution.clone());
        }
    }

    /// Fail every pending query and release the server sockets.
    fn teardown(&mut self) {
        let pending = self.table.drain();
        if !pending.is_empty() {
            warn!(count = pending.len(), "engine stopping with pending queries");
        }
        for mut q in pending {
            if let Some(timer_key) = q.timer.take() {
                self.timers.try_remove(&timer_key);
            }
            let resolution = aggregate::finalize(&q, ResolveStatus::Internal, None);
            for waiter in q.waiters.drain(..) {
                let _ = waiter.tx.send(resolution.clone());
            }
        }
        self.pool.disconnect_all();
        debug!("resolver engine stopped");
    }
}
