#![allow(dead_code)]
//! Minimal scripted DNS server speaking raw wire format over UDP.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

const QTYPE_A: u16 = 1;
const QTYPE_AAAA: u16 = 28;

/// How the mock reacts to every query it receives.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Answer A queries with 192.0.2.10 and AAAA queries with 2001:db8::10,
    /// TTL 60.
    Answer,
    /// Respond with the given rcode and no records.
    Rcode(u8),
    /// Swallow queries without responding.
    Silent,
}

pub struct MockDnsServer {
    addr: SocketAddr,
    received: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(mode: Mode) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            counter.fetch_add(1, Ordering::Relaxed);
                            if let Mode::Silent = mode {
                                continue;
                            }
                            let response = build_response(&buf[..len], mode);
                            if !response.is_empty() {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            received,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Number of queries seen so far.
    pub fn received(&self) -> usize {
        self.received.load(Ordering::Relaxed)
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Build a response echoing the query's id and question section. Any EDNS
/// OPT additional in the query is not echoed back.
fn build_response(query: &[u8], mode: Mode) -> Vec<u8> {
    if query.len() < 12 {
        return vec![];
    }

    // Walk the question name to find where qtype/qclass start.
    let mut pos = 12;
    while pos < query.len() && query[pos] != 0 {
        pos += 1 + query[pos] as usize;
    }
    let question_end = pos + 5; // root byte + qtype + qclass
    if question_end > query.len() {
        return vec![];
    }
    let qtype = u16::from_be_bytes([query[pos + 1], query[pos + 2]]);

    let rcode = match mode {
        Mode::Rcode(rcode) => rcode,
        _ => 0,
    };
    let answer: &[u8] = match (mode, qtype) {
        (Mode::Answer, QTYPE_A) => &[
            0xc0, 0x0c, // name: pointer to the question
            0x00, 0x01, // type A
            0x00, 0x01, // class IN
            0x00, 0x00, 0x00, 0x3c, // ttl 60
            0x00, 0x04, // rdlength
            192, 0, 2, 10,
        ],
        (Mode::Answer, QTYPE_AAAA) => &[
            0xc0, 0x0c, //
            0x00, 0x1c, // type AAAA
            0x00, 0x01, //
            0x00, 0x00, 0x00, 0x3c, //
            0x00, 0x10, //
            0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10,
        ],
        _ => &[],
    };

    let mut response = Vec::with_capacity(512);
    response.extend_from_slice(&query[0..2]); // id
    response.push(0x81); // QR + RD
    response.push(0x80 | rcode); // RA + rcode
    response.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
    response.extend_from_slice(&[0x00, if answer.is_empty() { 0 } else { 1 }]); // ANCOUNT
    response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // NSCOUNT, ARCOUNT
    response.extend_from_slice(&query[12..question_end]);
    response.extend_from_slice(answer);
    response
}
