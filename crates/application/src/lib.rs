//! Fleet DNS Application Layer
//!
//! The resolver engine (query table, query state machine, server pool,
//! response demultiplexer, result aggregator) plus the ports it consumes:
//! wire codec, datagram transport and transaction-id source. Adapters for
//! the ports live in the infrastructure crate.
pub mod ports;
pub mod resolver;

pub use resolver::{PendingResolution, Resolver, ServerStats};
