//! Fleet DNS Infrastructure Layer
//!
//! Adapters behind the application ports: the hickory-proto wire codec, the
//! connected-UDP datagram transport and the random transaction-id source.

pub mod codec;
pub mod transport;
pub mod txid;

use fleet_dns_application::Resolver;
use fleet_dns_domain::{ResolveError, ResolverConfig};
use std::sync::Arc;

pub use codec::HickoryCodec;
pub use transport::UdpDatagramTransport;
pub use txid::RandomTxids;

/// Wire up a resolver over plain UDP with the standard adapters.
pub fn udp_resolver(config: ResolverConfig) -> Result<Resolver, ResolveError> {
    let transport = UdpDatagramTransport::new(config.buf_size);
    Resolver::new(
        config,
        Arc::new(HickoryCodec),
        Arc::new(transport),
        Arc::new(RandomTxids),
    )
}
