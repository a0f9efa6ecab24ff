pub mod transport;
pub mod txid;
pub mod wire_codec;

pub use transport::{DatagramSocket, DatagramTransport, Inbound};
pub use txid::TxidSource;
pub use wire_codec::{WireAnswer, WireCodec, WireData, WireQuestion, WireResponse};
