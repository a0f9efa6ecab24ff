mod udp;

pub use udp::UdpDatagramTransport;
