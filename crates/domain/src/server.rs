use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::errors::ResolveError;

/// Default DNS port.
pub const DNS_PORT: u16 = 53;

/// Parsed upstream endpoint plus the literal string the caller supplied.
///
/// Accepted forms: "1.1.1.1", "8.8.8.8:5353", "::1", "[::1]:53".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    addr: SocketAddr,
    display: String,
}

impl ServerAddr {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The string carried into final results as the originating server.
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<SocketAddr> for ServerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self {
            display: addr.to_string(),
            addr,
        }
    }
}

impl FromStr for ServerAddr {
    type Err = ResolveError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ResolveError::InvalidServerAddr(raw.to_string());

        if let Ok(addr) = SocketAddr::from_str(raw) {
            // "1.2.3.4:53" or "[::1]:53"
            if addr.port() == 0 {
                return Err(invalid());
            }
            return Ok(Self {
                addr,
                display: raw.to_string(),
            });
        }

        if let Ok(ip) = IpAddr::from_str(raw) {
            // Bare IP, either family; port defaults to 53.
            return Ok(Self {
                addr: SocketAddr::new(ip, DNS_PORT),
                display: raw.to_string(),
            });
        }

        // "1.2.3.4:" and "1.2.3.4:0" are caller errors, as is anything
        // that is not an IP literal (hostnames are not resolved here).
        Err(invalid())
    }
}
