use serde::{Deserialize, Serialize};

use crate::errors::ResolveError;

/// Resolver tuning knobs.
///
/// Every field has an explicit default so a plain `ResolverConfig::default()`
/// is usable as-is; upstream servers are added separately at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Send attempts per query before giving up (each attempt rotates servers).
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Retry timer, in milliseconds. One timer per query, covering both families.
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,

    /// Issue AAAA sub-queries alongside A.
    #[serde(default = "default_true")]
    pub enable_ipv6: bool,

    /// Advertise EDNS0 with `buf_size` as the max payload.
    #[serde(default = "default_true")]
    pub edns: bool,

    /// Receive buffer size per server socket, also the EDNS0 payload size.
    #[serde(default = "default_buf_size")]
    pub buf_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
            retry_timeout_ms: default_retry_timeout_ms(),
            enable_ipv6: true,
            edns: true,
            buf_size: default_buf_size(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.max_tries == 0 {
            return Err(ResolveError::ConfigError(
                "max_tries must be at least 1".into(),
            ));
        }
        if self.retry_timeout_ms == 0 {
            return Err(ResolveError::ConfigError(
                "retry_timeout_ms must be non-zero".into(),
            ));
        }
        // 12-byte header plus one question must fit; 512 is the classic floor.
        if self.buf_size < 512 {
            return Err(ResolveError::ConfigError(
                "buf_size must be at least 512".into(),
            ));
        }
        if self.buf_size > u16::MAX as usize {
            return Err(ResolveError::ConfigError(
                "buf_size must fit in the 16-bit EDNS payload field".into(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ResolveError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| ResolveError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn default_max_tries() -> u32 {
    1
}

fn default_retry_timeout_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_buf_size() -> usize {
    4096
}
