//! Process configuration, read from the environment.

use std::num::ParseIntError;

/// Port used when `PORT` is unset or empty.
pub const DEFAULT_PORT: u16 = 3000;

/// Interface used when `MARQUEE_HOST` is unset or empty.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `PORT` is set but is not a valid port number.
    #[error("invalid PORT value {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Where the relay listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind, e.g. `0.0.0.0` or `::`.
    pub host: String,
    /// TCP port to bind. `0` asks the OS for a free one.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Reads `PORT` and `MARQUEE_HOST` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = match set("PORT") {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };
        let host = set("MARQUEE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        Ok(Self { host, port })
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
