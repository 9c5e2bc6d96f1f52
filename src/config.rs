use std::env;
use std::time::Duration;

use crate::types::{Address, ChainId};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub version: String,
    /// Chain every request is scoped to
    pub chain_id: ChainId,
    /// Active hermes seeded into the bundled backend
    pub hermes_address: Address,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4050),
            version: env!("CARGO_PKG_VERSION").to_string(),
            chain_id: env::var("CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            hermes_address: hermes_address(env::var("HERMES_ADDRESS").ok()),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Unset falls back to the zero address quietly, garbage falls back loudly
fn hermes_address(raw: Option<String>) -> Address {
    let Some(raw) = raw else {
        return Address::ZERO;
    };
    match raw.parse() {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!("Invalid HERMES_ADDRESS {:?} ({}), using {}", raw, e, Address::ZERO);
            Address::ZERO
        }
    }
}
