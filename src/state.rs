//! Application state for the identity status service

use std::sync::Arc;
use std::time::Instant;

use crate::aggregator::IdentityStatusAggregator;
use crate::config::Config;
use crate::providers::Collaborators;
use crate::types::{ChainId, HealthResponse};

/// Global application state
pub struct AppState {
    pub aggregator: IdentityStatusAggregator,
    /// Configuration
    pub config: Config,
    /// Start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, collaborators: Collaborators) -> Arc<Self> {
        Arc::new(Self {
            aggregator: IdentityStatusAggregator::new(collaborators),
            config,
            start_time: Instant::now(),
        })
    }

    /// Chain id for the current request, resolved from configuration
    pub fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    /// Get health info
    pub async fn health(&self) -> HealthResponse {
        let (status, identities_count) = match self.aggregator.list().await {
            Ok(ids) => ("healthy", Some(ids.len())),
            Err(e) => {
                tracing::warn!("Health check could not list identities: {}", e);
                ("degraded", None)
            }
        };

        HealthResponse {
            status: status.into(),
            version: self.config.version.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            chain_id: self.config.chain_id,
            identities_count,
        }
    }
}
