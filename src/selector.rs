//! Default "current identity" policy
//!
//! Reuse the hinted identity, else the last one handed out, else the first
//! known one, else create a fresh one. Whatever is picked gets unlocked for
//! the requested chain before it is returned.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::providers::{IdentitySelector, IdentityStore, SelectionError};
use crate::types::{Address, ChainId, Identity};

pub struct DefaultSelector {
    store: Arc<dyn IdentityStore>,
    last_used: RwLock<Option<Address>>,
}

impl DefaultSelector {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            last_used: RwLock::new(None),
        }
    }

    pub async fn last_used(&self) -> Option<Address> {
        *self.last_used.read().await
    }

    async fn pick_or_create(&self, passphrase: &str) -> anyhow::Result<Identity> {
        if let Some(address) = self.last_used().await {
            if let Some(identity) = self.store.get_identity(&address).await? {
                return Ok(identity);
            }
        }

        if let Some(first) = self.store.identities().await?.into_iter().next() {
            return Ok(first);
        }

        let identity = self.store.create_new_identity(passphrase).await?;
        tracing::info!("No identities found, created {}", identity.address);
        Ok(identity)
    }
}

#[async_trait]
impl IdentitySelector for DefaultSelector {
    async fn use_or_create(
        &self,
        hint: Option<Address>,
        passphrase: &str,
        chain_id: ChainId,
    ) -> anyhow::Result<Identity> {
        let identity = match hint {
            Some(address) => self
                .store
                .get_identity(&address)
                .await?
                .ok_or(SelectionError::UnknownIdentity(address))?,
            None => self.pick_or_create(passphrase).await?,
        };

        self.store
            .unlock(chain_id, &identity.address, passphrase)
            .await
            .map_err(|reason| SelectionError::Unlock {
                address: identity.address,
                reason,
            })?;

        *self.last_used.write().await = Some(identity.address);
        Ok(identity)
    }
}
