//! Collaborator interfaces
//!
//! The service never talks to a keystore, chain node or settlement backend
//! directly. Each dependency is reached through one of these narrow traits so
//! it can be swapped or mocked on its own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Address, Amount, ChainId, Earnings, Identity, ProviderChannel, RegistrationStatus};

/// Keystore holding locally known identities
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// All known identities, in a stable order
    async fn identities(&self) -> anyhow::Result<Vec<Identity>>;

    /// Look up a known identity; `None` if the keystore has no such entry
    async fn get_identity(&self, address: &Address) -> anyhow::Result<Option<Identity>>;

    async fn create_new_identity(&self, passphrase: &str) -> anyhow::Result<Identity>;

    /// Decrypt the identity for signing on `chain_id`
    async fn unlock(&self, chain_id: ChainId, address: &Address, passphrase: &str) -> anyhow::Result<()>;
}

/// Failures a selector reports with meaning beyond "upstream broke"
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("identity {0} not found")]
    UnknownIdentity(Address),
    #[error("failed to unlock identity {address}: {reason:#}")]
    Unlock {
        address: Address,
        reason: anyhow::Error,
    },
}

/// Policy picking the identity to use as "current"
///
/// Implementations should return [`SelectionError`] wrapped in the
/// `anyhow::Error` for unknown hints and unlock failures.
#[async_trait]
pub trait IdentitySelector: Send + Sync {
    async fn use_or_create(
        &self,
        hint: Option<Address>,
        passphrase: &str,
        chain_id: ChainId,
    ) -> anyhow::Result<Identity>;
}

#[async_trait]
pub trait RegistrationOracle: Send + Sync {
    async fn registration_status(
        &self,
        chain_id: ChainId,
        identity: &Identity,
    ) -> anyhow::Result<RegistrationStatus>;
}

#[async_trait]
pub trait ChannelAddressResolver: Send + Sync {
    /// Deterministic channel address of `identity` on `chain_id`
    async fn channel_address(&self, chain_id: ChainId, identity: &Identity) -> anyhow::Result<Address>;

    /// Settlement intermediary currently active on `chain_id`
    async fn active_hermes(&self, chain_id: ChainId) -> anyhow::Result<Address>;
}

#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Refresh from chain and return the settled balance
    async fn force_balance_update(&self, chain_id: ChainId, identity: &Identity) -> anyhow::Result<Amount>;
}

#[async_trait]
pub trait EarningsOracle: Send + Sync {
    async fn earnings(&self, chain_id: ChainId, identity: &Identity) -> anyhow::Result<Earnings>;
}

#[async_trait]
pub trait ChannelLedger: Send + Sync {
    async fn provider_channel(
        &self,
        chain_id: ChainId,
        hermes: &Address,
        provider: &Address,
        pending: bool,
    ) -> anyhow::Result<ProviderChannel>;
}

#[async_trait]
pub trait BeneficiaryResolver: Send + Sync {
    async fn beneficiary(&self, address: &Address) -> anyhow::Result<Address>;
}

/// Referral campaign backend
#[async_trait]
pub trait Transactor: Send + Sync {
    async fn referral_token(&self, address: &Address) -> anyhow::Result<String>;

    /// `Ok(())` when `address` is eligible for a token
    async fn referral_token_available(&self, address: &Address) -> anyhow::Result<()>;
}

/// Every collaborator the aggregator depends on
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn IdentityStore>,
    pub selector: Arc<dyn IdentitySelector>,
    pub registry: Arc<dyn RegistrationOracle>,
    pub channels: Arc<dyn ChannelAddressResolver>,
    pub balances: Arc<dyn BalanceOracle>,
    pub earnings: Arc<dyn EarningsOracle>,
    pub ledger: Arc<dyn ChannelLedger>,
    pub beneficiaries: Arc<dyn BeneficiaryResolver>,
    pub transactor: Arc<dyn Transactor>,
}
