//! Identity status aggregation and lifecycle operations
//!
//! Every read is all-or-nothing: the independent lookups run concurrently and
//! the first failure aborts the whole request. Nothing is cached between
//! calls, and the chain id is always passed in by the caller.

use futures::try_join;

use crate::error::{ApiError, ApiResult};
use crate::providers::{Collaborators, SelectionError};
use crate::types::*;

pub struct IdentityStatusAggregator {
    deps: Collaborators,
}

impl IdentityStatusAggregator {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    /// Resolve a path address to a known identity
    pub async fn resolve(&self, address: &str) -> ApiResult<Identity> {
        let address: Address = address.parse().map_err(|_| ApiError::identity_not_found())?;
        self.deps
            .store
            .get_identity(&address)
            .await
            .map_err(|e| ApiError::Internal(format!("keystore lookup failed: {:#}", e)))?
            .ok_or_else(ApiError::identity_not_found)
    }

    // ============ Lifecycle ============

    pub async fn list(&self) -> ApiResult<Vec<IdentityRef>> {
        let identities = self
            .deps
            .store
            .identities()
            .await
            .map_err(|e| ApiError::Internal(format!("failed to list identities: {:#}", e)))?;
        Ok(identities.iter().map(IdentityRef::from).collect())
    }

    pub async fn create(&self, passphrase: &str) -> ApiResult<IdentityRef> {
        let identity = self
            .deps
            .store
            .create_new_identity(passphrase)
            .await
            .map_err(|e| ApiError::upstream("failed to create identity", e))?;
        tracing::info!("Created identity {}", identity.address);
        Ok(IdentityRef::from(&identity))
    }

    pub async fn select_current(
        &self,
        hint: Option<Address>,
        passphrase: &str,
        chain_id: ChainId,
    ) -> ApiResult<IdentityRef> {
        let identity = self
            .deps
            .selector
            .use_or_create(hint, passphrase, chain_id)
            .await
            .map_err(|e| match e.downcast::<SelectionError>() {
                Ok(SelectionError::UnknownIdentity(_)) => ApiError::identity_not_found(),
                Ok(err @ SelectionError::Unlock { .. }) => ApiError::Forbidden(err.to_string()),
                Err(e) => ApiError::upstream("failed to select identity", e),
            })?;
        tracing::info!("Current identity is {} on chain {}", identity.address, chain_id);
        Ok(IdentityRef::from(&identity))
    }

    /// Any unlock failure is a permission problem, not a server fault
    pub async fn unlock(&self, identity: &Identity, passphrase: &str, chain_id: ChainId) -> ApiResult<()> {
        self.deps
            .store
            .unlock(chain_id, &identity.address, passphrase)
            .await
            .map_err(|e| {
                tracing::warn!("Unlock of {} refused: {:#}", identity.address, e);
                ApiError::Forbidden(format!("failed to unlock identity: {:#}", e))
            })?;
        tracing::info!("Unlocked identity {} on chain {}", identity.address, chain_id);
        Ok(())
    }

    // ============ Status ============

    pub async fn status(&self, address: &str, chain_id: ChainId) -> ApiResult<IdentityStatus> {
        let identity = self.resolve(address).await?;
        let deps = &self.deps;

        let registration = async {
            let status = deps
                .registry
                .registration_status(chain_id, &identity)
                .await
                .map_err(|e| ApiError::upstream("failed to check identity registration status", e))?;
            let stake = if status.is_registered() {
                self.stake(chain_id, &identity).await?
            } else {
                0
            };
            Ok::<_, ApiError>((status, stake))
        };
        let channel_address = async {
            deps.channels
                .channel_address(chain_id, &identity)
                .await
                .map_err(|e| ApiError::upstream("failed to calculate channel address", e))
        };
        let balance = async {
            deps.balances
                .force_balance_update(chain_id, &identity)
                .await
                .map_err(|e| ApiError::upstream("failed to refresh balance", e))
        };
        let earnings = async {
            deps.earnings
                .earnings(chain_id, &identity)
                .await
                .map_err(|e| ApiError::upstream("failed to get earnings", e))
        };

        let ((registration_status, stake), channel_address, balance, earnings) =
            try_join!(registration, channel_address, balance, earnings)?;

        tracing::debug!(
            "Status of {} on chain {}: {} (stake {}, balance {})",
            identity.address,
            chain_id,
            registration_status,
            stake,
            balance
        );

        Ok(IdentityStatus {
            id: identity.address,
            registration_status,
            channel_address,
            balance,
            earnings: earnings.unsettled_balance,
            earnings_total: earnings.lifetime_balance,
            stake,
        })
    }

    /// Stake held in the identity's channel with the active hermes
    async fn stake(&self, chain_id: ChainId, identity: &Identity) -> ApiResult<Amount> {
        let hermes = self
            .deps
            .channels
            .active_hermes(chain_id)
            .await
            .map_err(|e| ApiError::upstream("could not get active hermes", e))?;
        let channel = self
            .deps
            .ledger
            .provider_channel(chain_id, &hermes, &identity.address, false)
            .await
            .map_err(|e| ApiError::upstream("failed to get provider channel", e))?;
        Ok(channel.stake)
    }

    pub async fn registration_status(
        &self,
        address: &str,
        chain_id: ChainId,
    ) -> ApiResult<RegistrationResponse> {
        let identity = self.resolve(address).await?;
        let status = self
            .deps
            .registry
            .registration_status(chain_id, &identity)
            .await
            .map_err(|e| ApiError::upstream("failed to check identity registration status", e))?;
        Ok(RegistrationResponse::from(status))
    }

    // ============ Pass-through ============

    pub async fn beneficiary(&self, address: &str) -> ApiResult<BeneficiaryResponse> {
        let address = parse_address(address)?;
        let beneficiary = self
            .deps
            .beneficiaries
            .beneficiary(&address)
            .await
            .map_err(|e| ApiError::upstream("failed to get beneficiary", e))?;
        Ok(BeneficiaryResponse { beneficiary })
    }

    pub async fn referral_token(&self, address: &str) -> ApiResult<ReferralTokenResponse> {
        let address = parse_address(address)?;
        let token = self
            .deps
            .transactor
            .referral_token(&address)
            .await
            .map_err(|e| ApiError::upstream("failed to get referral token", e))?;
        Ok(ReferralTokenResponse { token })
    }

    pub async fn referral_token_available(&self, address: &str) -> ApiResult<()> {
        let address = parse_address(address)?;
        self.deps
            .transactor
            .referral_token_available(&address)
            .await
            .map_err(|e| ApiError::upstream("referral token not available", e))
    }
}

fn parse_address(address: &str) -> ApiResult<Address> {
    address
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid address {}: {}", address, e)))
}
