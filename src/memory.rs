//! In-memory collaborators
//!
//! Backs the service when no external keystore or chain backend is wired in,
//! and doubles as an observable fake in tests: every chain-side call is
//! counted per [`Step`] and any step can be made to fail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::providers::{
    BalanceOracle, BeneficiaryResolver, ChannelAddressResolver, ChannelLedger, Collaborators,
    EarningsOracle, IdentityStore, RegistrationOracle, Transactor,
};
use crate::selector::DefaultSelector;
use crate::types::*;

// ============ Keystore ============

struct KeyEntry {
    seq: u64,
    passphrase_digest: [u8; 32],
    unlocked_on: Vec<ChainId>,
}

/// Keystore kept in process memory; every identity starts locked
#[derive(Default)]
pub struct MemoryKeystore {
    entries: DashMap<Address, KeyEntry>,
    next_seq: AtomicU64,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_unlocked(&self, address: &Address, chain_id: ChainId) -> bool {
        self.entries
            .get(address)
            .map(|e| e.unlocked_on.contains(&chain_id))
            .unwrap_or(false)
    }
}

fn passphrase_digest(address: &Address, passphrase: &str) -> [u8; 32] {
    Sha256::new()
        .chain_update(address.as_bytes())
        .chain_update(passphrase.as_bytes())
        .finalize()
        .into()
}

#[async_trait]
impl IdentityStore for MemoryKeystore {
    async fn identities(&self) -> anyhow::Result<Vec<Identity>> {
        let mut entries: Vec<(u64, Address)> =
            self.entries.iter().map(|r| (r.value().seq, *r.key())).collect();
        entries.sort_unstable();
        Ok(entries.into_iter().map(|(_, a)| Identity::new(a)).collect())
    }

    async fn get_identity(&self, address: &Address) -> anyhow::Result<Option<Identity>> {
        Ok(self.entries.contains_key(address).then(|| Identity::new(*address)))
    }

    async fn create_new_identity(&self, passphrase: &str) -> anyhow::Result<Identity> {
        let address = Address::from_bytes(rand::random());
        let entry = KeyEntry {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            passphrase_digest: passphrase_digest(&address, passphrase),
            unlocked_on: Vec::new(),
        };
        if self.entries.insert(address, entry).is_some() {
            bail!("address collision for {}", address);
        }
        Ok(Identity::new(address))
    }

    async fn unlock(&self, chain_id: ChainId, address: &Address, passphrase: &str) -> anyhow::Result<()> {
        let mut entry = self
            .entries
            .get_mut(address)
            .ok_or_else(|| anyhow!("identity {} is not in the keystore", address))?;
        if entry.passphrase_digest != passphrase_digest(address, passphrase) {
            bail!("could not decrypt key: wrong passphrase");
        }
        if !entry.unlocked_on.contains(&chain_id) {
            entry.unlocked_on.push(chain_id);
        }
        Ok(())
    }
}

// ============ Chain ============

/// Chain-side lookups, used to count calls and inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Registration,
    ChannelAddress,
    Hermes,
    Ledger,
    Balance,
    Earnings,
    Beneficiary,
    Referral,
}

#[derive(Debug, Clone, Default)]
struct ChainRecord {
    registration: RegistrationStatus,
    balance: Amount,
    earnings: Earnings,
    stake: Amount,
}

/// Registry, channel, balance, earnings, beneficiary and referral state
pub struct MemoryChain {
    default_hermes: Address,
    hermes: DashMap<ChainId, Address>,
    records: DashMap<(ChainId, Address), ChainRecord>,
    beneficiaries: DashMap<Address, Address>,
    referral_tokens: DashMap<Address, String>,
    failures: DashMap<Step, String>,
    calls: DashMap<Step, usize>,
}

impl MemoryChain {
    pub fn new(default_hermes: Address) -> Self {
        Self {
            default_hermes,
            hermes: DashMap::new(),
            records: DashMap::new(),
            beneficiaries: DashMap::new(),
            referral_tokens: DashMap::new(),
            failures: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    pub fn set_hermes(&self, chain_id: ChainId, hermes: Address) {
        self.hermes.insert(chain_id, hermes);
    }

    pub fn set_registration(&self, chain_id: ChainId, address: Address, status: RegistrationStatus) {
        self.records.entry((chain_id, address)).or_default().registration = status;
    }

    pub fn set_balance(&self, chain_id: ChainId, address: Address, balance: Amount) {
        self.records.entry((chain_id, address)).or_default().balance = balance;
    }

    pub fn set_earnings(&self, chain_id: ChainId, address: Address, earnings: Earnings) {
        self.records.entry((chain_id, address)).or_default().earnings = earnings;
    }

    pub fn set_stake(&self, chain_id: ChainId, address: Address, stake: Amount) {
        self.records.entry((chain_id, address)).or_default().stake = stake;
    }

    pub fn set_beneficiary(&self, address: Address, beneficiary: Address) {
        self.beneficiaries.insert(address, beneficiary);
    }

    pub fn set_referral_token(&self, address: Address, token: impl Into<String>) {
        self.referral_tokens.insert(address, token.into());
    }

    /// Make every subsequent call of `step` fail with `message`
    pub fn fail(&self, step: Step, message: impl Into<String>) {
        self.failures.insert(step, message.into());
    }

    pub fn recover(&self, step: Step) {
        self.failures.remove(&step);
    }

    /// Number of calls made to `step` so far
    pub fn calls(&self, step: Step) -> usize {
        self.calls.get(&step).map(|c| *c.value()).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| *c.value()).sum()
    }

    fn enter(&self, step: Step) -> anyhow::Result<()> {
        *self.calls.entry(step).or_insert(0) += 1;
        if let Some(message) = self.failures.get(&step) {
            bail!("{}", message.value());
        }
        Ok(())
    }

    fn hermes_for(&self, chain_id: ChainId) -> Address {
        self.hermes
            .get(&chain_id)
            .map(|h| *h.value())
            .unwrap_or(self.default_hermes)
    }

    fn record(&self, chain_id: ChainId, address: &Address) -> ChainRecord {
        self.records
            .get(&(chain_id, *address))
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}

/// Channel address as the trailing 20 bytes of SHA-256(chain, hermes, identity)
pub fn derive_channel_address(chain_id: ChainId, hermes: &Address, identity: &Address) -> Address {
    let digest = Sha256::new()
        .chain_update(chain_id.to_be_bytes())
        .chain_update(hermes.as_bytes())
        .chain_update(identity.as_bytes())
        .finalize();
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
    Address::from_bytes(bytes)
}

#[async_trait]
impl RegistrationOracle for MemoryChain {
    async fn registration_status(
        &self,
        chain_id: ChainId,
        identity: &Identity,
    ) -> anyhow::Result<RegistrationStatus> {
        self.enter(Step::Registration)?;
        Ok(self.record(chain_id, &identity.address).registration)
    }
}

#[async_trait]
impl ChannelAddressResolver for MemoryChain {
    async fn channel_address(&self, chain_id: ChainId, identity: &Identity) -> anyhow::Result<Address> {
        self.enter(Step::ChannelAddress)?;
        Ok(derive_channel_address(
            chain_id,
            &self.hermes_for(chain_id),
            &identity.address,
        ))
    }

    async fn active_hermes(&self, chain_id: ChainId) -> anyhow::Result<Address> {
        self.enter(Step::Hermes)?;
        Ok(self.hermes_for(chain_id))
    }
}

#[async_trait]
impl BalanceOracle for MemoryChain {
    async fn force_balance_update(&self, chain_id: ChainId, identity: &Identity) -> anyhow::Result<Amount> {
        self.enter(Step::Balance)?;
        Ok(self.record(chain_id, &identity.address).balance)
    }
}

#[async_trait]
impl EarningsOracle for MemoryChain {
    async fn earnings(&self, chain_id: ChainId, identity: &Identity) -> anyhow::Result<Earnings> {
        self.enter(Step::Earnings)?;
        Ok(self.record(chain_id, &identity.address).earnings)
    }
}

#[async_trait]
impl ChannelLedger for MemoryChain {
    async fn provider_channel(
        &self,
        chain_id: ChainId,
        hermes: &Address,
        provider: &Address,
        _pending: bool,
    ) -> anyhow::Result<ProviderChannel> {
        self.enter(Step::Ledger)?;
        if *hermes != self.hermes_for(chain_id) {
            bail!("no channel with hermes {} on chain {}", hermes, chain_id);
        }
        Ok(ProviderChannel {
            stake: self.record(chain_id, provider).stake,
        })
    }
}

#[async_trait]
impl BeneficiaryResolver for MemoryChain {
    async fn beneficiary(&self, address: &Address) -> anyhow::Result<Address> {
        self.enter(Step::Beneficiary)?;
        Ok(self
            .beneficiaries
            .get(address)
            .map(|b| *b.value())
            .unwrap_or(*address))
    }
}

#[async_trait]
impl Transactor for MemoryChain {
    async fn referral_token(&self, address: &Address) -> anyhow::Result<String> {
        self.enter(Step::Referral)?;
        self.referral_tokens
            .get(address)
            .map(|t| t.value().clone())
            .ok_or_else(|| anyhow!("no referral campaign available for {}", address))
    }

    async fn referral_token_available(&self, address: &Address) -> anyhow::Result<()> {
        self.enter(Step::Referral)?;
        if !self.referral_tokens.contains_key(address) {
            bail!("{} is not eligible for a referral token", address);
        }
        Ok(())
    }
}

// ============ Backend ============

/// Keystore, chain and selector wired together
#[derive(Clone)]
pub struct MemoryBackend {
    pub keystore: Arc<MemoryKeystore>,
    pub chain: Arc<MemoryChain>,
    pub selector: Arc<DefaultSelector>,
}

impl MemoryBackend {
    pub fn new(hermes: Address) -> Self {
        let keystore = Arc::new(MemoryKeystore::new());
        let selector = Arc::new(DefaultSelector::new(keystore.clone()));
        Self {
            keystore,
            chain: Arc::new(MemoryChain::new(hermes)),
            selector,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: self.keystore.clone(),
            selector: self.selector.clone(),
            registry: self.chain.clone(),
            channels: self.chain.clone(),
            balances: self.chain.clone(),
            earnings: self.chain.clone(),
            ledger: self.chain.clone(),
            beneficiaries: self.chain.clone(),
            transactor: self.chain.clone(),
        }
    }
}
