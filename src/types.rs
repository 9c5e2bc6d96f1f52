//! Core types for the identity status service
//!
//! Domain values (addresses, registration states, balances) and the
//! request/response DTOs exchanged over HTTP.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Chain identifier scoping every chain-dependent query
pub type ChainId = i64;

/// Token amount in the smallest unit
pub type Amount = u128;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

// ============ Address ============

/// Fixed-length account address, rendered as `0x` + 40 lowercase hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be {expected} hex characters, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("address contains non-hex characters")]
    InvalidHex,
}

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                got: digits.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

// ============ Identity Types ============

/// Locally held identity, backed by an encrypted keystore entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub address: Address,
}

impl Identity {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

/// On-chain registration state of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RegistrationStatus {
    #[default]
    Unregistered,
    InProgress,
    Registered,
    RegistrationError,
}

impl RegistrationStatus {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationStatus::Registered)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationStatus::Unregistered => "Unregistered",
            RegistrationStatus::InProgress => "InProgress",
            RegistrationStatus::Registered => "Registered",
            RegistrationStatus::RegistrationError => "RegistrationError",
        };
        f.write_str(s)
    }
}

/// Accrued earnings of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Earnings {
    /// Owed but not yet settled on-chain
    pub unsettled_balance: Amount,
    /// All-time total
    pub lifetime_balance: Amount,
}

/// Provider's payment channel record held by the channel ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderChannel {
    pub stake: Amount,
}

// ============ API Request Types ============

/// Create identity request
#[derive(Debug, Default, Deserialize)]
pub struct IdentityCreateRequest {
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Select-current identity request
#[derive(Debug, Default, Deserialize)]
pub struct IdentityCurrentRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Unlock identity request
#[derive(Debug, Default, Deserialize)]
pub struct IdentityUnlockRequest {
    #[serde(default)]
    pub passphrase: Option<String>,
}

// ============ Response Types ============

/// Lightweight identity reference, never carries key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRef {
    pub id: Address,
}

impl From<&Identity> for IdentityRef {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.address,
        }
    }
}

/// Identity list response
#[derive(Debug, Serialize)]
pub struct IdentityListResponse {
    pub identities: Vec<IdentityRef>,
}

/// Full status aggregate of an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityStatus {
    pub id: Address,
    pub registration_status: RegistrationStatus,
    pub channel_address: Address,
    pub balance: Amount,
    pub earnings: Amount,
    pub earnings_total: Amount,
    pub stake: Amount,
}

/// Registration check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationResponse {
    pub status: RegistrationStatus,
    pub registered: bool,
}

impl From<RegistrationStatus> for RegistrationResponse {
    fn from(status: RegistrationStatus) -> Self {
        Self {
            status,
            registered: status.is_registered(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BeneficiaryResponse {
    pub beneficiary: Address,
}

#[derive(Debug, Serialize)]
pub struct ReferralTokenResponse {
    pub token: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub chain_id: ChainId,
    /// `None` when the keystore could not be listed
    pub identities_count: Option<usize>,
}

/// Single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: &'static str,
    pub message: &'static str,
}

/// Validation failures keyed by request field
pub type FieldErrors = BTreeMap<&'static str, Vec<FieldError>>;

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            hint: None,
            errors: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_field_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}
