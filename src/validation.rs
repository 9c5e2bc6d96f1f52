//! Request validation
//!
//! Each request type reports every failing field at once so the caller gets a
//! complete field-level error map instead of the first problem only.

use crate::error::{ApiError, ApiResult};
use crate::types::{
    Address, FieldError, FieldErrors, IdentityCreateRequest, IdentityCurrentRequest,
    IdentityUnlockRequest,
};

const REQUIRED: FieldError = FieldError {
    code: "required",
    message: "Field is required",
};

const INVALID_ADDRESS: FieldError = FieldError {
    code: "invalid",
    message: "Field must be a 0x-prefixed 20 byte hex address",
};

/// Requests that carry user-supplied fields
pub trait Validate {
    fn validate(&self) -> FieldErrors;

    fn ensure_valid(&self) -> ApiResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Validate passphrase presence
pub fn validate_passphrase(passphrase: Option<&str>) -> Result<(), FieldError> {
    match passphrase {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(REQUIRED),
    }
}

/// Validate an optional address hint
pub fn validate_address_hint(address: Option<&str>) -> Result<(), FieldError> {
    match address {
        Some(a) if a.parse::<Address>().is_err() => Err(INVALID_ADDRESS),
        _ => Ok(()),
    }
}

fn collect(errors: &mut FieldErrors, field: &'static str, result: Result<(), FieldError>) {
    if let Err(e) = result {
        errors.entry(field).or_default().push(e);
    }
}

impl Validate for IdentityCreateRequest {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        collect(&mut errors, "passphrase", validate_passphrase(self.passphrase.as_deref()));
        errors
    }
}

impl Validate for IdentityCurrentRequest {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        collect(&mut errors, "address", validate_address_hint(self.address.as_deref()));
        collect(&mut errors, "passphrase", validate_passphrase(self.passphrase.as_deref()));
        errors
    }
}

impl Validate for IdentityUnlockRequest {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        collect(&mut errors, "passphrase", validate_passphrase(self.passphrase.as_deref()));
        errors
    }
}
