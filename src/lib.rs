//! Identity Status Service
//!
//! Aggregates the state of a locally held identity (registration, channel
//! address, balance, stake and earnings) into one read model and drives the
//! identity lifecycle (create, unlock, select current).
//!
//! ## Architecture
//!
//! - **Providers**: narrow traits for the keystore, selector and chain-side oracles
//! - **Aggregator**: fail-fast fan-out over the providers, no caching
//! - **API**: axum routes under `/identities`, chain id taken from config
//! - **Memory backend**: in-process providers for local runs and tests

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod selector;
pub mod state;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
