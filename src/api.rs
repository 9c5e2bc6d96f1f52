use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::*;
use crate::validation::Validate;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health))
        // Identity lifecycle
        .route("/identities", get(list_identities).post(create_identity))
        .route("/identities/current", put(current_identity))
        .route("/identities/:id", get(identity_status))
        .route("/identities/:id/status", get(identity_status))
        .route("/identities/:id/unlock", put(unlock_identity))
        // Chain lookups
        .route("/identities/:id/registration", get(registration_status))
        .route("/identities/:id/beneficiary", get(beneficiary))
        // Referral
        .route("/identities/:id/referral", get(referral_token))
        .route("/identities/:id/referral-available", get(referral_token_available))
        .with_state(state)
}

/// Unwrap a JSON body, reporting undecodable input as a bad request
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// ============ Health Endpoints ============

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health().await)
}

// ============ Identity Endpoints ============

async fn list_identities(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let identities = state.aggregator.list().await?;
    Ok(Json(IdentityListResponse { identities }))
}

async fn create_identity(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdentityCreateRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(payload)?;
    req.ensure_valid()?;

    let passphrase = req.passphrase.unwrap_or_default();
    let identity = state.aggregator.create(&passphrase).await?;
    Ok(Json(identity))
}

async fn current_identity(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdentityCurrentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(payload)?;
    req.ensure_valid()?;

    // Malformed hints were rejected by validation
    let hint = req.address.as_deref().and_then(|a| a.parse::<Address>().ok());
    let passphrase = req.passphrase.unwrap_or_default();

    let identity = state
        .aggregator
        .select_current(hint, &passphrase, state.chain_id())
        .await?;
    Ok(Json(identity))
}

async fn identity_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = state.aggregator.status(&id, state.chain_id()).await?;
    Ok(Json(status))
}

async fn unlock_identity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<IdentityUnlockRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    // Unknown identities are 404 whatever the body holds
    let identity = state.aggregator.resolve(&id).await?;

    let req = json_body(payload)?;
    req.ensure_valid()?;

    let passphrase = req.passphrase.unwrap_or_default();
    state
        .aggregator
        .unlock(&identity, &passphrase, state.chain_id())
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn registration_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let resp = state
        .aggregator
        .registration_status(&id, state.chain_id())
        .await?;
    Ok(Json(resp))
}

async fn beneficiary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.aggregator.beneficiary(&id).await?))
}

// ============ Referral Endpoints ============

async fn referral_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.aggregator.referral_token(&id).await?))
}

async fn referral_token_available(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.aggregator.referral_token_available(&id).await?;
    Ok(StatusCode::OK)
}
