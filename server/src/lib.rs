//! Shared types and HTTP API for the keyledger server.

mod error;

pub use error::{ApiError, ErrorResponse};

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use keyledger_license::{LicenseRecord, OriginId, ValidationOutcome, ValidationResult};
use keyledger_registry::{LicenseRegistry, RegistryResult};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};

#[derive(Clone)]
struct AppState {
    registry: Arc<LicenseRegistry>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CreateLicenseRequest {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub max_uses: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValidateRequest {
    pub key: String,
}

/// Body of `POST /api/v1/validate`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub result: ValidationResult,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RevokeResponse {
    pub key: String,
    pub revoked: bool,
}

/// Runs a registry call on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LicenseRegistry) -> RegistryResult<T> + Send + 'static,
{
    let registry = Arc::clone(&state.registry);
    let result = tokio::task::spawn_blocking(move || op(&registry))
        .await
        .map_err(|e| ApiError::Internal(format!("registry task failed: {e}")))?;
    Ok(result?)
}

async fn create_license(
    State(state): State<AppState>,
    payload: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LicenseRecord>), ApiError> {
    let Json(req) = payload?;
    let record = run_blocking(&state, move |registry| {
        registry.generate(req.owner_id.as_deref(), req.max_uses)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_licenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicenseRecord>>, ApiError> {
    let records = run_blocking(&state, |registry| registry.list_all()).await?;
    Ok(Json(records))
}

async fn get_license(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LicenseRecord>, ApiError> {
    let lookup = key.clone();
    run_blocking(&state, move |registry| registry.inspect(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("license {key}")))
}

async fn revoke_license(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RevokeResponse>, ApiError> {
    let target = key.clone();
    let revoked = run_blocking(&state, move |registry| registry.revoke(&target)).await?;
    if !revoked {
        return Err(ApiError::NotFound(format!("license {key}")));
    }
    Ok(Json(RevokeResponse { key, revoked }))
}

/// Validates a key for the connecting peer's IP address.
async fn validate_license(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ValidateResponse>), ApiError> {
    let Json(req) = payload?;
    let origin = OriginId::from_ip(peer.ip());
    let result = run_blocking(&state, move |registry| {
        registry.validate(&req.key, origin.as_str())
    })
    .await?;

    let status = match result.outcome {
        ValidationOutcome::NotFound => StatusCode::NOT_FOUND,
        outcome if outcome.is_granted() => StatusCode::OK,
        _ => StatusCode::FORBIDDEN,
    };
    let body = ValidateResponse {
        valid: result.outcome.is_granted(),
        result,
    };
    Ok((status, Json(body)))
}

/// Build the HTTP API router over the given registry.
///
/// `POST /api/v1/validate` reads the peer address, so serve the router with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(registry: Arc<LicenseRegistry>) -> Router {
    Router::new()
        .route("/api/v1/licenses", post(create_license).get(list_licenses))
        .route("/api/v1/licenses/{key}", get(get_license))
        .route("/api/v1/licenses/{key}/revoke", post(revoke_license))
        .route("/api/v1/validate", post(validate_license))
        .with_state(AppState { registry })
}
