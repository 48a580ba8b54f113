//! Admin maintenance: invite tokens, legacy data cleanup and data purges.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::api::validation::validate_max_uses;
use crate::models::{CreateInviteTokenRequest, InviteToken, Principal};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: u64,
}

pub async fn create_invite_token(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateInviteTokenRequest>,
) -> Result<(StatusCode, Json<CreatedTokenResponse>), ApiError> {
    let principal = caller.require_signed_in()?;
    validate_max_uses(req.max_uses).map_err(|e| ApiError::validation_field("maxUses", e))?;
    let token = state
        .client(&principal)
        .create_invite_token(req.max_uses, req.bound_principal)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedTokenResponse { token })))
}

pub async fn list_invite_tokens(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<InviteToken>>, ApiError> {
    let principal = caller.require_signed_in()?;
    let tokens = state.client(&principal).invite_tokens().await?;
    Ok(Json(tokens))
}

/// Strip empty picture entries left by older room records
pub async fn remove_legacy_room_photos(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<CleanupResponse>, ApiError> {
    let principal = caller.require_signed_in()?;
    let removed = state.client(&principal).remove_legacy_room_photos().await?;
    tracing::info!(removed, "Removed legacy room photos");
    Ok(Json(CleanupResponse { removed }))
}

pub async fn remove_legacy_payment_methods(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<CleanupResponse>, ApiError> {
    let principal = caller.require_signed_in()?;
    let removed = state
        .client(&principal)
        .remove_legacy_payment_methods()
        .await?;
    tracing::info!(removed, "Removed legacy payment methods");
    Ok(Json(CleanupResponse { removed }))
}

pub async fn purge_principal(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(target): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    let target = Principal::parse(&target)?;
    state.client(&principal).purge_principal_data(&target).await?;
    tracing::warn!(admin = %principal, target = %target, "Purged principal data");
    Ok(StatusCode::NO_CONTENT)
}
