//! Caller-scoped actions: profile, admin bootstrap, hotel activation and the
//! session endpoints behind toasts, picture failures and permission retries.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::api::validation::validate_profile;
use crate::client::{Redirect, TokenCheck};
use crate::models::UserProfile;
use crate::notify::Toast;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureFailedRequest {
    pub room_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationResponse {
    pub activated: bool,
    pub redirect: Redirect,
}

pub async fn save_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(profile): Json<UserProfile>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    validate_profile(&profile)?;
    let profile = UserProfile {
        name: profile.name.trim().to_string(),
        email: profile.email.filter(|e| !e.trim().is_empty()),
        phone: profile.phone.filter(|p| !p.trim().is_empty()),
    };
    state.client(&principal).save_profile(profile).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// First caller to ask becomes the admin
pub async fn bootstrap_admin(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    state.client(&principal).make_me_admin().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Format check, then the backend's opinion for well-formed tokens
pub async fn validate_invite_token(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenCheck>, ApiError> {
    let check = state
        .client(&caller.principal())
        .check_invite_token(&req.token)
        .await?;
    Ok(Json(check))
}

pub async fn consume_invite_token(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<TokenRequest>,
) -> Result<Json<ActivationResponse>, ApiError> {
    let principal = caller.require_signed_in()?;
    let redirect = state.client(&principal).consume_invite_token(&req.token).await?;
    tracing::info!(principal = %principal, "Hotel owner activated with invite token");
    Ok(Json(ActivationResponse {
        activated: true,
        redirect,
    }))
}

/// Drop the cached role lookups so the next gated page asks the backend again
pub async fn retry_permissions(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> StatusCode {
    state.client(&caller.principal()).retry_permissions();
    StatusCode::NO_CONTENT
}

/// Drain the caller's pending toasts
pub async fn notifications(State(state): State<Arc<AppState>>, caller: Caller) -> Json<Vec<Toast>> {
    let client = state.client(&caller.principal());
    Json(client.session().take_toasts())
}

/// Reported by the page when an image fails to load; it is left out of later renders.
/// Only signed-in callers that have rendered the room are remembered.
pub async fn picture_failed(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<PictureFailedRequest>,
) -> StatusCode {
    let client = state.client(&caller.principal());
    if !client.session().mark_picture_failed(&req.room_id, &req.url) {
        tracing::debug!(room_id = %req.room_id, "Picture failure not recorded");
    }
    StatusCode::NO_CONTENT
}
