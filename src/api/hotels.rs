use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::api::validation::{validate_hotel_profile, validate_payment_method, validate_room};
use crate::models::{HotelProfileUpdate, NewPaymentMethod, Principal, RoomInput, SubscriptionStatus};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub status: SubscriptionStatus,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(update): Json<HotelProfileUpdate>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    validate_hotel_profile(&update)?;
    state.client(&principal).update_hotel_profile(update).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_payment_method(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(method): Json<NewPaymentMethod>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let principal = caller.require_signed_in()?;
    validate_payment_method(&method)?;
    let id = state.client(&principal).add_payment_method(method).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn remove_payment_method(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    state.client(&principal).remove_payment_method(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(room): Json<RoomInput>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let principal = caller.require_signed_in()?;
    validate_room(&room)?;
    let id = state.client(&principal).create_room(room).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn update_room(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(room): Json<RoomInput>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    validate_room(&room)?;
    state.client(&principal).update_room(&id, room).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub async fn set_active(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(hotel_id): Path<String>,
    Json(req): Json<ActiveRequest>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    let hotel_id = Principal::parse(&hotel_id)?;
    state
        .client(&principal)
        .set_hotel_active(&hotel_id, req.active)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_subscription(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(hotel_id): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    let hotel_id = Principal::parse(&hotel_id)?;
    state
        .client(&principal)
        .set_hotel_subscription(&hotel_id, req.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activate a hotel owner directly, without an invite token
pub async fn activate_owner(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(owner): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    let owner = Principal::parse(&owner)?;
    state.client(&principal).activate_hotel_owner(&owner).await?;
    Ok(StatusCode::NO_CONTENT)
}
