use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::Caller;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::client::CreatedBooking;
use crate::models::BookingRequest;
use crate::AppState;

const MAX_GUESTS: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct PaymentProofRequest {
    pub proof: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<CreatedBooking>), ApiError> {
    let principal = caller.require_signed_in()?;

    let mut errors = ValidationErrorBuilder::new();
    if req.room_id.trim().is_empty() {
        errors.add("roomId", "Room is required");
    }
    if req.guests == 0 {
        errors.add("guests", "At least one guest is required");
    } else if req.guests > MAX_GUESTS {
        errors.add("guests", format!("At most {} guests per booking", MAX_GUESTS));
    }
    if req.check_out <= req.check_in {
        errors.add("checkOut", "Check-out must be after check-in");
    }
    errors.finish()?;

    let created = state.client(&principal).create_booking(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn attach_payment_proof(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<PaymentProofRequest>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    if req.proof.trim().is_empty() {
        return Err(ApiError::validation_field("proof", "Payment proof is required"));
    }
    state
        .client(&principal)
        .attach_payment_proof(&id, req.proof)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    state.client(&principal).cancel_booking(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    state.client(&principal).confirm_booking(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_stay_completion(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = caller.require_signed_in()?;
    state.client(&principal).record_stay_completion(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
