//! RPC surface of the remote booking backend.
//!
//! Every call names its caller explicitly; the backend decides what that
//! identity may do. `HttpBackend` talks to a deployed backend, `MemoryBackend`
//! keeps the same contract in-process for development and tests.

#[cfg(test)]
pub mod flaky;
mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendConfig, BackendKind};
use crate::models::{
    Booking, BookingFilter, BookingStatus, Hotel, HotelProfileUpdate, InviteToken, NewBooking,
    NewPaymentMethod, Principal, Room, RoomInput, SubscriptionStatus, UserProfile, UserRole,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached at all
    #[error("Booking backend is unavailable: {0}")]
    Unavailable(String),
    #[error("Booking backend request failed: {0}")]
    Transport(String),
    /// The backend refused the call (authorization, validation, state)
    #[error("{0}")]
    Rejected(String),
    #[error("Unexpected response from booking backend: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn rejected(message: impl Into<String>) -> Self {
        BackendError::Rejected(message.into())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait HotelBackend: Send + Sync {
    // Identity and profile
    async fn get_caller_user_role(&self, caller: &Principal) -> BackendResult<UserRole>;
    async fn is_caller_admin(&self, caller: &Principal) -> BackendResult<bool>;
    async fn get_caller_user_profile(
        &self,
        caller: &Principal,
    ) -> BackendResult<Option<UserProfile>>;
    async fn save_caller_user_profile(
        &self,
        caller: &Principal,
        profile: UserProfile,
    ) -> BackendResult<()>;
    async fn make_me_admin(&self, caller: &Principal) -> BackendResult<()>;

    // Invite tokens
    async fn validate_invite_token(&self, caller: &Principal, token: &str) -> BackendResult<bool>;
    async fn consume_invite_token(&self, caller: &Principal, token: &str) -> BackendResult<()>;
    async fn create_invite_token(
        &self,
        caller: &Principal,
        max_uses: u32,
        bound_principal: Option<Principal>,
    ) -> BackendResult<String>;
    async fn get_invite_tokens(&self, caller: &Principal) -> BackendResult<Vec<InviteToken>>;

    // Hotels
    async fn get_hotels(&self, caller: &Principal) -> BackendResult<Vec<Hotel>>;
    async fn get_caller_hotel_profile(&self, caller: &Principal) -> BackendResult<Option<Hotel>>;
    async fn update_hotel_profile(
        &self,
        caller: &Principal,
        update: HotelProfileUpdate,
    ) -> BackendResult<()>;
    async fn set_hotel_active_status(
        &self,
        caller: &Principal,
        hotel_id: &Principal,
        active: bool,
    ) -> BackendResult<()>;
    async fn set_hotel_subscription_status(
        &self,
        caller: &Principal,
        hotel_id: &Principal,
        status: SubscriptionStatus,
    ) -> BackendResult<()>;
    async fn activate_hotel_owner(
        &self,
        caller: &Principal,
        owner: &Principal,
    ) -> BackendResult<()>;
    async fn add_payment_method(
        &self,
        caller: &Principal,
        method: NewPaymentMethod,
    ) -> BackendResult<String>;
    async fn remove_payment_method(&self, caller: &Principal, method_id: &str) -> BackendResult<()>;

    // Rooms
    async fn get_rooms(
        &self,
        caller: &Principal,
        hotel_id: Option<&Principal>,
    ) -> BackendResult<Vec<Room>>;
    async fn create_room(&self, caller: &Principal, room: RoomInput) -> BackendResult<String>;
    async fn update_room(
        &self,
        caller: &Principal,
        room_id: &str,
        room: RoomInput,
    ) -> BackendResult<()>;

    // Bookings
    async fn get_bookings(
        &self,
        caller: &Principal,
        filter: &BookingFilter,
    ) -> BackendResult<Vec<Booking>>;
    async fn create_booking(
        &self,
        caller: &Principal,
        booking: NewBooking,
    ) -> BackendResult<String>;
    async fn set_payment_proof(
        &self,
        caller: &Principal,
        booking_id: &str,
        proof: String,
    ) -> BackendResult<()>;
    async fn update_booking_status(
        &self,
        caller: &Principal,
        booking_id: &str,
        status: BookingStatus,
    ) -> BackendResult<()>;
    async fn record_stay_completion(
        &self,
        caller: &Principal,
        booking_id: &str,
    ) -> BackendResult<()>;

    // Admin maintenance
    async fn admin_remove_legacy_room_photos(&self, caller: &Principal) -> BackendResult<u64>;
    async fn admin_remove_legacy_payment_methods(&self, caller: &Principal) -> BackendResult<u64>;
    async fn admin_purge_principal_data(
        &self,
        caller: &Principal,
        target: &Principal,
    ) -> BackendResult<()>;
}

/// Build the configured backend.
pub fn connect(config: &BackendConfig) -> anyhow::Result<Arc<dyn HotelBackend>> {
    match config.kind {
        BackendKind::Http => {
            let timeout = config.request_timeout_secs.map(Duration::from_secs);
            tracing::info!(url = %config.url, "Using HTTP booking backend");
            Ok(Arc::new(HttpBackend::new(&config.url, timeout)?))
        }
        BackendKind::Memory => {
            tracing::warn!("Using in-memory booking backend; data is lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}
