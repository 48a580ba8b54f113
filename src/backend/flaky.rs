//! Test backend whose role lookups fail a set number of times.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BackendError, BackendResult, HotelBackend, MemoryBackend};
use crate::models::{
    Booking, BookingFilter, BookingStatus, Hotel, HotelProfileUpdate, InviteToken, NewBooking,
    NewPaymentMethod, Principal, Room, RoomInput, SubscriptionStatus, UserProfile, UserRole,
};

/// Fails the first `failures` role lookups, then answers from a `MemoryBackend`.
pub struct FlakyBackend {
    inner: MemoryBackend,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryBackend::new(),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every role lookup fails.
    pub fn down() -> Self {
        Self::new(usize::MAX)
    }
}

#[async_trait]
impl HotelBackend for FlakyBackend {
    async fn get_caller_user_role(&self, caller: &Principal) -> BackendResult<UserRole> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        self.inner.get_caller_user_role(caller).await
    }

    async fn is_caller_admin(&self, c: &Principal) -> BackendResult<bool> {
        self.inner.is_caller_admin(c).await
    }

    async fn get_caller_user_profile(&self, c: &Principal) -> BackendResult<Option<UserProfile>> {
        self.inner.get_caller_user_profile(c).await
    }

    async fn save_caller_user_profile(&self, c: &Principal, p: UserProfile) -> BackendResult<()> {
        self.inner.save_caller_user_profile(c, p).await
    }

    async fn make_me_admin(&self, c: &Principal) -> BackendResult<()> {
        self.inner.make_me_admin(c).await
    }

    async fn validate_invite_token(&self, c: &Principal, t: &str) -> BackendResult<bool> {
        self.inner.validate_invite_token(c, t).await
    }

    async fn consume_invite_token(&self, c: &Principal, t: &str) -> BackendResult<()> {
        self.inner.consume_invite_token(c, t).await
    }

    async fn create_invite_token(
        &self,
        c: &Principal,
        max_uses: u32,
        bound_to: Option<Principal>,
    ) -> BackendResult<String> {
        self.inner.create_invite_token(c, max_uses, bound_to).await
    }

    async fn get_invite_tokens(&self, c: &Principal) -> BackendResult<Vec<InviteToken>> {
        self.inner.get_invite_tokens(c).await
    }

    async fn get_hotels(&self, c: &Principal) -> BackendResult<Vec<Hotel>> {
        self.inner.get_hotels(c).await
    }

    async fn get_caller_hotel_profile(&self, c: &Principal) -> BackendResult<Option<Hotel>> {
        self.inner.get_caller_hotel_profile(c).await
    }

    async fn update_hotel_profile(
        &self,
        c: &Principal,
        update: HotelProfileUpdate,
    ) -> BackendResult<()> {
        self.inner.update_hotel_profile(c, update).await
    }

    async fn set_hotel_active_status(
        &self,
        c: &Principal,
        hotel: &Principal,
        active: bool,
    ) -> BackendResult<()> {
        self.inner.set_hotel_active_status(c, hotel, active).await
    }

    async fn set_hotel_subscription_status(
        &self,
        c: &Principal,
        hotel: &Principal,
        status: SubscriptionStatus,
    ) -> BackendResult<()> {
        self.inner.set_hotel_subscription_status(c, hotel, status).await
    }

    async fn activate_hotel_owner(&self, c: &Principal, owner: &Principal) -> BackendResult<()> {
        self.inner.activate_hotel_owner(c, owner).await
    }

    async fn add_payment_method(
        &self,
        c: &Principal,
        method: NewPaymentMethod,
    ) -> BackendResult<String> {
        self.inner.add_payment_method(c, method).await
    }

    async fn remove_payment_method(&self, c: &Principal, id: &str) -> BackendResult<()> {
        self.inner.remove_payment_method(c, id).await
    }

    async fn get_rooms(
        &self,
        c: &Principal,
        hotel: Option<&Principal>,
    ) -> BackendResult<Vec<Room>> {
        self.inner.get_rooms(c, hotel).await
    }

    async fn create_room(&self, c: &Principal, room: RoomInput) -> BackendResult<String> {
        self.inner.create_room(c, room).await
    }

    async fn update_room(&self, c: &Principal, id: &str, room: RoomInput) -> BackendResult<()> {
        self.inner.update_room(c, id, room).await
    }

    async fn get_bookings(
        &self,
        c: &Principal,
        filter: &BookingFilter,
    ) -> BackendResult<Vec<Booking>> {
        self.inner.get_bookings(c, filter).await
    }

    async fn create_booking(&self, c: &Principal, booking: NewBooking) -> BackendResult<String> {
        self.inner.create_booking(c, booking).await
    }

    async fn set_payment_proof(&self, c: &Principal, id: &str, proof: String) -> BackendResult<()> {
        self.inner.set_payment_proof(c, id, proof).await
    }

    async fn update_booking_status(
        &self,
        c: &Principal,
        id: &str,
        status: BookingStatus,
    ) -> BackendResult<()> {
        self.inner.update_booking_status(c, id, status).await
    }

    async fn record_stay_completion(&self, c: &Principal, id: &str) -> BackendResult<()> {
        self.inner.record_stay_completion(c, id).await
    }

    async fn admin_remove_legacy_room_photos(&self, c: &Principal) -> BackendResult<u64> {
        self.inner.admin_remove_legacy_room_photos(c).await
    }

    async fn admin_remove_legacy_payment_methods(&self, c: &Principal) -> BackendResult<u64> {
        self.inner.admin_remove_legacy_payment_methods(c).await
    }

    async fn admin_purge_principal_data(
        &self,
        c: &Principal,
        target: &Principal,
    ) -> BackendResult<()> {
        self.inner.admin_purge_principal_data(c, target).await
    }
}
