//! In-process booking backend.
//!
//! Keeps the same contract as the deployed backend (authorization, token
//! usage limits, booking transitions) so the portal can run and be tested
//! without one. Nothing is persisted.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{BackendError, BackendResult, HotelBackend};
use crate::invite::generate_token;
use crate::models::{
    Booking, BookingFilter, BookingStatus, Hotel, HotelProfileUpdate, InviteToken, NewBooking,
    NewPaymentMethod, PaymentMethod, Principal, Room, RoomInput, SubscriptionStatus, UserProfile,
    UserRole,
};
use crate::pictures::is_valid_picture_url;

#[derive(Default)]
struct State {
    admins: HashSet<Principal>,
    hotel_owners: HashSet<Principal>,
    profiles: HashMap<Principal, UserProfile>,
    hotels: BTreeMap<Principal, Hotel>,
    bookings: Vec<Booking>,
    tokens: Vec<InviteToken>,
}

impl State {
    fn role_of(&self, caller: &Principal) -> UserRole {
        if self.admins.contains(caller) {
            UserRole::Admin
        } else if self.hotel_owners.contains(caller) || self.hotels.contains_key(caller) {
            UserRole::User
        } else {
            UserRole::Guest
        }
    }

    fn require_admin(&self, caller: &Principal) -> BackendResult<()> {
        if self.admins.contains(caller) {
            Ok(())
        } else {
            Err(BackendError::rejected("Unauthorized: only admins can perform this action"))
        }
    }

    fn own_hotel_mut(&mut self, caller: &Principal) -> BackendResult<&mut Hotel> {
        self.hotels
            .get_mut(caller)
            .ok_or_else(|| BackendError::rejected("Unauthorized: caller has no activated hotel"))
    }

    fn booking_mut(&mut self, booking_id: &str) -> BackendResult<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| BackendError::rejected(format!("Booking {} not found", booking_id)))
    }

    fn activate(&mut self, owner: &Principal) {
        self.hotel_owners.insert(owner.clone());
        self.hotels
            .entry(owner.clone())
            .or_insert_with(|| Hotel::new(owner.clone()));
    }
}

fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(0) as u64)
        .unwrap_or_default()
}

fn require_signed_in(caller: &Principal) -> BackendResult<()> {
    if caller.is_anonymous() {
        Err(BackendError::rejected("Unauthorized: anonymous callers cannot do this"))
    } else {
        Ok(())
    }
}

fn check_room_input(room: &RoomInput) -> BackendResult<()> {
    if room.room_number.trim().is_empty() {
        return Err(BackendError::rejected("Room number is required"));
    }
    if room.price_per_night == 0 {
        return Err(BackendError::rejected("Room price must be at least 1"));
    }
    if room.currency.trim().is_empty() {
        return Err(BackendError::rejected("Room currency is required"));
    }
    Ok(())
}

#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give a principal a role directly, as the deployed backend's own
    /// provisioning would. Hotel owners granted this way are not yet activated.
    pub fn grant_role(&self, principal: &Principal, role: UserRole) {
        let mut state = self.state.write();
        match role {
            UserRole::Admin => {
                state.admins.insert(principal.clone());
            }
            UserRole::User => {
                state.hotel_owners.insert(principal.clone());
            }
            UserRole::Guest => {
                state.admins.remove(principal);
                state.hotel_owners.remove(principal);
            }
        }
    }
}

#[async_trait]
impl HotelBackend for MemoryBackend {
    async fn get_caller_user_role(&self, caller: &Principal) -> BackendResult<UserRole> {
        Ok(self.state.read().role_of(caller))
    }

    async fn is_caller_admin(&self, caller: &Principal) -> BackendResult<bool> {
        Ok(self.state.read().admins.contains(caller))
    }

    async fn get_caller_user_profile(
        &self,
        caller: &Principal,
    ) -> BackendResult<Option<UserProfile>> {
        Ok(self.state.read().profiles.get(caller).cloned())
    }

    async fn save_caller_user_profile(
        &self,
        caller: &Principal,
        profile: UserProfile,
    ) -> BackendResult<()> {
        require_signed_in(caller)?;
        if profile.name.trim().is_empty() {
            return Err(BackendError::rejected("Profile name is required"));
        }
        self.state.write().profiles.insert(caller.clone(), profile);
        Ok(())
    }

    async fn make_me_admin(&self, caller: &Principal) -> BackendResult<()> {
        require_signed_in(caller)?;
        let mut state = self.state.write();
        if !state.admins.is_empty() {
            return Err(BackendError::rejected("An admin has already been assigned"));
        }
        state.admins.insert(caller.clone());
        tracing::info!(principal = %caller, "Bootstrapped first admin");
        Ok(())
    }

    async fn validate_invite_token(&self, caller: &Principal, token: &str) -> BackendResult<bool> {
        let state = self.state.read();
        Ok(state
            .tokens
            .iter()
            .find(|t| t.token == token)
            .map(|t| t.redeemable_by(caller).is_ok())
            .unwrap_or(false))
    }

    async fn consume_invite_token(&self, caller: &Principal, token: &str) -> BackendResult<()> {
        require_signed_in(caller)?;
        let mut state = self.state.write();
        if state.hotels.contains_key(caller) {
            return Err(BackendError::rejected("Hotel is already activated"));
        }
        let entry = state
            .tokens
            .iter_mut()
            .find(|t| t.token == token)
            .ok_or_else(|| BackendError::rejected("Invalid invite token"))?;
        entry
            .redeemable_by(caller)
            .map_err(|rejection| BackendError::rejected(rejection.to_string()))?;
        entry.record_use();
        state.activate(caller);
        Ok(())
    }

    async fn create_invite_token(
        &self,
        caller: &Principal,
        max_uses: u32,
        bound_principal: Option<Principal>,
    ) -> BackendResult<String> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        if max_uses == 0 {
            return Err(BackendError::rejected("Max uses must be at least 1"));
        }
        let token = generate_token();
        state.tokens.push(InviteToken {
            token: token.clone(),
            issued_by: caller.clone(),
            max_uses,
            usage_count: 0,
            bound_principal,
            active: true,
            created_at: now_nanos(),
        });
        Ok(token)
    }

    async fn get_invite_tokens(&self, caller: &Principal) -> BackendResult<Vec<InviteToken>> {
        let state = self.state.read();
        state.require_admin(caller)?;
        Ok(state.tokens.clone())
    }

    async fn get_hotels(&self, caller: &Principal) -> BackendResult<Vec<Hotel>> {
        let state = self.state.read();
        let is_admin = state.admins.contains(caller);
        Ok(state
            .hotels
            .values()
            .filter(|h| is_admin || h.is_listed() || h.id == *caller)
            .cloned()
            .collect())
    }

    async fn get_caller_hotel_profile(&self, caller: &Principal) -> BackendResult<Option<Hotel>> {
        Ok(self.state.read().hotels.get(caller).cloned())
    }

    async fn update_hotel_profile(
        &self,
        caller: &Principal,
        update: HotelProfileUpdate,
    ) -> BackendResult<()> {
        if update.name.trim().is_empty() {
            return Err(BackendError::rejected("Hotel name is required"));
        }
        let mut state = self.state.write();
        let hotel = state.own_hotel_mut(caller)?;
        hotel.name = update.name;
        hotel.location = update.location;
        hotel.address = update.address;
        hotel.map_link = update.map_link;
        hotel.contact = update.contact;
        Ok(())
    }

    async fn set_hotel_active_status(
        &self,
        caller: &Principal,
        hotel_id: &Principal,
        active: bool,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        let hotel = state
            .hotels
            .get_mut(hotel_id)
            .ok_or_else(|| BackendError::rejected("Hotel not found"))?;
        hotel.active = active;
        Ok(())
    }

    async fn set_hotel_subscription_status(
        &self,
        caller: &Principal,
        hotel_id: &Principal,
        status: SubscriptionStatus,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        let hotel = state
            .hotels
            .get_mut(hotel_id)
            .ok_or_else(|| BackendError::rejected("Hotel not found"))?;
        hotel.subscription_status = status;
        Ok(())
    }

    async fn activate_hotel_owner(
        &self,
        caller: &Principal,
        owner: &Principal,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        state.activate(owner);
        Ok(())
    }

    async fn add_payment_method(
        &self,
        caller: &Principal,
        method: NewPaymentMethod,
    ) -> BackendResult<String> {
        let mut state = self.state.write();
        let hotel = state.own_hotel_mut(caller)?;
        let id = uuid::Uuid::new_v4().to_string();
        hotel.payment_methods.push(PaymentMethod {
            id: id.clone(),
            name: method.name,
            details: method.details,
        });
        Ok(id)
    }

    async fn remove_payment_method(
        &self,
        caller: &Principal,
        method_id: &str,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        let hotel = state.own_hotel_mut(caller)?;
        let before = hotel.payment_methods.len();
        hotel.payment_methods.retain(|m| m.id != method_id);
        if hotel.payment_methods.len() == before {
            return Err(BackendError::rejected("Payment method not found"));
        }
        Ok(())
    }

    async fn get_rooms(
        &self,
        caller: &Principal,
        hotel_id: Option<&Principal>,
    ) -> BackendResult<Vec<Room>> {
        let state = self.state.read();
        let is_admin = state.admins.contains(caller);
        let visible = |h: &&Hotel| is_admin || h.is_listed() || h.id == *caller;
        Ok(state
            .hotels
            .values()
            .filter(|h| hotel_id.map_or(true, |id| h.id == *id))
            .filter(visible)
            .flat_map(|h| h.rooms.iter().cloned())
            .collect())
    }

    async fn create_room(&self, caller: &Principal, room: RoomInput) -> BackendResult<String> {
        check_room_input(&room)?;
        let mut state = self.state.write();
        let hotel = state.own_hotel_mut(caller)?;
        if hotel.rooms.iter().any(|r| r.room_number == room.room_number) {
            return Err(BackendError::rejected(format!(
                "Room {} already exists",
                room.room_number
            )));
        }
        let id = uuid::Uuid::new_v4().to_string();
        hotel.rooms.push(Room {
            id: id.clone(),
            hotel_id: caller.clone(),
            room_number: room.room_number,
            room_type: room.room_type,
            price_per_night: room.price_per_night,
            currency: room.currency,
            pictures: room.pictures,
            discount_percent: room.discount_percent,
        });
        Ok(id)
    }

    async fn update_room(
        &self,
        caller: &Principal,
        room_id: &str,
        room: RoomInput,
    ) -> BackendResult<()> {
        check_room_input(&room)?;
        let mut state = self.state.write();
        let hotel = state.own_hotel_mut(caller)?;
        let existing = hotel
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or_else(|| BackendError::rejected("Room not found"))?;
        existing.room_number = room.room_number;
        existing.room_type = room.room_type;
        existing.price_per_night = room.price_per_night;
        existing.currency = room.currency;
        existing.pictures = room.pictures;
        existing.discount_percent = room.discount_percent;
        Ok(())
    }

    async fn get_bookings(
        &self,
        caller: &Principal,
        filter: &BookingFilter,
    ) -> BackendResult<Vec<Booking>> {
        let state = self.state.read();
        let is_admin = state.admins.contains(caller);
        Ok(state
            .bookings
            .iter()
            .filter(|b| is_admin || b.guest == *caller || b.hotel_id == *caller)
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn create_booking(
        &self,
        caller: &Principal,
        booking: NewBooking,
    ) -> BackendResult<String> {
        require_signed_in(caller)?;
        let mut state = self.state.write();
        if !state.profiles.contains_key(caller) {
            return Err(BackendError::rejected("A user profile is required before booking"));
        }
        if booking.check_out <= booking.check_in {
            return Err(BackendError::rejected("Check-out must be after check-in"));
        }
        let hotel = state
            .hotels
            .get(&booking.hotel_id)
            .filter(|h| h.is_listed())
            .ok_or_else(|| BackendError::rejected("Hotel not found"))?;
        if !hotel.rooms.iter().any(|r| r.id == booking.room_id) {
            return Err(BackendError::rejected("Room not found"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        state.bookings.push(Booking {
            id: id.clone(),
            room_id: booking.room_id,
            hotel_id: booking.hotel_id,
            guest: caller.clone(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            guests: booking.guests,
            total_price: booking.total_price,
            currency: booking.currency,
            payment_proof: None,
            status: BookingStatus::PendingTransfer,
            created_at: now_nanos(),
        });
        Ok(id)
    }

    async fn set_payment_proof(
        &self,
        caller: &Principal,
        booking_id: &str,
        proof: String,
    ) -> BackendResult<()> {
        if proof.trim().is_empty() {
            return Err(BackendError::rejected("Payment proof is required"));
        }
        let mut state = self.state.write();
        let booking = state.booking_mut(booking_id)?;
        if booking.guest != *caller {
            return Err(BackendError::rejected("Unauthorized: not your booking"));
        }
        if booking.status != BookingStatus::PendingTransfer {
            return Err(BackendError::rejected(
                "Payment proof can only be set while awaiting transfer",
            ));
        }
        booking.payment_proof = Some(proof);
        Ok(())
    }

    async fn update_booking_status(
        &self,
        caller: &Principal,
        booking_id: &str,
        status: BookingStatus,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        let is_admin = state.admins.contains(caller);
        let booking = state.booking_mut(booking_id)?;
        let is_hotel = booking.hotel_id == *caller;
        let is_guest = booking.guest == *caller;

        if !(is_admin || is_hotel || is_guest) {
            return Err(BackendError::rejected("Unauthorized: not your booking"));
        }
        if !booking.status.can_transition_to(status) {
            return Err(BackendError::rejected(format!(
                "Invalid status transition from {} to {}",
                booking.status, status
            )));
        }
        let guest_only = !(is_admin || is_hotel);
        let guest_cancel =
            booking.status == BookingStatus::PendingTransfer && status == BookingStatus::Canceled;
        if guest_only && !guest_cancel {
            return Err(BackendError::rejected(
                "Guests can only cancel bookings awaiting transfer",
            ));
        }
        booking.status = status;
        Ok(())
    }

    async fn record_stay_completion(
        &self,
        caller: &Principal,
        booking_id: &str,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        let is_admin = state.admins.contains(caller);
        let booking = state.booking_mut(booking_id)?;
        if !(is_admin || booking.hotel_id == *caller) {
            return Err(BackendError::rejected("Unauthorized: only the hotel can record a stay"));
        }
        match booking.status {
            BookingStatus::Booked | BookingStatus::CheckedIn => {
                booking.status = BookingStatus::CheckedIn;
                Ok(())
            }
            other => Err(BackendError::rejected(format!(
                "Cannot record stay completion for a booking that is {}",
                other
            ))),
        }
    }

    async fn admin_remove_legacy_room_photos(&self, caller: &Principal) -> BackendResult<u64> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        let mut removed = 0u64;
        for room in state.hotels.values_mut().flat_map(|h| h.rooms.iter_mut()) {
            let before = room.pictures.len();
            room.pictures.retain(|p| is_valid_picture_url(p));
            removed += (before - room.pictures.len()) as u64;
        }
        Ok(removed)
    }

    async fn admin_remove_legacy_payment_methods(&self, caller: &Principal) -> BackendResult<u64> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        let mut removed = 0u64;
        for hotel in state.hotels.values_mut() {
            let before = hotel.payment_methods.len();
            hotel.payment_methods.retain(|m| !m.is_legacy());
            removed += (before - hotel.payment_methods.len()) as u64;
        }
        Ok(removed)
    }

    async fn admin_purge_principal_data(
        &self,
        caller: &Principal,
        target: &Principal,
    ) -> BackendResult<()> {
        let mut state = self.state.write();
        state.require_admin(caller)?;
        if caller == target {
            return Err(BackendError::rejected("Admins cannot purge their own data"));
        }
        state.profiles.remove(target);
        state.hotels.remove(target);
        state.hotel_owners.remove(target);
        state
            .bookings
            .retain(|b| b.guest != *target && b.hotel_id != *target);
        state
            .tokens
            .retain(|t| t.bound_principal.as_ref() != Some(target));
        tracing::info!(principal = %target, "Purged principal data");
        Ok(())
    }
}
