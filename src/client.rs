//! Caller-scoped access to the booking backend.
//!
//! Reads are cached per session and retried a configured number of times.
//! Writes are never retried: on success they invalidate the buckets named by
//! their `Mutation` and leave a success toast, on failure they leave an error
//! toast and the cache untouched.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::backend::{BackendError, BackendResult, HotelBackend};
use crate::booking::{self, BookingAction, PolicyError, Quote, Viewer};
use crate::cache::{Mutation, QueryKey, Resource};
use crate::invite::validate_token_format;
use crate::models::{
    Booking, BookingFilter, BookingRequest, CallerRole, Hotel, HotelProfileUpdate, InviteToken,
    NewBooking, NewPaymentMethod, Principal, Room, RoomInput, SubscriptionStatus, UserProfile,
    UserRole,
};
use crate::notify::ToastLevel;
use crate::session::{Session, SessionRegistry};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("{message}")]
    Invalid { field: &'static str, message: String },
    #[error("Save your profile before making a booking")]
    ProfileRequired,
    #[error("{0} not found")]
    NotFound(String),
    #[error("Sign in to continue")]
    SignInRequired,
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Where the page should navigate next, and after how long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub to: &'static str,
    pub after_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCheck {
    pub well_formed: bool,
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBooking {
    pub id: String,
    pub quote: Quote,
}

pub struct PortalClient {
    backend: Arc<dyn HotelBackend>,
    registry: Arc<SessionRegistry>,
    session: Arc<Session>,
    query_retries: u32,
    redirect_delay_ms: u64,
}

impl PortalClient {
    pub fn new(
        backend: Arc<dyn HotelBackend>,
        registry: Arc<SessionRegistry>,
        caller: &Principal,
        query_retries: u32,
        redirect_delay_ms: u64,
    ) -> Self {
        let session = registry.for_caller(caller);
        Self {
            backend,
            registry,
            session,
            query_retries,
            redirect_delay_ms,
        }
    }

    pub fn caller(&self) -> &Principal {
        &self.session.caller
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn require_signed_in(&self) -> ClientResult<()> {
        if self.caller().is_anonymous() {
            Err(ClientError::SignInRequired)
        } else {
            Ok(())
        }
    }

    async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> BackendResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let fetch = &fetch;
        let retries = self.query_retries;
        let resource = key.resource;
        self.session
            .cache
            .get_or_fetch(key, move || async move {
                let mut attempt = 0;
                loop {
                    match fetch().await {
                        Ok(value) => return Ok(value),
                        Err(e) if attempt < retries => {
                            attempt += 1;
                            tracing::debug!(%resource, attempt, error = %e, "Retrying query");
                        }
                        Err(e) => {
                            tracing::warn!(%resource, error = %e, "Query failed");
                            return Err(e);
                        }
                    }
                }
            })
            .await
    }

    async fn mutate<T, Fut>(&self, mutation: Mutation, success: &str, call: Fut) -> BackendResult<T>
    where
        Fut: Future<Output = BackendResult<T>>,
    {
        match call.await {
            Ok(value) => {
                self.registry.invalidate(mutation.invalidates());
                self.session.notify(ToastLevel::Success, success);
                tracing::info!(
                    mutation = mutation.label(),
                    caller = %self.caller(),
                    "Mutation succeeded"
                );
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    mutation = mutation.label(),
                    caller = %self.caller(),
                    error = %e,
                    "Mutation failed"
                );
                self.session.notify(ToastLevel::Error, e.to_string());
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub async fn user_role(&self) -> BackendResult<UserRole> {
        let caller = self.caller();
        self.query(QueryKey::new(Resource::CallerUserRole), || {
            self.backend.get_caller_user_role(caller)
        })
        .await
    }

    pub async fn is_admin(&self) -> BackendResult<bool> {
        let caller = self.caller();
        self.query(QueryKey::new(Resource::IsCallerAdmin), || {
            self.backend.is_caller_admin(caller)
        })
        .await
    }

    pub async fn user_profile(&self) -> BackendResult<Option<UserProfile>> {
        let caller = self.caller();
        self.query(QueryKey::new(Resource::CallerUserProfile), || {
            self.backend.get_caller_user_profile(caller)
        })
        .await
    }

    pub async fn caller_hotel(&self) -> BackendResult<Option<Hotel>> {
        let caller = self.caller();
        self.query(QueryKey::new(Resource::CallerHotelProfile), || {
            self.backend.get_caller_hotel_profile(caller)
        })
        .await
    }

    /// Role, admin flag and hotel activation resolved into one value.
    pub async fn caller_role(&self) -> BackendResult<CallerRole> {
        let role = self.user_role().await?;
        let is_admin = self.is_admin().await?;
        let has_hotel = match role {
            UserRole::User => self.caller_hotel().await?.is_some(),
            _ => false,
        };
        Ok(CallerRole::resolve(role, is_admin, has_hotel))
    }

    pub async fn hotels(&self) -> BackendResult<Vec<Hotel>> {
        let caller = self.caller();
        self.query(QueryKey::new(Resource::Hotels), || self.backend.get_hotels(caller))
            .await
    }

    pub async fn hotel(&self, hotel_id: &Principal) -> ClientResult<Hotel> {
        self.hotels()
            .await?
            .into_iter()
            .find(|h| h.id == *hotel_id)
            .ok_or_else(|| ClientError::NotFound(format!("Hotel {}", hotel_id)))
    }

    pub async fn rooms(&self, hotel_id: Option<&Principal>) -> BackendResult<Vec<Room>> {
        let caller = self.caller();
        self.query(QueryKey::filtered(Resource::Rooms, &hotel_id), || {
            self.backend.get_rooms(caller, hotel_id)
        })
        .await
    }

    pub async fn bookings(&self, filter: &BookingFilter) -> BackendResult<Vec<Booking>> {
        let caller = self.caller();
        self.query(QueryKey::filtered(Resource::Bookings, filter), || {
            self.backend.get_bookings(caller, filter)
        })
        .await
    }

    pub async fn invite_tokens(&self) -> BackendResult<Vec<InviteToken>> {
        let caller = self.caller();
        self.query(QueryKey::new(Resource::InviteTokens), || {
            self.backend.get_invite_tokens(caller)
        })
        .await
    }

    /// Drop the cached answers the access gate is built from.
    pub fn retry_permissions(&self) {
        self.session.cache.invalidate(&Resource::PERMISSIONS);
    }

    // ---------------------------------------------------------------------
    // Profile and roles
    // ---------------------------------------------------------------------

    pub async fn save_profile(&self, profile: UserProfile) -> ClientResult<()> {
        self.require_signed_in()?;
        self.mutate(
            Mutation::SaveProfile,
            "Profile saved",
            self.backend.save_caller_user_profile(self.caller(), profile),
        )
        .await?;
        Ok(())
    }

    pub async fn make_me_admin(&self) -> ClientResult<()> {
        self.require_signed_in()?;
        self.mutate(
            Mutation::MakeMeAdmin,
            "You are now an admin",
            self.backend.make_me_admin(self.caller()),
        )
        .await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Invite tokens
    // ---------------------------------------------------------------------

    /// Format check first; only well-formed tokens are sent to the backend.
    pub async fn check_invite_token(&self, token: &str) -> ClientResult<TokenCheck> {
        if let Err(message) = validate_token_format(token) {
            return Ok(TokenCheck {
                well_formed: false,
                valid: false,
                message,
            });
        }
        let valid = self
            .backend
            .validate_invite_token(self.caller(), token.trim())
            .await?;
        Ok(TokenCheck {
            well_formed: true,
            valid,
            message: if valid {
                "Invite token is valid".to_string()
            } else {
                "Invite token cannot be used by this account".to_string()
            },
        })
    }

    pub async fn consume_invite_token(&self, token: &str) -> ClientResult<Redirect> {
        self.require_signed_in()?;
        validate_token_format(token).map_err(|message| ClientError::Invalid {
            field: "token",
            message,
        })?;
        self.mutate(
            Mutation::ConsumeInviteToken,
            "Hotel activated",
            self.backend.consume_invite_token(self.caller(), token.trim()),
        )
        .await?;
        Ok(Redirect {
            to: crate::access::Route::Hotel.path(),
            after_ms: self.redirect_delay_ms,
        })
    }

    pub async fn create_invite_token(
        &self,
        max_uses: u32,
        bound_principal: Option<Principal>,
    ) -> ClientResult<String> {
        if max_uses == 0 {
            return Err(ClientError::Invalid {
                field: "maxUses",
                message: "Max uses must be at least 1".to_string(),
            });
        }
        Ok(self
            .mutate(
                Mutation::CreateInviteToken,
                "Invite token created",
                self.backend
                    .create_invite_token(self.caller(), max_uses, bound_principal),
            )
            .await?)
    }

    // ---------------------------------------------------------------------
    // Hotels
    // ---------------------------------------------------------------------

    pub async fn update_hotel_profile(&self, update: HotelProfileUpdate) -> ClientResult<()> {
        self.mutate(
            Mutation::UpdateHotelProfile,
            "Hotel profile updated",
            self.backend.update_hotel_profile(self.caller(), update),
        )
        .await?;
        Ok(())
    }

    pub async fn set_hotel_active(&self, hotel_id: &Principal, active: bool) -> ClientResult<()> {
        let message = if active { "Hotel activated" } else { "Hotel deactivated" };
        self.mutate(
            Mutation::SetHotelActiveStatus,
            message,
            self.backend
                .set_hotel_active_status(self.caller(), hotel_id, active),
        )
        .await?;
        Ok(())
    }

    pub async fn set_hotel_subscription(
        &self,
        hotel_id: &Principal,
        status: SubscriptionStatus,
    ) -> ClientResult<()> {
        self.mutate(
            Mutation::SetHotelSubscriptionStatus,
            &format!("Subscription set to {}", status),
            self.backend
                .set_hotel_subscription_status(self.caller(), hotel_id, status),
        )
        .await?;
        Ok(())
    }

    pub async fn activate_hotel_owner(&self, owner: &Principal) -> ClientResult<()> {
        self.mutate(
            Mutation::ActivateHotelOwner,
            "Hotel owner activated",
            self.backend.activate_hotel_owner(self.caller(), owner),
        )
        .await?;
        Ok(())
    }

    pub async fn add_payment_method(&self, method: NewPaymentMethod) -> ClientResult<String> {
        Ok(self
            .mutate(
                Mutation::AddPaymentMethod,
                "Payment method added",
                self.backend.add_payment_method(self.caller(), method),
            )
            .await?)
    }

    pub async fn remove_payment_method(&self, method_id: &str) -> ClientResult<()> {
        self.mutate(
            Mutation::RemovePaymentMethod,
            "Payment method removed",
            self.backend.remove_payment_method(self.caller(), method_id),
        )
        .await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Rooms
    // ---------------------------------------------------------------------

    pub async fn create_room(&self, room: RoomInput) -> ClientResult<String> {
        Ok(self
            .mutate(
                Mutation::CreateRoom,
                "Room created",
                self.backend.create_room(self.caller(), room),
            )
            .await?)
    }

    pub async fn update_room(&self, room_id: &str, room: RoomInput) -> ClientResult<()> {
        self.mutate(
            Mutation::UpdateRoom,
            "Room updated",
            self.backend.update_room(self.caller(), room_id, room),
        )
        .await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Bookings
    // ---------------------------------------------------------------------

    /// Price the stay from the room's current rate and submit it.
    pub async fn create_booking(&self, request: BookingRequest) -> ClientResult<CreatedBooking> {
        self.require_signed_in()?;
        if self.user_profile().await?.is_none() {
            return Err(ClientError::ProfileRequired);
        }

        let room = self
            .rooms(Some(&request.hotel_id))
            .await?
            .into_iter()
            .find(|r| r.id == request.room_id)
            .ok_or_else(|| ClientError::NotFound(format!("Room {}", request.room_id)))?;

        let quote = booking::quote(&room, request.check_in, request.check_out, request.guests)?;
        let new_booking = NewBooking {
            room_id: room.id.clone(),
            hotel_id: request.hotel_id,
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            total_price: quote.total_price,
            currency: quote.currency.clone(),
        };

        let id = self
            .mutate(
                Mutation::CreateBooking,
                "Booking created, awaiting transfer",
                self.backend.create_booking(self.caller(), new_booking),
            )
            .await?;
        Ok(CreatedBooking { id, quote })
    }

    /// How the caller relates to a booking.
    pub fn viewer_for(&self, booking: &Booking, role: CallerRole) -> Viewer {
        match role {
            CallerRole::Admin => Viewer::Admin,
            _ if booking.hotel_id == *self.caller() => Viewer::Hotel,
            _ => Viewer::Guest,
        }
    }

    async fn booking_for_action(
        &self,
        booking_id: &str,
        action: BookingAction,
    ) -> ClientResult<Booking> {
        self.require_signed_in()?;
        let role = self.caller_role().await?;
        let booking = self
            .bookings(&BookingFilter::default())
            .await?
            .into_iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| ClientError::NotFound(format!("Booking {}", booking_id)))?;
        booking::authorize(booking.status, self.viewer_for(&booking, role), action)?;
        Ok(booking)
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> ClientResult<()> {
        let booking = self.booking_for_action(booking_id, BookingAction::Cancel).await?;
        self.mutate(
            Mutation::UpdateBookingStatus,
            "Booking canceled",
            self.backend.update_booking_status(
                self.caller(),
                &booking.id,
                crate::models::BookingStatus::Canceled,
            ),
        )
        .await?;
        Ok(())
    }

    pub async fn confirm_booking(&self, booking_id: &str) -> ClientResult<()> {
        let booking = self.booking_for_action(booking_id, BookingAction::Confirm).await?;
        self.mutate(
            Mutation::UpdateBookingStatus,
            "Booking confirmed",
            self.backend.update_booking_status(
                self.caller(),
                &booking.id,
                crate::models::BookingStatus::Booked,
            ),
        )
        .await?;
        Ok(())
    }

    pub async fn record_stay_completion(&self, booking_id: &str) -> ClientResult<()> {
        let booking = self
            .booking_for_action(booking_id, BookingAction::RecordStayCompletion)
            .await?;
        self.mutate(
            Mutation::RecordStayCompletion,
            "Stay recorded",
            self.backend.record_stay_completion(self.caller(), &booking.id),
        )
        .await?;
        Ok(())
    }

    pub async fn attach_payment_proof(&self, booking_id: &str, proof: String) -> ClientResult<()> {
        let booking = self
            .booking_for_action(booking_id, BookingAction::AttachPaymentProof)
            .await?;
        self.mutate(
            Mutation::SetPaymentProof,
            "Payment proof uploaded",
            self.backend.set_payment_proof(self.caller(), &booking.id, proof),
        )
        .await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Admin maintenance
    // ---------------------------------------------------------------------

    pub async fn remove_legacy_room_photos(&self) -> ClientResult<u64> {
        Ok(self
            .mutate(
                Mutation::RemoveLegacyRoomPhotos,
                "Legacy room photos removed",
                self.backend.admin_remove_legacy_room_photos(self.caller()),
            )
            .await?)
    }

    pub async fn remove_legacy_payment_methods(&self) -> ClientResult<u64> {
        Ok(self
            .mutate(
                Mutation::RemoveLegacyPaymentMethods,
                "Legacy payment methods removed",
                self.backend.admin_remove_legacy_payment_methods(self.caller()),
            )
            .await?)
    }

    pub async fn purge_principal_data(&self, target: &Principal) -> ClientResult<()> {
        self.mutate(
            Mutation::PurgePrincipalData,
            "Account data purged",
            self.backend.admin_purge_principal_data(self.caller(), target),
        )
        .await?;
        Ok(())
    }
}
