//! JSON-over-HTTP client for a deployed booking backend.
//!
//! Each RPC is `POST {base}/rpc/{method}` with the caller in the
//! `X-Caller-Principal` header and the arguments as a JSON object. The reply is
//! `{"ok": <value>}` or `{"err": "<message>"}`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::{BackendError, BackendResult, HotelBackend};
use crate::models::{
    Booking, BookingFilter, BookingStatus, Hotel, HotelProfileUpdate, InviteToken, NewBooking,
    NewPaymentMethod, Principal, Room, RoomInput, SubscriptionStatus, UserProfile, UserRole,
};

pub const CALLER_HEADER: &str = "X-Caller-Principal";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RpcReply<T> {
    Ok(T),
    Err(String),
}

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("staydesk/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    async fn call<A: Serialize, T: DeserializeOwned>(
        &self,
        caller: &Principal,
        method: &str,
        args: A,
    ) -> BackendResult<T> {
        let url = format!("{}/rpc/{}", self.base_url, method);
        tracing::debug!(method, caller = %caller, "Backend call");

        let response = self
            .client
            .post(&url)
            .header(CALLER_HEADER, caller.as_str())
            .json(&args)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(method, error = %e, "Backend request failed");
                if e.is_connect() || e.is_timeout() {
                    BackendError::Unavailable(e.to_string())
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(method, %status, "Backend returned an error status");
            return Err(BackendError::Transport(format!("{} - {}", status, body)));
        }

        let reply: RpcReply<T> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        match reply {
            RpcReply::Ok(value) => Ok(value),
            RpcReply::Err(message) => Err(BackendError::Rejected(message)),
        }
    }
}

#[async_trait]
impl HotelBackend for HttpBackend {
    async fn get_caller_user_role(&self, caller: &Principal) -> BackendResult<UserRole> {
        self.call(caller, "getCallerUserRole", json!({})).await
    }

    async fn is_caller_admin(&self, caller: &Principal) -> BackendResult<bool> {
        self.call(caller, "isCallerAdmin", json!({})).await
    }

    async fn get_caller_user_profile(
        &self,
        caller: &Principal,
    ) -> BackendResult<Option<UserProfile>> {
        self.call(caller, "getCallerUserProfile", json!({})).await
    }

    async fn save_caller_user_profile(
        &self,
        caller: &Principal,
        profile: UserProfile,
    ) -> BackendResult<()> {
        self.call(caller, "saveCallerUserProfile", json!({ "profile": profile })).await
    }

    async fn make_me_admin(&self, caller: &Principal) -> BackendResult<()> {
        self.call(caller, "makeMeAdmin", json!({})).await
    }

    async fn validate_invite_token(&self, caller: &Principal, token: &str) -> BackendResult<bool> {
        self.call(caller, "validateInviteToken", json!({ "token": token })).await
    }

    async fn consume_invite_token(&self, caller: &Principal, token: &str) -> BackendResult<()> {
        self.call(caller, "consumeInviteToken", json!({ "token": token })).await
    }

    async fn create_invite_token(
        &self,
        caller: &Principal,
        max_uses: u32,
        bound_principal: Option<Principal>,
    ) -> BackendResult<String> {
        self.call(
            caller,
            "createInviteToken",
            json!({ "maxUses": max_uses, "boundPrincipal": bound_principal }),
        )
        .await
    }

    async fn get_invite_tokens(&self, caller: &Principal) -> BackendResult<Vec<InviteToken>> {
        self.call(caller, "getInviteTokens", json!({})).await
    }

    async fn get_hotels(&self, caller: &Principal) -> BackendResult<Vec<Hotel>> {
        self.call(caller, "getHotels", json!({})).await
    }

    async fn get_caller_hotel_profile(&self, caller: &Principal) -> BackendResult<Option<Hotel>> {
        self.call(caller, "getCallerHotelProfile", json!({})).await
    }

    async fn update_hotel_profile(
        &self,
        caller: &Principal,
        update: HotelProfileUpdate,
    ) -> BackendResult<()> {
        self.call(caller, "updateHotelProfile", json!({ "profile": update })).await
    }

    async fn set_hotel_active_status(
        &self,
        caller: &Principal,
        hotel_id: &Principal,
        active: bool,
    ) -> BackendResult<()> {
        self.call(
            caller,
            "setHotelActiveStatus",
            json!({ "hotelId": hotel_id, "active": active }),
        )
        .await
    }

    async fn set_hotel_subscription_status(
        &self,
        caller: &Principal,
        hotel_id: &Principal,
        status: SubscriptionStatus,
    ) -> BackendResult<()> {
        self.call(
            caller,
            "setHotelSubscriptionStatus",
            json!({ "hotelId": hotel_id, "status": status }),
        )
        .await
    }

    async fn activate_hotel_owner(
        &self,
        caller: &Principal,
        owner: &Principal,
    ) -> BackendResult<()> {
        self.call(caller, "activateHotelOwner", json!({ "owner": owner })).await
    }

    async fn add_payment_method(
        &self,
        caller: &Principal,
        method: NewPaymentMethod,
    ) -> BackendResult<String> {
        self.call(caller, "addPaymentMethod", json!({ "method": method })).await
    }

    async fn remove_payment_method(
        &self,
        caller: &Principal,
        method_id: &str,
    ) -> BackendResult<()> {
        self.call(caller, "removePaymentMethod", json!({ "methodId": method_id })).await
    }

    async fn get_rooms(
        &self,
        caller: &Principal,
        hotel_id: Option<&Principal>,
    ) -> BackendResult<Vec<Room>> {
        self.call(caller, "getRooms", json!({ "hotelId": hotel_id })).await
    }

    async fn create_room(&self, caller: &Principal, room: RoomInput) -> BackendResult<String> {
        self.call(caller, "createRoom", json!({ "room": room })).await
    }

    async fn update_room(
        &self,
        caller: &Principal,
        room_id: &str,
        room: RoomInput,
    ) -> BackendResult<()> {
        self.call(caller, "updateRoom", json!({ "roomId": room_id, "room": room })).await
    }

    async fn get_bookings(
        &self,
        caller: &Principal,
        filter: &BookingFilter,
    ) -> BackendResult<Vec<Booking>> {
        self.call(caller, "getBookings", json!({ "filter": filter })).await
    }

    async fn create_booking(
        &self,
        caller: &Principal,
        booking: NewBooking,
    ) -> BackendResult<String> {
        self.call(caller, "createBooking", json!({ "booking": booking })).await
    }

    async fn set_payment_proof(
        &self,
        caller: &Principal,
        booking_id: &str,
        proof: String,
    ) -> BackendResult<()> {
        self.call(
            caller,
            "setPaymentProof",
            json!({ "bookingId": booking_id, "proof": proof }),
        )
        .await
    }

    async fn update_booking_status(
        &self,
        caller: &Principal,
        booking_id: &str,
        status: BookingStatus,
    ) -> BackendResult<()> {
        self.call(
            caller,
            "updateBookingStatus",
            json!({ "bookingId": booking_id, "status": status }),
        )
        .await
    }

    async fn record_stay_completion(
        &self,
        caller: &Principal,
        booking_id: &str,
    ) -> BackendResult<()> {
        self.call(caller, "recordStayCompletion", json!({ "bookingId": booking_id })).await
    }

    async fn admin_remove_legacy_room_photos(&self, caller: &Principal) -> BackendResult<u64> {
        self.call(caller, "adminRemoveLegacyRoomPhotos", json!({})).await
    }

    async fn admin_remove_legacy_payment_methods(&self, caller: &Principal) -> BackendResult<u64> {
        self.call(caller, "adminRemoveLegacyPaymentMethods", json!({})).await
    }

    async fn admin_purge_principal_data(
        &self,
        caller: &Principal,
        target: &Principal,
    ) -> BackendResult<()> {
        self.call(caller, "adminPurgePrincipalData", json!({ "principal": target })).await
    }
}
