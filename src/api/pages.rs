//! JSON page views, one per portal route.
//!
//! Gated routes run the access gate first and answer with the gate's view
//! (login prompt, permission-check failure, denial or activation form) in
//! place of the page when it does not allow the caller through.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::access::{self, Authentication, GateDecision, Route};
use crate::api::auth::Caller;
use crate::api::error::ApiError;
use crate::booking::{self, BookingAction, Viewer};
use crate::backend::BackendError;
use crate::client::{ClientError, PortalClient};
use crate::models::{
    Booking, BookingFilter, CallerRole, ContactInfo, Hotel, InviteToken, PaymentMethod, Principal,
    PrincipalError, Room, SubscriptionStatus, UserProfile, UserRole,
};
use crate::pictures::VisiblePicture;
use crate::pricing::{self, format_money};
use crate::session::Session;
use crate::AppState;

const FEATURED_HOTELS: usize = 6;

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum PageView {
    Home(HomePage),
    Browse(BrowsePage),
    HotelDetail(HotelDetailPage),
    Bookings(BookingsPage),
    Guest(GuestPage),
    Account(AccountPage),
    AccountStatus(AccountStatusPage),
    Hotel(HotelDashboard),
    Admin(AdminDashboard),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelCard {
    pub id: Principal,
    pub name: String,
    pub location: String,
    pub room_count: usize,
    /// Cheapest nightly rate, formatted in the room's currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_price: Option<String>,
}

impl HotelCard {
    fn from_hotel(hotel: &Hotel) -> Self {
        let cheapest = hotel.rooms.iter().min_by_key(|r| r.nightly_rate());
        Self {
            id: hotel.id.clone(),
            name: hotel.name.clone(),
            location: hotel.location.clone(),
            room_count: hotel.rooms.len(),
            from_price: cheapest.map(|r| format_money(r.nightly_rate(), &r.currency)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub room_number: String,
    pub room_type: String,
    pub price_per_night: u64,
    pub currency: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
    pub nightly_rate: u64,
    pub nightly_rate_formatted: String,
    pub pictures: Vec<VisiblePicture>,
}

impl RoomView {
    fn new(room: &Room, session: &Session) -> Self {
        let nightly_rate = room.nightly_rate();
        Self {
            id: room.id.clone(),
            room_number: room.room_number.clone(),
            room_type: room.room_type.clone(),
            price_per_night: room.price_per_night,
            currency: room.currency.clone(),
            price: format_money(room.price_per_night, &room.currency),
            discount_percent: room.discount_percent,
            nightly_rate,
            nightly_rate_formatted: format_money(nightly_rate, &room.currency),
            pictures: session.room_pictures(&room.id, &room.pictures),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub nights: u64,
    pub total: String,
    pub actions: Vec<BookingAction>,
}

impl BookingView {
    fn new(booking: Booking, viewer: Viewer) -> Self {
        let nights = booking::nights_between(booking.check_in, booking.check_out).unwrap_or(0);
        Self {
            nights,
            total: format_money(booking.total_price, &booking.currency),
            actions: booking::available_actions(booking.status, viewer),
            booking,
        }
    }
}

fn booking_views(
    client: &PortalClient,
    bookings: Vec<Booking>,
    role: CallerRole,
) -> Vec<BookingView> {
    bookings
        .into_iter()
        .map(|b| {
            let viewer = client.viewer_for(&b, role);
            BookingView::new(b, viewer)
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub featured_hotels: Vec<HotelCard>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsePage {
    pub hotels: Vec<HotelCard>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetailPage {
    pub id: Principal,
    pub name: String,
    pub location: String,
    pub address: String,
    pub map_link: String,
    pub contact: ContactInfo,
    pub rooms: Vec<RoomView>,
    pub payment_methods: Vec<PaymentMethod>,
    /// Signed in with a saved profile
    pub can_book: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsPage {
    pub bookings: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// Booking actions stay hidden until a profile is saved
    pub profile_required: bool,
    pub bookings: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPage {
    pub principal: Principal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    pub role: CallerRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatusPage {
    pub principal: Principal,
    pub role: CallerRole,
    pub user_role: UserRole,
    pub is_admin: bool,
    pub hotel_activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDashboard {
    /// Absent for admins without a hotel of their own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel: Option<Hotel>,
    pub rooms: Vec<RoomView>,
    pub bookings: Vec<BookingView>,
    pub currencies: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminHotelRow {
    pub id: Principal,
    pub name: String,
    pub active: bool,
    pub subscription_status: SubscriptionStatus,
    pub room_count: usize,
    pub legacy_payment_methods: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTokenView {
    #[serde(flatten)]
    pub token: InviteToken,
    pub remaining_uses: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub hotels: Vec<AdminHotelRow>,
    pub invite_tokens: Vec<InviteTokenView>,
    pub bookings: Vec<BookingView>,
}

/// A page, or what to show instead of it.
#[derive(Debug)]
pub enum PageError {
    Gate(GateDecision),
    Api(ApiError),
}

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        PageError::Api(err)
    }
}

impl From<BackendError> for PageError {
    fn from(err: BackendError) -> Self {
        PageError::Api(err.into())
    }
}

impl From<ClientError> for PageError {
    fn from(err: ClientError) -> Self {
        PageError::Api(err.into())
    }
}

impl From<PrincipalError> for PageError {
    fn from(err: PrincipalError) -> Self {
        PageError::Api(err.into())
    }
}

pub fn gate_status(decision: &GateDecision) -> StatusCode {
    match decision {
        GateDecision::Allow => StatusCode::OK,
        GateDecision::LoginRequired => StatusCode::UNAUTHORIZED,
        GateDecision::PermissionCheckFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GateDecision::Denied { .. } | GateDecision::ActivationRequired { .. } => {
            StatusCode::FORBIDDEN
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Gate(decision) => (gate_status(&decision), Json(decision)).into_response(),
            PageError::Api(err) => err.into_response(),
        }
    }
}

type PageResult = Result<Json<PageView>, PageError>;

/// Run the gate for `route`; returns the resolved role when allowed.
async fn enter(
    client: &PortalClient,
    auth: &Authentication,
    route: Route,
) -> Result<CallerRole, PageError> {
    let lookup = match auth {
        Authentication::Anonymous => Ok(CallerRole::Guest),
        Authentication::Authenticated(_) => client.caller_role().await,
    };
    let role = lookup.clone().unwrap_or(CallerRole::Guest);

    match route.guard() {
        Some(guard) => match access::evaluate(auth, lookup, &guard) {
            GateDecision::Allow => Ok(role),
            decision => {
                tracing::debug!(route = route.path(), ?decision, "Gate blocked page");
                Err(PageError::Gate(decision))
            }
        },
        None if matches!(auth, Authentication::Anonymous) => Ok(role),
        None => lookup.map_err(|e| {
            tracing::debug!(route = route.path(), error = %e, "Role lookup failed");
            PageError::Gate(GateDecision::permission_check_failed(e))
        }),
    }
}

fn require_login(auth: &Authentication) -> Result<(), PageError> {
    match auth {
        Authentication::Anonymous => Err(PageError::Gate(GateDecision::LoginRequired)),
        Authentication::Authenticated(_) => Ok(()),
    }
}

pub async fn home(State(state): State<Arc<AppState>>, Caller(auth): Caller) -> PageResult {
    let client = state.client(&principal_of(&auth));
    let hotels = client.hotels().await?;
    Ok(Json(PageView::Home(HomePage {
        signed_in: auth.principal().is_some(),
        principal: auth.principal().cloned(),
        featured_hotels: hotels
            .iter()
            .filter(|h| h.is_listed())
            .take(FEATURED_HOTELS)
            .map(HotelCard::from_hotel)
            .collect(),
    })))
}

pub async fn browse(State(state): State<Arc<AppState>>, Caller(auth): Caller) -> PageResult {
    let client = state.client(&principal_of(&auth));
    let hotels = client.hotels().await?;
    Ok(Json(PageView::Browse(BrowsePage {
        hotels: hotels
            .iter()
            .filter(|h| h.is_listed())
            .map(HotelCard::from_hotel)
            .collect(),
    })))
}

pub async fn hotel_detail(
    State(state): State<Arc<AppState>>,
    Caller(auth): Caller,
    Path(hotel_id): Path<String>,
) -> PageResult {
    let hotel_id = Principal::parse(&hotel_id)?;
    let client = state.client(&principal_of(&auth));
    let hotel = client.hotel(&hotel_id).await?;
    if !hotel.is_listed() {
        return Err(ApiError::not_found(format!("Hotel {} not found", hotel_id)).into());
    }
    let rooms = client.rooms(Some(&hotel_id)).await?;
    let can_book = match auth {
        Authentication::Anonymous => false,
        Authentication::Authenticated(_) => client.user_profile().await?.is_some(),
    };

    Ok(Json(PageView::HotelDetail(HotelDetailPage {
        rooms: rooms.iter().map(|r| RoomView::new(r, client.session())).collect(),
        id: hotel.id,
        name: hotel.name,
        location: hotel.location,
        address: hotel.address,
        map_link: hotel.map_link,
        contact: hotel.contact,
        payment_methods: hotel.payment_methods,
        can_book,
    })))
}

pub async fn bookings(State(state): State<Arc<AppState>>, Caller(auth): Caller) -> PageResult {
    require_login(&auth)?;
    let client = state.client(&principal_of(&auth));
    let role = enter(&client, &auth, Route::Bookings).await?;
    let bookings = client
        .bookings(&BookingFilter::for_guest(client.caller().clone()))
        .await?;
    Ok(Json(PageView::Bookings(BookingsPage {
        bookings: booking_views(&client, bookings, role),
    })))
}

pub async fn guest(State(state): State<Arc<AppState>>, Caller(auth): Caller) -> PageResult {
    require_login(&auth)?;
    let client = state.client(&principal_of(&auth));
    let role = enter(&client, &auth, Route::Guest).await?;
    let profile = client.user_profile().await?;
    let bookings = client
        .bookings(&BookingFilter::for_guest(client.caller().clone()))
        .await?;
    Ok(Json(PageView::Guest(GuestPage {
        profile_required: profile.is_none(),
        profile,
        bookings: booking_views(&client, bookings, role),
    })))
}

pub async fn account(State(state): State<Arc<AppState>>, Caller(auth): Caller) -> PageResult {
    require_login(&auth)?;
    let client = state.client(&principal_of(&auth));
    let role = enter(&client, &auth, Route::Account).await?;
    Ok(Json(PageView::Account(AccountPage {
        principal: client.caller().clone(),
        profile: client.user_profile().await?,
        role,
    })))
}

pub async fn account_status(
    State(state): State<Arc<AppState>>,
    Caller(auth): Caller,
) -> PageResult {
    require_login(&auth)?;
    let client = state.client(&principal_of(&auth));
    let role = enter(&client, &auth, Route::AccountStatus).await?;
    let hotel = client.caller_hotel().await?;
    Ok(Json(PageView::AccountStatus(AccountStatusPage {
        principal: client.caller().clone(),
        user_role: client.user_role().await?,
        is_admin: role.is_admin(),
        hotel_activated: hotel.is_some(),
        hotel_name: hotel.map(|h| h.name),
        role,
    })))
}

pub async fn hotel_dashboard(
    State(state): State<Arc<AppState>>,
    Caller(auth): Caller,
) -> PageResult {
    let client = state.client(&principal_of(&auth));
    let role = enter(&client, &auth, Route::Hotel).await?;
    let hotel = client.caller_hotel().await?;

    let (rooms, bookings) = match &hotel {
        Some(hotel) => (
            client.rooms(Some(&hotel.id)).await?,
            client.bookings(&BookingFilter::for_hotel(hotel.id.clone())).await?,
        ),
        None => (Vec::new(), Vec::new()),
    };

    Ok(Json(PageView::Hotel(HotelDashboard {
        rooms: rooms.iter().map(|r| RoomView::new(r, client.session())).collect(),
        bookings: booking_views(&client, bookings, role),
        hotel,
        currencies: pricing::known_currencies().collect(),
    })))
}

pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    Caller(auth): Caller,
) -> PageResult {
    let client = state.client(&principal_of(&auth));
    let role = enter(&client, &auth, Route::Admin).await?;

    let hotels = client.hotels().await?;
    let tokens = client.invite_tokens().await?;
    let bookings = client.bookings(&BookingFilter::default()).await?;

    Ok(Json(PageView::Admin(AdminDashboard {
        hotels: hotels
            .into_iter()
            .map(|h| AdminHotelRow {
                room_count: h.rooms.len(),
                legacy_payment_methods: h.payment_methods.iter().filter(|m| m.is_legacy()).count(),
                id: h.id,
                name: h.name,
                active: h.active,
                subscription_status: h.subscription_status,
            })
            .collect(),
        invite_tokens: tokens
            .into_iter()
            .map(|t| InviteTokenView {
                remaining_uses: t.remaining_uses(),
                token: t,
            })
            .collect(),
        bookings: booking_views(&client, bookings, role),
    })))
}

fn principal_of(auth: &Authentication) -> Principal {
    auth.principal().cloned().unwrap_or_else(Principal::anonymous)
}
