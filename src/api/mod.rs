mod account;
mod admin;
pub mod auth;
mod bookings;
pub mod error;
mod hotels;
pub mod pages;
pub mod validation;

use axum::{
    http::{header, HeaderName, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Page views, one per portal route
    let page_routes = Router::new()
        .route("/home", get(pages::home))
        .route("/browse", get(pages::browse))
        .route("/browse/:hotel_id", get(pages::hotel_detail))
        .route("/bookings", get(pages::bookings))
        .route("/guest", get(pages::guest))
        .route("/account", get(pages::account))
        .route("/account-status", get(pages::account_status))
        .route("/hotel", get(pages::hotel_dashboard))
        .route("/admin", get(pages::admin_dashboard));

    let api_routes = Router::new()
        // Caller
        .route("/profile", put(account::save_profile))
        .route("/session/retry-permissions", post(account::retry_permissions))
        .route("/notifications", get(account::notifications))
        .route("/pictures/failed", post(account::picture_failed))
        // Hotel activation
        .route("/invite-tokens/validate", post(account::validate_invite_token))
        .route("/invite-tokens/consume", post(account::consume_invite_token))
        // Hotel owner
        .route("/hotel/profile", put(hotels::update_profile))
        .route("/hotel/payment-methods", post(hotels::add_payment_method))
        .route("/hotel/payment-methods/:id", delete(hotels::remove_payment_method))
        .route("/hotel/rooms", post(hotels::create_room))
        .route("/hotel/rooms/:id", put(hotels::update_room))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id/payment-proof", put(bookings::attach_payment_proof))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:id/confirm", post(bookings::confirm_booking))
        .route("/bookings/:id/complete", post(bookings::record_stay_completion))
        // Admin
        .route("/admin/bootstrap", post(account::bootstrap_admin))
        .route(
            "/admin/invite-tokens",
            get(admin::list_invite_tokens).post(admin::create_invite_token),
        )
        .route("/admin/hotels/:id/active", put(hotels::set_active))
        .route("/admin/hotels/:id/subscription", put(hotels::set_subscription))
        .route("/admin/hotels/:id/activate", post(hotels::activate_owner))
        .route("/admin/cleanup/room-photos", post(admin::remove_legacy_room_photos))
        .route("/admin/cleanup/payment-methods", post(admin::remove_legacy_payment_methods))
        .route("/admin/principals/:principal", delete(admin::purge_principal));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(auth::CALLER_HEADER),
        ]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/pages", page_routes)
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::RETRY_PERMISSIONS_PATH;
    use crate::backend::flaky::FlakyBackend;
    use crate::backend::{HotelBackend, MemoryBackend};
    use crate::config::Config;
    use crate::models::{Principal, UserRole};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: Arc<AppState>,
        backend: Arc<MemoryBackend>,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_config(Config::default())
        }

        fn with_config(config: Config) -> Self {
            let backend = Arc::new(MemoryBackend::new());
            Self::serving(config, backend.clone(), backend)
        }

        /// `memory` is the handle tests use for direct seeding.
        fn serving(
            config: Config,
            backend: Arc<dyn HotelBackend>,
            memory: Arc<MemoryBackend>,
        ) -> Self {
            let state = Arc::new(AppState::new(config, backend));
            Self {
                router: create_router(state.clone()),
                state,
                backend: memory,
            }
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            caller: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(caller) = caller {
                request = request.header(auth::CALLER_HEADER, caller);
            }
            let body = match body {
                Some(value) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .router
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn get(&self, uri: &str, caller: Option<&str>) -> (StatusCode, Value) {
            self.send("GET", uri, caller, None).await
        }

        async fn post(&self, uri: &str, caller: &str, body: Value) -> (StatusCode, Value) {
            self.send("POST", uri, Some(caller), Some(body)).await
        }
    }

    const ADMIN: &str = "aaaaa-aa";
    const OWNER: &str = "bbbbb-bb";
    const GUEST: &str = "ccccc-cc";

    /// Admin bootstrapped, OWNER activated with one 250,000 IDR room, GUEST with a profile.
    async fn seeded() -> (TestApp, String) {
        let app = TestApp::new();
        let (status, _) = app.post("/api/admin/bootstrap", ADMIN, json!({})).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app
            .post(&format!("/api/admin/hotels/{}/activate", OWNER), ADMIN, json!({}))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = app
            .post(
                "/api/hotel/rooms",
                OWNER,
                json!({
                    "roomNumber": "101",
                    "roomType": "Deluxe",
                    "pricePerNight": 250000,
                    "currency": "IDR",
                    "pictures": ["https://img/1.jpg", "https://img/2.jpg"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let room_id = body["id"].as_str().unwrap().to_string();
        let (status, _) = app
            .send("PUT", "/api/profile", Some(GUEST), Some(json!({ "name": "Dewi" })))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        (app, room_id)
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_gated_page_requires_login() {
        let app = TestApp::new();
        let (status, body) = app.get("/pages/admin", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["view"], "loginRequired");
    }

    #[tokio::test]
    async fn test_guest_is_denied_admin_page() {
        let app = TestApp::new();
        let (status, body) = app.get("/pages/admin", Some(GUEST)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["view"], "denied");
        assert_eq!(body["requiredRoles"], json!(["admin"]));
    }

    #[tokio::test]
    async fn test_admin_bypasses_hotel_activation() {
        let (app, _) = seeded().await;
        let (status, body) = app.get("/pages/hotel", Some(ADMIN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "hotel");
    }

    #[tokio::test]
    async fn test_pending_owner_gets_activation_form() {
        let app = TestApp::new();
        app.backend
            .grant_role(&Principal::parse(OWNER).unwrap(), UserRole::User);

        let (status, body) = app.get("/pages/hotel", Some(OWNER)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["view"], "activationRequired");
        assert_eq!(body["consumePath"], "/api/invite-tokens/consume");
    }

    #[tokio::test]
    async fn test_activation_with_invite_token() {
        let app = TestApp::new();
        app.post("/api/admin/bootstrap", ADMIN, json!({})).await;
        app.backend
            .grant_role(&Principal::parse(OWNER).unwrap(), UserRole::User);
        let (_, created) = app
            .post("/api/admin/invite-tokens", ADMIN, json!({ "maxUses": 1 }))
            .await;
        let token = created["token"].as_str().unwrap().to_string();

        let (status, check) = app
            .post("/api/invite-tokens/validate", OWNER, json!({ "token": token }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(check["valid"], true);

        // gate answer is cached before activation
        let (status, _) = app.get("/pages/hotel", Some(OWNER)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .post("/api/invite-tokens/consume", OWNER, json!({ "token": token }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redirect"]["to"], "/hotel");
        assert_eq!(body["redirect"]["afterMs"], 1500);

        let (status, body) = app.get("/pages/hotel", Some(OWNER)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "hotel");
    }

    #[tokio::test]
    async fn test_exhausted_token_is_reported_as_error() {
        let app = TestApp::new();
        app.post("/api/admin/bootstrap", ADMIN, json!({})).await;
        let (_, created) = app
            .post("/api/admin/invite-tokens", ADMIN, json!({ "maxUses": 1 }))
            .await;
        let token = created["token"].as_str().unwrap().to_string();

        let (status, _) = app
            .post("/api/invite-tokens/consume", OWNER, json!({ "token": token }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .post("/api/invite-tokens/consume", GUEST, json!({ "token": token }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "unprocessable_entity");

        let (_, toasts) = app.get("/api/notifications", Some(GUEST)).await;
        let toasts = toasts.as_array().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0]["level"], "error");
        assert!(toasts[0]["message"].as_str().unwrap().contains("maximum"));

        // drained
        let (_, toasts) = app.get("/api/notifications", Some(GUEST)).await;
        assert_eq!(toasts, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_token_is_inline_error() {
        let app = TestApp::new();
        let (status, body) = app
            .post("/api/invite-tokens/validate", OWNER, json!({ "token": "short" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wellFormed"], false);

        let (status, body) = app
            .post("/api/invite-tokens/consume", OWNER, json!({ "token": "short" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_booking_flow() {
        let (app, room_id) = seeded().await;
        let day = crate::booking::NANOS_PER_DAY;

        let (status, body) = app
            .post(
                "/api/bookings",
                GUEST,
                json!({
                    "hotelId": OWNER,
                    "roomId": room_id,
                    "checkIn": 20 * day,
                    "checkOut": 22 * day,
                    "guests": 2
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["quote"]["totalPrice"], 500000);
        let booking_id = body["id"].as_str().unwrap().to_string();

        let (status, page) = app.get("/pages/bookings", Some(GUEST)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["bookings"][0]["total"], "Rp 500,000");
        assert_eq!(page["bookings"][0]["actions"], json!(["cancel", "attachPaymentProof"]));

        let (status, _) = app
            .post(&format!("/api/bookings/{}/confirm", booking_id), OWNER, json!({}))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app
            .post(&format!("/api/bookings/{}/cancel", booking_id), GUEST, json!({}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["message"], "Cannot cancel a booking that is booked");

        let (_, dashboard) = app.get("/pages/hotel", Some(OWNER)).await;
        assert_eq!(
            dashboard["bookings"][0]["actions"],
            json!(["cancel", "recordStayCompletion"])
        );
    }

    #[tokio::test]
    async fn test_booking_without_profile() {
        let (app, room_id) = seeded().await;
        let (status, _) = app
            .post(
                "/api/bookings",
                "ddddd-dd",
                json!({
                    "hotelId": OWNER,
                    "roomId": room_id,
                    "checkIn": 0,
                    "checkOut": crate::booking::NANOS_PER_DAY,
                    "guests": 1
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_failed_picture_is_hidden() {
        let (app, room_id) = seeded().await;
        let uri = format!("/pages/browse/{}", OWNER);

        let (_, page) = app.get(&uri, Some(GUEST)).await;
        assert_eq!(page["canBook"], true);
        assert_eq!(page["rooms"][0]["pictures"].as_array().unwrap().len(), 2);

        let (status, _) = app
            .post(
                "/api/pictures/failed",
                GUEST,
                json!({ "roomId": room_id, "url": "https://img/1.jpg" }),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, page) = app.get(&uri, Some(GUEST)).await;
        let pictures = page["rooms"][0]["pictures"].as_array().unwrap();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0]["index"], 1);
    }

    #[tokio::test]
    async fn test_anonymous_picture_failures_stay_with_the_visitor() {
        let (app, room_id) = seeded().await;
        for url in ["https://img/1.jpg", "https://img/2.jpg"] {
            let body = json!({ "roomId": room_id, "url": url });
            let (status, _) = app
                .send("POST", "/api/pictures/failed", None, Some(body))
                .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, page) = app.get(&format!("/pages/browse/{}", OWNER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["rooms"][0]["pictures"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_picture_reports_for_unrendered_rooms_are_dropped() {
        let (app, room_id) = seeded().await;
        for i in 0..20 {
            let body = json!({ "roomId": format!("junk-{}", i), "url": "https://img/1.jpg" });
            let (status, _) = app.post("/api/pictures/failed", GUEST, body).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }
        // a real room the guest never opened is not tracked either
        app.post(
            "/api/pictures/failed",
            GUEST,
            json!({ "roomId": room_id, "url": "https://img/1.jpg" }),
        )
        .await;

        let guest = Principal::parse(GUEST).unwrap();
        assert_eq!(app.state.sessions.for_caller(&guest).gallery_count(), 0);
    }

    #[tokio::test]
    async fn test_session_count_is_bounded() {
        let mut config = Config::default();
        config.sessions.max_sessions = 5;
        let app = TestApp::with_config(config);

        for i in 0..20u8 {
            let caller = format!("aaaa{}-aa", (b'a' + i) as char);
            let (status, _) = app.get("/api/notifications", Some(&caller)).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert!(app.state.sessions.len() <= 5);
    }

    #[tokio::test]
    async fn test_failed_role_lookup_offers_retry() {
        let app = TestApp::serving(
            Config::default(),
            Arc::new(FlakyBackend::down()),
            Arc::new(MemoryBackend::new()),
        );
        for page in ["/pages/account", "/pages/account-status", "/pages/bookings", "/pages/guest"] {
            let (status, body) = app.get(page, Some(GUEST)).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", page);
            assert_eq!(body["view"], "permissionCheckFailed", "{}", page);
            assert_eq!(body["retryPath"], RETRY_PERMISSIONS_PATH);
            assert_eq!(body["homePath"], "/");
        }
    }

    #[tokio::test]
    async fn test_room_validation() {
        let (app, _) = seeded().await;
        let (status, body) = app
            .post(
                "/api/hotel/rooms",
                OWNER,
                json!({
                    "roomNumber": "102",
                    "roomType": "Suite",
                    "pricePerNight": 100,
                    "currency": "EUR",
                    "discountPercent": 120
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["details"]["currency"].is_array());
        assert!(body["error"]["details"]["discountPercent"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_caller_header() {
        let app = TestApp::new();
        let (status, body) = app.get("/pages/account", Some("NOT VALID")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["principal"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_mutation_is_unauthorized() {
        let app = TestApp::new();
        let (status, _) = app
            .send("PUT", "/api/profile", None, Some(json!({ "name": "Dewi" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_browse_formats_prices() {
        let (app, _) = seeded().await;
        let (status, page) = app.get("/pages/browse", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["view"], "browse");
        assert_eq!(page["hotels"][0]["fromPrice"], "Rp 250,000");
    }
}
