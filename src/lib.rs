pub mod access;
pub mod api;
pub mod backend;
pub mod booking;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod invite;
pub mod models;
pub mod notify;
pub mod pictures;
pub mod pricing;
pub mod session;

use config::Config;
use std::sync::Arc;

use crate::backend::HotelBackend;
use crate::client::PortalClient;
use crate::models::Principal;
use crate::session::SessionRegistry;

pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn HotelBackend>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn HotelBackend>) -> Self {
        let sessions = Arc::new(
            SessionRegistry::new(
                config.cache.stale_after(),
                config.notifications.max_per_session,
            )
            .with_limits(&config.sessions),
        );
        Self {
            config,
            backend,
            sessions,
        }
    }

    /// Backend access on behalf of `caller`, through that caller's session.
    pub fn client(&self, caller: &Principal) -> PortalClient {
        PortalClient::new(
            self.backend.clone(),
            self.sessions.clone(),
            caller,
            self.config.cache.query_retries,
            self.config.activation.redirect_delay_ms,
        )
    }
}
