use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub activation: ActivationConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,
    /// Base URL of the booking backend's RPC gateway
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Transport timeout; unset leaves the HTTP client's default in place
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            url: default_backend_url(),
            request_timeout_secs: None,
        }
    }
}

fn default_backend_kind() -> BackendKind {
    BackendKind::Http
}

fn default_backend_url() -> String {
    "http://127.0.0.1:4943".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Http,
    /// In-process backend, nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds before a cached read is fetched again
    #[serde(default = "default_stale_seconds")]
    pub stale_seconds: u64,
    /// Extra attempts for a failed read; writes are never retried
    #[serde(default = "default_query_retries")]
    pub query_retries: u32,
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_seconds: default_stale_seconds(),
            query_retries: default_query_retries(),
        }
    }
}

fn default_stale_seconds() -> u64 {
    30
}

fn default_query_retries() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Seconds without a request before a caller's session is dropped
    #[serde(default = "default_idle_seconds")]
    pub idle_seconds: u64,
    /// Upper bound on open sessions; the longest idle one makes room
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl SessionsConfig {
    pub fn idle_after(&self) -> Duration {
        Duration::from_secs(self.idle_seconds)
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_seconds: default_idle_seconds(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_idle_seconds() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivationConfig {
    /// Delay before the activation form sends the owner to the hotel dashboard
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            redirect_delay_ms: default_redirect_delay_ms(),
        }
    }
}

fn default_redirect_delay_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_max_per_session")]
    pub max_per_session: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            max_per_session: default_max_per_session(),
        }
    }
}

fn default_max_per_session() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.backend.kind == BackendKind::Http {
            let url = self.backend.url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("backend.url must be an http(s) URL, got '{}'", url);
            }
        }
        if self.backend.request_timeout_secs == Some(0) {
            anyhow::bail!("backend.request_timeout_secs must be at least 1 when set");
        }
        if self.sessions.idle_seconds == 0 || self.sessions.max_sessions == 0 {
            anyhow::bail!("sessions.idle_seconds and sessions.max_sessions must be at least 1");
        }
        if self.notifications.max_per_session == 0 {
            anyhow::bail!("notifications.max_per_session must be at least 1");
        }
        Ok(())
    }
}
