// --- File: crates/bookify_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- Remote API ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to, without trailing slash.
    pub base_url: String,
    pub timeout_secs: u64,
    pub follow_redirects: bool,
    /// Key sent as `x-api-key` by the sync-user endpoint. Usually loaded from env.
    pub sync_api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            timeout_secs: 30,
            follow_redirects: true,
            sync_api_key: None,
        }
    }
}

// --- Session / token storage ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file holding the persisted bearer token.
    pub token_path: String,
    /// Key the token is stored under inside `token_path`.
    pub storage_key: String,
    /// Keep a local developer session when `/auth/me` fails.
    pub dev_bypass: bool,
    pub dev_user_name: Option<String>,
    pub dev_user_email: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: "bookify_session.json".to_string(),
            storage_key: "authToken".to_string(),
            dev_bypass: false,
            dev_user_name: None,
            dev_user_email: None,
        }
    }
}

// --- Booking defaults ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BookingConfig {
    /// IANA timezone used for slot queries and request assembly.
    pub timezone: String,
    /// Used when an event type does not carry a duration.
    pub default_duration_minutes: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Buenos_Aires".to_string(),
            default_duration_minutes: 30,
        }
    }
}

// --- Logging ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are additionally written to a daily rolling file here.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
