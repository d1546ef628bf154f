// --- File: crates/services/bookify_app/src/app_state.rs ---
use std::sync::Arc;

use bookify_api::{ApiClient, FileTokenStore, Session, TokenStore};
use bookify_common::BookifyError;
use bookify_config::AppConfig;
use tracing::info;

/// Long-lived objects shared by everything the driver runs.
///
/// The session is shared with the API client, which reads a fresh token
/// snapshot for every request and clears it on logout.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<Session>,
    pub api: Arc<ApiClient>,
}

impl AppState {
    /// Builds the state with the token persisted in `session.token_path`.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, BookifyError> {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(
            &config.session.token_path,
            &config.session.storage_key,
        ));
        Self::with_store(config, store)
    }

    pub fn with_store(config: Arc<AppConfig>, store: Arc<dyn TokenStore>) -> Result<Self, BookifyError> {
        let session = Arc::new(Session::new(store)?);
        let api = Arc::new(ApiClient::new(&config.api, Arc::clone(&session))?);
        info!("API client ready for {}", api.base_url());
        Ok(Self {
            config,
            session,
            api,
        })
    }
}
