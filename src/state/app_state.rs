use super::TokenStore;
use crate::api::{ApiClient, ApiError};
use crate::config::{ClientConfig, ConfigError, ConfigOverrides};
use crate::finance::FinanceClient;
use crate::preferences::PreferenceCache;
use crate::session::{SessionManager, SESSION_EXPIRED};
use crate::storage::LocalStore;
use crate::types::{Preference, Session};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] ApiError),
}

/// Everything a shell needs, wired once from a [`ClientConfig`]. Components
/// share one [`ApiClient`] and therefore one token store.
pub struct AppState {
    pub config: ClientConfig,
    pub local: LocalStore,
    pub tokens: TokenStore,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
    pub preferences: Arc<PreferenceCache>,
    pub finance: FinanceClient,
}

impl AppState {
    pub fn new(config: ClientConfig) -> Result<Self, StartupError> {
        let local = LocalStore::open(&config.data_dir);
        let tokens = TokenStore::new(config.token_backend, &local);
        let api = Arc::new(ApiClient::new(
            &config.base_url,
            config.request_timeout,
            tokens.clone(),
        )?);
        let session = Arc::new(SessionManager::new(api.clone(), local.clone()));
        let preferences = Arc::new(PreferenceCache::new(api.clone(), local.clone()));
        let finance = FinanceClient::new(api.clone());

        debug!(
            base_url = %config.base_url,
            data_dir = %config.data_dir.display(),
            backend = ?config.token_backend,
            persistent_token = tokens.is_persistent(),
            "app state ready"
        );

        Ok(Self {
            config,
            local,
            tokens,
            api,
            session,
            preferences,
            finance,
        })
    }

    pub fn from_overrides(overrides: ConfigOverrides) -> Result<Self, StartupError> {
        Self::new(ClientConfig::resolve(overrides)?)
    }

    /// Resolves the stored session and, when it is valid, the signed-in
    /// user's preferences.
    pub async fn bootstrap(&self) -> Session {
        let session = self.session.start().await;
        if let Some(user) = session.user.as_ref() {
            self.preferences.load(user.storage_id()).await;
        }
        session
    }

    /// Preference of the signed-in user, loading it on first use.
    pub async fn active_preference(&self) -> Preference {
        let Some(user) = self.session.current_user() else {
            return Preference::default();
        };
        let state = self.preferences.snapshot();
        if state.user_id.as_deref() == Some(user.storage_id()) {
            return state.preference;
        }
        self.preferences.load(user.storage_id()).await
    }

    /// Reacts to an error from an authenticated call. A 401 means the
    /// stored token is no longer accepted: the session ends and cached
    /// in-memory preferences are dropped.
    pub fn handle_api_error(&self, err: &ApiError) {
        if err.is_unauthorized() && self.session.is_authenticated() {
            info!("authenticated request rejected; ending session");
            self.session.invalidate(SESSION_EXPIRED);
            self.preferences.forget();
        }
    }

    pub fn logout(&self) {
        self.session.logout();
        self.preferences.forget();
    }
}
