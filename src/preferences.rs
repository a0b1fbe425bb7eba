use crate::api::{ApiClient, ApiError};
use crate::storage::{legacy_theme_key, preference_key, LocalStore, KEY_LEGACY_THEME};
use crate::types::{Preference, PreferencePatch, Theme};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    #[error("Failed to save preferences: {0}")]
    Api(#[from] ApiError),
}

/// What a shell renders: the active user's preference plus the last
/// non-fatal problem seen while syncing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceState {
    pub user_id: Option<String>,
    pub preference: Preference,
    pub warning: Option<String>,
}

/// Per-user display preferences mirrored between the server and the local
/// store. The server copy wins; the local copy only exists so that a shell
/// can render the right theme before the first round trip completes.
pub struct PreferenceCache {
    api: Arc<ApiClient>,
    local: LocalStore,
    generation: Mutex<u64>,
    state: watch::Sender<PreferenceState>,
}

impl PreferenceCache {
    pub fn new(api: Arc<ApiClient>, local: LocalStore) -> Self {
        let (state, _) = watch::channel(PreferenceState::default());
        Self {
            api,
            local,
            generation: Mutex::new(0),
            state,
        }
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> u64 {
        let mut guard = self.generation();
        *guard += 1;
        *guard
    }

    fn commit(&self, generation: u64, apply: impl FnOnce()) -> bool {
        let guard = self.generation();
        if *guard != generation {
            debug!(generation, current = *guard, "discarding stale preference result");
            return false;
        }
        apply();
        drop(guard);
        true
    }

    fn publish(&self, user_id: &str, preference: Preference, warning: Option<String>) {
        self.state.send_replace(PreferenceState {
            user_id: Some(user_id.to_string()),
            preference,
            warning,
        });
    }

    pub fn snapshot(&self) -> PreferenceState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PreferenceState> {
        self.state.subscribe()
    }

    /// In-memory preference, or the default when no user is loaded.
    pub fn current(&self) -> Preference {
        self.state.borrow().preference.clone()
    }

    /// Locally cached preference for `user_id`. Entries written under the
    /// old `theme_<id>` / `theme` keys are folded into the current key and
    /// removed on first read.
    pub fn cached(&self, user_id: &str) -> Option<Preference> {
        let key = preference_key(user_id);
        if let Some(preference) = self.local.get_json::<Preference>(&key) {
            return Some(preference);
        }

        let scoped = legacy_theme_key(user_id);
        let legacy = self
            .local
            .get_string(&scoped)
            .or_else(|| self.local.get_string(KEY_LEGACY_THEME))?;
        let preference = Preference {
            theme: Theme::from_wire(&legacy),
            ..Preference::default()
        };
        info!(user_id, theme = %preference.theme, "migrated legacy theme entry");
        self.local.set_json(&key, &preference);
        self.local.remove(&scoped);
        self.local.remove(KEY_LEGACY_THEME);
        Some(preference)
    }

    fn write_cache(&self, user_id: &str, preference: &Preference) {
        self.local.set_json(&preference_key(user_id), preference);
    }

    fn current_for(&self, user_id: &str) -> Preference {
        {
            let state = self.state.borrow();
            if state.user_id.as_deref() == Some(user_id) {
                return state.preference.clone();
            }
        }
        self.cached(user_id).unwrap_or_default()
    }

    /// Publishes the cached value right away, then replaces it with the
    /// server copy. Never fails: a failed fetch keeps the cached (or
    /// default) value and records a warning.
    pub async fn load(&self, user_id: &str) -> Preference {
        let generation = self.begin();
        let cached = self.cached(user_id);
        let initial = cached.clone().unwrap_or_default();
        self.commit(generation, || self.publish(user_id, initial.clone(), None));

        match self.api.settings().await {
            Ok(settings) => {
                let server = initial.merged_with(&settings);
                let applied = self.commit(generation, || {
                    if cached.as_ref() != Some(&server) {
                        debug!(user_id, "server preference differs from cache");
                        self.write_cache(user_id, &server);
                    }
                    self.publish(user_id, server.clone(), None);
                });
                if applied {
                    server
                } else {
                    self.current_for(user_id)
                }
            }
            Err(e) => {
                warn!(user_id, error = %e, "failed to fetch preferences; keeping cached value");
                let warning = format!("Could not load preferences from the server: {e}");
                let applied = self.commit(generation, || {
                    self.publish(user_id, initial.clone(), Some(warning));
                });
                if applied {
                    initial
                } else {
                    self.current_for(user_id)
                }
            }
        }
    }

    /// Applies `patch` optimistically, then saves it. If the server rejects
    /// the change, memory and cache go back to the pre-update value.
    pub async fn update(
        &self,
        user_id: &str,
        patch: &PreferencePatch,
    ) -> Result<Preference, PreferenceError> {
        let previous = self.current_for(user_id);
        if patch.is_empty() {
            return Ok(previous);
        }

        let optimistic = previous.apply(patch);
        let generation = self.begin();
        self.commit(generation, || {
            self.write_cache(user_id, &optimistic);
            self.publish(user_id, optimistic.clone(), None);
        });

        match self.api.update_settings(patch).await {
            Ok(settings) => {
                let saved = optimistic.merged_with(&settings);
                self.commit(generation, || {
                    self.write_cache(user_id, &saved);
                    self.publish(user_id, saved.clone(), None);
                });
                info!(user_id, theme = %saved.theme, currency = %saved.currency, "preferences saved");
                Ok(saved)
            }
            Err(e) => {
                warn!(user_id, error = %e, "preference update rejected; rolling back");
                let err = PreferenceError::from(e);
                let message = err.to_string();
                self.commit(generation, || {
                    self.write_cache(user_id, &previous);
                    self.publish(user_id, previous.clone(), Some(message));
                });
                Err(err)
            }
        }
    }

    /// Drops the in-memory state for the signed-out user. The on-disk
    /// mirror is kept so the next login renders with the right theme.
    pub fn forget(&self) {
        self.begin();
        self.state.send_replace(PreferenceState::default());
    }
}
