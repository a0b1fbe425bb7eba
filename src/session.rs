//! Client-side session lifecycle.
//!
//! One [`SessionManager`] exists per [`crate::state::AppState`]. Every
//! operation that can change the session takes a new generation number when
//! it starts and only applies its result if no newer operation has started
//! since, so a slow startup check can never overwrite a later login or
//! logout.

use crate::api::{ApiClient, ApiError};
use crate::storage::{LocalStore, KEY_CURRENT_USER_PUBLIC_ID};
use crate::types::{
    Credentials, RegisterPayload, RegistrationForm, Session, SessionStatus, User,
};
use crate::validation::{validate_credentials, validate_registration, ValidationError};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const SESSION_EXPIRED: &str = "Session expired. Please login again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("login was superseded by a newer session operation")]
    Superseded,
}

pub struct SessionManager {
    api: Arc<ApiClient>,
    local: LocalStore,
    generation: Mutex<u64>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, local: LocalStore) -> Self {
        let (state, _) = watch::channel(Session::initializing());
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

    /// Runs `apply` only if `generation` is still the newest operation.
    /// The generation lock is held while `apply` runs, so a competing
    /// operation cannot start halfway through.
    fn commit(&self, generation: u64, apply: impl FnOnce()) -> bool {
        let guard = self.generation();
        if *guard != generation {
            debug!(generation, current = *guard, "discarding stale session result");
            return false;
        }
        apply();
        drop(guard);
        true
    }

    fn publish(&self, session: Session) {
        debug!(status = ?session.status, "session updated");
        self.state.send_replace(session);
    }

    fn remember_user(&self, user: &User) {
        self.local
            .set(KEY_CURRENT_USER_PUBLIC_ID, user.storage_id().to_string());
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Cache key of the last authenticated user, as persisted locally.
    pub fn current_user_public_id(&self) -> Option<String> {
        self.local.get_string(KEY_CURRENT_USER_PUBLIC_ID)
    }

    /// Resolves the initial session from a stored credential. Never fails:
    /// any problem with the stored credential ends in `Unauthenticated`.
    pub async fn start(&self) -> Session {
        let generation = self.begin();

        if self.api.tokens().get().is_none() {
            self.commit(generation, || self.publish(Session::unauthenticated(None)));
            return self.snapshot();
        }

        match self.api.current_user().await {
            Ok(user) => {
                self.commit(generation, || {
                    self.remember_user(&user);
                    info!(user_id = %user.id, "session restored");
                    self.publish(Session::authenticated(user.clone()));
                });
            }
            Err(e) => {
                self.commit(generation, || {
                    warn!(error = %e, "stored session is no longer valid");
                    self.api.tokens().clear();
                    self.local.remove(KEY_CURRENT_USER_PUBLIC_ID);
                    self.publish(Session::unauthenticated(Some(SESSION_EXPIRED.to_string())));
                });
            }
        }
        self.snapshot()
    }

    /// Validates locally, exchanges the credentials for a token and loads
    /// the user. On failure the session and stored token are left as they
    /// were, apart from `last_error`, which carries the server's message.
    /// A session still waiting on its startup check ends up unauthenticated
    /// with no stored token.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, SessionError> {
        validate_credentials(credentials)?;

        let generation = self.begin();
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.last_error = None;
        });

        match self.try_login(generation, credentials).await {
            Ok(user) => Ok(user),
            Err(SessionError::Superseded) => Err(SessionError::Superseded),
            Err(err) => {
                let message = err.to_string();
                self.commit(generation, || {
                    // Startup never confirmed the stored token.
                    if self.state.borrow().status == SessionStatus::Initializing {
                        self.api.tokens().clear();
                        self.local.remove(KEY_CURRENT_USER_PUBLIC_ID);
                    }
                    self.state.send_modify(|s| {
                        if s.status == SessionStatus::Initializing {
                            s.status = SessionStatus::Unauthenticated;
                            s.user = None;
                        }
                        s.is_loading = false;
                        s.last_error = Some(message);
                    });
                });
                Err(err)
            }
        }
    }

    /// The new token is only stored once `/auth/me` accepts it, so a failed
    /// attempt never touches the credential of the current session.
    async fn try_login(&self, generation: u64, credentials: &Credentials) -> Result<User, SessionError> {
        let token = self.api.login(credentials).await?;
        let user = self.api.current_user_with(&token).await?;

        let applied = self.commit(generation, || {
            self.api.tokens().set(&token);
            self.remember_user(&user);
            info!(user_id = %user.id, "logged in");
            self.publish(Session::authenticated(user.clone()));
        });
        if applied {
            Ok(user)
        } else {
            Err(SessionError::Superseded)
        }
    }

    /// Unconditionally ends the session.
    pub fn logout(&self) {
        self.end_session(None);
        info!("logged out");
    }

    /// Ends the session after an authenticated call was rejected, keeping
    /// `reason` for display.
    pub fn invalidate(&self, reason: &str) {
        warn!(reason, "session invalidated");
        self.end_session(Some(reason.to_string()));
    }

    fn end_session(&self, last_error: Option<String>) {
        let mut guard = self.generation();
        *guard += 1;
        self.api.tokens().clear();
        self.local.remove(KEY_CURRENT_USER_PUBLIC_ID);
        self.publish(Session::unauthenticated(last_error));
        drop(guard);
    }

    /// Creates an account. The session is not touched: callers send the
    /// user to the login flow afterwards.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, SessionError> {
        validate_registration(form)?;
        let payload = RegisterPayload {
            full_name: form.full_name.trim(),
            email: form.email.trim(),
            password: &form.password,
        };
        let user = self.api.register(&payload).await?;
        info!(user_id = %user.id, "account registered");
        Ok(user)
    }
}
