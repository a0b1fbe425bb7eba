use crate::config::TokenBackend;
use crate::storage::{LocalStore, KEY_AUTH_TOKEN};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const KEYRING_SERVICE: &str = "io.fintrack.client";
pub const KEYRING_USER_AUTH_TOKEN: &str = "authToken";

enum Backend {
    Keyring,
    File(LocalStore),
    Memory,
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Sole owner of the bearer credential.
///
/// Persistence failures never surface to callers: the store falls back to
/// its in-memory copy, so an unavailable keychain means "not remembered
/// across restarts" rather than an error.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<Backend>,
    in_memory: Arc<Mutex<Option<String>>>,
}

impl TokenStore {
    pub fn new(backend: TokenBackend, local: &LocalStore) -> Self {
        let backend = match backend {
            TokenBackend::Keyring => Backend::Keyring,
            TokenBackend::File => Backend::File(local.clone()),
            TokenBackend::Memory => Backend::Memory,
        };
        Self {
            backend: Arc::new(backend),
            in_memory: Arc::new(Mutex::new(None)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(TokenBackend::Memory, &LocalStore::in_memory())
    }

    fn entry() -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER_AUTH_TOKEN)
    }

    fn cached(&self) -> MutexGuard<'_, Option<String>> {
        self.in_memory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the configured backend can persist a credential.
    pub fn is_persistent(&self) -> bool {
        match self.backend.as_ref() {
            Backend::Memory => false,
            Backend::File(_) => true,
            Backend::Keyring => {
                let Ok(entry) = Self::entry() else {
                    return false;
                };
                match entry.get_password() {
                    Ok(_) => true,
                    Err(keyring::Error::NoEntry) => true,
                    Err(keyring::Error::BadEncoding(_)) => true,
                    Err(keyring::Error::Ambiguous(_)) => true,
                    Err(keyring::Error::NoStorageAccess(_)) => false,
                    Err(keyring::Error::PlatformFailure(_)) => false,
                    Err(_) => false,
                }
            }
        }
    }

    fn read_persisted(&self) -> Option<String> {
        match self.backend.as_ref() {
            Backend::Memory => None,
            Backend::File(local) => local.get_string(KEY_AUTH_TOKEN),
            Backend::Keyring => {
                let entry = match Self::entry() {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "keyring unavailable; token not restored");
                        return None;
                    }
                };
                match entry.get_password() {
                    Ok(pwd) => normalize(&pwd),
                    Err(keyring::Error::NoEntry) => None,
                    Err(e) => {
                        warn!(error = %e, "failed to read token from keyring");
                        None
                    }
                }
            }
        }
    }

    fn write_persisted(&self, token: &str) {
        match self.backend.as_ref() {
            Backend::Memory => {}
            Backend::File(local) => local.set(KEY_AUTH_TOKEN, token),
            Backend::Keyring => {
                let result = Self::entry().and_then(|entry| entry.set_password(token));
                if let Err(e) = result {
                    warn!(error = %e, "failed to store token in keyring; keeping it in memory");
                }
            }
        }
    }

    fn delete_persisted(&self) {
        match self.backend.as_ref() {
            Backend::Memory => {}
            Backend::File(local) => local.remove(KEY_AUTH_TOKEN),
            Backend::Keyring => {
                if let Ok(entry) = Self::entry() {
                    match entry.delete_credential() {
                        Ok(()) | Err(keyring::Error::NoEntry) => {}
                        Err(e) => warn!(error = %e, "failed to delete token from keyring"),
                    }
                }
            }
        }
    }

    pub fn set(&self, token: &str) {
        let Some(token) = normalize(token) else {
            self.clear();
            return;
        };
        self.write_persisted(&token);
        *self.cached() = Some(token);
        debug!("token stored");
    }

    pub fn get(&self) -> Option<String> {
        if let Some(value) = self.cached().clone() {
            return Some(value);
        }
        let restored = self.read_persisted()?;
        *self.cached() = Some(restored.clone());
        Some(restored)
    }

    pub fn has_token(&self) -> bool {
        self.get().is_some()
    }

    pub fn clear(&self) {
        *self.cached() = None;
        self.delete_persisted();
        debug!("token cleared");
    }
}
