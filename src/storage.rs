use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const STATE_FILE: &str = "fintrack-state.json";

pub const KEY_AUTH_TOKEN: &str = "authToken";
pub const KEY_CURRENT_USER_PUBLIC_ID: &str = "currentUserPublicId";
pub const KEY_LEGACY_THEME: &str = "theme";

pub fn preference_key(user_id: &str) -> String {
  format!("preference:{user_id}")
}

pub fn legacy_theme_key(user_id: &str) -> String {
  format!("theme_{user_id}")
}

/// Persisted key/value map shared by every client component.
///
/// The whole map is written back to disk after each mutation. Disk failures
/// are logged and otherwise ignored: the in-memory copy stays authoritative
/// for the lifetime of the process.
#[derive(Clone)]
pub struct LocalStore {
  path: Option<PathBuf>,
  values: Arc<Mutex<Map<String, Value>>>,
}

impl LocalStore {
  pub fn open(data_dir: &Path) -> Self {
    let path = data_dir.join(STATE_FILE);
    let values = match std::fs::read_to_string(&path) {
      Ok(text) => match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
          warn!(path = %path.display(), "local state is not a JSON object; starting empty");
          Map::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
      Err(e) => {
        warn!(path = %path.display(), error = %e, "failed to read local state");
        Map::new()
      }
    };
    debug!(path = %path.display(), keys = values.len(), "local store opened");
    Self {
      path: Some(path),
      values: Arc::new(Mutex::new(values)),
    }
  }

  /// Store that never touches the filesystem.
  pub fn in_memory() -> Self {
    Self {
      path: None,
      values: Arc::new(Mutex::new(Map::new())),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
    self
      .values
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn persist(&self, snapshot: &Map<String, Value>) {
    let Some(path) = self.path.as_ref() else {
      return;
    };
    if let Some(parent) = path.parent() {
      if let Err(e) = std::fs::create_dir_all(parent) {
        warn!(path = %parent.display(), error = %e, "failed to create data directory");
        return;
      }
    }
    let text = match serde_json::to_string_pretty(snapshot) {
      Ok(text) => text,
      Err(e) => {
        warn!(error = %e, "failed to serialize local state");
        return;
      }
    };
    let tmp = path.with_extension("json.tmp");
    let result = std::fs::write(&tmp, text).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(e) = result {
      warn!(path = %path.display(), error = %e, "failed to write local state");
    }
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    self.lock().get(key).cloned()
  }

  pub fn get_string(&self, key: &str) -> Option<String> {
    let v = self.get(key)?;
    let s = v.as_str()?.trim();
    if s.is_empty() {
      None
    } else {
      Some(s.to_string())
    }
  }

  /// Reads and decodes a JSON value; entries that no longer decode are
  /// treated as absent.
  pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let value = self.get(key)?;
    match serde_json::from_value(value) {
      Ok(v) => Some(v),
      Err(e) => {
        debug!(key, error = %e, "ignoring undecodable local entry");
        None
      }
    }
  }

  pub fn set(&self, key: &str, value: impl Into<Value>) {
    let snapshot = {
      let mut guard = self.lock();
      guard.insert(key.to_string(), value.into());
      guard.clone()
    };
    self.persist(&snapshot);
  }

  pub fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) {
    match serde_json::to_value(value) {
      Ok(v) => self.set(key, v),
      Err(e) => warn!(key, error = %e, "failed to encode local entry"),
    }
  }

  pub fn remove(&self, key: &str) {
    let snapshot = {
      let mut guard = self.lock();
      if guard.remove(key).is_none() {
        return;
      }
      guard.clone()
    };
    self.persist(&snapshot);
  }

  pub fn contains(&self, key: &str) -> bool {
    self.lock().contains_key(key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path());
    store.set(KEY_CURRENT_USER_PUBLIC_ID, "u-1");
    store.set(&preference_key("u-1"), json!({"theme": "dark", "currency": "EUR"}));

    let reopened = LocalStore::open(dir.path());
    assert_eq!(
      reopened.get_string(KEY_CURRENT_USER_PUBLIC_ID).as_deref(),
      Some("u-1")
    );
    assert_eq!(
      reopened.get(&preference_key("u-1")),
      Some(json!({"theme": "dark", "currency": "EUR"}))
    );
  }

  #[test]
  fn corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(STATE_FILE), "{not json").unwrap();
    let store = LocalStore::open(dir.path());
    assert!(store.get(KEY_AUTH_TOKEN).is_none());

    store.set(KEY_AUTH_TOKEN, "t");
    assert_eq!(LocalStore::open(dir.path()).get_string(KEY_AUTH_TOKEN).as_deref(), Some("t"));
  }

  #[test]
  fn blank_strings_read_as_absent() {
    let store = LocalStore::in_memory();
    store.set(KEY_AUTH_TOKEN, "   ");
    assert!(store.get_string(KEY_AUTH_TOKEN).is_none());
    assert!(store.contains(KEY_AUTH_TOKEN));
    store.remove(KEY_AUTH_TOKEN);
    assert!(!store.contains(KEY_AUTH_TOKEN));
  }

  #[test]
  fn unwritable_directory_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file, not a directory").unwrap();
    let store = LocalStore::open(&blocker.join("nested"));
    store.set(KEY_AUTH_TOKEN, "kept-in-memory");
    assert_eq!(store.get_string(KEY_AUTH_TOKEN).as_deref(), Some("kept-in-memory"));
  }
}
