//! Client configuration.
//!
//! Resolution order for every setting:
//! 1. explicit override (CLI flag)
//! 2. environment variable
//! 3. built-in default

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "FINTRACK_API_BASE_URL";
pub const ENV_HOME: &str = "FINTRACK_HOME";
pub const ENV_TOKEN_STORE: &str = "FINTRACK_TOKEN_STORE";
pub const ENV_TIMEOUT_SECS: &str = "FINTRACK_TIMEOUT_SECS";
pub const ENV_DEBUG: &str = "FINTRACK_DEBUG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base URL `{url}`: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API base URL `{0}` must use http or https")]
    UnsupportedScheme(String),
    #[error("could not determine a data directory; set FINTRACK_HOME")]
    NoDataDir,
    #[error("unknown token store `{0}` (expected keyring, file or memory)")]
    UnknownTokenStore(String),
}

/// Where the bearer credential is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenBackend {
    #[default]
    Keyring,
    File,
    Memory,
}

impl TokenBackend {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownTokenStore(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub token_backend: TokenBackend,
    pub request_timeout: Duration,
    pub debug: bool,
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub token_backend: Option<TokenBackend>,
    pub debug: bool,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `FINTRACK_DEBUG` set to a truthy value.
pub fn debug_from_env() -> bool {
    env_non_empty(ENV_DEBUG).is_some_and(|v| is_truthy(&v))
}

/// Validates a base URL and strips trailing slashes so that endpoint paths
/// can be appended verbatim.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|source| ConfigError::InvalidBaseUrl {
        url: trimmed.to_string(),
        source,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fintrack"))
}

impl ClientConfig {
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let base_url = overrides
            .base_url
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env_non_empty(ENV_BASE_URL))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let data_dir = match overrides.data_dir {
            Some(dir) => dir,
            None => env_non_empty(ENV_HOME)
                .map(PathBuf::from)
                .or_else(default_data_dir)
                .ok_or(ConfigError::NoDataDir)?,
        };

        let token_backend = match overrides.token_backend {
            Some(backend) => backend,
            None => env_non_empty(ENV_TOKEN_STORE)
                .map(|v| TokenBackend::parse(&v))
                .transpose()?
                .unwrap_or_default(),
        };

        let request_timeout = env_non_empty(ENV_TIMEOUT_SECS)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let debug = overrides.debug || debug_from_env();

        Ok(Self {
            base_url,
            data_dir,
            token_backend,
            request_timeout,
            debug,
        })
    }

    /// Configuration for an isolated client: in-memory token, explicit paths.
    pub fn for_base_url(base_url: &str, data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            data_dir: data_dir.into(),
            token_backend: TokenBackend::Memory,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_trims_trailing_slashes() {
        assert_eq!(
            normalize_base_url(" https://api.example.com/// ").unwrap(),
            "https://api.example.com"
        );
        assert_eq!(
            normalize_base_url("http://127.0.0.1:8000/v1/").unwrap(),
            "http://127.0.0.1:8000/v1"
        );
    }

    #[test]
    fn normalize_base_url_rejects_garbage() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            normalize_base_url("ftp://files.example.com"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::resolve(ConfigOverrides {
            base_url: Some("https://finance.example.org/".to_string()),
            data_dir: Some(dir.path().to_path_buf()),
            token_backend: Some(TokenBackend::File),
            debug: true,
        })
        .unwrap();
        assert_eq!(config.base_url, "https://finance.example.org");
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.token_backend, TokenBackend::File);
        assert!(config.debug);
    }

    #[test]
    fn token_backend_parse() {
        assert_eq!(TokenBackend::parse("Keyring").unwrap(), TokenBackend::Keyring);
        assert_eq!(TokenBackend::parse("file").unwrap(), TokenBackend::File);
        assert!(TokenBackend::parse("cookie").is_err());
    }
}
