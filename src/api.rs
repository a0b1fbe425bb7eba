use crate::redact::redact_secrets;
use crate::state::TokenStore;
use crate::types::{Credentials, PreferencePatch, RegisterPayload, ServerSettings, User};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const CLIENT_USER_AGENT: &str = concat!("fintrack-client/", env!("CARGO_PKG_VERSION"));
const MAX_RAW_MESSAGE_CHARS: usize = 200;

fn status_message(status: &u16, message: &Option<String>) -> String {
  match message {
    Some(m) => m.clone(),
    None => format!("Request failed with status {status}"),
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Non-2xx response. `message` is the server-provided text, when any.
  #[error("{}", status_message(.status, .message))]
  Status { status: u16, message: Option<String> },
  #[error("network error: {0}")]
  Network(String),
  #[error("invalid response: {0}")]
  InvalidResponse(String),
}

impl ApiError {
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status() == Some(401)
  }

  fn network(err: &reqwest::Error) -> Self {
    Self::Network(redact_secrets(&err.to_string()).into_owned())
  }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
  Empty,
  Json(Value),
  Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
  pub method: Method,
  pub body: RequestBody,
  /// Attach the stored bearer token, if there is one.
  pub authenticated: bool,
  /// Token sent instead of the stored one.
  pub bearer: Option<String>,
}

impl RequestOptions {
  pub fn get() -> Self {
    Self {
      method: Method::GET,
      body: RequestBody::Empty,
      authenticated: true,
      bearer: None,
    }
  }

  pub fn post_json(body: Value) -> Self {
    Self {
      method: Method::POST,
      body: RequestBody::Json(body),
      authenticated: true,
      bearer: None,
    }
  }

  pub fn patch_json(body: Value) -> Self {
    Self {
      method: Method::PATCH,
      body: RequestBody::Json(body),
      authenticated: true,
      bearer: None,
    }
  }

  pub fn post_form(fields: Vec<(String, String)>) -> Self {
    Self {
      method: Method::POST,
      body: RequestBody::Form(fields),
      authenticated: true,
      bearer: None,
    }
  }

  pub fn anonymous(mut self) -> Self {
    self.authenticated = false;
    self
  }

  pub fn with_bearer(mut self, token: &str) -> Self {
    self.authenticated = true;
    self.bearer = Some(token.to_string());
    self
  }
}

fn encode_form(fields: &[(String, String)]) -> String {
  fields
    .iter()
    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&")
}

fn truncate_chars(value: &str, max: usize) -> String {
  match value.char_indices().nth(max) {
    Some((idx, _)) => format!("{}…", &value[..idx]),
    None => value.to_string(),
  }
}

/// Pulls a human-readable message out of an error body. JSON bodies are
/// searched for `detail`/`message`/`error` (including FastAPI's list of
/// validation errors); other bodies are returned trimmed and shortened.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
  let trimmed = body.trim();
  if trimmed.is_empty() {
    return None;
  }

  let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
    return Some(truncate_chars(
      &redact_secrets(trimmed),
      MAX_RAW_MESSAGE_CHARS,
    ));
  };

  for key in ["detail", "message", "error"] {
    match json.get(key) {
      Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
      Some(Value::Array(items)) => {
        let msgs: Vec<&str> = items
          .iter()
          .filter_map(|item| item.get("msg").and_then(Value::as_str))
          .collect();
        if !msgs.is_empty() {
          return Some(msgs.join("; "));
        }
      }
      _ => {}
    }
  }
  None
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

pub struct ApiClient {
  base_url: String,
  http: reqwest::Client,
  tokens: TokenStore,
}

impl ApiClient {
  pub fn new(base_url: &str, timeout: Duration, tokens: TokenStore) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::network(&e))?;
    Ok(Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      http,
      tokens,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn tokens(&self) -> &TokenStore {
    &self.tokens
  }

  fn url(&self, path: &str) -> String {
    if path.starts_with('/') {
      format!("{}{path}", self.base_url)
    } else {
      format!("{}/{path}", self.base_url)
    }
  }

  fn build_headers(&self, authenticated: bool, bearer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    if !authenticated {
      return headers;
    }
    let token = match bearer {
      Some(token) => Some(token.to_string()),
      None => self.tokens.get(),
    };
    if let Some(token) = token {
      match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
          value.set_sensitive(true);
          headers.insert(AUTHORIZATION, value);
        }
        Err(_) => warn!("stored token is not a valid header value; sending request without it"),
      }
    }
    headers
  }

  /// Sends one request. Non-2xx responses become [`ApiError::Status`].
  pub async fn request(
    &self,
    path: &str,
    options: RequestOptions,
  ) -> Result<reqwest::Response, ApiError> {
    let method = options.method.clone();
    let mut builder = self
      .http
      .request(options.method, self.url(path))
      .headers(self.build_headers(options.authenticated, options.bearer.as_deref()));

    builder = match options.body {
      RequestBody::Empty => builder,
      RequestBody::Json(body) => builder.json(&body),
      RequestBody::Form(fields) => builder
        .header(
          CONTENT_TYPE,
          HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
        .body(encode_form(&fields)),
    };

    let res = match builder.send().await {
      Ok(r) => r,
      Err(e) => {
        let err = ApiError::network(&e);
        warn!(%method, path, error = %err, "request failed");
        return Err(err);
      }
    };

    let status = res.status();
    debug!(%method, path, status = status.as_u16(), "request completed");
    if status.is_success() {
      return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    Err(ApiError::Status {
      status: status.as_u16(),
      message: extract_error_message(&body),
    })
  }

  pub async fn request_json<T: DeserializeOwned>(
    &self,
    path: &str,
    options: RequestOptions,
  ) -> Result<T, ApiError> {
    let res = self.request(path, options).await?;
    let text = res.text().await.map_err(|e| ApiError::network(&e))?;
    serde_json::from_str(&text).map_err(|e| {
      ApiError::InvalidResponse(format!("{path}: {}", redact_secrets(&e.to_string())))
    })
  }

  /// Exchanges credentials for a bearer token.
  pub async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
    let form = vec![
      ("username".to_string(), credentials.email.trim().to_string()),
      ("password".to_string(), credentials.password.clone()),
    ];
    let res: TokenResponse = self
      .request_json("/auth/login", RequestOptions::post_form(form).anonymous())
      .await?;
    let token = res.access_token.trim();
    if token.is_empty() {
      return Err(ApiError::InvalidResponse(
        "login response did not include an access token".to_string(),
      ));
    }
    Ok(token.to_string())
  }

  pub(crate) async fn register(&self, payload: &RegisterPayload<'_>) -> Result<User, ApiError> {
    let body = serde_json::to_value(payload)
      .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    self
      .request_json("/auth/register", RequestOptions::post_json(body).anonymous())
      .await
  }

  pub async fn current_user(&self) -> Result<User, ApiError> {
    self.request_json("/auth/me", RequestOptions::get()).await
  }

  /// Loads the profile for a token that has not been stored yet.
  pub async fn current_user_with(&self, token: &str) -> Result<User, ApiError> {
    self
      .request_json("/auth/me", RequestOptions::get().with_bearer(token))
      .await
  }

  pub async fn settings(&self) -> Result<ServerSettings, ApiError> {
    self.request_json("/api/settings", RequestOptions::get()).await
  }

  pub async fn update_settings(&self, patch: &PreferencePatch) -> Result<ServerSettings, ApiError> {
    let body =
      serde_json::to_value(patch).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    self
      .request_json("/api/settings", RequestOptions::patch_json(body))
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extract_error_message_reads_fastapi_detail() {
    assert_eq!(
      extract_error_message(r#"{"detail":"Incorrect email or password"}"#).as_deref(),
      Some("Incorrect email or password")
    );
    assert_eq!(
      extract_error_message(
        r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"}]}"#
      )
      .as_deref(),
      Some("value is not a valid email address")
    );
  }

  #[test]
  fn extract_error_message_handles_plain_and_empty_bodies() {
    assert_eq!(extract_error_message("  \n").as_deref(), None);
    assert_eq!(
      extract_error_message("Bad Gateway").as_deref(),
      Some("Bad Gateway")
    );
    assert_eq!(extract_error_message(r#"{"code": 7}"#), None);
  }

  #[test]
  fn status_error_display_keeps_status_when_no_message() {
    let err = ApiError::Status {
      status: 503,
      message: None,
    };
    assert_eq!(err.to_string(), "Request failed with status 503");
    let err = ApiError::Status {
      status: 400,
      message: Some("Email already registered".to_string()),
    };
    assert_eq!(err.to_string(), "Email already registered");
    assert_eq!(err.status(), Some(400));
  }

  #[test]
  fn encode_form_escapes_reserved_characters() {
    let body = encode_form(&[
      ("username".to_string(), "a+b@x.io".to_string()),
      ("password".to_string(), "p&ss word".to_string()),
    ]);
    assert_eq!(body, "username=a%2Bb%40x.io&password=p%26ss%20word");
  }

  #[test]
  fn truncate_chars_respects_char_boundaries() {
    assert_eq!(truncate_chars("ąęść", 2), "ąę…");
    assert_eq!(truncate_chars("ok", 5), "ok");
  }

  #[test]
  fn headers_omit_authorization_without_token() {
    let client = ApiClient::new(
      "http://localhost:8000/",
      Duration::from_secs(5),
      TokenStore::in_memory(),
    )
    .unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000");
    assert!(!client.build_headers(true, None).contains_key(AUTHORIZATION));

    client.tokens().set("tok");
    assert_eq!(
      client.build_headers(true, None).get(AUTHORIZATION).unwrap(),
      "Bearer tok"
    );
    assert!(!client.build_headers(false, None).contains_key(AUTHORIZATION));
  }

  #[test]
  fn explicit_bearer_wins_over_stored_token() {
    let client = ApiClient::new(
      "http://localhost:8000",
      Duration::from_secs(5),
      TokenStore::in_memory(),
    )
    .unwrap();
    client.tokens().set("stored");
    let options = RequestOptions::get().with_bearer("candidate");
    assert_eq!(
      client
        .build_headers(options.authenticated, options.bearer.as_deref())
        .get(AUTHORIZATION)
        .unwrap(),
      "Bearer candidate"
    );
    assert_eq!(client.tokens().get().as_deref(), Some("stored"));
  }

  #[test]
  fn headers_skip_tokens_that_are_not_header_safe() {
    let client = ApiClient::new(
      "http://localhost:8000",
      Duration::from_secs(5),
      TokenStore::in_memory(),
    )
    .unwrap();
    client.tokens().set("bad\ntoken");
    assert!(!client.build_headers(true, None).contains_key(AUTHORIZATION));
  }
}
