//! Shared helpers for client integration tests.

#![allow(dead_code)]

use fintrack_client::config::ClientConfig;
use fintrack_client::state::AppState;
use fintrack_client::types::{Credentials, RegistrationForm};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "Secret123";

/// A mock API plus a client wired to it, with state under a temp dir.
pub struct Harness {
    pub server: MockServer,
    pub state: AppState,
    pub home: TempDir,
}

pub async fn harness() -> Harness {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    let config = ClientConfig::for_base_url(&server.uri(), home.path()).unwrap();
    let state = AppState::new(config).unwrap();
    Harness {
        server,
        state,
        home,
    }
}

pub fn user_json(public_id: &str) -> Value {
    json!({
        "id": 7,
        "public_id": public_id,
        "full_name": "Ada Lovelace",
        "email": EMAIL,
        "is_active": true
    })
}

pub fn credentials() -> Credentials {
    Credentials {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
    }
}

pub fn registration(email: &str, password: &str) -> RegistrationForm {
    RegistrationForm {
        full_name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
    }
}

/// Login returns `token`; `/auth/me` answers for that token with `public_id`.
pub async fn mount_login(server: &MockServer, token: &str, public_id: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": token, "token_type": "bearer"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(public_id)))
        .mount(server)
        .await;
}

pub async fn mount_settings(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
