mod app_state;
mod token_store;

pub use app_state::{AppState, StartupError};
pub use token_store::{TokenStore, KEYRING_SERVICE, KEYRING_USER_AUTH_TOKEN};
