use super::require_user;
use crate::currency::{format_amount, supported_currencies};
use crate::preferences::PreferenceError;
use crate::state::AppState;
use crate::types::{CurrencyCode, PreferencePatch, Theme};
use anyhow::{anyhow, Result};

async fn save(state: &AppState, user_id: &str, patch: PreferencePatch) -> Result<()> {
  match state.preferences.update(user_id, &patch).await {
    Ok(saved) => {
      println!("Theme: {}  Currency: {}", saved.theme, saved.currency);
      Ok(())
    }
    Err(err) => {
      let PreferenceError::Api(api) = &err;
      state.handle_api_error(api);
      Err(err.into())
    }
  }
}

pub(crate) async fn theme(state: &AppState, value: Option<&str>) -> Result<()> {
  let user = require_user(state)?;
  let Some(value) = value else {
    println!("{}", state.active_preference().await.theme);
    return Ok(());
  };

  let theme: Theme = value.parse().map_err(|e: String| anyhow!(e))?;
  save(state, user.storage_id(), PreferencePatch::theme(theme)).await
}

pub(crate) async fn currency(state: &AppState, value: Option<&str>) -> Result<()> {
  let user = require_user(state)?;
  let Some(value) = value else {
    let current = state.active_preference().await.currency;
    println!("{current} ({})", format_amount(1234.56, &current));
    let known: Vec<_> = supported_currencies().collect();
    println!("Formats available for: {}", known.join(", "));
    return Ok(());
  };

  let code = CurrencyCode::parse(value).map_err(|e| anyhow!(e))?;
  save(state, user.storage_id(), PreferencePatch::currency(code)).await
}
