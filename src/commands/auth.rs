use super::{read_line, require_user};
use crate::currency::format_amount;
use crate::session::SessionError;
use crate::state::AppState;
use crate::types::{Credentials, RegistrationForm};
use anyhow::{Context, Result};

fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String> {
  match password {
    Some(p) => Ok(p),
    None => read_line(prompt).context("read password"),
  }
}

pub(crate) async fn login(state: &AppState, email: &str, password: Option<String>) -> Result<()> {
  let credentials = Credentials {
    email: email.to_string(),
    password: password_or_prompt(password, "Password: ")?,
  };

  let user = match state.session.login(&credentials).await {
    Ok(user) => user,
    Err(SessionError::Superseded) => {
      anyhow::bail!("Login was interrupted by another session change; try again.")
    }
    Err(e) => return Err(e.into()),
  };

  let preference = state.preferences.load(user.storage_id()).await;
  println!("Logged in as {} <{}>", display_name(&user.full_name, &user.email), user.email);
  println!("Theme: {}  Currency: {}", preference.theme, preference.currency);
  Ok(())
}

pub(crate) fn logout(state: &AppState) -> Result<()> {
  let was_authenticated = state.session.is_authenticated();
  state.logout();
  if was_authenticated {
    println!("Logged out.");
  } else {
    println!("No active session.");
  }
  Ok(())
}

pub(crate) async fn register(
  state: &AppState,
  full_name: String,
  email: String,
  password: Option<String>,
  confirm_password: Option<String>,
) -> Result<()> {
  let password = password_or_prompt(password, "Password: ")?;
  let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
  let form = RegistrationForm {
    full_name,
    email,
    password,
    confirm_password,
  };

  let user = state.session.register(&form).await?;
  println!("Account created for {}.", user.email);
  println!("Log in with `fintrack login --email {}`.", user.email);
  Ok(())
}

pub(crate) async fn whoami(state: &AppState) -> Result<()> {
  let user = require_user(state)?;
  let preference = state.active_preference().await;

  println!("{} <{}>", display_name(&user.full_name, &user.email), user.email);
  println!("id:       {}", user.storage_id());
  println!("theme:    {}", preference.theme);
  println!(
    "currency: {} (e.g. {})",
    preference.currency,
    format_amount(1234.56, &preference.currency)
  );
  if let Some(warning) = state.preferences.snapshot().warning {
    eprintln!("{warning}");
  }
  Ok(())
}

fn display_name<'a>(full_name: &'a str, email: &'a str) -> &'a str {
  if full_name.trim().is_empty() {
    email
  } else {
    full_name
  }
}
