pub(crate) mod auth;
pub(crate) mod finance;
pub(crate) mod settings;

pub(crate) use finance::NewTransactionArgs;

use crate::state::AppState;
use crate::types::User;
use anyhow::{bail, Result};
use std::io::{self, BufRead, IsTerminal, Write};

pub(crate) fn require_user(state: &AppState) -> Result<User> {
  match state.session.current_user() {
    Some(user) => Ok(user),
    None => bail!("Not logged in. Run `fintrack login --email <EMAIL>` first."),
  }
}

/// Reads one line from stdin, prompting only when attached to a terminal.
pub(crate) fn read_line(prompt: &str) -> Result<String> {
  let stdin = io::stdin();
  if stdin.is_terminal() {
    print!("{prompt}");
    io::stdout().flush()?;
  }
  let mut input = String::new();
  stdin.lock().read_line(&mut input)?;
  Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
