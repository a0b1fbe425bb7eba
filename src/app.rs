use crate::cli::{Cli, Command};
use crate::commands::{self, NewTransactionArgs};
use crate::state::AppState;
use anyhow::{Context, Result};
use tracing::debug;

pub(crate) async fn dispatch(cli: Cli) -> Result<()> {
  let state = AppState::from_overrides(cli.overrides()).context("initialize client")?;

  let session = state.bootstrap().await;
  debug!(status = ?session.status, "startup session resolved");
  if let Some(message) = session.last_error.as_deref() {
    eprintln!("{message}");
  }

  match cli.command {
    Command::Login { email, password } => {
      commands::auth::login(&state, &email, password).await
    }
    Command::Logout => commands::auth::logout(&state),
    Command::Register {
      full_name,
      email,
      password,
      confirm_password,
    } => commands::auth::register(&state, full_name, email, password, confirm_password).await,
    Command::Whoami => commands::auth::whoami(&state).await,

    Command::Theme { value } => commands::settings::theme(&state, value.as_deref()).await,
    Command::Currency { value } => commands::settings::currency(&state, value.as_deref()).await,

    Command::Transactions { limit } => commands::finance::transactions(&state, limit).await,
    Command::AddTransaction {
      amount,
      category,
      date,
      transaction_type,
      description,
      location,
      notes,
      recurring,
    } => {
      commands::finance::add_transaction(
        &state,
        NewTransactionArgs {
          amount,
          category,
          date,
          transaction_type,
          description,
          location,
          notes,
          recurring,
        },
      )
      .await
    }
    Command::Summary => commands::finance::summary(&state).await,
    Command::Trends { months } => commands::finance::trends(&state, months).await,
  }
}
