//! Command-line surface of the `fintrack` binary.

use crate::config::{ConfigOverrides, TokenBackend, ENV_BASE_URL, ENV_HOME};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(version)]
#[command(about = "FinanceTracker client: session, preferences and dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// API base URL
    #[arg(long, global = true, env = ENV_BASE_URL, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory holding local client state
    #[arg(long, global = true, env = ENV_HOME, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Where to keep the session token (keyring, file, memory)
    #[arg(long, global = true, value_name = "BACKEND", value_parser = parse_backend)]
    pub token_store: Option<TokenBackend>,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

fn parse_backend(value: &str) -> Result<TokenBackend, String> {
    TokenBackend::parse(value).map_err(|e| e.to_string())
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            data_dir: self.home.clone(),
            token_backend: self.token_store,
            debug: self.debug,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
        /// Defaults to the password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Show the signed-in user and preferences
    Whoami,
    /// Show or change the theme
    Theme {
        #[arg(value_name = "THEME")]
        value: Option<String>,
    },
    /// Show or change the display currency
    Currency {
        #[arg(value_name = "CODE")]
        value: Option<String>,
    },
    /// List recent transactions
    Transactions {
        #[arg(long, default_value_t = crate::finance::DEFAULT_TRANSACTION_LIMIT)]
        limit: u32,
    },
    /// Record a transaction
    AddTransaction {
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
        #[arg(long)]
        category: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        transaction_type: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        recurring: bool,
    },
    /// Show the dashboard summary
    Summary,
    /// Show income and expenses per month
    Trends {
        #[arg(long, default_value_t = crate::finance::DEFAULT_TREND_MONTHS)]
        months: u32,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init(cli.debug || crate::config::debug_from_env());

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(crate::app::dispatch(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "fintrack",
            "whoami",
            "--base-url",
            "https://api.example.com",
            "--token-store",
            "memory",
            "--debug",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(overrides.token_backend, Some(TokenBackend::Memory));
        assert!(overrides.debug);
        assert!(matches!(cli.command, Command::Whoami));
    }

    #[test]
    fn add_transaction_accepts_negative_amounts() {
        let cli = Cli::try_parse_from([
            "fintrack",
            "add-transaction",
            "--amount",
            "-12.5",
            "--category",
            "Food",
            "--type",
            "income",
        ])
        .unwrap();
        match cli.command {
            Command::AddTransaction {
                amount,
                transaction_type,
                ..
            } => {
                assert_eq!(amount, -12.5);
                assert_eq!(transaction_type, "income");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
