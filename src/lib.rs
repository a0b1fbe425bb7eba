mod app;
pub mod api;
pub mod cli;
mod commands;
pub mod config;
pub mod currency;
pub mod finance;
pub mod logging;
pub mod preferences;
mod redact;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;
pub mod validation;

pub fn run() -> anyhow::Result<()> {
  cli::run()
}
