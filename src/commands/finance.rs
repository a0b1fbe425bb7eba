use super::require_user;
use crate::currency::format_amount;
use crate::finance::FinanceError;
use crate::state::AppState;
use crate::types::{CurrencyCode, NewTransaction, Transaction, TransactionType};
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};

pub(crate) struct NewTransactionArgs {
  pub amount: f64,
  pub category: String,
  pub date: Option<String>,
  pub transaction_type: String,
  pub description: Option<String>,
  pub location: Option<String>,
  pub notes: Option<String>,
  pub recurring: bool,
}

impl NewTransactionArgs {
  fn into_new_transaction(self) -> Result<NewTransaction> {
    let date = match self.date.as_deref() {
      Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date `{raw}` (expected YYYY-MM-DD)"))?,
      None => Local::now().date_naive(),
    };
    let transaction_type: TransactionType = self
      .transaction_type
      .parse()
      .map_err(|e: String| anyhow!(e))?;
    Ok(NewTransaction {
      amount: self.amount,
      description: self.description,
      category: self.category,
      date,
      transaction_type,
      location: self.location,
      notes: self.notes,
      is_recurring: self.recurring,
    })
  }
}

fn observe(state: &AppState, err: FinanceError) -> anyhow::Error {
  if let Some(api) = err.api() {
    state.handle_api_error(api);
  }
  err.into()
}

async fn display_currency(state: &AppState) -> CurrencyCode {
  state.active_preference().await.currency
}

fn print_transaction(tx: &Transaction, currency: &CurrencyCode) {
  let signed = match tx.transaction_type {
    TransactionType::Income => tx.amount.abs(),
    TransactionType::Expense => -tx.amount.abs(),
  };
  let description = tx.description.as_deref().unwrap_or("");
  println!(
    "{:>6}  {:<10}  {:>16}  {:<16}  {}",
    tx.id,
    tx.date,
    format_amount(signed, currency),
    tx.category,
    description
  );
}

pub(crate) async fn transactions(state: &AppState, limit: u32) -> Result<()> {
  require_user(state)?;
  let items = state
    .finance
    .recent_transactions(limit)
    .await
    .map_err(|e| observe(state, e))?;
  if items.is_empty() {
    println!("No transactions yet.");
    return Ok(());
  }
  let currency = display_currency(state).await;
  for tx in &items {
    print_transaction(tx, &currency);
  }
  Ok(())
}

pub(crate) async fn add_transaction(state: &AppState, args: NewTransactionArgs) -> Result<()> {
  require_user(state)?;
  let new = args.into_new_transaction()?;
  let created = state
    .finance
    .create_transaction(&new)
    .await
    .map_err(|e| observe(state, e))?;
  let currency = display_currency(state).await;
  println!("Created transaction #{}", created.id);
  print_transaction(&created, &currency);
  Ok(())
}

pub(crate) async fn summary(state: &AppState) -> Result<()> {
  require_user(state)?;
  let summary = state
    .finance
    .dashboard_summary()
    .await
    .map_err(|e| observe(state, e))?;
  let currency = display_currency(state).await;
  let month = &summary.monthly_summary;
  let overall = &summary.overall_summary;

  println!("This month ({:04}-{:02})", month.year, month.month);
  println!("  income:   {}", format_amount(month.income, &currency));
  println!("  expenses: {}", format_amount(month.expenses, &currency));
  println!("  balance:  {}", format_amount(month.balance, &currency));
  println!("All time ({} transactions)", overall.total_transactions);
  println!("  income:   {}", format_amount(overall.total_income, &currency));
  println!("  expenses: {}", format_amount(overall.total_expenses, &currency));

  if !summary.category_breakdown.is_empty() {
    println!("Spending by category");
    for entry in &summary.category_breakdown {
      println!("  {:<16} {}", entry.category, format_amount(entry.amount, &currency));
    }
  }
  if !summary.recent_transactions.is_empty() {
    println!("Recent");
    for tx in &summary.recent_transactions {
      print_transaction(tx, &currency);
    }
  }
  Ok(())
}

pub(crate) async fn trends(state: &AppState, months: u32) -> Result<()> {
  require_user(state)?;
  let trends = state
    .finance
    .monthly_trends(months)
    .await
    .map_err(|e| observe(state, e))?;
  let currency = display_currency(state).await;
  if trends.is_empty() {
    println!("No data for the last {months} months.");
    return Ok(());
  }
  for t in &trends {
    println!(
      "{:04}-{:02}  income {:>14}  expenses {:>14}  balance {:>14}",
      t.year,
      t.month,
      format_amount(t.income, &currency),
      format_amount(t.expenses, &currency),
      format_amount(t.balance, &currency)
    );
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(date: Option<&str>, kind: &str) -> NewTransactionArgs {
    NewTransactionArgs {
      amount: 9.99,
      category: "Books".to_string(),
      date: date.map(str::to_string),
      transaction_type: kind.to_string(),
      description: None,
      location: None,
      notes: None,
      recurring: false,
    }
  }

  #[test]
  fn parses_date_and_type() {
    let tx = args(Some("2025-02-28"), "Income").into_new_transaction().unwrap();
    assert_eq!(tx.date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    assert_eq!(tx.transaction_type, TransactionType::Income);
  }

  #[test]
  fn rejects_bad_date_and_type() {
    assert!(args(Some("28/02/2025"), "expense").into_new_transaction().is_err());
    assert!(args(None, "transfer").into_new_transaction().is_err());
  }
}
