use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::types::{DashboardSummary, MonthlyTrend, NewTransaction, Transaction};
use crate::validation::{validate_new_transaction, ValidationError};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_TRANSACTION_LIMIT: u32 = 10;
pub const DEFAULT_TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FinanceError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// The list endpoint has shipped both shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum TransactionList {
    Bare(Vec<Transaction>),
    Envelope {
        #[serde(default)]
        transactions: Vec<Transaction>,
    },
}

impl From<TransactionList> for Vec<Transaction> {
    fn from(list: TransactionList) -> Self {
        match list {
            TransactionList::Bare(items) | TransactionList::Envelope { transactions: items } => {
                items
            }
        }
    }
}

#[derive(Deserialize)]
struct TrendEnvelope {
    #[serde(default)]
    trends: Vec<MonthlyTrend>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Typed access to the transaction and dashboard endpoints. Every call is
/// authenticated; a 401 surfaces as [`ApiError::Status`] for the caller to
/// act on.
#[derive(Clone)]
pub struct FinanceClient {
    api: Arc<ApiClient>,
}

impl FinanceClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn recent_transactions(&self, limit: u32) -> Result<Vec<Transaction>, FinanceError> {
        let limit = limit.max(1);
        let list: TransactionList = self
            .api
            .request_json(&format!("/api/transactions?limit={limit}"), RequestOptions::get())
            .await?;
        let items: Vec<Transaction> = list.into();
        debug!(limit, count = items.len(), "transactions fetched");
        Ok(items)
    }

    /// Validates locally, trims free-text fields, then creates the
    /// transaction. Nothing is sent when validation fails.
    pub async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction, FinanceError> {
        validate_new_transaction(new)?;
        let payload = NewTransaction {
            description: trimmed(&new.description),
            category: new.category.trim().to_string(),
            location: trimmed(&new.location),
            notes: trimmed(&new.notes),
            ..new.clone()
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let created: Transaction = self
            .api
            .request_json("/api/transactions/", RequestOptions::post_json(body))
            .await?;
        info!(id = created.id, "transaction created");
        Ok(created)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, FinanceError> {
        Ok(self
            .api
            .request_json("/api/dashboard/summary", RequestOptions::get())
            .await?)
    }

    pub async fn monthly_trends(&self, months: u32) -> Result<Vec<MonthlyTrend>, FinanceError> {
        let months = months.max(1);
        let envelope: TrendEnvelope = self
            .api
            .request_json(
                &format!("/api/dashboard/monthly-trends?months={months}"),
                RequestOptions::get(),
            )
            .await?;
        Ok(envelope.trends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_list_accepts_both_shapes() {
        let row = r#"{"id":1,"amount":12.5,"category":"Food","date":"2025-03-01","transaction_type":"expense"}"#;

        let bare: TransactionList = serde_json::from_str(&format!("[{row}]")).unwrap();
        let bare: Vec<Transaction> = bare.into();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].category, "Food");

        let wrapped: TransactionList =
            serde_json::from_str(&format!(r#"{{"transactions":[{row},{row}]}}"#)).unwrap();
        assert_eq!(Vec::<Transaction>::from(wrapped).len(), 2);

        let empty: TransactionList = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(Vec::<Transaction>::from(empty).is_empty());
    }

    #[test]
    fn trimmed_drops_blank_text() {
        assert_eq!(trimmed(&Some("  Lunch ".to_string())).as_deref(), Some("Lunch"));
        assert_eq!(trimmed(&Some("   ".to_string())), None);
        assert_eq!(trimmed(&None), None);
    }
}
