mod fixtures;

use chrono::NaiveDate;
use fintrack_client::finance::FinanceError;
use fintrack_client::types::{NewTransaction, TransactionType};
use fintrack_client::validation::ErrorCode;
use fixtures::harness;
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn row(id: i64, amount: f64, kind: &str) -> serde_json::Value {
    json!({
        "id": id,
        "amount": amount,
        "description": "Groceries",
        "category": "Food",
        "date": "2025-03-01",
        "transaction_type": kind,
        "location": null,
        "notes": null,
        "is_recurring": false
    })
}

fn lunch() -> NewTransaction {
    NewTransaction {
        amount: 12.5,
        description: Some("  Lunch  ".to_string()),
        category: " Food ".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        transaction_type: TransactionType::Expense,
        location: Some("   ".to_string()),
        notes: None,
        is_recurring: false,
    }
}

#[tokio::test]
async fn recent_transactions_reads_envelope() {
    let h = harness().await;
    h.state.tokens.set("tok-1");
    Mock::given(method("GET"))
        .and(path("/api/transactions"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [row(1, 40.0, "expense"), row(2, 1200.0, "income")],
            "total": 2
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let items = h.state.finance.recent_transactions(5).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1].transaction_type, TransactionType::Income);
    assert_eq!(items[0].description.as_deref(), Some("Groceries"));
}

#[tokio::test]
async fn recent_transactions_reads_bare_list() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(3, 9.0, "expense")])))
        .mount(&h.server)
        .await;

    let items = h.state.finance.recent_transactions(0).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 3);
}

#[tokio::test]
async fn create_transaction_trims_fields() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path("/api/transactions/"))
        .and(body_json(json!({
            "amount": 12.5,
            "description": "Lunch",
            "category": "Food",
            "date": "2025-03-01",
            "transaction_type": "expense",
            "is_recurring": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(row(11, 12.5, "expense")))
        .expect(1)
        .mount(&h.server)
        .await;

    let created = h.state.finance.create_transaction(&lunch()).await.unwrap();
    assert_eq!(created.id, 11);
}

#[tokio::test]
async fn invalid_transaction_is_not_sent() {
    let h = harness().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut tx = lunch();
    tx.amount = 0.0;
    let err = h.state.finance.create_transaction(&tx).await.unwrap_err();
    assert!(matches!(err, FinanceError::Validation(ref e) if e.code == ErrorCode::InvalidAmount));

    let mut tx = lunch();
    tx.category = "  ".to_string();
    let err = h.state.finance.create_transaction(&tx).await.unwrap_err();
    assert!(matches!(err, FinanceError::Validation(ref e) if e.code == ErrorCode::MissingField));
}

#[tokio::test]
async fn dashboard_summary_defaults_missing_numbers() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "monthly_summary": {"income": 3000.0, "month": 3, "year": 2025},
            "category_breakdown": [{"category": "Food", "amount": 250.5}]
        })))
        .mount(&h.server)
        .await;

    let summary = h.state.finance.dashboard_summary().await.unwrap();

    assert_eq!(summary.monthly_summary.income, 3000.0);
    assert_eq!(summary.monthly_summary.expenses, 0.0);
    assert_eq!(summary.overall_summary.total_transactions, 0);
    assert!(summary.recent_transactions.is_empty());
    assert_eq!(summary.category_breakdown[0].category, "Food");
}

#[tokio::test]
async fn monthly_trends_passes_month_count() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/monthly-trends"))
        .and(query_param("months", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "trends": [
                {"year": 2025, "month": 1, "income": 100.0, "expenses": 40.0, "balance": 60.0},
                {"year": 2025, "month": 2, "income": 80.0, "expenses": 90.0, "balance": -10.0}
            ]
        })))
        .mount(&h.server)
        .await;

    let trends = h.state.finance.monthly_trends(3).await.unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[1].balance, -10.0);
}

#[tokio::test]
async fn server_errors_keep_status() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/summary"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&h.server)
        .await;

    let err = h.state.finance.dashboard_summary().await.unwrap_err();
    let api = err.api().unwrap();
    assert_eq!(api.status(), Some(502));
    assert_eq!(err.to_string(), "Bad Gateway");
}
