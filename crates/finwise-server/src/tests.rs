//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Datelike, NaiveDate};
use finwise_core::db::Database;
use finwise_core::ml::forecast::RidgeForecaster;
use finwise_core::ml::store::ModelStore;
use finwise_core::models::{NewTransaction, Role, TxnKind};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    db: Database,
    // Dropped with the app, removing model artifacts
    models: TempDir,
}

fn setup() -> TestApp {
    let db = Database::in_memory().unwrap();
    let models = TempDir::new().unwrap();
    let config = ServerConfig::for_tests(models.path().to_path_buf());
    let app = create_router(db.clone(), config);
    TestApp { app, db, models }
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Register a user and return (user id, access token)
async fn register_and_login(app: &Router, username: &str) -> (i64, String) {
    let body = serde_json::json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "correct-horse-battery",
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/register", None, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = get_body_json(response).await;
    let id = user["id"].as_i64().unwrap();

    let body = serde_json::json!({
        "username": username,
        "password": "correct-horse-battery",
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = get_body_json(response).await;
    (id, tokens["access"].as_str().unwrap().to_string())
}

/// Month label ("YYYY-MM") `back` months before the current one
///
/// Forecast endpoints window on the real clock, so their seeds have to
/// be placed relative to it.
fn month_back(back: u32) -> String {
    let today = chrono::Utc::now().date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
    (first - chrono::Months::new(back)).format("%Y-%m").to_string()
}

fn seed_txn(db: &Database, user_id: i64, title: &str, amount: &str, kind: TxnKind, category: &str, date: &str) {
    db.create_transaction(
        user_id,
        &NewTransaction {
            title: title.to_string(),
            amount: amount.parse::<Decimal>().unwrap(),
            kind,
            category: category.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        },
    )
    .unwrap();
}

// ========== Auth ==========

#[tokio::test]
async fn test_requires_token() {
    let t = setup();

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/transactions", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_register_does_not_leak_password() {
    let t = setup();

    let body = serde_json::json!({
        "username": "alice",
        "email": "alice@example.com",
        "password": "correct-horse-battery",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/register", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["username"], "alice");
    assert_eq!(json["role"], "user");
    assert!(json.get("password").is_none());
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let t = setup();
    register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "username": "alice",
        "email": "other@example.com",
        "password": "correct-horse-battery",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/register", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let t = setup();

    let body = serde_json::json!({
        "username": "alice",
        "email": "alice@example.com",
        "password": "short",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/register", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let t = setup();
    register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "username": "alice",
        "password": "wrong-password-here",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid username or password");
}

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let t = setup();
    register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "username": "alice",
        "password": "correct-horse-battery",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();
    let tokens = get_body_json(response).await;
    let refresh = tokens["refresh"].as_str().unwrap();

    let body = serde_json::json!({ "refresh": refresh });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/login/refresh", None, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let access = json["access"].as_str().unwrap();

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/transactions", Some(access)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let t = setup();
    let (_, access) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({ "refresh": access });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/login/refresh", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ========== Transactions ==========

#[tokio::test]
async fn test_transaction_crud() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "title": "Grocery run",
        "amount": "120.50",
        "type": "expense",
        "category": "Groceries",
        "date": "2026-08-15",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/transactions", Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["amount"], "120.50");
    assert_eq!(created["type"], "expense");

    let response = t
        .app
        .clone()
        .oneshot(get_request(&format!("/api/transactions/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = serde_json::json!({ "amount": "99.99" });
    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/transactions/{}", id),
            Some(&token),
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = get_body_json(response).await;
    assert_eq!(updated["amount"], "99.99");
    assert_eq!(updated["title"], "Grocery run");

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/transactions/{}", id))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_transaction_rejects_nonpositive_amount() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "title": "Broken",
        "amount": "-5",
        "type": "expense",
        "category": "Misc",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/transactions", Some(&token), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["amount"], "Amount must be positive.");
}

#[tokio::test]
async fn test_transactions_are_owner_scoped() {
    let t = setup();
    let (alice_id, _) = register_and_login(&t.app, "alice").await;
    let (_, bob_token) = register_and_login(&t.app, "bob").await;

    seed_txn(&t.db, alice_id, "Rent", "900", TxnKind::Expense, "Housing", "2026-08-01");
    let alice_txn_id = t.db.list_transactions(Some(alice_id)).unwrap()[0].id;

    // Bob cannot see Alice's rows
    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/transactions", Some(&bob_token)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 0);

    let response = t
        .app
        .clone()
        .oneshot(get_request(
            &format!("/api/transactions/{}", alice_txn_id),
            Some(&bob_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_sees_all_transactions() {
    let t = setup();
    let (alice_id, _) = register_and_login(&t.app, "alice").await;
    let (admin_id, _) = register_and_login(&t.app, "root").await;
    t.db.update_user_role(admin_id, Role::Admin).unwrap();
    // Re-login so the token carries the admin role
    let body = serde_json::json!({ "username": "root", "password": "correct-horse-battery" });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();
    let admin_token = get_body_json(response).await["access"]
        .as_str()
        .unwrap()
        .to_string();

    seed_txn(&t.db, alice_id, "Rent", "900", TxnKind::Expense, "Housing", "2026-08-01");

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/transactions", Some(&admin_token)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["username"], "alice");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/me", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["id"].as_i64().unwrap(), alice_id);
    assert_eq!(json["username"], "alice");
    assert!(json.get("password_hash").is_none());
}

// ========== Users (admin only) ==========

#[tokio::test]
async fn test_admin_creates_user_with_role() {
    let t = setup();
    let (admin_id, _) = register_and_login(&t.app, "root").await;
    t.db.update_user_role(admin_id, Role::Admin).unwrap();
    let body = serde_json::json!({ "username": "root", "password": "correct-horse-battery" });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();
    let admin_token = get_body_json(response).await["access"]
        .as_str()
        .unwrap()
        .to_string();

    let body = serde_json::json!({
        "username": "carol",
        "email": "carol@example.com",
        "password": "correct-horse-battery",
        "role": "admin",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/users", Some(&admin_token), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["username"], "carol");
    assert_eq!(json["role"], "admin");
}

#[tokio::test]
async fn test_user_list_requires_admin() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/users", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = get_body_json(response).await;
    assert_eq!(
        json["error"],
        "You do not have permission to perform this action"
    );
}

// ========== Budgets and goals ==========

#[tokio::test]
async fn test_budget_rejects_inverted_dates() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "category": "Food & Beverage",
        "limit": "300",
        "start_date": "2026-08-31",
        "end_date": "2026-08-01",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/budgets", Some(&token), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_goal_reports_progress() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({
        "name": "Emergency fund",
        "target_amount": "1000",
        "saved_amount": "250",
        "deadline": "2027-01-01",
    });
    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", "/api/goals", Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["progress"].as_f64().unwrap(), 25.0);
}

// ========== Analytics ==========

#[tokio::test]
async fn test_monthly_spending_fills_empty_months() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    // Seed in the current month so the rows land inside the query window
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    seed_txn(&t.db, alice_id, "Salary", "3000", TxnKind::Income, "Income", &today);
    seed_txn(&t.db, alice_id, "Rent", "900", TxnKind::Expense, "Housing", &today);

    let response = t
        .app
        .clone()
        .oneshot(get_request(
            "/api/analytics/monthly-spending?months=6",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let rows = json["months"].as_array().unwrap();
    assert_eq!(rows.len(), 6);

    // Months without data come back zeroed
    assert_eq!(rows[0]["income"], "0");
    // Amounts serialize as decimal strings
    let last = &rows[5];
    assert_eq!(last["income"], "3000");
    assert_eq!(last["expense"], "900");
    assert!(last["month"].as_str().unwrap().ends_with("-01"));
}

#[tokio::test]
async fn test_monthly_spending_user_param_is_admin_only() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let response = t
        .app
        .clone()
        .oneshot(get_request(
            "/api/analytics/monthly-spending?user_id=999",
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_category_spending_sorted_descending() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    seed_txn(&t.db, alice_id, "Rent", "900", TxnKind::Expense, "Housing", "2026-08-01");
    seed_txn(&t.db, alice_id, "Groceries", "150", TxnKind::Expense, "Groceries", "2026-08-05");

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/analytics/category-spending", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let rows = json["categories"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["category"], "Housing");
    assert_eq!(rows[0]["total"], "900");
}

#[tokio::test]
async fn test_savings_vs_expense() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    seed_txn(&t.db, alice_id, "Salary", "3000", TxnKind::Income, "Income", "2026-08-01");
    seed_txn(&t.db, alice_id, "Rent", "900", TxnKind::Expense, "Housing", "2026-08-02");

    let response = t
        .app
        .clone()
        .oneshot(get_request(
            "/api/analytics/savings-vs-expense",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_income"], "3000");
    assert_eq!(json["total_expense"], "900");
    assert_eq!(json["savings"], "2100");
}

// ========== Categorization and forecasting ==========

#[tokio::test]
async fn test_categorize_rule_match() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({ "description": "Uber ride to airport" });
    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/ai/categorize-transaction",
            Some(&token),
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["category"], "Transport");
    assert_eq!(json["confidence"].as_f64().unwrap(), 0.95);
    // Candidates serialize as [label, probability] pairs
    assert_eq!(json["candidates"][0][0], "Transport");
}

#[tokio::test]
async fn test_categorize_without_rule_or_model() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let body = serde_json::json!({ "description": "mystery charge 1234" });
    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/ai/categorize-transaction",
            Some(&token),
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["category"].is_null());
    assert_eq!(json["confidence"].as_f64().unwrap(), 0.0);
    assert_eq!(json["candidates"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_predict_spending_without_history() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/ai/predict-spending", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No transaction history available");
}

#[tokio::test]
async fn test_predict_spending_heuristic_fallback() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    // No trained models on disk, so forecasts fall back to the 3-month mean
    for (back, amount) in [(2, "100"), (1, "200"), (0, "300")] {
        seed_txn(
            &t.db,
            alice_id,
            "Groceries",
            amount,
            TxnKind::Expense,
            "Groceries",
            &format!("{}-10", month_back(back)),
        );
    }

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/ai/predict-spending", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let predictions = json["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0]["category"], "Groceries");
    assert_eq!(predictions[0]["model_type"], "heuristic");
    assert!(predictions[0]["model_score"].is_null());
    assert_eq!(predictions[0]["predicted"].as_f64().unwrap(), 200.0);
    assert_eq!(json["last_month"], format!("{}-01", month_back(0)));
}

#[tokio::test]
async fn test_predict_spending_anchors_to_current_month() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    // Last spend was a month ago; the current month counts as a zero
    for (back, amount) in [(3, "100"), (2, "200"), (1, "300")] {
        seed_txn(
            &t.db,
            alice_id,
            "Groceries",
            amount,
            TxnKind::Expense,
            "Groceries",
            &format!("{}-10", month_back(back)),
        );
    }

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/ai/predict-spending", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    // Mean of the last 3 calendar months: (200 + 300 + 0) / 3
    let predictions = json["predictions"].as_array().unwrap();
    assert_eq!(predictions[0]["predicted"].as_f64().unwrap(), 166.67);
    assert_eq!(json["last_month"], format!("{}-01", month_back(0)));
    assert_eq!(json["last_totals"]["Groceries"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_predict_spending_skips_categories_outside_window() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    seed_txn(
        &t.db,
        alice_id,
        "Old gym plan",
        "80",
        TxnKind::Expense,
        "Fitness",
        &format!("{}-10", month_back(14)),
    );
    seed_txn(
        &t.db,
        alice_id,
        "Groceries",
        "250",
        TxnKind::Expense,
        "Groceries",
        &format!("{}-10", month_back(1)),
    );

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/ai/predict-spending", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let predictions = json["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0]["category"], "Groceries");
}

#[tokio::test]
async fn test_spending_trend_needs_three_months() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    seed_txn(
        &t.db,
        alice_id,
        "Rent",
        "900",
        TxnKind::Expense,
        "Housing",
        &format!("{}-01", month_back(0)),
    );

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/ai/spending-trend", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(
        json["error"],
        "Not enough data for trends. Add more transactions."
    );
}

#[tokio::test]
async fn test_spending_trend_labels_and_status() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    for back in [2, 1, 0] {
        seed_txn(
            &t.db,
            alice_id,
            "Rent",
            "900",
            TxnKind::Expense,
            "Housing",
            &format!("{}-01", month_back(back)),
        );
    }

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/ai/spending-trend", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;

    let trends = json["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 4);
    assert_eq!(trends[0]["month"], "M-2");
    assert_eq!(trends[3]["month"], "Next Month");
    assert_eq!(trends[3]["type"], "Predicted");

    // Flat history predicts flat spending
    let insights = json["insights"].as_array().unwrap();
    assert_eq!(insights[0]["status"], "stable");
    assert_eq!(insights[0]["predicted"].as_f64().unwrap(), 900.0);
}

// ========== Insights ==========

#[tokio::test]
async fn test_predict_monthly_without_models() {
    let t = setup();
    let (_, token) = register_and_login(&t.app, "alice").await;

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/insights/predict-monthly", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Prediction model not available for this user.");
}

/// A trained forecaster saved into the app's model directory
fn save_user_model(t: &TestApp, user_id: i64) {
    let history: Vec<f64> = (1..=12).map(|m| 100.0 * m as f64).collect();
    let model = RidgeForecaster::fit(&history, 3, true).unwrap();
    ModelStore::new(t.models.path())
        .save_user_insight_model(user_id, &model)
        .unwrap();
}

#[tokio::test]
async fn test_predict_monthly_counts_months_with_expenses() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    save_user_model(&t, alice_id);
    // A model exists, but only two recent months actually have expenses
    for back in [1, 0] {
        seed_txn(
            &t.db,
            alice_id,
            "Rent",
            "500",
            TxnKind::Expense,
            "Housing",
            &format!("{}-05", month_back(back)),
        );
    }

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/insights/predict-monthly", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(
        json["error"],
        "Not enough historical expense data (2 months) to predict."
    );
}

#[tokio::test]
async fn test_predict_monthly_uses_user_model() {
    let t = setup();
    let (alice_id, token) = register_and_login(&t.app, "alice").await;
    save_user_model(&t, alice_id);
    for back in [3, 2, 1, 0] {
        seed_txn(
            &t.db,
            alice_id,
            "Rent",
            "400",
            TxnKind::Expense,
            "Housing",
            &format!("{}-05", month_back(back)),
        );
    }

    let response = t
        .app
        .clone()
        .oneshot(get_request("/api/insights/predict-monthly", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["model_type"], "user");
    let expense = json["predicted_expense"].as_f64().unwrap();
    assert!(expense >= 0.0);
    // No income history: savings are just the negated expense
    assert_eq!(json["predicted_income"].as_f64().unwrap(), 0.0);
    assert_eq!(json["predicted_savings"].as_f64().unwrap(), -expense);
}
