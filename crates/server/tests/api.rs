use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, NewUser, Role};
use migration::MigratorTrait;

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .password_cost(4)
        .build()
        .await
        .unwrap();
    engine.seed_defaults().await.unwrap();
    for (username, role) in [
        ("admin", Role::Admin),
        ("alice", Role::User),
        ("bob", Role::User),
    ] {
        engine
            .create_user(NewUser {
                username: username.to_string(),
                password: format!("{username}-pw"),
                role,
                ..NewUser::default()
            })
            .await
            .unwrap();
    }
    server::app(engine)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{user}:{user}-pw"));
        builder = builder.header(header::AUTHORIZATION, format!("Basic {credentials}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn deposit(app: &Router, user: &str, amount_minor: i64) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/deposits",
        Some(user),
        Some(json!({ "amount_minor": amount_minor, "currency": "USD", "method": "instapay" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn decide(app: &Router, id: &str, decision: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        &format!("/admin/transactions/{id}/decision"),
        Some("admin"),
        Some(json!({ "decision": decision })),
    )
    .await
}

#[tokio::test]
async fn requests_need_valid_credentials() {
    let app = test_app().await;

    let (status, body) = call(&app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .uri("/me")
        .header(
            header::AUTHORIZATION,
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode("alice:wrong")
            ),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert_eq!(body["kyc_status"], "not_started");
}

#[tokio::test]
async fn admin_routes_are_admin_only() {
    let app = test_app().await;

    let (status, _) = call(&app, Method::GET, "/admin/stats", Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, "/admin/stats", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], 3);
    assert_eq!(body["pending_transactions"], 0);
}

#[tokio::test]
async fn deposit_approval_flow() {
    let app = test_app().await;
    let id = deposit(&app, "alice", 10_000).await;

    let (status, body) = call(&app, Method::GET, "/balances", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = decide(&app, &id, "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["transaction"]["status"], "approved");
    assert_eq!(body["balance"]["balance_minor"], 10_000);

    let (status, body) = decide(&app, &id, "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);

    let (status, _) = decide(&app, &id, "reject").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, Method::GET, "/balances", Some("alice"), None).await;
    assert_eq!(body[0]["currency"], "USD");
    assert_eq!(body[0]["balance_minor"], 10_000);
}

#[tokio::test]
async fn uncovered_withdrawals_are_unprocessable() {
    let app = test_app().await;
    let id = deposit(&app, "alice", 10_000).await;
    decide(&app, &id, "approve").await;

    let withdraw = |amount: i64| {
        json!({
            "amount_minor": amount,
            "currency": "USD",
            "method": "instapay",
            "destination": "alice@instapay"
        })
    };

    let (status, _) = call(&app, Method::POST, "/withdrawals", Some("alice"), Some(withdraw(20_000))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, first) = call(&app, Method::POST, "/withdrawals", Some("alice"), Some(withdraw(7_000))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, second) = call(&app, Method::POST, "/withdrawals", Some("alice"), Some(withdraw(5_000))).await;

    let (status, _) = decide(&app, first["id"].as_str().unwrap(), "approve").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = decide(&app, second["id"].as_str().unwrap(), "approve").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Insufficient balance"));

    let (_, body) = call(&app, Method::GET, "/balances", Some("alice"), None).await;
    assert_eq!(body[0]["balance_minor"], 3_000);
}

#[tokio::test]
async fn transactions_are_scoped_and_paginated() {
    let app = test_app().await;
    for amount in [1_000, 2_000, 3_000] {
        deposit(&app, "alice", amount).await;
    }
    let bob_tx = deposit(&app, "bob", 5_000).await;

    let (status, body) = call(&app, Method::GET, "/transactions?limit=2", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    let cursor = body["next_cursor"].as_str().unwrap().to_string();

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/transactions?limit=2&cursor={cursor}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert!(body["next_cursor"].is_null());

    let (status, _) = call(&app, Method::GET, "/transactions?cursor=@@@", Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::GET, &format!("/transactions/{bob_tx}"), Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, &format!("/transactions/{bob_tx}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(
        &app,
        Method::GET,
        "/admin/transactions?status=pending&user=bob",
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn transfers_move_money() {
    let app = test_app().await;
    let id = deposit(&app, "alice", 10_000).await;
    decide(&app, &id, "approve").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/transfers",
        Some("alice"),
        Some(json!({ "to": "bob", "amount_minor": 2_500, "currency": "USD" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outgoing"]["kind"], "transfer_out");
    assert_eq!(body["incoming"]["kind"], "transfer_in");
    assert_eq!(body["outgoing"]["reference"], body["incoming"]["reference"]);

    let (_, body) = call(&app, Method::GET, "/balances", Some("bob"), None).await;
    assert_eq!(body[0]["balance_minor"], 2_500);

    let (status, body) = call(&app, Method::GET, "/admin/users/alice/reconcile", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["consistent"], true);
    assert_eq!(body["entries"][0]["ledger_minor"], 7_500);
}

#[tokio::test]
async fn catalogue_endpoints() {
    let app = test_app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/fees/quote",
        Some("alice"),
        Some(json!({ "method": "paypal", "amount": "200", "direction": "deposit" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fee_minor"], 500);
    assert_eq!(body["total_minor"], 20_500);

    let (status, body) = call(
        &app,
        Method::GET,
        "/currencies/convert?amount_minor=10000&from=usd&to=EGP",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["converted_minor"], 308_500);
    assert_eq!(body["from"], "USD");

    let (_, body) = call(&app, Method::GET, "/currencies", Some("alice"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 10);

    let (_, body) = call(&app, Method::GET, "/payment-methods", Some("alice"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let new_currency = json!({
        "code": "CHF",
        "name": "Swiss Franc",
        "symbol": "Fr",
        "decimals": 2,
        "exchange_rate": "0.88"
    });
    let (status, _) = call(&app, Method::POST, "/admin/currencies", Some("alice"), Some(new_currency.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, Method::POST, "/admin/currencies", Some("admin"), Some(new_currency.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["exchange_rate"], "0.88");
    let (status, _) = call(&app, Method::POST, "/admin/currencies", Some("admin"), Some(new_currency)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/currencies/rates",
        Some("admin"),
        Some(json!({ "rates": [{ "code": "CHF", "exchange_rate": "0.9" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["exchange_rate"], "0.9");

    let (status, _) = call(&app, Method::DELETE, "/admin/currencies/CHF", Some("admin"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/admin/currencies/CHF", Some("admin"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn kyc_and_user_admin() {
    let app = test_app().await;

    let (status, body) = call(&app, Method::POST, "/kyc/submit", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kyc_status"], "pending");

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/users/alice/kyc",
        Some("admin"),
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kyc_status"], "approved");

    let (status, body) = call(
        &app,
        Method::PATCH,
        "/admin/users/bob",
        Some("admin"),
        Some(json!({ "status": "suspended" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "suspended");

    let (status, _) = call(&app, Method::GET, "/me", Some("bob"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/admin/users", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}
