//! HTTP-level tests for the ledger API.
//!
//! Runs the router in-process against an in-memory SQLite ledger (and the
//! in-memory adapter where lock contention has to be staged).

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use ledger_hex::{LedgerService, inbound::HttpServer};
use ledger_repo::{MemoryLedger, SqliteLedger};
use ledger_types::{
    Account, AccountReader, CreateAccountParams, Currency, LedgerStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn seed(store: &impl LedgerStore, owner: &str, currency: Currency, balance: i64) -> Account {
    store
        .create_account(CreateAccountParams {
            owner: owner.to_string(),
            currency,
            balance,
        })
        .await
        .unwrap()
}

/// Sqlite-backed router with two funded USD accounts and one EUR account.
async fn funded_app() -> (Router, Account, Account, Account) {
    let ledger = SqliteLedger::in_memory().await.unwrap();
    let alice = seed(&ledger, "alice", Currency::USD, 1000).await;
    let bob = seed(&ledger, "bob", Currency::USD, 500).await;
    let euro = seed(&ledger, "carol", Currency::EUR, 0).await;
    let app = HttpServer::new(LedgerService::new(ledger)).router();
    (app, alice, bob, euro)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn transfer_body(from: &Account, to: &Account, amount: i64, currency: &str) -> Value {
    json!({
        "from_account_id": from.id,
        "to_account_id": to.id,
        "amount": amount,
        "currency": currency,
    })
}

#[tokio::test]
async fn test_health() {
    let (app, ..) = funded_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_get_account() {
    let (app, ..) = funded_app().await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/accounts",
        Some(json!({ "owner": "dave", "currency": "CAD" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["owner"], "dave");
    assert_eq!(created["balance"], 0);
    assert_eq!(created["currency"], "CAD");

    let uri = format!("/api/accounts/{}", created["id"]);
    let (status, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/accounts",
        Some(json!({ "owner": "dave", "currency": "CAD" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_get_account_errors() {
    let (app, ..) = funded_app().await;

    let (status, body) = send(&app, Method::GET, "/api/accounts/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["code"], 404);

    let (status, _) = send(&app, Method::GET, "/api/accounts/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_accounts_paging() {
    let (app, ..) = funded_app().await;

    let (status, body) = send(&app, Method::GET, "/api/accounts?page_id=1&page_size=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(&app, Method::GET, "/api/accounts?owner=bob&page_size=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["owner"], "bob");

    let (status, body) = send(&app, Method::GET, "/api/accounts?page_size=50", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/accounts?page_id=9223372036854775807&page_size=10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_transfer_flow() {
    let (app, alice, bob, _) = funded_app().await;

    let (status, result) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&alice, &bob, 150, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["transfer"]["amount"], 150);
    assert_eq!(result["from_entry"]["amount"], -150);
    assert_eq!(result["to_entry"]["amount"], 150);
    assert_eq!(result["from_account"]["balance"], 850);
    assert_eq!(result["to_account"]["balance"], 650);

    let uri = format!("/api/transfers/{}", result["transfer"]["id"]);
    let (status, transfer) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transfer["from_account_id"], alice.id.as_i64());

    let uri = format!("/api/accounts/{}/entries", bob.id);
    let (status, entries) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["amount"], 150);

    let (status, _) = send(&app, Method::GET, "/api/transfers/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transfer_rejections() {
    let (app, alice, bob, euro) = funded_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&bob, &alice, 501, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "insufficient_funds");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&alice, &euro, 10, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&alice, &bob, 0, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(json!({
            "from_account_id": alice.id,
            "to_account_id": 9999,
            "amount": 10,
            "currency": "USD",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    // Nothing moved
    let uri = format!("/api/accounts/{}", alice.id);
    let (_, account) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(account["balance"], 1000);
}

#[tokio::test]
async fn test_delete_account() {
    let (app, alice, bob, euro) = funded_app().await;

    send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&alice, &bob, 1, "USD")),
    )
    .await;

    let uri = format!("/api/accounts/{}", alice.id);
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let uri = format!("/api/accounts/{}", euro.id);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contended_transfer_is_retryable() {
    let ledger = MemoryLedger::new();
    let alice = seed(&ledger, "alice", Currency::USD, 100).await;
    let bob = seed(&ledger, "bob", Currency::USD, 0).await;
    let app = HttpServer::new(LedgerService::with_transfer_timeout(
        ledger.clone(),
        Duration::from_millis(50),
    ))
    .router();

    let mut blocker = ledger.begin().await.unwrap();
    blocker.get_account_for_update(alice.id).await.unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&alice, &bob, 10, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "transient");
    assert_eq!(body["retryable"], true);

    drop(blocker);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(transfer_body(&alice, &bob, 10, "USD")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
