//! Tests that need a live Postgres. They are ignored by default; run them
//! with a database available:
//!
//!   TEST_DATABASE_URL=postgres://postgres@localhost/gatehouse_test \
//!       cargo test -- --ignored
//!
//! Migrations run on start, and every lookup here uses an id that cannot
//! exist, so the tests hold on any migrated database regardless of content.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use gatehouse_server::config::Config;
use gatehouse_server::routes::create_routes;
use gatehouse_server::state::AppState;

async fn app() -> Router {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!().run(&pool).await.expect("run migrations");

    let config = Config {
        database_url: url,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        allowed_origins: String::new(),
    };
    create_routes(AppState { pool }, &config)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app().await.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn assert_unknown_id_yields_404(uri: &str, parameter: &str, detail: &str) {
    let (status, body) = get(uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
    assert_eq!(body["errors"][0]["source"]["parameter"], parameter);
    assert_eq!(body["errors"][0]["detail"], detail);
}

#[tokio::test]
#[ignore]
async fn test_unknown_ticket_id_yields_404() {
    let id = Uuid::new_v4();
    assert_unknown_id_yields_404(
        &format!("/v1/tickets/{id}"),
        "ticket_id",
        &format!("Ticket: {id} not found"),
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_event_id_yields_404() {
    let id = Uuid::new_v4();
    assert_unknown_id_yields_404(
        &format!("/v1/events/{id}/tickets"),
        "event_id",
        &format!("Event: {id} not found"),
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_event_identifier_yields_404() {
    assert_unknown_id_yields_404(
        "/v1/events/identifier/no-such-event/tickets",
        "event_identifier",
        "Event: no-such-event not found",
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_ticket_tag_id_yields_404() {
    let id = Uuid::new_v4();
    assert_unknown_id_yields_404(
        &format!("/v1/ticket-tags/{id}/tickets"),
        "ticket_tag_id",
        &format!("TicketTag: {id} not found"),
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_access_code_id_yields_404() {
    let id = Uuid::new_v4();
    assert_unknown_id_yields_404(
        &format!("/v1/access-codes/{id}/tickets"),
        "access_code_id",
        &format!("AccessCode: {id} not found"),
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_order_id_yields_404() {
    let id = Uuid::new_v4();
    assert_unknown_id_yields_404(
        &format!("/v1/orders/{id}/tickets"),
        "order_id",
        &format!("Order: {id} not found"),
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_order_identifier_yields_404() {
    assert_unknown_id_yields_404(
        "/v1/orders/identifier/no-such-order/tickets",
        "order_identifier",
        "Order: no-such-order not found",
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_attendee_id_yields_404() {
    let id = Uuid::new_v4();
    assert_unknown_id_yields_404(
        &format!("/v1/attendees/{id}/ticket"),
        "attendee_id",
        &format!("Attendee: {id} not found"),
    )
    .await;
}
