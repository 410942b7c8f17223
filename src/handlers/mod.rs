use axum::{response::IntoResponse, Json};
use serde::Serialize;

pub mod relationships;
pub mod tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthPayload {
        status: "ok",
        service: "gatehouse-api",
    })
}
