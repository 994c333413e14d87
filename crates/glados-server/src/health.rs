use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
}

/// Health check handler
pub async fn health_handler() -> Json<Health> {
    Json(Health { status: "healthy" })
}
