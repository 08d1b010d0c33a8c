use crate::error::{ApiError, ApiResult};
use crate::server::CopilotServer;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use database_layer::DatabaseError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Database clock, or the server clock on in-memory storage
    pub time: DateTime<Utc>,
}

/// Round-trips to the database so a broken connection shows up as a 500.
pub async fn health_check(State(server): State<CopilotServer>) -> ApiResult<Json<HealthResponse>> {
    let time = match server.database.as_ref() {
        Some(db) => db.now().await.map_err(unhealthy)?,
        None => Utc::now(),
    };

    Ok(Json(HealthResponse { status: "OK", time }))
}

/// Any database failure, including an unreachable server, is a 500 here.
fn unhealthy(error: DatabaseError) -> ApiError {
    ApiError::internal(format!("Health check failed: {}", error))
}
