use crate::api::model::register::MessageResponse;
use crate::config::app_config::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// Liveness check. Verifies the database connection with a trivial query.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up", body = MessageResponse),
        (status = 503, description = "Database unreachable", body = MessageResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pg_pool)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "UP".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(MessageResponse {
                    message: "DOWN".to_string(),
                }),
            )
                .into_response()
        }
    }
}
