use crate::api::model::session::{CloseOtherSessionsResponse, LogoutResponse};
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::middleware::auth::{require_auth, AuthContext};
use crate::service::session_service;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use std::sync::Arc;
use tracing::info;

/// Creates a router for the authenticated session endpoints. All routes are
/// behind the bearer-token middleware.
///
/// # Returns
///
/// A router with the following endpoints:
/// - POST /logout - Revoke the presenting session
/// - POST /close-other-sessions - Revoke every other session for the user
pub fn session_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/close-other-sessions", post(close_other_sessions))
        .route_layer(axum::middleware::from_fn_with_state(state, require_auth))
}

/// Revoke the presenting session. The token stays cryptographically valid
/// until expiry but the whitelist no longer accepts it.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Sessions",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Session revoked", body = LogoutResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Response, AppError> {
    session_service::revoke(&state.pg_pool, &ctx.token).await?;
    info!("User {} logged out", ctx.user_id);
    Ok((
        StatusCode::OK,
        Json(LogoutResponse {
            message: "Logged out.".to_string(),
        }),
    )
        .into_response())
}

/// Revoke every session for the user except the one making this request.
#[utoipa::path(
    post,
    path = "/close-other-sessions",
    tag = "Sessions",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Other sessions revoked", body = CloseOtherSessionsResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn close_other_sessions(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Response, AppError> {
    let revoked = session_service::revoke_all_except(&state.pg_pool, ctx.user_id, &ctx.token).await?;
    Ok((
        StatusCode::OK,
        Json(CloseOtherSessionsResponse {
            message: "Other sessions closed.".to_string(),
            revoked,
        }),
    )
        .into_response())
}
