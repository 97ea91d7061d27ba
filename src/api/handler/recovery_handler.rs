use crate::api::model::recovery::{
    RequestCodeRequest, RequestCodeResponse, ResetPasswordRequest, ValidateCodeRequest,
    ValidateCodeResponse,
};
use crate::api::model::register::MessageResponse;
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::service::recovery_service;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

/// Creates a router for password recovery.
///
/// # Returns
///
/// A router with the following endpoints:
/// - POST /request-code - Request a recovery code by email
/// - POST /validate-code - Pre-check a code without consuming it
/// - POST /reset-password - Redeem the code and set a new password
pub fn recovery_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/request-code", post(request_code))
        .route("/validate-code", post(validate_code))
        .route("/reset-password", post(reset_password))
}

/// Request a password-recovery code.
///
/// Responds 200 with the same body whether or not the email is registered.
#[utoipa::path(
    post,
    path = "/request-code",
    tag = "Password Recovery",
    request_body = RequestCodeRequest,
    responses(
        (status = 200, description = "Acknowledged", body = RequestCodeResponse),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 429, description = "Too many recovery requests", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn request_code(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RequestCodeRequest>,
) -> Result<Response, AppError> {
    recovery_service::request_code(state, request).await
}

/// Check a recovery code without consuming it.
#[utoipa::path(
    post,
    path = "/validate-code",
    tag = "Password Recovery",
    request_body = ValidateCodeRequest,
    responses(
        (status = 200, description = "Code is valid", body = ValidateCodeResponse),
        (status = 401, description = "Invalid or expired code", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn validate_code(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateCodeRequest>,
) -> Result<Response, AppError> {
    recovery_service::validate_code(state, request).await
}

/// Redeem the recovery code, replace the password and revoke all sessions.
#[utoipa::path(
    post,
    path = "/reset-password",
    tag = "Password Recovery",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Weak password", body = ApiError),
        (status = 401, description = "Invalid or expired code", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    recovery_service::reset_password(state, request).await
}
