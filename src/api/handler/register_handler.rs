use crate::api::model::register::{
    MessageResponse, RegisterRequest, RegisteredUserResponse, ResendCodeRequest,
    VerifyEmailRequest,
};
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::service::register_service;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

/// Creates a router for registration and email verification.
///
/// # Returns
///
/// A router with the following endpoints:
/// - POST /register - Create a pending account
/// - POST /verify-email - Redeem the emailed verification code
/// - POST /resend-code - Reissue the verification code
pub fn register_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/resend-code", post(resend_code))
}

/// Create a new account in `PENDING` state and email its verification code.
#[utoipa::path(
    post,
    path = "/register",
    tag = "Registration",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification pending", body = RegisteredUserResponse),
        (status = 400, description = "Weak password, bad name or duplicate email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let result = register_service::register(state, request).await;
    if let Err(ref e) = result {
        error!("Registration failed: {}", e.error_message);
    }
    result
}

/// Redeem the verification code and activate the account.
#[utoipa::path(
    post,
    path = "/verify-email",
    tag = "Registration",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Account activated", body = MessageResponse),
        (status = 401, description = "Invalid or expired code", body = ApiError),
        (status = 404, description = "No account or nothing pending", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Response, AppError> {
    register_service::verify_email(state, request).await
}

/// Reissue the verification code for a still-pending account.
#[utoipa::path(
    post,
    path = "/resend-code",
    tag = "Registration",
    request_body = ResendCodeRequest,
    responses(
        (status = 200, description = "New code sent", body = MessageResponse),
        (status = 404, description = "No account or nothing pending", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn resend_code(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResendCodeRequest>,
) -> Result<Response, AppError> {
    register_service::resend_code(state, request).await
}
