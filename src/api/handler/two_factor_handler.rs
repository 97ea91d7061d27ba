use crate::api::model::register::MessageResponse;
use crate::api::model::two_factor::{
    EmailSetupRequest, EmailVerifyRequest, TotpSetupRequest, TotpSetupResponse, TotpVerifyRequest,
};
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::service::two_factor_service;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

/// Creates a router for two-factor setup, nested under `/2fa`.
///
/// # Returns
///
/// A router with the following endpoints:
/// - POST /totp/setup - Provision a TOTP secret (disabled until verified)
/// - POST /totp/verify - Verify one code and enable TOTP
/// - POST /email/setup - Mail a challenge code for email 2FA
/// - POST /email/verify - Redeem the challenge and enable email 2FA
pub fn two_factor_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/totp/setup", post(totp_setup))
        .route("/totp/verify", post(totp_verify))
        .route("/email/setup", post(email_setup))
        .route("/email/verify", post(email_verify))
}

/// Provision a TOTP secret and return the otpauth URL and QR code.
///
/// 2FA stays off until one code is verified at `/2fa/totp/verify`.
#[utoipa::path(
    post,
    path = "/2fa/totp/setup",
    tag = "Two-Factor Authentication",
    request_body = TotpSetupRequest,
    responses(
        (status = 200, description = "Secret provisioned", body = TotpSetupResponse),
        (status = 404, description = "No account for this email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn totp_setup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TotpSetupRequest>,
) -> Result<Response, AppError> {
    two_factor_service::setup_totp(state, request).await
}

/// Verify a code against the provisioned secret and enable TOTP.
#[utoipa::path(
    post,
    path = "/2fa/totp/verify",
    tag = "Two-Factor Authentication",
    request_body = TotpVerifyRequest,
    responses(
        (status = 200, description = "TOTP enabled", body = MessageResponse),
        (status = 400, description = "Setup was never started", body = ApiError),
        (status = 401, description = "Invalid TOTP code", body = ApiError),
        (status = 404, description = "No account for this email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn totp_verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TotpVerifyRequest>,
) -> Result<Response, AppError> {
    two_factor_service::verify_totp(state, request).await
}

/// Mail a challenge code to start email-2FA setup.
#[utoipa::path(
    post,
    path = "/2fa/email/setup",
    tag = "Two-Factor Authentication",
    request_body = EmailSetupRequest,
    responses(
        (status = 200, description = "Challenge code sent", body = MessageResponse),
        (status = 404, description = "No account for this email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn email_setup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailSetupRequest>,
) -> Result<Response, AppError> {
    two_factor_service::setup_email(state, request).await
}

/// Redeem the challenge code and enable email 2FA.
#[utoipa::path(
    post,
    path = "/2fa/email/verify",
    tag = "Two-Factor Authentication",
    request_body = EmailVerifyRequest,
    responses(
        (status = 200, description = "Email 2FA enabled", body = MessageResponse),
        (status = 401, description = "Invalid or expired code", body = ApiError),
        (status = 404, description = "No account for this email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn email_verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailVerifyRequest>,
) -> Result<Response, AppError> {
    two_factor_service::verify_email(state, request).await
}
