use crate::api::model::auth::{
    LoginRequest, TokenResponse, TotpLoginRequest, VerifyLoginCodeRequest,
};
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::service::{auth_service, session_service};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

/// Creates a router for the login endpoints.
///
/// # Returns
///
/// A router with the following endpoints:
/// - POST /login - Password login; may answer with a 2FA challenge
/// - POST /login-2fa - Second step for TOTP accounts
/// - POST /verify-login-code - Second step for email-2FA accounts
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/login-2fa", post(login_totp))
        .route("/verify-login-code", post(verify_login_code))
}

/// Password login.
///
/// Returns a bearer token for accounts without 2FA. Accounts with 2FA get a
/// challenge response instead; the flow continues at `/login-2fa` (TOTP) or
/// `/verify-login-code` (email).
#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued or 2FA challenge started", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 403, description = "Account locked, unverified or inactive", body = ApiError),
        (status = 404, description = "No account for this email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let client = session_service::client_info(&headers);
    let result = auth_service::login(state, request, client).await;
    if let Err(ref e) = result {
        error!("Login failed: {}", e.error_message);
    }
    result
}

/// Second login step for TOTP accounts.
#[utoipa::path(
    post,
    path = "/login-2fa",
    tag = "Authentication",
    request_body = TotpLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid TOTP code", body = ApiError),
        (status = 404, description = "No account for this email", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn login_totp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<TotpLoginRequest>,
) -> Result<Response, AppError> {
    let client = session_service::client_info(&headers);
    auth_service::login_totp(state, request, client).await
}

/// Second login step for email-2FA accounts: redeems the mailed challenge
/// code.
#[utoipa::path(
    post,
    path = "/verify-login-code",
    tag = "Authentication",
    request_body = VerifyLoginCodeRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid or expired code", body = ApiError),
        (status = 422, description = "Request validation failed", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn verify_login_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<VerifyLoginCodeRequest>,
) -> Result<Response, AppError> {
    let client = session_service::client_info(&headers);
    auth_service::verify_login_code(state, request, client).await
}
