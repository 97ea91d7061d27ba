use crate::config::app_config::AppState;
use crate::error::error_model::{AppError, AuthTokenErrorCode, ErrorType};
use crate::service::auth_service::Claims;
use crate::service::session_service;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::error;

/// Context inserted into request extensions after successful auth.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    /// The raw bearer token, kept so logout and close-other-sessions can
    /// address the presenting session's whitelist row.
    pub token: String,
}

/// Middleware that enforces Bearer JWT authentication plus the session
/// whitelist.
///
/// # Behavior
/// 1. Extracts the `Authorization` header (`NO_TOKEN` when absent or
///    malformed).
/// 2. Verifies the HS256 signature, issuer and expiry (`TOKEN_EXPIRED` for
///    an expired signature, `INVALID_TOKEN` otherwise).
/// 3. Checks the token hash against the whitelist (`SESSION_REVOKED` when
///    missing): a signed, unexpired token is still dead once revoked.
/// 4. Bumps the session's `last_used_at` and inserts an [`AuthContext`]
///    into the request extensions for downstream handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token_error = |code: AuthTokenErrorCode, msg: &str| -> Response {
        AppError::new(ErrorType::AuthToken { code }, msg).into_response()
    };

    let auth_header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => match v.to_str() {
            Ok(s) => s,
            Err(_) => {
                return token_error(AuthTokenErrorCode::NoToken, "Invalid Authorization header")
            }
        },
        None => {
            return token_error(AuthTokenErrorCode::NoToken, "Missing Authorization header")
        }
    };
    // Owned copy so the header borrow on `req` ends before the request is
    // mutated below.
    let token = match auth_header_val.strip_prefix("Bearer ") {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            return token_error(
                AuthTokenErrorCode::NoToken,
                "Authorization header must be a Bearer token",
            )
        }
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[state.jwt_issuer.as_str()]);
    let token_data = match decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.jwt_secret.expose_secret().as_bytes()),
        &validation,
    ) {
        Ok(td) => td,
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            return token_error(AuthTokenErrorCode::TokenExpired, "Token has expired");
        }
        Err(_) => {
            return token_error(AuthTokenErrorCode::InvalidToken, "Invalid token");
        }
    };

    match session_service::is_valid(&state.pg_pool, &token).await {
        Ok(true) => {}
        Ok(false) => {
            return token_error(
                AuthTokenErrorCode::SessionRevoked,
                "This session has been revoked",
            );
        }
        Err(e) => {
            error!("Error checking session whitelist: {:?}", e.error_message);
            return AppError::internal().into_response();
        }
    }
    session_service::touch(&state.pg_pool, &token).await;

    req.extensions_mut().insert(AuthContext {
        user_id: token_data.claims.user_id,
        email: token_data.claims.sub,
        token,
    });
    next.run(req).await
}
