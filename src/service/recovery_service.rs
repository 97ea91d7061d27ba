//! Password recovery.
//!
//! The request endpoint answers with the same 200 body whether or not the
//! address is registered, so it cannot be used to enumerate accounts. The
//! injected rate limiter caps requests per email before any database work
//! happens, and its count moves for unknown addresses too.

use crate::api::model::recovery::{
    RequestCodeRequest, RequestCodeResponse, ResetPasswordRequest, ValidateCodeRequest,
    ValidateCodeResponse,
};
use crate::api::model::register::MessageResponse;
use crate::config::app_config::AppState;
use crate::db::entity::code::CodePurpose;
use crate::db::repo::{code_repository, session_repository, users_repository};
use crate::error::error_model::{validate_request, AppError, ErrorType};
use crate::service::auth_service::normalize_email;
use crate::service::rate_limit::{self, Decision};
use crate::service::register_service::check_password_strength;
use crate::service::{code_service, email};
use crate::util::crypto_helper;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Issues a recovery code if the account exists. Always returns the same
/// acknowledgement either way.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn request_code(
    state: Arc<AppState>,
    request: RequestCodeRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "RequestCodeRequest")?;
    let email = normalize_email(&request.email);

    if let Decision::Limited { retry_after } = state.rate_limiter.check(&email) {
        return Err(AppError::new(
            ErrorType::TooManyRequests {
                retry_after_minutes: rate_limit::retry_after_minutes(retry_after),
            },
            "Too many recovery requests. Try again later.",
        ));
    }

    let user = users_repository::find_user_by_email(&state.pg_pool, &email)
        .await
        .map_err(|e| {
            error!("Error looking up user for recovery: {:?}", e);
            AppError::internal()
        })?;
    if let Some(user) = user {
        let code = code_service::issue(
            &state.pg_pool,
            &email,
            CodePurpose::PasswordRecovery,
            code_service::RECOVERY_CODE_TTL,
        )
        .await?;
        // A mail failure here cannot change the response without leaking
        // that the account exists.
        if let Err(e) = email::send_recovery_code(&email, &code).await {
            error!("Error sending recovery code to {}: {}", email, e);
        } else {
            info!("Recovery code issued for user {}", user.id);
        }
    } else {
        warn!("Recovery requested for unknown email");
    }

    Ok((
        StatusCode::OK,
        Json(RequestCodeResponse {
            message: "If this email is registered, a recovery code has been sent.".to_string(),
            email,
        }),
    )
        .into_response())
}

/// Non-consuming pre-check so a client can validate a typed code before
/// collecting the new password. A wrong or expired code is a 401, same as
/// the reset itself.
pub async fn validate_code(
    state: Arc<AppState>,
    request: ValidateCodeRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "ValidateCodeRequest")?;
    let email = normalize_email(&request.email);

    let valid = code_service::validate(
        &state.pg_pool,
        &email,
        CodePurpose::PasswordRecovery,
        &request.code,
    )
    .await?;
    if !valid {
        return Err(AppError::new(
            ErrorType::InvalidOrExpiredCode,
            "Invalid or expired code.",
        ));
    }

    Ok((
        StatusCode::OK,
        Json(ValidateCodeResponse {
            valid: true,
            message: "Code is valid.".to_string(),
        }),
    )
        .into_response())
}

/// Consumes the recovery code, replaces the password and revokes every
/// session for the user, atomically.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn reset_password(
    state: Arc<AppState>,
    request: ResetPasswordRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "ResetPasswordRequest")?;
    check_password_strength(&request.new_password)?;
    let email = normalize_email(&request.email);

    // An unknown email gets the same error as a wrong code.
    let user = users_repository::find_user_by_email(&state.pg_pool, &email)
        .await
        .map_err(|e| {
            error!("Error looking up user for password reset: {:?}", e);
            AppError::internal()
        })?
        .ok_or_else(|| {
            AppError::new(ErrorType::InvalidOrExpiredCode, "Invalid or expired code.")
        })?;

    let password_hash = crypto_helper::hash_password(&request.new_password).map_err(|e| {
        error!("Error hashing new password: {}", e);
        AppError::internal()
    })?;

    let mut tx = state.pg_pool.begin().await.map_err(|e| {
        error!("Error opening reset transaction: {:?}", e);
        AppError::internal()
    })?;
    let code_row = code_repository::lock_valid(
        &mut tx,
        &email,
        CodePurpose::PasswordRecovery,
        &request.code,
    )
    .await
    .map_err(|e| {
        error!("Error locking recovery code: {:?}", e);
        AppError::internal()
    })?
    .ok_or_else(|| AppError::new(ErrorType::InvalidOrExpiredCode, "Invalid or expired code."))?;
    code_repository::mark_used(&mut tx, code_row.id)
        .await
        .map_err(|e| {
            error!("Error consuming recovery code: {:?}", e);
            AppError::internal()
        })?;
    users_repository::update_password(&mut tx, user.id, &password_hash)
        .await
        .map_err(|e| {
            error!("Error updating password: {:?}", e);
            AppError::internal()
        })?;
    session_repository::delete_all_for_user(&mut tx, user.id)
        .await
        .map_err(|e| {
            error!("Error revoking sessions after reset: {:?}", e);
            AppError::internal()
        })?;
    tx.commit().await.map_err(|e| {
        error!("Error committing password reset: {:?}", e);
        AppError::internal()
    })?;

    state.rate_limiter.clear(&email);
    info!("Password reset for user {}; all sessions revoked", user.id);

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password updated. Sign in with your new password.".to_string(),
        }),
    )
        .into_response())
}
