//! Registration and email verification.
//!
//! New accounts start in `PENDING` and cannot log in until the emailed
//! 6-digit code is redeemed. The user row and its verification code are
//! written in one transaction that only commits after the email dispatch
//! succeeds, so a mail failure leaves no orphaned half-registered account.

use crate::api::model::register::{
    MessageResponse, RegisterRequest, RegisteredUser, RegisteredUserResponse, ResendCodeRequest,
    VerifyEmailRequest,
};
use crate::config::app_config::AppState;
use crate::db::entity::code::CodePurpose;
use crate::db::entity::user::AccountStatus;
use crate::db::repo::{code_repository, users_repository};
use crate::error::error_model::{validate_request, AppError, ErrorType};
use crate::service::auth_service::normalize_email;
use crate::service::{code_service, email};
use crate::util::crypto_helper;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{error, info, warn};

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{M}][\p{L}\p{M} .'\-]*$").unwrap());

/// Passwords that clear the character-class checks but are still trivially
/// guessable.
const COMMON_PASSWORDS: [&str; 8] = [
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "qwerty123",
    "letmein123",
    "welcome123",
];

/// Creates a `PENDING` account and mails its verification code.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    state: Arc<AppState>,
    request: RegisterRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "RegisterRequest")?;

    let name = request.name.trim();
    if !NAME_REGEX.is_match(name) {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "Name may only contain letters, spaces, dots, apostrophes and hyphens.",
        ));
    }
    check_password_strength(&request.password)?;
    let email = normalize_email(&request.email);

    let password_hash = crypto_helper::hash_password(&request.password).map_err(|e| {
        error!("Error hashing password: {}", e);
        AppError::internal()
    })?;

    let mut tx = state.pg_pool.begin().await.map_err(|e| {
        error!("Error opening registration transaction: {:?}", e);
        AppError::internal()
    })?;
    let user = users_repository::create_pending_user(&mut tx, name, &email, &password_hash)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::new(
                ErrorType::BadRequest,
                "An account with this email already exists.",
            ),
            e => {
                error!("Error creating user: {:?}", e);
                AppError::internal()
            }
        })?;

    let code = code_service::generate_code(CodePurpose::EmailVerification);
    let expires_at = Utc::now() + code_service::VERIFICATION_CODE_TTL;
    code_repository::invalidate_unused(&mut tx, &email, CodePurpose::EmailVerification)
        .await
        .map_err(|e| {
            error!("Error invalidating prior verification codes: {:?}", e);
            AppError::internal()
        })?;
    code_repository::insert_code(
        &mut tx,
        &email,
        CodePurpose::EmailVerification,
        &code,
        expires_at,
    )
    .await
    .map_err(|e| {
        error!("Error storing verification code: {:?}", e);
        AppError::internal()
    })?;

    // Dispatch before commit: a mail failure rolls the whole registration
    // back so the address can be registered again.
    if let Err(e) = email::send_verification_email(&email, name, &code).await {
        error!("Error sending verification email to {}: {}", email, e);
        if let Err(e) = tx.rollback().await {
            error!("Error rolling back registration: {:?}", e);
        }
        return Err(AppError::new(
            ErrorType::InternalServerError,
            "Could not send the verification email. Please try again.",
        ));
    }
    tx.commit().await.map_err(|e| {
        error!("Error committing registration: {:?}", e);
        AppError::internal()
    })?;
    info!("Registered pending user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUserResponse {
            message: "Account created. Check your email for the verification code.".to_string(),
            requires_verification: true,
            user: RegisteredUser {
                id: user.id,
                name: user.name,
                email: user.email,
                status: "PENDING".to_string(),
            },
        }),
    )
        .into_response())
}

/// Redeems the verification code and activates the account. The code
/// consumption and the status flip share one transaction.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn verify_email(
    state: Arc<AppState>,
    request: VerifyEmailRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "VerifyEmailRequest")?;
    let email = normalize_email(&request.email);

    let user = users_repository::get_user_by_email(&state.pg_pool, &email)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::new(ErrorType::NotFound, "User not found."),
            e => {
                error!("Error fetching user by email: {:?}", e);
                AppError::internal()
            }
        })?;
    if user.account_status != AccountStatus::Pending {
        return Err(AppError::new(
            ErrorType::NotFound,
            "No pending verification for this account.",
        ));
    }

    let mut tx = state.pg_pool.begin().await.map_err(|e| {
        error!("Error opening verification transaction: {:?}", e);
        AppError::internal()
    })?;
    let code_row = code_repository::lock_valid(
        &mut tx,
        &email,
        CodePurpose::EmailVerification,
        &request.code,
    )
    .await
    .map_err(|e| {
        error!("Error locking verification code: {:?}", e);
        AppError::internal()
    })?
    .ok_or_else(|| AppError::new(ErrorType::InvalidOrExpiredCode, "Invalid or expired code."))?;
    code_repository::mark_used(&mut tx, code_row.id)
        .await
        .map_err(|e| {
            error!("Error consuming verification code: {:?}", e);
            AppError::internal()
        })?;
    users_repository::activate_user(&mut tx, user.id)
        .await
        .map_err(|e| {
            error!("Error activating user: {:?}", e);
            AppError::internal()
        })?;
    tx.commit().await.map_err(|e| {
        error!("Error committing verification: {:?}", e);
        AppError::internal()
    })?;
    info!("User {} verified and activated", user.id);

    // Welcome email is best-effort; activation already committed.
    let (to, name) = (email.clone(), user.name.clone());
    tokio::spawn(async move {
        if let Err(e) = email::send_welcome_email(&to, &name).await {
            warn!("Error sending welcome email to {}: {}", to, e);
        }
    });

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Email verified. Your account is now active.".to_string(),
        }),
    )
        .into_response())
}

/// Reissues the verification code for a still-pending account. The fresh
/// code invalidates any earlier unused one.
pub async fn resend_code(
    state: Arc<AppState>,
    request: ResendCodeRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "ResendCodeRequest")?;
    let email = normalize_email(&request.email);

    let user = users_repository::get_user_by_email(&state.pg_pool, &email)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::new(ErrorType::NotFound, "User not found."),
            e => {
                error!("Error fetching user by email: {:?}", e);
                AppError::internal()
            }
        })?;
    if user.account_status != AccountStatus::Pending {
        return Err(AppError::new(
            ErrorType::NotFound,
            "No pending verification for this account.",
        ));
    }

    let code = code_service::issue(
        &state.pg_pool,
        &email,
        CodePurpose::EmailVerification,
        code_service::VERIFICATION_CODE_TTL,
    )
    .await?;
    email::send_verification_email(&email, &user.name, &code)
        .await
        .map_err(|e| {
            error!("Error resending verification email to {}: {}", email, e);
            AppError::new(
                ErrorType::InternalServerError,
                "Could not send the verification email. Please try again.",
            )
        })?;
    info!("Verification code reissued for user {}", user.id);

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "A new verification code was sent to your email.".to_string(),
        }),
    )
        .into_response())
}

/// Enforces the password policy beyond the length check the request model
/// already runs: one uppercase, one lowercase, one digit, one special
/// character, and not on the common-password list.
pub fn check_password_strength(password: &str) -> Result<(), AppError> {
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "This password is too common. Choose a stronger one.",
        ));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace());
    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "Password must contain an uppercase letter, a lowercase letter, a digit and a special character.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(check_password_strength("Str0ng!Pass").is_ok());
    }

    #[test]
    fn missing_character_classes_are_rejected() {
        for weak in ["alllowercase1!", "ALLUPPERCASE1!", "NoDigitsHere!", "NoSpecial123"] {
            assert!(check_password_strength(weak).is_err(), "{weak} should fail");
        }
    }

    #[test]
    fn common_passwords_are_rejected_case_insensitively() {
        assert!(check_password_strength("Password123").is_err());
        assert!(check_password_strength("PASSWORD123").is_err());
    }

    #[test]
    fn name_regex_accepts_real_names_and_rejects_markup() {
        for ok in ["Ana", "Jean-Luc Picard", "O'Brien", "José Núñez", "A. B. Smith"] {
            assert!(NAME_REGEX.is_match(ok), "{ok} should match");
        }
        for bad in ["<script>", " leading", "semi;colon", "tab\tname", ""] {
            assert!(!NAME_REGEX.is_match(bad), "{bad:?} should not match");
        }
    }
}
