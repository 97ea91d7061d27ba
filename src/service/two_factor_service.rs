//! Two-factor setup and verification.
//!
//! TOTP secrets are provisioned in a disabled state: `setup` stores the
//! secret and returns the provisioning URI + QR, but 2FA only turns on once
//! the user verifies a code generated from that secret. The email method
//! follows the same shape with a mailed one-time code standing in for the
//! authenticator.

use crate::api::model::register::MessageResponse;
use crate::api::model::two_factor::{
    EmailSetupRequest, EmailVerifyRequest, TotpSetupRequest, TotpSetupResponse, TotpVerifyRequest,
};
use crate::config::app_config::AppState;
use crate::db::entity::code::CodePurpose;
use crate::db::repo::{code_repository, users_repository};
use crate::error::error_model::{validate_request, AppError, ErrorType};
use crate::service::auth_service::normalize_email;
use crate::service::{code_service, email};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use totp_rs::{Secret, TOTP};
use tracing::{error, info};

/// Clock-drift tolerance in 30-second steps on either side.
const TOTP_SKEW_STEPS: u8 = 1;
const TOTP_STEP_SECONDS: u64 = 30;
const TOTP_DIGITS: usize = 6;

/// Generates a fresh TOTP secret, stores it with 2FA still disabled, and
/// returns the shareable secret, provisioning URI and QR code.
pub async fn setup_totp(
    state: Arc<AppState>,
    request: TotpSetupRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "TotpSetupRequest")?;
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

    let secret_b32 = generate_totp_secret();
    let totp = build_totp(&secret_b32, &state.totp_issuer, &email)?;
    let totp_url = totp.get_url();
    let qr_code = totp.get_qr_base64().map_err(|e| {
        error!("Error rendering TOTP QR code: {}", e);
        AppError::internal()
    })?;

    users_repository::store_totp_secret(&state.pg_pool, user.id, &secret_b32)
        .await
        .map_err(|e| {
            error!("Error storing TOTP secret: {:?}", e);
            AppError::internal()
        })?;
    info!("TOTP secret provisioned for user {} (not yet enabled)", user.id);

    Ok((
        StatusCode::OK,
        Json(TotpSetupResponse {
            message: "TOTP secret generated. Verify a code to enable 2FA.".to_string(),
            secret: secret_b32,
            totp_url,
            qr_code,
        }),
    )
        .into_response())
}

/// Confirms the freshly provisioned secret and enables TOTP for the
/// account. A mistyped or lost secret never gets enabled.
pub async fn verify_totp(
    state: Arc<AppState>,
    request: TotpVerifyRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "TotpVerifyRequest")?;
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

    let secret = user.totp_secret.as_deref().ok_or_else(|| {
        AppError::new(
            ErrorType::BadRequest,
            "TOTP setup has not been started for this account.",
        )
    })?;

    if !validate_totp_code(secret, &request.code, &state.totp_issuer, &email)? {
        return Err(AppError::new(
            ErrorType::UnauthorizedError,
            "Invalid TOTP code.",
        ));
    }

    users_repository::enable_totp(&state.pg_pool, user.id)
        .await
        .map_err(|e| {
            error!("Error enabling TOTP: {:?}", e);
            AppError::internal()
        })?;
    info!("TOTP enabled for user {}", user.id);

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "TOTP verified and enabled.".to_string(),
        }),
    )
        .into_response())
}

/// Email-2FA setup: mails a short-lived challenge to prove mailbox control.
pub async fn setup_email(
    state: Arc<AppState>,
    request: EmailSetupRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "EmailSetupRequest")?;
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

    let code = code_service::issue(
        &state.pg_pool,
        &email,
        CodePurpose::LoginChallenge,
        code_service::LOGIN_CHALLENGE_TTL,
    )
    .await?;

    email::send_login_challenge_code(&email, &code)
        .await
        .map_err(|e| {
            error!("Error sending email 2FA setup code to {}: {}", email, e);
            AppError::internal()
        })?;
    info!("Email 2FA setup code sent for user {}", user.id);

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "A verification code was sent to your email.".to_string(),
        }),
    )
        .into_response())
}

/// Consumes the setup challenge and enables the email method, both inside
/// one transaction.
pub async fn verify_email(
    state: Arc<AppState>,
    request: EmailVerifyRequest,
) -> Result<Response, AppError> {
    validate_request(&request, "EmailVerifyRequest")?;
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

    let mut tx = state.pg_pool.begin().await.map_err(|e| {
        error!("Error opening transaction: {:?}", e);
        AppError::internal()
    })?;
    let code_row =
        code_repository::lock_valid(&mut tx, &email, CodePurpose::LoginChallenge, &request.code)
            .await
            .map_err(|e| {
                error!("Error locking email 2FA setup code: {:?}", e);
                AppError::internal()
            })?
            .ok_or_else(|| {
                AppError::new(ErrorType::InvalidOrExpiredCode, "Invalid or expired code.")
            })?;
    code_repository::mark_used(&mut tx, code_row.id)
        .await
        .map_err(|e| {
            error!("Error consuming email 2FA setup code: {:?}", e);
            AppError::internal()
        })?;
    users_repository::enable_email_two_factor(&mut tx, user.id)
        .await
        .map_err(|e| {
            error!("Error enabling email 2FA: {:?}", e);
            AppError::internal()
        })?;
    tx.commit().await.map_err(|e| {
        error!("Error committing email 2FA enablement: {:?}", e);
        AppError::internal()
    })?;
    info!("Email 2FA enabled for user {}", user.id);

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Email 2FA enabled.".to_string(),
        }),
    )
        .into_response())
}

/// Checks a submitted code against the stored secret with the standard
/// time-step algorithm and a ±1-step drift window.
pub fn validate_totp_code(
    secret_b32: &str,
    code: &str,
    issuer: &str,
    account: &str,
) -> Result<bool, AppError> {
    let totp = build_totp(secret_b32, issuer, account)?;
    totp.check_current(code).map_err(|e| {
        error!("System clock error during TOTP check: {:?}", e);
        AppError::internal()
    })
}

fn build_totp(secret_b32: &str, issuer: &str, account: &str) -> Result<TOTP, AppError> {
    let secret_bytes = Secret::Encoded(secret_b32.to_string())
        .to_bytes()
        .map_err(|e| {
            error!("Stored TOTP secret is not valid base32: {:?}", e);
            AppError::internal()
        })?;
    TOTP::new(
        totp_rs::Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW_STEPS,
        TOTP_STEP_SECONDS,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| {
        error!("Error building TOTP instance: {:?}", e);
        AppError::internal()
    })
}

/// Generates a 20-byte TOTP secret from a cryptographically secure RNG and
/// returns it base32-encoded.
fn generate_totp_secret() -> String {
    let mut rng = ChaCha20Rng::from_entropy();
    let mut secret = [0u8; 20];
    rng.fill_bytes(&mut secret);
    Secret::Raw(secret.to_vec()).to_encoded().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_base32_and_long_enough() {
        let secret = generate_totp_secret();
        let bytes = Secret::Encoded(secret.clone()).to_bytes().unwrap();
        assert_eq!(bytes.len(), 20);
        // Two draws should never collide.
        assert_ne!(secret, generate_totp_secret());
    }

    #[test]
    fn current_code_validates_and_wrong_code_does_not() {
        let secret = generate_totp_secret();
        let totp = build_totp(&secret, "auth-service", "ana@x.com").unwrap();
        let code = totp.generate_current().unwrap();

        assert!(validate_totp_code(&secret, &code, "auth-service", "ana@x.com").unwrap());
        assert!(!validate_totp_code(&secret, "000000", "auth-service", "ana@x.com").unwrap());
    }

    #[test]
    fn drift_of_one_step_is_tolerated() {
        let secret = generate_totp_secret();
        let totp = build_totp(&secret, "auth-service", "ana@x.com").unwrap();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // A code from the previous step still passes at `now`.
        let previous = totp.generate(now - TOTP_STEP_SECONDS);
        assert!(totp.check(&previous, now));
        // Two steps back falls outside the window.
        let stale = totp.generate(now - 2 * TOTP_STEP_SECONDS);
        assert!(!totp.check(&stale, now));
    }

    #[test]
    fn provisioning_url_names_issuer_and_account() {
        let secret = generate_totp_secret();
        let totp = build_totp(&secret, "auth-service", "ana@x.com").unwrap();
        let url = totp.get_url();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("auth-service"));
    }
}
