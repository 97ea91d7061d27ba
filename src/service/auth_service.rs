//! Login state machine: credential check, lockout policy, 2FA branching and
//! token issuance.
//!
//! Each step is a possible exit point, in a fixed order: input validation,
//! lookup, lockout gate, password check, account-state gate, 2FA branch,
//! token issuance. The session is whitelisted before the token is returned.

use crate::api::model::auth::{
    ChallengeResponse, LoginRequest, LoginUser, TokenResponse, TotpLoginRequest,
    VerifyLoginCodeRequest,
};
use crate::config::app_config::AppState;
use crate::db::entity::code::CodePurpose;
use crate::db::entity::user::{AccountStatus, TwoFactorMethod, Users};
use crate::db::repo::{code_repository, users_repository};
use crate::error::error_model::{validate_request, AppError, ErrorType};
use crate::service::session_service::ClientInfo;
use crate::service::{code_service, email, lockout, session_service, two_factor_service};
use crate::util::crypto_helper;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use nanoid::nanoid;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Claims carried in every issued access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account's email.
    pub sub: String,
    pub iss: String,
    /// Unique token identifier.
    pub jti: String,
    pub user_id: i64,
    /// Whether the account had 2FA enabled when the token was issued.
    pub two_factor: bool,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Lowercases and trims an email so lookups and code rows always agree on
/// the key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Authenticates a user based on the provided credentials.
///
/// Runs the full state machine: lockout gate (before the password is ever
/// touched), constant-time password verification with the progressive
/// lockout policy on mismatch, account-state gate, then either a 2FA
/// challenge or a whitelisted token.
#[tracing::instrument(skip(state, request, client), fields(service.operation = "login"))]
pub async fn login(
    state: Arc<AppState>,
    request: LoginRequest,
    client: ClientInfo,
) -> Result<Response, AppError> {
    validate_request(&request, "LoginRequest")?;

    let email = normalize_email(&request.email);
    let pg_pool = &state.pg_pool;

    let mut user = users_repository::get_user_by_email(pg_pool, &email)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::new(ErrorType::NotFound, "User not found."),
            e => {
                error!("Error fetching user by email: {:?}", e);
                AppError::internal()
            }
        })?;
    debug!("{}", users_repository::describe_account(&user));

    // Lockout gate. A live window rejects before the password is touched; a
    // lapsed one is cleared lazily and the attempt counter reset.
    match lockout::check_lock(user.locked_until, Utc::now()) {
        lockout::LockState::Locked { minutes_remaining } => {
            return Err(AppError::new(
                ErrorType::Locked { minutes_remaining },
                format!(
                    "Account locked. Try again in {} minute(s).",
                    minutes_remaining
                ),
            ));
        }
        lockout::LockState::Lapsed => {
            users_repository::clear_expired_lockout(pg_pool, user.id)
                .await
                .map_err(|e| {
                    error!("Error clearing lapsed lockout: {:?}", e);
                    AppError::internal()
                })?;
            user.locked_until = None;
            user.failed_login_attempts = 0;
        }
        lockout::LockState::NotLocked => {}
    }

    let password_matches =
        crypto_helper::verify_password(&request.password, &user.password_hash).map_err(|e| {
            error!("Password verification failed for user {}: {}", user.id, e);
            AppError::internal()
        })?;

    if !password_matches {
        return Err(handle_failed_attempt(&state, &user).await?);
    }

    // Successful password check wipes the per-window counter; the cumulative
    // lockout count stays. The reset must land before any token is issued.
    if user.failed_login_attempts > 0 {
        users_repository::reset_failed_login_attempts(pg_pool, user.id)
            .await
            .map_err(|e| {
                error!("Error resetting failed login attempts: {:?}", e);
                AppError::internal()
            })?;
    }

    account_gate(user.account_status)?;

    match challenge_method(&user) {
        Some(TwoFactorMethod::Email) => {
            let code = code_service::issue(
                pg_pool,
                &email,
                CodePurpose::LoginChallenge,
                code_service::LOGIN_CHALLENGE_TTL,
            )
            .await?;
            // Fire-and-forget dispatch: the code already exists server-side,
            // so a delivery failure is logged but must not fail the challenge.
            let to = email.clone();
            tokio::spawn(async move {
                if let Err(e) = email::send_login_challenge_code(&to, &code).await {
                    warn!("Failed to send login challenge to {}: {}", to, e);
                }
            });
            info!("Email 2FA challenge issued for user {}", user.id);
            Ok(challenge_response(&email, "EMAIL"))
        }
        Some(TwoFactorMethod::Totp) => {
            info!("TOTP challenge required for user {}", user.id);
            Ok(challenge_response(&email, "TOTP"))
        }
        _ => finish_login(&state, &user, &client).await,
    }
}

/// Applies the failed-attempt transition and returns the error the client
/// should see. The counter increment is a single atomic UPDATE so two
/// racing failures cannot both land on the threshold.
async fn handle_failed_attempt(state: &Arc<AppState>, user: &Users) -> Result<AppError, AppError> {
    let pg_pool = &state.pg_pool;
    let new_count = users_repository::increment_failed_attempts(pg_pool, user.id)
        .await
        .map_err(|e| {
            error!("Error incrementing failed attempts: {:?}", e);
            AppError::internal()
        })?;

    match lockout::on_failed_attempt(new_count, user.lockout_count) {
        lockout::FailedAttemptOutcome::Lock { minutes } => {
            let locked_until = Utc::now() + chrono::Duration::minutes(minutes);
            users_repository::apply_lockout(pg_pool, user.id, locked_until)
                .await
                .map_err(|e| {
                    error!("Error applying lockout: {:?}", e);
                    AppError::internal()
                })?;
            warn!(
                "User {} locked for {} minutes after {} failed attempts",
                user.id,
                minutes,
                new_count
            );
            Ok(AppError::new(
                ErrorType::Locked {
                    minutes_remaining: minutes,
                },
                format!(
                    "Account locked for {} minute(s) after {} failed attempts.",
                    minutes, new_count
                ),
            ))
        }
        lockout::FailedAttemptOutcome::AttemptsRemaining(remaining) => Ok(AppError::new(
            ErrorType::InvalidCredentials {
                attempts_remaining: remaining,
            },
            format!(
                "Invalid credentials. {} attempt(s) remaining before lockout.",
                remaining
            ),
        )),
    }
}

/// Second login step for TOTP accounts.
#[tracing::instrument(skip(state, request, client), fields(service.operation = "login_totp"))]
pub async fn login_totp(
    state: Arc<AppState>,
    request: TotpLoginRequest,
    client: ClientInfo,
) -> Result<Response, AppError> {
    validate_request(&request, "TotpLoginRequest")?;

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

    let secret = match (&user.totp_secret, user.two_factor_enabled, user.two_factor_method) {
        (Some(secret), true, TwoFactorMethod::Totp) => secret,
        _ => {
            return Err(AppError::new(
                ErrorType::UnauthorizedError,
                "TOTP is not enabled for this account.",
            ));
        }
    };

    if !two_factor_service::validate_totp_code(secret, &request.code, &state.totp_issuer, &email)? {
        return Err(AppError::new(
            ErrorType::UnauthorizedError,
            "Invalid TOTP code.",
        ));
    }

    // The account may have been suspended between the two login steps.
    account_gate(user.account_status)?;
    finish_login(&state, &user, &client).await
}

/// Second login step for email-2FA accounts: consumes the mailed challenge
/// code transactionally, then issues the token.
#[tracing::instrument(
    skip(state, request, client),
    fields(service.operation = "verify_login_code")
)]
pub async fn verify_login_code(
    state: Arc<AppState>,
    request: VerifyLoginCodeRequest,
    client: ClientInfo,
) -> Result<Response, AppError> {
    validate_request(&request, "VerifyLoginCodeRequest")?;

    let email = normalize_email(&request.email);
    let user = users_repository::find_user_by_email(&state.pg_pool, &email)
        .await
        .map_err(|e| {
            error!("Error fetching user by email: {:?}", e);
            AppError::internal()
        })?
        .filter(|u| u.two_factor_enabled && u.two_factor_method == TwoFactorMethod::Email)
        .ok_or_else(|| {
            AppError::new(ErrorType::NotFound, "User not found or email 2FA not enabled.")
        })?;
    account_gate(user.account_status)?;

    // Check-and-consume in one transaction so the same challenge can never
    // authenticate two concurrent requests.
    let mut tx = state.pg_pool.begin().await.map_err(|e| {
        error!("Error opening transaction: {:?}", e);
        AppError::internal()
    })?;
    let code_row =
        code_repository::lock_valid(&mut tx, &email, CodePurpose::LoginChallenge, &request.code)
            .await
            .map_err(|e| {
                error!("Error locking login challenge code: {:?}", e);
                AppError::internal()
            })?
            .ok_or_else(|| {
                AppError::new(ErrorType::InvalidOrExpiredCode, "Invalid or expired code.")
            })?;
    code_repository::mark_used(&mut tx, code_row.id)
        .await
        .map_err(|e| {
            error!("Error consuming login challenge code: {:?}", e);
            AppError::internal()
        })?;
    tx.commit().await.map_err(|e| {
        error!("Error committing challenge consumption: {:?}", e);
        AppError::internal()
    })?;

    finish_login(&state, &user, &client).await
}

/// Issues the signed token, whitelists the session, and builds the final
/// 200 response. Registration happens before the token leaves the server.
pub async fn finish_login(
    state: &Arc<AppState>,
    user: &Users,
    client: &ClientInfo,
) -> Result<Response, AppError> {
    let token = issue_token(state, user)?;
    session_service::register(&state.pg_pool, user.id, &token, client).await?;

    info!("Login successful for user {}", user.id);
    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            message: "Login successful.".to_string(),
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt_expiration as i64,
            user: LoginUser {
                id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
            },
        }),
    )
        .into_response())
}

/// Signs an HS256 access token for the user.
pub fn issue_token(state: &Arc<AppState>, user: &Users) -> Result<String, AppError> {
    let claims = claims_for(
        user,
        &state.jwt_issuer,
        state.jwt_expiration as i64,
        Utc::now(),
    );
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.expose_secret().as_bytes()),
    )
    .map_err(|e| {
        error!("Error signing access token: {:?}", e);
        AppError::internal()
    })
}

fn claims_for(user: &Users, issuer: &str, expiration_secs: i64, now: DateTime<Utc>) -> Claims {
    Claims {
        sub: user.email.clone(),
        iss: issuer.to_string(),
        jti: nanoid!(),
        user_id: user.id,
        two_factor: user.two_factor_enabled,
        iat: now.timestamp(),
        nbf: now.timestamp(),
        exp: now.timestamp() + expiration_secs,
    }
}

/// Account-state gate: only active accounts may authenticate.
fn account_gate(status: AccountStatus) -> Result<(), AppError> {
    match status {
        AccountStatus::Active => Ok(()),
        AccountStatus::Pending => Err(AppError::new(
            ErrorType::VerificationRequired,
            "Account pending email verification.",
        )),
        AccountStatus::Inactive => Err(AppError::new(
            ErrorType::Forbidden,
            "Account is inactive or suspended.",
        )),
    }
}

/// Which 2FA challenge, if any, stands between the password check and the
/// token.
fn challenge_method(user: &Users) -> Option<TwoFactorMethod> {
    if !user.two_factor_enabled {
        return None;
    }
    match user.two_factor_method {
        TwoFactorMethod::None => None,
        method => Some(method),
    }
}

fn challenge_response(email: &str, method: &str) -> Response {
    (
        StatusCode::OK,
        Json(ChallengeResponse {
            message: match method {
                "EMAIL" => "A login code was sent to your email.".to_string(),
                _ => "Two-factor code required.".to_string(),
            },
            requires_2fa: true,
            method: method.to_string(),
            email: email.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_user(status: AccountStatus, enabled: bool, method: TwoFactorMethod) -> Users {
        let now = Utc::now();
        Users {
            id: 7,
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            account_status: status,
            two_factor_enabled: enabled,
            two_factor_method: method,
            totp_secret: None,
            failed_login_attempts: 0,
            locked_until: None,
            lockout_count: 0,
            last_failed_attempt: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ana@X.Com "), "ana@x.com");
    }

    #[test]
    fn only_active_accounts_pass_the_gate() {
        assert!(account_gate(AccountStatus::Active).is_ok());
        assert!(matches!(
            account_gate(AccountStatus::Pending).unwrap_err().error_type,
            ErrorType::VerificationRequired
        ));
        assert!(matches!(
            account_gate(AccountStatus::Inactive).unwrap_err().error_type,
            ErrorType::Forbidden
        ));
    }

    #[test]
    fn challenge_method_requires_enabled_flag() {
        let disabled = sample_user(AccountStatus::Active, false, TwoFactorMethod::Totp);
        assert_eq!(challenge_method(&disabled), None);

        let totp = sample_user(AccountStatus::Active, true, TwoFactorMethod::Totp);
        assert_eq!(challenge_method(&totp), Some(TwoFactorMethod::Totp));

        let email = sample_user(AccountStatus::Active, true, TwoFactorMethod::Email);
        assert_eq!(challenge_method(&email), Some(TwoFactorMethod::Email));

        let none = sample_user(AccountStatus::Active, true, TwoFactorMethod::None);
        assert_eq!(challenge_method(&none), None);
    }

    #[test]
    fn claims_carry_subject_and_validity_window() {
        let user = sample_user(AccountStatus::Active, true, TwoFactorMethod::Totp);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let claims = claims_for(&user, "auth-service", 86400, now);

        assert_eq!(claims.sub, "ana@x.com");
        assert_eq!(claims.user_id, 7);
        assert!(claims.two_factor);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 86400);
        assert!(!claims.jti.is_empty());
    }
}
