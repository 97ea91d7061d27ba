//! One-time code lifecycle shared by email verification, password recovery
//! and email-2FA login challenges.
//!
//! Issuing a code invalidates every prior unused code for the same
//! (email, purpose) pair inside one transaction, so at most one unused code
//! is ever valid per pair. Validation alone does not consume; the
//! redeeming flows (verify-email, reset-password, verify-login-code) lock
//! the row `FOR UPDATE` and mark it used in the same transaction as their
//! dependent mutation.

use crate::db::entity::code::CodePurpose;
use crate::db::repo::code_repository;
use crate::error::error_model::AppError;
use chrono::{Duration, Utc};
use nanoid::nanoid;
use rand::Rng;
use sqlx::PgPool;
use tracing::error;

/// Unambiguous alphabet for emailed codes: uppercase letters and digits
/// minus the visually confusable I, O, 0 and 1.
pub const CODE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// How long a registration verification code stays valid.
pub const VERIFICATION_CODE_TTL: Duration = Duration::hours(24);
/// How long a password-recovery code stays valid.
pub const RECOVERY_CODE_TTL: Duration = Duration::minutes(15);
/// How long an email-2FA login challenge stays valid.
pub const LOGIN_CHALLENGE_TTL: Duration = Duration::minutes(10);

/// Generates a code in the shape the purpose's emails use: 6 digits for
/// registration verification, `XXXX-XXXX` over the unambiguous alphabet
/// for recovery and login challenges.
pub fn generate_code(purpose: CodePurpose) -> String {
    match purpose {
        CodePurpose::EmailVerification => numeric_code(),
        CodePurpose::PasswordRecovery | CodePurpose::LoginChallenge => grouped_code(),
    }
}

/// Default TTL for the purpose.
pub fn ttl_for(purpose: CodePurpose) -> Duration {
    match purpose {
        CodePurpose::EmailVerification => VERIFICATION_CODE_TTL,
        CodePurpose::PasswordRecovery => RECOVERY_CODE_TTL,
        CodePurpose::LoginChallenge => LOGIN_CHALLENGE_TTL,
    }
}

fn numeric_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

fn grouped_code() -> String {
    let raw = nanoid!(8, &CODE_ALPHABET);
    format!("{}-{}", &raw[..4], &raw[4..])
}

/// Issues a fresh code for the (email, purpose) pair: invalidates all prior
/// unused codes, stores the new one with an absolute expiry, and returns
/// the plaintext for dispatch.
pub async fn issue(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    ttl: Duration,
) -> Result<String, AppError> {
    let code = generate_code(purpose);
    let expires_at = Utc::now() + ttl;

    let mut tx = pool.begin().await.map_err(|e| {
        error!("Error opening transaction to issue code: {:?}", e);
        AppError::internal()
    })?;
    code_repository::invalidate_unused(&mut tx, email, purpose)
        .await
        .map_err(|e| {
            error!("Error invalidating prior codes: {:?}", e);
            AppError::internal()
        })?;
    code_repository::insert_code(&mut tx, email, purpose, &code, expires_at)
        .await
        .map_err(|e| {
            error!("Error storing one-time code: {:?}", e);
            AppError::internal()
        })?;
    tx.commit().await.map_err(|e| {
        error!("Error committing issued code: {:?}", e);
        AppError::internal()
    })?;

    Ok(code)
}

/// Non-consuming validation. Wrong and expired codes are indistinguishable
/// to the caller.
pub async fn validate(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    code: &str,
) -> Result<bool, AppError> {
    let row = code_repository::find_valid(pool, email, purpose, code)
        .await
        .map_err(|e| {
            error!("Error validating one-time code: {:?}", e);
            AppError::internal()
        })?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code(CodePurpose::EmailVerification);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn recovery_codes_use_the_unambiguous_alphabet() {
        for _ in 0..50 {
            let code = generate_code(CodePurpose::PasswordRecovery);
            assert_eq!(code.len(), 9);
            assert_eq!(&code[4..5], "-");
            for c in code.chars().filter(|c| *c != '-') {
                assert!(CODE_ALPHABET.contains(&c), "unexpected char {c} in {code}");
            }
        }
    }

    #[test]
    fn alphabet_has_no_confusable_characters() {
        for confusable in ['I', 'O', '0', '1'] {
            assert!(!CODE_ALPHABET.contains(&confusable));
        }
    }

    #[test]
    fn ttls_follow_purpose() {
        assert_eq!(ttl_for(CodePurpose::EmailVerification), Duration::hours(24));
        assert_eq!(ttl_for(CodePurpose::PasswordRecovery), Duration::minutes(15));
        assert_eq!(ttl_for(CodePurpose::LoginChallenge), Duration::minutes(10));
    }
}
