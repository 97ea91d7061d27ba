use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{FromRow, Type};

/// A single short-lived, single-use code row. The same shape backs email
/// verification, password recovery and email-2FA login challenges.
#[derive(Debug, Clone, FromRow)]
pub struct OneTimeCode {
    pub id: i64,
    pub email: String,
    pub purpose: CodePurpose,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    // Monotonic false -> true. A used code never validates again.
    pub used: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[sqlx(type_name = "code_purpose")]
pub enum CodePurpose {
    // 6-digit code proving mailbox control after registration.
    #[sqlx(rename = "EMAIL_VERIFICATION")]
    EmailVerification,
    // Code sent by the forgot-password flow.
    #[sqlx(rename = "PASSWORD_RECOVERY")]
    PasswordRecovery,
    // Email-2FA challenge issued during login, and the one-off code used
    // to prove mailbox control when enabling the email method.
    #[sqlx(rename = "LOGIN_CHALLENGE")]
    LoginChallenge,
}
