use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, FromRow)]
pub struct Users {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub account_status: AccountStatus,
    pub two_factor_enabled: bool,
    pub two_factor_method: TwoFactorMethod,
    // Present once TOTP setup has started; 2FA is only live when
    // two_factor_enabled is also true.
    pub totp_secret: Option<String>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    // Cumulative lockout counter. Only ever increments; drives the
    // escalating lockout duration.
    pub lockout_count: i32,
    pub last_failed_attempt: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "account_status")]
pub enum AccountStatus {
    // PENDING - User registered but has not yet verified their email. Cannot authenticate.
    #[sqlx(rename = "PENDING")]
    Pending,
    // ACTIVE - User account is active and can be used.
    #[sqlx(rename = "ACTIVE")]
    Active,
    // INACTIVE - User account is disabled or suspended and cannot be used.
    #[sqlx(rename = "INACTIVE")]
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "two_factor_method")]
pub enum TwoFactorMethod {
    #[sqlx(rename = "NONE")]
    None,
    // Time-based one-time passwords from an authenticator app.
    #[sqlx(rename = "TOTP")]
    Totp,
    // A short-lived code delivered to the account's mailbox at login.
    #[sqlx(rename = "EMAIL")]
    Email,
}
