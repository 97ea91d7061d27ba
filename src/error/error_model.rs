use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

// Application-level error carried back from services to the handler boundary.
#[derive(Debug)]
pub struct AppError {
    pub error_type: ErrorType,
    pub error_message: String,
}

/// Error taxonomy shared by all auth flows. Every request-level failure is
/// translated into one of these before it reaches the client; nothing
/// propagates unhandled.
#[derive(Debug, Display, derive_more::Error, Clone)]
pub enum ErrorType {
    #[display("Not found")]
    NotFound,
    #[display("Bad request")]
    BadRequest,
    #[display("Internal server error")]
    InternalServerError,
    #[display("Authentication error")]
    UnauthorizedError,
    #[display("Invalid credentials")]
    InvalidCredentials { attempts_remaining: i32 },
    #[display("Account locked")]
    Locked { minutes_remaining: i64 },
    #[display("Forbidden")]
    Forbidden,
    #[display("Email verification required")]
    VerificationRequired,
    #[display("Invalid or expired code")]
    InvalidOrExpiredCode,
    #[display("Authentication token error")]
    AuthToken { code: AuthTokenErrorCode },
    #[display("Too many requests")]
    TooManyRequests { retry_after_minutes: i64 },
    #[display("Request validation error")]
    RequestValidationError {
        validation_error: ValidationErrors,
        object: String,
    },
}

/// Machine-readable sub-code for bearer-token failures so the front-end can
/// distinguish a stale session from a malformed token.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthTokenErrorCode {
    #[display("NO_TOKEN")]
    NoToken,
    #[display("TOKEN_EXPIRED")]
    TokenExpired,
    #[display("INVALID_TOKEN")]
    InvalidToken,
    #[display("SESSION_REVOKED")]
    SessionRevoked,
}

impl AppError {
    // constructor.
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            error_message: message.into(),
        }
    }

    /// Generic 500 that never leaks internals to the client.
    pub fn internal() -> Self {
        Self::new(
            ErrorType::InternalServerError,
            "Something went wrong. Please try again later.",
        )
    }
}

/// Runs the derive-based field validation and folds failures into the
/// request-validation error variant.
pub fn validate_request<T: Validate>(request: &T, object: &str) -> Result<(), AppError> {
    request.validate().map_err(|e| {
        AppError::new(
            ErrorType::RequestValidationError {
                validation_error: e,
                object: object.to_string(),
            },
            "Validation error. Check the request body.",
        )
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "500")]
    pub status: u16,
    #[schema(example = "2024-01-01T12:00:00.000Z")]
    pub time: String,
    #[schema(example = "Internal server error")]
    pub message: String,
    #[serde(rename = "debugMessage")]
    #[schema(example = "Internal server error. Try after some time")]
    pub debug_message: Option<String>,
    /// Token failure sub-code, present only for 401 token errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Login attempts left before the account locks, present only on 401
    /// invalid-credential responses.
    #[serde(rename = "attemptsRemaining", skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<i32>,
    /// Minutes until the lockout window ends, present only on 403 locked
    /// responses.
    #[serde(rename = "minutesRemaining", skip_serializing_if = "Option::is_none")]
    pub minutes_remaining: Option<i64>,
    #[serde(rename = "subErrors")]
    pub sub_errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationError {
    #[schema(example = "Users")]
    pub object: String,
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "notAValidEmail")]
    pub rejected_value: String,
    #[schema(example = "Invalid email address")]
    pub message: String,
    #[schema(example = "email.invalid")]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_unwraps_in_test_assertions() {
        let result: Result<(), AppError> = Err(AppError::new(ErrorType::NotFound, "missing"));
        let err = result.unwrap_err();
        assert!(format!("{:?}", err).contains("NotFound"));
    }
}
