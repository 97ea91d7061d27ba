use crate::error::error_model::{ApiError, AppError, ErrorType, ValidationError};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use sqlx::types::chrono::Utc;
use tracing::info;

// New type of error handling.
impl IntoResponse for AppError {
    // implementation for the trait.
    fn into_response(self) -> Response {
        // Record error in current span
        let span = tracing::Span::current();
        span.record("error", true);
        span.record("error.message", self.error_message.as_str());
        span.record("error.type", self.error_type.to_string().as_str());

        let mut code = None;
        let mut attempts_remaining = None;
        let mut minutes_remaining = None;
        let mut sub_errors = vec![];

        let status = match self.error_type.clone() {
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::UnauthorizedError => StatusCode::UNAUTHORIZED,
            ErrorType::InvalidCredentials {
                attempts_remaining: remaining,
            } => {
                attempts_remaining = Some(remaining);
                StatusCode::UNAUTHORIZED
            }
            ErrorType::Locked {
                minutes_remaining: minutes,
            } => {
                minutes_remaining = Some(minutes);
                StatusCode::FORBIDDEN
            }
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::VerificationRequired => StatusCode::FORBIDDEN,
            ErrorType::InvalidOrExpiredCode => StatusCode::UNAUTHORIZED,
            ErrorType::AuthToken { code: token_code } => {
                code = Some(token_code.to_string());
                StatusCode::UNAUTHORIZED
            }
            ErrorType::TooManyRequests {
                retry_after_minutes,
            } => {
                minutes_remaining = Some(retry_after_minutes);
                StatusCode::TOO_MANY_REQUESTS
            }
            ErrorType::RequestValidationError {
                validation_error,
                object,
            } => {
                for (field, field_errors) in validation_error.field_errors() {
                    for field_error in field_errors {
                        info!("Validation error on field: {:?}", field_error);
                        sub_errors.push(ValidationError {
                            object: object.to_string(),
                            field: field.to_string(),
                            rejected_value: field_error
                                .params
                                .get("value")
                                .unwrap_or(&"".into())
                                .to_string(),
                            message: field_error
                                .message
                                .as_ref()
                                .unwrap_or(&"".into())
                                .to_string(),
                            code: field_error.code.to_string(),
                        })
                    }
                }
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };

        let api_error = ApiError {
            status: status.into(),
            time: Utc::now().to_rfc3339(),
            message: self.error_type.to_string(),
            debug_message: Some(self.error_message),
            code,
            attempts_remaining,
            minutes_remaining,
            sub_errors,
        };

        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_string(&api_error).unwrap_or("".to_string()),
            ))
            .unwrap_or(Response::new(axum::body::Body::empty()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::error_model::{AppError, AuthTokenErrorCode, ErrorType};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::new(ErrorType::NotFound, "no such account").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn locked_maps_to_403() {
        let response = AppError::new(
            ErrorType::Locked {
                minutes_remaining: 15,
            },
            "Account locked",
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn invalid_credentials_maps_to_401() {
        let response = AppError::new(
            ErrorType::InvalidCredentials {
                attempts_remaining: 2,
            },
            "Wrong password",
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn token_errors_map_to_401() {
        for code in [
            AuthTokenErrorCode::NoToken,
            AuthTokenErrorCode::TokenExpired,
            AuthTokenErrorCode::InvalidToken,
            AuthTokenErrorCode::SessionRevoked,
        ] {
            let response =
                AppError::new(ErrorType::AuthToken { code }, "token rejected").into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn rate_limit_maps_to_429() {
        let response = AppError::new(
            ErrorType::TooManyRequests {
                retry_after_minutes: 12,
            },
            "Too many code requests",
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn token_code_is_stable_wire_format() {
        assert_eq!(AuthTokenErrorCode::NoToken.to_string(), "NO_TOKEN");
        assert_eq!(AuthTokenErrorCode::TokenExpired.to_string(), "TOKEN_EXPIRED");
        assert_eq!(AuthTokenErrorCode::InvalidToken.to_string(), "INVALID_TOKEN");
        assert_eq!(
            AuthTokenErrorCode::SessionRevoked.to_string(),
            "SESSION_REVOKED"
        );
    }
}
