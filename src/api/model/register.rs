use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    #[schema(example = "Ana")]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,

    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must be at least 8 characters"
    ))]
    #[schema(example = "SecretPassword123!")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUserResponse {
    pub message: String,
    pub requires_verification: bool,
    pub user: RegisteredUser,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: i64,
    #[schema(example = "Ana")]
    pub name: String,
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "PENDING")]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,

    #[validate(length(min = 6, max = 6, message = "Code must be 6 digits"))]
    #[schema(example = "480071")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendCodeRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,
}

/// Generic success envelope used wherever no richer payload exists.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}
