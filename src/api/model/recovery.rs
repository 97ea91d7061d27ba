use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,
}

/// Always the same body whether or not the account exists
/// (anti-enumeration).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeResponse {
    pub message: String,
    #[schema(example = "ana@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodeRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,

    #[validate(length(min = 1, max = 16, message = "Code cannot be empty"))]
    #[schema(example = "K7MB-Q2XD")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodeResponse {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,

    #[validate(length(min = 1, max = 16, message = "Code cannot be empty"))]
    #[schema(example = "K7MB-Q2XD")]
    pub code: String,

    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must be at least 8 characters"
    ))]
    #[schema(example = "NewSecretPassword123!")]
    pub new_password: String,
}
