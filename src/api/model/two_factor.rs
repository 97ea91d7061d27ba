use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotpSetupRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotpSetupResponse {
    pub message: String,
    /// Base32 shared secret, shown once for manual entry.
    #[schema(example = "JBSWY3DPEHPK3PXP")]
    pub secret: String,
    /// otpauth:// provisioning URI for authenticator apps.
    pub totp_url: String,
    /// QR rendering of the provisioning URI, base64 PNG.
    pub qr_code: String,
}

/// Confirms a freshly provisioned secret. 2FA is only enabled once this
/// succeeds, so a mistyped secret can never lock the account out.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotpVerifyRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,

    #[validate(length(min = 6, max = 8, message = "Code must be 6 to 8 digits"))]
    #[schema(example = "492039")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailSetupRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerifyRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ana@example.com")]
    pub email: String,

    #[validate(length(min = 1, max = 16, message = "Code cannot be empty"))]
    #[schema(example = "K7MB-Q2XD")]
    pub code: String,
}
