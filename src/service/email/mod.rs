use tracing::info;

/// Send the 6-digit account verification code after registration.
///
/// # Arguments
///
/// * `to_email` - The recipient's email address.
/// * `name` - The recipient's display name.
/// * `code` - The verification code.
///
/// # Returns
///
/// * `Result<(), String>` - Returns Ok if the email is sent successfully, or an error if it fails.
pub async fn send_verification_email(
    to_email: &str,
    name: &str,
    code: &str,
) -> Result<(), String> {
    // In a real application, you would implement SMTP email sending here
    // using libraries like lettre or similar.
    // For now, we'll simulate sending by logging the email content

    let email_subject = "Verify your account";
    let email_body = format!(
        "Hello {},\n\nYour account verification code is: {}\n\nThis code will expire in 24 hours.\n\nIf you did not create an account, you can safely ignore this email.\n\nRegards,\nYour Application Team",
        name, code
    );

    // Log email details for demonstration
    info!("Sending verification email to: {}", to_email);
    info!("Subject: {}", email_subject);
    info!("Body: {}", email_body);

    Ok(())
}

/// Send a password recovery code.
///
/// # Arguments
///
/// * `to_email` - The recipient's email address.
/// * `code` - The recovery code.
///
/// # Returns
///
/// * `Result<(), String>` - Returns Ok if the email is sent successfully, or an error if it fails.
pub async fn send_recovery_code(to_email: &str, code: &str) -> Result<(), String> {
    let email_subject = "Password Recovery Code";
    let email_body = format!(
        "Hello,\n\nWe received a request to reset your password. Use the following code:\n\n{}\n\nThis code expires in 15 minutes, can only be used once, and should never be shared.\n\nIf you did not request this, you can safely ignore this email.\n\nRegards,\nYour Application Team",
        code
    );

    info!("Sending password recovery email to: {}", to_email);
    info!("Subject: {}", email_subject);
    info!("Body: {}", email_body);

    Ok(())
}

/// Send an email-2FA login challenge code.
///
/// # Arguments
///
/// * `to_email` - The recipient's email address.
/// * `code` - The login challenge code.
///
/// # Returns
///
/// * `Result<(), String>` - Returns Ok if the email is sent successfully, or an error if it fails.
pub async fn send_login_challenge_code(to_email: &str, code: &str) -> Result<(), String> {
    let email_subject = "Your login code";
    let email_body = format!(
        "Hello,\n\nYour login code is: {}\n\nThis code will expire in 10 minutes.\n\nIf you did not try to sign in, please secure your account immediately.\n\nRegards,\nYour Application Team",
        code
    );

    info!("Sending login challenge email to: {}", to_email);
    info!("Subject: {}", email_subject);
    info!("Body: {}", email_body);

    Ok(())
}

/// Send the post-verification welcome email. Best-effort; callers log and
/// ignore failures.
pub async fn send_welcome_email(to_email: &str, name: &str) -> Result<(), String> {
    let email_subject = "Welcome!";
    let email_body = format!(
        "Hello {},\n\nYour account is verified and ready to use.\n\nRegards,\nYour Application Team",
        name
    );

    info!("Sending welcome email to: {}", to_email);
    info!("Subject: {}", email_subject);
    info!("Body: {}", email_body);

    Ok(())
}
