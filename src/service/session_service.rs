//! Server-side session whitelist.
//!
//! Signed tokens alone cannot be revoked before their natural expiry; the
//! whitelist makes revocation immediate at the cost of one store lookup per
//! authenticated request. Only a SHA-256 hash of each issued token is kept.

use crate::db::repo::session_repository;
use crate::error::error_model::AppError;
use crate::util::crypto_helper;
use axum::http::HeaderMap;
use sqlx::PgPool;
use tracing::{error, info};

/// Request metadata stored alongside each whitelisted session.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub device: String,
    pub user_agent: String,
}

/// Builds the session metadata from request headers. The originating IP is
/// taken from `x-forwarded-for` (first hop) since the service runs behind a
/// proxy, falling back to `x-real-ip`.
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());
    let device = device_from_user_agent(&user_agent).to_string();
    ClientInfo {
        ip,
        device,
        user_agent,
    }
}

/// Coarse device descriptor for the sessions list.
pub fn device_from_user_agent(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("mobile") {
        "Mobile"
    } else if ua.contains("tablet") {
        "Tablet"
    } else if ua.contains("windows") {
        "Windows PC"
    } else if ua.contains("mac") {
        "Mac"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Browser"
    }
}

/// Whitelists a freshly issued token. Must complete before the token is
/// handed to the client; a registered session is committed once this write
/// succeeds, even if the client disconnects right after.
pub async fn register(
    pool: &PgPool,
    user_id: i64,
    raw_token: &str,
    client: &ClientInfo,
) -> Result<(), AppError> {
    let token_hash = crypto_helper::hash_token(raw_token);
    session_repository::insert_session(
        pool,
        user_id,
        &token_hash,
        &client.device,
        &client.ip,
        &client.user_agent,
    )
    .await
    .map_err(|e| {
        error!("Error registering session for user {}: {:?}", user_id, e);
        AppError::internal()
    })?;
    info!("Session registered for user {}", user_id);
    Ok(())
}

/// Checks whether the presented token is still whitelisted.
pub async fn is_valid(pool: &PgPool, raw_token: &str) -> Result<bool, AppError> {
    let token_hash = crypto_helper::hash_token(raw_token);
    session_repository::session_exists(pool, &token_hash)
        .await
        .map_err(|e| {
            error!("Error checking session whitelist: {:?}", e);
            AppError::internal()
        })
}

/// Records activity on the session. Best-effort: failures are logged and
/// swallowed so a metadata update can never fail an authenticated request.
pub async fn touch(pool: &PgPool, raw_token: &str) {
    let token_hash = crypto_helper::hash_token(raw_token);
    if let Err(e) = session_repository::touch_session(pool, &token_hash).await {
        error!("Error touching session: {:?}", e);
    }
}

/// Logout: removes the single matching session row.
pub async fn revoke(pool: &PgPool, raw_token: &str) -> Result<(), AppError> {
    let token_hash = crypto_helper::hash_token(raw_token);
    session_repository::delete_by_hash(pool, &token_hash)
        .await
        .map_err(|e| {
            error!("Error revoking session: {:?}", e);
            AppError::internal()
        })?;
    Ok(())
}

/// "Sign out other devices": revokes every session of the user except the
/// one presenting `raw_token`. Returns the number revoked.
pub async fn revoke_all_except(
    pool: &PgPool,
    user_id: i64,
    raw_token: &str,
) -> Result<u64, AppError> {
    let token_hash = crypto_helper::hash_token(raw_token);
    let revoked = session_repository::delete_all_except(pool, user_id, &token_hash)
        .await
        .map_err(|e| {
            error!("Error revoking other sessions for user {}: {:?}", user_id, e);
            AppError::internal()
        })?;
    info!("{} sessions revoked for user {}", revoked, user_id);
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn device_classification() {
        assert_eq!(
            device_from_user_agent("Mozilla/5.0 (iPhone) Mobile Safari"),
            "Mobile"
        );
        assert_eq!(device_from_user_agent("Mozilla/5.0 (Windows NT 10.0)"), "Windows PC");
        assert_eq!(
            device_from_user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X)"),
            "Mac"
        );
        assert_eq!(device_from_user_agent("Mozilla/5.0 (X11; Linux x86_64)"), "Linux");
        assert_eq!(device_from_user_agent("curl/8.0"), "Browser");
    }

    #[test]
    fn client_info_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));
        let info = client_info(&headers);
        assert_eq!(info.ip, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8.0");
        assert_eq!(info.device, "Browser");
    }

    #[test]
    fn client_info_defaults_when_headers_missing() {
        let info = client_info(&HeaderMap::new());
        assert_eq!(info.ip, "unknown");
        assert_eq!(info.user_agent, "unknown");
    }
}
