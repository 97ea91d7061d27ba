use crate::service::rate_limit::{RateLimiter, SlidingWindowLimiter};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use std::sync::Arc;

/// Initializes the application state: PostgreSQL pool, JWT settings and the
/// injected rate limiter.
///
/// # Returns
/// An `Arc<AppState>` shared by every handler.
///
/// # Panics
/// This function will panic if the `DATABASE_URL` or `JWT_SECRET`
/// environment variables are not set, or if it fails to create the database
/// connection pool.
pub async fn initialize_app_state() -> Arc<AppState> {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    let jwt_issuer = env::var("JWT_TOKEN_ISSUER").unwrap_or_else(|_| "auth-service".to_string());
    // Validity window is a deployment constant: 24h by default, 1h for
    // short-session deployments.
    let jwt_expiration = env::var("JWT_TOKEN_EXPIRATION")
        .unwrap_or_else(|_| "86400".to_string())
        .parse::<u64>()
        .expect("Error parsing JWT expiration");
    let totp_issuer = env::var("TOTP_ISSUER").unwrap_or_else(|_| "auth-service".to_string());

    // Setup connection pool.
    let pg_pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&database_url)
        .await
        .map_err(|e| {
            panic!("Failed to create database connection pool: {}", e);
        })
        .unwrap();

    Arc::new(AppState {
        pg_pool,
        jwt_secret: SecretString::from(jwt_secret),
        jwt_issuer,
        jwt_expiration,
        totp_issuer,
        rate_limiter: Arc::new(SlidingWindowLimiter::recovery_default()),
    })
}

/// Retrieves the server address from the environment variables.
///
/// # Returns
/// A `String` containing the server address in the format `host:port`.
///
/// # Panics
/// This function will panic if the `SERVER_HOST` or `SERVER_PORT` environment variables are not set.
pub async fn get_server_address() -> String {
    let server_host = env::var("SERVER_HOST").expect("Error getting server host");
    let server_port = env::var("SERVER_PORT").expect("Error getting server port");
    server_host + ":" + &*server_port
}

pub struct AppState {
    pub pg_pool: PgPool,
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    /// Token validity window in seconds.
    pub jwt_expiration: u64,
    pub totp_issuer: String,
    pub rate_limiter: Arc<dyn RateLimiter>,
}
