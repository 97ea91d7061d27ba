use auth_service::api::handler::{
    app_router, auth_handler, health_handler, recovery_handler, register_handler, session_handler,
    two_factor_handler,
};
use auth_service::config::app_config::{get_server_address, initialize_app_state};
use auth_service::service::cleanup;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler::health,
        register_handler::register,
        register_handler::verify_email,
        register_handler::resend_code,
        auth_handler::login,
        auth_handler::login_totp,
        auth_handler::verify_login_code,
        recovery_handler::request_code,
        recovery_handler::validate_code,
        recovery_handler::reset_password,
        two_factor_handler::totp_setup,
        two_factor_handler::totp_verify,
        two_factor_handler::email_setup,
        two_factor_handler::email_verify,
        session_handler::logout,
        session_handler::close_other_sessions,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Registration", description = "Account creation and email verification"),
        (name = "Authentication", description = "Login and second-factor steps"),
        (name = "Password Recovery", description = "Code-based password reset"),
        (name = "Two-Factor Authentication", description = "TOTP and email 2FA setup"),
        (name = "Sessions", description = "Session whitelist management"),
        (name = "Health", description = "Liveness check")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() {
    // Logging handler using tracing, configurable with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let app_state = initialize_app_state().await;
    let server_addr = get_server_address().await;

    // Hourly sweep for spent codes and idle sessions.
    tokio::spawn(cleanup::run(app_state.pg_pool.clone()));

    let app = app_router(app_state)
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let server_address: SocketAddr = server_addr.parse().expect("Invalid server address");
    info!("Starting server at {}", server_addr);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app).await.expect("Server error");
}
