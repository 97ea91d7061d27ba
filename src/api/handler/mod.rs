use crate::config::app_config::AppState;
use axum::Router;
use std::sync::Arc;

pub mod auth_handler;
pub mod health_handler;
pub mod recovery_handler;
pub mod register_handler;
pub mod session_handler;
pub mod two_factor_handler;

/// Assembles the full application router. The public auth flows sit at the
/// root; `/2fa` setup and the authenticated session endpoints are nested
/// and layered separately.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_handler::health_routes())
        .merge(register_handler::register_routes())
        .merge(auth_handler::auth_routes())
        .merge(recovery_handler::recovery_routes())
        .nest("/2fa", two_factor_handler::two_factor_routes())
        .merge(session_handler::session_routes(state.clone()))
        .with_state(state)
}
