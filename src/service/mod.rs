pub mod auth_service;
pub mod cleanup;
pub mod code_service;
pub mod email;
pub mod lockout;
pub mod rate_limit;
pub mod recovery_service;
pub mod register_service;
pub mod session_service;
pub mod two_factor_service;
