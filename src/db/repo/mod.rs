pub mod code_repository;
pub mod session_repository;
pub mod users_repository;
