pub mod auth;
pub mod recovery;
pub mod register;
pub mod session;
pub mod two_factor;
