#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod errors;
pub mod infra;
pub mod middleware;
pub mod repos;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

// Re-exports for public API
pub use auth::jwt::{mint_access_token, verify_access_token, Claims};
pub use config::db::{db_url, DbOwner, DbProfile};
pub use config::game::GameConfig;
pub use error::AppError;
pub use errors::ErrorCode;
pub use infra::db::{bootstrap_db, connect_db};
pub use infra::state::build_state;
pub use middleware::cors::cors_middleware;
pub use middleware::request_log::RequestLog;
pub use state::app_state::AppState;
pub use state::security_config::SecurityConfig;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    backend_test_support::logging::init();
}
