pub mod auth;
pub mod comments;
pub mod dto;
pub mod middleware;
pub mod notices;
pub mod notifications;
pub mod protocol;
pub mod realtime;
pub mod rest;
pub mod routes;
pub mod state;
pub mod ws_handler;

// Re-exported for the binaries and integration tests.
pub use routes::build_router;
pub use state::AppState;
pub use ws_handler::ws_handler;
