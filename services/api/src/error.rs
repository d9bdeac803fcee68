//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! error renders as an HTTP response.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notice_board_core::ports::PortError;
use tracing::{debug, error};

use crate::config::ConfigError;
use crate::web::rest::ApiResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the core services or ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while running database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents an error related to the WebSocket connection.
    #[error("WebSocket Error: {0}")]
    Websocket(#[from] axum::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Port(PortError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Port(PortError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to clients. Internal details stay in the logs.
    fn client_message(&self) -> String {
        match self {
            Self::Port(PortError::NotFound(msg)) => msg.clone(),
            Self::Port(PortError::Forbidden(msg)) => format!("Access denied: {msg}"),
            Self::Port(PortError::Validation(msg)) => msg.clone(),
            Self::Port(PortError::Unauthorized) => "Authentication required".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

// Malformed path segments, query strings and bodies are client errors.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Port(PortError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Port(PortError::Validation(rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Port(PortError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, status = %status, "Request rejected");
        }
        (status, ApiResponse::<()>::failure(self.client_message())).into_response()
    }
}
