//! RPC error taxonomy.
//!
//! Internal errors are logged with full detail but only a generic message
//! crosses the wire, so persistence internals never leak to performers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Typed RPC-level error returned to performers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Authentication or lease-ownership failure.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The task, claim, or other entity does not exist (or no task is
    /// free).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed or failed leasing validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Persistence or validation failure, or an unanticipated internal
    /// error.
    #[error("unknown: {0}")]
    Unknown(String),
}

impl RpcError {
    /// Builds a `PermissionDenied` error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Builds a `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Builds an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Builds an `Unknown` error.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Returns the wire error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Returns the carried message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::PermissionDenied(message)
            | Self::NotFound(message)
            | Self::InvalidArgument(message)
            | Self::Unknown(message) => message,
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code(), "msg": self.message() });
        (self.status(), Json(body)).into_response()
    }
}
