//! Unified application error model.
//! Every failure a portal endpoint reports is folded into `AppError`, which
//! carries a stable machine code, a human message and its HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Config { code: String, message: String },
    Backend { code: String, message: String },
    Io { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Config { code, .. }
            | AppError::Backend { code, .. }
            | AppError::Io { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Config { message, .. }
            | AppError::Backend { message, .. }
            | AppError::Io { message, .. } => message.as_str(),
        }
    }

    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }

    /// Configuration and identity-backend failures are both 500.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Auth { .. } => StatusCode::UNAUTHORIZED,
            AppError::Config { .. } | AppError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

/// JSON body: `{"status": "error", "code": .., "message": ..}`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({"status": "error", "code": self.code_str(), "message": self.message()});
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
