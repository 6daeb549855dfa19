//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`sw_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core and db calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: sw_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: sw_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<sw_core::Error> for AppError {
    fn from(e: sw_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            sw_core::Error::NotFound { .. } => "not_found",
            sw_core::Error::Unauthorized(_) => "unauthorized",
            sw_core::Error::Validation(_) => "validation_error",
            sw_core::Error::Database { .. } => "database_error",
            sw_core::Error::Io { .. } => "io_error",
            sw_core::Error::Upstream { .. } => "upstream_error",
            sw_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
