//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; the body is always
//! `{ "message": ..., "code": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: lf_core::Error,
}

impl AppError {
    pub fn new(inner: lf_core::Error) -> Self {
        Self { inner }
    }

    /// Text shown to the client. Validation and conflict messages are passed
    /// through unprefixed.
    fn message(&self) -> String {
        match &self.inner {
            lf_core::Error::Validation(m) | lf_core::Error::Conflict(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

impl From<lf_core::Error> for AppError {
    fn from(e: lf_core::Error) -> Self {
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

        let body = json!({
            "message": self.message(),
            "code": self.inner.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
