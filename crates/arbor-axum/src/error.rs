//! Errors surfaced by the extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures when handlers pull auth state out of a request.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The session layer did not admit this request, or the route was
    /// mounted outside the layer.
    #[error("authentication required")]
    Unauthenticated,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
        }
    }
}
