//! Error types for the HTTP servers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use shelf_fragments::RenderError;

/// Server error type.
///
/// `NotFound` is handled by the serving middleware by passing the request on
/// to the next handler.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// No entry, payload or fragment for the path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested fragment failed to render.
    #[error("Fragment {id} failed: {source}")]
    FragmentFailed {
        /// Fragment id.
        id: String,
        /// Render failure.
        source: RenderError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServeError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FragmentFailed { .. } | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::NotFound(path) => json!({"error": "Not found", "path": path}),
            Self::FragmentFailed { id, source } => {
                json!({"error": "Fragment failed", "id": id, "message": source.to_string()})
            }
            Self::Io(e) => json!({"error": e.to_string()}),
        };

        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServeError::NotFound("/x".to_owned()).status(),
            StatusCode::NOT_FOUND
        );
        let failed = ServeError::FragmentFailed {
            id: "shelf-payload/a".to_owned(),
            source: RenderError::failed("boom"),
        };
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.to_string(), "Fragment shelf-payload/a failed: boom");
    }
}
