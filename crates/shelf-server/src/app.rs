//! Router construction.
//!
//! Both servers are a single fallback service wrapped in a serving
//! middleware: the middleware answers what it can and hands everything else,
//! with the base path stripped, to static file serving.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::header::HeaderName;
use axum::http::{HeaderMap, HeaderValue, Uri, header};
use axum::middleware;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::dev::dev_middleware;
use crate::error::ServeError;
use crate::preview::preview_middleware;
use crate::state::{DevState, PreviewState};

/// Create the dev server router.
///
/// Requests the dev middleware doesn't answer are served from `public_dir`,
/// or get a 404 without one.
pub(crate) fn dev_router(state: Arc<DevState>, public_dir: Option<&Path>) -> Router {
    let router = match public_dir {
        Some(dir) => Router::new().fallback_service(ServeDir::new(dir)),
        None => Router::new().fallback(not_found),
    };
    router
        .layer(middleware::from_fn_with_state(state, dev_middleware))
        .layer(content_type_options_layer())
        .layer(TraceLayer::new_for_http())
}

/// Create the preview server router serving `out_dir`.
pub(crate) fn preview_router(state: Arc<PreviewState>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(&state.out_dir))
        .layer(middleware::from_fn_with_state(state, preview_middleware))
        .layer(content_type_options_layer())
        .layer(TraceLayer::new_for_http())
}

/// Layer that adds `X-Content-Type-Options: nosniff` to all responses.
fn content_type_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    )
}

async fn not_found(uri: Uri) -> ServeError {
    ServeError::NotFound(uri.path().to_owned())
}

/// Check whether the request accepts an HTML response.
pub(crate) fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"))
}

/// Replace the request path, keeping the query string.
pub(crate) fn set_request_path(req: &mut Request, path: &str) {
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };
    match Uri::try_from(path_and_query) {
        Ok(uri) => *req.uri_mut() = uri,
        Err(e) => tracing::debug!(path = %path, error = %e, "Keeping original request path"),
    }
}
