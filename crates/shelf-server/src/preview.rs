//! Preview server middleware.
//!
//! HTML requests are answered with the built page for the path, falling back
//! to the built `index.html`. Everything else is served from the output
//! directory as is.

use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use shelf_build::strip_base_path;

use crate::app::{accepts_html, set_request_path};
use crate::error::ServeError;
use crate::router::candidates_for;
use crate::state::PreviewState;

pub(crate) async fn preview_middleware(
    State(state): State<Arc<PreviewState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = strip_base_path(&state.base_path, req.uri().path());
    if req.method() == Method::GET && accepts_html(req.headers()) {
        match find_page(&state.out_dir, &path).await {
            Ok(Some(html)) => return Html(html).into_response(),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to read page");
                return ServeError::from(e).into_response();
            }
        }
    }
    set_request_path(&mut req, &path);
    next.run(req).await
}

/// Read the built page for `url_path`, or the index page.
async fn find_page(out_dir: &Path, url_path: &str) -> io::Result<Option<String>> {
    if url_path.split('/').any(|segment| segment == "..") {
        return Ok(None);
    }
    let candidates = candidates_for(url_path)
        .into_iter()
        .chain(candidates_for("/"));
    for candidate in candidates {
        let file = out_dir.join(&candidate);
        let is_file = tokio::fs::metadata(&file)
            .await
            .is_ok_and(|meta| meta.is_file());
        if is_file {
            return tokio::fs::read_to_string(&file).await.map(Some);
        }
    }
    Ok(None)
}
