//! Dev server middleware.
//!
//! Pages, payloads and fragments are rendered on request:
//!
//! - `GET <page>` with `Accept: text/html` renders the matching entry's shell
//!   (single-page-app fallback to the index entry),
//! - `/.shelf/payload[/<entry>]` streams the entry's page payload into a
//!   fresh fragment registry,
//! - `/shelf__/<id>.txt` serves a deferred fragment from the recent render
//!   that registered it.
//!
//! Anything not found here is passed on to the next handler.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use shelf_build::{ShellContext, strip_base_path, with_base_path};
use shelf_fragments::{ByteStream, FragmentStatus, extract_id_from_module_path};

use crate::app::{accepts_html, set_request_path};
use crate::error::ServeError;
use crate::router::{match_entry, resolve_entry};
use crate::state::DevState;

/// Path of the page payload endpoint.
pub const PAYLOAD_ENDPOINT: &str = "/.shelf/payload";

/// Content type of page payloads and fragments.
pub const PAYLOAD_CONTENT_TYPE: &str = "text/x-component;charset=utf-8";

pub(crate) async fn dev_middleware(
    State(state): State<Arc<DevState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = strip_base_path(&state.base_path, req.uri().path());
    match handle(&state, &req, &path) {
        Ok(response) => response,
        Err(ServeError::NotFound(_)) => {
            set_request_path(&mut req, &path);
            next.run(req).await
        }
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "Request failed");
            err.into_response()
        }
    }
}

fn handle(state: &DevState, req: &Request, path: &str) -> Result<Response, ServeError> {
    let not_found = || ServeError::NotFound(path.to_owned());

    if let Some(entry_path) = payload_entry_path(path) {
        let entry = if entry_path.is_empty() {
            match_entry(&state.entries, "/")
        } else {
            state.entries.iter().find(|e| e.path == entry_path)
        }
        .ok_or_else(not_found)?;
        tracing::debug!(entry = %entry.path, "Rendering page payload");
        let registry = state.begin_render();
        return Ok(stream_response(
            PAYLOAD_CONTENT_TYPE,
            entry.page.render_page(&registry),
        ));
    }

    if let Some(id) = extract_id_from_module_path(path) {
        let view = state
            .registry_for(id)
            .and_then(|registry| registry.load(id))
            .ok_or_else(not_found)?;
        return match view.status {
            FragmentStatus::Streaming(stream) => Ok(stream_response(PAYLOAD_CONTENT_TYPE, stream)),
            FragmentStatus::Ready(content) => Ok((
                [(header::CONTENT_TYPE, PAYLOAD_CONTENT_TYPE)],
                content.to_string(),
            )
                .into_response()),
            FragmentStatus::Errored(source) => Err(ServeError::FragmentFailed {
                id: view.id,
                source,
            }),
        };
    }

    if req.method() == Method::GET && accepts_html(req.headers()) {
        let entry = resolve_entry(&state.entries, path).ok_or_else(not_found)?;
        let payload_path = with_base_path(
            &state.base_path,
            &format!("{PAYLOAD_ENDPOINT}/{}", entry.path),
        );
        let context = ShellContext::for_dev(payload_path);
        return Ok(stream_response(
            "text/html; charset=utf-8",
            entry.shell.render_shell(&context),
        ));
    }

    Err(not_found())
}

/// Entry path addressed by a payload endpoint request, `""` for the index.
fn payload_entry_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(PAYLOAD_ENDPOINT)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('/')
}

fn stream_response(content_type: &'static str, stream: ByteStream) -> Response {
    (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(stream),
    )
        .into_response()
}
