//! Byte streams produced by the rendering collaborator.
//!
//! Every render yields a [`ByteStream`]: a boxed, `'static` stream of byte
//! chunks that may fail part-way with a [`RenderError`].

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};

/// Stream of rendered bytes.
pub type ByteStream = BoxStream<'static, Result<Bytes, RenderError>>;

/// Error produced while rendering or reading a byte stream.
///
/// Cloneable so that a single failure can be reported to every consumer of a
/// shared stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// I/O failure inside the renderer.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Renderer reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The producing task went away before the stream finished.
    #[error("render stream ended before completion")]
    Aborted,
}

impl RenderError {
    /// Create a renderer failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Drain a byte stream into a string.
///
/// Bytes are decoded as UTF-8 once the stream has finished, so multi-byte
/// sequences split across chunks decode correctly. Invalid sequences are
/// replaced with U+FFFD.
pub async fn drain_stream(mut stream: ByteStream) -> Result<String, RenderError> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(match String::from_utf8(buf) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

/// Single-chunk stream yielding `content`.
pub fn stream_from_string(content: impl Into<String>) -> ByteStream {
    let bytes = Bytes::from(content.into());
    stream::once(async move { Ok(bytes) }).boxed()
}

/// Stream yielding each chunk in order.
pub fn stream_from_chunks<I>(chunks: I) -> ByteStream
where
    I: IntoIterator,
    I::Item: Into<Bytes>,
{
    let chunks: Vec<Result<Bytes, RenderError>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
    stream::iter(chunks).boxed()
}

/// Stream that fails immediately with `error`.
pub fn failing_stream(error: RenderError) -> ByteStream {
    stream::once(async move { Err(error) }).boxed()
}
