//! Single-producer, multi-consumer replay buffer for byte streams.
//!
//! A fragment's render stream is read exactly once by a pump task. Chunks are
//! appended to a shared buffer and every subscriber replays the buffer from
//! the start, then follows new chunks as they arrive. Subscribing late never
//! misses data and an unconsumed subscriber never stalls the producer.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::sync::watch;

use crate::stream::{ByteStream, RenderError};

/// Buffered chunks plus the terminal outcome once the source has finished.
#[derive(Default)]
struct BufferState {
    chunks: Vec<Bytes>,
    end: Option<Result<(), RenderError>>,
}

/// Handle to a broadcast buffer fed by a background pump task.
pub(crate) struct Broadcast {
    rx: watch::Receiver<BufferState>,
}

/// What a subscriber should do next.
enum Step {
    Chunk(Bytes),
    End(Result<(), RenderError>),
    Wait,
}

/// Producer side of a [`Broadcast`].
pub(crate) struct Pump {
    tx: watch::Sender<BufferState>,
}

impl Pump {
    /// Read `source` to completion on a background task.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn spawn(self, mut source: ByteStream) {
        let tx = self.tx;
        tokio::spawn(async move {
            while let Some(item) = source.next().await {
                match item {
                    Ok(chunk) => tx.send_modify(|state| state.chunks.push(chunk)),
                    Err(err) => {
                        tx.send_modify(|state| state.end = Some(Err(err)));
                        return;
                    }
                }
            }
            tx.send_modify(|state| state.end = Some(Ok(())));
        });
    }
}

impl Broadcast {
    /// Create an empty buffer and the pump that will fill it.
    ///
    /// Subscribers may be created before the pump starts.
    pub(crate) fn channel() -> (Pump, Self) {
        let (tx, rx) = watch::channel(BufferState::default());
        (Pump { tx }, Self { rx })
    }

    /// New stream replaying every chunk from the beginning.
    pub(crate) fn subscribe(&self) -> ByteStream {
        let rx = self.rx.clone();
        stream::unfold(Some((rx, 0usize)), |cursor| async move {
            let (mut rx, index) = cursor?;
            let mut closed = false;
            loop {
                let step = {
                    let state = rx.borrow_and_update();
                    match (state.chunks.get(index), &state.end) {
                        (Some(chunk), _) => Step::Chunk(chunk.clone()),
                        (None, Some(end)) => Step::End(end.clone()),
                        (None, None) if closed => Step::End(Err(RenderError::Aborted)),
                        (None, None) => Step::Wait,
                    }
                };
                match step {
                    Step::Chunk(chunk) => return Some((Ok(chunk), Some((rx, index + 1)))),
                    Step::End(Ok(())) => return None,
                    Step::End(Err(err)) => return Some((Err(err), None)),
                    Step::Wait => {
                        // Sender dropped: re-check once for a final state.
                        if rx.changed().await.is_err() {
                            closed = true;
                        }
                    }
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{drain_stream, failing_stream, stream_from_chunks};
    use futures::channel::mpsc;

    impl Broadcast {
        fn spawn(source: ByteStream) -> Self {
            let (pump, broadcast) = Self::channel();
            pump.spawn(source);
            broadcast
        }
    }

    #[tokio::test]
    async fn test_two_subscribers_see_same_bytes() {
        let broadcast = Broadcast::spawn(stream_from_chunks(["ab", "cd"]));
        let first = broadcast.subscribe();
        let second = broadcast.subscribe();

        assert_eq!(drain_stream(first).await.unwrap(), "abcd");
        assert_eq!(drain_stream(second).await.unwrap(), "abcd");
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_from_start() {
        let broadcast = Broadcast::spawn(stream_from_chunks(["x", "y", "z"]));
        assert_eq!(drain_stream(broadcast.subscribe()).await.unwrap(), "xyz");

        // Source is finished; a new subscriber still gets everything.
        assert_eq!(drain_stream(broadcast.subscribe()).await.unwrap(), "xyz");
    }

    #[tokio::test]
    async fn test_unconsumed_subscriber_does_not_block() {
        let broadcast = Broadcast::spawn(stream_from_chunks(vec!["chunk"; 1000]));
        let _idle = broadcast.subscribe();
        let text = drain_stream(broadcast.subscribe()).await.unwrap();
        assert_eq!(text.len(), 5000);
    }

    #[tokio::test]
    async fn test_error_reaches_every_subscriber() {
        let broadcast = Broadcast::spawn(failing_stream(RenderError::failed("bad render")));
        let a = drain_stream(broadcast.subscribe()).await.unwrap_err();
        let b = drain_stream(broadcast.subscribe()).await.unwrap_err();
        assert_eq!(a.to_string(), "bad render");
        assert_eq!(b.to_string(), "bad render");
    }

    #[tokio::test]
    async fn test_follows_chunks_as_they_arrive() {
        let (tx, rx) = mpsc::unbounded::<Result<Bytes, RenderError>>();
        let broadcast = Broadcast::spawn(rx.boxed());
        let mut sub = broadcast.subscribe();

        tx.unbounded_send(Ok(Bytes::from_static(b"one"))).unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap(), "one");

        tx.unbounded_send(Ok(Bytes::from_static(b"two"))).unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap(), "two");

        drop(tx);
        assert!(sub.next().await.is_none());
    }
}
