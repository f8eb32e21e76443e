//! Concurrent draining of every registered fragment.
//!
//! Each fragment settles independently. Settled fragments are pushed into a
//! bounded completion queue (one slot per fragment) and a single consumer
//! yields them in completion order. Failures are collected and reported once,
//! after every fragment has settled.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use tokio::sync::{mpsc, watch};

use crate::registry::DrainOutcome;
use crate::stream::RenderError;

/// A fragment drained to its full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedFragment {
    /// Temporary id.
    pub id: String,
    /// Drained content.
    pub content: String,
    /// Name given at registration.
    pub name: Option<String>,
}

/// A fragment whose render or drain failed.
#[derive(Debug, Clone)]
pub struct FragmentFailure {
    /// Temporary id.
    pub id: String,
    /// Name given at registration.
    pub name: Option<String>,
    /// Failure cause.
    pub error: RenderError,
}

/// Aggregate error yielded after every fragment has settled.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} deferred fragment(s) failed to render: {}", .failures.len(), summarize(.failures))]
pub struct DrainAllError {
    /// Every failure, ordered by id.
    pub failures: Vec<FragmentFailure>,
}

fn summarize(failures: &[FragmentFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.id, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a fragment will settle, captured when draining starts.
pub(crate) enum Settlement {
    Settled(DrainOutcome),
    Waiting(watch::Receiver<Option<DrainOutcome>>),
}

/// Stream of drained fragments in completion order.
///
/// Yields `Ok` for every fragment that drained successfully. If any fragment
/// failed, the final item is a single `Err` listing all failures. Fragments
/// already yielded stay valid.
pub struct DrainAll {
    rx: mpsc::Receiver<(String, DrainOutcome)>,
    /// Ids that have not settled yet, with their names.
    outstanding: HashMap<String, Option<String>>,
    failures: Vec<FragmentFailure>,
    done: bool,
}

impl DrainAll {
    pub(crate) fn new(pending: Vec<(String, Option<String>, Settlement)>) -> Self {
        let (tx, rx) = mpsc::channel(pending.len().max(1));
        let mut outstanding = HashMap::with_capacity(pending.len());

        for (id, name, settlement) in pending {
            outstanding.insert(id.clone(), name);
            match settlement {
                Settlement::Settled(outcome) => {
                    // One slot per fragment, so this never reports Full.
                    if tx.try_send((id, outcome)).is_err() {
                        tracing::warn!("Drain queue rejected a settled fragment");
                    }
                }
                Settlement::Waiting(mut settled) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let outcome = match settled.wait_for(Option::is_some).await {
                            Ok(value) => value.clone(),
                            Err(_) => None,
                        }
                        .unwrap_or(Err(RenderError::Aborted));
                        let _ = tx.send((id, outcome)).await;
                    });
                }
            }
        }

        Self {
            rx,
            outstanding,
            failures: Vec::new(),
            done: false,
        }
    }

    /// Collect every drained fragment, failing if any fragment failed.
    pub async fn collect_all(mut self) -> Result<Vec<DrainedFragment>, DrainAllError> {
        use futures::StreamExt;

        let mut drained = Vec::new();
        while let Some(item) = self.next().await {
            drained.push(item?);
        }
        Ok(drained)
    }

    fn finish(&mut self) -> Option<DrainAllError> {
        self.done = true;
        for (id, name) in self.outstanding.drain() {
            self.failures.push(FragmentFailure {
                id,
                name,
                error: RenderError::Aborted,
            });
        }
        if self.failures.is_empty() {
            return None;
        }
        let mut failures = std::mem::take(&mut self.failures);
        failures.sort_by(|a, b| a.id.cmp(&b.id));
        Some(DrainAllError { failures })
    }
}

impl Stream for DrainAll {
    type Item = Result<DrainedFragment, DrainAllError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            let Some((id, outcome)) = ready!(this.rx.poll_recv(cx)) else {
                return Poll::Ready(this.finish().map(Err));
            };
            let Some(name) = this.outstanding.remove(&id) else {
                continue;
            };
            match outcome {
                Ok(content) => {
                    return Poll::Ready(Some(Ok(DrainedFragment {
                        id,
                        content: content.to_string(),
                        name,
                    })));
                }
                Err(error) => this.failures.push(FragmentFailure { id, name, error }),
            }
        }
    }
}
