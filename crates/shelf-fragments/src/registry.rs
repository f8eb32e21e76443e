//! Deferred fragment registry.
//!
//! A [`FragmentRegistry`] tracks every fragment registered during one build
//! (or one server session) from registration to finalized content:
//!
//! ```text
//! Pending ──load()──► Streaming ──drain ok──► Ready
//!                         │
//!                         └────drain err────► Errored
//! ```
//!
//! Transitions only move forward. Rendering is triggered at most once per
//! fragment no matter how many times it is loaded. The rendered stream is fed
//! into a replay buffer: one subscriber is drained eagerly into a string,
//! any other subscriber serves the fragment live.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

use crate::broadcast::{Broadcast, Pump};
use crate::drain_all::{DrainAll, Settlement};
use crate::naming::temporary_id;
use crate::stream::{ByteStream, RenderError, drain_stream};

/// Result of draining one fragment.
pub(crate) type DrainOutcome = Result<Arc<str>, RenderError>;

/// Source of a fragment's content.
///
/// Rendering receives the registry so a fragment may defer further fragments.
/// The returned stream is polled on a background task.
pub trait RenderSource: Send + Sync + 'static {
    /// Render the fragment into a byte stream.
    fn render(&self, registry: &FragmentRegistry) -> ByteStream;
}

impl<F> RenderSource for F
where
    F: Fn(&FragmentRegistry) -> ByteStream + Send + Sync + 'static,
{
    fn render(&self, registry: &FragmentRegistry) -> ByteStream {
        self(registry)
    }
}

/// Lifecycle phase of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPhase {
    /// Registered, not yet rendered.
    Pending,
    /// Rendering; content is being drained.
    Streaming,
    /// Fully drained.
    Ready,
    /// Rendering or draining failed.
    Errored,
}

/// Snapshot of a loaded fragment.
pub struct FragmentView {
    /// Temporary id.
    pub id: String,
    /// Name given at registration.
    pub name: Option<String>,
    /// Content access for the current phase.
    pub status: FragmentStatus,
}

/// Content of a loaded fragment.
pub enum FragmentStatus {
    /// Still rendering. The stream replays everything rendered so far and
    /// follows the rest.
    Streaming(ByteStream),
    /// Fully drained content.
    Ready(Arc<str>),
    /// Render failure.
    Errored(RenderError),
}

impl fmt::Debug for FragmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming(_) => f.write_str("Streaming"),
            Self::Ready(content) => f.debug_tuple("Ready").field(content).finish(),
            Self::Errored(err) => f.debug_tuple("Errored").field(err).finish(),
        }
    }
}

impl fmt::Debug for FragmentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentView")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .finish()
    }
}

enum FragmentState {
    Pending(Arc<dyn RenderSource>),
    Streaming {
        buffer: Broadcast,
        settled: watch::Receiver<Option<DrainOutcome>>,
    },
    Ready(Arc<str>),
    Errored(RenderError),
}

struct FragmentEntry {
    name: Option<String>,
    state: FragmentState,
}

/// Work to do after a fragment leaves `Pending`, performed outside the lock.
struct Start {
    source: Arc<dyn RenderSource>,
    pump: Pump,
    drain: ByteStream,
    settle_tx: watch::Sender<Option<DrainOutcome>>,
}

impl FragmentEntry {
    /// Move a pending fragment to `Streaming`.
    ///
    /// Returns `None` if rendering already started.
    fn begin(&mut self) -> Option<Start> {
        let FragmentState::Pending(source) = &self.state else {
            return None;
        };
        let source = Arc::clone(source);
        let (pump, buffer) = Broadcast::channel();
        let (settle_tx, settled) = watch::channel(None);
        let drain = buffer.subscribe();
        self.state = FragmentState::Streaming { buffer, settled };
        Some(Start {
            source,
            pump,
            drain,
            settle_tx,
        })
    }

    fn status(&self) -> FragmentStatus {
        match &self.state {
            FragmentState::Streaming { buffer, .. } => FragmentStatus::Streaming(buffer.subscribe()),
            FragmentState::Ready(content) => FragmentStatus::Ready(Arc::clone(content)),
            FragmentState::Errored(err) => FragmentStatus::Errored(err.clone()),
            FragmentState::Pending(_) => unreachable!("status() is only called after begin()"),
        }
    }

    fn settlement(&self) -> Settlement {
        match &self.state {
            FragmentState::Streaming { settled, .. } => Settlement::Waiting(settled.clone()),
            FragmentState::Ready(content) => Settlement::Settled(Ok(Arc::clone(content))),
            FragmentState::Errored(err) => Settlement::Settled(Err(err.clone())),
            FragmentState::Pending(_) => unreachable!("settlement() is only called after begin()"),
        }
    }

    fn phase(&self) -> FragmentPhase {
        match self.state {
            FragmentState::Pending(_) => FragmentPhase::Pending,
            FragmentState::Streaming { .. } => FragmentPhase::Streaming,
            FragmentState::Ready(_) => FragmentPhase::Ready,
            FragmentState::Errored(_) => FragmentPhase::Errored,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    fragments: HashMap<String, FragmentEntry>,
    /// Caller-supplied key -> temporary id.
    keys: HashMap<String, String>,
}

/// Registry of deferred fragments.
///
/// Cloning yields another handle to the same registry. Create one registry
/// per build or server session and call [`clear`](Self::clear) when that
/// scope ends.
///
/// `load` and `drain_all` spawn Tokio tasks and must run inside a runtime.
#[derive(Clone, Default)]
pub struct FragmentRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl FragmentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a fragment and return its fresh temporary id.
    ///
    /// Does not render anything.
    pub fn register<S: RenderSource>(&self, source: S, name: Option<&str>) -> String {
        let id = temporary_id(name);
        self.insert(id.clone(), Arc::new(source), name);
        id
    }

    /// Register a fragment under a stable caller-supplied key.
    ///
    /// If `key` was registered before, the existing id is returned and
    /// `source` is dropped.
    pub fn register_with_key<S: RenderSource>(
        &self,
        key: &str,
        source: S,
        name: Option<&str>,
    ) -> String {
        let mut state = self.state();
        if let Some(id) = state.keys.get(key) {
            return id.clone();
        }
        let id = temporary_id(name);
        state.keys.insert(key.to_owned(), id.clone());
        state.fragments.insert(
            id.clone(),
            FragmentEntry {
                name: name.map(str::to_owned),
                state: FragmentState::Pending(Arc::new(source)),
            },
        );
        tracing::debug!(id = %id, key = %key, "Registered deferred fragment");
        id
    }

    fn insert(&self, id: String, source: Arc<dyn RenderSource>, name: Option<&str>) {
        tracing::debug!(id = %id, "Registered deferred fragment");
        self.state().fragments.insert(
            id,
            FragmentEntry {
                name: name.map(str::to_owned),
                state: FragmentState::Pending(source),
            },
        );
    }

    /// Check whether `id` is registered.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.state().fragments.contains_key(id)
    }

    /// Number of registered fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().fragments.len()
    }

    /// Check whether no fragments are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().fragments.is_empty()
    }

    /// Current phase of `id` without triggering a render.
    #[must_use]
    pub fn phase(&self, id: &str) -> Option<FragmentPhase> {
        self.state().fragments.get(id).map(FragmentEntry::phase)
    }

    /// Load a fragment, starting its render if it is still pending.
    ///
    /// Returns immediately; draining continues in the background. Loading
    /// the same id again never renders twice. Returns `None` for unknown ids.
    pub fn load(&self, id: &str) -> Option<FragmentView> {
        let (view, start) = {
            let mut state = self.state();
            let entry = state.fragments.get_mut(id)?;
            let start = entry.begin();
            let view = FragmentView {
                id: id.to_owned(),
                name: entry.name.clone(),
                status: entry.status(),
            };
            (view, start)
        };
        if let Some(start) = start {
            self.run(id, start);
        }
        Some(view)
    }

    /// Start every registered fragment and drain them concurrently.
    ///
    /// See [`DrainAll`] for ordering and error semantics.
    pub fn drain_all(&self) -> DrainAll {
        let (pending, starts) = {
            let mut state = self.state();
            let mut pending = Vec::with_capacity(state.fragments.len());
            let mut starts = Vec::new();
            for (id, entry) in &mut state.fragments {
                if let Some(start) = entry.begin() {
                    starts.push((id.clone(), start));
                }
                pending.push((id.clone(), entry.name.clone(), entry.settlement()));
            }
            (pending, starts)
        };
        for (id, start) in starts {
            self.run(&id, start);
        }
        DrainAll::new(pending)
    }

    /// Remove every fragment.
    ///
    /// Renders already in flight finish in the background but their results
    /// are discarded.
    pub fn clear(&self) {
        let mut state = self.state();
        state.fragments.clear();
        state.keys.clear();
    }

    /// Render the fragment and drain it in the background.
    fn run(&self, id: &str, start: Start) {
        let Start {
            source,
            pump,
            drain,
            settle_tx,
        } = start;
        tracing::debug!(id = %id, "Rendering deferred fragment");
        pump.spawn(source.render(self));

        let registry = Arc::downgrade(&self.inner);
        let id = id.to_owned();
        tokio::spawn(async move {
            let outcome: DrainOutcome = drain_stream(drain).await.map(Arc::from);
            settle(&registry, &id, &outcome);
            settle_tx.send_replace(Some(outcome));
        });
    }
}

/// Record the drain outcome on the fragment, if it is still registered.
fn settle(registry: &Weak<Mutex<RegistryState>>, id: &str, outcome: &DrainOutcome) {
    let Some(inner) = registry.upgrade() else {
        return;
    };
    let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(entry) = state.fragments.get_mut(id) else {
        return;
    };
    entry.state = match outcome {
        Ok(content) => {
            tracing::debug!(id = %id, bytes = content.len(), "Deferred fragment ready");
            FragmentState::Ready(Arc::clone(content))
        }
        Err(err) => {
            tracing::warn!(id = %id, error = %err, "Deferred fragment failed");
            FragmentState::Errored(err.clone())
        }
    };
}
