//! Shared server state.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use shelf_build::Entry;
use shelf_fragments::FragmentRegistry;

/// Number of payload renders whose fragments stay loadable.
pub(crate) const RECENT_RENDERS: usize = 16;

/// State of the dev server.
///
/// Every payload request renders into its own [`FragmentRegistry`], so
/// template edits show up on the next request. Registries of the most recent
/// renders are kept for the fragment fetches that follow; older ones are
/// cleared.
pub(crate) struct DevState {
    /// Page entries.
    pub entries: Vec<Entry>,
    /// URL prefix the site is served under.
    pub base_path: String,
    /// Registries of recent payload renders, newest first.
    renders: Mutex<VecDeque<FragmentRegistry>>,
}

impl DevState {
    pub(crate) fn new(entries: Vec<Entry>, base_path: String) -> Self {
        Self {
            entries,
            base_path,
            renders: Mutex::new(VecDeque::with_capacity(RECENT_RENDERS)),
        }
    }

    fn renders(&self) -> MutexGuard<'_, VecDeque<FragmentRegistry>> {
        self.renders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registry for a new payload render.
    pub(crate) fn begin_render(&self) -> FragmentRegistry {
        let registry = FragmentRegistry::new();
        let mut renders = self.renders();
        renders.push_front(registry.clone());
        while renders.len() > RECENT_RENDERS {
            if let Some(retired) = renders.pop_back() {
                retired.clear();
            }
        }
        registry
    }

    /// Registry of the most recent render that registered `id`.
    pub(crate) fn registry_for(&self, id: &str) -> Option<FragmentRegistry> {
        self.renders().iter().find(|r| r.has(id)).cloned()
    }

    /// Drop every render scope.
    pub(crate) fn clear(&self) {
        for registry in self.renders().drain(..) {
            registry.clear();
        }
    }
}

/// State of the preview server.
pub(crate) struct PreviewState {
    /// Build output directory.
    pub out_dir: PathBuf,
    /// URL prefix the site is served under.
    pub base_path: String,
}

#[cfg(test)]
mod tests {
    use shelf_fragments::stream_from_string;

    use super::*;

    fn register(registry: &FragmentRegistry) -> String {
        registry.register(|_: &FragmentRegistry| stream_from_string("x"), None)
    }

    #[test]
    fn test_render_scopes_are_isolated() {
        let state = DevState::new(Vec::new(), "/".to_owned());
        let first = state.begin_render();
        let a = first.register_with_key(
            "nav.txt",
            |_: &FragmentRegistry| stream_from_string("a"),
            None,
        );
        let second = state.begin_render();
        let b = second.register_with_key(
            "nav.txt",
            |_: &FragmentRegistry| stream_from_string("b"),
            None,
        );

        assert_ne!(a, b);
        assert!(state.registry_for(&a).is_some_and(|r| r.has(&a) && !r.has(&b)));
        assert!(state.registry_for(&b).is_some_and(|r| r.has(&b)));
    }

    #[test]
    fn test_oldest_render_is_retired() {
        let state = DevState::new(Vec::new(), "/".to_owned());
        let oldest = state.begin_render();
        let id = register(&oldest);

        for _ in 0..RECENT_RENDERS {
            register(&state.begin_render());
        }

        assert!(state.registry_for(&id).is_none());
        assert!(oldest.is_empty());
    }

    #[test]
    fn test_clear_drops_every_render() {
        let state = DevState::new(Vec::new(), "/".to_owned());
        let registry = state.begin_render();
        let id = register(&registry);

        state.clear();

        assert!(state.registry_for(&id).is_none());
        assert!(registry.is_empty());
    }
}
