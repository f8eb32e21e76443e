//! Deferred fragments for shelf.
//!
//! Pages may defer parts of their payload into separately fetchable
//! fragments. Fragments get a temporary id when they are registered, before
//! their content exists. Once every fragment has been drained, the
//! finalization pipeline hashes each one and rewrites all temporary ids to
//! content-derived final ids.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> Result<(), shelf_fragments::DrainAllError> {
//! use shelf_fragments::{FragmentRegistry, finalize, stream_from_string};
//!
//! let registry = FragmentRegistry::new();
//! let id = registry.register(|_: &FragmentRegistry| stream_from_string("<aside/>"), Some("aside"));
//! let page = format!("<main>{id}</main>");
//!
//! let fragments = registry.drain_all().collect_all().await?;
//! let finalized = finalize(fragments, vec![page]);
//! registry.clear();
//! # Ok(())
//! # }
//! ```

mod broadcast;
mod drain_all;
mod finalize;
mod graph;
mod hash;
mod naming;
mod registry;
mod stream;

pub use drain_all::{DrainAll, DrainAllError, DrainedFragment, FragmentFailure};
pub use finalize::{Finalized, FinalizedFragment, finalize, rewrite_ids};
pub use graph::{
    DependencyGraph, SortResult, build_dependency_graph, find_referenced_ids, topological_sort,
};
pub use hash::{CONTENT_HASH_LEN, content_hash};
pub use naming::{
    MODULE_PATH_PREFIX, MODULE_PATH_SUFFIX, PAYLOAD_ID_PREFIX, extract_id_from_module_path,
    module_path_for, payload_id_for, sanitize_name, temporary_id,
};
pub use registry::{FragmentPhase, FragmentRegistry, FragmentStatus, FragmentView, RenderSource};
pub use stream::{
    ByteStream, RenderError, drain_stream, failing_stream, stream_from_chunks, stream_from_string,
};
