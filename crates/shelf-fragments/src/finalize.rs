//! Fragment finalization: content hashing and id rewriting.
//!
//! Fragments are processed dependencies-first. Before a fragment is hashed,
//! every temporary id it references is replaced by that dependency's final
//! id, so the hash covers final content. Cycle members keep their temporary
//! id. Page payloads are rewritten last with the complete mapping.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;

use crate::drain_all::DrainedFragment;
use crate::graph::{build_dependency_graph, topological_sort};
use crate::hash::content_hash;
use crate::naming::payload_id_for;

/// A fragment ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFragment {
    /// Content-derived id, or the temporary id for cycle members.
    pub final_id: String,
    /// Content with every resolvable reference rewritten.
    pub content: String,
    /// Name given at registration.
    pub name: Option<String>,
}

/// Output of [`finalize`].
#[derive(Debug, Clone, Default)]
pub struct Finalized {
    /// Fragments in dependencies-first order, cycle members last.
    ///
    /// Fragments with identical final content share a final id.
    pub fragments: Vec<FinalizedFragment>,
    /// Page payloads with every temporary id rewritten, in input order.
    pub pages: Vec<String>,
    /// Temporary id -> final id.
    pub id_mapping: BTreeMap<String, String>,
    /// Fragments that kept their temporary id because of a reference cycle.
    pub cycles: BTreeSet<String>,
}

impl Finalized {
    /// Rewrite every temporary id in `text` to its final id.
    pub fn rewrite(&self, text: &str) -> String {
        rewrite_ids(text, self.id_mapping.keys().map(String::as_str), &self.id_mapping)
    }
}

/// Hash every fragment and rewrite all references to final ids.
///
/// With no fragments the pages are returned unchanged.
pub fn finalize(fragments: Vec<DrainedFragment>, pages: Vec<String>) -> Finalized {
    if fragments.is_empty() {
        return Finalized {
            pages,
            ..Finalized::default()
        };
    }

    let deps = build_dependency_graph(&fragments);
    let order = topological_sort(&deps);
    let mut sources: HashMap<String, (String, Option<String>)> = fragments
        .into_iter()
        .map(|f| (f.id, (f.content, f.name)))
        .collect();

    let mut id_mapping = BTreeMap::new();
    let mut finalized = Vec::with_capacity(sources.len());

    for id in &order.sorted {
        let Some((content, name)) = sources.remove(id) else {
            continue;
        };
        let content = rewrite_dependencies(&content, deps.get(id), &id_mapping);
        let final_id = payload_id_for(&content_hash(&content));
        tracing::debug!(id = %id, final_id = %final_id, "Finalized fragment");
        id_mapping.insert(id.clone(), final_id.clone());
        finalized.push(FinalizedFragment {
            final_id,
            content,
            name,
        });
    }

    if !order.in_cycle.is_empty() {
        tracing::warn!(
            ids = ?order.in_cycle,
            "Deferred fragments reference each other in a cycle; keeping temporary ids"
        );
    }
    for id in &order.in_cycle {
        let Some((content, name)) = sources.remove(id) else {
            continue;
        };
        let content = rewrite_dependencies(&content, deps.get(id), &id_mapping);
        id_mapping.insert(id.clone(), id.clone());
        finalized.push(FinalizedFragment {
            final_id: id.clone(),
            content,
            name,
        });
    }

    let pages = pages
        .iter()
        .map(|page| rewrite_ids(page, id_mapping.keys().map(String::as_str), &id_mapping))
        .collect();

    Finalized {
        fragments: finalized,
        pages,
        id_mapping,
        cycles: order.in_cycle,
    }
}

fn rewrite_dependencies(
    content: &str,
    deps: Option<&BTreeSet<String>>,
    mapping: &BTreeMap<String, String>,
) -> String {
    match deps {
        Some(deps) => rewrite_ids(content, deps.iter().map(String::as_str), mapping),
        None => content.to_owned(),
    }
}

/// Replace each of `ids` found in `text` by its entry in `mapping`.
///
/// Replacement is a single pass, so a final id is never rewritten again.
/// Ids without a mapping, or mapped to themselves, are left alone.
pub fn rewrite_ids<'a, I>(text: &str, ids: I, mapping: &BTreeMap<String, String>) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut targets: Vec<&str> = ids
        .into_iter()
        .filter(|id| mapping.get(*id).is_some_and(|to| to != id) && text.contains(id))
        .collect();
    if targets.is_empty() {
        return text.to_owned();
    }
    // Longest first, so an id that prefixes another never wins the match.
    targets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let pattern = targets
        .iter()
        .map(|id| regex::escape(id))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(text, |caps: &regex::Captures<'_>| {
                mapping.get(&caps[0]).cloned().unwrap_or_else(|| caps[0].to_owned())
            })
            .into_owned(),
        Err(err) => {
            tracing::debug!(error = %err, "Falling back to sequential id replacement");
            targets.iter().fold(text.to_owned(), |acc, id| {
                acc.replace(id, &mapping[*id])
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::naming::{PAYLOAD_ID_PREFIX, temporary_id};
    use crate::registry::FragmentRegistry;
    use crate::stream::stream_from_string;

    fn fragment(id: &str, content: &str) -> DrainedFragment {
        DrainedFragment {
            id: id.to_owned(),
            content: content.to_owned(),
            name: None,
        }
    }

    fn final_of<'a>(finalized: &'a Finalized, id: &str) -> &'a FinalizedFragment {
        let final_id = &finalized.id_mapping[id];
        finalized
            .fragments
            .iter()
            .find(|f| &f.final_id == final_id)
            .unwrap()
    }

    #[test]
    fn test_no_fragments_passes_pages_through() {
        let pages = vec!["<p>one</p>".to_owned(), "<p>two</p>".to_owned()];
        let finalized = finalize(Vec::new(), pages.clone());
        assert_eq!(finalized.pages, pages);
        assert!(finalized.fragments.is_empty());
        assert!(finalized.id_mapping.is_empty());
    }

    #[test]
    fn test_dependency_final_id_embedded_in_dependent() {
        let f1 = temporary_id(Some("f1"));
        let f2 = temporary_id(Some("f2"));
        let finalized = finalize(
            vec![
                fragment(&f2, &format!("<ref {f1}>")),
                fragment(&f1, "leaf content"),
            ],
            vec![format!("page uses {f2}")],
        );

        let f1_final = &finalized.id_mapping[&f1];
        let f2_final = &finalized.id_mapping[&f2];
        assert!(f1_final.starts_with(PAYLOAD_ID_PREFIX));
        assert_ne!(f1_final, f2_final);
        assert_ne!(f1_final, &f1);
        assert_ne!(f2_final, &f2);

        let second = final_of(&finalized, &f2);
        assert_eq!(second.content, format!("<ref {f1_final}>"));
        assert!(!final_of(&finalized, &f1).content.contains(PAYLOAD_ID_PREFIX));
        assert_eq!(finalized.pages, vec![format!("page uses {f2_final}")]);

        // Dependencies come first in the output.
        assert_eq!(&finalized.fragments[0].final_id, f1_final);
    }

    #[test]
    fn test_final_ids_are_content_derived() {
        let a = finalize(vec![fragment(&temporary_id(None), "same")], Vec::new());
        let b = finalize(vec![fragment(&temporary_id(None), "same")], Vec::new());
        assert_eq!(a.fragments[0].final_id, b.fragments[0].final_id);
        assert_eq!(
            a.fragments[0].final_id,
            payload_id_for(&content_hash("same"))
        );
    }

    #[test]
    fn test_dependent_hash_is_stable_across_builds() {
        let build = || {
            let leaf = temporary_id(None);
            let root = temporary_id(None);
            let out = finalize(
                vec![fragment(&leaf, "leaf"), fragment(&root, &format!("root[{leaf}]"))],
                Vec::new(),
            );
            out.id_mapping[&root].clone()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_cycle_members_keep_temporary_ids() {
        let a = temporary_id(Some("a"));
        let b = temporary_id(Some("b"));
        let leaf = temporary_id(Some("leaf"));
        let finalized = finalize(
            vec![
                fragment(&a, &format!("{b} {leaf}")),
                fragment(&b, &a),
                fragment(&leaf, "leaf"),
            ],
            vec![format!("{a}|{leaf}")],
        );

        assert_eq!(finalized.cycles, BTreeSet::from([a.clone(), b.clone()]));
        assert_eq!(finalized.id_mapping[&a], a);
        assert_eq!(finalized.id_mapping[&b], b);

        let leaf_final = finalized.id_mapping[&leaf].clone();
        assert_ne!(leaf_final, leaf);
        assert_eq!(final_of(&finalized, &a).content, format!("{b} {leaf_final}"));
        assert_eq!(finalized.pages, vec![format!("{a}|{leaf_final}")]);

        // Cycle members come after everything that could be sorted.
        assert_eq!(finalized.fragments[0].final_id, leaf_final);
        assert_eq!(finalized.fragments.len(), 3);
    }

    #[test]
    fn test_rewrite_handles_text_outside_payloads() {
        let id = temporary_id(None);
        let finalized = finalize(vec![fragment(&id, "x")], Vec::new());
        let html = format!("<link rel=\"preload\" href=\"/shelf__/{id}.txt\">");
        let rewritten = finalized.rewrite(&html);
        assert!(rewritten.contains(&finalized.id_mapping[&id]));
        assert!(!rewritten.contains(&id));
    }

    #[test]
    fn test_rewrite_ids_prefers_longest_match() {
        let mapping = BTreeMap::from([
            ("id-1".to_owned(), "A".to_owned()),
            ("id-10".to_owned(), "B".to_owned()),
        ]);
        let out = rewrite_ids("id-10 id-1", ["id-1", "id-10"], &mapping);
        assert_eq!(out, "B A");
    }

    #[tokio::test]
    async fn test_registry_to_finalized_output() {
        let registry = FragmentRegistry::new();
        let leaf = registry.register(|_: &FragmentRegistry| stream_from_string("leaf"), None);
        let leaf_ref = leaf.clone();
        let parent = registry.register(
            move |_: &FragmentRegistry| stream_from_string(format!("parent of {leaf_ref}")),
            Some("parent"),
        );

        let drained = registry.drain_all().collect_all().await.unwrap();
        let finalized = finalize(drained, vec![format!("main -> {parent}")]);

        let parent_final = final_of(&finalized, &parent);
        assert_eq!(parent_final.name.as_deref(), Some("parent"));
        assert_eq!(
            parent_final.content,
            format!("parent of {}", finalized.id_mapping[&leaf])
        );
        assert_eq!(
            finalized.pages[0],
            format!("main -> {}", parent_final.final_id)
        );
    }
}
