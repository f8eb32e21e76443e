//! Fragment dependency graph and topological ordering.
//!
//! A fragment depends on another when the other's temporary id appears
//! verbatim in its drained content. Sorting is dependencies-first so that a
//! dependency is hashed, and its final id known, before anything embedding it.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::drain_all::DrainedFragment;

/// Fragment id -> ids it references.
pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

/// Result of [`topological_sort`].
///
/// Every known id appears in exactly one of the two fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortResult {
    /// Ids in dependencies-first order.
    pub sorted: Vec<String>,
    /// Ids that are part of a reference cycle.
    pub in_cycle: BTreeSet<String>,
}

/// Ids from `known` that appear verbatim in `content`.
pub fn find_referenced_ids<'a, I>(content: &str, known: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    known
        .into_iter()
        .filter(|id| content.contains(id))
        .map(str::to_owned)
        .collect()
}

/// Build the dependency graph of drained fragments.
///
/// Self-references are not recorded.
pub fn build_dependency_graph(fragments: &[DrainedFragment]) -> DependencyGraph {
    let ids: Vec<&str> = fragments.iter().map(|f| f.id.as_str()).collect();
    fragments
        .iter()
        .map(|fragment| {
            let others = ids.iter().copied().filter(|id| *id != fragment.id);
            (
                fragment.id.clone(),
                find_referenced_ids(&fragment.content, others),
            )
        })
        .collect()
}

/// Order `deps` dependencies-first and separate out cycle members.
///
/// References to ids that are not keys of `deps` are ignored. A node that
/// references itself is a cycle of one. A node depending on a cycle member
/// is still sorted; only members of the cycle itself are excluded.
/// Ready nodes are taken in id order, so the result is deterministic.
pub fn topological_sort(deps: &DependencyGraph) -> SortResult {
    let mut graph = DiGraphMap::<&str, ()>::new();
    for id in deps.keys() {
        graph.add_node(id.as_str());
    }
    for (id, targets) in deps {
        for target in targets.iter().filter(|t| deps.contains_key(*t)) {
            graph.add_edge(id.as_str(), target.as_str(), ());
        }
    }

    let in_cycle: BTreeSet<String> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(str::to_owned)
        .collect();

    // Kahn's algorithm over the acyclic remainder. Edges into cycle members
    // are treated as satisfied.
    let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for id in graph.nodes().filter(|id| !in_cycle.contains(*id)) {
        let mut count = 0;
        for dep in graph.neighbors(id).filter(|dep| !in_cycle.contains(*dep)) {
            dependents.entry(dep).or_default().push(id);
            count += 1;
        }
        remaining.insert(id, count);
    }

    let mut queue: VecDeque<&str> = remaining
        .iter()
        .filter(|&(_, count)| *count == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut sorted = Vec::with_capacity(remaining.len());

    while let Some(id) = queue.pop_front() {
        sorted.push(id.to_owned());
        let Some(waiting) = dependents.get_mut(id) else {
            continue;
        };
        waiting.sort_unstable();
        for dependent in waiting.iter() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(*dependent);
                }
            }
        }
    }

    // Every strongly connected component was removed above.
    debug_assert_eq!(sorted.len(), remaining.len(), "acyclic remainder left unsorted");

    SortResult { sorted, in_cycle }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        edges
            .iter()
            .map(|(id, deps)| {
                (
                    (*id).to_owned(),
                    deps.iter().map(|d| (*d).to_owned()).collect(),
                )
            })
            .collect()
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| (*id).to_owned()).collect()
    }

    fn position(result: &SortResult, id: &str) -> usize {
        result.sorted.iter().position(|s| s == id).unwrap()
    }

    #[test]
    fn test_empty_graph() {
        let result = topological_sort(&DependencyGraph::new());
        assert!(result.sorted.is_empty());
        assert!(result.in_cycle.is_empty());
    }

    #[test]
    fn test_independent_nodes() {
        let result = topological_sort(&graph(&[("a", &[]), ("b", &[]), ("c", &[])]));
        let sorted: BTreeSet<_> = result.sorted.iter().cloned().collect();
        assert_eq!(sorted, set(&["a", "b", "c"]));
        assert!(result.in_cycle.is_empty());
    }

    #[test]
    fn test_linear_chain_dependencies_first() {
        // a references b, b references c
        let result = topological_sort(&graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]));
        assert_eq!(result.sorted, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_diamond() {
        let result = topological_sort(&graph(&[
            ("root", &["left", "right"]),
            ("left", &["leaf"]),
            ("right", &["leaf"]),
            ("leaf", &[]),
        ]));
        assert_eq!(result.sorted.len(), 4);
        assert!(position(&result, "leaf") < position(&result, "left"));
        assert!(position(&result, "leaf") < position(&result, "right"));
        assert!(position(&result, "left") < position(&result, "root"));
        assert!(position(&result, "right") < position(&result, "root"));
    }

    #[test]
    fn test_mutual_cycle() {
        let result = topological_sort(&graph(&[("a", &["b"]), ("b", &["a"])]));
        assert!(result.sorted.is_empty());
        assert_eq!(result.in_cycle, set(&["a", "b"]));
    }

    #[test]
    fn test_self_reference_is_cycle_of_one() {
        let result = topological_sort(&graph(&[("a", &["a"]), ("b", &[])]));
        assert_eq!(result.sorted, vec!["b"]);
        assert_eq!(result.in_cycle, set(&["a"]));
    }

    #[test]
    fn test_dependent_of_cycle_still_sorts() {
        let result = topological_sort(&graph(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["b"]),
            ("d", &[]),
        ]));
        assert_eq!(result.in_cycle, set(&["b", "c"]));
        let sorted: BTreeSet<_> = result.sorted.iter().cloned().collect();
        assert_eq!(sorted, set(&["a", "d"]));
    }

    #[test]
    fn test_every_node_is_sorted_or_in_a_cycle() {
        let deps = graph(&[
            ("a", &["b", "e"]),
            ("b", &["c"]),
            ("c", &["a"]),
            ("d", &["a", "f"]),
            ("e", &["e"]),
            ("f", &[]),
            ("g", &["d"]),
        ]);
        let result = topological_sort(&deps);

        assert_eq!(result.in_cycle, set(&["a", "b", "c", "e"]));
        assert_eq!(result.sorted, vec!["f", "d", "g"]);
        assert_eq!(result.sorted.len() + result.in_cycle.len(), deps.len());
    }

    #[test]
    fn test_unknown_references_ignored() {
        let result = topological_sort(&graph(&[("a", &["zzz"]), ("b", &["a", "nope"])]));
        assert_eq!(result.sorted, vec!["a", "b"]);
        assert!(result.in_cycle.is_empty());
    }

    #[test]
    fn test_find_referenced_ids() {
        let refs = find_referenced_ids("see id-1 and id-3", ["id-1", "id-2", "id-3"]);
        assert_eq!(refs, set(&["id-1", "id-3"]));
    }

    #[test]
    fn test_build_graph_skips_self_references() {
        let fragments = vec![
            DrainedFragment {
                id: "x".to_owned(),
                content: "x mentions y".to_owned(),
                name: None,
            },
            DrainedFragment {
                id: "y".to_owned(),
                content: "plain".to_owned(),
                name: None,
            },
        ];
        let deps = build_dependency_graph(&fragments);
        assert_eq!(deps["x"], set(&["y"]));
        assert!(deps["y"].is_empty());
    }
}
