//! A minimal directed graph with DFS-style fallback-chain walking and cycle
//! detection, used by the Cross-Document Validator for manifest item
//! `fallback` chains (OPF-043/045).

use std::collections::HashMap;

/// A directed graph over manifest item ids, at most one outgoing edge per
/// node (an item has at most one `fallback` target).
#[derive(Default)]
pub(crate) struct FallbackGraph {
    edges: HashMap<String, String>,
}

impl FallbackGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.insert(from.into(), to.into());
    }

    fn successor(&self, node: &str) -> Option<&str> {
        self.edges.get(node).map(String::as_str)
    }

    /// Walks the single-successor chain starting at `start`, stopping when
    /// `is_core` accepts a node, a cycle is detected, or the chain runs off
    /// the end (a node with no `fallback` and `is_core(node) == false`).
    pub(crate) fn walk(&self, start: &str, is_core: impl Fn(&str) -> bool) -> FallbackWalk {
        let mut visited: Vec<String> = Vec::new();
        let mut current = start.to_string();
        loop {
            if is_core(&current) {
                return FallbackWalk::Terminal(current);
            }
            if let Some(index) = visited.iter().position(|id| *id == current) {
                return FallbackWalk::Cycle(canonicalize_cycle(&visited[index..]));
            }
            visited.push(current.clone());
            match self.successor(&current) {
                Some(next) => current = next.to_string(),
                None => return FallbackWalk::Dangling(visited),
            }
        }
    }
}

/// The outcome of walking a manifest item's `fallback` chain.
pub(crate) enum FallbackWalk {
    /// The chain reached a core-media-type item.
    Terminal(#[allow(dead_code)] String),
    /// The chain returns to a node already on the path; canonicalized so the
    /// same cycle reported from any member node compares equal.
    Cycle(Vec<String>),
    /// The chain ends at a non-core item with no further `fallback`.
    Dangling(Vec<String>),
}

/// Rotates `cycle` to start at its lexicographically smallest id, so the
/// same cycle walked from any starting node produces an identical key and
/// is reported once regardless of which member node is visited first.
fn canonicalize_cycle(cycle: &[String]) -> Vec<String> {
    if cycle.is_empty() {
        return Vec::new();
    }
    let min_index = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| id.as_str())
        .map(|(index, _)| index)
        .unwrap_or(0);
    cycle[min_index..]
        .iter()
        .chain(cycle[..min_index].iter())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_to_terminal_core_item() {
        let mut graph = FallbackGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        match graph.walk("a", |id| id == "c") {
            FallbackWalk::Terminal(id) => assert_eq!(id, "c"),
            _ => panic!("expected terminal"),
        }
    }

    #[test]
    fn detects_cycle_and_canonicalizes() {
        let mut graph = FallbackGraph::new();
        graph.add_edge("b", "c");
        graph.add_edge("c", "a");
        graph.add_edge("a", "b");
        let from_a = match graph.walk("a", |_| false) {
            FallbackWalk::Cycle(cycle) => cycle,
            _ => panic!("expected cycle"),
        };
        let from_b = match graph.walk("b", |_| false) {
            FallbackWalk::Cycle(cycle) => cycle,
            _ => panic!("expected cycle"),
        };
        assert_eq!(from_a, from_b);
        assert_eq!(from_a[0], "a");
    }

    #[test]
    fn dangling_chain_has_no_successor() {
        let mut graph = FallbackGraph::new();
        graph.add_edge("a", "b");
        match graph.walk("a", |_| false) {
            FallbackWalk::Dangling(path) => assert_eq!(path, vec!["a".to_string(), "b".to_string()]),
            _ => panic!("expected dangling"),
        }
    }
}
