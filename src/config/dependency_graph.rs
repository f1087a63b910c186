// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::observability::messages::validation::StartOrderCycle;
use crate::observability::messages::StructuredLog;
use std::collections::HashMap;

/// Newtype wrapper mapping each node to the nodes its output feeds.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph(pub HashMap<String, Vec<String>>);

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Build the graph from `(upstream, downstream)` node pairs.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_dependency(from, to);
        }
        graph
    }

    /// Record that `downstream` consumes output of `upstream`
    pub fn add_dependency(&mut self, upstream: &str, downstream: &str) {
        let dependents = self.0.entry(upstream.to_string()).or_default();
        if !dependents.iter().any(|d| d == downstream) {
            dependents.push(downstream.to_string());
        }
    }

    /// Get dependents for a node
    pub fn get_dependents(&self, node_id: &str) -> Option<&Vec<String>> {
        self.0.get(node_id)
    }

    /// Order in which nodes are set up: upstream before downstream.
    ///
    /// Uses Kahn's algorithm; nodes that become ready at the same time keep
    /// their declaration order. Nodes on a cycle cannot be ordered and are
    /// appended in declaration order.
    pub fn start_order(&self, declared: &[String]) -> Vec<String> {
        let mut in_degree: HashMap<&str, usize> =
            declared.iter().map(|id| (id.as_str(), 0)).collect();
        for dependents in self.0.values() {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut order: Vec<String> = Vec::with_capacity(declared.len());
        let mut placed = vec![false; declared.len()];
        loop {
            let next = declared
                .iter()
                .enumerate()
                .find(|(i, id)| !placed[*i] && in_degree.get(id.as_str()) == Some(&0));
            let Some((i, id)) = next else {
                break;
            };
            placed[i] = true;
            order.push(id.clone());
            for dependent in self.get_dependents(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree = degree.saturating_sub(1);
                }
            }
        }

        let cyclic: Vec<&str> = declared
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed[*i])
            .map(|(_, id)| id.as_str())
            .collect();
        if !cyclic.is_empty() {
            StartOrderCycle { members: &cyclic }.log();
            order.extend(cyclic.iter().map(|id| id.to_string()));
        }
        order
    }
}

impl From<HashMap<String, Vec<String>>> for DependencyGraph {
    fn from(graph: HashMap<String, Vec<String>>) -> Self {
        Self(graph)
    }
}

impl From<DependencyGraph> for HashMap<String, Vec<String>> {
    fn from(graph: DependencyGraph) -> Self {
        graph.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_upstream_starts_first() {
        let graph = DependencyGraph::from_edges([("Pc1", "Merge"), ("Pc2", "Merge")]);
        let order = graph.start_order(&ids(&["Merge", "Pc2", "Pc1"]));
        assert_eq!(order, ids(&["Pc2", "Pc1", "Merge"]));
    }

    #[test]
    fn test_unconnected_nodes_keep_declaration_order() {
        let graph = DependencyGraph::new();
        let order = graph.start_order(&ids(&["b", "a", "c"]));
        assert_eq!(order, ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_cycle_members_are_appended() {
        let graph = DependencyGraph::from_edges([("src", "a"), ("a", "b"), ("b", "a")]);
        let order = graph.start_order(&ids(&["a", "b", "src"]));
        assert_eq!(order, ids(&["src", "a", "b"]));
    }

    #[test]
    fn test_duplicate_edges_count_once() {
        let graph = DependencyGraph::from_edges([("a", "b"), ("a", "b")]);
        assert_eq!(graph.get_dependents("a").map(Vec::len), Some(1));
        assert_eq!(graph.start_order(&ids(&["b", "a"])), ids(&["a", "b"]));
    }
}
