//! Feature dependency graph using petgraph
//!
//! Built from a set of features for diagnostics: reporting circular feature
//! relationships and checking that one feature depends on another.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};

use provision_core::types::FeatureDefinition;

use crate::source::FeatureSource;
use crate::tree::dependency_candidates;

/// Directed graph of features, edges point from dependent to dependency
#[derive(Debug, Default)]
pub struct FeatureGraph {
    /// Underlying directed graph
    graph: DiGraph<String, ()>,
    /// Map from symbolic name to NodeIndex for fast lookups
    nodes: HashMap<String, NodeIndex>,
}

impl FeatureGraph {
    /// Create a new empty feature graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph over a set of features.
    ///
    /// Every resolvable candidate of a dependency that is part of the set
    /// becomes an edge.
    pub fn from_features<'f, I>(source: &dyn FeatureSource, features: I) -> Self
    where
        I: IntoIterator<Item = &'f Arc<FeatureDefinition>>,
    {
        let features: Vec<&Arc<FeatureDefinition>> = features.into_iter().collect();
        let mut graph = Self::new();

        for feature in &features {
            graph.add_feature(&feature.symbolic_name);
        }

        for feature in &features {
            for dependency in feature.dependencies() {
                for candidate in dependency_candidates(source, None, dependency) {
                    if graph.contains(&candidate.symbolic_name) {
                        graph.add_dependency(&feature.symbolic_name, &candidate.symbolic_name);
                    }
                }
            }
        }

        graph
    }

    /// Add a feature node, returning the existing index if present
    pub fn add_feature(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.nodes.get(name) {
            return *index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    /// Add a dependency edge, creating missing nodes
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from = self.add_feature(from);
        let to = self.add_feature(to);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Get number of features in the graph
    pub fn feature_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of dependency edges in the graph
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether `from` depends on `to` directly or transitively
    pub fn depends_on(&self, from: &str, to: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.nodes.get(from), self.nodes.get(to)) else {
            return false;
        };
        if from == to {
            return self.graph.find_edge(from, to).is_some();
        }
        has_path_connecting(&self.graph, from, to, None)
    }

    /// Groups of features that depend on each other, each sorted by name
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self.graph.find_edge(component[0], component[0]).is_some()
            })
            .map(|component| {
                let mut names: Vec<String> = component
                    .into_iter()
                    .map(|index| self.graph[index].clone())
                    .collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Format cycle as "a -> b -> a"
    pub fn format_cycle(cycle: &[String]) -> String {
        match cycle.first() {
            Some(first) => {
                let mut closed = cycle.to_vec();
                closed.push(first.clone());
                closed.join(" -> ")
            }
            None => "No cycle".to_string(),
        }
    }
}
