//! Dependency ordering for field computations
//!
//! Kahn's algorithm with a min-heap keyed by insertion order, so fields with
//! no dependency between them keep their declaration order. Ties never
//! depend on hash iteration; the output is fully deterministic.

use std::collections::BinaryHeap;
use std::cmp::Reverse;

use crate::error::{Error, Result};

/// Typed node key of the computation graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TopoId {
    /// An entity field's pipeline
    Field(String),
    /// An interface parameter's pipeline
    Param(String),
}

impl std::fmt::Display for TopoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopoId::Field(name) => write!(f, "@{name}"),
            TopoId::Param(name) => write!(f, "${name}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct TopoGraph {
    nodes: Vec<TopoId>,
    /// edges[i] = nodes that must wait for node i
    edges: Vec<Vec<usize>>,
}

impl TopoGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, id: &TopoId) -> Option<usize> {
        self.nodes.iter().position(|n| n == id)
    }

    /// Add a node exactly once; a second add of the same id is an error
    pub fn add_node(&mut self, id: TopoId) -> Result<()> {
        if self.index_of(&id).is_some() {
            return Err(Error::DuplicateNode {
                node: id.to_string(),
            });
        }
        self.nodes.push(id);
        self.edges.push(Vec::new());
        Ok(())
    }

    /// Record that `before` must be computed before `after`
    pub fn add_edge(&mut self, before: &TopoId, after: &TopoId) -> Result<()> {
        if before == after {
            return Err(Error::SelfDependency {
                node: before.to_string(),
            });
        }
        let from = self.index_of(before).ok_or_else(|| Error::UnknownNode {
            node: before.to_string(),
            from: after.to_string(),
        })?;
        let to = self.index_of(after).ok_or_else(|| Error::UnknownNode {
            node: after.to_string(),
            from: before.to_string(),
        })?;
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stable topological order; insertion order breaks ties
    pub fn sort(&self) -> Result<Vec<TopoId>> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for targets in &self.edges {
            for &to in targets {
                in_degree[to] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(current)) = ready.pop() {
            order.push(self.nodes[current].clone());
            for &to in &self.edges[current] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    ready.push(Reverse(to));
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(i, _)| self.nodes[i].to_string())
                .collect();
            return Err(Error::DependencyCycle {
                nodes: stuck.join(", "),
            });
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> TopoId {
        TopoId::Field(name.to_string())
    }

    #[test]
    fn declaration_order_without_edges() {
        let mut g = TopoGraph::new();
        for name in ["c", "a", "b"] {
            g.add_node(field(name)).unwrap();
        }
        let order = g.sort().unwrap();
        assert_eq!(order, vec![field("c"), field("a"), field("b")]);
    }

    #[test]
    fn dependencies_override_declaration_order() {
        let mut g = TopoGraph::new();
        for name in ["slug", "name", "vendor"] {
            g.add_node(field(name)).unwrap();
        }
        g.add_edge(&field("name"), &field("slug")).unwrap();
        g.add_edge(&field("vendor"), &field("slug")).unwrap();
        let order = g.sort().unwrap();
        assert_eq!(order, vec![field("name"), field("vendor"), field("slug")]);
    }

    #[test]
    fn duplicate_node_is_an_error() {
        let mut g = TopoGraph::new();
        g.add_node(field("a")).unwrap();
        assert!(matches!(
            g.add_node(field("a")),
            Err(Error::DuplicateNode { .. })
        ));
    }

    #[test]
    fn params_and_fields_do_not_collide() {
        let mut g = TopoGraph::new();
        g.add_node(field("a")).unwrap();
        g.add_node(TopoId::Param("a".to_string())).unwrap();
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn self_edge_is_an_error() {
        let mut g = TopoGraph::new();
        g.add_node(field("a")).unwrap();
        assert!(matches!(
            g.add_edge(&field("a"), &field("a")),
            Err(Error::SelfDependency { .. })
        ));
    }

    #[test]
    fn cycle_reports_the_members() {
        let mut g = TopoGraph::new();
        for name in ["a", "b", "c"] {
            g.add_node(field(name)).unwrap();
        }
        g.add_edge(&field("a"), &field("b")).unwrap();
        g.add_edge(&field("b"), &field("a")).unwrap();
        let err = g.sort().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("@a") && text.contains("@b"));
        assert!(!text.contains("@c"));
    }

    #[test]
    fn unknown_edge_endpoint_is_an_error() {
        let mut g = TopoGraph::new();
        g.add_node(field("a")).unwrap();
        assert!(matches!(
            g.add_edge(&field("a"), &field("ghost")),
            Err(Error::UnknownNode { .. })
        ));
    }
}
