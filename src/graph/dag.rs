//! dag.rs
//! The per-configuration dependency graph and its traversal algorithms.
//! Vertices are addressed by `NodeId` (a petgraph index); an edge `x -> y`
//! means `x` must be built before `y`.

use super::node::{Node, NodeLabel, Reference};
use crate::market::MarketObject;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A unique, stable identifier for a node within one graph.
pub type NodeId = NodeIndex;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    configuration: String,
    pub(crate) graph: DiGraph<Node, Reference>,
    index: HashMap<(MarketObject, String), NodeId>,
}

impl DependencyGraph {
    pub fn new(configuration: &str) -> Self {
        Self { configuration: configuration.to_string(), ..Default::default() }
    }

    pub fn configuration(&self) -> &str { &self.configuration }

    pub fn node_count(&self) -> usize { self.graph.node_count() }

    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    /// Adds a node, or returns the existing one with the same kind and name.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let key = (node.kind, node.name.clone());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.graph.add_node(node);
        self.index.insert(key, id);
        id
    }

    /// Records that `dependent` needs `required` (through `reference`).
    pub fn add_dependency(&mut self, required: NodeId, dependent: NodeId, reference: Reference) {
        self.graph.add_edge(required, dependent, reference);
    }

    pub fn find(&self, kind: MarketObject, name: &str) -> Option<NodeId> {
        self.index.get(&(kind, name.to_string())).copied()
    }

    /// The first node, in declaration order, that provides `reference`.
    pub fn resolve(&self, reference: &Reference) -> Option<NodeId> {
        match reference {
            Reference::Object { kind, name } => self.find(*kind, name),
            Reference::Spec(_) => self.node_ids().find(|&id| self.graph[id].provides(reference)),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node { &self.graph[id] }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node { &mut self.graph[id] }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ { self.graph.node_indices() }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ { self.graph.node_weights() }

    pub fn label(&self, id: NodeId) -> NodeLabel { self.graph[id].label() }

    /// Direct dependencies of `id` with the reference each one satisfies,
    /// ordered by parent id.
    pub fn parents(&self, id: NodeId) -> Vec<(NodeId, &Reference)> {
        let mut out: Vec<(NodeId, &Reference)> = self
            .graph
            .edges_directed(id, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        out.sort_by_key(|(p, _)| *p);
        out
    }

    // --- Graph Algorithms ---

    /// Returns a topological sort using Kahn's Algorithm. Among ready nodes
    /// the one declared first goes first, so the order is deterministic.
    ///
    /// On failure, returns the members of every cycle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, Vec<Vec<NodeId>>> {
        let count = self.graph.node_count();
        let mut in_degree = vec![0usize; count];
        let mut ready = BTreeSet::new();
        let mut order = Vec::with_capacity(count);

        // 1. Initialize In-Degrees O(N)
        for id in self.graph.node_indices() {
            in_degree[id.index()] = self.graph.edges_directed(id, Direction::Incoming).count();
            if in_degree[id.index()] == 0 {
                ready.insert(id);
            }
        }

        // 2. Process ready set
        while let Some(node) = ready.pop_first() {
            order.push(node);
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let child = edge.target();
                in_degree[child.index()] -= 1;
                if in_degree[child.index()] == 0 {
                    ready.insert(child);
                }
            }
        }

        if order.len() != count {
            return Err(self.cycles());
        }

        Ok(order)
    }

    /// Strongly connected components that form a cycle (size > 1, or a
    /// node depending on itself), members sorted by id.
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// The target and everything it transitively depends on, dependencies
    /// first. Uses a recursive DFS so the post-order is a topological sort
    /// of the closure.
    pub fn upstream_order(&self, target: NodeId) -> Result<Vec<NodeId>, Vec<NodeId>> {
        let mut order = Vec::new();
        let mut visiting = Vec::new();
        let mut visited = HashSet::new();
        self.visit_upstream(target, &mut order, &mut visiting, &mut visited)?;
        Ok(order)
    }

    fn visit_upstream(
        &self,
        node: NodeId,
        order: &mut Vec<NodeId>,
        visiting: &mut Vec<NodeId>,
        visited: &mut HashSet<NodeId>,
    ) -> Result<(), Vec<NodeId>> {
        if visited.contains(&node) {
            return Ok(());
        }
        // Reaching a node on the current path means a cycle; report the path segment.
        if let Some(pos) = visiting.iter().position(|&n| n == node) {
            let mut cycle = visiting[pos..].to_vec();
            cycle.sort();
            return Err(cycle);
        }

        visiting.push(node);
        for (parent, _) in self.parents(node) {
            self.visit_upstream(parent, order, visiting, visited)?;
        }
        visiting.pop();

        visited.insert(node);
        order.push(node);
        Ok(())
    }

    /// Groups a topological order into levels: a node's level is one more
    /// than the deepest of its dependencies. Nodes within a level share no
    /// edge and keep their relative order.
    pub fn levels(&self, order: &[NodeId]) -> Vec<Vec<NodeId>> {
        let mut depth: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
        let mut levels: Vec<Vec<NodeId>> = Vec::new();
        for &id in order {
            let level = self
                .parents(id)
                .iter()
                .filter_map(|(p, _)| depth.get(p))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(id, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(id);
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(g: &mut DependencyGraph, name: &str) -> NodeId {
        g.add_node(Node::new(MarketObject::YieldCurve, name, "", None))
    }

    fn dep(g: &mut DependencyGraph, required: NodeId, dependent: NodeId) {
        let name = g.node(required).name.clone();
        g.add_dependency(required, dependent, Reference::Object { kind: MarketObject::YieldCurve, name });
    }

    #[test]
    fn test_sort_diamond_dependency() {
        // Shape: A -> B, A -> C, B+C -> D
        let mut g = DependencyGraph::new("default");
        let d = add(&mut g, "D");
        let c = add(&mut g, "C");
        let b = add(&mut g, "B");
        let a = add(&mut g, "A");
        dep(&mut g, a, b);
        dep(&mut g, a, c);
        dep(&mut g, b, d);
        dep(&mut g, c, d);

        let res = g.topological_order().expect("Sort failed");
        let pos = |id: NodeId| res.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
        // C was declared before B, so it is built first.
        assert!(pos(c) < pos(b));

        let levels = g.levels(&res);
        assert_eq!(levels, vec![vec![a], vec![c, b], vec![d]]);
    }

    #[test]
    fn test_cycle_reports_all_members() {
        let mut g = DependencyGraph::new("default");
        let a = add(&mut g, "A");
        let b = add(&mut g, "B");
        let c = add(&mut g, "C");
        let free = add(&mut g, "Free");
        dep(&mut g, a, b);
        dep(&mut g, b, c);
        dep(&mut g, c, a);

        let cycles = g.topological_order().unwrap_err();
        assert_eq!(cycles, vec![vec![a, b, c]]);
        assert!(!cycles[0].contains(&free));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut g = DependencyGraph::new("default");
        let a = add(&mut g, "A");
        dep(&mut g, a, a);
        assert_eq!(g.cycles(), vec![vec![a]]);
    }

    #[test]
    fn test_upstream_order_excludes_unrelated_nodes() {
        let mut g = DependencyGraph::new("default");
        let a = add(&mut g, "A");
        let b = add(&mut g, "B");
        let c = add(&mut g, "C");
        let unrelated = add(&mut g, "U");
        dep(&mut g, c, b);
        dep(&mut g, b, a);
        dep(&mut g, c, unrelated);

        assert_eq!(g.upstream_order(a).unwrap(), vec![c, b, a]);
    }

    #[test]
    fn test_add_node_is_idempotent_by_label() {
        let mut g = DependencyGraph::new("default");
        let a1 = add(&mut g, "A");
        let a2 = add(&mut g, "A");
        assert_eq!(a1, a2);
        assert_eq!(g.node_count(), 1);
    }
}
