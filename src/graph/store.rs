//
//  store.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use super::types::{EdgeData, EdgeKind, GraphStats, NodeData, PathMode};
use crate::error::{LatticeError, Result};
use crate::symbol::Symbol;

/// The code graph — a directed multigraph over symbol ids with a
/// monotone freeze bit. Ingest populates it; after `freeze` it is
/// observationally immutable and safe for parallel readers.
pub struct CodeGraph {
    /// The directed graph storing code relationships.
    graph: DiGraph<NodeData, EdgeData>,
    /// Index: symbol id -> node index.
    id_index: HashMap<String, NodeIndex>,
    /// Root project path the ids are relative to.
    root: PathBuf,
    /// Set once by `freeze`; never cleared.
    frozen: AtomicBool,
}

impl CodeGraph {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
            root: root.into(),
            frozen: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Access the underlying petgraph (for analytics).
    pub(crate) fn inner(&self) -> &DiGraph<NodeData, EdgeData> {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &NodeData {
        &self.graph[idx]
    }

    // ─── Ingest (pre-freeze only) ───────────────────────────────

    /// Add a node for a symbol. Adding an id that is already present is
    /// a no-op returning the existing index.
    pub fn add_node(&mut self, symbol: &Symbol) -> Result<NodeIndex> {
        if self.is_frozen() {
            return Err(LatticeError::internal("add_node on a frozen graph"));
        }
        if let Some(&idx) = self.id_index.get(&symbol.id) {
            return Ok(idx);
        }
        let idx = self.graph.add_node(NodeData::from_symbol(symbol));
        self.id_index.insert(symbol.id.clone(), idx);
        Ok(idx)
    }

    /// Add an edge between two symbol ids. Both endpoints must already
    /// be nodes. Self-loops and parallel edges are permitted — parallel
    /// edges are how multiple call sites are recorded.
    pub fn add_edge(&mut self, from_id: &str, to_id: &str, data: EdgeData) -> Result<()> {
        if self.is_frozen() {
            return Err(LatticeError::internal("add_edge on a frozen graph"));
        }
        let from = self
            .id_index
            .get(from_id)
            .copied()
            .ok_or_else(|| LatticeError::internal(format!("edge references unknown node '{}'", from_id)))?;
        let to = self
            .id_index
            .get(to_id)
            .copied()
            .ok_or_else(|| LatticeError::internal(format!("edge references unknown node '{}'", to_id)))?;
        self.graph.add_edge(from, to, data);
        Ok(())
    }

    /// Transition to read-only. Idempotent.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    // ─── Read side ──────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeData> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// Outgoing edges of a node: (edge payload, target node).
    pub fn out_edges(&self, id: &str) -> Vec<(&EdgeData, &NodeData)> {
        self.edges(id, Direction::Outgoing)
    }

    /// Incoming edges of a node: (edge payload, source node).
    pub fn in_edges(&self, id: &str) -> Vec<(&EdgeData, &NodeData)> {
        self.edges(id, Direction::Incoming)
    }

    fn edges(&self, id: &str, dir: Direction) -> Vec<(&EdgeData, &NodeData)> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.weight(), &self.graph[other])
            })
            .collect()
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Iterate node payloads in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn stats(&self) -> GraphStats {
        let mut max_out = 0;
        let mut max_in = 0;
        for idx in self.graph.node_indices() {
            max_out = max_out.max(self.out_degree(idx));
            max_in = max_in.max(self.in_degree(idx));
        }
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            frozen: self.is_frozen(),
            max_out_degree: max_out,
            max_in_degree: max_in,
        }
    }

    // ─── Shortest path ──────────────────────────────────────────

    /// BFS shortest path between two ids. Returns the node-id path
    /// including both endpoints, or `None` when no path exists (tool
    /// boundary renders that as length -1). Cancellation is sampled
    /// once per BFS layer.
    pub fn shortest_path(
        &self,
        from_id: &str,
        to_id: &str,
        mode: PathMode,
        token: &CancellationToken,
    ) -> Result<Option<Vec<String>>> {
        let Some(from) = self.index_of(from_id) else {
            return Ok(None);
        };
        let Some(to) = self.index_of(to_id) else {
            return Ok(None);
        };
        if from == to {
            return Ok(Some(vec![from_id.to_string()]));
        }

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut frontier: VecDeque<NodeIndex> = VecDeque::new();
        visited.insert(from);
        frontier.push_back(from);

        while !frontier.is_empty() {
            if token.is_cancelled() {
                return Err(LatticeError::cancelled("shortest_path"));
            }
            let mut next: VecDeque<NodeIndex> = VecDeque::new();
            while let Some(idx) = frontier.pop_front() {
                for neighbor in self.step_neighbors(idx, mode) {
                    if visited.insert(neighbor) {
                        parent.insert(neighbor, idx);
                        if neighbor == to {
                            return Ok(Some(self.reconstruct(&parent, from, to)));
                        }
                        next.push_back(neighbor);
                    }
                }
            }
            frontier = next;
        }

        Ok(None)
    }

    fn step_neighbors(&self, idx: NodeIndex, mode: PathMode) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        if mode == PathMode::Undirected {
            out.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
        }
        out
    }

    fn reconstruct(
        &self,
        parent: &HashMap<NodeIndex, NodeIndex>,
        from: NodeIndex,
        to: NodeIndex,
    ) -> Vec<String> {
        let mut path = vec![self.graph[to].id.clone()];
        let mut cursor = to;
        while cursor != from {
            cursor = parent[&cursor];
            path.push(self.graph[cursor].id.clone());
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, SymbolKind};

    fn sym(name: &str, file: &str, line: u32) -> Symbol {
        Symbol::new(name, SymbolKind::Function, file, line)
    }

    fn graph_of(edges: &[(&str, &str)]) -> CodeGraph {
        let mut graph = CodeGraph::new(".");
        let mut seen: HashSet<&str> = HashSet::new();
        for &(a, b) in edges {
            for name in [a, b] {
                if seen.insert(name) {
                    graph.add_node(&sym(name, "src/lib.rs", 1)).unwrap();
                }
            }
        }
        for (a, b) in edges {
            graph
                .add_edge(
                    &format!("src/lib.rs:1:{}", a),
                    &format!("src/lib.rs:1:{}", b),
                    EdgeData::new(EdgeKind::Calls),
                )
                .unwrap();
        }
        graph
    }

    fn id(name: &str) -> String {
        format!("src/lib.rs:1:{}", name)
    }

    #[test]
    fn test_freeze_is_idempotent_and_blocks_mutation() {
        let mut graph = CodeGraph::new(".");
        graph.add_node(&sym("main", "main.go", 1)).unwrap();
        graph.freeze();
        graph.freeze();
        assert!(graph.is_frozen());

        let err = graph.add_node(&sym("late", "late.go", 1)).unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_duplicate_node_is_noop() {
        let mut graph = CodeGraph::new(".");
        let a = graph.add_node(&sym("main", "main.go", 1)).unwrap();
        let b = graph.add_node(&sym("main", "main.go", 1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_parallel_edges_record_call_sites() {
        let mut graph = CodeGraph::new(".");
        graph.add_node(&sym("caller", "a.go", 1)).unwrap();
        graph.add_node(&sym("callee", "b.go", 1)).unwrap();
        graph
            .add_edge("a.go:1:caller", "b.go:1:callee", EdgeData::at(EdgeKind::Calls, "a.go", 3))
            .unwrap();
        graph
            .add_edge("a.go:1:caller", "b.go:1:callee", EdgeData::at(EdgeKind::Calls, "a.go", 7))
            .unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.out_edges("a.go:1:caller").len(), 2);
        assert_eq!(graph.in_edges("b.go:1:callee").len(), 2);
    }

    #[test]
    fn test_edge_to_unknown_node_is_rejected() {
        let mut graph = CodeGraph::new(".");
        graph.add_node(&sym("main", "main.go", 1)).unwrap();
        let err = graph
            .add_edge("main.go:1:main", "ghost.go:1:ghost", EdgeData::new(EdgeKind::Calls))
            .unwrap_err();
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn test_self_loop_allowed() {
        let mut graph = CodeGraph::new(".");
        graph.add_node(&sym("recurse", "r.go", 1)).unwrap();
        graph
            .add_edge("r.go:1:recurse", "r.go:1:recurse", EdgeData::new(EdgeKind::Calls))
            .unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_shortest_path_directed() {
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("a", "d")]);
        let token = CancellationToken::new();

        let path = graph
            .shortest_path(&id("a"), &id("c"), PathMode::Directed, &token)
            .unwrap()
            .unwrap();
        assert_eq!(path, vec![id("a"), id("b"), id("c")]);

        // No directed path backwards
        let back = graph
            .shortest_path(&id("c"), &id("a"), PathMode::Directed, &token)
            .unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn test_shortest_path_undirected_reaches_backwards() {
        let graph = graph_of(&[("a", "b"), ("b", "c")]);
        let token = CancellationToken::new();
        let path = graph
            .shortest_path(&id("c"), &id("a"), PathMode::Undirected, &token)
            .unwrap()
            .unwrap();
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_shortest_path_minimality() {
        // Two routes a->...->e: length 2 via x, length 3 via y,z
        let graph = graph_of(&[("a", "x"), ("x", "e"), ("a", "y"), ("y", "z"), ("z", "e")]);
        let token = CancellationToken::new();
        let path = graph
            .shortest_path(&id("a"), &id("e"), PathMode::Directed, &token)
            .unwrap()
            .unwrap();
        assert_eq!(path.len() - 1, 2);
    }

    #[test]
    fn test_shortest_path_same_node() {
        let graph = graph_of(&[("a", "b")]);
        let token = CancellationToken::new();
        let path = graph
            .shortest_path(&id("a"), &id("a"), PathMode::Directed, &token)
            .unwrap()
            .unwrap();
        assert_eq!(path, vec![id("a")]);
    }

    #[test]
    fn test_shortest_path_cancelled() {
        let graph = graph_of(&[("a", "b"), ("b", "c")]);
        let token = CancellationToken::new();
        token.cancel();
        let err = graph
            .shortest_path(&id("a"), &id("c"), PathMode::Directed, &token)
            .unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }
}
