//
//  dominators.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::algo::dominators::simple_fast;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::graph::CodeGraph;
use crate::symbol::{SymbolIndex, SymbolKind};

/// Dominator and post-dominator trees over the frozen graph, rooted at
/// a virtual node over the detected entries.
#[derive(Debug, Clone)]
pub struct DominatorInfo {
    /// Immediate dominator per reachable node. The virtual root is not
    /// a key; entry nodes map to it and are recorded in `entries`.
    idom: HashMap<NodeIndex, Option<NodeIndex>>,
    /// Immediate post-dominator per node that reaches an exit.
    postdom: HashMap<NodeIndex, Option<NodeIndex>>,
    pub entries: Vec<NodeIndex>,
}

impl DominatorInfo {
    /// True when `a` dominates `b` (every path from an entry to `b`
    /// passes through `a`). Reflexive.
    pub fn dominates(&self, a: NodeIndex, b: NodeIndex) -> bool {
        let mut cursor = Some(b);
        while let Some(n) = cursor {
            if n == a {
                return true;
            }
            cursor = match self.idom.get(&n) {
                Some(&parent) => parent,
                None => return false,
            };
        }
        false
    }

    /// True when `b` post-dominates `a`. Reflexive.
    pub fn postdominates(&self, b: NodeIndex, a: NodeIndex) -> bool {
        let mut cursor = Some(a);
        while let Some(n) = cursor {
            if n == b {
                return true;
            }
            cursor = match self.postdom.get(&n) {
                Some(&parent) => parent,
                None => return false,
            };
        }
        false
    }

    pub fn is_reachable(&self, n: NodeIndex) -> bool {
        self.idom.contains_key(&n)
    }

    /// Walk the post-dominator chain of `n`, excluding `n` itself.
    pub fn postdominator_chain(&self, n: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut cursor = self.postdom.get(&n).copied().flatten();
        while let Some(p) = cursor {
            chain.push(p);
            cursor = self.postdom.get(&p).copied().flatten();
        }
        chain
    }
}

/// Entry-point rules shared by dead-code analysis and the dominator
/// roots: well-known names, Test-prefixed callables, interface
/// methods, and exported symbols.
pub fn is_entry_point(graph: &CodeGraph, index: &SymbolIndex, idx: NodeIndex) -> bool {
    let node = graph.node_at(idx);
    has_entry_name(&node.name, node.kind) || node.exported || is_interface_method(index, idx, graph)
}

/// Well-known entry names plus Test-prefixed callables.
pub fn has_entry_name(name: &str, kind: SymbolKind) -> bool {
    matches!(name, "main" | "Main" | "init" | "Init")
        || (name.starts_with("Test") && matches!(kind, SymbolKind::Function | SymbolKind::Method))
}

/// A method whose receiver resolves to an interface type.
pub fn is_interface_method(index: &SymbolIndex, idx: NodeIndex, graph: &CodeGraph) -> bool {
    let node = graph.node_at(idx);
    if node.receiver.is_empty() {
        return false;
    }
    index
        .named(&node.receiver)
        .iter()
        .any(|s| s.kind == SymbolKind::Interface)
}

/// Compute dominators and post-dominators. A virtual root feeds every
/// entry node (and every in-degree-0 node, so isolated subgraphs get
/// dominance info); a virtual exit drains every out-degree-0 node.
pub fn compute(graph: &CodeGraph, index: &SymbolIndex) -> DominatorInfo {
    let n = graph.node_count();

    let mut entries: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&idx| is_entry_point(graph, index, idx) || graph.in_degree(idx) == 0)
        .collect();
    entries.sort_by(|a, b| graph.node_at(*a).id.cmp(&graph.node_at(*b).id));

    // Forward graph plus virtual root.
    let mut forward: DiGraph<(), ()> = DiGraph::with_capacity(n + 1, graph.edge_count() + entries.len());
    for _ in 0..=n {
        forward.add_node(());
    }
    let root = NodeIndex::new(n);
    for edge in graph.inner().edge_references() {
        forward.add_edge(
            NodeIndex::new(edge.source().index()),
            NodeIndex::new(edge.target().index()),
            (),
        );
    }
    for &entry in &entries {
        forward.add_edge(root, NodeIndex::new(entry.index()), ());
    }

    let dom = simple_fast(&forward, root);
    let mut idom: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::new();
    for idx in graph.node_indices() {
        if let Some(parent) = dom.immediate_dominator(NodeIndex::new(idx.index())) {
            let mapped = if parent == root {
                None
            } else {
                Some(NodeIndex::new(parent.index()))
            };
            idom.insert(idx, mapped);
        }
    }

    // Reversed graph plus virtual exit.
    let mut backward: DiGraph<(), ()> = DiGraph::with_capacity(n + 1, graph.edge_count() + n);
    for _ in 0..=n {
        backward.add_node(());
    }
    let exit = NodeIndex::new(n);
    for edge in graph.inner().edge_references() {
        backward.add_edge(
            NodeIndex::new(edge.target().index()),
            NodeIndex::new(edge.source().index()),
            (),
        );
    }
    for idx in graph.node_indices() {
        if graph.out_degree(idx) == 0 {
            backward.add_edge(exit, NodeIndex::new(idx.index()), ());
        }
    }

    let pdom = simple_fast(&backward, exit);
    let mut postdom: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::new();
    for idx in graph.node_indices() {
        if let Some(parent) = pdom.immediate_dominator(NodeIndex::new(idx.index())) {
            let mapped = if parent == exit {
                None
            } else {
                Some(NodeIndex::new(parent.index()))
            };
            postdom.insert(idx, mapped);
        }
    }

    DominatorInfo {
        idom,
        postdom,
        entries,
    }
}
