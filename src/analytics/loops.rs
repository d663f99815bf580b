//
//  loops.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

use super::dominators::DominatorInfo;
use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

/// One natural loop identified by a back edge.
#[derive(Debug, Clone, Serialize)]
pub struct NaturalLoop {
    /// Loop header id: the dominator the back edge returns to.
    pub header: String,
    /// Every node in the loop body, header included, sorted by id.
    pub body: Vec<String>,
    pub size: usize,
    /// 0 for an outermost loop; +1 per enclosing loop body.
    pub depth: usize,
}

/// Detect natural loops: an edge `n -> h` is a back edge iff `h`
/// dominates `n`; the loop body is `h` plus everything that reaches
/// `n` without passing through `h`. Direct recursion shows up as a
/// loop of size 1; mutual recursion falls out of the SCC structure as
/// larger bodies.
pub fn detect(
    graph: &CodeGraph,
    dom: &DominatorInfo,
    token: &CancellationToken,
) -> Result<Vec<NaturalLoop>> {
    let mut raw: Vec<(NodeIndex, HashSet<NodeIndex>)> = Vec::new();

    for idx in graph.node_indices() {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("detect_loops"));
        }
        if !dom.is_reachable(idx) {
            continue;
        }
        for edge in graph.inner().edges(idx) {
            let header = edge.target();
            if dom.dominates(header, idx) {
                let body = loop_body(graph, header, idx);
                // Merge loops sharing a header (multiple back edges)
                if let Some(existing) = raw.iter_mut().find(|(h, _)| *h == header) {
                    existing.1.extend(body);
                } else {
                    raw.push((header, body));
                }
            }
        }
    }

    let mut loops: Vec<NaturalLoop> = raw
        .iter()
        .map(|(header, body)| {
            let depth = raw
                .iter()
                .filter(|(other, other_body)| {
                    *other != *header && other_body.contains(header) && body.is_subset(other_body)
                })
                .count();
            let mut ids: Vec<String> = body.iter().map(|&n| graph.node_at(n).id.clone()).collect();
            ids.sort();
            NaturalLoop {
                header: graph.node_at(*header).id.clone(),
                size: ids.len(),
                body: ids,
                depth,
            }
        })
        .collect();

    loops.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.header.cmp(&b.header)));
    Ok(loops)
}

/// `{header}` plus the predecessors-of-`tail` closure that avoids the
/// header.
fn loop_body(graph: &CodeGraph, header: NodeIndex, tail: NodeIndex) -> HashSet<NodeIndex> {
    let mut body: HashSet<NodeIndex> = HashSet::from([header, tail]);
    let mut stack = vec![tail];
    while let Some(n) = stack.pop() {
        if n == header {
            continue;
        }
        for pred in graph.inner().neighbors_directed(n, Direction::Incoming) {
            if body.insert(pred) {
                stack.push(pred);
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dominators;
    use crate::graph::{EdgeData, EdgeKind};
    use crate::symbol::{Symbol, SymbolIndex, SymbolKind};

    fn build(edges: &[(&str, &str)]) -> (CodeGraph, SymbolIndex) {
        let mut graph = CodeGraph::new(".");
        let mut index = SymbolIndex::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (a, b) in edges {
            for name in [a, b] {
                if seen.insert(name.to_string()) {
                    let sym = Symbol::new(name, SymbolKind::Function, "lib.rs", 1);
                    graph.add_node(&sym).unwrap();
                    index.add(sym);
                }
            }
        }
        for (a, b) in edges {
            graph
                .add_edge(
                    &format!("lib.rs:1:{}", a),
                    &format!("lib.rs:1:{}", b),
                    EdgeData::new(EdgeKind::Calls),
                )
                .unwrap();
        }
        graph.freeze();
        (graph, index)
    }

    fn run(graph: &CodeGraph, index: &SymbolIndex) -> Vec<NaturalLoop> {
        let dom = dominators::compute(graph, index);
        detect(graph, &dom, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_self_loop_is_size_one() {
        let (graph, index) = build(&[("main", "recurse"), ("recurse", "recurse")]);
        let loops = run(&graph, &index);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].size, 1);
        assert_eq!(loops[0].header, "lib.rs:1:recurse");
    }

    #[test]
    fn test_simple_loop_body() {
        // main -> head -> work -> head
        let (graph, index) = build(&[("main", "head"), ("head", "work"), ("work", "head")]);
        let loops = run(&graph, &index);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header, "lib.rs:1:head");
        assert_eq!(loops[0].size, 2);
        assert!(loops[0].body.contains(&"lib.rs:1:work".to_string()));
    }

    #[test]
    fn test_nested_loop_depth() {
        // main -> outer -> inner -> inner_tail -> inner (inner loop)
        //                  inner_tail -> outer (outer loop back edge)
        let (graph, index) = build(&[
            ("main", "outer"),
            ("outer", "inner"),
            ("inner", "inner_tail"),
            ("inner_tail", "inner"),
            ("inner_tail", "outer"),
        ]);
        let loops = run(&graph, &index);
        assert_eq!(loops.len(), 2);

        let outer = loops.iter().find(|l| l.header == "lib.rs:1:outer").unwrap();
        let inner = loops.iter().find(|l| l.header == "lib.rs:1:inner").unwrap();
        assert_eq!(outer.depth, 0);
        assert_eq!(inner.depth, 1);
        assert!(outer.size > inner.size);
    }

    #[test]
    fn test_mutual_recursion() {
        let (graph, index) = build(&[("main", "ping"), ("ping", "pong"), ("pong", "ping")]);
        let loops = run(&graph, &index);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].size, 2);
    }

    #[test]
    fn test_no_loops_in_dag() {
        let (graph, index) = build(&[("main", "a"), ("a", "b"), ("main", "b")]);
        let loops = run(&graph, &index);
        assert!(loops.is_empty());
    }
}
