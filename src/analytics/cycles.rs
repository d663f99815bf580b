//
//  cycles.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

use super::scc::SccDecomposition;
use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

/// One simple directed cycle, rotated so the smallest id leads.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    /// Node ids in traversal order. The last node has an edge back to
    /// the first.
    pub nodes: Vec<String>,
    pub length: usize,
}

/// Enumerate simple cycles of length >= `min_size`, at most `limit`
/// per call. Works SCC by SCC: edges leaving a component can never
/// close a cycle.
pub fn enumerate(
    graph: &CodeGraph,
    scc: &SccDecomposition,
    min_size: usize,
    limit: usize,
    token: &CancellationToken,
) -> Result<Vec<Cycle>> {
    let min_size = min_size.max(1);
    let mut cycles: Vec<Cycle> = Vec::new();

    for comp in scc.non_trivial(graph) {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("find_cycles"));
        }
        if cycles.len() >= limit {
            break;
        }
        let members: HashSet<NodeIndex> = comp.iter().copied().collect();

        // Elementary-circuits walk: for each start node (ascending id
        // order), enumerate paths through members ranked at or after
        // the start, so every cycle is found exactly once.
        for (start_pos, &start) in comp.iter().enumerate() {
            if token.is_cancelled() {
                return Err(LatticeError::cancelled("find_cycles"));
            }
            if cycles.len() >= limit {
                break;
            }
            let allowed: HashSet<NodeIndex> = comp[start_pos..].iter().copied().collect();
            let mut path = vec![start];
            let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
            walk(
                graph,
                &members,
                &allowed,
                start,
                &mut path,
                &mut on_path,
                min_size,
                limit,
                &mut cycles,
            );
        }
    }

    // Ascending smallest-id rotation happened at emit time; order the
    // full set lexicographically for determinism.
    cycles.sort_by(|a, b| a.nodes.cmp(&b.nodes));
    cycles.dedup_by(|a, b| a.nodes == b.nodes);
    cycles.truncate(limit);
    Ok(cycles)
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &CodeGraph,
    members: &HashSet<NodeIndex>,
    allowed: &HashSet<NodeIndex>,
    current: NodeIndex,
    path: &mut Vec<NodeIndex>,
    on_path: &mut HashSet<NodeIndex>,
    min_size: usize,
    limit: usize,
    cycles: &mut Vec<Cycle>,
) {
    if cycles.len() >= limit {
        return;
    }
    let start = path[0];

    let mut next: Vec<NodeIndex> = graph
        .inner()
        .edges(current)
        .map(|e| e.target())
        .filter(|t| members.contains(t))
        .collect();
    next.sort_by(|a, b| graph.node_at(*a).id.cmp(&graph.node_at(*b).id));
    next.dedup();

    for target in next {
        if cycles.len() >= limit {
            return;
        }
        if target == start {
            if path.len() >= min_size {
                cycles.push(make_cycle(graph, path));
            }
            continue;
        }
        if !allowed.contains(&target) || on_path.contains(&target) {
            continue;
        }
        path.push(target);
        on_path.insert(target);
        walk(graph, members, allowed, target, path, on_path, min_size, limit, cycles);
        on_path.remove(&target);
        path.pop();
    }
}

/// Rotate so the lexicographically smallest id comes first.
fn make_cycle(graph: &CodeGraph, path: &[NodeIndex]) -> Cycle {
    let ids: Vec<String> = path.iter().map(|&n| graph.node_at(n).id.clone()).collect();
    let pivot = ids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let rotated: Vec<String> = ids[pivot..].iter().chain(ids[..pivot].iter()).cloned().collect();
    Cycle {
        length: rotated.len(),
        nodes: rotated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::scc;
    use crate::graph::{EdgeData, EdgeKind};
    use crate::symbol::{Symbol, SymbolKind};

    fn build(edges: &[(&str, &str)]) -> CodeGraph {
        let mut graph = CodeGraph::new(".");
        let mut seen: HashSet<String> = HashSet::new();
        for (a, b) in edges {
            for name in [a, b] {
                if seen.insert(name.to_string()) {
                    graph
                        .add_node(&Symbol::new(name, SymbolKind::Function, "lib.rs", 1))
                        .unwrap();
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
        graph
    }

    fn run(graph: &CodeGraph, min_size: usize, limit: usize) -> Vec<Cycle> {
        let scc = scc::compute(graph);
        enumerate(graph, &scc, min_size, limit, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_three_cycle_and_pair_and_self_loop() {
        // A->B->C->A, D->D, E<->F
        let graph = build(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("D", "D"),
            ("E", "F"),
            ("F", "E"),
        ]);

        let cycles = run(&graph, 2, 20);
        // min_size=2 excludes the self-loop
        assert_eq!(cycles.len(), 2);
        let lengths: Vec<usize> = cycles.iter().map(|c| c.length).collect();
        assert!(lengths.contains(&3));
        assert!(lengths.contains(&2));

        let with_self = run(&graph, 1, 20);
        assert_eq!(with_self.len(), 3);

        let only_three = run(&graph, 3, 20);
        assert_eq!(only_three.len(), 1);
        assert_eq!(only_three[0].length, 3);
    }

    #[test]
    fn test_cycles_are_simple_and_closed() {
        let graph = build(&[("A", "B"), ("B", "C"), ("C", "A"), ("B", "A")]);
        let cycles = run(&graph, 2, 20);

        for cycle in &cycles {
            // Simple: no repeated nodes
            let distinct: HashSet<&String> = cycle.nodes.iter().collect();
            assert_eq!(distinct.len(), cycle.nodes.len());
            // Closed: last node has an edge back to the first
            let last = cycle.nodes.last().unwrap();
            let first = &cycle.nodes[0];
            assert!(graph
                .out_edges(last)
                .iter()
                .any(|(_, target)| &target.id == first));
        }
    }

    #[test]
    fn test_rotation_starts_at_smallest_id() {
        let graph = build(&[("zeta", "alpha"), ("alpha", "zeta")]);
        let cycles = run(&graph, 2, 20);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes[0], "lib.rs:1:alpha");
    }

    #[test]
    fn test_limit_bounds_enumeration() {
        // Dense component with many cycles
        let graph = build(&[
            ("a", "b"),
            ("b", "a"),
            ("b", "c"),
            ("c", "b"),
            ("c", "a"),
            ("a", "c"),
        ]);
        let cycles = run(&graph, 2, 2);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let graph = build(&[("a", "b"), ("b", "c"), ("c", "a"), ("b", "a")]);
        let first = run(&graph, 2, 20);
        let second = run(&graph, 2, 20);
        let ids_a: Vec<_> = first.iter().map(|c| c.nodes.clone()).collect();
        let ids_b: Vec<_> = second.iter().map(|c| c.nodes.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_cancellation() {
        let graph = build(&[("a", "b"), ("b", "a")]);
        let scc = scc::compute(&graph);
        let token = CancellationToken::new();
        token.cancel();
        let err = enumerate(&graph, &scc, 2, 20, &token).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }
}
