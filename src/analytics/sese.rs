//
//  sese.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::dominators::DominatorInfo;
use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

/// One single-entry-single-exit region.
#[derive(Debug, Clone, Serialize)]
pub struct SeseRegion {
    pub entry: String,
    pub exit: String,
    /// Nodes strictly between entry and exit, sorted by id.
    pub internal: Vec<String>,
    pub size: usize,
}

/// Find SESE regions from the dominator / post-dominator relationship:
/// a pair (a, b) bounds a region when `a` dominates `b` and `b`
/// post-dominates `a`; the region is every node dominated by `a` and
/// post-dominated by `b`.
pub fn find_regions(
    graph: &CodeGraph,
    dom: &DominatorInfo,
    min_size: usize,
    max_size: usize,
    token: &CancellationToken,
) -> Result<Vec<SeseRegion>> {
    let min_size = min_size.max(2);
    let mut regions: Vec<SeseRegion> = Vec::new();

    for a in graph.node_indices() {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("extractable_regions"));
        }
        if !dom.is_reachable(a) {
            continue;
        }
        // Candidate exits are exactly the post-dominators of the entry.
        for b in dom.postdominator_chain(a) {
            if b == a || !dom.dominates(a, b) {
                continue;
            }
            let members: Vec<NodeIndex> = graph
                .node_indices()
                .filter(|&n| dom.dominates(a, n) && dom.postdominates(b, n))
                .collect();
            if members.len() < min_size || members.len() > max_size {
                continue;
            }
            let mut internal: Vec<String> = members
                .iter()
                .filter(|&&n| n != a && n != b)
                .map(|&n| graph.node_at(n).id.clone())
                .collect();
            internal.sort();
            regions.push(SeseRegion {
                entry: graph.node_at(a).id.clone(),
                exit: graph.node_at(b).id.clone(),
                size: members.len(),
                internal,
            });
        }
    }

    regions.sort_by(|x, y| {
        y.size
            .cmp(&x.size)
            .then_with(|| x.entry.cmp(&y.entry))
            .then_with(|| x.exit.cmp(&y.exit))
    });
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dominators;
    use crate::graph::{EdgeData, EdgeKind};
    use crate::symbol::{Symbol, SymbolIndex, SymbolKind};
    use std::collections::HashSet;

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

    #[test]
    fn test_diamond_is_a_region() {
        // entry -> a | b -> join: single entry, single exit
        let (graph, index) = build(&[
            ("entry", "a"),
            ("entry", "b"),
            ("a", "join"),
            ("b", "join"),
        ]);
        let dom = dominators::compute(&graph, &index);
        let regions =
            find_regions(&graph, &dom, 2, 100, &CancellationToken::new()).unwrap();

        let diamond = regions
            .iter()
            .find(|r| r.entry == "lib.rs:1:entry" && r.exit == "lib.rs:1:join")
            .expect("diamond region");
        assert_eq!(diamond.size, 4);
        assert_eq!(diamond.internal.len(), 2);
    }

    #[test]
    fn test_chain_regions_and_size_bounds() {
        let (graph, index) = build(&[("a", "b"), ("b", "c"), ("c", "d")]);
        let dom = dominators::compute(&graph, &index);

        let all = find_regions(&graph, &dom, 2, 100, &CancellationToken::new()).unwrap();
        // Largest region spans the whole chain
        assert_eq!(all[0].size, 4);

        let capped = find_regions(&graph, &dom, 2, 3, &CancellationToken::new()).unwrap();
        assert!(capped.iter().all(|r| r.size <= 3));

        let floored = find_regions(&graph, &dom, 4, 100, &CancellationToken::new()).unwrap();
        assert!(floored.iter().all(|r| r.size >= 4));
    }

    #[test]
    fn test_branch_without_join_is_not_sese() {
        // fork -> left, fork -> right, no rejoin: no region covers both
        let (graph, index) = build(&[("fork", "left"), ("fork", "right")]);
        let dom = dominators::compute(&graph, &index);
        let regions = find_regions(&graph, &dom, 2, 100, &CancellationToken::new()).unwrap();
        assert!(regions
            .iter()
            .all(|r| !(r.internal.contains(&"lib.rs:1:left".to_string())
                && r.internal.contains(&"lib.rs:1:right".to_string()))));
    }

    #[test]
    fn test_cancellation() {
        let (graph, index) = build(&[("a", "b")]);
        let dom = dominators::compute(&graph, &index);
        let token = CancellationToken::new();
        token.cancel();
        let err = find_regions(&graph, &dom, 2, 100, &token).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }
}
