//
//  pagerank.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::visit::EdgeRef;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

const DAMPING: f64 = 0.85;
const EPSILON: f64 = 1e-8;

/// Converged PageRank vector, normalized to sum 1.0.
#[derive(Debug, Clone)]
pub struct PageRankVector {
    /// Rank per node, indexed by petgraph node index.
    pub ranks: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// One ranked node for the tool output.
#[derive(Debug, Clone, Serialize)]
pub struct ImportantNode {
    pub id: String,
    pub name: String,
    pub file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package: String,
    pub pagerank: f64,
    pub rank: usize,
}

/// Power iteration with damping 0.85, stopping when the L1 delta drops
/// under 1e-8 or after `max_iterations`. Dangling mass is spread
/// uniformly so ranks always sum to 1.
pub fn compute(
    graph: &CodeGraph,
    max_iterations: usize,
    token: &CancellationToken,
) -> Result<PageRankVector> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(PageRankVector {
            ranks: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let uniform = 1.0 / n as f64;
    let mut ranks = vec![uniform; n];
    let out_degrees: Vec<usize> = graph.node_indices().map(|i| graph.out_degree(i)).collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < max_iterations {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("pagerank"));
        }
        iterations += 1;

        let dangling: f64 = graph
            .node_indices()
            .filter(|i| out_degrees[i.index()] == 0)
            .map(|i| ranks[i.index()])
            .sum();

        let mut next = vec![(1.0 - DAMPING) * uniform + DAMPING * dangling * uniform; n];
        for idx in graph.node_indices() {
            let share = DAMPING * ranks[idx.index()] / out_degrees[idx.index()].max(1) as f64;
            if out_degrees[idx.index()] == 0 {
                continue;
            }
            for edge in graph.inner().edges(idx) {
                next[edge.target().index()] += share;
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        ranks = next;
        if delta < EPSILON {
            converged = true;
            break;
        }
    }

    Ok(PageRankVector {
        ranks,
        iterations,
        converged,
    })
}

/// Rank nodes by PageRank, ties broken by id.
pub fn top_nodes(graph: &CodeGraph, vector: &PageRankVector, top: usize) -> Vec<ImportantNode> {
    let mut order: Vec<petgraph::graph::NodeIndex> = graph.node_indices().collect();
    order.sort_by(|a, b| {
        vector.ranks[b.index()]
            .partial_cmp(&vector.ranks[a.index()])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| graph.node_at(*a).id.cmp(&graph.node_at(*b).id))
    });
    order
        .into_iter()
        .take(top)
        .enumerate()
        .map(|(i, idx)| {
            let node = graph.node_at(idx);
            ImportantNode {
                id: node.id.clone(),
                name: node.name.clone(),
                file: node.file_path.clone(),
                package: node.package.clone(),
                pagerank: vector.ranks[idx.index()],
                rank: i + 1,
            }
        })
        .collect()
}
