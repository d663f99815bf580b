//
//  hotspots.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tokio_util::sync::CancellationToken;

use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

/// One highly-connected node. Score favors being depended on:
/// `in_degree * 2 + out_degree`.
#[derive(Debug, Clone, Serialize)]
pub struct HotSpot {
    pub id: String,
    pub name: String,
    pub file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package: String,
    pub score: usize,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Top-k hotspots via a bounded min-heap: O(V log k), ties broken by
/// id so identical graphs rank identically.
pub fn find(graph: &CodeGraph, k: usize, token: &CancellationToken) -> Result<Vec<HotSpot>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    // Keyed so the heap's top is the weakest kept entry: lower score
    // pops first, larger id pops first among equals.
    let mut heap: BinaryHeap<Reverse<(usize, Reverse<String>)>> = BinaryHeap::with_capacity(k + 1);

    for idx in graph.node_indices() {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("find_hotspots"));
        }
        let in_degree = graph.in_degree(idx);
        let out_degree = graph.out_degree(idx);
        let score = in_degree * 2 + out_degree;
        heap.push(Reverse((score, Reverse(graph.node_at(idx).id.clone()))));
        if heap.len() > k {
            heap.pop();
        }
    }

    let mut kept: Vec<(usize, String)> = heap
        .into_iter()
        .map(|Reverse((score, Reverse(id)))| (score, id))
        .collect();
    kept.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    Ok(kept
        .into_iter()
        .map(|(score, id)| {
            let idx = graph.index_of(&id).expect("heap ids come from the graph");
            let node = graph.node_at(idx);
            HotSpot {
                id: node.id.clone(),
                name: node.name.clone(),
                file: node.file_path.clone(),
                package: node.package.clone(),
                score,
                in_degree: graph.in_degree(idx),
                out_degree: graph.out_degree(idx),
            }
        })
        .collect())
}
