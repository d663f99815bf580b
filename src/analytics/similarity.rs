//
//  similarity.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::graph::{CodeGraph, EdgeKind};
use crate::symbol::{SymbolIndex, SymbolKind};

/// Structural fingerprint of one node: what it calls, what it is, and
/// roughly how big it is.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub kind: SymbolKind,
    /// Multiset of callee names.
    pub call_targets: BTreeMap<String, u32>,
    /// 0: <=10 lines, 1: <=30, 2: <=100, 3: larger.
    pub size_bucket: u8,
}

/// One similarity hit.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarNode {
    pub id: String,
    pub name: String,
    pub file: String,
    pub score: f64,
}

/// All fingerprints, built once per frozen graph.
#[derive(Debug)]
pub struct FingerprintStore {
    prints: Vec<Fingerprint>,
}

impl FingerprintStore {
    /// One-shot build over every node, parallel. Callers go through a
    /// single-flight gate in the analytics wrapper.
    pub fn build(graph: &CodeGraph, index: &SymbolIndex) -> Self {
        let prints: Vec<Fingerprint> = (0..graph.node_count())
            .into_par_iter()
            .map(|i| fingerprint(graph, index, NodeIndex::new(i)))
            .collect();
        Self { prints }
    }

    pub fn get(&self, idx: NodeIndex) -> &Fingerprint {
        &self.prints[idx.index()]
    }

    /// Rank every other node against `target` by fingerprint score.
    pub fn rank_against(&self, graph: &CodeGraph, target: NodeIndex, top: usize) -> Vec<SimilarNode> {
        let target_print = self.get(target);
        let mut scored: Vec<(f64, NodeIndex)> = graph
            .node_indices()
            .filter(|&i| i != target)
            .map(|i| (score(target_print, self.get(i)), i))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| graph.node_at(a.1).id.cmp(&graph.node_at(b.1).id))
        });
        scored
            .into_iter()
            .take(top)
            .map(|(score, i)| {
                let node = graph.node_at(i);
                SimilarNode {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    file: node.file_path.clone(),
                    score,
                }
            })
            .collect()
    }
}

fn fingerprint(graph: &CodeGraph, index: &SymbolIndex, idx: NodeIndex) -> Fingerprint {
    let node = graph.node_at(idx);

    let mut call_targets: BTreeMap<String, u32> = BTreeMap::new();
    for edge in graph.inner().edges(idx) {
        if edge.weight().kind == EdgeKind::Calls {
            let target = graph.node_at(edge.target());
            *call_targets.entry(target.name.clone()).or_insert(0) += 1;
        }
    }

    let lines = index
        .get(&node.id)
        .map(|s| s.end_line.saturating_sub(s.start_line) + 1)
        .unwrap_or(1);
    let size_bucket = match lines {
        0..=10 => 0,
        11..=30 => 1,
        31..=100 => 2,
        _ => 3,
    };

    Fingerprint {
        kind: node.kind,
        call_targets,
        size_bucket,
    }
}

/// Jaccard over the call multiset, weighted with kind equality and
/// size-bucket proximity.
fn score(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let mut min_sum = 0u32;
    let mut max_sum = 0u32;
    for (name, &wa) in &a.call_targets {
        let wb = b.call_targets.get(name).copied().unwrap_or(0);
        min_sum += wa.min(wb);
        max_sum += wa.max(wb);
    }
    for (name, &wb) in &b.call_targets {
        if !a.call_targets.contains_key(name) {
            max_sum += wb;
        }
    }
    let jaccard = if max_sum == 0 {
        0.0
    } else {
        min_sum as f64 / max_sum as f64
    };

    let kind_bonus = if a.kind == b.kind { 1.0 } else { 0.0 };
    let size_closeness = 1.0 - (a.size_bucket as i32 - b.size_bucket as i32).abs() as f64 / 3.0;

    0.6 * jaccard + 0.25 * kind_bonus + 0.15 * size_closeness
}
