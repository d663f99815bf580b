//
//  reducibility.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

/// Reducibility verdict from T1/T2 interval reduction.
#[derive(Debug, Clone, Serialize)]
pub struct ReducibilityReport {
    pub is_reducible: bool,
    /// 1 - residual_nodes / total_nodes.
    pub score: f64,
    pub quality_label: &'static str,
    /// Residual node groups that resisted reduction, ids sorted.
    pub irreducible_regions: Vec<Vec<String>>,
    pub summary: String,
}

pub fn quality_label(score: f64) -> &'static str {
    if score < 0.3 {
        "weak"
    } else if score < 0.6 {
        "moderate"
    } else if score < 0.85 {
        "good"
    } else {
        "strong"
    }
}

/// T1/T2 reduction: collapse self-loops (T1) and absorb
/// unique-predecessor nodes into their predecessor (T2) until fixed
/// point. The graph is reducible iff everything collapses into the
/// virtual entry.
pub fn analyze(
    graph: &CodeGraph,
    entries: &[petgraph::graph::NodeIndex],
    token: &CancellationToken,
) -> Result<ReducibilityReport> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(ReducibilityReport {
            is_reducible: true,
            score: 1.0,
            quality_label: quality_label(1.0),
            irreducible_regions: Vec::new(),
            summary: "empty graph is trivially reducible".to_string(),
        });
    }

    // Virtual entry is node `n`; it feeds every entry so multi-entry
    // graphs reduce like single-entry CFGs.
    let entry = n;
    let mut succs: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    let mut preds: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for i in 0..=n {
        succs.insert(i, BTreeSet::new());
        preds.insert(i, BTreeSet::new());
    }
    for edge in graph.inner().edge_references() {
        let (a, b) = (
            petgraph::visit::EdgeRef::source(&edge).index(),
            petgraph::visit::EdgeRef::target(&edge).index(),
        );
        succs.get_mut(&a).unwrap().insert(b);
        preds.get_mut(&b).unwrap().insert(a);
    }
    for e in entries {
        succs.get_mut(&entry).unwrap().insert(e.index());
        preds.get_mut(&e.index()).unwrap().insert(entry);
    }

    loop {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("check_reducibility"));
        }
        let mut changed = false;

        // T1: remove self-loops.
        let nodes: Vec<usize> = succs.keys().copied().collect();
        for x in &nodes {
            if succs.get_mut(x).unwrap().remove(x) {
                preds.get_mut(x).unwrap().remove(x);
                changed = true;
            }
        }

        // T2: absorb a node with exactly one predecessor into it.
        for x in &nodes {
            if *x == entry || !succs.contains_key(x) {
                continue;
            }
            let single_pred = {
                let p = &preds[x];
                if p.len() == 1 {
                    Some(*p.iter().next().unwrap())
                } else {
                    None
                }
            };
            let Some(p) = single_pred else {
                continue;
            };
            if p == *x {
                continue;
            }
            // Merge x into p: x's successors become p's.
            let outgoing: Vec<usize> = succs[x].iter().copied().collect();
            for t in outgoing {
                preds.get_mut(&t).unwrap().remove(x);
                if t != p {
                    succs.get_mut(&p).unwrap().insert(t);
                    preds.get_mut(&t).unwrap().insert(p);
                } else {
                    // Edge back to the absorber becomes a self-loop,
                    // cleared by the next T1 pass.
                    succs.get_mut(&p).unwrap().insert(p);
                    preds.get_mut(&p).unwrap().insert(p);
                }
            }
            succs.get_mut(&p).unwrap().remove(x);
            succs.remove(x);
            preds.remove(x);
            changed = true;
        }

        if !changed {
            break;
        }
    }

    // Residual original nodes (the virtual entry always survives).
    let residual: Vec<usize> = succs.keys().copied().filter(|&x| x != entry).collect();
    let is_reducible = residual.is_empty();
    let score = 1.0 - residual.len() as f64 / n as f64;

    let irreducible_regions = group_residual(graph, &residual, &succs);
    let summary = if is_reducible {
        format!("graph reduces cleanly ({} nodes)", n)
    } else {
        format!(
            "{} of {} nodes resist T1/T2 reduction across {} region(s)",
            residual.len(),
            n,
            irreducible_regions.len()
        )
    };

    Ok(ReducibilityReport {
        is_reducible,
        score,
        quality_label: quality_label(score),
        irreducible_regions,
        summary,
    })
}

/// Group residual nodes by mutual reachability in the residual graph.
fn group_residual(
    graph: &CodeGraph,
    residual: &[usize],
    succs: &BTreeMap<usize, BTreeSet<usize>>,
) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut assigned: BTreeSet<usize> = BTreeSet::new();

    for &x in residual {
        if assigned.contains(&x) {
            continue;
        }
        // Undirected closure over residual edges.
        let mut group: BTreeSet<usize> = BTreeSet::from([x]);
        let mut stack = vec![x];
        while let Some(cur) = stack.pop() {
            for &next in &succs[&cur] {
                if residual.contains(&next) && group.insert(next) {
                    stack.push(next);
                }
            }
            for (&other, outs) in succs {
                if residual.contains(&other) && outs.contains(&cur) && group.insert(other) {
                    stack.push(other);
                }
            }
        }
        assigned.extend(group.iter().copied());
        let ids: Vec<String> = group
            .iter()
            .map(|&i| graph.node_at(petgraph::graph::NodeIndex::new(i)).id.clone())
            .collect();
        groups.push(ids);
    }

    groups.sort();
    groups
}
