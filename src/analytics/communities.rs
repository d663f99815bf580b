//
//  communities.rs
//  Lattice
//
//  Created by hak (tharun)
//

use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio_util::sync::CancellationToken;

use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;

/// One detected community.
#[derive(Debug, Clone, Serialize)]
pub struct Community {
    pub id: usize,
    pub size: usize,
    /// Member symbol ids, sorted.
    pub members: Vec<String>,
    /// Directed edges with both endpoints inside.
    pub internal_edges: usize,
    /// Directed edges with exactly one endpoint inside.
    pub external_edges: usize,
    /// Internal undirected density in [0, 1].
    pub connectivity: f64,
    pub dominant_package: String,
    pub is_cross_package: bool,
}

/// Aggregated directed edges between two communities.
#[derive(Debug, Clone, Serialize)]
pub struct CrossCommunityEdge {
    pub from: usize,
    pub to: usize,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityReport {
    pub algorithm: &'static str,
    pub modularity: f64,
    pub quality_label: &'static str,
    /// True when the level loop reached a fixed point rather than the
    /// iteration cap.
    pub converged: bool,
    pub communities: Vec<Community>,
    pub cross_community_edges: Vec<CrossCommunityEdge>,
    pub cross_package_communities: usize,
}

pub fn quality_label(modularity: f64) -> &'static str {
    if modularity < 0.3 {
        "weak"
    } else if modularity < 0.5 {
        "moderate"
    } else if modularity < 0.7 {
        "good"
    } else {
        "strong"
    }
}

/// Working representation of one aggregation level: an undirected
/// weighted graph.
struct Level {
    /// adj[i] = neighbor -> edge weight (no self entries). Ordered
    /// so every float accumulation is run-to-run deterministic.
    adj: Vec<BTreeMap<usize, f64>>,
    /// Self-loop weight per node (counts twice in the degree).
    loops: Vec<f64>,
}

impl Level {
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn degree(&self, i: usize) -> f64 {
        self.adj[i].values().sum::<f64>() + 2.0 * self.loops[i]
    }

    fn total_weight(&self) -> f64 {
        let edge_sum: f64 = self.adj.iter().map(|m| m.values().sum::<f64>()).sum();
        edge_sum / 2.0 + self.loops.iter().sum::<f64>()
    }
}

/// Louvain local moves with the Leiden well-connectedness refinement:
/// after each move phase, communities are split into their connected
/// components before aggregation, so no reported community is ever
/// internally disconnected.
pub fn detect(
    graph: &CodeGraph,
    resolution: f64,
    min_size: usize,
    max_levels: usize,
    max_sweeps: usize,
    token: &CancellationToken,
) -> Result<CommunityReport> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(CommunityReport {
            algorithm: "Leiden",
            modularity: 0.0,
            quality_label: quality_label(0.0),
            converged: true,
            communities: Vec::new(),
            cross_community_edges: Vec::new(),
            cross_package_communities: 0,
        });
    }

    let mut level = build_base_level(graph);
    // membership[original node] = community at the current level.
    let mut membership: Vec<usize> = (0..n).collect();
    let mut converged = false;

    for _ in 0..max_levels {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("detect_communities"));
        }

        let (assignment, moved) = local_moves(&level, resolution, max_sweeps, token)?;
        let assignment = split_disconnected(&level, assignment);

        if !moved {
            converged = true;
            break;
        }

        // Renumber communities densely, stable by smallest member.
        let compact = compact_labels(&assignment);
        for m in membership.iter_mut() {
            *m = compact[*m];
        }
        level = aggregate(&level, &compact);

        if level.node_count() == 1 {
            converged = true;
            break;
        }
    }

    Ok(build_report(graph, &membership, resolution, min_size, converged))
}

fn build_base_level(graph: &CodeGraph) -> Level {
    let n = graph.node_count();
    let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    let mut loops = vec![0.0; n];

    for edge in graph.inner().edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if a == b {
            loops[a] += 1.0;
        } else {
            *adj[a].entry(b).or_insert(0.0) += 1.0;
            *adj[b].entry(a).or_insert(0.0) += 1.0;
        }
    }

    Level { adj, loops }
}

/// One Louvain move phase. Returns (community per node, any_moved).
fn local_moves(
    level: &Level,
    resolution: f64,
    max_sweeps: usize,
    token: &CancellationToken,
) -> Result<(Vec<usize>, bool)> {
    let n = level.node_count();
    let two_m = 2.0 * level.total_weight();
    if two_m == 0.0 {
        return Ok(((0..n).collect(), false));
    }

    let mut community: Vec<usize> = (0..n).collect();
    let mut sum_tot: Vec<f64> = (0..n).map(|i| level.degree(i)).collect();
    let mut any_moved = false;

    for _ in 0..max_sweeps {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("detect_communities"));
        }
        let mut moved_this_sweep = false;

        for i in 0..n {
            let k_i = level.degree(i);
            let old = community[i];
            sum_tot[old] -= k_i;

            // Weight from i into each neighboring community.
            let mut k_i_in: BTreeMap<usize, f64> = BTreeMap::new();
            k_i_in.insert(old, 0.0);
            for (&j, &w) in &level.adj[i] {
                *k_i_in.entry(community[j]).or_insert(0.0) += w;
            }

            // BTreeMap iteration gives ascending community ids, so the
            // first strictly-better gain wins ties deterministically.
            let mut best = old;
            let mut best_gain = k_i_in[&old] - resolution * sum_tot[old] * k_i / two_m;
            for (&c, &w_in) in &k_i_in {
                let gain = w_in - resolution * sum_tot[c] * k_i / two_m;
                if gain > best_gain + 1e-12 || (c < best && (gain - best_gain).abs() <= 1e-12) {
                    best = c;
                    best_gain = gain;
                }
            }

            sum_tot[best] += k_i;
            community[i] = best;
            if best != old {
                moved_this_sweep = true;
                any_moved = true;
            }
        }

        if !moved_this_sweep {
            break;
        }
    }

    Ok((community, any_moved))
}

/// Leiden refinement: a community whose induced subgraph is
/// disconnected is split into its connected components.
fn split_disconnected(level: &Level, assignment: Vec<usize>) -> Vec<usize> {
    let n = level.node_count();
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &c) in assignment.iter().enumerate() {
        members.entry(c).or_default().push(i);
    }

    let mut result = assignment.clone();
    let mut next_label = n;

    for (_, nodes) in members {
        if nodes.len() <= 1 {
            continue;
        }
        let node_set: HashSet<usize> = nodes.iter().copied().collect();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut first_component = true;

        for &start in &nodes {
            if seen.contains(&start) {
                continue;
            }
            let mut component = vec![start];
            seen.insert(start);
            let mut stack = vec![start];
            while let Some(cur) = stack.pop() {
                for &next in level.adj[cur].keys() {
                    if node_set.contains(&next) && seen.insert(next) {
                        component.push(next);
                        stack.push(next);
                    }
                }
            }
            if first_component {
                first_component = false;
            } else {
                for &i in &component {
                    result[i] = next_label;
                }
                next_label += 1;
            }
        }
    }

    result
}

/// Map sparse labels to 0..k, ordered by smallest member node.
fn compact_labels(assignment: &[usize]) -> Vec<usize> {
    let mut first_member: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, &c) in assignment.iter().enumerate() {
        first_member.entry(c).or_insert(i);
    }
    let mut labels: Vec<(usize, usize)> = first_member.into_iter().collect();
    labels.sort_by_key(|&(_, first)| first);

    let relabel: HashMap<usize, usize> = labels
        .into_iter()
        .enumerate()
        .map(|(new, (old, _))| (old, new))
        .collect();
    assignment.iter().map(|c| relabel[c]).collect()
}

/// Collapse each community into a supernode.
fn aggregate(level: &Level, compact: &[usize]) -> Level {
    let k = compact.iter().copied().max().map_or(0, |m| m + 1);
    let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); k];
    let mut loops = vec![0.0; k];

    for i in 0..level.node_count() {
        let ci = compact[i];
        loops[ci] += level.loops[i];
        for (&j, &w) in &level.adj[i] {
            let cj = compact[j];
            if ci == cj {
                // Each internal undirected edge is visited twice.
                loops[ci] += w / 2.0;
            } else {
                *adj[ci].entry(cj).or_insert(0.0) += w;
            }
        }
    }

    Level { adj, loops }
}

fn build_report(
    graph: &CodeGraph,
    membership: &[usize],
    resolution: f64,
    min_size: usize,
    converged: bool,
) -> CommunityReport {
    let base = build_base_level(graph);
    let two_m = 2.0 * base.total_weight();

    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &c) in membership.iter().enumerate() {
        members.entry(c).or_default().push(i);
    }

    // Modularity over the final assignment.
    let modularity = if two_m == 0.0 {
        0.0
    } else {
        members
            .values()
            .map(|nodes| {
                let set: HashSet<usize> = nodes.iter().copied().collect();
                let mut sigma_in = 0.0;
                let mut sigma_tot = 0.0;
                for &i in nodes {
                    sigma_tot += base.degree(i);
                    sigma_in += 2.0 * base.loops[i];
                    for (&j, &w) in &base.adj[i] {
                        if set.contains(&j) {
                            sigma_in += w;
                        }
                    }
                }
                sigma_in / two_m - resolution * (sigma_tot / two_m) * (sigma_tot / two_m)
            })
            .sum()
    };

    // Stable community ids: size desc, then smallest member id.
    let mut ordered: Vec<Vec<usize>> = members.into_values().collect();
    for nodes in &mut ordered {
        nodes.sort_by(|a, b| node_id(graph, *a).cmp(node_id(graph, *b)));
    }
    ordered.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| node_id(graph, a[0]).cmp(node_id(graph, b[0])))
    });

    let final_label: HashMap<usize, usize> = ordered
        .iter()
        .enumerate()
        .flat_map(|(label, nodes)| nodes.iter().map(move |&i| (i, label)))
        .collect();

    let mut communities: Vec<Community> = Vec::new();
    let mut cross_package_communities = 0;

    for (label, nodes) in ordered.iter().enumerate() {
        if nodes.len() < min_size {
            continue;
        }
        let set: HashSet<usize> = nodes.iter().copied().collect();
        let mut internal = 0usize;
        let mut external = 0usize;
        for edge in graph.inner().edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            match (set.contains(&a), set.contains(&b)) {
                (true, true) => internal += 1,
                (true, false) | (false, true) => external += 1,
                _ => {}
            }
        }

        let size = nodes.len();
        let connectivity = if size > 1 {
            let undirected_internal: f64 = nodes
                .iter()
                .map(|&i| {
                    base.adj[i]
                        .iter()
                        .filter(|(j, _)| set.contains(j))
                        .map(|(_, &w)| w)
                        .sum::<f64>()
                })
                .sum::<f64>()
                / 2.0;
            (2.0 * undirected_internal / (size as f64 * (size - 1) as f64)).min(1.0)
        } else {
            0.0
        };

        let mut package_counts: BTreeMap<String, usize> = BTreeMap::new();
        for &i in nodes {
            *package_counts.entry(package_of(graph, i)).or_insert(0) += 1;
        }
        let dominant_package = package_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(p, _)| p.clone())
            .unwrap_or_default();
        let is_cross_package = package_counts.len() > 1;
        if is_cross_package {
            cross_package_communities += 1;
        }

        communities.push(Community {
            id: label,
            size,
            members: nodes.iter().map(|&i| node_id(graph, i).to_string()).collect(),
            internal_edges: internal,
            external_edges: external,
            connectivity,
            dominant_package,
            is_cross_package,
        });
    }

    // Directed edges across community boundaries, aggregated.
    let kept: HashSet<usize> = communities.iter().map(|c| c.id).collect();
    let mut cross: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for edge in graph.inner().edge_references() {
        let fa = final_label[&edge.source().index()];
        let fb = final_label[&edge.target().index()];
        if fa != fb && kept.contains(&fa) && kept.contains(&fb) {
            *cross.entry((fa, fb)).or_insert(0) += 1;
        }
    }
    let mut cross_community_edges: Vec<CrossCommunityEdge> = cross
        .into_iter()
        .map(|((from, to), count)| CrossCommunityEdge { from, to, count })
        .collect();
    cross_community_edges.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| (a.from, a.to).cmp(&(b.from, b.to)))
    });

    CommunityReport {
        algorithm: "Leiden",
        modularity,
        quality_label: quality_label(modularity),
        converged,
        communities,
        cross_community_edges,
        cross_package_communities,
    }
}

fn node_id(graph: &CodeGraph, i: usize) -> &str {
    &graph.node_at(petgraph::graph::NodeIndex::new(i)).id
}

/// Package key for dominance stats: the declared package, or the top
/// path segment when the language has none.
fn package_of(graph: &CodeGraph, i: usize) -> String {
    let node = graph.node_at(petgraph::graph::NodeIndex::new(i));
    if !node.package.is_empty() {
        return node.package.clone();
    }
    node.file_path
        .split('/')
        .next()
        .unwrap_or(&node.file_path)
        .to_string()
}
