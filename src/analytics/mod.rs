//
//  mod.rs
//  Lattice
//
//  Created by hak (tharun)
//

pub mod communities;
pub mod cycles;
pub mod deadcode;
pub mod dominators;
pub mod hotspots;
pub mod loops;
pub mod pagerank;
pub mod reducibility;
pub mod scc;
pub mod sese;
pub mod similarity;

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use communities::{Community, CommunityReport, CrossCommunityEdge};
pub use cycles::Cycle;
pub use deadcode::{DeadCodeReport, DeadNode};
pub use hotspots::HotSpot;
pub use loops::NaturalLoop;
pub use pagerank::ImportantNode;
pub use reducibility::ReducibilityReport;
pub use sese::SeseRegion;
pub use similarity::SimilarNode;

use crate::config::AnalyticsConfig;
use crate::error::{LatticeError, Result};
use crate::graph::{CodeGraph, PathMode};
use crate::symbol::SymbolIndex;
use crate::trace::TraceStep;

/// Memoizing decoration over a frozen graph. All derived data is
/// computed once and cached behind one-time init gates; concurrent
/// first callers block on a single build instead of redoing work.
pub struct Analytics {
    graph: Arc<CodeGraph>,
    index: Arc<SymbolIndex>,
    config: AnalyticsConfig,
    scc: OnceCell<scc::SccDecomposition>,
    dominators: OnceCell<dominators::DominatorInfo>,
    pagerank: OnceCell<pagerank::PageRankVector>,
    /// Cached at the default resolution; other resolutions recompute.
    communities: OnceCell<communities::CommunityReport>,
    fingerprints: OnceCell<similarity::FingerprintStore>,
}

impl Analytics {
    pub fn new(graph: Arc<CodeGraph>, index: Arc<SymbolIndex>, config: AnalyticsConfig) -> Self {
        Self {
            graph,
            index,
            config,
            scc: OnceCell::new(),
            dominators: OnceCell::new(),
            pagerank: OnceCell::new(),
            communities: OnceCell::new(),
            fingerprints: OnceCell::new(),
        }
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    fn ensure_frozen(&self, operation: &str) -> Result<()> {
        if !self.graph.is_frozen() {
            return Err(LatticeError::not_frozen(operation));
        }
        Ok(())
    }

    fn scc(&self) -> &scc::SccDecomposition {
        self.scc.get_or_init(|| scc::compute(&self.graph))
    }

    fn dominators(&self) -> &dominators::DominatorInfo {
        self.dominators
            .get_or_init(|| dominators::compute(&self.graph, &self.index))
    }

    // ─── Operations ─────────────────────────────────────────────

    /// Ranked hotspots: `in_degree * 2 + out_degree`.
    pub fn hotspots(&self, k: usize, token: &CancellationToken) -> Result<(Vec<HotSpot>, TraceStep)> {
        self.ensure_frozen("hotspots")?;
        let mut step = TraceStep::new("hotspots", "graph");
        let spots = hotspots::find(&self.graph, k, token)?;
        step.meta("requested", k as u64);
        step.meta("returned", spots.len() as u64);
        step.finish();
        Ok((spots, step))
    }

    /// Unreferenced non-entry symbols.
    pub fn dead_code(
        &self,
        include_exported: bool,
        token: &CancellationToken,
    ) -> Result<(DeadCodeReport, TraceStep)> {
        self.ensure_frozen("dead_code")?;
        let mut step = TraceStep::new("dead_code", "graph");
        let report = deadcode::find(&self.graph, &self.index, include_exported, token)?;
        step.meta("dead", report.dead.len() as u64);
        step.meta("entries_excluded", report.entries_excluded as u64);
        step.finish();
        Ok((report, step))
    }

    /// Simple directed cycles of length >= `min_size`.
    pub fn cycles(
        &self,
        min_size: usize,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<(Vec<Cycle>, TraceStep)> {
        self.ensure_frozen("cycles")?;
        let limit = limit.min(self.config.max_cycle_limit);
        let mut step = TraceStep::new("cycles", "graph");
        let decomposition = self.scc();
        step.meta("scc_count", decomposition.components.len() as u64);
        let found = cycles::enumerate(&self.graph, decomposition, min_size, limit, token)?;
        step.meta("cycles", found.len() as u64);
        step.meta("limit", limit as u64);
        step.finish();
        Ok((found, step))
    }

    /// Natural loops from dominator back edges.
    pub fn loops(&self, token: &CancellationToken) -> Result<(Vec<NaturalLoop>, TraceStep)> {
        self.ensure_frozen("loops")?;
        let mut step = TraceStep::new("natural_loops", "graph");
        let dom = self.dominators();
        let found = loops::detect(&self.graph, dom, token)?;
        step.meta("loops", found.len() as u64);
        step.meta("entries", dom.entries.len() as u64);
        step.finish();
        Ok((found, step))
    }

    /// Single-entry-single-exit regions.
    pub fn regions(
        &self,
        min_size: usize,
        max_size: usize,
        token: &CancellationToken,
    ) -> Result<(Vec<SeseRegion>, TraceStep)> {
        self.ensure_frozen("sese_regions")?;
        let mut step = TraceStep::new("sese_regions", "graph");
        let found = sese::find_regions(&self.graph, self.dominators(), min_size, max_size, token)?;
        step.meta("regions", found.len() as u64);
        step.finish();
        Ok((found, step))
    }

    /// T1/T2 reducibility verdict.
    pub fn reducibility(&self, token: &CancellationToken) -> Result<(ReducibilityReport, TraceStep)> {
        self.ensure_frozen("reducibility")?;
        let mut step = TraceStep::new("reducibility", "graph");
        let entries = self.dominators().entries.clone();
        let report = reducibility::analyze(&self.graph, &entries, token)?;
        step.meta("is_reducible", report.is_reducible);
        step.meta("score", report.score);
        step.finish();
        Ok((report, step))
    }

    /// Leiden communities. The default resolution is served from the
    /// cache; other resolutions recompute.
    pub fn communities(
        &self,
        min_size: usize,
        resolution: f64,
        token: &CancellationToken,
    ) -> Result<(CommunityReport, TraceStep)> {
        self.ensure_frozen("communities")?;
        let mut step = TraceStep::new("leiden_communities", "graph");

        let report = if (resolution - 1.0).abs() < f64::EPSILON {
            let cached = self.communities.get_or_try_init(|| {
                communities::detect(
                    &self.graph,
                    1.0,
                    1,
                    self.config.max_community_levels,
                    self.config.max_community_sweeps,
                    token,
                )
            })?;
            filter_by_min_size(cached, min_size)
        } else {
            communities::detect(
                &self.graph,
                resolution,
                min_size,
                self.config.max_community_levels,
                self.config.max_community_sweeps,
                token,
            )?
        };

        step.meta("communities", report.communities.len() as u64);
        step.meta("modularity", report.modularity);
        step.meta("converged", report.converged);
        step.meta("resolution", resolution);
        step.finish();
        Ok((report, step))
    }

    /// PageRank-ranked nodes, damping 0.85.
    pub fn important(
        &self,
        top: usize,
        token: &CancellationToken,
    ) -> Result<(Vec<ImportantNode>, TraceStep)> {
        self.ensure_frozen("pagerank")?;
        let mut step = TraceStep::new("pagerank", "graph");
        let vector = self.pagerank.get_or_try_init(|| {
            pagerank::compute(&self.graph, self.config.max_pagerank_iterations, token)
        })?;
        let ranked = pagerank::top_nodes(&self.graph, vector, top);
        step.meta("iterations", vector.iterations as u64);
        step.meta("converged", vector.converged);
        step.finish();
        Ok((ranked, step))
    }

    /// BFS shortest path between two ids.
    pub fn shortest_path(
        &self,
        from_id: &str,
        to_id: &str,
        mode: PathMode,
        token: &CancellationToken,
    ) -> Result<(Option<Vec<String>>, TraceStep)> {
        let mut step = TraceStep::new("bfs_path", format!("{} -> {}", from_id, to_id));
        let path = self.graph.shortest_path(from_id, to_id, mode, token)?;
        match &path {
            Some(p) => step.meta("length", (p.len() - 1) as u64),
            None => step.meta("length", -1),
        }
        step.finish();
        Ok((path, step))
    }

    /// Fingerprint similarity. The store is built lazily on the first
    /// query behind a single-flight gate; later callers observe
    /// "already built". Fails explicitly on an unfrozen graph.
    pub fn similar(
        &self,
        symbol_id: &str,
        top: usize,
        token: &CancellationToken,
    ) -> Result<(Vec<SimilarNode>, TraceStep)> {
        self.ensure_frozen("similarity")?;
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("similarity"));
        }
        let target = self
            .graph
            .index_of(symbol_id)
            .ok_or_else(|| LatticeError::not_found(symbol_id))?;

        let mut step = TraceStep::new("similarity", symbol_id);
        let already_built = self.fingerprints.get().is_some();
        let store = self
            .fingerprints
            .get_or_init(|| similarity::FingerprintStore::build(&self.graph, &self.index));
        let ranked = store.rank_against(&self.graph, target, top);
        step.meta("fingerprints_reused", already_built);
        step.meta("returned", ranked.len() as u64);
        step.finish();
        Ok((ranked, step))
    }
}

/// Drop communities under `min_size` from a cached report, keeping
/// cross-edges between surviving communities only.
fn filter_by_min_size(report: &CommunityReport, min_size: usize) -> CommunityReport {
    let mut filtered = report.clone();
    filtered.communities.retain(|c| c.size >= min_size);
    let kept: std::collections::HashSet<usize> =
        filtered.communities.iter().map(|c| c.id).collect();
    filtered
        .cross_community_edges
        .retain(|e| kept.contains(&e.from) && kept.contains(&e.to));
    filtered.cross_package_communities = filtered
        .communities
        .iter()
        .filter(|c| c.is_cross_package)
        .count();
    filtered
}
