//
//  structure.rs
//  Lattice
//
//  Created by hak (tharun)
//

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::filters;
use super::render::{empty_report, found_report};
use super::{ParamSpec, ParamType, Params, Shared, Tool, ToolDefinition};
use crate::error::LatticeError;
use crate::trace::{ToolResult, TraceStep};

/// Fetch more than `top` before language-aware filtering so the
/// filters trim, not starve, the final ranking.
fn oversample(top: usize) -> usize {
    (top * 5).min(500)
}

// ─── find_hotspots ──────────────────────────────────────────────

pub struct FindHotspotsTool {
    shared: Arc<Shared>,
}

impl FindHotspotsTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FindHotspotsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_hotspots",
            category: "analytics",
            description: "Rank the most connected symbols (in-degree weighted double). These are the load-bearing walls of the codebase — check them before broad refactors.",
            params: vec![
                ParamSpec::optional("top", ParamType::Int, "How many to return (1-100)", json!(10)),
                ParamSpec::optional("sort_by", ParamType::Enum(&["score", "in_degree", "out_degree"]), "Ranking key", json!("score")),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop hotspots in test files", json!(true)),
                ParamSpec::optional("package", ParamType::Str, "Boundary-aware package filter", json!("")),
            ],
            routing_keywords: &["hotspot", "most connected", "central", "load bearing"],
            use_when: "You need the structurally riskiest symbols first",
            avoid_when: "You want PageRank-style global importance — use find_important",
            timeout: self.shared.config.timeout_for("find_hotspots"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("find_hotspots"));
        }
        let top = params.top();

        let (spots, mut step) = match analytics.hotspots(oversample(top), token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "find_hotspots".to_string();

        let spots = filters::exclude_tests(spots, params.exclude_tests(), |s| &s.file);
        let mut spots = filters::filter_package(spots, params.package(), |s| {
            (s.package.clone(), s.file.clone())
        });
        match params.enum_or("sort_by", &["score", "in_degree", "out_degree"], "score") {
            "in_degree" => spots.sort_by(|a, b| b.in_degree.cmp(&a.in_degree).then_with(|| a.id.cmp(&b.id))),
            "out_degree" => spots.sort_by(|a, b| b.out_degree.cmp(&a.out_degree).then_with(|| a.id.cmp(&b.id))),
            _ => {}
        }
        spots.truncate(top);

        if spots.is_empty() {
            return ToolResult::ok(json!({ "hotspots": [] }), empty_report("hotspots")).with_trace(step);
        }

        let body: Vec<String> = spots
            .iter()
            .map(|s| {
                format!(
                    "{} score={} in={} out={} {}",
                    s.name, s.score, s.in_degree, s.out_degree, s.file
                )
            })
            .collect();
        let text = found_report(spots.len(), "hotspot(s)", &body.join("\n"));
        ToolResult::ok(json!({ "hotspots": spots }), text).with_trace(step)
    }
}

// ─── find_dead_code ─────────────────────────────────────────────

pub struct FindDeadCodeTool {
    shared: Arc<Shared>,
}

impl FindDeadCodeTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FindDeadCodeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_dead_code",
            category: "analytics",
            description: "List symbols nothing calls, excluding entry points (main/init, Test*, interface methods, exported API). Exhaustive over the indexed graph.",
            params: vec![
                ParamSpec::optional("include_exported", ParamType::Bool, "Treat exported symbols as dead candidates too", json!(false)),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop dead symbols in test files", json!(true)),
                ParamSpec::optional("package", ParamType::Str, "Boundary-aware package filter", json!("")),
                ParamSpec::optional("limit", ParamType::Int, "Max results (1-500)", json!(50)),
            ],
            routing_keywords: &["dead code", "unused", "unreferenced", "never called"],
            use_when: "You are hunting deletable code",
            avoid_when: "Reflection-heavy code — static reachability undercounts",
            timeout: self.shared.config.timeout_for("find_dead_code"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("find_dead_code"));
        }

        let (report, mut step) =
            match analytics.dead_code(params.bool_or("include_exported", false), token) {
                Ok(x) => x,
                Err(e) => return ToolResult::from_error(&e),
            };
        step.tool = "find_dead_code".to_string();

        let dead = filters::exclude_tests(report.dead, params.exclude_tests(), |d| &d.file);
        let mut dead = filters::filter_package(dead, params.package(), |d| {
            (d.package.clone(), d.file.clone())
        });
        dead.truncate(params.limit());

        if dead.is_empty() {
            return ToolResult::ok(
                json!({ "dead": [], "entries_excluded": report.entries_excluded }),
                empty_report("dead code"),
            )
            .with_trace(step);
        }

        let body: Vec<String> = dead
            .iter()
            .map(|d| format!("{} {}:{} — {}", d.name, d.file, d.line, d.reason))
            .collect();
        let text = found_report(dead.len(), "dead symbol(s)", &body.join("\n"));
        ToolResult::ok(
            json!({ "dead": dead, "entries_excluded": report.entries_excluded }),
            text,
        )
        .with_trace(step)
    }
}

// ─── find_important ─────────────────────────────────────────────

pub struct FindImportantTool {
    shared: Arc<Shared>,
}

impl FindImportantTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FindImportantTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_important",
            category: "analytics",
            description: "PageRank over the call graph (damping 0.85). Surfaces globally important symbols even when their direct degree is modest.",
            params: vec![
                ParamSpec::optional("top", ParamType::Int, "How many to return (1-100)", json!(10)),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop results in test files", json!(true)),
                ParamSpec::optional("package", ParamType::Str, "Boundary-aware package filter", json!("")),
            ],
            routing_keywords: &["important", "pagerank", "key symbols", "core"],
            use_when: "You want global importance, not raw connectivity",
            avoid_when: "Degree counts suffice — find_hotspots is cheaper",
            timeout: self.shared.config.timeout_for("find_important"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("find_important"));
        }
        let top = params.top();

        let (ranked, mut step) = match analytics.important(oversample(top), token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "find_important".to_string();

        let ranked = filters::exclude_tests(ranked, params.exclude_tests(), |r| &r.file);
        let mut ranked = filters::filter_package(ranked, params.package(), |r| {
            (r.package.clone(), r.file.clone())
        });
        ranked.truncate(top);

        if ranked.is_empty() {
            return ToolResult::ok(json!({ "important": [] }), empty_report("ranked symbols"))
                .with_trace(step);
        }

        let body: Vec<String> = ranked
            .iter()
            .map(|r| format!("#{} {} pagerank={:.6} {}", r.rank, r.name, r.pagerank, r.file))
            .collect();
        let text = found_report(ranked.len(), "important symbol(s)", &body.join("\n"));
        ToolResult::ok(json!({ "important": ranked }), text).with_trace(step)
    }
}

// ─── graph_stats ────────────────────────────────────────────────

pub struct GraphStatsTool {
    shared: Arc<Shared>,
}

impl GraphStatsTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for GraphStatsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "graph_stats",
            category: "graph",
            description: "Node/edge counts and degree extremes for the frozen graph. Cheap sanity check before heavier analytics.",
            params: vec![],
            routing_keywords: &["stats", "graph size", "how many", "summary"],
            use_when: "You want to size the graph before deep queries",
            avoid_when: "You already know the graph scale",
            timeout: self.shared.config.timeout_for("graph_stats"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, _params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("graph_stats"));
        }

        let mut step = TraceStep::new("graph_stats", "graph").with_tool("graph_stats");
        let stats = analytics.graph().stats();
        step.meta("nodes", stats.node_count as u64);
        step.meta("edges", stats.edge_count as u64);
        step.finish();

        let body = format!(
            "nodes={} edges={} frozen={} max_in={} max_out={}",
            stats.node_count, stats.edge_count, stats.frozen, stats.max_in_degree, stats.max_out_degree
        );
        let text = found_report(1, "graph summary", &body);
        ToolResult::ok(json!({ "stats": stats }), text).with_trace(step)
    }
}

#[cfg(test)]
mod tests {
    use crate::analytics::Analytics;
    use crate::config::EngineConfig;
    use crate::graph::{CodeGraph, EdgeData, EdgeKind};
    use crate::symbol::{Symbol, SymbolIndex, SymbolKind};
    use crate::tools::testing::{fixture_registry, params};
    use crate::tools::ToolRegistry;
    use serde_json::json;
    use std::sync::Arc;

    /// Registry whose declared packages never appear in the file paths,
    /// so the package filter must match on the package field itself.
    fn packaged_registry() -> ToolRegistry {
        let mut graph = CodeGraph::new(".");
        let mut index = SymbolIndex::new();
        for (name, file, package) in [
            ("Login", "src/handlers.go", "auth"),
            ("Checkout", "src/handlers.go", "billing"),
            ("caller", "src/main.go", "app"),
        ] {
            let mut sym = Symbol::new(name, SymbolKind::Function, file, 1);
            sym.package = package.to_string();
            graph.add_node(&sym).unwrap();
            index.add(sym);
        }
        for target in ["Login", "Checkout"] {
            graph
                .add_edge(
                    "src/main.go:1:caller",
                    &format!("src/handlers.go:1:{}", target),
                    EdgeData::new(EdgeKind::Calls),
                )
                .unwrap();
        }
        graph.freeze();

        let config = Arc::new(EngineConfig::default());
        let analytics = Arc::new(Analytics::new(
            Arc::new(graph),
            Arc::new(index),
            config.analytics.clone(),
        ));
        ToolRegistry::new(Some(analytics), config)
    }

    #[tokio::test]
    async fn test_package_filter_matches_declared_package() {
        let registry = packaged_registry();
        let result = registry
            .execute(
                "find_hotspots",
                params(&[("package", json!("auth")), ("top", json!(10))]),
            )
            .await;
        assert!(result.success);
        let spots = result.output["hotspots"].as_array().unwrap();
        // "auth" appears nowhere in any file path; only the package
        // field can satisfy the filter
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0]["name"], "Login");
        assert_eq!(spots[0]["package"], "auth");
    }

    #[tokio::test]
    async fn test_hotspots_ranked_and_clamped() {
        let registry = fixture_registry();
        let result = registry
            .execute("find_hotspots", params(&[("top", json!(3))]))
            .await;
        assert!(result.success);
        let spots = result.output["hotspots"].as_array().unwrap();
        assert!(spots.len() <= 3);
        // eval: in 2 (parse + self), out 1 (self) -> score 5, top spot
        assert_eq!(spots[0]["name"], "eval");
        assert_eq!(spots[0]["score"], 5);
    }

    #[tokio::test]
    async fn test_dead_code_scenario() {
        let registry = fixture_registry();
        let result = registry
            .execute(
                "find_dead_code",
                params(&[("include_exported", json!(true)), ("exclude_tests", json!(false))]),
            )
            .await;
        assert!(result.success);
        let dead = result.output["dead"].as_array().unwrap();
        // orphan is the only symbol with no callers that is not an
        // entry point (main and TestRender are excluded)
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0]["name"], "orphan");
        assert_eq!(dead[0]["reason"], "no incoming calls");
    }

    #[tokio::test]
    async fn test_find_important_positive_ranks() {
        let registry = fixture_registry();
        let result = registry.execute("find_important", params(&[])).await;
        assert!(result.success);
        let ranked = result.output["important"].as_array().unwrap();
        assert!(!ranked.is_empty());
        for r in ranked {
            assert!(r["pagerank"].as_f64().unwrap() > 0.0);
        }
    }

    #[tokio::test]
    async fn test_graph_stats_counts() {
        let registry = fixture_registry();
        let result = registry.execute("graph_stats", params(&[])).await;
        assert!(result.success);
        assert_eq!(result.output["stats"]["node_count"], 6);
        assert_eq!(result.output["stats"]["edge_count"], 5);
        assert_eq!(result.output["stats"]["frozen"], true);
    }
}
