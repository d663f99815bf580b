//
//  paths.rs
//  Lattice
//
//  Created by hak (tharun)
//

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::render::{empty_report, found_report};
use super::{ParamSpec, ParamType, Params, Shared, Tool, ToolDefinition};
use crate::error::LatticeError;
use crate::graph::PathMode;
use crate::resolve::{KindFilter, Resolution, ResolveOptions, Resolver};
use crate::trace::{ToolResult, TraceStep};

/// How many candidates to resolve per endpoint, and how many alternate
/// pairs the retry loop may try after the primary search.
const CANDIDATES_PER_SIDE: usize = 3;
const MAX_RETRIES: usize = 3;

/// One hop of a found path.
#[derive(Debug, Clone, Serialize)]
pub struct PathHop {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
}

/// Connects resolution, BFS, and retry: validate both names, resolve
/// up to three candidates per side (callable-first), guard against both
/// sides resolving to the same symbol, then try alternate candidate
/// pairs until a path shows up or the retry budget runs out.
pub struct FindPathTool {
    shared: Arc<Shared>,
}

impl FindPathTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Callable-first candidate resolution: prefer callables, then
    /// widen to any kind, dedupe by id, cap at CANDIDATES_PER_SIDE.
    fn candidates(resolver: &Resolver<'_>, name: &str, param: &str) -> Result<Vec<Resolution>, LatticeError> {
        let callable = ResolveOptions {
            kind_filter: KindFilter::Callable,
            bare_method_fallback: true,
            package_hint: None,
            param: param.to_string(),
        };
        let mut out: Vec<Resolution> = match resolver.resolve_candidates(name, &callable, CANDIDATES_PER_SIDE) {
            Ok(c) => c,
            Err(e) if e.kind() == "not-found" => Vec::new(),
            Err(e) => return Err(e),
        };

        if out.len() < CANDIDATES_PER_SIDE {
            let any = ResolveOptions {
                kind_filter: KindFilter::Any,
                bare_method_fallback: true,
                package_hint: None,
                param: param.to_string(),
            };
            if let Ok(widened) = resolver.resolve_candidates(name, &any, CANDIDATES_PER_SIDE) {
                for r in widened {
                    if !out.iter().any(|o| o.symbol.id == r.symbol.id) {
                        out.push(r);
                    }
                }
            }
        }
        out.truncate(CANDIDATES_PER_SIDE);
        if out.is_empty() {
            return Err(LatticeError::not_found(name));
        }
        Ok(out)
    }

    /// Candidate pairs in search order: the primary pair first, then
    /// alternates ordered by combined rank. Pairs where both sides are
    /// the same symbol are skipped (the from-equals-to guard).
    fn pairs(from: &[Resolution], to: &[Resolution]) -> Vec<(usize, usize)> {
        let mut order: Vec<(usize, usize)> = Vec::new();
        for i in 0..from.len() {
            for j in 0..to.len() {
                order.push((i, j));
            }
        }
        order.sort_by_key(|&(i, j)| (i + j, i));
        order
            .into_iter()
            .filter(|&(i, j)| from[i].symbol.id != to[j].symbol.id)
            .take(1 + MAX_RETRIES)
            .collect()
    }
}

#[async_trait]
impl Tool for FindPathTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_path",
            category: "graph",
            description: "Shortest call path between two symbols, with automatic candidate retry when names are ambiguous. Length -1 means no path — that answer is exhaustive, not a miss.",
            params: vec![
                ParamSpec::required("from", ParamType::Str, "Start symbol name"),
                ParamSpec::required("to", ParamType::Str, "Target symbol name"),
                ParamSpec::optional("undirected", ParamType::Bool, "Ignore edge direction", json!(false)),
            ],
            routing_keywords: &["path", "connects", "how does", "reach", "route"],
            use_when: "You need the concrete chain linking two symbols",
            avoid_when: "You want all dependencies — use trace_dependencies",
            timeout: self.shared.config.timeout_for("find_path"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        let resolver = match self.shared.resolver() {
            Ok(r) => r,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("find_path"));
        }

        // Validate: required and non-generic on both sides. The
        // resolver re-checks, but failing here names the right param.
        let from_name = match params.required_str("from") {
            Ok(n) => n,
            Err(e) => return ToolResult::from_error(&e),
        };
        let to_name = match params.required_str("to") {
            Ok(n) => n,
            Err(e) => return ToolResult::from_error(&e),
        };
        let mode = if params.bool_or("undirected", false) {
            PathMode::Undirected
        } else {
            PathMode::Directed
        };

        // ResolveCandidates, callable-first, both sides.
        let from_candidates = match Self::candidates(&resolver, from_name, "from") {
            Ok(c) => c,
            Err(e) => return ToolResult::from_error(&e),
        };
        let to_candidates = match Self::candidates(&resolver, to_name, "to") {
            Ok(c) => c,
            Err(e) => return ToolResult::from_error(&e),
        };

        let mut step = TraceStep::new("find_path", format!("{} -> {}", from_name, to_name))
            .with_tool("find_path");
        step.meta("from_candidates", from_candidates.len() as u64);
        step.meta("to_candidates", to_candidates.len() as u64);

        // PrimarySearch plus RetryLoop over alternate pairs.
        let pairs = Self::pairs(&from_candidates, &to_candidates);
        if pairs.is_empty() {
            step.meta("attempts", 0u64);
            step.finish();
            return ToolResult::ok(
                json!({
                    "found": false,
                    "length": -1,
                    "from": from_name,
                    "to": to_name,
                }),
                empty_report(&format!(
                    "path from '{}' to '{}' (both resolve to the same symbol)",
                    from_name, to_name
                )),
            )
            .with_trace(step);
        }

        let mut attempts = 0u64;
        for (i, j) in &pairs {
            if token.is_cancelled() {
                return ToolResult::from_error(&LatticeError::cancelled("find_path"));
            }
            attempts += 1;
            let from_sym = &from_candidates[*i].symbol;
            let to_sym = &to_candidates[*j].symbol;

            let found = match analytics.graph().shortest_path(&from_sym.id, &to_sym.id, mode, token) {
                Ok(p) => p,
                Err(e) => return ToolResult::from_error(&e),
            };
            let Some(path) = found else {
                continue;
            };

            let hops: Vec<PathHop> = path
                .iter()
                .map(|id| {
                    let node = analytics.graph().get_node(id).expect("path ids are graph nodes");
                    PathHop {
                        id: node.id.clone(),
                        name: node.name.clone(),
                        file: node.file_path.clone(),
                        line: node.line,
                    }
                })
                .collect();
            let length = hops.len() - 1;
            step.meta("attempts", attempts);
            step.meta("length", length as u64);
            step.finish();

            let chain: Vec<&str> = hops.iter().map(|h| h.name.as_str()).collect();
            let locations: Vec<String> = hops
                .iter()
                .map(|h| format!("  {} {}:{}", h.name, h.file, h.line))
                .collect();
            let body = format!("{}\n{}", chain.join(" -> "), locations.join("\n"));
            let text = found_report(
                length,
                &format!("hop(s) from '{}' to '{}'", from_sym.name, to_sym.name),
                &body,
            );
            return ToolResult::ok(
                json!({
                    "found": true,
                    "length": length,
                    "from_resolved": from_sym.id,
                    "to_resolved": to_sym.id,
                    "path": hops,
                }),
                text,
            )
            .with_trace(step);
        }

        // Report: persistent failure after the retry loop.
        step.meta("attempts", attempts);
        step.meta("length", -1);
        step.finish();
        ToolResult::ok(
            json!({
                "found": false,
                "length": -1,
                "from": from_name,
                "to": to_name,
                "attempts": attempts,
            }),
            empty_report(&format!(
                "path from '{}' to '{}' after {} attempt(s)",
                from_name, to_name, attempts
            )),
        )
        .with_trace(step)
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

    /// Two symbols named `render`; only the lower-ranked one reaches
    /// `Display`. The retry loop must find the path through the
    /// alternate candidate.
    fn ambiguous_registry() -> ToolRegistry {
        let mut graph = CodeGraph::new(".");
        let mut index = SymbolIndex::new();

        // Shorter path ranks first but has no edges
        let decoy = Symbol::new("render", SymbolKind::Function, "a.ts", 1);
        let real = Symbol::new("render", SymbolKind::Function, "pkg/view.ts", 9);
        let display = Symbol::new("Display", SymbolKind::Function, "pkg/display.ts", 4);
        for sym in [&decoy, &real, &display] {
            graph.add_node(sym).unwrap();
            index.add((*sym).clone());
        }
        graph
            .add_edge(&real.id, &display.id, EdgeData::new(EdgeKind::Calls))
            .unwrap();
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
    async fn test_retry_loop_finds_alternate_candidate() {
        let registry = ambiguous_registry();
        let result = registry
            .execute(
                "find_path",
                params(&[("from", json!("render")), ("to", json!("Display"))]),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output["found"], true);
        assert!(result.output["length"].as_i64().unwrap() >= 1);
        assert_eq!(result.output["from_resolved"], "pkg/view.ts:9:render");
        let attempts = result.trace_step.as_ref().unwrap().metadata["attempts"]
            .as_u64()
            .unwrap();
        assert!(attempts >= 2, "expected a retry, got {} attempt(s)", attempts);
    }

    #[tokio::test]
    async fn test_direct_path() {
        let registry = fixture_registry();
        let result = registry
            .execute(
                "find_path",
                params(&[("from", json!("main")), ("to", json!("eval"))]),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output["found"], true);
        assert_eq!(result.output["length"], 2);
        assert!(result.output_text.contains("main -> parse -> eval"));
    }

    #[tokio::test]
    async fn test_no_path_reports_minus_one() {
        let registry = fixture_registry();
        let result = registry
            .execute(
                "find_path",
                params(&[("from", json!("eval")), ("to", json!("render"))]),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output["found"], false);
        assert_eq!(result.output["length"], -1);
        assert!(result.output_text.starts_with("## GRAPH RESULT: No path"));
    }

    #[tokio::test]
    async fn test_generic_word_rejected() {
        let registry = fixture_registry();
        let result = registry
            .execute(
                "find_path",
                params(&[("from", json!("function")), ("to", json!("main"))]),
            )
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some("invalid-parameter"));
        let msg = result.error.as_deref().unwrap();
        assert!(msg.contains("generic word"));
        assert!(msg.contains("from"));
        assert!(msg.contains("parseConfig"));
    }

    #[tokio::test]
    async fn test_undirected_reaches_backwards() {
        let registry = fixture_registry();
        let result = registry
            .execute(
                "find_path",
                params(&[
                    ("from", json!("eval")),
                    ("to", json!("render")),
                    ("undirected", json!(true)),
                ]),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output["found"], true);
    }
}
