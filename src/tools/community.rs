//
//  community.rs
//  Lattice
//
//  Created by hak (tharun)
//

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::render::{empty_report, found_report};
use super::{ParamSpec, ParamType, Params, Shared, Tool, ToolDefinition};
use crate::error::LatticeError;
use crate::resolve::ResolveOptions;
use crate::trace::ToolResult;

// ─── detect_communities ─────────────────────────────────────────

pub struct DetectCommunitiesTool {
    shared: Arc<Shared>,
}

impl DetectCommunitiesTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for DetectCommunitiesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "detect_communities",
            category: "analytics",
            description: "Leiden community detection over the call graph: cohesive symbol clusters, their packages, and the bridges between them. Pass `focus` to see which community a symbol lands in.",
            params: vec![
                ParamSpec::optional("min_size", ParamType::Int, "Smallest community to report (>=1)", json!(2)),
                ParamSpec::optional("resolution", ParamType::Float, "Modularity resolution; higher splits finer", json!(1.0)),
                ParamSpec::optional("top", ParamType::Int, "How many communities (1-100)", json!(10)),
                ParamSpec::optional("show_cross_edges", ParamType::Bool, "Report bridges between communities", json!(true)),
                ParamSpec::optional("focus", ParamType::Str, "Symbol whose community should be highlighted", json!("")),
            ],
            routing_keywords: &["community", "cluster", "module boundary", "cohesion", "belongs to"],
            use_when: "You need the de-facto module structure, not the directory layout",
            avoid_when: "You want one symbol's neighbors — use trace_dependencies",
            timeout: self.shared.config.timeout_for("detect_communities"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("detect_communities"));
        }
        let min_size = params.min_size_or(2);
        let resolution = params.float_or("resolution", 1.0).clamp(0.1, 10.0);
        let show_cross_edges = params.bool_or("show_cross_edges", true);

        let (mut report, mut step) = match analytics.communities(min_size, resolution, token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "detect_communities".to_string();
        report.communities.truncate(params.top());

        // Optional focus: which community does this symbol/module
        // belong to?
        let focus_line = match params.str("focus").filter(|s| !s.is_empty()) {
            Some(focus_name) => {
                let resolver = match self.shared.resolver() {
                    Ok(r) => r,
                    Err(e) => return ToolResult::from_error(&e),
                };
                let options = ResolveOptions {
                    bare_method_fallback: true,
                    param: "focus".to_string(),
                    ..Default::default()
                };
                match resolver.resolve(focus_name, &options) {
                    Ok(resolved) => {
                        let home = report
                            .communities
                            .iter()
                            .find(|c| c.members.contains(&resolved.symbol.id));
                        match home {
                            Some(c) => Some(format!(
                                "focus: '{}' belongs to community {} (size {}, package {})",
                                resolved.symbol.name, c.id, c.size, c.dominant_package
                            )),
                            None => Some(format!(
                                "focus: '{}' is not in any reported community (below min_size or filtered)",
                                resolved.symbol.name
                            )),
                        }
                    }
                    Err(e) => return ToolResult::from_error(&e),
                }
            }
            None => None,
        };

        if report.communities.is_empty() {
            return ToolResult::ok(
                json!({ "report": report }),
                empty_report("communities detected"),
            )
            .with_trace(step);
        }

        let mut body: Vec<String> = Vec::new();
        body.push(format!(
            "algorithm={} modularity={:.3} quality={} converged={}",
            report.algorithm, report.modularity, report.quality_label, report.converged
        ));
        if let Some(line) = &focus_line {
            body.push(line.clone());
        }
        for c in &report.communities {
            body.push(format!(
                "community {}: size={} package={}{} internal={} external={} connectivity={:.2}",
                c.id,
                c.size,
                c.dominant_package,
                if c.is_cross_package { " (cross-package)" } else { "" },
                c.internal_edges,
                c.external_edges,
                c.connectivity
            ));
        }
        if show_cross_edges && !report.cross_community_edges.is_empty() {
            body.push("cross-community edges:".to_string());
            for e in &report.cross_community_edges {
                body.push(format!("  {} -> {} ({} edge(s))", e.from, e.to, e.count));
            }
        }

        let count = report.communities.len();
        let text = found_report(count, "communit(ies)", &body.join("\n"));
        ToolResult::ok(json!({ "report": report, "focus": focus_line }), text).with_trace(step)
    }
}

// ─── find_similar ───────────────────────────────────────────────

pub struct FindSimilarTool {
    shared: Arc<Shared>,
}

impl FindSimilarTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FindSimilarTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_similar",
            category: "analytics",
            description: "Rank symbols structurally similar to a target by call-target fingerprint, kind, and size bucket. Finds copy-paste siblings and parallel implementations.",
            params: vec![
                ParamSpec::required("symbol", ParamType::Str, "Symbol name or full id"),
                ParamSpec::optional("top", ParamType::Int, "How many matches (1-100)", json!(10)),
            ],
            routing_keywords: &["similar", "duplicate", "copy paste", "like this"],
            use_when: "You suspect near-duplicates or want the pattern family of a function",
            avoid_when: "You need exact textual clones — this is structural",
            timeout: self.shared.config.timeout_for("find_similar"),
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
            return ToolResult::from_error(&LatticeError::cancelled("find_similar"));
        }
        let name = match params.required_str("symbol") {
            Ok(n) => n,
            Err(e) => return ToolResult::from_error(&e),
        };

        let options = ResolveOptions {
            bare_method_fallback: true,
            param: "symbol".to_string(),
            ..Default::default()
        };
        let resolved = match resolver.resolve(name, &options) {
            Ok(r) => r,
            Err(e) => return ToolResult::from_error(&e),
        };

        let (ranked, mut step) = match analytics.similar(&resolved.symbol.id, params.top(), token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "find_similar".to_string();

        if ranked.is_empty() {
            return ToolResult::ok(
                json!({ "symbol": resolved.symbol.id, "similar": [] }),
                empty_report(&format!("symbols similar to '{}'", resolved.symbol.name)),
            )
            .with_trace(step);
        }

        let body: Vec<String> = ranked
            .iter()
            .map(|s| format!("{} score={:.3} {}", s.name, s.score, s.file))
            .collect();
        let text = found_report(
            ranked.len(),
            &format!("symbol(s) similar to '{}'", resolved.symbol.name),
            &body.join("\n"),
        );
        ToolResult::ok(
            json!({ "symbol": resolved.symbol.id, "similar": ranked }),
            text,
        )
        .with_trace(step)
    }
}
