//
//  edges.rs
//  Lattice
//
//  Created by hak (tharun)
//

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::filters;
use super::render::{empty_report, found_report};
use super::{ParamSpec, ParamType, Params, Shared, Tool, ToolDefinition};
use crate::error::LatticeError;
use crate::graph::{EdgeKind, NodeData};
use crate::resolve::ResolveOptions;
use crate::trace::{ToolResult, TraceStep};

/// One edge endpoint with the recording site.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeHit {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_line: Option<u32>,
}

impl EdgeHit {
    fn new(node: &NodeData, site_file: Option<String>, site_line: Option<u32>) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind.to_string(),
            file: node.file_path.clone(),
            line: node.line,
            package: node.package.clone(),
            site_file,
            site_line,
        }
    }

    fn line_report(&self) -> String {
        match (&self.site_file, self.site_line) {
            (Some(f), Some(l)) => format!("{} {}:{} (site {}:{})", self.name, self.file, self.line, f, l),
            _ => format!("{} {}:{}", self.name, self.file, self.line),
        }
    }
}

/// One tool per edge view: who_calls, list_callees, find_references,
/// find_implementations, find_subtypes. They share resolution,
/// filtering, and rendering; only the edge kind and direction differ.
pub(crate) struct EdgeQueryTool {
    shared: Arc<Shared>,
    name: &'static str,
    description: &'static str,
    edge_kind: EdgeKind,
    incoming: bool,
    what: &'static str,
    keywords: &'static [&'static str],
    use_when: &'static str,
    avoid_when: &'static str,
}

pub(crate) fn edge_query_tools(shared: &Arc<Shared>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(EdgeQueryTool {
            shared: shared.clone(),
            name: "who_calls",
            description: "List every call site targeting a symbol, with exact locations. Authoritative — covers dynamic dispatch only best-effort, everything static exactly.",
            edge_kind: EdgeKind::Calls,
            incoming: true,
            what: "caller(s) of",
            keywords: &["who calls", "callers", "used by", "call sites"],
            use_when: "You need the blast radius of changing a function",
            avoid_when: "You want data/type references — use find_references",
        }),
        Box::new(EdgeQueryTool {
            shared: shared.clone(),
            name: "list_callees",
            description: "List everything a symbol calls, with call sites. The outgoing half of the call graph.",
            edge_kind: EdgeKind::Calls,
            incoming: false,
            what: "callee(s) of",
            keywords: &["calls", "callees", "depends on", "invokes"],
            use_when: "You need what a function relies on",
            avoid_when: "You need transitive dependencies — use trace_dependencies",
        }),
        Box::new(EdgeQueryTool {
            shared: shared.clone(),
            name: "find_references",
            description: "List non-call references to a symbol (reads, type mentions, re-exports).",
            edge_kind: EdgeKind::References,
            incoming: true,
            what: "reference(s) to",
            keywords: &["references", "uses", "mentions"],
            use_when: "You need every mention, not just calls",
            avoid_when: "Call sites are enough — who_calls is cheaper to read",
        }),
        Box::new(EdgeQueryTool {
            shared: shared.clone(),
            name: "find_implementations",
            description: "List types implementing an interface.",
            edge_kind: EdgeKind::Implements,
            incoming: true,
            what: "implementation(s) of",
            keywords: &["implements", "implementations", "conforms"],
            use_when: "You hold an interface and need its concrete types",
            avoid_when: "You want subclasses of a class — use find_subtypes",
        }),
        Box::new(EdgeQueryTool {
            shared: shared.clone(),
            name: "find_subtypes",
            description: "List types extending a class or type.",
            edge_kind: EdgeKind::Extends,
            incoming: true,
            what: "subtype(s) of",
            keywords: &["extends", "subclasses", "subtypes", "derived"],
            use_when: "You need the inheritance fan-out of a type",
            avoid_when: "You want interface conformance — use find_implementations",
        }),
    ]
}

#[async_trait]
impl Tool for EdgeQueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            category: "edges",
            description: self.description,
            params: vec![
                ParamSpec::required("symbol", ParamType::Str, "Symbol name or full id"),
                ParamSpec::optional("limit", ParamType::Int, "Max results (1-500)", json!(50)),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop results in test files", json!(true)),
                ParamSpec::optional("package", ParamType::Str, "Boundary-aware package filter", json!("")),
            ],
            routing_keywords: self.keywords,
            use_when: self.use_when,
            avoid_when: self.avoid_when,
            timeout: self.shared.config.timeout_for(self.name),
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
            return ToolResult::from_error(&LatticeError::cancelled(self.name));
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
        let target = &resolved.symbol;

        let mut step = TraceStep::new("edge_query", &target.id).with_tool(self.name);
        let graph = analytics.graph();
        let edges = if self.incoming {
            graph.in_edges(&target.id)
        } else {
            graph.out_edges(&target.id)
        };

        let mut hits: Vec<EdgeHit> = edges
            .into_iter()
            .filter(|(edge, _)| edge.kind == self.edge_kind)
            .map(|(edge, other)| EdgeHit::new(other, edge.file.clone(), edge.line))
            .collect();
        hits.sort_by(|a, b| {
            a.id.cmp(&b.id)
                .then_with(|| a.site_line.cmp(&b.site_line))
        });

        let hits = filters::exclude_tests(hits, params.exclude_tests(), |h| &h.file);
        let mut hits = filters::filter_package(hits, params.package(), |h| {
            (h.package.clone(), h.file.clone())
        });
        hits.truncate(params.limit());
        step.meta("hits", hits.len() as u64);
        step.finish();

        let subject = format!("{} '{}'", self.what, target.name);
        if hits.is_empty() {
            return ToolResult::ok(
                json!({ "symbol": target.id, "results": [] }),
                empty_report(&subject),
            )
            .with_trace(step);
        }

        let body: Vec<String> = hits.iter().map(|h| h.line_report()).collect();
        let text = found_report(hits.len(), &subject, &body.join("\n"));
        ToolResult::ok(json!({ "symbol": target.id, "results": hits }), text).with_trace(step)
    }
}

// ─── trace_dependencies ─────────────────────────────────────────

/// One node reached during a dependency walk.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyHop {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub depth: usize,
}

pub struct TraceDependenciesTool {
    shared: Arc<Shared>,
}

impl TraceDependenciesTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for TraceDependenciesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "trace_dependencies",
            category: "edges",
            description: "Walk the call graph outward from a symbol, breadth-first, up to a depth. Shows what the symbol transitively relies on, level by level.",
            params: vec![
                ParamSpec::required("symbol", ParamType::Str, "Symbol name or full id"),
                ParamSpec::optional("depth", ParamType::Int, "Levels to walk (1-10)", json!(3)),
                ParamSpec::optional("limit", ParamType::Int, "Max nodes (1-500)", json!(50)),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop results in test files", json!(true)),
            ],
            routing_keywords: &["transitive", "dependency tree", "relies on", "fan out"],
            use_when: "One level of callees is not enough context",
            avoid_when: "You only need direct callees — list_callees is smaller",
            timeout: self.shared.config.timeout_for("trace_dependencies"),
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
            return ToolResult::from_error(&LatticeError::cancelled("trace_dependencies"));
        }
        let name = match params.required_str("symbol") {
            Ok(n) => n,
            Err(e) => return ToolResult::from_error(&e),
        };
        let max_depth = params.int_or("depth", 3).clamp(1, 10) as usize;
        let limit = params.limit();

        let options = ResolveOptions {
            bare_method_fallback: true,
            param: "symbol".to_string(),
            ..Default::default()
        };
        let resolved = match resolver.resolve(name, &options) {
            Ok(r) => r,
            Err(e) => return ToolResult::from_error(&e),
        };
        let root_id = resolved.symbol.id.clone();

        let mut step = TraceStep::new("dependency_walk", &root_id).with_tool("trace_dependencies");
        let graph = analytics.graph();

        let mut hops: Vec<DependencyHop> = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([root_id.clone()]);
        let mut frontier: VecDeque<(String, usize)> = VecDeque::from([(root_id.clone(), 0)]);

        while let Some((id, depth)) = frontier.pop_front() {
            if token.is_cancelled() {
                return ToolResult::from_error(&LatticeError::cancelled("trace_dependencies"));
            }
            if depth >= max_depth || hops.len() >= limit {
                continue;
            }
            let mut next: Vec<&NodeData> = graph
                .out_edges(&id)
                .into_iter()
                .filter(|(edge, _)| edge.kind == EdgeKind::Calls)
                .map(|(_, node)| node)
                .collect();
            next.sort_by(|a, b| a.id.cmp(&b.id));
            for node in next {
                if hops.len() >= limit {
                    break;
                }
                if visited.insert(node.id.clone()) {
                    hops.push(DependencyHop {
                        id: node.id.clone(),
                        name: node.name.clone(),
                        file: node.file_path.clone(),
                        line: node.line,
                        depth: depth + 1,
                    });
                    frontier.push_back((node.id.clone(), depth + 1));
                }
            }
        }

        let hops = filters::exclude_tests(hops, params.exclude_tests(), |h| &h.file);
        step.meta("nodes", hops.len() as u64);
        step.meta("depth", max_depth as u64);
        step.finish();

        let subject = format!("transitive dependenc(ies) of '{}'", resolved.symbol.name);
        if hops.is_empty() {
            return ToolResult::ok(
                json!({ "symbol": root_id, "dependencies": [] }),
                empty_report(&subject),
            )
            .with_trace(step);
        }

        let body: Vec<String> = hops
            .iter()
            .map(|h| format!("{}· {} {}:{}", "  ".repeat(h.depth - 1), h.name, h.file, h.line))
            .collect();
        let text = found_report(hops.len(), &subject, &body.join("\n"));
        ToolResult::ok(json!({ "symbol": root_id, "dependencies": hops }), text).with_trace(step)
    }
}
