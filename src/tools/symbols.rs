//
//  symbols.rs
//  Lattice
//
//  Created by hak (tharun)
//

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::filters;
use super::render::{empty_report, found_report};
use super::{ParamSpec, ParamType, Params, Shared, Tool, ToolDefinition};
use crate::error::LatticeError;
use crate::resolve::{KindFilter, ResolveOptions};
use crate::symbol::{Symbol, SymbolKind};
use crate::trace::{ToolResult, TraceStep};

/// Compact symbol line for tool payloads.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolSummary {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub receiver: String,
}

impl SymbolSummary {
    pub fn from_symbol(sym: &Symbol) -> Self {
        Self {
            id: sym.id.clone(),
            name: sym.name.clone(),
            kind: sym.kind.to_string(),
            file: sym.file_path.clone(),
            line: sym.start_line,
            package: sym.package.clone(),
            receiver: sym.receiver.clone(),
        }
    }

    pub fn line_report(&self) -> String {
        format!("{} {} {}:{}", self.name, self.kind, self.file, self.line)
    }
}

pub(crate) fn kind_filter_param(value: &str) -> KindFilter {
    match value {
        "callable" => KindFilter::Callable,
        "type" => KindFilter::Type,
        _ => KindFilter::Any,
    }
}

const KIND_ENUM: &[&str] = &[
    "all", "function", "method", "property", "class", "struct", "interface", "type", "enum",
    "variable", "constant", "field", "import",
];

// ─── find_symbol ────────────────────────────────────────────────

pub struct FindSymbolTool {
    shared: Arc<Shared>,
}

impl FindSymbolTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FindSymbolTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_symbol",
            category: "symbols",
            description: "Resolve a name (bare, dotted Type.method, qualified, or full id) to concrete symbols with exact locations. Handles inheritance, overload stubs, and fuzzy fallback. The primary candidate comes first — trust it.",
            params: vec![
                ParamSpec::required("name", ParamType::Str, "Symbol name, e.g. 'render', 'Engine.runRenderLoop', 'src/view.ts:42:render'"),
                ParamSpec::optional("kind", ParamType::Enum(&["any", "callable", "type"]), "Restrict to callables or types", json!("any")),
                ParamSpec::optional("package", ParamType::Str, "Boundary-aware package hint for disambiguation", json!("")),
                ParamSpec::optional("bare_fallback", ParamType::Bool, "Retry the bare method part when dotted resolution fails", json!(true)),
                ParamSpec::optional("top", ParamType::Int, "Max candidates (1-100)", json!(10)),
            ],
            routing_keywords: &["symbol", "definition", "where is", "resolve", "lookup"],
            use_when: "You have a name and need its definition site or its id for other tools",
            avoid_when: "You already hold a full symbol id and only need edges",
            timeout: self.shared.config.timeout_for("find_symbol"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let resolver = match self.shared.resolver() {
            Ok(r) => r,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("find_symbol"));
        }
        let name = match params.required_str("name") {
            Ok(n) => n,
            Err(e) => return ToolResult::from_error(&e),
        };

        let options = ResolveOptions {
            kind_filter: kind_filter_param(params.enum_or("kind", &["any", "callable", "type"], "any")),
            bare_method_fallback: params.bool_or("bare_fallback", true),
            package_hint: params.package().map(str::to_string),
            param: "name".to_string(),
        };

        let mut step = TraceStep::new("resolve", name).with_tool("find_symbol");
        let candidates = match resolver.resolve_candidates(name, &options, params.top()) {
            Ok(c) => c,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.meta("candidates", candidates.len() as u64);
        step.meta("strategy", candidates[0].strategy);
        step.meta("fuzzy", candidates[0].fuzzy);
        step.finish();

        let summaries: Vec<SymbolSummary> = candidates
            .iter()
            .map(|r| SymbolSummary::from_symbol(&r.symbol))
            .collect();
        let body: Vec<String> = candidates
            .iter()
            .map(|r| {
                let mut line = SymbolSummary::from_symbol(&r.symbol).line_report();
                if r.fuzzy {
                    line.push_str(" (fuzzy)");
                }
                line
            })
            .collect();

        let text = found_report(
            summaries.len(),
            &format!("symbol(s) for '{}'", name),
            &body.join("\n"),
        );
        ToolResult::ok(
            json!({
                "query": name,
                "strategy": candidates[0].strategy,
                "fuzzy": candidates[0].fuzzy,
                "symbols": summaries,
            }),
            text,
        )
        .with_trace(step)
    }
}

// ─── search_symbols ─────────────────────────────────────────────

pub struct SearchSymbolsTool {
    shared: Arc<Shared>,
}

impl SearchSymbolsTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for SearchSymbolsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_symbols",
            category: "symbols",
            description: "Fuzzy search the symbol index by name fragment. Returns lightweight NAME KIND FILE:LINE rows, ranked. Use before find_symbol when you only know part of a name.",
            params: vec![
                ParamSpec::required("query", ParamType::Str, "Name fragment, case-insensitive"),
                ParamSpec::optional("kind", ParamType::Enum(KIND_ENUM), "Keep only this symbol kind", json!("all")),
                ParamSpec::optional("limit", ParamType::Int, "Max results (1-500)", json!(50)),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop matches in test files", json!(true)),
                ParamSpec::optional("package", ParamType::Str, "Boundary-aware package filter", json!("")),
            ],
            routing_keywords: &["search", "find", "grep symbol", "name fragment"],
            use_when: "You only know a fragment or an approximate spelling",
            avoid_when: "You know the exact name — find_symbol ranks better",
            timeout: self.shared.config.timeout_for("search_symbols"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("search_symbols"));
        }
        let query = match params.required_str("query") {
            Ok(q) => q,
            Err(e) => return ToolResult::from_error(&e),
        };
        let limit = params.limit();
        let kind = params.enum_or("kind", KIND_ENUM, "all");

        let mut step = TraceStep::new("fuzzy_search", query).with_tool("search_symbols");
        let hits = analytics.index().fuzzy_search(
            query,
            limit * 4,
            self.shared.config.resolution.max_fuzzy_candidates,
        );
        let mut symbols: Vec<&Symbol> = hits
            .iter()
            .filter_map(|h| analytics.index().get(&h.id))
            .collect();
        if kind != "all" {
            let wanted = SymbolKind::parse(kind);
            symbols.retain(|s| s.kind == wanted);
        }
        let symbols = filters::exclude_tests(symbols, params.exclude_tests(), |s| &s.file_path);
        let symbols = filters::filter_package(symbols, params.package(), |s| {
            (s.package.clone(), s.file_path.clone())
        });
        let summaries: Vec<SymbolSummary> = symbols
            .iter()
            .take(limit)
            .map(|s| SymbolSummary::from_symbol(s))
            .collect();
        step.meta("matches", summaries.len() as u64);
        step.finish();

        if summaries.is_empty() {
            return ToolResult::ok(
                json!({ "query": query, "symbols": [] }),
                empty_report(&format!("symbols matched '{}'", query)),
            )
            .with_trace(step);
        }

        let body: Vec<String> = summaries.iter().map(|s| s.line_report()).collect();
        let text = found_report(
            summaries.len(),
            &format!("symbol(s) matching '{}'", query),
            &body.join("\n"),
        );
        ToolResult::ok(json!({ "query": query, "symbols": summaries }), text).with_trace(step)
    }
}

// ─── file_symbols ───────────────────────────────────────────────

pub struct FileSymbolsTool {
    shared: Arc<Shared>,
}

impl FileSymbolsTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FileSymbolsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "file_symbols",
            category: "symbols",
            description: "List every indexed symbol in a file, in line order. Accepts a project-relative path or a unique path suffix.",
            params: vec![
                ParamSpec::required("file", ParamType::Str, "File path, e.g. 'src/engine.ts'"),
                ParamSpec::optional("limit", ParamType::Int, "Max results (1-500)", json!(50)),
            ],
            routing_keywords: &["file", "symbols in", "outline", "what's in"],
            use_when: "You need an outline of one file's entities",
            avoid_when: "You want symbols by name — use search_symbols",
            timeout: self.shared.config.timeout_for("file_symbols"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("file_symbols"));
        }
        let file = match params.required_str("file") {
            Ok(f) => f,
            Err(e) => return ToolResult::from_error(&e),
        };

        let mut step = TraceStep::new("file_symbols", file).with_tool("file_symbols");
        let mut symbols: Vec<&Symbol> = analytics
            .index()
            .iter()
            .filter(|s| {
                s.file_path == file || s.file_path.ends_with(&format!("/{}", file))
            })
            .collect();
        symbols.sort_by(|a, b| a.start_line.cmp(&b.start_line).then_with(|| a.id.cmp(&b.id)));
        symbols.truncate(params.limit());
        step.meta("symbols", symbols.len() as u64);
        step.finish();

        if symbols.is_empty() {
            return ToolResult::ok(
                json!({ "file": file, "symbols": [] }),
                empty_report(&format!("symbols indexed in '{}'", file)),
            )
            .with_trace(step);
        }

        let summaries: Vec<SymbolSummary> =
            symbols.iter().map(|s| SymbolSummary::from_symbol(s)).collect();
        let body: Vec<String> = summaries
            .iter()
            .map(|s| format!("{}: {} {}", s.line, s.name, s.kind))
            .collect();
        let text = found_report(
            summaries.len(),
            &format!("symbol(s) in '{}'", file),
            &body.join("\n"),
        );
        ToolResult::ok(json!({ "file": file, "symbols": summaries }), text).with_trace(step)
    }
}
