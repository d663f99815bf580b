//
//  flow.rs
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
use crate::analytics::Cycle;
use crate::error::LatticeError;
use crate::resolve::scope::is_test_file;
use crate::trace::ToolResult;

/// Every node of the cycle lives in a test file. Node entries are
/// symbol ids, so the file part comes before the first colon.
fn cycle_is_test_only(cycle: &Cycle) -> bool {
    cycle
        .nodes
        .iter()
        .all(|id| is_test_file(id.split(':').next().unwrap_or(id)))
}

// ─── find_cycles ────────────────────────────────────────────────

pub struct FindCyclesTool {
    shared: Arc<Shared>,
}

impl FindCyclesTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for FindCyclesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_cycles",
            category: "analytics",
            description: "Enumerate simple directed call cycles (mutual recursion, dependency loops) from the SCC decomposition. Deterministic order; bounded count.",
            params: vec![
                ParamSpec::optional("min_size", ParamType::Int, "Smallest cycle length to report (>=1)", json!(2)),
                ParamSpec::optional("limit", ParamType::Int, "Max cycles (1-100)", json!(20)),
                ParamSpec::optional("sort_by", ParamType::Enum(&["length_desc", "length_asc", "lexicographic"]), "Result ordering", json!("length_desc")),
                ParamSpec::optional("exclude_tests", ParamType::Bool, "Drop cycles living entirely in test files", json!(true)),
            ],
            routing_keywords: &["cycle", "circular", "mutual recursion", "loop between"],
            use_when: "You suspect circular dependencies or recursion knots",
            avoid_when: "You want dominator loops with nesting — use detect_loops",
            timeout: self.shared.config.timeout_for("find_cycles"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("find_cycles"));
        }
        let min_size = params.min_size_or(2);
        let limit = params.int_or("limit", 20).clamp(1, 100) as usize;

        let (cycles, mut step) = match analytics.cycles(min_size, limit, token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "find_cycles".to_string();

        // A cycle is a test cycle only when every node sits in a test
        // file; mixed cycles stay. The all-tests set is kept, same as
        // the shared filter.
        let mut cycles = cycles;
        if params.exclude_tests() {
            let any_production = cycles.iter().any(|c| !cycle_is_test_only(c));
            if any_production {
                cycles.retain(|c| !cycle_is_test_only(c));
            }
        }
        match params.enum_or(
            "sort_by",
            &["length_desc", "length_asc", "lexicographic"],
            "length_desc",
        ) {
            "length_asc" => cycles.sort_by(|a, b| a.length.cmp(&b.length).then_with(|| a.nodes.cmp(&b.nodes))),
            "lexicographic" => cycles.sort_by(|a, b| a.nodes.cmp(&b.nodes)),
            _ => cycles.sort_by(|a, b| b.length.cmp(&a.length).then_with(|| a.nodes.cmp(&b.nodes))),
        }

        if cycles.is_empty() {
            return ToolResult::ok(json!({ "cycles": [] }), empty_report("cycles detected"))
                .with_trace(step);
        }

        let body: Vec<String> = cycles
            .iter()
            .map(|c| format!("[{}] {}", c.length, c.nodes.join(" -> ")))
            .collect();
        let text = found_report(cycles.len(), "cycle(s)", &body.join("\n"));
        ToolResult::ok(json!({ "cycles": cycles }), text).with_trace(step)
    }
}

// ─── detect_loops ───────────────────────────────────────────────

pub struct DetectLoopsTool {
    shared: Arc<Shared>,
}

impl DetectLoopsTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for DetectLoopsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "detect_loops",
            category: "analytics",
            description: "Natural loops from dominator back edges: headers, body sizes, nesting depth. Direct recursion is a size-1 loop; mutual recursion shows as larger bodies.",
            params: vec![
                ParamSpec::optional("top", ParamType::Int, "How many loops (1-100)", json!(10)),
                ParamSpec::optional("min_size", ParamType::Int, "Smallest loop body to report (>=1)", json!(1)),
                ParamSpec::optional("show_nesting", ParamType::Bool, "Annotate nesting depth in the report", json!(true)),
            ],
            routing_keywords: &["loops", "recursion", "back edge", "nesting"],
            use_when: "You need loop structure, headers, and nesting",
            avoid_when: "You want raw cycle paths — use find_cycles",
            timeout: self.shared.config.timeout_for("detect_loops"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("detect_loops"));
        }
        let min_size = params.min_size_or(1);
        let show_nesting = params.bool_or("show_nesting", true);

        let (loops, mut step) = match analytics.loops(token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "detect_loops".to_string();

        let mut loops: Vec<_> = loops.into_iter().filter(|l| l.size >= min_size).collect();
        loops.truncate(params.top());

        if loops.is_empty() {
            return ToolResult::ok(json!({ "loops": [] }), empty_report("natural loops"))
                .with_trace(step);
        }

        let body: Vec<String> = loops
            .iter()
            .map(|l| {
                if show_nesting {
                    format!("header {} size={} depth={}", l.header, l.size, l.depth)
                } else {
                    format!("header {} size={}", l.header, l.size)
                }
            })
            .collect();
        let text = found_report(loops.len(), "natural loop(s)", &body.join("\n"));
        ToolResult::ok(json!({ "loops": loops }), text).with_trace(step)
    }
}

// ─── extractable_regions ────────────────────────────────────────

pub struct ExtractableRegionsTool {
    shared: Arc<Shared>,
}

impl ExtractableRegionsTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for ExtractableRegionsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "extractable_regions",
            category: "analytics",
            description: "Single-entry-single-exit regions from the dominator/post-dominator relationship. Natural refactoring seams: everything between entry and exit can move as a unit.",
            params: vec![
                ParamSpec::optional("min_size", ParamType::Int, "Smallest region (>=2)", json!(3)),
                ParamSpec::optional("max_size", ParamType::Int, "Largest region", json!(50)),
                ParamSpec::optional("top", ParamType::Int, "How many regions (1-100)", json!(10)),
            ],
            routing_keywords: &["region", "extract", "sese", "refactor seam"],
            use_when: "You are scoping an extract-function / extract-module refactor",
            avoid_when: "The graph is tiny — read it directly",
            timeout: self.shared.config.timeout_for("extractable_regions"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("extractable_regions"));
        }
        let min_size = params.min_size_or(3);
        let max_size = params.int_or("max_size", 50).max(min_size as i64) as usize;

        let (regions, mut step) = match analytics.regions(min_size, max_size, token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "extractable_regions".to_string();

        let mut regions = regions;
        regions.truncate(params.top());

        if regions.is_empty() {
            return ToolResult::ok(json!({ "regions": [] }), empty_report("extractable regions"))
                .with_trace(step);
        }

        let body: Vec<String> = regions
            .iter()
            .map(|r| format!("{} .. {} size={} internal={}", r.entry, r.exit, r.size, r.internal.len()))
            .collect();
        let text = found_report(regions.len(), "extractable region(s)", &body.join("\n"));
        ToolResult::ok(json!({ "regions": regions }), text).with_trace(step)
    }
}

// ─── check_reducibility ─────────────────────────────────────────

pub struct CheckReducibilityTool {
    shared: Arc<Shared>,
}

impl CheckReducibilityTool {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Tool for CheckReducibilityTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_reducibility",
            category: "analytics",
            description: "T1/T2 interval reduction verdict: is the flow structure well-nested? Score near 1.0 means structured; irreducible regions list the knots.",
            params: vec![],
            routing_keywords: &["reducible", "structured", "goto", "spaghetti"],
            use_when: "You want a one-number structural health check",
            avoid_when: "You need the actual loops — use detect_loops",
            timeout: self.shared.config.timeout_for("check_reducibility"),
            read_only: true,
        }
    }

    async fn execute(&self, token: &CancellationToken, _params: &Params) -> ToolResult {
        let analytics = match self.shared.analytics() {
            Ok(a) => a,
            Err(e) => return ToolResult::from_error(&e),
        };
        if token.is_cancelled() {
            return ToolResult::from_error(&LatticeError::cancelled("check_reducibility"));
        }

        let (report, mut step) = match analytics.reducibility(token) {
            Ok(x) => x,
            Err(e) => return ToolResult::from_error(&e),
        };
        step.tool = "check_reducibility".to_string();

        let body = format!(
            "reducible={} score={:.3} quality={}\n{}",
            report.is_reducible, report.score, report.quality_label, report.summary
        );
        let text = found_report(1, "reducibility verdict", &body);
        ToolResult::ok(json!({ "reducibility": report }), text).with_trace(step)
    }
}

#[cfg(test)]
mod tests {
    use crate::tools::testing::{fixture_registry, params};
    use serde_json::json;

    #[tokio::test]
    async fn test_cycles_default_excludes_self_loop() {
        let registry = fixture_registry();
        // min_size defaults to 2; eval's self-recursion is length 1
        let result = registry.execute("find_cycles", params(&[])).await;
        assert!(result.success);
        assert!(result.output_text.starts_with("## GRAPH RESULT: No cycles"));

        let with_self = registry
            .execute("find_cycles", params(&[("min_size", json!(1))]))
            .await;
        assert!(with_self.success);
        assert!(with_self.output_text.starts_with("Found 1 cycle(s)"));
        assert!(with_self.output_text.contains("src/eval.go:5:eval"));
    }

    #[tokio::test]
    async fn test_loops_report_recursion() {
        let registry = fixture_registry();
        let result = registry.execute("detect_loops", params(&[])).await;
        assert!(result.success);
        assert!(result.output_text.starts_with("Found 1 natural loop(s)"));
        assert!(result.output_text.contains("size=1"));
        assert!(result.output_text.contains("depth=0"));
    }

    #[tokio::test]
    async fn test_reducibility_of_fixture() {
        let registry = fixture_registry();
        let result = registry.execute("check_reducibility", params(&[])).await;
        assert!(result.success);
        assert_eq!(result.output["reducibility"]["is_reducible"], true);
    }

    #[tokio::test]
    async fn test_regions_bounds() {
        let registry = fixture_registry();
        let result = registry
            .execute(
                "extractable_regions",
                params(&[("min_size", json!(2)), ("max_size", json!(10))]),
            )
            .await;
        assert!(result.success);
        if let Some(regions) = result.output["regions"].as_array() {
            for r in regions {
                let size = r["size"].as_u64().unwrap();
                assert!((2..=10).contains(&size));
            }
        }
    }
}
