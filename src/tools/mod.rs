//
//  mod.rs
//  Lattice
//
//  Created by hak (tharun)
//

pub mod community;
pub mod edges;
pub mod filters;
pub mod flow;
pub mod params;
pub mod paths;
pub mod render;
pub mod structure;
pub mod symbols;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

pub use params::{ParamSpec, ParamType, Params};

use crate::analytics::Analytics;
use crate::config::EngineConfig;
use crate::error::{LatticeError, Result};
use crate::resolve::Resolver;
use crate::trace::ToolResult;

/// Everything a tool advertises to the agent: identity, parameter
/// schema, routing hints, and its execution budget.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub routing_keywords: &'static [&'static str],
    pub use_when: &'static str,
    pub avoid_when: &'static str,
    pub timeout: Duration,
    pub read_only: bool,
}

/// State shared by every tool: the analytics decoration (graph +
/// index) and the engine configuration.
pub(crate) struct Shared {
    pub analytics: Option<Arc<Analytics>>,
    pub config: Arc<EngineConfig>,
}

impl Shared {
    pub fn analytics(&self) -> Result<&Analytics> {
        self.analytics
            .as_deref()
            .ok_or_else(|| LatticeError::not_initialized("analytics"))
    }

    pub fn resolver(&self) -> Result<Resolver<'_>> {
        let analytics = self.analytics()?;
        Ok(Resolver::new(analytics.index(), &self.config.resolution))
    }
}

/// A polymorphic tool capability: definition plus execution. The tool
/// set is closed at compile time; dispatch goes through the registry's
/// trait-object table.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, token: &CancellationToken, params: &Params) -> ToolResult;
}

/// Name -> tool table. Tools are registered once at startup; agents
/// discover them by enumerating definitions.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
    config: Arc<EngineConfig>,
}

impl ToolRegistry {
    pub fn new(analytics: Option<Arc<Analytics>>, config: Arc<EngineConfig>) -> Self {
        let shared = Arc::new(Shared {
            analytics,
            config: config.clone(),
        });

        let mut tools: BTreeMap<&'static str, Box<dyn Tool>> = BTreeMap::new();
        let mut register = |tool: Box<dyn Tool>| {
            tools.insert(tool.definition().name, tool);
        };

        // Symbols
        register(Box::new(symbols::FindSymbolTool::new(shared.clone())));
        register(Box::new(symbols::SearchSymbolsTool::new(shared.clone())));
        register(Box::new(symbols::FileSymbolsTool::new(shared.clone())));

        // Edge browsing
        for tool in edges::edge_query_tools(&shared) {
            register(tool);
        }
        register(Box::new(edges::TraceDependenciesTool::new(shared.clone())));

        // Structure
        register(Box::new(structure::FindHotspotsTool::new(shared.clone())));
        register(Box::new(structure::FindDeadCodeTool::new(shared.clone())));
        register(Box::new(structure::FindImportantTool::new(shared.clone())));
        register(Box::new(structure::GraphStatsTool::new(shared.clone())));

        // Control-flow shape
        register(Box::new(flow::FindCyclesTool::new(shared.clone())));
        register(Box::new(flow::DetectLoopsTool::new(shared.clone())));
        register(Box::new(flow::ExtractableRegionsTool::new(shared.clone())));
        register(Box::new(flow::CheckReducibilityTool::new(shared.clone())));

        // Communities & similarity
        register(Box::new(community::DetectCommunitiesTool::new(shared.clone())));
        register(Box::new(community::FindSimilarTool::new(shared.clone())));

        // Path finding
        register(Box::new(paths::FindPathTool::new(shared.clone())));

        Self { tools, config }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Run a tool with a fresh cancellation token.
    pub async fn execute(&self, name: &str, params: Map<String, Value>) -> ToolResult {
        self.execute_with_token(name, params, &CancellationToken::new())
            .await
    }

    /// Run a tool under a caller-supplied token. The tool's declared
    /// timeout cancels the child token and fails the call; within a
    /// call, ranked output ordering is deterministic.
    pub async fn execute_with_token(
        &self,
        name: &str,
        params: Map<String, Value>,
        parent: &CancellationToken,
    ) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::from_error(&LatticeError::invalid_parameter(
                "tool",
                format!("unknown tool '{}'", name),
            ));
        };
        let definition = tool.definition();
        let params = Params::new(params);
        let known: Vec<&str> = definition.params.iter().map(|p| p.name).collect();
        params.warn_unknown(&known);

        let token = parent.child_token();
        let span = info_span!("tool", tool = name);
        let start = Instant::now();

        let outcome = tokio::time::timeout(
            definition.timeout,
            tool.execute(&token, &params).instrument(span),
        )
        .await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                ToolResult::from_error(&LatticeError::cancelled(format!(
                    "{} exceeded its {}s timeout",
                    name,
                    definition.timeout.as_secs()
                )))
            }
        };
        result.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(step) = result.trace_step.as_mut() {
            if step.tool.is_empty() {
                step.tool = name.to_string();
            }
        }
        result
    }
}
