//! # Lattice
//!
//! Code intelligence for AI agents. Symbol resolution and graph
//! analytics over a frozen code graph.
//!
//! Lattice ingests symbols and relationships produced by external
//! parsers, freezes them into an immutable graph, and exposes a
//! catalogue of graph-analytic tools an LLM agent can call: who calls
//! X, what is dead, where are the cycles, which community does this
//! module belong to.
//!
//! ## Key Features
//!
//! - **Authoritative**: tool reports carry graph markers the agent can
//!   trust instead of re-verifying with text search
//! - **Deterministic**: same index, same query, same answer — ranked
//!   outputs break ties on stable keys
//! - **Frozen**: ingest and query are separate phases; the query side
//!   is lock-free parallel readers over immutable data
//! - **Language-aware**: dotted names, inheritance walks, overload
//!   stubs, test-file demotion, boundary-aware package scoping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lattice::{LatticeBuilder, Symbol, SymbolKind, EdgeData, EdgeKind};
//!
//! # async fn run() {
//! // Ingest phase: parsers feed symbols and edges
//! let mut builder = LatticeBuilder::new(".");
//! let main = Symbol::new("main", SymbolKind::Function, "src/app.go", 3);
//! let parse = Symbol::new("parse", SymbolKind::Function, "src/parse.go", 10);
//! let main_id = main.id.clone();
//! let parse_id = parse.id.clone();
//! builder.add_symbol(main).unwrap();
//! builder.add_symbol(parse).unwrap();
//! builder.add_edge(&main_id, &parse_id, EdgeData::new(EdgeKind::Calls)).unwrap();
//!
//! // Freeze: the graph becomes immutable, tools come alive
//! let lattice = builder.freeze();
//! let result = lattice
//!     .run_tool("who_calls", serde_json::json!({ "symbol": "parse" }))
//!     .await;
//! println!("{}", result.output_text);
//! # }
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod graph;
pub mod resolve;
pub mod symbol;
pub mod tools;
pub mod trace;

// Re-exports for convenience
pub use analytics::Analytics;
pub use config::EngineConfig;
pub use error::{LatticeError, Result};
pub use graph::{CodeGraph, EdgeData, EdgeKind, PathMode};
pub use resolve::{KindFilter, ResolveOptions, Resolver};
pub use symbol::{CallSite, Symbol, SymbolIndex, SymbolKind, SymbolMetadata};
pub use tools::{Tool, ToolDefinition, ToolRegistry};
pub use trace::{ToolResult, TraceStep};

use std::path::PathBuf;
use std::sync::Arc;

/// Ingest-phase handle. External parsers feed it; `freeze` turns it
/// into a query session.
pub struct LatticeBuilder {
    graph: CodeGraph,
    index: SymbolIndex,
    config: EngineConfig,
}

impl LatticeBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            graph: CodeGraph::new(root),
            index: SymbolIndex::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Index a symbol and add its graph node. Children are indexed
    /// recursively; re-adding an id replaces the entry.
    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<()> {
        self.graph.add_node(&symbol)?;
        self.index.add(symbol);
        Ok(())
    }

    /// Record a relationship between two already-added symbols.
    pub fn add_edge(&mut self, from_id: &str, to_id: &str, data: EdgeData) -> Result<()> {
        self.graph.add_edge(from_id, to_id, data)
    }

    /// End ingest: freeze the graph and build the query session.
    pub fn freeze(self) -> Lattice {
        self.graph.freeze();
        let config = Arc::new(self.config);
        let analytics = Arc::new(Analytics::new(
            Arc::new(self.graph),
            Arc::new(self.index),
            config.analytics.clone(),
        ));
        let registry = ToolRegistry::new(Some(analytics.clone()), config.clone());
        Lattice {
            analytics,
            registry,
        }
    }
}

/// A query session over a frozen graph. Lives for the duration of an
/// agent conversation; safe to share across concurrent tool calls.
pub struct Lattice {
    analytics: Arc<Analytics>,
    registry: ToolRegistry,
}

impl Lattice {
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    /// Run a tool by name with a JSON parameter object.
    pub async fn run_tool(&self, name: &str, params: serde_json::Value) -> ToolResult {
        let map = match params {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            _ => {
                return ToolResult::from_error(&LatticeError::invalid_parameter(
                    "params",
                    "tool parameters must be a JSON object",
                ))
            }
        };
        self.registry.execute(name, map).await
    }
}
