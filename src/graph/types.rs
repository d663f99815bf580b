//
//  types.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::symbol::{Symbol, SymbolKind};

/// Relationship kinds between symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    References,
    Implements,
    Extends,
    Contains,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKind::Calls => "calls",
            EdgeKind::References => "references",
            EdgeKind::Implements => "implements",
            EdgeKind::Extends => "extends",
            EdgeKind::Contains => "contains",
        };
        write!(f, "{}", s)
    }
}

/// Edge payload: the relationship kind plus the source location of the
/// site that produced it. Parallel edges record multiple call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl EdgeData {
    pub fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            file: None,
            line: None,
        }
    }

    pub fn at(kind: EdgeKind, file: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            file: Some(file.into()),
            line: Some(line),
        }
    }
}

/// Node payload: the identity slice of a symbol. The full symbol lives
/// in the index; the graph holds what analytics and reports need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line: u32,
    pub package: String,
    pub receiver: String,
    pub exported: bool,
}

impl NodeData {
    pub fn from_symbol(symbol: &Symbol) -> Self {
        Self {
            id: symbol.id.clone(),
            name: symbol.name.clone(),
            kind: symbol.kind,
            file_path: symbol.file_path.clone(),
            line: symbol.start_line,
            package: symbol.package.clone(),
            receiver: symbol.receiver.clone(),
            exported: symbol.exported,
        }
    }

    /// Short "file:line" location string for reports.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path, self.line)
    }
}

/// How shortest path treats edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMode {
    #[default]
    Directed,
    Undirected,
}

/// Aggregate counts for the stats tool.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub frozen: bool,
    pub max_out_degree: usize,
    pub max_in_degree: usize,
}
