//
//  deadcode.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::dominators::{has_entry_name, is_interface_method};
use crate::error::{LatticeError, Result};
use crate::graph::CodeGraph;
use crate::symbol::SymbolIndex;

pub const REASON_DEAD: &str = "no incoming calls";
pub const REASON_ENTRY: &str = "entry point excluded";

/// One unreferenced symbol.
#[derive(Debug, Clone, Serialize)]
pub struct DeadNode {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package: String,
    pub reason: &'static str,
}

/// Dead-code report plus how many candidates the entry rules excluded.
#[derive(Debug, Clone)]
pub struct DeadCodeReport {
    pub dead: Vec<DeadNode>,
    pub entries_excluded: usize,
}

/// A node is dead iff it has no incoming edges and is not an entry
/// point. With `include_exported`, exported symbols are candidates too
/// (useful for library-internal audits); the name, Test-prefix, and
/// interface-method rules always hold.
pub fn find(
    graph: &CodeGraph,
    index: &SymbolIndex,
    include_exported: bool,
    token: &CancellationToken,
) -> Result<DeadCodeReport> {
    let mut dead: Vec<DeadNode> = Vec::new();
    let mut entries_excluded = 0;

    for idx in graph.node_indices() {
        if token.is_cancelled() {
            return Err(LatticeError::cancelled("find_dead_code"));
        }
        if graph.in_degree(idx) != 0 {
            continue;
        }
        let node = graph.node_at(idx);
        let is_entry = has_entry_name(&node.name, node.kind)
            || (!include_exported && node.exported)
            || is_interface_method(index, idx, graph);
        if is_entry {
            entries_excluded += 1;
            continue;
        }
        dead.push(DeadNode {
            id: node.id.clone(),
            name: node.name.clone(),
            file: node.file_path.clone(),
            line: node.line,
            package: node.package.clone(),
            reason: REASON_DEAD,
        });
    }

    dead.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(DeadCodeReport {
        dead,
        entries_excluded,
    })
}
