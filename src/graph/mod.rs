//
//  mod.rs
//  Lattice
//
//  Created by hak (tharun)
//

pub mod store;
pub mod types;

pub use store::CodeGraph;
pub use types::{EdgeData, EdgeKind, GraphStats, NodeData, PathMode};
