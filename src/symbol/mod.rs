//
//  mod.rs
//  Lattice
//
//  Created by hak (tharun)
//

pub mod index;
pub mod types;

pub use index::{FuzzyMatch, SymbolIndex};
pub use types::{CallSite, Symbol, SymbolKind, SymbolMetadata};
