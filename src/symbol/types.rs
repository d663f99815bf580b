//
//  types.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of source entity a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Property,
    Class,
    Struct,
    Interface,
    Type,
    Enum,
    Variable,
    Constant,
    Field,
    Import,
    Unknown,
}

impl SymbolKind {
    /// Tie-break weight. Types rank above callables, callables above
    /// data, imports near the bottom.
    pub fn significance(&self) -> u32 {
        match self {
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Interface | SymbolKind::Type => 10,
            SymbolKind::Function | SymbolKind::Method => 8,
            SymbolKind::Property => 6,
            SymbolKind::Enum => 5,
            SymbolKind::Constant | SymbolKind::Variable => 3,
            SymbolKind::Field => 2,
            SymbolKind::Import => 1,
            SymbolKind::Unknown => 0,
        }
    }

    /// Kinds accepted by the Callable filter.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Property
        )
    }

    /// Kinds accepted by the Type filter.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Interface | SymbolKind::Type
        )
    }

    /// Parse from the wire string used in tool parameters. Unrecognized
    /// strings map to Unknown.
    pub fn parse(s: &str) -> SymbolKind {
        match s {
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "property" => SymbolKind::Property,
            "class" => SymbolKind::Class,
            "struct" => SymbolKind::Struct,
            "interface" => SymbolKind::Interface,
            "type" => SymbolKind::Type,
            "enum" => SymbolKind::Enum,
            "variable" => SymbolKind::Variable,
            "constant" => SymbolKind::Constant,
            "field" => SymbolKind::Field,
            "import" => SymbolKind::Import,
            _ => SymbolKind::Unknown,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Field => "field",
            SymbolKind::Import => "import",
            SymbolKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One call site recorded on a symbol: the target name plus where the
/// call happens, when the parser knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Parser-supplied extras that resolution strategies inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Base type name, possibly qualified ("generic.NDFrame").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Decorators in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    /// True for type-only overload stubs without an implementation.
    #[serde(default)]
    pub is_overload: bool,
}

/// The unit of resolution. One indexed source entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Globally unique: `<file>:<line>:<name>`.
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Package/module string. Empty for languages without one.
    #[serde(default)]
    pub package: String,
    /// Enclosing type for methods; empty otherwise.
    #[serde(default)]
    pub receiver: String,
    /// Externally visible per language rules.
    #[serde(default)]
    pub exported: bool,
    /// Source-language tag ("go", "python", ...).
    #[serde(default)]
    pub language: String,
    /// Nested entities (methods of a class). Each child is also
    /// reachable by flat id lookup in the index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Symbol>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallSite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SymbolMetadata>,
}

impl Symbol {
    /// Minimal constructor; id synthesized from file, line, and name.
    pub fn new(name: &str, kind: SymbolKind, file_path: &str, start_line: u32) -> Self {
        Self {
            id: synthesize_id(file_path, start_line, name),
            name: name.to_string(),
            kind,
            file_path: file_path.to_string(),
            start_line,
            end_line: start_line,
            package: String::new(),
            receiver: String::new(),
            exported: false,
            language: String::new(),
            children: Vec::new(),
            calls: Vec::new(),
            metadata: None,
        }
    }

    pub fn is_overload_stub(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.is_overload)
    }

    /// Base type this symbol extends, if the parser recorded one.
    pub fn extends(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.extends.as_deref())
    }

    /// Short "file:line" location string for reports.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path, self.start_line)
    }
}

/// Canonical id format: `<file>:<line>:<name>`. UTF-8, colon separators,
/// no escaping; file paths are project-relative.
pub fn synthesize_id(file_path: &str, line: u32, name: &str) -> String {
    format!("{}:{}:{}", file_path, line, name)
}
