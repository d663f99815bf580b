//
//  error.rs
//  Lattice
//
//  Created by hak (tharun)
//

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LatticeError>;

/// The error taxonomy. Every variant maps to a stable short kind string
/// that tool consumers can branch on.
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Missing, empty, or generic-word parameter.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// Analytics / graph / index handed in as nil.
    #[error("{what} not initialized")]
    NotInitialized { what: String },

    /// Symbol(s) cannot be resolved.
    #[error("symbol not found: '{name}'")]
    NotFound { name: String },

    /// Multiple equally-ranked candidates where uniqueness is required.
    #[error("ambiguous symbol '{name}': {count} equally ranked candidates")]
    Ambiguous { name: String, count: usize },

    /// Operation requires a frozen graph.
    #[error("graph is not frozen: {operation} requires a frozen graph")]
    NotFrozen { operation: String },

    /// Context cancelled or timed out.
    #[error("operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Algorithmic invariant violated. Should never occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LatticeError {
    /// Stable short string for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LatticeError::InvalidParameter { .. } => "invalid-parameter",
            LatticeError::NotInitialized { .. } => "not-initialized",
            LatticeError::NotFound { .. } => "not-found",
            LatticeError::Ambiguous { .. } => "ambiguous",
            LatticeError::NotFrozen { .. } => "not-frozen",
            LatticeError::Cancelled { .. } => "cancelled",
            LatticeError::Internal(_) => "internal",
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, reason: impl Into<String>) -> Self {
        LatticeError::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn not_initialized(what: impl Into<String>) -> Self {
        LatticeError::NotInitialized { what: what.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        LatticeError::NotFound { name: name.into() }
    }

    pub fn not_frozen(operation: impl Into<String>) -> Self {
        LatticeError::NotFrozen {
            operation: operation.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        LatticeError::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        LatticeError::Internal(msg.into())
    }

    /// Whether this error should propagate through the call stack
    /// instead of being folded into a tool result.
    pub fn propagates(&self) -> bool {
        matches!(self, LatticeError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(
            LatticeError::invalid_parameter("from", "empty").kind(),
            "invalid-parameter"
        );
        assert_eq!(LatticeError::not_initialized("analytics").kind(), "not-initialized");
        assert_eq!(LatticeError::not_found("render").kind(), "not-found");
        assert_eq!(
            LatticeError::Ambiguous {
                name: "x".into(),
                count: 2
            }
            .kind(),
            "ambiguous"
        );
        assert_eq!(LatticeError::not_frozen("similarity").kind(), "not-frozen");
        assert_eq!(LatticeError::cancelled("pagerank").kind(), "cancelled");
        assert_eq!(LatticeError::internal("boom").kind(), "internal");
    }

    #[test]
    fn test_only_cancellation_propagates() {
        assert!(LatticeError::cancelled("bfs").propagates());
        assert!(!LatticeError::not_found("x").propagates());
        assert!(!LatticeError::internal("x").propagates());
    }
}
