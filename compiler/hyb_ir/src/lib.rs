//! Hybris IR - syntax tree types
//!
//! This crate holds the tree the parser hands to the evaluator:
//! - [`Name`] for identifiers (shareable across threads)
//! - [`Span`] for source locations
//! - [`Node`] / [`NodeKind`] and the operator enums
//! - [`build`] constructor helpers for embedders and tests
//!
//! Trees are immutable once built. Evaluation never rewrites a node; a
//! threaded call deep-clones the subtree it needs.

mod ast;
mod name;
mod span;

pub use ast::{
    build, Access, BinaryOp, ExprOp, Literal, Node, NodeKind, StmtOp, UnaryOp,
};
pub use name::Name;
pub use span::Span;

/// Source identity attached to a program run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Path or label of the script being run.
    pub file: String,
}

impl SourceInfo {
    pub fn new(file: impl Into<String>) -> Self {
        SourceInfo { file: file.into() }
    }
}
