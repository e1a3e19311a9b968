//! Syntax tree nodes.
//!
//! A tree is a plain owned structure: each [`Node`] owns its children in
//! order, there are no parent links and no sharing. `Clone` is a deep clone,
//! which is what a threaded call needs to hand a function body to another
//! OS thread.

pub mod build;
mod operators;

pub use operators::{BinaryOp, ExprOp, StmtOp, UnaryOp};

use std::fmt;

use crate::{Name, Span};

/// Literal payload of a constant node.
///
/// Floats are stored as bits so literals can key the constant pool.
#[derive(Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(u64),
    Char(char),
    Str(String),
}

impl Literal {
    #[inline]
    pub fn float(f: f64) -> Self {
        Literal::Float(f.to_bits())
    }

    /// Float payload, if this is a float literal.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            Literal::Char(c) => write!(f, "{c:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Member visibility on structure and class bodies.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    #[default]
    Public,
    Private,
    Protected,
}

/// The closed set of node kinds.
///
/// Child layouts:
/// - `Function`: parameter identifiers followed by the body as the last child.
/// - `Call`: argument expressions.
/// - `AliasCall`: callee expression, then argument expressions.
/// - `Method`: same as `Function`.
/// - `MethodCall`: receiver expression, then argument expressions.
/// - `Attribute`: optional default expression.
/// - `Struct` / `Class`: `Attribute` and `Method` members.
/// - `New`: argument expressions.
/// - `Case`: `[value, body]`. `DefaultCase`: `[body]`.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    Constant(Literal),
    Identifier(Name),
    Expression(ExprOp),
    Statement(StmtOp),
    Function(Name),
    Call(Name),
    AliasCall,
    Method { name: Name, access: Access },
    MethodCall(Name),
    Attribute { name: Name, access: Access },
    Struct(Name),
    Class { name: Name, extends: Vec<Name> },
    New(Name),
    Case,
    DefaultCase,
}

impl NodeKind {
    /// Short label used by tracing and the debugger hook.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Constant(_) => "constant",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Expression(_) => "expression",
            NodeKind::Statement(_) => "statement",
            NodeKind::Function(_) => "function",
            NodeKind::Call(_) => "call",
            NodeKind::AliasCall => "alias call",
            NodeKind::Method { .. } => "method",
            NodeKind::MethodCall(_) => "method call",
            NodeKind::Attribute { .. } => "attribute",
            NodeKind::Struct(_) => "struct",
            NodeKind::Class { .. } => "class",
            NodeKind::New(_) => "new",
            NodeKind::Case => "case",
            NodeKind::DefaultCase => "default",
        }
    }
}

/// A syntax tree node.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<Node>,
}

impl Node {
    #[inline]
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Node {
            kind,
            span: Span::DUMMY,
            children,
        }
    }

    #[inline]
    pub fn leaf(kind: NodeKind) -> Self {
        Node::new(kind, Vec::new())
    }

    /// Attach a source span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    #[inline]
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The identifier name when this is an identifier node.
    pub fn as_identifier(&self) -> Option<&Name> {
        match &self.kind {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Declared name of a function, method, call, type or member node.
    pub fn declared_name(&self) -> Option<&Name> {
        match &self.kind {
            NodeKind::Identifier(name)
            | NodeKind::Function(name)
            | NodeKind::Call(name)
            | NodeKind::MethodCall(name)
            | NodeKind::Struct(name)
            | NodeKind::New(name)
            | NodeKind::Method { name, .. }
            | NodeKind::Attribute { name, .. }
            | NodeKind::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Parameters and body of a function or method declaration.
    ///
    /// Returns `None` when the node is not a declaration or carries no body.
    pub fn callable_parts(&self) -> Option<(&[Node], &Node)> {
        match self.kind {
            NodeKind::Function(_) | NodeKind::Method { .. } => {
                let (body, params) = self.children.split_last()?;
                Some((params, body))
            }
            _ => None,
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}
