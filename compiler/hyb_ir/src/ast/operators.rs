//! Expression and statement operators.
//!
//! All operator types are `Copy` so the evaluator can match on them without
//! touching the node that carries them.

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Pattern
    /// `text ~= pattern`, true when the regular expression matches.
    Regex,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages to show the exact operator that failed.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Regex => "~=",
        }
    }

    /// Whether the operator yields a boolean.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Operators accepted in compound assignment position (`x op= y`).
    pub const fn is_compoundable(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::Mod
                | Self::BitAnd
                | Self::BitOr
                | Self::BitXor
                | Self::Shl
                | Self::Shr
        )
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
    /// Ones' complement.
    BitNot,
    /// Postfix factorial.
    Factorial,
}

impl UnaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Factorial => "!",
        }
    }
}

/// Expression operators carried by [`NodeKind::Expression`](super::NodeKind).
///
/// The child layout each operator expects is listed next to it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprOp {
    /// `[target identifier, value]`
    Assign,
    /// `[target identifier, value]`, rebinds `target = target op value`.
    CompoundAssign(BinaryOp),
    /// `[target identifier]`
    Inc,
    /// `[target identifier]`
    Dec,
    /// `[lhs, rhs]`
    Binary(BinaryOp),
    /// `[operand]`
    Unary(UnaryOp),
    /// `[condition, then, else]`
    Ternary,
    /// `[name expression]`, resolves a variable by its string name.
    Dollar,
    /// `[identifier]`
    AddressOf,
    /// `[operand]`
    Deref,
    /// `[from, to]`
    Range,
    /// `[target identifier, value]`, appends to a vector (`a[] = v`).
    SubscriptAdd,
    /// `[container, index]`
    SubscriptGet,
    /// `[target identifier, index, value]`
    SubscriptSet,
    /// `[object, member identifier]`
    Dot,
    /// `[object, member identifier, value]`
    DotAssign,
}

impl ExprOp {
    /// Human-readable operator name for diagnostics.
    pub fn describe(self) -> String {
        match self {
            Self::Assign => "=".to_string(),
            Self::CompoundAssign(op) => format!("{}=", op.as_symbol()),
            Self::Inc => "++".to_string(),
            Self::Dec => "--".to_string(),
            Self::Binary(op) => op.as_symbol().to_string(),
            Self::Unary(op) => op.as_symbol().to_string(),
            Self::Ternary => "?:".to_string(),
            Self::Dollar => "$".to_string(),
            Self::AddressOf => "&".to_string(),
            Self::Deref => "*".to_string(),
            Self::Range => "..".to_string(),
            Self::SubscriptAdd => "[]=".to_string(),
            Self::SubscriptGet => "[]".to_string(),
            Self::SubscriptSet => "[]=".to_string(),
            Self::Dot => ".".to_string(),
            Self::DotAssign => ".=".to_string(),
        }
    }

    /// Number of children a well-formed node carries.
    pub const fn arity(self) -> usize {
        match self {
            Self::Inc | Self::Dec | Self::Unary(_) | Self::Dollar | Self::AddressOf | Self::Deref => 1,
            Self::Assign
            | Self::CompoundAssign(_)
            | Self::Binary(_)
            | Self::Range
            | Self::SubscriptAdd
            | Self::SubscriptGet
            | Self::Dot => 2,
            Self::Ternary | Self::SubscriptSet | Self::DotAssign => 3,
        }
    }
}

/// Statement operators carried by [`NodeKind::Statement`](super::NodeKind).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StmtOp {
    /// Children run in order.
    Sequence,
    /// `[condition, body]`
    While,
    /// `[body, condition]`
    DoWhile,
    /// `[init, condition, step, body]`
    For,
    /// `[identifier, iterable, body]`
    Foreach,
    /// `[key identifier, value identifier, map, body]`
    ForeachMap,
    /// `[condition, then]` or `[condition, then, else]`
    If,
    /// `[discriminant, Case..., DefaultCase?]`
    Switch,
    Break,
    Next,
    /// `[]` or `[value]`
    Return,
    /// `[value]`
    Throw,
    /// `[body, identifier, handler]`
    TryCatch,
}

impl StmtOp {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Sequence => "{}",
            Self::While => "while",
            Self::DoWhile => "do",
            Self::For => "for",
            Self::Foreach => "foreach",
            Self::ForeachMap => "foreach(k=>v)",
            Self::If => "if",
            Self::Switch => "switch",
            Self::Break => "break",
            Self::Next => "next",
            Self::Return => "return",
            Self::Throw => "throw",
            Self::TryCatch => "try",
        }
    }
}
