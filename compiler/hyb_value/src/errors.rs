//! Error types for evaluation and memory management.
//!
//! `EvalErrorKind` carries the structured condition. Every kind belongs to an
//! [`ErrorClass`], the script-visible error name (`TypeError`,
//! `IndexError`, ...). The class decides whether the evaluator turns the
//! error into a catchable exception or aborts the run.
//!
//! Factory functions (e.g. `division_by_zero()`) are the public API; they
//! fill in both `kind` and `message`.

use hyb_ir::Span;
use std::fmt;

/// Result of a fallible evaluation step.
pub type EvalResult<T> = Result<T, EvalError>;

/// Script-visible error class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    // Fatal
    Syntax,
    OutOfMemory,
    MemoryCeiling,
    Recursion,
    UnhandledException,
    Internal,
    /// Not a failure: the current script thread asked to stop.
    ThreadExit,

    // Catchable
    UndeclaredIdentifier,
    Type,
    Index,
    Attribute,
    ZeroDivision,
    Thrown,
}

impl ErrorClass {
    /// Name used when the error is raised as a script value.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Syntax => "SyntaxError",
            Self::OutOfMemory => "OutOfMemoryError",
            Self::MemoryCeiling => "MemoryCeilingError",
            Self::Recursion => "RecursionError",
            Self::UnhandledException => "UnhandledException",
            Self::Internal => "InternalError",
            Self::ThreadExit => "ThreadExit",
            Self::UndeclaredIdentifier => "UndeclaredIdentifierError",
            Self::Type => "TypeError",
            Self::Index => "IndexError",
            Self::Attribute => "AttributeError",
            Self::ZeroDivision => "ZeroDivisionError",
            Self::Thrown => "Error",
        }
    }

    /// Whether a `try`/`catch` block may intercept this class.
    pub const fn is_catchable(self) -> bool {
        matches!(
            self,
            Self::UndeclaredIdentifier
                | Self::Type
                | Self::Index
                | Self::Attribute
                | Self::ZeroDivision
                | Self::Thrown
        )
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Declarations and call shape
    FunctionRedefined {
        name: String,
    },
    BuiltinRedefined {
        name: String,
    },
    TypeRedefined {
        name: String,
    },
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    BadArgument {
        function: String,
        message: String,
    },
    UnknownType {
        name: String,
    },

    // Memory
    MemoryCeiling {
        usage: usize,
        requested: usize,
        limit: usize,
    },
    ArenaExhausted,

    // Evaluation limits
    RecursionLimit {
        depth: usize,
    },

    UnhandledException {
        value: String,
    },

    // Names
    UndeclaredIdentifier {
        name: String,
    },

    // Operators and types
    InvalidBinaryOp {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    InvalidUnaryOp {
        op: &'static str,
        type_name: &'static str,
    },
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    NotCallable {
        type_name: &'static str,
    },
    InvalidPattern {
        pattern: String,
        reason: String,
    },
    Undefined {
        context: String,
    },

    // Access
    IndexOutOfBounds {
        index: i64,
        len: usize,
    },
    KeyNotFound {
        key: String,
    },
    NotStructured {
        type_name: &'static str,
    },
    UndefinedMember {
        member: String,
        type_name: String,
    },
    PrivateMember {
        member: String,
        type_name: String,
    },

    // Arithmetic
    DivisionByZero,
    ModuloByZero,

    /// Raised by a builtin or module function as a script exception.
    Thrown {
        message: String,
    },

    /// Malformed tree or broken runtime invariant.
    Internal {
        message: String,
    },

    /// `pthread_exit` unwinding the current script thread.
    ThreadExit,
}

impl EvalErrorKind {
    /// The error class this kind belongs to.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::FunctionRedefined { .. }
            | Self::BuiltinRedefined { .. }
            | Self::TypeRedefined { .. }
            | Self::ArityMismatch { .. }
            | Self::BadArgument { .. }
            | Self::UnknownType { .. } => ErrorClass::Syntax,
            Self::MemoryCeiling { .. } => ErrorClass::MemoryCeiling,
            Self::ArenaExhausted => ErrorClass::OutOfMemory,
            Self::RecursionLimit { .. } => ErrorClass::Recursion,
            Self::UnhandledException { .. } => ErrorClass::UnhandledException,
            Self::UndeclaredIdentifier { .. } => ErrorClass::UndeclaredIdentifier,
            Self::InvalidBinaryOp { .. }
            | Self::InvalidUnaryOp { .. }
            | Self::TypeMismatch { .. }
            | Self::NotCallable { .. }
            | Self::InvalidPattern { .. }
            | Self::Undefined { .. }
            | Self::NotStructured { .. } => ErrorClass::Type,
            Self::IndexOutOfBounds { .. } | Self::KeyNotFound { .. } => ErrorClass::Index,
            Self::UndefinedMember { .. } | Self::PrivateMember { .. } => ErrorClass::Attribute,
            Self::DivisionByZero | Self::ModuloByZero => ErrorClass::ZeroDivision,
            Self::Thrown { .. } => ErrorClass::Thrown,
            Self::Internal { .. } => ErrorClass::Internal,
            Self::ThreadExit => ErrorClass::ThreadExit,
        }
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Declarations
            Self::FunctionRedefined { name } => write!(f, "function '{name}' already defined"),
            Self::BuiltinRedefined { name } => {
                write!(f, "function '{name}' already defined as a language builtin")
            }
            Self::TypeRedefined { name } => write!(f, "type '{name}' already defined"),
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let word = if *expected == 1 { "parameter" } else { "parameters" };
                write!(f, "function '{name}' requires {expected} {word} (called with {got})")
            }
            Self::BadArgument { function, message } => write!(f, "{function}: {message}"),
            Self::UnknownType { name } => write!(f, "'{name}' undeclared type"),

            // Memory
            Self::MemoryCeiling {
                usage,
                requested,
                limit,
            } => write!(
                f,
                "reached max allowed memory usage ({limit} bytes, {usage} in use, {requested} requested)"
            ),
            Self::ArenaExhausted => write!(f, "out of memory: value arena exhausted"),

            Self::RecursionLimit { depth } => {
                write!(f, "maximum recursion depth exceeded (limit: {depth})")
            }
            Self::UnhandledException { value } => write!(f, "unhandled exception: {value}"),
            Self::UndeclaredIdentifier { name } => write!(f, "'{name}' undeclared identifier"),

            // Operators
            Self::InvalidBinaryOp { op, left, right } => {
                write!(f, "operator '{op}' cannot be applied to {left} and {right}")
            }
            Self::InvalidUnaryOp { op, type_name } => {
                write!(f, "unary operator '{op}' cannot be applied to {type_name}")
            }
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "invalid regular expression '{pattern}': {reason}")
            }
            Self::Undefined { context } => write!(f, "use of undefined value in {context}"),

            // Access
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds (size {len})")
            }
            Self::KeyNotFound { key } => write!(f, "key {key} not found"),
            Self::NotStructured { type_name } => {
                write!(f, "'.' operator cannot be applied to {type_name}")
            }
            Self::UndefinedMember { member, type_name } => {
                write!(f, "'{member}' is not a member of {type_name}")
            }
            Self::PrivateMember { member, type_name } => {
                write!(f, "'{member}' is a private member of {type_name}")
            }

            Self::DivisionByZero => write!(f, "division by zero"),
            Self::ModuloByZero => write!(f, "modulo by zero"),
            Self::Thrown { message } | Self::Internal { message } => write!(f, "{message}"),
            Self::ThreadExit => write!(f, "thread exited"),
        }
    }
}

/// Additional context attached to an error, such as the call that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalNote {
    pub message: String,
    pub span: Option<Span>,
}

impl EvalNote {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message, equal to `kind.to_string()`.
    pub message: String,
    /// Where the error occurred, filled in by the evaluator.
    pub span: Option<Span>,
    /// Call chain, innermost first.
    pub notes: Vec<EvalNote>,
}

impl EvalError {
    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            span: None,
            notes: Vec::new(),
        }
    }

    #[inline]
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    #[inline]
    pub fn is_catchable(&self) -> bool {
        self.class().is_catchable()
    }

    /// Attach a span unless one is already set.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() && span.is_known() {
            self.span = Some(span);
        }
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: EvalNote) -> Self {
        self.notes.push(note);
        self
    }

    /// Text of the exception value a catchable error raises: `<Class>: <message>`.
    ///
    /// A `Thrown` error already carries script exception text and raises it as is.
    pub fn raised_text(&self) -> String {
        match &self.kind {
            EvalErrorKind::Thrown { message } => message.clone(),
            _ => format!("{}: {}", self.class(), self.message),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class(), self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({span})")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {}", note.message)?;
            if let Some(span) = note.span {
                write!(f, " ({span})")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Declaration errors

#[cold]
pub fn function_redefined(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::FunctionRedefined {
        name: name.to_string(),
    })
}

#[cold]
pub fn builtin_redefined(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BuiltinRedefined {
        name: name.to_string(),
    })
}

#[cold]
pub fn type_redefined(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeRedefined {
        name: name.to_string(),
    })
}

#[cold]
pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

/// A builtin received an argument it cannot work with.
#[cold]
pub fn bad_argument(function: &str, message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BadArgument {
        function: function.to_string(),
        message: message.into(),
    })
}

#[cold]
pub fn unknown_type(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownType {
        name: name.to_string(),
    })
}

// Memory errors

#[cold]
pub fn memory_ceiling(usage: usize, requested: usize, limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MemoryCeiling {
        usage,
        requested,
        limit,
    })
}

#[cold]
pub fn arena_exhausted() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArenaExhausted)
}

#[cold]
pub fn recursion_limit(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { depth })
}

#[cold]
pub fn unhandled_exception(value: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnhandledException {
        value: value.into(),
    })
}

#[cold]
pub fn undeclared_identifier(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndeclaredIdentifier {
        name: name.to_string(),
    })
}

// Operator errors

#[cold]
pub fn invalid_binary_op(op: &'static str, left: &'static str, right: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidBinaryOp { op, left, right })
}

#[cold]
pub fn invalid_unary_op(op: &'static str, type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidUnaryOp { op, type_name })
}

#[cold]
pub fn type_mismatch(expected: &'static str, got: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch { expected, got })
}

#[cold]
pub fn not_callable(type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable { type_name })
}

#[cold]
pub fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    })
}

/// An undefined value reached a place that needs a real one.
#[cold]
pub fn undefined_value(context: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Undefined {
        context: context.to_string(),
    })
}

// Access errors

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index, len })
}

#[cold]
pub fn key_not_found(key: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::KeyNotFound {
        key: key.to_string(),
    })
}

#[cold]
pub fn not_structured(type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotStructured { type_name })
}

#[cold]
pub fn undefined_member(member: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedMember {
        member: member.to_string(),
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn private_member(member: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::PrivateMember {
        member: member.to_string(),
        type_name: type_name.to_string(),
    })
}

// Arithmetic errors

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn modulo_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuloByZero)
}

/// Script-level exception raised from native code.
#[cold]
pub fn thrown(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Thrown {
        message: message.into(),
    })
}

#[cold]
pub fn internal(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Internal {
        message: message.into(),
    })
}

/// Unwind the current script thread without a result.
#[cold]
pub fn thread_exit() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ThreadExit)
}

/// A node did not have the children its kind requires.
#[cold]
pub fn malformed(what: &str) -> EvalError {
    internal(format!("malformed syntax tree: {what}"))
}

#[cfg(test)]
mod tests;
