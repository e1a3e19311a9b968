//! Native functions callable from scripts.
//!
//! A builtin receives a [`CallContext`] and the evaluated argument ids. The
//! arguments stay pinned for the duration of the call; any value the
//! builtin allocates and returns is a temporary of the calling thread.

mod common;
mod reflection;
mod threads;

use std::sync::Arc;

use hyb_ir::{Name, Span};
use hyb_value::errors::{bad_argument, thrown};
use hyb_value::ops::display;
use hyb_value::{EvalResult, Heap, ValueId};
use indexmap::IndexMap;
use parking_lot::MutexGuard;
use rustc_hash::FxBuildHasher;

use crate::engine::Engine;
use crate::flow::Flow;
use crate::interpreter::Interpreter;

/// Signature shared by builtins and module functions.
pub type BuiltinFn = fn(&mut CallContext<'_>, &[ValueId]) -> EvalResult<Option<ValueId>>;

/// Builtins by name, in registration order.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    functions: IndexMap<Name, BuiltinFn, FxBuildHasher>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        BuiltinRegistry::default()
    }

    /// The catalog every engine starts with.
    pub fn with_core() -> Self {
        let mut registry = BuiltinRegistry::new();
        common::register(&mut registry);
        reflection::register(&mut registry);
        threads::register(&mut registry);
        registry
    }

    /// Add or replace a builtin.
    pub fn register(&mut self, name: Name, function: BuiltinFn) {
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<BuiltinFn> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.functions.keys()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

/// What a builtin sees of the interpreter calling it.
pub struct CallContext<'a> {
    interpreter: &'a mut Interpreter,
    name: &'a Name,
    span: Span,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(interpreter: &'a mut Interpreter, name: &'a Name, span: Span) -> Self {
        CallContext {
            interpreter,
            name,
            span,
        }
    }

    /// Name the builtin was called by.
    #[inline]
    pub fn name(&self) -> &Name {
        self.name
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    #[inline]
    pub fn engine(&self) -> &Arc<Engine> {
        self.interpreter.engine()
    }

    /// Lock the heap as the calling thread.
    pub fn heap(&self) -> MutexGuard<'_, Heap> {
        self.interpreter.mutator().heap()
    }

    pub fn display(&self, id: ValueId) -> EvalResult<String> {
        display(&self.heap(), id)
    }

    pub fn print(&self, text: &str) {
        self.engine().print().print(text);
    }

    pub fn println(&self, text: &str) {
        self.engine().print().println(text);
    }

    /// Bindings of the caller's innermost scope, in order.
    pub fn scope_bindings(&self) -> Vec<(Name, ValueId)> {
        self.interpreter.scope_bindings()
    }

    /// Call a function by name with already evaluated arguments.
    ///
    /// An exception escaping the callee comes back as a `Thrown` error
    /// carrying its text.
    pub fn call(&mut self, name: &str, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
        let name = Name::new(name);
        match self.interpreter.call_by_name(&name, args, self.span)? {
            Flow::Normal(v) | Flow::Return(v) => Ok(v),
            Flow::Raised(exception) => {
                let text = self.display(exception)?;
                self.heap().release_temporary(exception);
                Err(thrown(text))
            }
            Flow::Break | Flow::Next => Ok(None),
        }
    }

    pub(crate) fn interpreter(&self) -> &Interpreter {
        self.interpreter
    }
}

/// Fail unless exactly `count` arguments were passed.
pub(crate) fn expect_args(function: &str, args: &[ValueId], count: usize) -> EvalResult<()> {
    if args.len() == count {
        Ok(())
    } else {
        let word = if count == 1 { "parameter" } else { "parameters" };
        Err(bad_argument(
            function,
            format!("requires {count} {word} (called with {})", args.len()),
        ))
    }
}

