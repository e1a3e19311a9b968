//! Call tracking for recursion limits and error context.

use hyb_ir::{Name, Span};
use hyb_value::errors::recursion_limit;
use hyb_value::{EvalError, EvalNote};

/// Script call depth allowed before a `RecursionError`.
pub const DEFAULT_MAX_DEPTH: usize = 4096;

/// One live script call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRecord {
    pub name: Name,
    /// Where the call was made.
    pub span: Span,
}

/// Live call stack of one interpreter.
///
/// The depth check happens in `push`, so a call that would exceed the
/// limit never starts.
#[derive(Clone, Debug)]
pub struct CallStack {
    records: Vec<CallRecord>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        CallStack {
            records: Vec::new(),
            max_depth,
        }
    }

    /// Enter a call. Fails with a fatal `RecursionError` at the limit.
    pub fn push(&mut self, name: Name, span: Span) -> Result<(), EvalError> {
        if self.records.len() >= self.max_depth {
            return Err(recursion_limit(self.max_depth));
        }
        self.records.push(CallRecord { name, span });
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(!self.records.is_empty(), "CallStack::pop on empty stack");
        self.records.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Innermost call, if any.
    pub fn current(&self) -> Option<&CallRecord> {
        self.records.last()
    }

    /// Note for an error leaving the innermost call.
    pub fn annotate(&self, err: EvalError) -> EvalError {
        match self.records.last() {
            Some(record) => err.with_note(EvalNote::with_span(
                format!("in call to '{}'", record.name),
                record.span,
            )),
            None => err,
        }
    }
}

impl Default for CallStack {
    fn default() -> Self {
        CallStack::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hyb_value::errors::division_by_zero;
    use hyb_value::ErrorClass;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_and_pop() {
        let mut stack = CallStack::new(8);
        stack.push(Name::new("f"), Span::DUMMY).unwrap();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current().unwrap().name.as_str(), "f");
        stack.pop();
        assert!(stack.is_empty());
    }

    #[test]
    fn depth_limit_is_a_recursion_error() {
        let mut stack = CallStack::new(2);
        stack.push(Name::new("f"), Span::DUMMY).unwrap();
        stack.push(Name::new("f"), Span::DUMMY).unwrap();
        let err = stack.push(Name::new("f"), Span::DUMMY).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Recursion);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn annotate_names_the_innermost_call() {
        let mut stack = CallStack::default();
        stack.push(Name::new("outer"), Span::DUMMY).unwrap();
        stack.push(Name::new("inner"), Span::new(3, 0, 4)).unwrap();
        let err = stack.annotate(division_by_zero());
        assert_eq!(err.notes.len(), 1);
        assert_eq!(err.notes[0].message, "in call to 'inner'");
        assert_eq!(err.notes[0].span, Some(Span::new(3, 0, 4)));
    }
}
