//! Tree-walking interpreter.
//!
//! One [`Interpreter`] runs per evaluating thread. It owns that thread's
//! local frame stack, call stack and collector mutator; everything else
//! (global frame, segments, builtins, collector) lives on the shared
//! [`Engine`].
//!
//! # Dispatch
//!
//! [`Interpreter::eval`] is the single entry point for a node. It calls the
//! debugger hook, grows the native stack if needed and dispatches on the
//! node kind:
//!
//! - `expr`: operators, assignment, subscripts, member access
//! - `control`: sequences, loops, branches, `switch`, `try`/`catch`
//! - `call`: declarations, user/builtin/module calls, threaded calls
//! - `types`: struct and class declarations, `new`, method calls
//!
//! # Temporaries
//!
//! A value produced by evaluation and not yet bound is a temporary of this
//! interpreter's mutator. Collection only runs at statement boundaries, so
//! a temporary that must survive the evaluation of another child is pinned
//! for that span. Pin guards take the heap lock when they drop: they are
//! always dropped while no heap guard is held.

mod call;
mod control;
mod expr;
mod types;

use std::sync::Arc;

use hyb_ir::{Name, Node, NodeKind};
use hyb_value::errors::{malformed, undefined_value, unhandled_exception};
use hyb_value::ops::display;
use hyb_value::{EvalError, EvalResult, Heap, Mutator, PinGuard, ValueId};
use tracing::{debug, trace};

use crate::debug::{DebugAction, FrameView};
use crate::diagnostics::CallStack;
use crate::engine::Engine;
use crate::flow::Flow;
use crate::frame::Frame;
use crate::stack::ensure_sufficient_stack;

/// Which frame a name was found in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    Local,
    Global,
}

/// Evaluator for one thread.
pub struct Interpreter {
    engine: Arc<Engine>,
    mutator: Mutator,
    /// Local frames of active calls. Empty at global scope.
    frames: Vec<Frame>,
    call_stack: CallStack,
    /// Pin on the most recent global read. Another thread may rebind the
    /// global at any time; the pin holds until the next global read.
    global_read: Option<PinGuard>,
}

impl Interpreter {
    pub fn new(engine: Arc<Engine>) -> Self {
        let mutator = engine.collector().register_mutator();
        let call_stack = CallStack::new(engine.config().max_depth);
        Interpreter {
            engine,
            mutator,
            frames: Vec::new(),
            call_stack,
            global_read: None,
        }
    }

    #[inline]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    #[inline]
    pub fn mutator(&self) -> &Mutator {
        &self.mutator
    }

    /// Current script call depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.call_stack.depth()
    }

    /// Evaluate a program root at global scope.
    ///
    /// An exception reaching the root is recorded on the global frame and
    /// returned as a fatal `UnhandledException`. The returned value is a
    /// temporary: read or bind it before further evaluation.
    pub fn execute(&mut self, root: &Node) -> EvalResult<Option<ValueId>> {
        debug!(
            source = %self.engine.source().file,
            nodes = root.count(),
            "execute"
        );
        self.hoist_functions(root)?;
        match self.eval(root)? {
            Flow::Normal(v) | Flow::Return(v) => Ok(v),
            Flow::Break | Flow::Next => Ok(None),
            Flow::Raised(exception) => {
                let mut global = self.engine.global().lock();
                let mut heap = self.mutator.heap();
                let text = display(&heap, exception)?;
                global.raise(&mut heap, exception);
                Err(unhandled_exception(text))
            }
        }
    }

    /// Evaluate one node.
    ///
    /// Catchable errors raised while evaluating `node` become
    /// `Flow::Raised` carrying the error text; fatal errors are returned.
    pub fn eval(&mut self, node: &Node) -> EvalResult<Flow> {
        if let Some(hook) = self.engine.debugger().cloned() {
            let view = FrameView {
                local: self.frames.last(),
                global: self.engine.global(),
                collector: self.mutator.collector(),
                depth: self.call_stack.depth(),
            };
            if hook.trigger(&view, node) == DebugAction::Stop {
                hook.wait_for_resume();
            }
        }
        match ensure_sufficient_stack(|| self.dispatch(node)) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                let err = err.with_span(node.span);
                if err.is_catchable() {
                    self.raise(&err)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn dispatch(&mut self, node: &Node) -> EvalResult<Flow> {
        match &node.kind {
            NodeKind::Constant(literal) => {
                let id = self.mutator.heap().intern(literal)?;
                Ok(Flow::Normal(Some(id)))
            }
            NodeKind::Identifier(name) => self.eval_identifier(name),
            NodeKind::Expression(op) => self.eval_expression(*op, node),
            NodeKind::Statement(op) => self.eval_statement(*op, node),
            NodeKind::Function(_) => self.declare_function(node),
            NodeKind::Call(name) => self.eval_call(name, node),
            NodeKind::AliasCall => self.eval_alias_call(node),
            NodeKind::MethodCall(name) => self.eval_method_call(name, node),
            NodeKind::Struct(_) | NodeKind::Class { .. } => self.declare_type(node),
            NodeKind::New(name) => self.eval_new(name, node),
            NodeKind::Method { .. }
            | NodeKind::Attribute { .. }
            | NodeKind::Case
            | NodeKind::DefaultCase => Err(malformed(&format!(
                "{} outside its enclosing declaration",
                node.kind.label()
            ))),
        }
    }

    /// Turn a catchable error into a raised string value.
    fn raise(&mut self, err: &EvalError) -> EvalResult<Flow> {
        trace!(error = %err, "raised");
        let id = self.mutator.heap().alloc_str(err.raised_text())?;
        Ok(Flow::Raised(id))
    }

    /// Evaluate `node` and require a defined value.
    pub(crate) fn eval_value(
        &mut self,
        node: &Node,
        context: &str,
    ) -> EvalResult<Result<ValueId, Flow>> {
        match self.eval(node)?.into_value() {
            Ok(Some(id)) => Ok(Ok(id)),
            Ok(None) => Err(undefined_value(context)),
            Err(signal) => Ok(Err(signal)),
        }
    }

    // Scopes

    /// Look a variable up in the local frame, then the global frame.
    ///
    /// A global id is pinned before the global lock is released.
    pub(crate) fn lookup(&mut self, name: &str) -> Option<(Scope, ValueId)> {
        if let Some(id) = self.frames.last().and_then(|f| f.get(name)) {
            return Some((Scope::Local, id));
        }
        let (id, pin) = {
            let global = self.engine.global().lock();
            let id = global.get(name)?;
            (id, self.mutator.pin(id))
        };
        self.global_read = Some(pin);
        Some((Scope::Global, id))
    }

    /// Run `f` on the frame for `scope` with the heap locked.
    pub(crate) fn with_frame<R>(
        &mut self,
        scope: Scope,
        f: impl FnOnce(&mut Frame, &mut Heap) -> EvalResult<R>,
    ) -> EvalResult<R> {
        match (scope, self.frames.last_mut()) {
            (Scope::Local, Some(frame)) => {
                let mut heap = self.mutator.heap();
                f(frame, &mut heap)
            }
            _ => {
                let mut global = self.engine.global().lock();
                let mut heap = self.mutator.heap();
                f(&mut global, &mut heap)
            }
        }
    }

    /// Scope new bindings go to: the innermost frame.
    #[inline]
    pub(crate) fn current_scope(&self) -> Scope {
        if self.frames.is_empty() {
            Scope::Global
        } else {
            Scope::Local
        }
    }

    /// Bind `name` in the current scope.
    pub(crate) fn bind(&mut self, name: &Name, value: ValueId) -> EvalResult<ValueId> {
        let scope = self.current_scope();
        self.with_frame(scope, |frame, heap| frame.add(heap, name.clone(), value))
    }

    /// Bindings of the innermost scope, in order.
    pub(crate) fn scope_bindings(&self) -> Vec<(Name, ValueId)> {
        let collect = |frame: &Frame| {
            frame
                .iter()
                .map(|(name, id)| (name.clone(), id))
                .collect::<Vec<_>>()
        };
        match self.frames.last() {
            Some(frame) => collect(frame),
            None => collect(&self.engine.global().lock()),
        }
    }

    /// Type whose method is running, if any.
    pub(crate) fn current_type(&self) -> Option<&Name> {
        self.frames.last().and_then(|f| f.owner().type_name.as_ref())
    }

    // Temporaries

    #[inline]
    pub(crate) fn pin(&self, id: ValueId) -> PinGuard {
        self.mutator.pin(id)
    }

    /// Free the unheld temporaries among `ids`, except `keep`.
    pub(crate) fn release_temps(&self, ids: &[ValueId], keep: Option<ValueId>) {
        let mut heap = self.mutator.heap();
        for &id in ids {
            if Some(id) != keep {
                heap.release_temporary(id);
            }
        }
    }

    /// Run a collection if the threshold has been reached.
    pub(crate) fn maybe_collect(&self) {
        if let Some(report) = self.mutator.collect() {
            trace!(
                mutator = self.mutator.id(),
                freed = report.freed,
                "statement boundary collection"
            );
        }
    }
}
