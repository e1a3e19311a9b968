//! Function declarations and calls.

use hyb_ir::{Name, Node, NodeKind, Span};
use hyb_value::errors::{
    arity_mismatch, builtin_redefined, function_redefined, internal, not_callable,
    undeclared_identifier,
};
use hyb_value::{AliasTarget, ErrorClass, EvalResult, PinGuard, Value, ValueId};
use smallvec::SmallVec;
use tracing::trace;

use super::expr::child;
use super::Interpreter;
use crate::builtins::{BuiltinFn, CallContext};
use crate::flow::{unwind, Flow};
use crate::frame::{Frame, FrameOwner};
use crate::segments::Callable;

/// Evaluated call arguments, pinned until the callee has bound them.
#[derive(Default)]
pub(crate) struct Arguments {
    pub(crate) values: SmallVec<[ValueId; 4]>,
    pins: SmallVec<[PinGuard; 4]>,
}

impl Arguments {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Drop the pins, keeping the ids.
    pub(crate) fn unpin(self) -> SmallVec<[ValueId; 4]> {
        drop(self.pins);
        self.values
    }
}

/// Where a call by name resolved to.
enum Target {
    User(std::sync::Arc<Callable>),
    Native(BuiltinFn),
}

impl Interpreter {
    /// Register every function declared anywhere under `root`.
    ///
    /// Runs before the program starts, so a duplicate declaration fails
    /// before any statement executes.
    pub(super) fn hoist_functions(&mut self, root: &Node) -> EvalResult<()> {
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            match node.kind {
                NodeKind::Function(_) => self
                    .register_function(node)
                    .map_err(|e| e.with_span(node.span))?,
                // Methods belong to their type.
                NodeKind::Struct(_) | NodeKind::Class { .. } => continue,
                _ => {}
            }
            pending.extend(node.children.iter().rev());
        }
        Ok(())
    }

    fn register_function(&mut self, node: &Node) -> EvalResult<()> {
        let callable = Callable::from_node(node, None)?;
        if self.engine.builtins().contains(callable.name.as_str()) {
            return Err(builtin_redefined(callable.name.as_str()));
        }
        let name = callable.name.clone();
        let index = self.engine.code().write().define(callable);
        match index {
            Some(index) => {
                trace!(function = %name, index, "function declared");
                Ok(())
            }
            None => Err(function_redefined(name.as_str())),
        }
    }

    /// A declaration reached during evaluation. Already-registered
    /// declarations (hoisted, or copied into a thread) are no-ops.
    pub(super) fn declare_function(&mut self, node: &Node) -> EvalResult<Flow> {
        let existing = node
            .declared_name()
            .and_then(|name| self.engine.code().read().get(name.as_str()));
        match existing {
            Some(callable) if callable.matches_declaration(node) => {}
            _ => self.register_function(node)?,
        }
        Ok(Flow::Normal(None))
    }

    fn resolve_call(&self, name: &Name) -> Option<Target> {
        let user = self.engine.code().read().get(name.as_str());
        if let Some(callable) = user {
            return Some(Target::User(callable));
        }
        if let Some(function) = self.engine.builtins().get(name.as_str()) {
            return Some(Target::Native(function));
        }
        let module_function = self.engine.modules().read().lookup(name.as_str());
        module_function.map(Target::Native)
    }

    /// `name(args...)`: user functions, then builtins, then loaded modules.
    pub(super) fn eval_call(&mut self, name: &Name, node: &Node) -> EvalResult<Flow> {
        let target = self
            .resolve_call(name)
            .ok_or_else(|| undeclared_identifier(name.as_str()))?;
        let args = unwind!(self.eval_arguments(&node.children)?);
        match target {
            Target::User(callable) => self.call_user(&callable, args, None, node.span),
            Target::Native(function) => self.call_native(name, function, args, node.span),
        }
    }

    /// Call by name with ids that are already evaluated.
    pub(crate) fn call_by_name(
        &mut self,
        name: &Name,
        values: &[ValueId],
        span: Span,
    ) -> EvalResult<Flow> {
        let target = self
            .resolve_call(name)
            .ok_or_else(|| undeclared_identifier(name.as_str()))?;
        let mut args = Arguments::default();
        for &value in values {
            args.pins.push(self.pin(value));
            args.values.push(value);
        }
        match target {
            Target::User(callable) => self.call_user(&callable, args, None, span),
            Target::Native(function) => self.call_native(name, function, args, span),
        }
    }

    /// `callee(args...)` where `callee` evaluates to a function alias.
    pub(super) fn eval_alias_call(&mut self, node: &Node) -> EvalResult<Flow> {
        let callee = unwind!(self.eval_value(child(node, 0)?, "callee")?);
        let index = {
            let heap = self.mutator.heap();
            let target = heap.resolve(callee)?;
            match heap.get(target)? {
                Value::Alias(AliasTarget::Function(index)) => *index,
                other => return Err(not_callable(other.type_name())),
            }
        };
        self.release_temps(&[callee], None);
        let callable = self
            .engine
            .code()
            .read()
            .by_index(index)
            .ok_or_else(|| internal(format!("no function at index {index}")))?;
        let args = unwind!(self.eval_arguments(node.children.get(1..).unwrap_or(&[]))?);
        self.call_user(&callable, args, None, node.span)
    }

    pub(crate) fn eval_arguments(&mut self, nodes: &[Node]) -> EvalResult<Result<Arguments, Flow>> {
        let mut args = Arguments::default();
        for node in nodes {
            let value = match self.eval_value(node, "argument")? {
                Ok(value) => value,
                Err(signal) => return Ok(Err(signal)),
            };
            args.pins.push(self.pin(value));
            args.values.push(value);
        }
        Ok(Ok(args))
    }

    /// Run a user function or method in a fresh frame.
    ///
    /// Arguments are bound with value semantics; `receiver`, when given, is
    /// bound to `me` by identity. The result is the `return` payload, or
    /// undefined.
    pub(crate) fn call_user(
        &mut self,
        callable: &Callable,
        args: Arguments,
        receiver: Option<ValueId>,
        span: Span,
    ) -> EvalResult<Flow> {
        if args.len() != callable.arity() {
            return Err(arity_mismatch(
                callable.name.as_str(),
                callable.arity(),
                args.len(),
            ));
        }
        self.call_stack.push(callable.name.clone(), span)?;
        trace!(
            function = %callable.name,
            depth = self.call_stack.depth(),
            "call"
        );

        let owner = match &callable.owner {
            Some(type_name) => FrameOwner::method(callable.name.clone(), type_name.clone()),
            None => FrameOwner::function(callable.name.clone()),
        };
        let mut frame = Frame::with_owner(owner);
        let bound = self.bind_arguments(&mut frame, callable, &args.values, receiver);
        drop(args);

        let outcome = match bound {
            Ok(()) => {
                self.frames.push(frame);
                let outcome = self.eval(&callable.body);
                frame = self.frames.pop().unwrap_or_default();
                outcome
            }
            Err(err) => Err(err),
        };

        let released = {
            let mut heap = self.mutator.heap();
            let released = frame.release(&mut heap);
            if let Some(payload) = outcome.as_ref().ok().and_then(Flow::payload) {
                heap.claim(payload);
            }
            released
        };
        let flow = match outcome.and_then(|flow| released.map(|()| flow)) {
            Ok(flow) => flow,
            Err(err) => {
                let err = self.call_stack.annotate(err);
                self.call_stack.pop();
                return Err(err);
            }
        };
        self.call_stack.pop();

        Ok(match flow {
            Flow::Return(v) => Flow::Normal(v),
            Flow::Raised(exception) => Flow::Raised(exception),
            Flow::Normal(v) => {
                if let Some(v) = v {
                    self.release_temps(&[v], None);
                }
                Flow::Normal(None)
            }
            Flow::Break | Flow::Next => Flow::Normal(None),
        })
    }

    fn bind_arguments(
        &self,
        frame: &mut Frame,
        callable: &Callable,
        values: &[ValueId],
        receiver: Option<ValueId>,
    ) -> EvalResult<()> {
        let mut heap = self.mutator.heap();
        for (param, &value) in callable.params.iter().zip(values) {
            frame.add(&mut heap, param.clone(), value)?;
        }
        if let Some(receiver) = receiver {
            frame.insert(&mut heap, Name::new("me"), receiver);
        }
        Ok(())
    }

    /// Run a builtin or module function. Arguments stay pinned while it
    /// runs; unheld argument temporaries are freed afterwards.
    fn call_native(
        &mut self,
        name: &Name,
        function: BuiltinFn,
        args: Arguments,
        span: Span,
    ) -> EvalResult<Flow> {
        trace!(function = %name, args = args.len(), "native call");
        let result = {
            let mut ctx = CallContext::new(self, name, span);
            function(&mut ctx, &args.values)
        };
        let values = args.unpin();
        let result = result?;
        self.release_temps(&values, result);
        Ok(Flow::Normal(result))
    }

    /// Run `callable` as the root of a spawned thread, in a frame already
    /// holding its arguments.
    ///
    /// The result is held (count incremented) so it outlives this
    /// interpreter's mutator; the joiner releases it. An exception that
    /// escapes the body is fatal for the thread. `pthread_exit` ends the
    /// thread with no result.
    pub(crate) fn run_detached(
        &mut self,
        callable: &Callable,
        frame: Frame,
    ) -> EvalResult<Option<ValueId>> {
        self.call_stack.push(callable.name.clone(), callable.body.span)?;
        self.frames.push(frame);
        let outcome = self.eval(&callable.body);
        let mut frame = self.frames.pop().unwrap_or_default();
        self.call_stack.pop();

        let mut heap = self.mutator.heap();
        let result = match outcome {
            Ok(Flow::Raised(exception)) => {
                frame.raise(&mut heap, exception);
                None
            }
            Ok(Flow::Return(Some(value))) => {
                heap.incref(value);
                Some(value)
            }
            Ok(_) => None,
            Err(err) if err.class() == ErrorClass::ThreadExit => None,
            Err(err) => {
                // The fatal error wins over anything the frame still holds.
                let _ = frame.release(&mut heap);
                return Err(err);
            }
        };
        frame.release(&mut heap)?;
        Ok(result)
    }
}
