//! `pthread_create`, `pthread_join`, `pthread_exit` and `pthread_running`.
//!
//! A threaded call gets a deep copy of its arguments and of the function
//! body, and runs on its own interpreter. Only scalar arguments can cross.

use std::sync::Arc;

use hyb_ir::Name;
use hyb_value::errors::{
    arity_mismatch, bad_argument, internal, thread_exit, thrown, undeclared_identifier,
};
use hyb_value::{AliasTarget, EvalErrorKind, EvalResult, Value, ValueId};
use tracing::{debug, warn};

use super::{expect_args, BuiltinFn, BuiltinRegistry, CallContext};
use crate::frame::{Frame, FrameOwner};
use crate::interpreter::Interpreter;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    let catalog: [(&str, BuiltinFn); 4] = [
        ("pthread_create", pthread_create),
        ("pthread_join", pthread_join),
        ("pthread_exit", pthread_exit),
        ("pthread_running", pthread_running),
    ];
    for (name, function) in catalog {
        registry.register(Name::new(name), function);
    }
}

/// `pthread_create(function, args...)`: returns a thread handle.
///
/// The function is named by a string or given as a function alias.
fn pthread_create(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let (&target, rest) = args.split_first().ok_or_else(|| {
        bad_argument("pthread_create", "requires at least 1 parameter (called with 0)")
    })?;

    let callable = {
        let heap = ctx.heap();
        let code = ctx.engine().code().read();
        match heap.get(heap.resolve(target)?)? {
            Value::Str(name) => code.get(name).ok_or_else(|| undeclared_identifier(name))?,
            Value::Alias(AliasTarget::Function(index)) => code
                .by_index(*index)
                .ok_or_else(|| internal(format!("no function at index {index}")))?,
            other => {
                return Err(bad_argument(
                    "pthread_create",
                    format!("expects a function, got {}", other.type_name()),
                ))
            }
        }
    };
    if rest.len() != callable.arity() {
        return Err(arity_mismatch(
            callable.name.as_str(),
            callable.arity(),
            rest.len(),
        ));
    }

    let frame = {
        let mut heap = ctx.heap();
        for &arg in rest {
            if !heap.get(heap.resolve(arg)?)?.is_scalar() {
                return Err(bad_argument(
                    "pthread_create",
                    "type not supported for pthread call",
                ));
            }
        }
        let mut frame = Frame::with_owner(FrameOwner::function(callable.name.clone()));
        for (param, &arg) in callable.params.iter().zip(rest) {
            let copy = heap.deep_clone(arg)?;
            frame.add(&mut heap, param.clone(), copy)?;
        }
        frame
    };

    let snapshot = callable.snapshot();
    let label = snapshot.name.clone();
    let engine = Arc::clone(ctx.engine());
    let handle = ctx
        .engine()
        .threads()
        .spawn(label.as_str(), move || {
            let mut interpreter = Interpreter::new(engine);
            interpreter.run_detached(&snapshot, frame)
        })?;
    let handle = ctx.heap().alloc(Value::Handle(handle))?;
    Ok(Some(handle))
}

/// `pthread_join(handle)`: wait for a thread and take its result.
///
/// An exception that ended the thread is raised again in the joiner.
fn pthread_join(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("pthread_join", args, 1)?;
    let handle = {
        let heap = ctx.heap();
        match heap.get(heap.resolve(args[0])?)? {
            Value::Handle(handle) => *handle,
            other => {
                return Err(bad_argument(
                    "pthread_join",
                    format!("expects a thread handle, got {}", other.type_name()),
                ))
            }
        }
    };
    let join = ctx.engine().threads().take(handle).ok_or_else(|| {
        bad_argument("pthread_join", format!("no joinable thread with handle {handle}"))
    })?;

    debug!(handle, "joining thread");
    match join.join() {
        Ok(Ok(result)) => {
            if let Some(value) = result {
                let mut heap = ctx.heap();
                heap.decref(value);
                heap.claim(value);
            }
            Ok(result)
        }
        Ok(Err(err)) => {
            if let EvalErrorKind::UnhandledException { value } = &err.kind {
                warn!(handle, exception = %value, "thread ended with an unhandled exception");
                return Err(thrown(value.clone()));
            }
            Err(err)
        }
        Err(_) => Err(internal(format!("thread {handle} panicked"))),
    }
}

/// `pthread_exit()`: end the calling script thread with an undefined result.
///
/// Called from the main program it ends the run successfully once the
/// remaining threads are joined.
fn pthread_exit(_ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("pthread_exit", args, 0)?;
    Err(thread_exit())
}

fn pthread_running(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("pthread_running", args, 0)?;
    let running = ctx.engine().running_threads();
    let running = ctx
        .heap()
        .alloc(Value::Int(i64::try_from(running).unwrap_or(i64::MAX)))?;
    Ok(Some(running))
}
