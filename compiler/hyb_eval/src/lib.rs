//! Hybris evaluator.
//!
//! Walks a syntax tree from `hyb_ir` against lexically scoped frames,
//! allocating through the `hyb_value` collector.
//!
//! # Architecture
//!
//! - [`Engine`]: process-wide state shared by every evaluating thread
//!   (global frame, code and type segments, builtins, modules, collector)
//! - [`Interpreter`]: one per evaluating thread; owns the local frame stack
//!   and a collector [`Mutator`](hyb_value::Mutator)
//! - [`Flow`]: control signals (break, next, return, raised exception)
//!   carried as values through recursive evaluation
//! - [`Frame`]: ordered identifier bindings with value-semantics assignment
//!
//! Fatal errors travel as `Err(EvalError)`; catchable ones become
//! `Flow::Raised` at the node that produced them and only `try`/`catch`
//! drains them.

mod builtins;
mod debug;
mod diagnostics;
mod engine;
mod exit;
mod flow;
mod frame;
mod interpreter;
mod modules;
mod print_handler;
mod segments;
mod shared;
mod stack;
mod threads;

pub use builtins::{BuiltinFn, BuiltinRegistry, CallContext};
pub use debug::{DebugAction, DebugHook, FrameView};
pub use diagnostics::{CallRecord, CallStack, DEFAULT_MAX_DEPTH};
pub use engine::{Engine, EngineBuilder, EngineConfig};
pub use exit::{run_program, ExitStatus};
pub use flow::Flow;
pub use frame::{ControlFlags, ControlState, Frame, FrameOwner, SharedFrame};
pub use interpreter::Interpreter;
pub use modules::{Module, ModuleError, ModuleLoader, ModuleRegistry, StaticModuleLoader};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use segments::{Callable, CodeSegment, Member, TypeKind, TypeSegment, TypeTemplate};
pub use shared::{SharedMutableRegistry, SharedRegistry};
pub use threads::ThreadRegistry;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, so embedders that install their
/// own subscriber are not overridden. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        use tracing_subscriber::layer::SubscriberExt as _;
        use tracing_subscriber::util::SubscriberInitExt as _;
        use tracing_subscriber::{fmt, EnvFilter};

        // try_init: a host process may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .try_init();
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
