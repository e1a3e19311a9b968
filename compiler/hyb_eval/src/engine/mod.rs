//! Process-wide evaluation state.
//!
//! An [`Engine`] is built once (see [`EngineBuilder`]) and shared through an
//! `Arc` by the main interpreter and every spawned script thread.

mod builder;

pub use builder::EngineBuilder;

use std::sync::Arc;

use hyb_ir::{Node, SourceInfo};
use hyb_value::ops::display;
use hyb_value::{Collector, CollectorConfig, EvalResult, ValueId};
use tracing::{debug, warn};

use crate::builtins::BuiltinRegistry;
use crate::debug::DebugHook;
use crate::diagnostics::DEFAULT_MAX_DEPTH;
use crate::frame::SharedFrame;
use crate::interpreter::Interpreter;
use crate::modules::{ModuleError, ModuleRegistry};
use crate::print_handler::SharedPrintHandler;
use crate::segments::{CodeSegment, TypeSegment};
use crate::shared::{SharedMutableRegistry, SharedRegistry};
use crate::threads::ThreadRegistry;

/// Evaluation settings.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Out-of-range vector reads raise an `IndexError` instead of
    /// yielding undefined.
    pub bounds_check: bool,
    /// Script call depth allowed before a `RecursionError`.
    pub max_depth: usize,
    pub collector: CollectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            bounds_check: true,
            max_depth: DEFAULT_MAX_DEPTH,
            collector: CollectorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults, with collector thresholds overridable from the environment.
    pub fn from_env() -> Self {
        EngineConfig {
            collector: CollectorConfig::from_env(),
            ..EngineConfig::default()
        }
    }
}

/// Shared state of one script run.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) source: SourceInfo,
    pub(crate) collector: Arc<Collector>,
    pub(crate) global: SharedFrame,
    pub(crate) code: SharedMutableRegistry<CodeSegment>,
    pub(crate) types: SharedMutableRegistry<TypeSegment>,
    pub(crate) builtins: SharedRegistry<BuiltinRegistry>,
    pub(crate) modules: SharedMutableRegistry<ModuleRegistry>,
    pub(crate) threads: ThreadRegistry,
    pub(crate) debugger: Option<Arc<dyn DebugHook>>,
    pub(crate) print: SharedPrintHandler,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Run a program root on the calling thread.
    ///
    /// Returns the printed value of the root's last statement, if any.
    pub fn run(self: &Arc<Self>, root: &Node) -> EvalResult<Option<String>> {
        let mut interpreter = Interpreter::new(Arc::clone(self));
        let result = interpreter.execute(root)?;
        match result {
            Some(id) => Ok(Some(self.display(id)?)),
            None => Ok(None),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    #[inline]
    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    #[inline]
    pub fn global(&self) -> &SharedFrame {
        &self.global
    }

    #[inline]
    pub fn code(&self) -> &SharedMutableRegistry<CodeSegment> {
        &self.code
    }

    #[inline]
    pub fn types(&self) -> &SharedMutableRegistry<TypeSegment> {
        &self.types
    }

    #[inline]
    pub fn builtins(&self) -> &SharedRegistry<BuiltinRegistry> {
        &self.builtins
    }

    #[inline]
    pub fn modules(&self) -> &SharedMutableRegistry<ModuleRegistry> {
        &self.modules
    }

    #[inline]
    pub fn threads(&self) -> &ThreadRegistry {
        &self.threads
    }

    #[inline]
    pub fn debugger(&self) -> Option<&Arc<dyn DebugHook>> {
        self.debugger.as_ref()
    }

    #[inline]
    pub fn print(&self) -> &SharedPrintHandler {
        &self.print
    }

    /// Value bound to `name` in the global frame.
    pub fn global_value(&self, name: &str) -> Option<ValueId> {
        self.global.lock().get(name)
    }

    /// Printed form of the global `name`.
    pub fn display_global(&self, name: &str) -> Option<String> {
        let global = self.global.lock();
        let id = global.get(name)?;
        display(&self.collector.lock(), id).ok()
    }

    pub fn display(&self, id: ValueId) -> EvalResult<String> {
        display(&self.collector.lock(), id)
    }

    /// Load a module so its functions resolve like builtins.
    pub fn load_module(&self, name: &str) -> Result<(), ModuleError> {
        self.modules.write().load(name, &self.builtins)
    }

    /// Script threads started and not yet finished.
    pub fn running_threads(&self) -> usize {
        self.threads.running()
    }

    /// End the run: wait for leftover threads, release the global frame
    /// and free every value.
    ///
    /// Errors of threads nobody joined are logged only. An exception still
    /// recorded on the global frame is returned.
    pub fn shutdown(&self) -> EvalResult<()> {
        for (handle, joined) in self.threads.join_all() {
            match joined {
                Ok(Ok(Some(result))) => self.collector.lock().decref(result),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => warn!(handle, error = %err, "unjoined thread failed"),
                Err(_) => warn!(handle, "unjoined thread panicked"),
            }
        }
        let released = {
            let mut global = self.global.lock();
            let mut heap = self.collector.lock();
            global.release(&mut heap)
        };
        let stats = self.collector.stats();
        self.collector.release();
        debug!(
            items = stats.items,
            usage = stats.usage,
            collections = stats.collections,
            "engine shut down"
        );
        released
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("debugger", &self.debugger.is_some())
            .finish_non_exhaustive()
    }
}
