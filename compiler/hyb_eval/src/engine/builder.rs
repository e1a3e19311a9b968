//! `EngineBuilder` for assembling an [`Engine`].

use std::sync::Arc;

use hyb_ir::{Name, SourceInfo};
use hyb_value::{Collector, CollectorConfig};
use parking_lot::Mutex;
use tracing::debug;

use super::{Engine, EngineConfig};
use crate::builtins::{BuiltinFn, BuiltinRegistry};
use crate::debug::DebugHook;
use crate::frame::Frame;
use crate::modules::{ModuleError, ModuleLoader, ModuleRegistry, StaticModuleLoader};
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::segments::{CodeSegment, TypeSegment};
use crate::shared::{SharedMutableRegistry, SharedRegistry};
use crate::threads::ThreadRegistry;

/// Builder for [`Engine`].
///
/// Defaults: stdout printing, no debugger, the core builtin catalog and
/// the shipped module loader.
pub struct EngineBuilder {
    config: EngineConfig,
    source: SourceInfo,
    print: Option<SharedPrintHandler>,
    debugger: Option<Arc<dyn DebugHook>>,
    loaders: Vec<Box<dyn ModuleLoader>>,
    preload: Vec<String>,
    builtins: Vec<(Name, BuiltinFn)>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        EngineBuilder {
            config: EngineConfig::default(),
            source: SourceInfo::default(),
            print: None,
            debugger: None,
            loaders: Vec::new(),
            preload: Vec::new(),
            builtins: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn bounds_check(mut self, enabled: bool) -> Self {
        self.config.bounds_check = enabled;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    #[must_use]
    pub fn collector_config(mut self, config: CollectorConfig) -> Self {
        self.config.collector = config;
        self
    }

    /// Where `print`/`println` write. Default is stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print = Some(handler);
        self
    }

    #[must_use]
    pub fn debugger(mut self, hook: Arc<dyn DebugHook>) -> Self {
        self.debugger = Some(hook);
        self
    }

    /// Add a module loader, consulted after the ones already added.
    #[must_use]
    pub fn module_loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Load a module while building.
    #[must_use]
    pub fn preload_module(mut self, name: impl Into<String>) -> Self {
        self.preload.push(name.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: SourceInfo) -> Self {
        self.source = source;
        self
    }

    /// Register an extra builtin next to the core catalog.
    #[must_use]
    pub fn builtin(mut self, name: &str, function: BuiltinFn) -> Self {
        self.builtins.push((Name::new(name), function));
        self
    }

    /// Build the engine, loading preloaded modules.
    pub fn build(self) -> Result<Arc<Engine>, ModuleError> {
        let mut builtins = BuiltinRegistry::with_core();
        for (name, function) in self.builtins {
            builtins.register(name, function);
        }

        let mut modules = ModuleRegistry::new();
        modules.add_loader(Box::new(StaticModuleLoader));
        for loader in self.loaders {
            modules.add_loader(loader);
        }
        for name in &self.preload {
            modules.load(name, &builtins)?;
        }

        debug!(
            source = %self.source.file,
            builtins = builtins.len(),
            modules = modules.loaded().len(),
            "engine built"
        );
        Ok(Arc::new(Engine {
            collector: Collector::new(self.config.collector.clone()),
            config: self.config,
            source: self.source,
            global: Arc::new(Mutex::new(Frame::new())),
            code: SharedMutableRegistry::new(CodeSegment::default()),
            types: SharedMutableRegistry::new(TypeSegment::default()),
            builtins: SharedRegistry::new(builtins),
            modules: SharedMutableRegistry::new(modules),
            threads: ThreadRegistry::new(),
            debugger: self.debugger,
            print: self.print.unwrap_or_else(stdout_handler),
        }))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        EngineBuilder::new()
    }
}
