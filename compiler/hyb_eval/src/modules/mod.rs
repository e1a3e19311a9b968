//! Dynamic modules: named tables of native functions loaded by name.
//!
//! A [`ModuleLoader`] turns a module name into a [`Module`]. Once a module
//! is loaded through the [`ModuleRegistry`], its functions resolve like
//! builtins, after user functions and the core catalog.

mod binary;

use hyb_ir::Name;
use hyb_value::errors::bad_argument;
use hyb_value::EvalError;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use thiserror::Error;
use tracing::debug;

use crate::builtins::{BuiltinFn, BuiltinRegistry};

/// Module loading failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module '{0}' not found")]
    NotFound(String),
    #[error("module '{module}' redefines function '{function}'")]
    DuplicateFunction { module: String, function: String },
    #[error("module '{module}' function '{function}' shadows a builtin")]
    ShadowsBuiltin { module: String, function: String },
}

impl From<ModuleError> for EvalError {
    fn from(err: ModuleError) -> Self {
        bad_argument("import", err.to_string())
    }
}

/// A named table of native functions.
#[derive(Clone)]
pub struct Module {
    pub name: String,
    pub functions: Vec<(Name, BuiltinFn)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_function(mut self, name: &str, function: BuiltinFn) -> Self {
        self.functions.push((Name::new(name), function));
        self
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&Name> = self.functions.iter().map(|(name, _)| name).collect();
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("functions", &names)
            .finish()
    }
}

/// Resolves module names.
pub trait ModuleLoader: Send + Sync {
    /// The module called `name`, or `None` if this loader does not know it.
    fn load(&self, name: &str) -> Option<Module>;
}

/// Modules compiled into the runtime.
#[derive(Copy, Clone, Debug, Default)]
pub struct StaticModuleLoader;

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, name: &str) -> Option<Module> {
        match name {
            binary::MODULE_NAME => Some(binary::module()),
            _ => None,
        }
    }
}

/// Loaders and the functions of every loaded module.
#[derive(Default)]
pub struct ModuleRegistry {
    loaders: Vec<Box<dyn ModuleLoader>>,
    loaded: Vec<String>,
    functions: IndexMap<Name, BuiltinFn, FxBuildHasher>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry::default()
    }

    /// Add a loader, consulted after the existing ones.
    pub fn add_loader(&mut self, loader: Box<dyn ModuleLoader>) {
        self.loaders.push(loader);
    }

    /// Load `name` with the first loader that knows it. Loading a module
    /// twice is a no-op.
    ///
    /// A module function may not reuse a builtin name or a function of an
    /// already loaded module; nothing is registered when it does.
    pub fn load(&mut self, name: &str, builtins: &BuiltinRegistry) -> Result<(), ModuleError> {
        if self.is_loaded(name) {
            return Ok(());
        }
        let module = self
            .loaders
            .iter()
            .find_map(|loader| loader.load(name))
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        for (function, _) in &module.functions {
            if builtins.contains(function.as_str()) {
                return Err(ModuleError::ShadowsBuiltin {
                    module: module.name.clone(),
                    function: function.to_string(),
                });
            }
            if self.functions.contains_key(function) {
                return Err(ModuleError::DuplicateFunction {
                    module: module.name.clone(),
                    function: function.to_string(),
                });
            }
        }
        debug!(
            module = name,
            functions = module.functions.len(),
            "module loaded"
        );
        self.functions.extend(module.functions);
        self.loaded.push(name.to_string());
        Ok(())
    }

    pub fn lookup(&self, function: &str) -> Option<BuiltinFn> {
        self.functions.get(function).copied()
    }

    /// Functions of loaded modules, in load order.
    pub fn function_names(&self) -> Vec<Name> {
        self.functions.keys().cloned().collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|m| m == name)
    }

    /// Names of loaded modules, in load order.
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("loaders", &self.loaders.len())
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
