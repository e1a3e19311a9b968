use super::*;
use hyb_value::{EvalResult, ValueId};
use pretty_assertions::assert_eq;

use crate::builtins::CallContext;

fn nothing(_ctx: &mut CallContext<'_>, _args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    Ok(None)
}

/// Serves fixed modules by name.
struct FixedLoader(Vec<Module>);

impl ModuleLoader for FixedLoader {
    fn load(&self, name: &str) -> Option<Module> {
        self.0.iter().find(|m| m.name == name).cloned()
    }
}

fn registry(modules: Vec<Module>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.add_loader(Box::new(StaticModuleLoader));
    registry.add_loader(Box::new(FixedLoader(modules)));
    registry
}

#[test]
fn static_loader_knows_the_binary_module() {
    let module = StaticModuleLoader.load("std.type.binary").unwrap();
    let names: Vec<&str> = module.functions.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["binary", "pack"]);
    assert!(StaticModuleLoader.load("std.other").is_none());
}

#[test]
fn load_registers_functions_once() {
    let builtins = BuiltinRegistry::with_core();
    let mut registry = registry(vec![Module::new("ext").with_function("ext_fn", nothing)]);
    registry.load("ext", &builtins).unwrap();
    registry.load("ext", &builtins).unwrap();
    assert!(registry.lookup("ext_fn").is_some());
    assert_eq!(registry.loaded(), &["ext".to_string()]);
    assert_eq!(registry.function_names(), vec![Name::new("ext_fn")]);
}

#[test]
fn later_loaders_are_consulted() {
    let builtins = BuiltinRegistry::with_core();
    let mut registry = registry(vec![Module::new("ext")]);
    registry.load("std.type.binary", &builtins).unwrap();
    registry.load("ext", &builtins).unwrap();
    assert!(registry.is_loaded("std.type.binary"));
    assert!(registry.is_loaded("ext"));
}

#[test]
fn unknown_module_is_not_found() {
    let builtins = BuiltinRegistry::with_core();
    let mut registry = registry(vec![]);
    assert_eq!(
        registry.load("nope", &builtins),
        Err(ModuleError::NotFound("nope".to_string()))
    );
}

#[test]
fn module_may_not_shadow_a_builtin() {
    let builtins = BuiltinRegistry::with_core();
    let mut registry = registry(vec![Module::new("bad").with_function("print", nothing)]);
    assert_eq!(
        registry.load("bad", &builtins),
        Err(ModuleError::ShadowsBuiltin {
            module: "bad".to_string(),
            function: "print".to_string(),
        })
    );
    assert!(!registry.is_loaded("bad"));
    assert!(registry.lookup("print").is_none());
}

#[test]
fn modules_may_not_share_function_names() {
    let builtins = BuiltinRegistry::with_core();
    let mut registry = registry(vec![
        Module::new("first").with_function("shared", nothing),
        Module::new("second")
            .with_function("unique", nothing)
            .with_function("shared", nothing),
    ]);
    registry.load("first", &builtins).unwrap();
    let err = registry.load("second", &builtins).unwrap_err();
    assert_eq!(
        err,
        ModuleError::DuplicateFunction {
            module: "second".to_string(),
            function: "shared".to_string(),
        }
    );
    assert!(registry.lookup("unique").is_none());
}

#[test]
fn module_errors_become_syntax_errors() {
    let err: EvalError = ModuleError::NotFound("x".to_string()).into();
    assert_eq!(err.class(), hyb_value::ErrorClass::Syntax);
    assert_eq!(err.message, "import: module 'x' not found");
}
