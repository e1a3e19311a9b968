//! Introspection of scopes and function tables.

use hyb_ir::Name;
use hyb_value::errors::bad_argument;
use hyb_value::{EvalResult, Value, ValueId};

use super::{BuiltinFn, BuiltinRegistry, CallContext};

pub(super) fn register(registry: &mut BuiltinRegistry) {
    let catalog: [(&str, BuiltinFn); 6] = [
        ("var_names", var_names),
        ("var_values", var_values),
        ("user_functions", user_functions),
        ("core_functions", core_functions),
        ("dyn_functions", dyn_functions),
        ("call", call),
    ];
    for (name, function) in catalog {
        registry.register(Name::new(name), function);
    }
}

/// Vector of strings, one per name.
fn name_vector<'n>(
    ctx: &CallContext<'_>,
    names: impl IntoIterator<Item = &'n Name>,
) -> EvalResult<ValueId> {
    let mut heap = ctx.heap();
    let mut items = Vec::new();
    for name in names {
        items.push(heap.alloc_str(name.as_str())?);
    }
    heap.alloc_vector(&items)
}

/// Names bound in the caller's scope, in binding order.
fn var_names(ctx: &mut CallContext<'_>, _args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let bindings = ctx.scope_bindings();
    let names = name_vector(ctx, bindings.iter().map(|(name, _)| name))?;
    Ok(Some(names))
}

/// Copies of the values bound in the caller's scope.
fn var_values(ctx: &mut CallContext<'_>, _args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let values: Vec<ValueId> = ctx.scope_bindings().into_iter().map(|(_, id)| id).collect();
    let vector = ctx.heap().alloc_vector(&values)?;
    Ok(Some(vector))
}

fn user_functions(ctx: &mut CallContext<'_>, _args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let names: Vec<Name> = ctx.engine().code().read().names().cloned().collect();
    Ok(Some(name_vector(ctx, &names)?))
}

fn core_functions(ctx: &mut CallContext<'_>, _args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let names: Vec<Name> = ctx.engine().builtins().names().cloned().collect();
    Ok(Some(name_vector(ctx, &names)?))
}

/// Functions provided by loaded modules.
fn dyn_functions(ctx: &mut CallContext<'_>, _args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let names = ctx.engine().modules().read().function_names();
    Ok(Some(name_vector(ctx, &names)?))
}

/// `call(name, args...)`: call a function by its name as a string.
fn call(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let (&target, rest) = args
        .split_first()
        .ok_or_else(|| bad_argument("call", "requires at least 1 parameter (called with 0)"))?;
    let name = {
        let heap = ctx.heap();
        match heap.get(heap.resolve(target)?)? {
            Value::Str(name) => name.clone(),
            other => {
                return Err(bad_argument(
                    "call",
                    format!("expects a function name, got {}", other.type_name()),
                ))
            }
        }
    };
    ctx.call(&name, rest)
}
