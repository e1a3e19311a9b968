//! Output, containers, conversions and collector control.

use hyb_ir::Name;
use hyb_value::errors::{bad_argument, type_mismatch};
use hyb_value::ops::{self, display, to_int};
use hyb_value::{CollectorStats, EvalResult, Heap, Value, ValueId};

use super::{expect_args, BuiltinRegistry, CallContext};

pub(super) fn register(registry: &mut BuiltinRegistry) {
    let catalog: [(&str, super::BuiltinFn); 12] = [
        ("print", print),
        ("println", println),
        ("array", array),
        ("map", map),
        ("elements", elements),
        ("typeof", type_of),
        ("toint", to_integer),
        ("tostring", to_string),
        ("import", import),
        ("gc_collect", gc_collect),
        ("gc_stats", gc_stats),
        ("gc_set_threshold", gc_set_threshold),
    ];
    for (name, function) in catalog {
        registry.register(Name::new(name), function);
    }
}

fn concatenated(ctx: &CallContext<'_>, args: &[ValueId]) -> EvalResult<String> {
    let heap = ctx.heap();
    args.iter().map(|&arg| display(&heap, arg)).collect()
}

fn print(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let text = concatenated(ctx, args)?;
    ctx.print(&text);
    Ok(None)
}

fn println(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let text = concatenated(ctx, args)?;
    ctx.println(&text);
    Ok(None)
}

/// `array(a, b, ...)`: a vector holding copies of the arguments.
fn array(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    let vector = ctx.heap().alloc_vector(args)?;
    Ok(Some(vector))
}

/// `map(k1, v1, k2, v2, ...)`.
fn map(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    if args.len() % 2 != 0 {
        return Err(bad_argument(
            "map",
            format!("expects key/value pairs (called with {})", args.len()),
        ));
    }
    let mut heap = ctx.heap();
    let map = ops::new_map(&mut heap)?;
    for pair in args.chunks_exact(2) {
        ops::map_insert(&mut heap, map, pair[0], pair[1])?;
    }
    Ok(Some(map))
}

fn elements(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("elements", args, 1)?;
    let mut heap = ctx.heap();
    let count = ops::element_count(&heap, args[0])?;
    let count = heap.alloc(Value::Int(saturating_int(count)))?;
    Ok(Some(count))
}

fn type_of(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("typeof", args, 1)?;
    let mut heap = ctx.heap();
    let target = heap.resolve(args[0])?;
    let name = heap.get(target)?.type_name();
    Ok(Some(heap.alloc_str(name)?))
}

fn to_integer(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("toint", args, 1)?;
    let mut heap = ctx.heap();
    match to_int(&heap, args[0])? {
        Some(n) => Ok(Some(heap.alloc(Value::Int(n))?)),
        None => {
            let target = heap.resolve(args[0])?;
            Err(type_mismatch("int", heap.get(target)?.type_name()))
        }
    }
}

fn to_string(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("tostring", args, 1)?;
    let mut heap = ctx.heap();
    let text = display(&heap, args[0])?;
    Ok(Some(heap.alloc_str(text)?))
}

/// `import("std.type.binary")`: load a module on first use.
fn import(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("import", args, 1)?;
    let name = ctx.display(args[0])?;
    ctx.engine().load_module(&name)?;
    Ok(None)
}

/// Run a full collection now. Returns the number of freed values.
fn gc_collect(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("gc_collect", args, 0)?;
    let mutator = ctx.interpreter().mutator();
    let report = mutator.collector().collect_now(mutator);
    let freed = ctx.heap().alloc(Value::Int(saturating_int(report.freed)))?;
    Ok(Some(freed))
}

/// Collector counters as a map keyed by name.
fn gc_stats(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("gc_stats", args, 0)?;
    let stats = ctx.engine().collector().stats();
    let mut heap = ctx.heap();
    Ok(Some(stats_map(&mut heap, &stats)?))
}

fn stats_map(heap: &mut Heap, stats: &CollectorStats) -> EvalResult<ValueId> {
    let entries = [
        ("items", stats.items),
        ("usage", stats.usage),
        ("collections", saturating_usize(stats.collections)),
        ("constants", stats.constants),
        ("heap", stats.heap),
        ("lag", stats.lag),
        ("gc_threshold", stats.gc_threshold),
        ("mm_threshold", stats.mm_threshold),
    ];
    let map = ops::new_map(heap)?;
    for (key, value) in entries {
        let key = heap.alloc_str(key)?;
        let value = heap.alloc(Value::Int(saturating_int(value)))?;
        ops::map_insert(heap, map, key, value)?;
    }
    Ok(map)
}

/// `gc_set_threshold(bytes)`: returns the previous threshold.
fn gc_set_threshold(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    expect_args("gc_set_threshold", args, 1)?;
    let bytes = {
        let heap = ctx.heap();
        to_int(&heap, args[0])?
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| bad_argument("gc_set_threshold", "expects a positive byte count"))?
    };
    let previous = ctx.engine().collector().set_gc_threshold(bytes);
    let previous = ctx.heap().alloc(Value::Int(saturating_int(previous)))?;
    Ok(Some(previous))
}

fn saturating_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn saturating_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
