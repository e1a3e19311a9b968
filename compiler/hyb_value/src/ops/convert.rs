//! Truthiness, equality, ordering and text conversion.

use std::cmp::Ordering;
use std::fmt::Write as _;

use hyb_ir::BinaryOp;

use super::arith::Num;
use crate::errors::{invalid_binary_op, EvalResult};
use crate::heap::Heap;
use rustc_hash::FxHashSet;

use crate::value::{AliasTarget, Instance, MapValue, Value, ValueId};

/// Whether a value counts as true in a condition.
pub fn truthy(heap: &Heap, id: ValueId) -> EvalResult<bool> {
    let id = heap.resolve(id)?;
    Ok(match heap.get(id)? {
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(f) => *f != 0.0,
        Value::Char(c) => *c != '\0',
        Value::Str(s) => !s.is_empty(),
        Value::Binary(b) => !b.is_empty(),
        Value::Vector(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Struct(_)
        | Value::Class(_)
        | Value::Alias(_)
        | Value::Reference(_)
        | Value::Handle(_) => true,
    })
}

/// Content equality with numeric promotion.
///
/// Containers that reach themselves compare equal once the comparison
/// comes back to a pair already being compared.
pub fn values_equal(heap: &Heap, a: ValueId, b: ValueId) -> EvalResult<bool> {
    equal_in(heap, a, b, &mut FxHashSet::default())
}

/// Pairs of containers under comparison.
type Comparing = FxHashSet<(ValueId, ValueId)>;

fn equal_in(heap: &Heap, a: ValueId, b: ValueId, comparing: &mut Comparing) -> EvalResult<bool> {
    let a = heap.resolve(a)?;
    let b = heap.resolve(b)?;
    if a == b {
        return Ok(true);
    }
    let (av, bv) = (heap.get(a)?, heap.get(b)?);
    if let (Some(x), Some(y)) = (Num::of(av), Num::of(bv)) {
        return Ok(match (x, y) {
            (Num::Int(x), Num::Int(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        });
    }
    match (av, bv) {
        (Value::Str(x), Value::Str(y)) => return Ok(x == y),
        (Value::Binary(x), Value::Binary(y)) => return Ok(x == y),
        (Value::Alias(x), Value::Alias(y)) => return Ok(x == y),
        (Value::Handle(x), Value::Handle(y)) => return Ok(x == y),
        (Value::Vector(_), Value::Vector(_))
        | (Value::Map(_), Value::Map(_))
        | (Value::Struct(_), Value::Struct(_))
        | (Value::Class(_), Value::Class(_)) => {}
        _ => return Ok(false),
    }
    if !comparing.insert((a, b)) {
        return Ok(true);
    }
    let equal = match (av, bv) {
        (Value::Vector(x), Value::Vector(y)) => all_equal(heap, x, y, comparing)?,
        (Value::Map(x), Value::Map(y)) => maps_equal(heap, x, y, comparing)?,
        (Value::Struct(x), Value::Struct(y)) | (Value::Class(x), Value::Class(y)) => {
            x.type_name == y.type_name
                && x.fields.len() == y.fields.len()
                && fields_equal(heap, x, y, comparing)?
        }
        _ => false,
    };
    comparing.remove(&(a, b));
    Ok(equal)
}

fn all_equal(
    heap: &Heap,
    x: &[ValueId],
    y: &[ValueId],
    comparing: &mut Comparing,
) -> EvalResult<bool> {
    if x.len() != y.len() {
        return Ok(false);
    }
    for (a, b) in x.iter().zip(y) {
        if !equal_in(heap, *a, *b, comparing)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn maps_equal(
    heap: &Heap,
    x: &MapValue,
    y: &MapValue,
    comparing: &mut Comparing,
) -> EvalResult<bool> {
    if x.len() != y.len() {
        return Ok(false);
    }
    for (key, value) in x.keys.iter().zip(&x.values) {
        match map_position(heap, &y.keys, *key)? {
            Some(pos) if equal_in(heap, *value, y.values[pos], comparing)? => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

fn fields_equal(
    heap: &Heap,
    x: &Instance,
    y: &Instance,
    comparing: &mut Comparing,
) -> EvalResult<bool> {
    for ((xn, xv), (yn, yv)) in x.fields.iter().zip(&y.fields) {
        if xn != yn || !equal_in(heap, *xv, *yv, comparing)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Position of `key` among `keys`, by content.
pub(crate) fn map_position(heap: &Heap, keys: &[ValueId], key: ValueId) -> EvalResult<Option<usize>> {
    for (pos, candidate) in keys.iter().enumerate() {
        if values_equal(heap, *candidate, key)? {
            return Ok(Some(pos));
        }
    }
    Ok(None)
}

/// Ordering for `< <= > >=`: numbers (with promotion) and strings.
pub(crate) fn compare(heap: &Heap, op: BinaryOp, a: ValueId, b: ValueId) -> EvalResult<Ordering> {
    let (av, bv) = (heap.get(a)?, heap.get(b)?);
    if let (Some(x), Some(y)) = (Num::of(av), Num::of(bv)) {
        return Ok(match (x, y) {
            (Num::Int(x), Num::Int(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        });
    }
    match (av, bv) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => Err(invalid_binary_op(op.as_symbol(), av.type_name(), bv.type_name())),
    }
}

/// Text of a scalar as absorbed by string concatenation.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Char(c) => c.to_string(),
        Value::Str(s) => s.clone(),
        _ => String::new(),
    }
}

fn format_float(f: f64) -> String {
    format!("{f:?}")
}

/// Printable form of a value, as `print` writes it.
///
/// A container met again inside itself prints as `<cycle>`.
pub fn display(heap: &Heap, id: ValueId) -> EvalResult<String> {
    let mut out = String::new();
    write_value(heap, id, &mut out, &mut FxHashSet::default())?;
    Ok(out)
}

/// Containers and references on the path being printed.
type Printing = FxHashSet<ValueId>;

fn write_value(heap: &Heap, id: ValueId, out: &mut String, path: &mut Printing) -> EvalResult<()> {
    let value = heap.get(id)?;
    let nested = matches!(
        value,
        Value::Vector(_)
            | Value::Map(_)
            | Value::Struct(_)
            | Value::Class(_)
            | Value::Reference(_)
            | Value::Alias(AliasTarget::Value(_))
    );
    if nested && !path.insert(id) {
        out.push_str("<cycle>");
        return Ok(());
    }
    write_contents(heap, value, out, path)?;
    if nested {
        path.remove(&id);
    }
    Ok(())
}

fn write_contents(heap: &Heap, value: &Value, out: &mut String, path: &mut Printing) -> EvalResult<()> {
    match value {
        value @ (Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Char(_) | Value::Str(_)) => {
            out.push_str(&scalar_text(value));
        }
        Value::Binary(bytes) => {
            out.push_str("binary(");
            for (i, byte) in bytes.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{byte:02x}");
            }
            out.push(')');
        }
        Value::Vector(items) => {
            out.push('[');
            write_list(heap, items, out, path)?;
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (k, v)) in map.keys.iter().zip(&map.values).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(heap, *k, out, path)?;
                out.push_str(" => ");
                write_value(heap, *v, out, path)?;
            }
            out.push('}');
        }
        Value::Struct(inst) | Value::Class(inst) => {
            let _ = write!(out, "{} {{", inst.type_name);
            for (i, (name, field)) in inst.fields.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                let _ = write!(out, "{name}: ");
                write_value(heap, *field, out, path)?;
            }
            out.push_str(" }");
        }
        Value::Alias(AliasTarget::Function(index)) => {
            let _ = write!(out, "<alias function #{index}>");
        }
        Value::Alias(AliasTarget::Value(target)) | Value::Reference(target) => {
            write_value(heap, *target, out, path)?;
        }
        Value::Handle(h) => {
            let _ = write!(out, "<handle {h:#x}>");
        }
    }
    Ok(())
}

fn write_list(heap: &Heap, items: &[ValueId], out: &mut String, path: &mut Printing) -> EvalResult<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(heap, *item, out, path)?;
    }
    Ok(())
}

/// Integer conversion used by `toint` and index arithmetic.
///
/// Strings are parsed; `None` means the value has no integer form.
#[allow(clippy::cast_possible_truncation)]
pub fn to_int(heap: &Heap, id: ValueId) -> EvalResult<Option<i64>> {
    let id = heap.resolve(id)?;
    Ok(match heap.get(id)? {
        Value::Str(s) => s.trim().parse().ok(),
        Value::Float(f) => Some(f.trunc() as i64),
        other => match Num::of(other) {
            Some(Num::Int(n)) => Some(n),
            _ => None,
        },
    })
}
