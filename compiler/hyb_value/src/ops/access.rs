//! Subscript, member and range operators, plus iteration helpers.

use super::arith::{byte_of, Num};
use super::convert::{display, map_position};
use crate::errors::{
    index_out_of_bounds, invalid_binary_op, key_not_found, memory_ceiling, not_structured,
    type_mismatch, undefined_member, EvalResult,
};
use crate::heap::Heap;
use crate::value::{MapValue, Value, ValueId};

/// Integer index from a subscript operand.
fn index_of(heap: &Heap, container: &'static str, index: ValueId) -> EvalResult<i64> {
    let value = heap.get(heap.resolve(index)?)?;
    match Num::of(value) {
        Some(Num::Int(n)) => Ok(n),
        _ => Err(invalid_binary_op("[]", container, value.type_name())),
    }
}

/// Bounds-checked position inside a sequence of `len` items.
fn position(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

/// `container[index]`.
///
/// Vector and map reads return the stored element itself. String and binary
/// reads allocate a fresh char. An out-of-range sequence read is an
/// `IndexError` when `bounds_check` is on and undefined (`None`) otherwise.
/// A missing map key is always an `IndexError`.
pub fn subscript_get(
    heap: &mut Heap,
    container: ValueId,
    index: ValueId,
    bounds_check: bool,
) -> EvalResult<Option<ValueId>> {
    let container = heap.resolve(container)?;
    let out_of_range = |i: i64, len: usize| {
        if bounds_check {
            Err(index_out_of_bounds(i, len))
        } else {
            Ok(None)
        }
    };
    match heap.get(container)? {
        Value::Vector(items) => {
            let i = index_of(heap, "array", index)?;
            match position(i, items.len()) {
                Some(pos) => Ok(Some(items[pos])),
                None => out_of_range(i, items.len()),
            }
        }
        Value::Map(map) => match map_position(heap, &map.keys, index)? {
            Some(pos) => Ok(Some(map.values[pos])),
            None => Err(key_not_found(&display(heap, index)?)),
        },
        Value::Str(s) => {
            let i = index_of(heap, "string", index)?;
            let len = s.chars().count();
            match position(i, len).and_then(|pos| s.chars().nth(pos)) {
                Some(c) => heap.alloc(Value::Char(c)).map(Some),
                None => out_of_range(i, len),
            }
        }
        Value::Binary(bytes) => {
            let i = index_of(heap, "binary", index)?;
            match position(i, bytes.len()) {
                Some(pos) => {
                    let c = char::from(bytes[pos]);
                    heap.alloc(Value::Char(c)).map(Some)
                }
                None => out_of_range(i, bytes.len()),
            }
        }
        other => {
            let index_type = heap.get(index)?.type_name();
            Err(invalid_binary_op("[]", other.type_name(), index_type))
        }
    }
}

/// `container[index] = value`. Writes never extend a sequence; maps gain
/// the key when it is missing.
pub fn subscript_set(
    heap: &mut Heap,
    container: ValueId,
    index: ValueId,
    value: ValueId,
) -> EvalResult<()> {
    let container = heap.resolve(container)?;
    match heap.get(container)? {
        Value::Vector(items) => {
            let len = items.len();
            let i = index_of(heap, "array", index)?;
            let pos = position(i, len).ok_or_else(|| index_out_of_bounds(i, len))?;
            let stored = heap.adopt(value)?;
            let old = match heap.get_mut(container)? {
                Value::Vector(items) => std::mem::replace(&mut items[pos], stored),
                _ => stored,
            };
            if old != stored {
                heap.decref(old);
            }
            Ok(())
        }
        Value::Map(_) => map_insert(heap, container, index, value),
        Value::Str(s) => {
            let len = s.chars().count();
            let i = index_of(heap, "string", index)?;
            let pos = position(i, len).ok_or_else(|| index_out_of_bounds(i, len))?;
            let replacement = match heap.get(heap.resolve(value)?)? {
                Value::Char(c) => *c,
                Value::Str(r) if r.chars().count() == 1 => r.chars().next().unwrap_or(' '),
                other => return Err(type_mismatch("char", other.type_name())),
            };
            if let Value::Str(s) = heap.get_mut(container)? {
                *s = s
                    .chars()
                    .enumerate()
                    .map(|(n, c)| if n == pos { replacement } else { c })
                    .collect();
            }
            heap.refresh_size(container)
        }
        Value::Binary(bytes) => {
            let len = bytes.len();
            let i = index_of(heap, "binary", index)?;
            let pos = position(i, len).ok_or_else(|| index_out_of_bounds(i, len))?;
            let byte = byte_value(heap, value)?;
            if let Value::Binary(bytes) = heap.get_mut(container)? {
                bytes[pos] = byte;
            }
            Ok(())
        }
        other => {
            let index_type = heap.get(index)?.type_name();
            Err(invalid_binary_op("[]=", other.type_name(), index_type))
        }
    }
}

fn byte_value(heap: &Heap, value: ValueId) -> EvalResult<u8> {
    let v = heap.get(heap.resolve(value)?)?;
    match v {
        Value::Int(_) | Value::Char(_) | Value::Bool(_) => Ok(byte_of(v)),
        other => Err(type_mismatch("integer", other.type_name())),
    }
}

/// `container[] = value`: append to a vector or binary.
pub fn subscript_add(heap: &mut Heap, container: ValueId, value: ValueId) -> EvalResult<()> {
    let container = heap.resolve(container)?;
    match heap.get(container)? {
        Value::Vector(_) => {
            let stored = heap.adopt(value)?;
            if let Value::Vector(items) = heap.get_mut(container)? {
                items.push(stored);
            }
        }
        Value::Binary(_) => {
            let byte = byte_value(heap, value)?;
            if let Value::Binary(bytes) = heap.get_mut(container)? {
                bytes.push(byte);
            }
        }
        other => {
            let value_type = heap.get(value)?.type_name();
            return Err(invalid_binary_op("[]=", other.type_name(), value_type));
        }
    }
    heap.refresh_size(container)
}

/// Insert or replace `key => value` in a map. Keys stay unique.
pub fn map_insert(heap: &mut Heap, map: ValueId, key: ValueId, value: ValueId) -> EvalResult<()> {
    let map = heap.resolve(map)?;
    let existing = match heap.get(map)? {
        Value::Map(m) => map_position(heap, &m.keys, key)?,
        other => return Err(type_mismatch("map", other.type_name())),
    };
    let stored = heap.adopt(value)?;
    match existing {
        Some(pos) => {
            let old = match heap.get_mut(map)? {
                Value::Map(m) => std::mem::replace(&mut m.values[pos], stored),
                _ => stored,
            };
            if old != stored {
                heap.decref(old);
            }
        }
        None => {
            let stored_key = heap.adopt(key)?;
            if let Value::Map(m) = heap.get_mut(map)? {
                m.keys.push(stored_key);
                m.values.push(stored);
            }
        }
    }
    heap.refresh_size(map)
}

/// Allocate an empty map.
pub fn new_map(heap: &mut Heap) -> EvalResult<ValueId> {
    heap.alloc(Value::Map(MapValue::default()))
}

/// `from .. to`, inclusive, ascending or descending. Integer and char
/// bounds are supported.
///
/// A range that could not fit under the memory ceiling fails before any
/// element is allocated.
pub fn range(heap: &mut Heap, from: ValueId, to: ValueId) -> EvalResult<ValueId> {
    let (a, b) = (heap.get(heap.resolve(from)?)?, heap.get(heap.resolve(to)?)?);
    let (start, end, chars) = match (a, b) {
        (Value::Int(x), Value::Int(y)) => (*x, *y, false),
        (Value::Char(x), Value::Char(y)) => {
            (i64::from(u32::from(*x)), i64::from(u32::from(*y)), true)
        }
        _ => return Err(invalid_binary_op("..", a.type_name(), b.type_name())),
    };

    let per_item = std::mem::size_of::<Value>() + std::mem::size_of::<ValueId>();
    let count = usize::try_from(start.abs_diff(end))
        .ok()
        .and_then(|span| span.checked_add(1));
    let requested = count.and_then(|n| n.checked_mul(per_item));
    let limit = heap.config.mm_threshold;
    let count = match (count, requested) {
        (Some(count), Some(bytes)) if heap.usage.saturating_add(bytes) <= limit => count,
        (_, bytes) => {
            return Err(memory_ceiling(heap.usage, bytes.unwrap_or(usize::MAX), limit));
        }
    };

    let values = inclusive(start, end).filter_map(|n| {
        if chars {
            u32::try_from(n).ok().and_then(char::from_u32).map(Value::Char)
        } else {
            Some(Value::Int(n))
        }
    });
    let mut items = Vec::with_capacity(count);
    for value in values {
        match heap.alloc(value) {
            Ok(id) => {
                heap.incref(id);
                items.push(id);
            }
            Err(err) => {
                for id in items {
                    heap.decref(id);
                }
                return Err(err);
            }
        }
    }
    heap.alloc(Value::Vector(items))
}

fn inclusive(from: i64, to: i64) -> Box<dyn Iterator<Item = i64>> {
    if from <= to {
        Box::new(from..=to)
    } else {
        Box::new((to..=from).rev())
    }
}

/// `object.member` read.
pub fn dot_get(heap: &Heap, object: ValueId, member: &str) -> EvalResult<ValueId> {
    let object = heap.resolve(object)?;
    match heap.get(object)? {
        Value::Struct(inst) | Value::Class(inst) => inst
            .field(member)
            .ok_or_else(|| undefined_member(member, inst.type_name.as_str())),
        other => Err(not_structured(other.type_name())),
    }
}

/// `object.member = value`.
pub fn dot_set(heap: &mut Heap, object: ValueId, member: &str, value: ValueId) -> EvalResult<()> {
    let object = heap.resolve(object)?;
    match heap.get(object)? {
        Value::Struct(inst) | Value::Class(inst) => {
            if inst.field(member).is_none() {
                return Err(undefined_member(member, inst.type_name.as_str()));
            }
        }
        other => return Err(not_structured(other.type_name())),
    }
    let stored = heap.adopt(value)?;
    let old = match heap.get_mut(object)? {
        Value::Struct(inst) | Value::Class(inst) => inst
            .field_slot(member)
            .map(|slot| std::mem::replace(slot, stored)),
        _ => None,
    };
    if let Some(old) = old {
        if old != stored {
            heap.decref(old);
        }
    }
    Ok(())
}

/// Number of elements in a container (`elements` builtin).
pub fn element_count(heap: &Heap, id: ValueId) -> EvalResult<usize> {
    let id = heap.resolve(id)?;
    Ok(match heap.get(id)? {
        Value::Vector(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::Str(s) => s.chars().count(),
        Value::Binary(b) => b.len(),
        Value::Struct(inst) | Value::Class(inst) => inst.fields.len(),
        other => return Err(type_mismatch("container", other.type_name())),
    })
}

/// Items `foreach` visits, in order: vector elements, map values, string
/// chars, binary bytes. Chars are freshly allocated temporaries.
pub fn iteration_items(heap: &mut Heap, id: ValueId) -> EvalResult<Vec<ValueId>> {
    let id = heap.resolve(id)?;
    let chars: Vec<char> = match heap.get(id)? {
        Value::Vector(items) => return Ok(items.clone()),
        Value::Map(map) => return Ok(map.values.clone()),
        Value::Str(s) => s.chars().collect(),
        Value::Binary(b) => b.iter().map(|&byte| char::from(byte)).collect(),
        other => return Err(type_mismatch("iterable", other.type_name())),
    };
    chars
        .into_iter()
        .map(|c| heap.alloc(Value::Char(c)))
        .collect()
}

/// Key/value pairs `foreachm` visits, in insertion order.
pub fn map_pairs(heap: &Heap, id: ValueId) -> EvalResult<Vec<(ValueId, ValueId)>> {
    let id = heap.resolve(id)?;
    match heap.get(id)? {
        Value::Map(map) => Ok(map.keys.iter().copied().zip(map.values.iter().copied()).collect()),
        other => Err(type_mismatch("map", other.type_name())),
    }
}
