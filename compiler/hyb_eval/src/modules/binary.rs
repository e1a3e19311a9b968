//! `std.type.binary`: building byte buffers from script values.

use hyb_value::errors::bad_argument;
use hyb_value::{EvalResult, Heap, Value, ValueId};

use super::Module;
use crate::builtins::CallContext;

pub(super) const MODULE_NAME: &str = "std.type.binary";

pub(super) fn module() -> Module {
    Module::new(MODULE_NAME)
        .with_function("binary", binary)
        .with_function("pack", pack)
}

/// Low byte of a char's code point.
fn char_byte(c: char) -> u8 {
    u32::from(c).to_le_bytes()[0]
}

/// `binary(b1, b2, ...)`: one byte per integer or char argument.
fn binary(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    if args.is_empty() {
        return Err(bad_argument(
            "binary",
            "requires at least 1 parameter (called with 0)",
        ));
    }
    let mut heap = ctx.heap();
    let mut bytes = Vec::with_capacity(args.len());
    for &arg in args {
        let byte = match heap.get(heap.resolve(arg)?)? {
            Value::Int(n) => n.to_le_bytes()[0],
            Value::Char(c) => char_byte(*c),
            other => {
                return Err(bad_argument(
                    "binary",
                    format!("expects int or char bytes, got {}", other.type_name()),
                ))
            }
        };
        bytes.push(byte);
    }
    Ok(Some(heap.alloc(Value::Binary(bytes))?))
}

/// `pack(value, sizes...)`: the first `size` bytes of a simple value, or of
/// each element of a vector or structure, concatenated.
fn pack(ctx: &mut CallContext<'_>, args: &[ValueId]) -> EvalResult<Option<ValueId>> {
    if args.len() < 2 {
        return Err(bad_argument(
            "pack",
            format!("requires at least 2 parameters (called with {})", args.len()),
        ));
    }
    let mut heap = ctx.heap();
    let sizes = args[1..]
        .iter()
        .map(|&size| pack_size(&heap, size))
        .collect::<EvalResult<Vec<usize>>>()?;

    let mut stream = Vec::new();
    let target = heap.resolve(args[0])?;
    match heap.get(target)? {
        Value::Vector(items) => {
            pack_elements(&heap, items, &sizes, "an array", "elements", &mut stream)?;
        }
        Value::Struct(inst) | Value::Class(inst) => {
            let fields: Vec<ValueId> = inst.fields.iter().map(|(_, id)| *id).collect();
            pack_elements(&heap, &fields, &sizes, "a structure", "attributes", &mut stream)?;
        }
        simple => pack_simple(simple, sizes[0], &mut stream)?,
    }
    Ok(Some(heap.alloc(Value::Binary(stream))?))
}

fn pack_size(heap: &Heap, id: ValueId) -> EvalResult<usize> {
    match heap.get(heap.resolve(id)?)? {
        Value::Int(n) => usize::try_from(*n)
            .map_err(|_| bad_argument("pack", format!("invalid byte count {n}"))),
        other => Err(bad_argument(
            "pack",
            format!("byte counts must be int, got {}", other.type_name()),
        )),
    }
}

fn pack_elements(
    heap: &Heap,
    elements: &[ValueId],
    sizes: &[usize],
    what: &str,
    unit: &str,
    stream: &mut Vec<u8>,
) -> EvalResult<()> {
    if elements.len() != sizes.len() {
        return Err(bad_argument(
            "pack",
            format!(
                "not enough parameters to pack {what} of {} {unit} (given {})",
                elements.len(),
                sizes.len()
            ),
        ));
    }
    for (&element, &size) in elements.iter().zip(sizes) {
        let value = heap.get(heap.resolve(element)?)?;
        pack_simple(value, size, stream)?;
    }
    Ok(())
}

fn pack_simple(value: &Value, size: usize, stream: &mut Vec<u8>) -> EvalResult<()> {
    let raw: Vec<u8> = match value {
        Value::Int(n) => n.to_le_bytes().to_vec(),
        Value::Float(f) => f.to_le_bytes().to_vec(),
        Value::Char(c) => vec![char_byte(*c)],
        Value::Str(s) => s.as_bytes().to_vec(),
        Value::Binary(bytes) => bytes.clone(),
        Value::Vector(_) | Value::Map(_) | Value::Struct(_) | Value::Class(_) => {
            return Err(bad_argument(
                "pack",
                "nested structured types are not supported",
            ))
        }
        other => {
            return Err(bad_argument(
                "pack",
                format!("unsupported {} type", other.type_name()),
            ))
        }
    };
    if size > raw.len() {
        return Err(bad_argument(
            "pack",
            format!(
                "could not pack more bytes than the object owns (trying to pack type '{}' of {} bytes to {size} bytes)",
                value.type_name(),
                raw.len()
            ),
        ));
    }
    stream.extend_from_slice(&raw[..size]);
    Ok(())
}
