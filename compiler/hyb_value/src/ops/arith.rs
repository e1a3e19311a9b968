//! Binary and unary operators.
//!
//! Numeric promotion runs char → int → float; booleans count as integers.
//! Integer `+ - * !` wrap on overflow.

use std::cmp::Ordering;

use hyb_ir::{BinaryOp, UnaryOp};
use regex::Regex;

use super::convert::{compare, scalar_text, truthy, values_equal};
use crate::errors::{
    division_by_zero, invalid_binary_op, invalid_pattern, invalid_unary_op, modulo_by_zero,
    EvalResult,
};
use crate::heap::Heap;
use crate::value::{Value, ValueId};

/// Numeric view of a scalar.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Char(c) => Some(Num::Int(i64::from(u32::from(*c)))),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

/// Apply a binary operator, allocating the result.
pub fn binary(heap: &mut Heap, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> EvalResult<ValueId> {
    let l = heap.resolve(lhs)?;
    let r = heap.resolve(rhs)?;

    let result = match op {
        BinaryOp::And => Value::Bool(truthy(heap, l)? && truthy(heap, r)?),
        BinaryOp::Or => Value::Bool(truthy(heap, l)? || truthy(heap, r)?),
        BinaryOp::Eq => Value::Bool(values_equal(heap, l, r)?),
        BinaryOp::NotEq => Value::Bool(!values_equal(heap, l, r)?),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(heap, op, l, r)?;
            Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        BinaryOp::Add => return add(heap, l, r),
        BinaryOp::Regex => Value::Bool(regex_match(heap, l, r)?),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (lv, rv) = (heap.get(l)?, heap.get(r)?);
            match (Num::of(lv), Num::of(rv)) {
                (Some(a), Some(b)) => numeric(op, a, b)?,
                _ => return Err(invalid_binary_op(op.as_symbol(), lv.type_name(), rv.type_name())),
            }
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            let (lv, rv) = (heap.get(l)?, heap.get(r)?);
            match (Num::of(lv), Num::of(rv)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Value::Int(bitwise(op, a, b)),
                _ => return Err(invalid_binary_op(op.as_symbol(), lv.type_name(), rv.type_name())),
            }
        }
    };
    heap.alloc(result)
}

/// `text ~= pattern`. Both operands must be strings.
fn regex_match(heap: &Heap, l: ValueId, r: ValueId) -> EvalResult<bool> {
    let (lv, rv) = (heap.get(l)?, heap.get(r)?);
    let (Value::Str(text), Value::Str(pattern)) = (lv, rv) else {
        return Err(invalid_binary_op("~=", lv.type_name(), rv.type_name()));
    };
    let compiled = Regex::new(pattern).map_err(|e| invalid_pattern(pattern, e.to_string()))?;
    Ok(compiled.is_match(text))
}

/// `+` is overloaded beyond arithmetic: strings absorb scalars, vectors
/// append, binaries concatenate.
fn add(heap: &mut Heap, l: ValueId, r: ValueId) -> EvalResult<ValueId> {
    let (lv, rv) = (heap.get(l)?, heap.get(r)?);
    match (lv, rv) {
        (Value::Str(a), other) if other.is_scalar() => {
            let text = format!("{a}{}", scalar_text(other));
            heap.alloc(Value::Str(text))
        }
        (Value::Vector(_), _) => {
            let copy = heap.deep_clone(l)?;
            let item = heap.adopt(r)?;
            if let Value::Vector(items) = heap.get_mut(copy)? {
                items.push(item);
            }
            heap.refresh_size(copy)?;
            Ok(copy)
        }
        (Value::Binary(a), Value::Binary(b)) => {
            let mut bytes = a.clone();
            bytes.extend_from_slice(b);
            heap.alloc(Value::Binary(bytes))
        }
        (Value::Binary(a), Value::Int(_) | Value::Char(_)) => {
            let mut bytes = a.clone();
            bytes.push(byte_of(rv));
            heap.alloc(Value::Binary(bytes))
        }
        _ => match (Num::of(lv), Num::of(rv)) {
            (Some(a), Some(b)) => {
                let value = numeric(BinaryOp::Add, a, b)?;
                heap.alloc(value)
            }
            _ => Err(invalid_binary_op("+", lv.type_name(), rv.type_name())),
        },
    }
}

/// Low byte of an integer-like scalar.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn byte_of(value: &Value) -> u8 {
    match value {
        Value::Int(n) => *n as u8,
        Value::Char(c) => u32::from(*c) as u8,
        Value::Bool(b) => u8::from(*b),
        _ => 0,
    }
}

fn numeric(op: BinaryOp, a: Num, b: Num) -> EvalResult<Value> {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        return Ok(Value::Int(match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div if y == 0 => return Err(division_by_zero()),
            BinaryOp::Div => x.wrapping_div(y),
            BinaryOp::Mod if y == 0 => return Err(modulo_by_zero()),
            BinaryOp::Mod => x.wrapping_rem(y),
            _ => return Err(invalid_binary_op(op.as_symbol(), "integer", "integer")),
        }));
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    Ok(Value::Float(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        _ => return Err(invalid_binary_op(op.as_symbol(), "float", "float")),
    }))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bitwise(op: BinaryOp, a: i64, b: i64) -> i64 {
    match op {
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Shl => a.wrapping_shl((b & 63) as u32),
        _ => a.wrapping_shr((b & 63) as u32),
    }
}

/// Apply a unary operator, allocating the result.
pub fn unary(heap: &mut Heap, op: UnaryOp, operand: ValueId) -> EvalResult<ValueId> {
    let id = heap.resolve(operand)?;
    let result = match op {
        UnaryOp::Not => Value::Bool(!truthy(heap, id)?),
        UnaryOp::Neg => match Num::of(heap.get(id)?) {
            Some(Num::Int(n)) => Value::Int(n.wrapping_neg()),
            Some(Num::Float(f)) => Value::Float(-f),
            None => return Err(invalid_unary_op("-", heap.get(id)?.type_name())),
        },
        UnaryOp::BitNot => match Num::of(heap.get(id)?) {
            Some(Num::Int(n)) => Value::Int(!n),
            _ => return Err(invalid_unary_op("~", heap.get(id)?.type_name())),
        },
        UnaryOp::Factorial => match Num::of(heap.get(id)?) {
            Some(Num::Int(n)) if n < 0 => return Err(invalid_unary_op("!", "negative integer")),
            Some(Num::Int(n)) => Value::Int(factorial(n)),
            _ => return Err(invalid_unary_op("!", heap.get(id)?.type_name())),
        },
    };
    heap.alloc(result)
}

/// Wrapping factorial. From 66! on, the product carries 64 factors of two
/// and wraps to zero.
fn factorial(n: i64) -> i64 {
    if n >= 66 {
        return 0;
    }
    (2..=n).fold(1i64, i64::wrapping_mul)
}
