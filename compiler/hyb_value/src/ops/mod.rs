//! Operator surface over values.
//!
//! Every operator works on a locked [`Heap`](crate::Heap), follows
//! `Reference` indirections on its operands and allocates its result as a
//! fresh temporary. Element reads (`subscript_get`, `dot_get`) return the
//! stored id instead of a copy.

mod access;
mod arith;
mod convert;

pub use access::{
    dot_get, dot_set, element_count, iteration_items, map_insert, map_pairs, new_map, range,
    subscript_add, subscript_get, subscript_set,
};
pub use arith::{binary, unary};
pub use convert::{display, to_int, truthy, values_equal};
