//! Hybris value model and collector.
//!
//! - [`Value`] / [`ValueId`]: tagged runtime values in an arena of
//!   reference-counted slots
//! - [`Heap`]: the arena itself, with deep clone and adopt-on-store
//! - [`Collector`]: threshold-driven sweep, pins, lag list, teardown
//! - [`ops`]: the operator surface (arithmetic, comparison, subscript, member)
//! - [`errors`]: the error taxonomy shared with the evaluator

mod collector;
mod config;
pub mod errors;
mod heap;
pub mod ops;
mod value;

pub use collector::{Collector, Mutator, PinGuard, SweepReport};
pub use config::{
    CollectorConfig, DEFAULT_GC_THRESHOLD, DEFAULT_LAGGING_RATIO, DEFAULT_MM_THRESHOLD,
};
pub use errors::{ErrorClass, EvalError, EvalErrorKind, EvalNote, EvalResult};
pub use heap::{CollectorStats, Heap, MutatorId, PoolList};
pub use value::{AliasTarget, Attributes, Instance, MapValue, TypeTag, Value, ValueId};
