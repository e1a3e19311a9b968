//! Memory frames.
//!
//! A [`Frame`] maps identifiers to values in insertion order. Assignment
//! has value semantics: storing a value that already has a holder (or is a
//! constant) stores a deep copy, so two bindings never share a slot.
//!
//! Frames never free memory. Dropping a binding only decrements its value's
//! count; the collector reclaims it.
//!
//! Lock order: a frame lock (for the shared global frame) is always taken
//! before the heap lock, never after.

use std::sync::Arc;

use bitflags::bitflags;
use hyb_ir::Name;
use hyb_value::errors::unhandled_exception;
use hyb_value::ops::display;
use hyb_value::{EvalResult, Heap, Value, ValueId};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use crate::flow::Flow;

bitflags! {
    /// Signals recorded on a frame that could not drain them.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct ControlFlags: u8 {
        const BREAK = 1;
        const NEXT = 1 << 1;
        const RETURN = 1 << 2;
        const EXCEPTION = 1 << 3;
    }
}

/// Control state of a frame.
///
/// Only filled at a root boundary (program or thread) where a signal has
/// nowhere left to go.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    pub flags: ControlFlags,
    pub return_value: Option<ValueId>,
    pub exception: Option<ValueId>,
}

impl ControlState {
    /// Record the signal carried by `flow`. `Normal` records nothing.
    pub fn record(&mut self, flow: Flow) {
        match flow {
            Flow::Normal(_) => {}
            Flow::Break => self.flags.insert(ControlFlags::BREAK),
            Flow::Next => self.flags.insert(ControlFlags::NEXT),
            Flow::Return(v) => {
                self.flags.insert(ControlFlags::RETURN);
                self.return_value = v;
            }
            Flow::Raised(v) => {
                self.flags.insert(ControlFlags::EXCEPTION);
                self.exception = Some(v);
            }
        }
    }

    pub fn clear(&mut self) {
        *self = ControlState::default();
    }

    #[inline]
    pub fn has_exception(&self) -> bool {
        self.flags.contains(ControlFlags::EXCEPTION)
    }
}

/// Function (and type, for methods) a frame was created for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameOwner {
    pub function: Option<Name>,
    pub type_name: Option<Name>,
}

impl FrameOwner {
    pub fn function(name: Name) -> Self {
        FrameOwner {
            function: Some(name),
            type_name: None,
        }
    }

    pub fn method(name: Name, type_name: Name) -> Self {
        FrameOwner {
            function: Some(name),
            type_name: Some(type_name),
        }
    }
}

/// The global frame, shared by every evaluating thread.
pub type SharedFrame = Arc<Mutex<Frame>>;

/// Ordered identifier bindings plus control state.
#[derive(Debug, Default)]
pub struct Frame {
    bindings: IndexMap<Name, ValueId, FxBuildHasher>,
    owner: FrameOwner,
    pub state: ControlState,
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    pub fn with_owner(owner: FrameOwner) -> Self {
        Frame {
            owner,
            ..Frame::default()
        }
    }

    #[inline]
    pub fn owner(&self) -> &FrameOwner {
        &self.owner
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<ValueId> {
        self.bindings.get(name).copied()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, ValueId)> {
        self.bindings.iter().map(|(name, &id)| (name, id))
    }

    /// Bind `name` to `value` with value semantics.
    ///
    /// The stored value is `value` itself when nothing holds it yet and a
    /// deep copy otherwise. A previous binding is decremented. When the
    /// previous binding is a reference, the referenced slot is overwritten
    /// instead and the binding itself is kept, unless that slot is a
    /// constant: then the name is rebound.
    ///
    /// Returns the id now reachable through `name`.
    pub fn add(&mut self, heap: &mut Heap, name: Name, value: ValueId) -> EvalResult<ValueId> {
        if let Some(&old) = self.bindings.get(&name) {
            if old == value {
                return Ok(old);
            }
            let incoming_is_reference = matches!(heap.get(value)?, Value::Reference(_));
            if let (Value::Reference(target), false) = (heap.get(old)?, incoming_is_reference) {
                let target = *target;
                if !heap.is_constant(target) {
                    heap.overwrite(target, value)?;
                    return Ok(target);
                }
            }
        }
        let stored = heap.adopt(value)?;
        if let Some(old) = self.bindings.insert(name, stored) {
            heap.decref(old);
        }
        Ok(stored)
    }

    /// Bind `name` to `value` by identity, without copying.
    pub fn insert(&mut self, heap: &mut Heap, name: Name, value: ValueId) {
        heap.incref(value);
        if let Some(old) = self.bindings.insert(name, value) {
            heap.decref(old);
        }
    }

    /// Append `value` under a synthesized positional label.
    pub fn push(&mut self, heap: &mut Heap, value: ValueId) -> EvalResult<ValueId> {
        let label = Name::anonymous(self.bindings.len());
        self.add(heap, label, value)
    }

    /// Record an exception nobody caught. The frame holds the value until
    /// it is released.
    pub fn raise(&mut self, heap: &mut Heap, exception: ValueId) {
        heap.incref(exception);
        if let Some(old) = self.state.exception.take() {
            heap.decref(old);
        }
        self.state.record(Flow::Raised(exception));
    }

    /// Independent copy of every binding and of the control state.
    pub fn clone_frame(&self, heap: &mut Heap) -> EvalResult<Frame> {
        let mut bindings = IndexMap::with_capacity_and_hasher(self.bindings.len(), FxBuildHasher);
        for (name, &id) in &self.bindings {
            let copy = heap.deep_clone(id)?;
            heap.incref(copy);
            bindings.insert(name.clone(), copy);
        }
        if let Some(exception) = self.state.exception {
            heap.incref(exception);
        }
        Ok(Frame {
            bindings,
            owner: self.owner.clone(),
            state: self.state,
        })
    }

    /// Drop every binding.
    ///
    /// A frame still carrying an exception nobody caught is fatal: the
    /// error names the exception value.
    pub fn release(&mut self, heap: &mut Heap) -> EvalResult<()> {
        let pending = match self.state.exception {
            Some(v) if self.state.has_exception() => {
                let text = display(heap, v)?;
                heap.decref(v);
                Some(text)
            }
            _ => None,
        };
        for (_, id) in self.bindings.drain(..) {
            heap.decref(id);
        }
        self.state.clear();
        match pending {
            Some(text) => Err(unhandled_exception(text)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
