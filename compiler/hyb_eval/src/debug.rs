//! Debugger hook.
//!
//! An attached [`DebugHook`] sees every node before it is evaluated. The
//! hook decides whether to stop; a stop blocks the evaluating thread in
//! [`DebugHook::wait_for_resume`] until the debugger lets it go.

use std::sync::Arc;

use hyb_ir::{Name, Node};
use hyb_value::ops::display;
use hyb_value::{Collector, CollectorStats};

use crate::frame::{Frame, SharedFrame};

/// Whether evaluation continues after a hook trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DebugAction {
    Continue,
    Stop,
}

/// Per-node callback used by an interactive debugger.
pub trait DebugHook: Send + Sync {
    fn trigger(&self, view: &FrameView<'_>, node: &Node) -> DebugAction;

    /// Block until the debugger resumes execution.
    fn wait_for_resume(&self);
}

/// Read-only view of the evaluation state at a hook trigger.
///
/// Reads take the frame and heap locks only while a method runs.
pub struct FrameView<'a> {
    pub(crate) local: Option<&'a Frame>,
    pub(crate) global: &'a SharedFrame,
    pub(crate) collector: &'a Arc<Collector>,
    pub(crate) depth: usize,
}

impl FrameView<'_> {
    /// Script call depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether evaluation is at global scope.
    #[inline]
    pub fn is_global(&self) -> bool {
        self.local.is_none()
    }

    /// Function owning the current frame.
    pub fn function(&self) -> Option<Name> {
        self.local.and_then(|f| f.owner().function.clone())
    }

    /// Bindings of the current scope with their printed values.
    pub fn variables(&self) -> Vec<(Name, String)> {
        match self.local {
            Some(frame) => self.describe(frame),
            None => self.describe(&self.global.lock()),
        }
    }

    /// Printed value of `name`, looked up locally, then globally.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let id = match self.local.and_then(|f| f.get(name)) {
            Some(id) => id,
            None => self.global.lock().get(name)?,
        };
        display(&self.collector.lock(), id).ok()
    }

    pub fn stats(&self) -> CollectorStats {
        self.collector.stats()
    }

    fn describe(&self, frame: &Frame) -> Vec<(Name, String)> {
        let heap = self.collector.lock();
        frame
            .iter()
            .map(|(name, id)| {
                let text = display(&heap, id).unwrap_or_else(|_| "<released>".to_string());
                (name.clone(), text)
            })
            .collect()
    }
}
