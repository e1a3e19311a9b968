//! Control signals.
//!
//! Every evaluation step returns a [`Flow`]. Composite nodes check the flow
//! of each child and hand anything other than `Normal` straight back to
//! their caller without further side effects. Loops drain `Break` and
//! `Next`, calls drain `Return`, `try`/`catch` drains `Raised`.

use hyb_value::ValueId;

/// Outcome of evaluating one node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Evaluation completed; `None` is the undefined value.
    Normal(Option<ValueId>),
    Break,
    Next,
    Return(Option<ValueId>),
    /// A script exception carrying its value.
    Raised(ValueId),
}

impl Flow {
    /// The produced value, or the signal that interrupted evaluation.
    #[inline]
    pub fn into_value(self) -> Result<Option<ValueId>, Flow> {
        match self {
            Flow::Normal(v) => Ok(v),
            signal => Err(signal),
        }
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal(_))
    }

    /// The value carried by any flow, if one.
    pub fn payload(&self) -> Option<ValueId> {
        match *self {
            Flow::Normal(v) | Flow::Return(v) => v,
            Flow::Raised(v) => Some(v),
            Flow::Break | Flow::Next => None,
        }
    }
}

/// Unwrap a `Result<T, Flow>`, returning the signal from the enclosing
/// function as `Ok(signal)`.
macro_rules! unwind {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(signal) => return Ok(signal),
        }
    };
}

pub(crate) use unwind;
