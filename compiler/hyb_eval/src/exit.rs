//! Process exit status of a script run.

use std::sync::Arc;

use hyb_ir::Node;
use hyb_value::{ErrorClass, EvalError};
use tracing::error;

use crate::engine::Engine;

/// Exit codes reported to the host process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Internal = 1,
    Syntax = 2,
    UnhandledException = 3,
    /// Memory ceiling reached or the arena exhausted.
    OutOfMemory = 4,
    Recursion = 5,
}

impl ExitStatus {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Status for an error that ended the run. Catchable classes only get
    /// here by escaping every handler.
    pub fn from_error(err: &EvalError) -> Self {
        match err.class() {
            ErrorClass::Syntax => ExitStatus::Syntax,
            ErrorClass::OutOfMemory | ErrorClass::MemoryCeiling => ExitStatus::OutOfMemory,
            ErrorClass::Recursion => ExitStatus::Recursion,
            ErrorClass::Internal => ExitStatus::Internal,
            ErrorClass::ThreadExit => ExitStatus::Success,
            ErrorClass::UnhandledException
            | ErrorClass::UndeclaredIdentifier
            | ErrorClass::Type
            | ErrorClass::Index
            | ErrorClass::Attribute
            | ErrorClass::ZeroDivision
            | ErrorClass::Thrown => ExitStatus::UnhandledException,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

/// Run `root` to completion and shut the engine down.
///
/// The first error (from the run, else from shutdown) decides the status
/// and is logged.
pub fn run_program(engine: &Arc<Engine>, root: &Node) -> ExitStatus {
    crate::init_tracing();
    let run = engine.run(root).map(|_| ());
    let shutdown = engine.shutdown();
    match run.and(shutdown) {
        Ok(()) => ExitStatus::Success,
        // `pthread_exit` on the main thread: the run ends once the other
        // threads were joined by shutdown.
        Err(err) if err.class() == ErrorClass::ThreadExit => ExitStatus::Success,
        Err(err) => {
            let status = ExitStatus::from_error(&err);
            error!(
                source = %engine.source().file,
                status = status.code(),
                error = %err,
                "script failed"
            );
            status
        }
    }
}
