//! Evaluation tests over assembled syntax trees, one file per area.

mod call_tests;
mod control_tests;
mod debug_tests;
mod exception_tests;
mod thread_tests;

use std::sync::Arc;

use hyb_ir::Node;
use hyb_value::EvalResult;

use crate::{buffer_handler, Engine};

/// Engine printing into a buffer.
fn engine() -> Arc<Engine> {
    Engine::builder()
        .print_handler(buffer_handler())
        .build()
        .unwrap()
}

/// Run `root` on `engine`, returning the run result and everything printed.
fn run_on(engine: &Arc<Engine>, root: &Node) -> (EvalResult<Option<String>>, String) {
    let result = engine.run(root);
    (result, engine.print().get_output())
}

/// Run `root` on a fresh engine and return its output. The run must succeed.
fn output(root: &Node) -> String {
    let engine = engine();
    let (result, out) = run_on(&engine, root);
    result.unwrap();
    out
}
