//! Tests for `pthread_create`, `pthread_join` and thread teardown.

use hyb_ir::build::{
    assign, binary, call, compound, expr, foreach, function, ident, int, ret, seq, string,
    subscript_add, throw, try_catch,
};
use hyb_ir::{BinaryOp, ExprOp, Node};
use hyb_value::ErrorClass;
use pretty_assertions::assert_eq;

use super::{engine, output, run_on};
use crate::{run_program, ExitStatus};

fn worker() -> Node {
    function(
        "worker",
        &["n"],
        ret(Some(binary(BinaryOp::Mul, ident("n"), int(2)))),
    )
}

fn spawn(args: Vec<Node>) -> Node {
    call("pthread_create", args)
}

fn join(handle: Node) -> Node {
    call("pthread_join", vec![handle])
}

#[test]
fn joined_thread_returns_its_result() {
    let engine = engine();
    let root = seq(vec![
        worker(),
        assign("h", spawn(vec![string("worker"), int(21)])),
        assign("r", join(ident("h"))),
    ]);
    let (result, _) = run_on(&engine, &root);
    assert_eq!(result.unwrap(), Some("42".to_string()));
    assert_eq!(engine.running_threads(), 0);
}

#[test]
fn thread_function_may_be_given_as_an_alias() {
    let root = seq(vec![
        worker(),
        call("print", vec![join(spawn(vec![ident("worker"), int(5)]))]),
    ]);
    assert_eq!(output(&root), "10");
}

#[test]
fn threads_run_independently() {
    let engine = engine();
    let range = expr(ExprOp::Range, vec![int(1), int(4)]);
    let root = seq(vec![
        worker(),
        assign("handles", call("array", vec![])),
        foreach(
            "i",
            range,
            subscript_add("handles", spawn(vec![string("worker"), ident("i")])),
        ),
        assign("total", int(0)),
        foreach(
            "h",
            ident("handles"),
            compound("total", BinaryOp::Add, join(ident("h"))),
        ),
    ]);
    let (result, _) = run_on(&engine, &root);
    result.unwrap();
    assert_eq!(engine.display_global("total"), Some("20".to_string()));
}

#[test]
fn thread_output_goes_to_the_engine_handler() {
    let root = seq(vec![
        function("shout", &["word"], call("print", vec![ident("word")])),
        join(spawn(vec![string("shout"), string("hey")])),
    ]);
    assert_eq!(output(&root), "hey");
}

#[test]
fn thread_without_return_joins_to_undefined() {
    let engine = engine();
    let root = seq(vec![
        function("idle", &[], int(1)),
        join(spawn(vec![string("idle")])),
    ]);
    let (result, _) = run_on(&engine, &root);
    assert_eq!(result.unwrap(), None);
}

#[test]
fn exception_in_a_thread_is_raised_by_join() {
    let root = seq(vec![
        function("fail", &[], throw(string("bad"))),
        assign("h", spawn(vec![string("fail")])),
        try_catch(join(ident("h")), "e", call("print", vec![ident("e")])),
    ]);
    assert_eq!(output(&root), "bad");
}

#[test]
fn only_scalars_cross_into_a_thread() {
    let engine = engine();
    let root = seq(vec![
        worker(),
        spawn(vec![string("worker"), call("array", vec![int(1)])]),
    ]);
    let (result, _) = run_on(&engine, &root);
    let err = result.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Syntax);
    assert!(err.message.contains("type not supported for pthread call"), "{err}");
}

#[test]
fn thread_arity_is_checked_before_spawning() {
    let engine = engine();
    let root = seq(vec![worker(), spawn(vec![string("worker")])]);
    let (result, _) = run_on(&engine, &root);
    assert_eq!(result.unwrap_err().class(), ErrorClass::Syntax);
    assert_eq!(engine.running_threads(), 0);
}

#[test]
fn joining_twice_is_rejected() {
    let engine = engine();
    let root = seq(vec![
        worker(),
        assign("h", spawn(vec![string("worker"), int(1)])),
        join(ident("h")),
        join(ident("h")),
    ]);
    let (result, _) = run_on(&engine, &root);
    let err = result.unwrap_err();
    assert!(err.message.contains("no joinable thread"), "{err}");
}

#[test]
fn shutdown_waits_for_unjoined_threads() {
    let engine = engine();
    let root = seq(vec![
        function("fail", &[], throw(string("ignored"))),
        worker(),
        spawn(vec![string("worker"), int(3)]),
        spawn(vec![string("fail")]),
    ]);
    let (result, _) = run_on(&engine, &root);
    result.unwrap();
    engine.shutdown().unwrap();
    assert_eq!(engine.running_threads(), 0);
}

#[test]
fn pthread_exit_ends_the_thread_without_a_result() {
    let engine = engine();
    let root = seq(vec![
        function(
            "early",
            &["n"],
            seq(vec![
                call("print", vec![string("before ")]),
                try_catch(
                    call("pthread_exit", vec![]),
                    "e",
                    call("print", vec![string("caught ")]),
                ),
                call("print", vec![string("after ")]),
                ret(Some(ident("n"))),
            ]),
        ),
        join(spawn(vec![string("early"), int(1)])),
    ]);
    let (result, out) = run_on(&engine, &root);
    assert_eq!(result.unwrap(), None);
    assert_eq!(out, "before ");
    assert_eq!(engine.running_threads(), 0);
}

#[test]
fn pthread_exit_on_the_main_thread_ends_the_run_successfully() {
    let engine = engine();
    let root = seq(vec![
        call("print", vec![string("start")]),
        call("pthread_exit", vec![]),
        call("print", vec![string("unreached")]),
    ]);
    assert_eq!(run_program(&engine, &root), ExitStatus::Success);
    assert_eq!(engine.print().get_output(), "start");
}
