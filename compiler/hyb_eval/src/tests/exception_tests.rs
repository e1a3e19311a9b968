//! Tests for `throw`, `try`/`catch` and unhandled exceptions.

use hyb_ir::build::{
    assign, binary, call, compound, function, ident, int, ret, seq, string, throw, try_catch,
};
use hyb_ir::{BinaryOp, Node};
use hyb_value::ErrorClass;

use super::{engine, output, run_on};
use crate::{run_program, ExitStatus};

fn print(args: Vec<Node>) -> Node {
    call("print", args)
}

mod catch_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn thrown_value_is_bound_to_the_catch_variable() {
        let root = try_catch(
            throw(string("boom")),
            "e",
            print(vec![string("caught "), ident("e")]),
        );
        assert_eq!(output(&root), "caught boom");
    }

    #[test]
    fn handler_runs_exactly_once() {
        let engine = engine();
        let root = seq(vec![
            assign("n", int(0)),
            try_catch(
                seq(vec![
                    compound("n", BinaryOp::Add, int(1)),
                    throw(string("x")),
                    compound("n", BinaryOp::Add, int(100)),
                ]),
                "e",
                compound("n", BinaryOp::Add, int(10)),
            ),
        ]);
        let (result, _) = run_on(&engine, &root);
        result.unwrap();
        assert_eq!(engine.display_global("n"), Some("11".to_string()));
    }

    #[test]
    fn handler_is_skipped_without_an_exception() {
        let root = try_catch(
            print(vec![string("body")]),
            "e",
            print(vec![string("handler")]),
        );
        assert_eq!(output(&root), "body");
    }

    #[test]
    fn runtime_errors_are_catchable_with_their_class_name() {
        let root = try_catch(
            binary(BinaryOp::Div, int(1), int(0)),
            "e",
            print(vec![ident("e")]),
        );
        assert_eq!(output(&root), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn regex_against_a_number_is_a_type_error() {
        let root = try_catch(
            binary(BinaryOp::Regex, int(42), string("4")),
            "e",
            print(vec![ident("e")]),
        );
        assert_eq!(
            output(&root),
            "TypeError: operator '~=' cannot be applied to integer and string"
        );
    }

    #[test]
    fn exceptions_unwind_through_calls() {
        let root = seq(vec![
            function(
                "fail",
                &[],
                seq(vec![throw(string("deep")), ret(Some(int(1)))]),
            ),
            function("middle", &[], ret(Some(call("fail", vec![])))),
            try_catch(
                call("middle", vec![]),
                "e",
                print(vec![ident("e")]),
            ),
        ]);
        assert_eq!(output(&root), "deep");
    }

    #[test]
    fn handler_may_rethrow() {
        let root = try_catch(
            try_catch(throw(string("inner")), "e", throw(string("outer"))),
            "e",
            print(vec![ident("e")]),
        );
        assert_eq!(output(&root), "outer");
    }
}

mod unhandled_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uncaught_exception_ends_the_run() {
        let engine = engine();
        let root = seq(vec![throw(string("bye")), print(vec![string("after")])]);
        let (result, out) = run_on(&engine, &root);
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::UnhandledException);
        assert_eq!(err.message, "unhandled exception: bye");
        assert_eq!(out, "");
    }

    #[test]
    fn uncaught_exception_exits_with_status_three() {
        let engine = engine();
        let status = run_program(&engine, &throw(string("bye")));
        assert_eq!(status, ExitStatus::UnhandledException);
        assert_eq!(status.code(), 3);
    }

    #[test]
    fn clean_run_exits_with_success() {
        let engine = engine();
        let status = run_program(&engine, &print(vec![string("ok")]));
        assert_eq!(status, ExitStatus::Success);
        assert_eq!(engine.print().get_output(), "ok");
    }

    #[test]
    fn fatal_errors_are_not_catchable() {
        let engine = engine();
        let root = try_catch(
            call("print", vec![call("array", vec![]), call("missing_arity", vec![])]),
            "e",
            print(vec![string("caught")]),
        );
        let root = seq(vec![function("missing_arity", &["a"], ret(None)), root]);
        let (result, out) = run_on(&engine, &root);
        assert_eq!(result.unwrap_err().class(), ErrorClass::Syntax);
        assert_eq!(out, "");
    }
}
