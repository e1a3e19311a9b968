//! Tests for function declarations, calls and aliases.

use hyb_ir::build::{
    alias_call, assign, binary, call, expr, function, ident, if_else, int, ret, seq, string,
    subscript_set,
};
use hyb_ir::{BinaryOp, ExprOp, Node};
use hyb_value::ErrorClass;

use super::{engine, output, run_on};
use crate::{buffer_handler, Engine};

fn double() -> Node {
    function(
        "double",
        &["n"],
        ret(Some(binary(BinaryOp::Mul, ident("n"), int(2)))),
    )
}

mod declaration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn functions_are_callable_before_their_declaration() {
        let engine = engine();
        let root = seq(vec![assign("x", call("double", vec![int(21)])), double()]);
        let (result, _) = run_on(&engine, &root);
        result.unwrap();
        assert_eq!(engine.display_global("x"), Some("42".to_string()));
    }

    #[test]
    fn duplicate_declaration_fails_before_any_statement_runs() {
        let engine = engine();
        let root = seq(vec![
            call("print", vec![string("started")]),
            function("f", &[], ret(Some(int(1)))),
            function("f", &[], ret(Some(int(2)))),
        ]);
        let (result, out) = run_on(&engine, &root);
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Syntax);
        assert!(err.message.contains("'f' already defined"), "{err}");
        assert_eq!(out, "");
    }

    #[test]
    fn declaring_a_builtin_name_is_rejected() {
        let engine = engine();
        let root = function("print", &["x"], ret(None));
        let (result, _) = run_on(&engine, &root);
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Syntax);
        assert!(err.message.contains("language builtin"), "{err}");
    }

    #[test]
    fn declaration_inside_a_function_is_hoisted_once() {
        let root = seq(vec![
            function(
                "outer",
                &[],
                seq(vec![
                    function("inner", &[], ret(Some(string("in")))),
                    ret(Some(call("inner", vec![]))),
                ]),
            ),
            call("print", vec![call("outer", vec![])]),
            call("print", vec![call("outer", vec![])]),
        ]);
        assert_eq!(output(&root), "inin");
    }
}

mod call_semantics_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arguments_are_passed_by_value() {
        let engine = engine();
        let root = seq(vec![
            function(
                "clobber",
                &["a"],
                subscript_set("a", int(0), int(99)),
            ),
            assign("v", call("array", vec![int(1), int(2)])),
            call("clobber", vec![ident("v")]),
        ]);
        let (result, _) = run_on(&engine, &root);
        result.unwrap();
        assert_eq!(engine.display_global("v"), Some("[1, 2]".to_string()));
    }

    #[test]
    fn function_without_return_is_undefined() {
        let engine = engine();
        let root = seq(vec![
            function("noop", &[], int(5)),
            call("noop", vec![]),
        ]);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn locals_do_not_leak_into_globals() {
        let engine = engine();
        let root = seq(vec![
            function("f", &[], assign("local", int(1))),
            call("f", vec![]),
        ]);
        let (result, _) = run_on(&engine, &root);
        result.unwrap();
        assert_eq!(engine.global_value("local"), None);
    }

    #[test]
    fn functions_read_globals() {
        let root = seq(vec![
            function("show", &[], call("print", vec![ident("g")])),
            assign("g", string("global")),
            call("show", vec![]),
        ]);
        assert_eq!(output(&root), "global");
    }

    #[test]
    fn arity_mismatch_is_fatal() {
        let engine = engine();
        let root = seq(vec![double(), call("double", vec![int(1), int(2)])]);
        let (result, _) = run_on(&engine, &root);
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Syntax);
        assert_eq!(
            err.message,
            "function 'double' requires 1 parameter (called with 2)"
        );
    }

    #[test]
    fn unknown_function_is_undeclared() {
        let engine = engine();
        let root = call("missing", vec![]);
        let (result, _) = run_on(&engine, &root);
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::UnhandledException);
        assert!(err.message.contains("'missing' undeclared identifier"), "{err}");
    }

    #[test]
    fn recursion() {
        let fact = function(
            "fact",
            &["n"],
            if_else(
                binary(BinaryOp::LtEq, ident("n"), int(1)),
                ret(Some(int(1))),
                Some(ret(Some(binary(
                    BinaryOp::Mul,
                    ident("n"),
                    call("fact", vec![binary(BinaryOp::Sub, ident("n"), int(1))]),
                )))),
            ),
        );
        let root = seq(vec![fact, call("print", vec![call("fact", vec![int(10)])])]);
        assert_eq!(output(&root), "3628800");
    }

    #[test]
    fn runaway_recursion_hits_the_depth_limit() {
        let engine = Engine::builder()
            .print_handler(buffer_handler())
            .max_depth(64)
            .build()
            .unwrap();
        let root = seq(vec![
            function("down", &["n"], ret(Some(call("down", vec![ident("n")])))),
            call("down", vec![int(0)]),
        ]);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap_err().class(), ErrorClass::Recursion);
    }
}

mod alias_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn function_name_evaluates_to_a_callable_alias() {
        let engine = engine();
        let root = seq(vec![
            double(),
            assign("f", ident("double")),
            alias_call(ident("f"), vec![int(4)]),
        ]);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), Some("8".to_string()));
    }

    #[test]
    fn address_of_a_function_is_its_alias() {
        let engine = engine();
        let root = seq(vec![
            double(),
            alias_call(expr(ExprOp::AddressOf, vec![ident("double")]), vec![int(5)]),
        ]);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), Some("10".to_string()));
    }

    #[test]
    fn writing_through_a_literal_reference_leaves_the_literal_alone() {
        let root = seq(vec![
            assign("r", expr(ExprOp::AddressOf, vec![int(5)])),
            assign("r", int(7)),
            assign("x", int(5)),
            call(
                "print",
                vec![ident("x"), string(" "), expr(ExprOp::Deref, vec![ident("r")])],
            ),
        ]);
        assert_eq!(output(&root), "5 7");
    }

    #[test]
    fn calling_a_non_alias_is_a_type_error() {
        let engine = engine();
        let root = seq(vec![
            assign("x", int(1)),
            alias_call(ident("x"), vec![]),
        ]);
        let (result, _) = run_on(&engine, &root);
        let err = result.unwrap_err();
        assert!(err.message.contains("integer is not callable"), "{err}");
    }
}
