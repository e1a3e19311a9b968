//! Tests for sequences, loops, branches and `switch`.

use hyb_ir::build::{
    assign, binary, brk, call, compound, expr, for_loop, foreach, foreach_map, ident, if_else,
    int, next, seq, stmt, string, switch, while_loop,
};
use hyb_ir::{BinaryOp, ExprOp, Node, StmtOp};

use super::{engine, output, run_on};

fn print(args: Vec<Node>) -> Node {
    call("print", args)
}

fn range(from: i64, to: i64) -> Node {
    expr(ExprOp::Range, vec![int(from), int(to)])
}

fn equals(name: &str, n: i64) -> Node {
    binary(BinaryOp::Eq, ident(name), int(n))
}

mod sequence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sequence_value_is_its_last_statement() {
        let engine = engine();
        let root = seq(vec![assign("x", int(5)), compound("x", BinaryOp::Add, int(3))]);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), Some("8".to_string()));
        assert_eq!(engine.display_global("x"), Some("8".to_string()));
    }

    #[test]
    fn empty_sequence_is_undefined() {
        let engine = engine();
        let (result, _) = run_on(&engine, &seq(vec![]));
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn if_statement_has_no_value() {
        let engine = engine();
        let root = if_else(int(1), int(2), None);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), None);
    }
}

mod loop_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn while_runs_until_condition_fails() {
        let root = seq(vec![
            assign("i", int(0)),
            while_loop(
                binary(BinaryOp::Lt, ident("i"), int(3)),
                seq(vec![print(vec![ident("i")]), expr(ExprOp::Inc, vec![ident("i")])]),
            ),
        ]);
        assert_eq!(output(&root), "012");
    }

    #[test]
    fn do_while_runs_body_once_with_false_condition() {
        let root = stmt(
            StmtOp::DoWhile,
            vec![print(vec![string("body")]), int(0)],
        );
        assert_eq!(output(&root), "body");
    }

    #[test]
    fn for_loop_runs_init_condition_step() {
        let root = for_loop(
            assign("i", int(3)),
            binary(BinaryOp::Gt, ident("i"), int(0)),
            expr(ExprOp::Dec, vec![ident("i")]),
            print(vec![ident("i"), string(" ")]),
        );
        assert_eq!(output(&root), "3 2 1 ");
    }

    #[test]
    fn foreach_visits_elements_in_order() {
        let root = foreach(
            "x",
            call("array", vec![int(1), int(2), int(3)]),
            print(vec![ident("x"), string(" ")]),
        );
        assert_eq!(output(&root), "1 2 3 ");
    }

    #[test]
    fn foreach_over_range_descends() {
        let root = foreach("x", range(3, 1), print(vec![ident("x")]));
        assert_eq!(output(&root), "321");
    }

    #[test]
    fn foreach_over_string_visits_chars() {
        let root = foreach("c", string("abc"), print(vec![ident("c"), string(".")]));
        assert_eq!(output(&root), "a.b.c.");
    }

    #[test]
    fn foreach_map_visits_pairs_in_insertion_order() {
        let root = foreach_map(
            "k",
            "v",
            call("map", vec![string("b"), int(1), string("a"), int(2)]),
            print(vec![ident("k"), string("="), ident("v"), string(";")]),
        );
        assert_eq!(output(&root), "b=1;a=2;");
    }

    #[test]
    fn break_and_next_affect_only_the_innermost_loop() {
        let inner = foreach(
            "j",
            range(1, 3),
            seq(vec![
                if_else(equals("j", 2), brk(), None),
                print(vec![ident("i"), ident("j"), string(",")]),
            ]),
        );
        let root = foreach(
            "i",
            range(1, 3),
            seq(vec![if_else(equals("i", 2), next(), None), inner]),
        );
        assert_eq!(output(&root), "11,31,");
    }

    #[test]
    fn loop_variable_is_a_copy() {
        let engine = engine();
        let root = seq(vec![
            assign("a", call("array", vec![int(1), int(2)])),
            foreach("x", ident("a"), assign("x", int(0))),
            ident("a"),
        ]);
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), Some("[1, 2]".to_string()));
    }
}

mod branch_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn if_takes_else_branch() {
        let root = if_else(
            int(0),
            print(vec![string("then")]),
            Some(print(vec![string("else")])),
        );
        assert_eq!(output(&root), "else");
    }

    #[test]
    fn ternary_evaluates_one_side() {
        let engine = engine();
        let root = expr(
            ExprOp::Ternary,
            vec![int(1), string("yes"), call("undefined_function", vec![])],
        );
        let (result, _) = run_on(&engine, &root);
        assert_eq!(result.unwrap(), Some("yes".to_string()));
    }

    #[test]
    fn regex_match_drives_a_branch() {
        let root = seq(vec![
            assign("name", string("hybris.h")),
            if_else(
                binary(BinaryOp::Regex, ident("name"), string(r"\.h$")),
                print(vec![string("header ")]),
                None,
            ),
            print(vec![binary(BinaryOp::Regex, ident("name"), string("^[0-9]"))]),
        ]);
        assert_eq!(output(&root), "header false");
    }

    fn switch_on(n: i64) -> Node {
        seq(vec![
            assign("x", int(n)),
            switch(
                ident("x"),
                vec![
                    (int(1), seq(vec![print(vec![string("one")]), brk()])),
                    (int(2), print(vec![string("two")])),
                ],
                Some(print(vec![string("other")])),
            ),
            print(vec![string("!")]),
        ])
    }

    #[test]
    fn switch_runs_the_matching_case() {
        assert_eq!(output(&switch_on(1)), "one!");
        assert_eq!(output(&switch_on(2)), "two!");
    }

    #[test]
    fn switch_falls_back_to_default() {
        assert_eq!(output(&switch_on(7)), "other!");
    }

    #[test]
    fn break_inside_switch_does_not_leave_the_loop() {
        let root = foreach(
            "i",
            range(1, 2),
            seq(vec![
                switch(ident("i"), vec![(int(1), brk())], None),
                print(vec![ident("i")]),
            ]),
        );
        assert_eq!(output(&root), "12");
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn foreach_sum_matches_the_elements(values in prop::collection::vec(-1000i64..1000, 0..20)) {
            let engine = engine();
            let root = seq(vec![
                assign("total", int(0)),
                foreach(
                    "v",
                    call("array", values.iter().map(|&v| int(v)).collect()),
                    compound("total", BinaryOp::Add, ident("v")),
                ),
                ident("total"),
            ]);
            let (result, _) = run_on(&engine, &root);
            let expected: i64 = values.iter().sum();
            prop_assert_eq!(result.unwrap(), Some(expected.to_string()));
        }

        #[test]
        fn while_counts_to_the_bound(bound in 0i64..50) {
            let root = seq(vec![
                assign("i", int(0)),
                while_loop(
                    binary(BinaryOp::Lt, ident("i"), int(bound)),
                    expr(ExprOp::Inc, vec![ident("i")]),
                ),
                call("print", vec![ident("i")]),
            ]);
            prop_assert_eq!(output(&root), bound.to_string());
        }
    }
}
