use super::*;
use pretty_assertions::assert_eq;

// Kind → message

#[test]
fn division_by_zero_has_correct_kind() {
    let err = division_by_zero();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    assert_eq!(err.message, "division by zero");
    assert_eq!(err.class(), ErrorClass::ZeroDivision);
}

#[test]
fn function_redefined_message() {
    let err = function_redefined("foo");
    assert_eq!(err.message, "function 'foo' already defined");
    assert_eq!(err.class(), ErrorClass::Syntax);
}

#[test]
fn builtin_redefined_message() {
    let err = builtin_redefined("print");
    assert_eq!(
        err.message,
        "function 'print' already defined as a language builtin"
    );
}

#[test]
fn arity_mismatch_pluralizes() {
    assert_eq!(
        arity_mismatch("f", 1, 2).message,
        "function 'f' requires 1 parameter (called with 2)"
    );
    assert_eq!(
        arity_mismatch("g", 3, 0).message,
        "function 'g' requires 3 parameters (called with 0)"
    );
}

#[test]
fn unhandled_exception_message() {
    let err = unhandled_exception("boom");
    assert_eq!(err.message, "unhandled exception: boom");
    assert!(!err.is_catchable());
}

// Classes

#[test]
fn catchable_classes() {
    assert!(undeclared_identifier("x").is_catchable());
    assert!(type_mismatch("int", "string").is_catchable());
    assert!(index_out_of_bounds(4, 2).is_catchable());
    assert!(undefined_member("y", "Point").is_catchable());
    assert!(modulo_by_zero().is_catchable());
    assert!(thrown("custom").is_catchable());
}

#[test]
fn fatal_classes() {
    assert!(!function_redefined("f").is_catchable());
    assert!(!memory_ceiling(10, 5, 12).is_catchable());
    assert!(!arena_exhausted().is_catchable());
    assert!(!recursion_limit(100).is_catchable());
    assert!(!internal("bad").is_catchable());
}

#[test]
fn raised_text_prefixes_class_name() {
    assert_eq!(
        index_out_of_bounds(5, 3).raised_text(),
        "IndexError: index 5 out of bounds (size 3)"
    );
    assert_eq!(
        undeclared_identifier("y").raised_text(),
        "UndeclaredIdentifierError: 'y' undeclared identifier"
    );
}

#[test]
fn thrown_raises_its_text_verbatim() {
    assert_eq!(thrown("oops").raised_text(), "oops");
}

// Display

#[test]
fn display_includes_span_and_notes() {
    let err = division_by_zero()
        .with_span(Span::new(4, 0, 3))
        .with_note(EvalNote::new("in call to 'f'"));
    assert_eq!(
        err.to_string(),
        "ZeroDivisionError: division by zero (line 4)\n  note: in call to 'f'"
    );
}

#[test]
fn with_span_keeps_innermost() {
    let err = division_by_zero()
        .with_span(Span::new(2, 0, 1))
        .with_span(Span::new(9, 0, 1));
    assert_eq!(err.span, Some(Span::new(2, 0, 1)));
}

#[test]
fn with_span_ignores_generated_spans() {
    let err = division_by_zero().with_span(Span::DUMMY);
    assert_eq!(err.span, None);
}
