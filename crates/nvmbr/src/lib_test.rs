//! End-to-end scenarios driving the public `interpret` entry point, one per
//! notable language feature.

use super::*;

#[test]
fn a_script_with_no_statements_interprets_to_nothing() {
    assert!(interpret("").is_ok());
}

#[test]
fn expression_statements_evaluate_and_discard_their_value() {
    assert!(interpret("1 + 1.").is_ok());
}

#[test]
fn booleans_and_nil_print_without_faulting() {
    assert!(interpret("puts true. puts false. puts nil.").is_ok());
}

#[test]
fn logical_operators_short_circuit() {
    let source = "func boom() -> puts \"should not run\". return true. end\nputs false and boom().\nputs true or boom().";
    assert!(interpret(source).is_ok());
}

#[test]
fn equality_compares_by_value_for_numbers_and_identity_for_objects() {
    assert!(interpret("puts 1 == 1.0.").is_ok());
    let source = "class Box [\n]\nset a <- Box().\nset b <- Box().\nputs a == b.\nputs a == a.";
    assert!(interpret(source).is_ok());
}

#[test]
fn comments_are_ignored_to_end_of_line() {
    let source = "% this whole line is a comment\nputs 1 + 1. % trailing comment";
    assert!(interpret(source).is_ok());
}

#[test]
fn a_runtime_error_is_reported_as_interpret_error_runtime() {
    match interpret("puts 1 + \"two\".") {
        Err(InterpretError::Runtime(err)) => {
            assert_eq!(err.message, "Operands must be two numbers or two strings.");
        }
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn a_compile_error_is_reported_as_interpret_error_compile() {
    match interpret("set 1 <- 2.") {
        Err(InterpretError::Compile(errors)) => assert!(!errors.is_empty()),
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn separate_interpret_calls_do_not_share_globals() {
    // `interpret` spins up a fresh VM every time, unlike the REPL's
    // long-lived one - a global from one call must not leak into the next.
    assert!(interpret("set leaked <- 1.").is_ok());
    match interpret("puts leaked.") {
        Err(InterpretError::Runtime(err)) => assert_eq!(err.message, "Undefined variable 'leaked'."),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}
