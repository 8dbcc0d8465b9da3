/// Error taxonomy coverage: every failure carries the right kind, and
/// Undefined stays a value rather than an error.
mod common;

use common::{eval, eval_no_input};
use jsonata::{Error, EvalError, ParseError, compile};
use serde_json::json;

fn parse_err(expr: &str) -> ParseError {
    match compile(expr) {
        Err(Error::Parse(e)) => e,
        Err(other) => panic!("{expr:?}: expected parse error, got {other}"),
        Ok(_) => panic!("{expr:?}: expected parse error, got success"),
    }
}

fn eval_err(expr: &str, input: serde_json::Value) -> EvalError {
    match eval(expr, input) {
        Err(Error::Eval(e)) => e,
        Err(other) => panic!("{expr:?}: expected eval error, got {other}"),
        Ok(v) => panic!("{expr:?}: expected eval error, got {v:?}"),
    }
}

#[test]
fn lexical_errors() {
    assert!(matches!(
        parse_err("\"unterminated"),
        ParseError::UnterminatedString { .. }
    ));
    assert!(matches!(
        parse_err("`unterminated"),
        ParseError::UnterminatedName { .. }
    ));
    assert!(matches!(parse_err("/abc"), ParseError::UnterminatedRegex { .. }));
    assert!(matches!(parse_err("//"), ParseError::EmptyRegex { .. }));
    assert!(matches!(
        parse_err("/(unclosed/"),
        ParseError::InvalidRegex { .. }
    ));
    assert!(matches!(
        parse_err("\"bad \\y escape\""),
        ParseError::IllegalEscape { escape: 'y', .. }
    ));
    assert!(matches!(
        parse_err("\"\\u12\""),
        ParseError::IllegalEscapeHex { .. }
    ));
    assert!(matches!(parse_err("1e"), ParseError::InvalidNumber { .. }));
    assert!(matches!(parse_err("1e1000"), ParseError::NumberRange { .. }));
    assert!(matches!(
        parse_err("/* no end"),
        ParseError::UnterminatedComment { .. }
    ));
}

#[test]
fn number_boundaries_accepted() {
    assert!(compile("1e10").is_ok());
    assert!(compile("1E-10").is_ok());
    assert!(compile("0.5").is_ok());
}

#[test]
fn syntactic_errors() {
    assert!(matches!(parse_err("1 +"), ParseError::UnexpectedEof { .. }));
    assert!(matches!(parse_err("1 2"), ParseError::SyntaxError { .. }));
    assert!(matches!(parse_err("(1"), ParseError::MissingToken { .. }));
    assert!(matches!(parse_err("+1"), ParseError::Prefix { .. }));
    assert!(matches!(parse_err("1 ** 2"), ParseError::Infix { .. }));
    assert!(matches!(parse_err("1 @ 2"), ParseError::SyntaxError { .. }));
    assert!(matches!(parse_err("path.0"), ParseError::PathLiteral { .. }));
    assert!(matches!(
        parse_err("\"x\".$uppercase()"),
        ParseError::PathLiteral { .. }
    ));
    assert!(matches!(
        parse_err("*{\"one\": 1}[0]"),
        ParseError::GroupPredicate { .. }
    ));
    assert!(matches!(
        parse_err("a{\"x\": 1}{\"y\": 2}"),
        ParseError::GroupGroup { .. }
    ));
    assert!(matches!(
        parse_err("5 := 1"),
        ParseError::IllegalAssignment { .. }
    ));
    assert!(matches!(
        parse_err("function(x){x}"),
        ParseError::IllegalParam { .. }
    ));
    assert!(matches!(
        parse_err("function($a, $a){$a}"),
        ParseError::DuplicateParam { .. }
    ));
    assert!(matches!(
        parse_err("function($a)<nn:n>{$a}"),
        ParseError::ParamCount { .. }
    ));
}

#[test]
fn signature_errors() {
    assert!(matches!(
        parse_err("function($a)<q>{$a}"),
        ParseError::InvalidParamType { ch: 'q', .. }
    ));
    assert!(matches!(
        parse_err("function($a)<?n>{$a}"),
        ParseError::UnmatchedOption { .. }
    ));
    assert!(matches!(
        parse_err("function($a)<n<s>>{$a}"),
        ParseError::InvalidSubtype { .. }
    ));
    assert!(matches!(
        parse_err("function($a)<(nq)>{$a}"),
        ParseError::InvalidUnionType { ch: 'q', .. }
    ));
}

#[test]
fn numeric_operator_errors() {
    assert!(matches!(
        eval_err("\"a\" * 2", json!(null)),
        EvalError::NonNumberLhs { .. }
    ));
    assert!(matches!(
        eval_err("2 - null", json!(null)),
        EvalError::NonNumberRhs { .. }
    ));
    assert!(matches!(
        eval_err("1 / 0", json!(null)),
        EvalError::NumberInf { .. }
    ));
    assert!(matches!(
        eval_err("-\"x\"", json!(null)),
        EvalError::NonNumberRhs { .. }
    ));
}

#[test]
fn comparison_errors() {
    assert!(matches!(
        eval_err("1 < \"x\"", json!(null)),
        EvalError::TypeMismatch { .. }
    ));
    assert!(matches!(
        eval_err("null <= 1", json!(null)),
        EvalError::NonComparableLhs { .. }
    ));
}

#[test]
fn range_errors() {
    assert!(matches!(
        eval_err("[1.5..4]", json!(null)),
        EvalError::NonIntegerLhs { .. }
    ));
    assert!(matches!(
        eval_err("[1..\"x\"]", json!(null)),
        EvalError::NonIntegerRhs { .. }
    ));
    assert!(matches!(
        eval_err("[1..20000000]", json!(null)),
        EvalError::MaxRangeItems { .. }
    ));
}

#[test]
fn object_errors() {
    assert!(matches!(
        eval_err("{true: 1}", json!(null)),
        EvalError::IllegalKey { .. }
    ));
    assert!(matches!(
        eval_err("{\"a\": 1, \"a\": 2}", json!(null)),
        EvalError::DuplicateKey { .. }
    ));
}

#[test]
fn callable_errors() {
    assert!(matches!(
        eval_err("$nope()", json!(null)),
        EvalError::NonCallable { .. }
    ));
    assert!(matches!(
        eval_err("1 ~> 2", json!(null)),
        EvalError::NonCallableApply { .. }
    ));
    assert!(matches!(
        eval_err("($x := 1; $x(?))", json!(null)),
        EvalError::NonCallablePartial { .. }
    ));
    assert!(matches!(
        eval_err("$sum(1, 2)", json!(null)),
        EvalError::ArgCount { .. }
    ));
    assert!(matches!(
        eval_err("$uppercase(5)", json!(null)),
        EvalError::ArgType { .. }
    ));
    assert!(matches!(
        eval_err("$sum([\"a\"])", json!(null)),
        EvalError::ArgType { .. }
    ));
}

#[test]
fn sort_errors() {
    assert!(matches!(
        eval_err("$^($)", json!([1, "a"])),
        EvalError::SortMismatch { .. }
    ));
    assert!(matches!(
        eval_err("$^($)", json!([{"a": 1}, {"a": 2}])),
        EvalError::NonSortable { .. }
    ));
}

#[test]
fn transform_errors() {
    assert!(matches!(
        eval_err("$ ~> |$|42|", json!({"a": 1})),
        EvalError::IllegalUpdate { .. }
    ));
    assert!(matches!(
        eval_err("$ ~> |$|{}, {\"k\": 1}|", json!({"a": 1})),
        EvalError::IllegalDelete { .. }
    ));
}

#[test]
fn undefined_is_a_value_not_an_error() {
    assert!(eval_no_input("nothing").unwrap().is_undefined());
    assert!(eval("a.b.c", json!({})).unwrap().is_undefined());
    // Undefined propagates silently through operators.
    assert!(eval("1 + nothing", json!({})).unwrap().is_undefined());
    assert!(eval("nothing = nothing", json!({})).unwrap().is_undefined());
}

#[test]
fn errors_render_with_positions() {
    let message = parse_err("foo.`no end").to_string();
    assert!(message.starts_with("4:"), "unexpected message: {message}");
}
