#![allow(dead_code)]
/// Shared helpers for the integration tests: compile-and-evaluate against
/// `serde_json` inputs and compare JSON-shaped results.
use jsonata::{Value, compile};
use serde_json::Value as Json;

pub fn eval(expr: &str, input: Json) -> jsonata::Result<Value> {
    compile(expr)?.evaluate(&Value::from(input))
}

pub fn eval_ok(expr: &str, input: Json) -> Value {
    eval(expr, input).unwrap_or_else(|e| panic!("evaluating {expr:?} failed: {e}"))
}

/// Evaluate and convert the result to JSON; panics on Undefined.
pub fn eval_json(expr: &str, input: Json) -> Json {
    eval_ok(expr, input)
        .to_json()
        .unwrap_or_else(|| panic!("{expr:?} produced no JSON result"))
}

/// Evaluate with no input document.
pub fn eval_no_input(expr: &str) -> jsonata::Result<Value> {
    compile(expr)?.evaluate(&Value::Undefined)
}
