use crate::error::EvalError;
use crate::value::Value;

use super::super::value_ops;

/// `$boolean(v)` — truthiness coercion.
pub(super) fn boolean_fn(args: &[Value]) -> Result<Value, EvalError> {
    Ok(value_ops::boolean(&args[0])
        .map(Value::Bool)
        .unwrap_or(Value::Undefined))
}

/// `$not(v)`.
pub(super) fn not(args: &[Value]) -> Result<Value, EvalError> {
    Ok(value_ops::boolean(&args[0])
        .map(|b| Value::Bool(!b))
        .unwrap_or(Value::Undefined))
}

/// `$exists(v)` — false only for Undefined.
pub(super) fn exists(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!args.first().is_none_or(Value::is_undefined)))
}

/// `$type(v)` — the type name as a string.
pub(super) fn type_of(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].type_name().to_string()))
}
