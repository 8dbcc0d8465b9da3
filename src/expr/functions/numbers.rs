use crate::error::EvalError;
use crate::value::Value;

use super::super::eval::checked_number;
use super::arg_error;

fn num_arg(args: &[Value], name: &str, index: usize) -> Result<f64, EvalError> {
    args.get(index - 1)
        .and_then(Value::as_number)
        .ok_or_else(|| arg_error(name, index))
}

fn num_items<'a>(args: &'a [Value], name: &str) -> Result<Vec<f64>, EvalError> {
    let Value::Array(items, _) = &args[0] else {
        return Err(arg_error(name, 1));
    };
    items
        .iter()
        .map(|v| v.as_number().ok_or_else(|| arg_error(name, 1)))
        .collect()
}

/// `$number(v)` — strings parse with JSON number syntax; booleans map to
/// 1 and 0.
pub(super) fn number(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => match parse_json_number(s) {
            Some(n) => Ok(Value::Number(n)),
            None => Err(arg_error("number", 1)),
        },
        _ => Err(arg_error("number", 1)),
    }
}

/// JSON number grammar: `-? int frac? exp?`, no leading zeros, and the
/// value must be representable (so "1e1000" is rejected, not infinity).
fn parse_json_number(s: &str) -> Option<f64> {
    let b = s.as_bytes();
    let mut i = 0;
    if b.get(i) == Some(&b'-') {
        i += 1;
    }
    match b.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while matches!(b.get(i), Some(b'0'..=b'9')) {
                i += 1;
            }
        }
        _ => return None,
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        if !matches!(b.get(i), Some(b'0'..=b'9')) {
            return None;
        }
        while matches!(b.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !matches!(b.get(i), Some(b'0'..=b'9')) {
            return None;
        }
        while matches!(b.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
    }
    if i != b.len() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub(super) fn abs(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(num_arg(args, "abs", 1)?.abs()))
}

pub(super) fn floor(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(num_arg(args, "floor", 1)?.floor()))
}

pub(super) fn ceil(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(num_arg(args, "ceil", 1)?.ceil()))
}

/// `$round(v, precision?)` — banker's rounding at the given decimal
/// precision; negative precision rounds to the left of the decimal point.
pub(super) fn round(args: &[Value]) -> Result<Value, EvalError> {
    let v = num_arg(args, "round", 1)?;
    let precision = match args.get(1) {
        Some(Value::Number(p)) => p.floor() as i32,
        Some(Value::Undefined) | None => 0,
        Some(_) => return Err(arg_error("round", 2)),
    };
    let factor = 10f64.powi(precision);
    checked_number((v * factor).round_ties_even() / factor)
}

/// `$sqrt(v)` — rejects negative input.
pub(super) fn sqrt(args: &[Value]) -> Result<Value, EvalError> {
    let v = num_arg(args, "sqrt", 1)?;
    if v < 0.0 {
        return Err(arg_error("sqrt", 1));
    }
    Ok(Value::Number(v.sqrt()))
}

/// `$power(base, exponent)` — errors when the result is not representable.
pub(super) fn power(args: &[Value]) -> Result<Value, EvalError> {
    let base = num_arg(args, "power", 1)?;
    let exp = num_arg(args, "power", 2)?;
    checked_number(base.powf(exp))
}

/// `$random()` — uniform in [0, 1).
pub(super) fn random(_args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(rand::random::<f64>()))
}

pub(super) fn sum(args: &[Value]) -> Result<Value, EvalError> {
    let items = num_items(args, "sum")?;
    checked_number(items.iter().sum())
}

pub(super) fn max(args: &[Value]) -> Result<Value, EvalError> {
    let items = num_items(args, "max")?;
    Ok(items
        .into_iter()
        .reduce(f64::max)
        .map(Value::Number)
        .unwrap_or(Value::Undefined))
}

pub(super) fn min(args: &[Value]) -> Result<Value, EvalError> {
    let items = num_items(args, "min")?;
    Ok(items
        .into_iter()
        .reduce(f64::min)
        .map(Value::Number)
        .unwrap_or(Value::Undefined))
}

pub(super) fn average(args: &[Value]) -> Result<Value, EvalError> {
    let items = num_items(args, "average")?;
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    checked_number(items.iter().sum::<f64>() / items.len() as f64)
}
