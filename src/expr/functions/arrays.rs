use rand::Rng;

use crate::error::EvalError;
use crate::value::Value;

use super::super::eval::{apply, apply_trimmed, merge_sort_values};
use super::super::value_ops::is_truthy;
use super::arg_error;

fn items_of(value: &Value) -> Vec<Value> {
    match value {
        Value::Undefined => Vec::new(),
        Value::Array(items, _) => items.clone(),
        other => vec![other.clone()],
    }
}

/// `$count(array)` — 0 for Undefined, 1 for a scalar.
pub(super) fn count(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(items_of(&args[0]).len() as f64))
}

/// `$append(a, b)` — concatenation; an Undefined side contributes nothing.
pub(super) fn append(args: &[Value]) -> Result<Value, EvalError> {
    if args[0].is_undefined() {
        return Ok(args[1].clone());
    }
    if args[1].is_undefined() {
        return Ok(args[0].clone());
    }
    let mut out = items_of(&args[0]);
    out.extend(items_of(&args[1]));
    Ok(Value::user_array(out))
}

/// `$reverse(array)`.
pub(super) fn reverse(args: &[Value]) -> Result<Value, EvalError> {
    let mut out = items_of(&args[0]);
    out.reverse();
    Ok(Value::user_array(out))
}

/// `$sort(array, comparator?)` — stable. The default order handles an
/// all-number or all-string array; the comparator answers "a sorts after b".
pub(super) fn sort(args: &[Value]) -> Result<Value, EvalError> {
    let items = items_of(&args[0]);
    let sorted = match args.get(1) {
        Some(Value::Function(cmp)) => merge_sort_values(items, &mut |a, b| {
            let r = apply(cmp, &[a.clone(), b.clone()], &Value::Undefined)?;
            Ok(is_truthy(&r))
        })?,
        Some(Value::Undefined) | None => {
            let numbers = items.iter().all(|v| matches!(v, Value::Number(_)));
            let strings = items.iter().all(|v| matches!(v, Value::String(_)));
            if !numbers && !strings {
                return Err(arg_error("sort", 1));
            }
            merge_sort_values(items, &mut |a, b| match (a, b) {
                (Value::Number(x), Value::Number(y)) => Ok(x > y),
                (Value::String(x), Value::String(y)) => Ok(x > y),
                _ => Err(arg_error("sort", 1)),
            })?
        }
        Some(_) => return Err(arg_error("sort", 2)),
    };
    Ok(Value::user_array(sorted))
}

/// `$shuffle(array)` — uniform random permutation (Fisher-Yates).
pub(super) fn shuffle(args: &[Value]) -> Result<Value, EvalError> {
    let mut out = items_of(&args[0]);
    let mut rng = rand::rng();
    for i in (1..out.len()).rev() {
        let j = rng.random_range(0..=i);
        out.swap(i, j);
    }
    Ok(Value::user_array(out))
}

/// `$zip(a1, a2, ...)` — truncated to the shortest input.
pub(super) fn zip(args: &[Value]) -> Result<Value, EvalError> {
    let columns: Vec<Vec<Value>> = args.iter().map(items_of).collect();
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(rows);
    for r in 0..rows {
        out.push(Value::user_array(
            columns.iter().map(|c| c[r].clone()).collect(),
        ));
    }
    Ok(Value::user_array(out))
}

/// `$distinct(array)` — removes structurally equal duplicates, keeping the
/// first occurrence.
pub(super) fn distinct(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Array(items, _) => {
            let mut out: Vec<Value> = Vec::new();
            for item in items {
                if !out.iter().any(|seen| seen == item) {
                    out.push(item.clone());
                }
            }
            Ok(Value::user_array(out))
        }
        other => Ok(other.clone()),
    }
}

/// `$map(array, fn)` — fn(value, index, array), results collected; holes
/// (Undefined results) drop out.
pub(super) fn map(args: &[Value]) -> Result<Value, EvalError> {
    let items = items_of(&args[0]);
    let Some(f) = args.get(1).and_then(Value::as_callable) else {
        return Err(arg_error("map", 2));
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let r = apply_trimmed(
            f,
            &[item.clone(), Value::Number(i as f64), args[0].clone()],
            &Value::Undefined,
        )?;
        if !r.is_undefined() {
            out.push(r);
        }
    }
    Ok(Value::user_array(out))
}

/// `$filter(array, predicate)` — predicate(value, index, array).
pub(super) fn filter(args: &[Value]) -> Result<Value, EvalError> {
    let items = items_of(&args[0]);
    let Some(f) = args.get(1).and_then(Value::as_callable) else {
        return Err(arg_error("filter", 2));
    };
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let r = apply_trimmed(
            f,
            &[item.clone(), Value::Number(i as f64), args[0].clone()],
            &Value::Undefined,
        )?;
        if is_truthy(&r) {
            out.push(item.clone());
        }
    }
    Ok(Value::user_array(out))
}

/// `$reduce(array, fn, init?)` — fn must accept at least two arguments.
pub(super) fn reduce(args: &[Value]) -> Result<Value, EvalError> {
    let items = items_of(&args[0]);
    let Some(f) = args.get(1).and_then(Value::as_callable) else {
        return Err(arg_error("reduce", 2));
    };
    if f.param_count() < 2 {
        return Err(arg_error("reduce", 2));
    }
    let mut iter = items.into_iter().enumerate();
    let mut acc = match args.get(2) {
        Some(init) if !init.is_undefined() => init.clone(),
        _ => match iter.next() {
            Some((_, first)) => first,
            None => return Ok(Value::Undefined),
        },
    };
    for (i, item) in iter {
        acc = apply_trimmed(
            f,
            &[acc, item, Value::Number(i as f64), args[0].clone()],
            &Value::Undefined,
        )?;
    }
    Ok(acc)
}

/// `$single(array, predicate?)` — exactly one element must match.
pub(super) fn single(args: &[Value]) -> Result<Value, EvalError> {
    let items = items_of(&args[0]);
    let mut matched: Vec<Value> = Vec::new();
    match args.get(1) {
        Some(Value::Function(f)) => {
            for (i, item) in items.iter().enumerate() {
                let r = apply_trimmed(
                    f,
                    &[item.clone(), Value::Number(i as f64), args[0].clone()],
                    &Value::Undefined,
                )?;
                if is_truthy(&r) {
                    matched.push(item.clone());
                }
            }
        }
        _ => matched = items,
    }
    if matched.len() != 1 {
        return Err(EvalError::SingleMatch {
            matched: matched.len(),
        });
    }
    Ok(matched.into_iter().next().expect("length checked"))
}
