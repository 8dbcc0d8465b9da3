use crate::error::EvalError;
use crate::value::Value;

use super::super::eval::{apply_trimmed, finalize};
use super::super::value_ops::is_truthy;
use super::arg_error;

/// `$keys(obj)` — key names in insertion order. On an array, the union of
/// the element keys.
pub(super) fn keys(args: &[Value]) -> Result<Value, EvalError> {
    let mut out: Vec<String> = Vec::new();
    collect_keys(&args[0], &mut out);
    if out.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(Value::user_array(
        out.into_iter().map(Value::String).collect(),
    ))
}

fn collect_keys(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(pairs) => {
            for (k, _) in pairs {
                if !out.iter().any(|existing| existing == k) {
                    out.push(k.clone());
                }
            }
        }
        Value::Array(items, _) => {
            for item in items {
                collect_keys(item, out);
            }
        }
        _ => {}
    }
}

/// `$lookup(obj, key)` — the value at key; fans out over arrays.
pub(super) fn lookup_fn(args: &[Value]) -> Result<Value, EvalError> {
    let Some(Value::String(key)) = args.get(1) else {
        return Err(arg_error("lookup", 2));
    };
    Ok(finalize(lookup_value(&args[0], key)))
}

fn lookup_value(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(_) => value.entry(key),
        Value::Array(items, _) => {
            let mut out = Vec::new();
            for item in items {
                match lookup_value(item, key) {
                    Value::Undefined => {}
                    Value::Array(nested, flags) if flags.sequence => out.extend(nested),
                    other => out.push(other),
                }
            }
            Value::sequence(out)
        }
        _ => Value::Undefined,
    }
}

/// `$spread(obj)` — one single-entry object per key. Arrays spread each
/// element; other values pass through.
pub(super) fn spread(args: &[Value]) -> Result<Value, EvalError> {
    fn spread_into(value: &Value, out: &mut Vec<Value>) {
        match value {
            Value::Object(pairs) => {
                for (k, v) in pairs {
                    out.push(Value::Object(vec![(k.clone(), v.clone())]));
                }
            }
            Value::Array(items, _) => {
                for item in items {
                    spread_into(item, out);
                }
            }
            other => out.push(other.clone()),
        }
    }
    match &args[0] {
        v @ (Value::Object(_) | Value::Array(..)) => {
            let mut out = Vec::new();
            spread_into(v, &mut out);
            Ok(Value::user_array(out))
        }
        other => Ok(other.clone()),
    }
}

/// `$merge(array)` — shallow merge left to right; later keys win.
pub(super) fn merge(args: &[Value]) -> Result<Value, EvalError> {
    let Value::Array(items, _) = &args[0] else {
        return Err(arg_error("merge", 1));
    };
    let mut out: Vec<(String, Value)> = Vec::new();
    for item in items {
        let Value::Object(pairs) = item else {
            return Err(arg_error("merge", 1));
        };
        for (k, v) in pairs {
            match out.iter_mut().find(|(existing, _)| existing == k) {
                Some((_, slot)) => *slot = v.clone(),
                None => out.push((k.clone(), v.clone())),
            }
        }
    }
    Ok(Value::Object(out))
}

/// `$each(obj, fn)` — apply fn(value, key, obj) to every entry, collecting
/// the results into an array.
pub(super) fn each(args: &[Value]) -> Result<Value, EvalError> {
    let Value::Object(pairs) = &args[0] else {
        return Err(arg_error("each", 1));
    };
    let Some(f) = args.get(1).and_then(Value::as_callable) else {
        return Err(arg_error("each", 2));
    };
    let mut out = Vec::with_capacity(pairs.len());
    for (k, v) in pairs {
        let r = apply_trimmed(
            f,
            &[v.clone(), Value::String(k.clone()), args[0].clone()],
            &Value::Undefined,
        )?;
        if !r.is_undefined() {
            out.push(r);
        }
    }
    Ok(Value::user_array(out))
}

/// `$sift(obj, predicate)` — the entries for which the predicate holds.
pub(super) fn sift(args: &[Value]) -> Result<Value, EvalError> {
    let Value::Object(pairs) = &args[0] else {
        return Err(arg_error("sift", 1));
    };
    let Some(f) = args.get(1).and_then(Value::as_callable) else {
        return Err(arg_error("sift", 2));
    };
    let mut out = Vec::new();
    for (k, v) in pairs {
        let r = apply_trimmed(
            f,
            &[v.clone(), Value::String(k.clone()), args[0].clone()],
            &Value::Undefined,
        )?;
        if is_truthy(&r) {
            out.push((k.clone(), v.clone()));
        }
    }
    if out.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_in_insertion_order() {
        let obj = Value::from(json!({"b": 1, "a": 2}));
        assert_eq!(keys(&[obj]).unwrap(), Value::from(json!(["b", "a"])));
    }

    #[test]
    fn keys_union_over_arrays() {
        let arr = Value::from(json!([{"a": 1}, {"b": 2, "a": 3}]));
        assert_eq!(keys(&[arr]).unwrap(), Value::from(json!(["a", "b"])));
    }

    #[test]
    fn keys_of_scalar_is_undefined() {
        assert!(keys(&[Value::Number(1.0)]).unwrap().is_undefined());
    }

    #[test]
    fn lookup_finds_and_fans_out() {
        let obj = Value::from(json!({"x": 7}));
        assert_eq!(
            lookup_fn(&[obj, Value::String("x".into())]).unwrap(),
            Value::Number(7.0)
        );
        let arr = Value::from(json!([{"x": 1}, {"y": 2}, {"x": 3}]));
        assert_eq!(
            lookup_fn(&[arr, Value::String("x".into())]).unwrap(),
            Value::from(json!([1, 3]))
        );
    }

    #[test]
    fn spread_splits_objects() {
        let obj = Value::from(json!({"a": 1, "b": 2}));
        assert_eq!(
            spread(&[obj]).unwrap(),
            Value::from(json!([{"a": 1}, {"b": 2}]))
        );
    }

    #[test]
    fn merge_later_keys_win() {
        let arr = Value::from(json!([{"a": 1, "b": 2}, {"b": 3}]));
        assert_eq!(merge(&[arr]).unwrap(), Value::from(json!({"a": 1, "b": 3})));
    }

    #[test]
    fn merge_rejects_non_objects() {
        let arr = Value::from(json!([{"a": 1}, 2]));
        assert!(merge(&[arr]).is_err());
    }
}
