/// Value coercions shared by the evaluator and the function library:
/// number rendering, JSON stringification, truthiness, and the checked
/// deep copy used by transform expressions.
use crate::error::EvalError;
use crate::value::Value;

/// Render a number the way `$string` does: integral values without a
/// decimal point, everything else in shortest round-trip form.
pub fn number_to_string(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e18 {
        itoa::Buffer::new().format(n as i64).to_string()
    } else {
        ryu::Buffer::new().format(n).to_string()
    }
}

/// `$string` semantics: strings pass through, scalars render as JSON
/// scalars, structures render as compact JSON text, callables render as the
/// empty string.
pub fn string_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Undefined | Value::Function(_) => String::new(),
        other => {
            let mut out = String::new();
            write_json(&mut out, other);
            out
        }
    }
}

fn write_json(out: &mut String, value: &Value) {
    match value {
        Value::Undefined | Value::Null | Value::Function(_) => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&number_to_string(*n)),
        Value::String(s) => write_json_string(out, s),
        Value::Array(items, _) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json(out, item);
            }
            out.push(']');
        }
        Value::Object(pairs) => {
            out.push('{');
            let mut first = true;
            for (k, v) in pairs {
                // Entries holding non-JSON values are omitted.
                if matches!(v, Value::Undefined | Value::Function(_)) {
                    continue;
                }
                if !first {
                    out.push(',');
                }
                first = false;
                write_json_string(out, k);
                out.push(':');
                write_json(out, v);
            }
            out.push('}');
        }
    }
}

fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// `$boolean` truthiness. None for Undefined, which propagates.
pub fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Undefined => None,
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(*n != 0.0),
        Value::String(s) => Some(!s.is_empty()),
        Value::Array(items, _) => Some(items.iter().any(|v| boolean(v) == Some(true))),
        Value::Object(pairs) => Some(!pairs.is_empty()),
        Value::Function(_) => Some(false),
    }
}

/// Truthiness with Undefined treated as false, for conditionals and
/// predicates.
pub fn is_truthy(value: &Value) -> bool {
    boolean(value) == Some(true)
}

/// Deep copy for transform expressions. Values containing callables cannot
/// be cloned into a JSON-shaped document.
pub fn clone_checked(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Function(_) => Err(EvalError::Clone),
        Value::Array(items, flags) => {
            let copied = items
                .iter()
                .map(clone_checked)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(copied, *flags))
        }
        Value::Object(pairs) => {
            let copied = pairs
                .iter()
                .map(|(k, v)| clone_checked(v).map(|c| (k.clone(), c)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Object(copied))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Callable;
    use serde_json::json;

    #[test]
    fn numbers_render_without_trailing_zeros() {
        assert_eq!(number_to_string(135.0), "135");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(-2.0), "-2");
        assert_eq!(number_to_string(0.0), "0");
        assert_eq!(number_to_string(1e21), "1e21");
    }

    #[test]
    fn string_of_scalars() {
        assert_eq!(string_of(&Value::String("abc".into())), "abc");
        assert_eq!(string_of(&Value::Bool(true)), "true");
        assert_eq!(string_of(&Value::Null), "null");
        assert_eq!(string_of(&Value::Number(2.5)), "2.5");
        assert_eq!(string_of(&Value::Undefined), "");
    }

    #[test]
    fn string_of_structures_is_compact_json() {
        let v = Value::from(json!({"a": [1, "x"], "b": null}));
        assert_eq!(string_of(&v), r#"{"a":[1,"x"],"b":null}"#);
    }

    #[test]
    fn truthiness() {
        assert_eq!(boolean(&Value::Undefined), None);
        assert_eq!(boolean(&Value::Null), Some(false));
        assert_eq!(boolean(&Value::Number(0.0)), Some(false));
        assert_eq!(boolean(&Value::Number(0.5)), Some(true));
        assert_eq!(boolean(&Value::String(String::new())), Some(false));
        assert_eq!(boolean(&Value::String("x".into())), Some(true));
        assert_eq!(boolean(&Value::array(vec![])), Some(false));
        assert_eq!(
            boolean(&Value::array(vec![Value::Number(0.0)])),
            Some(false)
        );
        assert_eq!(
            boolean(&Value::array(vec![Value::Number(0.0), Value::Bool(true)])),
            Some(true)
        );
        assert_eq!(boolean(&Value::Object(vec![])), Some(false));
    }

    #[test]
    fn boolean_is_idempotent() {
        for v in [
            Value::Undefined,
            Value::Null,
            Value::Number(3.0),
            Value::String("x".into()),
            Value::array(vec![Value::Bool(false)]),
        ] {
            let once = boolean(&v);
            let twice = once.map(Value::Bool).as_ref().and_then(boolean);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn clone_rejects_functions() {
        let builtin = crate::expr::functions::lookup("sum").unwrap();
        let v = Value::Object(vec![(
            "f".into(),
            Value::Function(Callable::Builtin(builtin)),
        )]);
        assert_eq!(clone_checked(&v), Err(EvalError::Clone));
    }
}
