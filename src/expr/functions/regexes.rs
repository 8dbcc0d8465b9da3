/// Regex support: building matchers from `/pattern/flags` literals, the
/// stateful match-record iteration driven through `next`, and the `$match`
/// function.
use std::rc::Rc;

use crate::error::EvalError;
use crate::value::{Callable, MatchCursor, Matcher, Value};

use super::arg_error;

/// Compile a pattern with `{i, m, s}` flags mapped to inline modifiers.
pub fn build_regex(pattern: &str, flags: &str) -> Result<regex::Regex, regex::Error> {
    let mut p = String::with_capacity(pattern.len() + 6);
    if !flags.is_empty() {
        p.push_str("(?");
        for f in flags.chars() {
            p.push(f);
        }
        p.push(')');
    }
    p.push_str(pattern);
    regex::Regex::new(&p)
}

pub fn matcher(pattern: &str, flags: &str) -> Result<Matcher, regex::Error> {
    Ok(Matcher {
        regex: build_regex(pattern, flags)?,
        pattern: pattern.to_string(),
        flags: flags.to_string(),
    })
}

/// The record a matcher invocation yields: `{match, start, end, groups,
/// next}`, Undefined when there is no match at or after `from` (a byte
/// offset). Positions are code-point indices.
pub fn match_record(matcher: &Rc<Matcher>, subject: &str, from: usize) -> Value {
    if from > subject.len() {
        return Value::Undefined;
    }
    let Some(caps) = matcher.regex.captures_at(subject, from) else {
        return Value::Undefined;
    };
    let whole = caps.get(0).expect("group 0 always matches");
    let start = subject[..whole.start()].chars().count();
    let end = start + whole.as_str().chars().count();
    let groups: Vec<Value> = (1..caps.len())
        .map(|i| Value::String(caps.get(i).map_or("", |m| m.as_str()).to_string()))
        .collect();

    // Zero-width matches advance by one code point so that `next` makes
    // progress.
    let next_from = if whole.end() > whole.start() {
        whole.end()
    } else {
        whole.end()
            + subject[whole.end()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8)
    };

    Value::Object(vec![
        ("match".into(), Value::String(whole.as_str().to_string())),
        ("start".into(), Value::Number(start as f64)),
        ("end".into(), Value::Number(end as f64)),
        ("groups".into(), Value::user_array(groups)),
        (
            "next".into(),
            Value::Function(Callable::MatchCursor(Rc::new(MatchCursor {
                matcher: matcher.clone(),
                subject: subject.to_string(),
                from: next_from,
            }))),
        ),
    ])
}

/// The record shape `$match` and callable `$replace` arguments see:
/// `{match, index, groups}`.
pub fn simple_match_record(subject: &str, caps: &regex::Captures) -> Value {
    let whole = caps.get(0).expect("group 0 always matches");
    let index = subject[..whole.start()].chars().count();
    let groups: Vec<Value> = (1..caps.len())
        .map(|i| Value::String(caps.get(i).map_or("", |m| m.as_str()).to_string()))
        .collect();
    Value::Object(vec![
        ("match".into(), Value::String(whole.as_str().to_string())),
        ("index".into(), Value::Number(index as f64)),
        ("groups".into(), Value::user_array(groups)),
    ])
}

/// `$match(s, pat, limit?)`.
pub(super) fn match_fn(args: &[Value]) -> Result<Value, EvalError> {
    let Some(Value::String(s)) = args.first() else {
        return Err(arg_error("match", 1));
    };
    let Some(Value::Function(Callable::Matcher(m))) = args.get(1) else {
        return Err(arg_error("match", 2));
    };
    let limit = match args.get(2) {
        Some(Value::Number(n)) => {
            if *n < 0.0 {
                return Err(arg_error("match", 3));
            }
            n.floor() as usize
        }
        Some(Value::Undefined) | None => usize::MAX,
        Some(_) => return Err(arg_error("match", 3)),
    };
    let mut out = Vec::new();
    for caps in m.regex.captures_iter(s) {
        if out.len() >= limit {
            break;
        }
        out.push(simple_match_record(s, &caps));
    }
    Ok(Value::user_array(out))
}
