/// String functions. All positions and lengths are in Unicode code points,
/// not bytes.
use crate::error::EvalError;
use crate::value::{Callable, Value};

use super::super::eval::apply;
use super::super::value_ops::string_of;
use super::arg_error;
use super::regexes;

fn str_arg<'a>(args: &'a [Value], name: &str, index: usize) -> Result<&'a str, EvalError> {
    args.get(index - 1)
        .and_then(Value::as_str)
        .ok_or_else(|| arg_error(name, index))
}

/// `$string(v)` — JSON-style stringification; callables become "".
pub(super) fn string(args: &[Value]) -> Result<Value, EvalError> {
    if let Value::Number(n) = &args[0] {
        if n.is_nan() {
            return Err(EvalError::NumberNaN);
        }
        if n.is_infinite() {
            return Err(EvalError::NumberInf { value: *n });
        }
    }
    Ok(Value::String(string_of(&args[0])))
}

/// `$length(s)` — code points.
pub(super) fn length(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "length", 1)?;
    Ok(Value::Number(s.chars().count() as f64))
}

/// `$substring(s, start, len?)` — negative start counts from the end.
pub(super) fn substring(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "substring", 1)?;
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len() as f64;
    let Some(Value::Number(start)) = args.get(1) else {
        return Err(arg_error("substring", 2));
    };
    let mut start = start.floor();
    if start < 0.0 {
        start = (n + start).max(0.0);
    }
    let end = match args.get(2) {
        Some(Value::Number(len)) => start + len.floor().max(0.0),
        Some(Value::Undefined) | None => n,
        Some(_) => return Err(arg_error("substring", 3)),
    };
    let start = (start.min(n)) as usize;
    let end = (end.min(n)).max(start as f64) as usize;
    Ok(Value::String(chars[start..end].iter().collect()))
}

/// `$substringBefore(s, chars)` — s when the separator is absent.
pub(super) fn substring_before(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "substringBefore", 1)?;
    let sep = str_arg(args, "substringBefore", 2)?;
    Ok(Value::String(match s.find(sep) {
        Some(i) => s[..i].to_string(),
        None => s.to_string(),
    }))
}

/// `$substringAfter(s, chars)` — s when the separator is absent.
pub(super) fn substring_after(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "substringAfter", 1)?;
    let sep = str_arg(args, "substringAfter", 2)?;
    Ok(Value::String(match s.find(sep) {
        Some(i) => s[i + sep.len()..].to_string(),
        None => s.to_string(),
    }))
}

pub(super) fn lowercase(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "lowercase", 1)?;
    Ok(Value::String(s.to_lowercase()))
}

pub(super) fn uppercase(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "uppercase", 1)?;
    Ok(Value::String(s.to_uppercase()))
}

/// `$trim(s)` — strips the ends and collapses internal whitespace runs.
pub(super) fn trim(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "trim", 1)?;
    Ok(Value::String(
        s.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

/// `$pad(s, width, chars?)` — negative width pads on the left.
pub(super) fn pad(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "pad", 1)?;
    let Some(Value::Number(width)) = args.get(1) else {
        return Err(arg_error("pad", 2));
    };
    let fill_chars: Vec<char> = match args.get(2) {
        Some(Value::String(c)) => c.chars().collect(),
        Some(Value::Undefined) | None => vec![' '],
        Some(_) => return Err(arg_error("pad", 3)),
    };
    let len = s.chars().count();
    let target = width.abs().floor() as usize;
    if target <= len || fill_chars.is_empty() {
        return Ok(Value::String(s.to_string()));
    }
    let fill: String = fill_chars.iter().cycle().take(target - len).collect();
    Ok(Value::String(if *width < 0.0 {
        format!("{fill}{s}")
    } else {
        format!("{s}{fill}")
    }))
}

/// `$contains(s, pat)` — pat is a string or a regex matcher.
pub(super) fn contains(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "contains", 1)?;
    match args.get(1) {
        Some(Value::String(p)) => Ok(Value::Bool(s.contains(p.as_str()))),
        Some(Value::Function(Callable::Matcher(m))) => Ok(Value::Bool(m.regex.is_match(s))),
        _ => Err(arg_error("contains", 2)),
    }
}

/// `$split(s, sep, limit?)` — sep is a string or a regex matcher; limit
/// bounds the number of substrings returned.
pub(super) fn split(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "split", 1)?;
    let limit = match args.get(2) {
        Some(Value::Number(n)) => {
            if *n < 0.0 {
                return Err(arg_error("split", 3));
            }
            n.floor() as usize
        }
        Some(Value::Undefined) | None => usize::MAX,
        Some(_) => return Err(arg_error("split", 3)),
    };
    let parts: Vec<String> = match args.get(1) {
        Some(Value::String(sep)) => {
            if sep.is_empty() {
                s.chars().map(|c| c.to_string()).collect()
            } else {
                s.split(sep.as_str()).map(str::to_string).collect()
            }
        }
        Some(Value::Function(Callable::Matcher(m))) => {
            m.regex.split(s).map(str::to_string).collect()
        }
        _ => return Err(arg_error("split", 2)),
    };
    Ok(Value::user_array(
        parts
            .into_iter()
            .take(limit)
            .map(Value::String)
            .collect(),
    ))
}

/// `$join(array, sep?)`.
pub(super) fn join(args: &[Value]) -> Result<Value, EvalError> {
    let Value::Array(items, _) = &args[0] else {
        return Err(arg_error("join", 1));
    };
    let sep = match args.get(1) {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Undefined) | None => "",
        Some(_) => return Err(arg_error("join", 2)),
    };
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => parts.push(s.as_str()),
            _ => return Err(arg_error("join", 1)),
        }
    }
    Ok(Value::String(parts.join(sep)))
}

/// `$replace(s, pat, repl, limit?)` — pat is a string or a regex matcher;
/// repl is a string (with `$N` group references for regex patterns) or a
/// callable receiving the match record and returning a string.
pub(super) fn replace(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, "replace", 1)?;
    let limit = match args.get(3) {
        Some(Value::Number(n)) => {
            if *n < 0.0 {
                return Err(arg_error("replace", 4));
            }
            n.floor() as usize
        }
        Some(Value::Undefined) | None => usize::MAX,
        Some(_) => return Err(arg_error("replace", 4)),
    };
    if limit == 0 {
        return Ok(Value::String(s.to_string()));
    }

    match args.get(1) {
        Some(Value::String(pat)) => {
            if pat.is_empty() {
                return Err(arg_error("replace", 2));
            }
            let Some(Value::String(repl)) = args.get(2) else {
                return Err(arg_error("replace", 3));
            };
            let mut out = String::with_capacity(s.len());
            let mut rest = s;
            let mut done = 0;
            while done < limit {
                match rest.find(pat.as_str()) {
                    Some(i) => {
                        out.push_str(&rest[..i]);
                        out.push_str(repl);
                        rest = &rest[i + pat.len()..];
                        done += 1;
                    }
                    None => break,
                }
            }
            out.push_str(rest);
            Ok(Value::String(out))
        }
        Some(Value::Function(Callable::Matcher(m))) => {
            let mut out = String::with_capacity(s.len());
            let mut last = 0;
            let mut done = 0;
            while done < limit {
                let Some(caps) = m.regex.captures_at(s, last) else {
                    break;
                };
                let whole = caps.get(0).expect("group 0 always matches");
                out.push_str(&s[last..whole.start()]);
                match args.get(2) {
                    Some(Value::String(repl)) => {
                        out.push_str(&expand_replacement(repl, &caps));
                    }
                    Some(Value::Function(f)) => {
                        let record = regexes::simple_match_record(s, &caps);
                        let r = apply(f, &[record], &Value::Undefined)?;
                        match r {
                            Value::String(rs) => out.push_str(&rs),
                            _ => return Err(arg_error("replace", 3)),
                        }
                    }
                    _ => return Err(arg_error("replace", 3)),
                }
                // A zero-width match must still make progress.
                last = if whole.end() > whole.start() {
                    whole.end()
                } else {
                    let step = s[whole.end()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    out.push_str(&s[whole.end()..whole.end() + step.min(s.len() - whole.end())]);
                    whole.end() + step
                };
                if last > s.len() {
                    break;
                }
                done += 1;
            }
            if last <= s.len() {
                out.push_str(&s[last..]);
            }
            Ok(Value::String(out))
        }
        _ => Err(arg_error("replace", 2)),
    }
}

/// Expand `$N` group references: `$$` and a trailing `$` are literal, `$`
/// before a non-digit is literal, and a digit run prefers the longest
/// valid group index with the remaining digits kept as text.
fn expand_replacement(repl: &str, caps: &regex::Captures) -> String {
    let chars: Vec<char> = repl.chars().collect();
    let group_count = caps.len() - 1;
    let mut out = String::with_capacity(repl.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            None => {
                out.push('$');
                i += 1;
            }
            Some('$') => {
                out.push('$');
                i += 2;
            }
            Some(d) if d.is_ascii_digit() => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                let digits: String = chars[i + 1..j].iter().collect();
                let mut taken = digits.len();
                loop {
                    let candidate = digits[..taken].parse::<usize>().ok();
                    match candidate {
                        Some(g) if g <= group_count => {
                            out.push_str(caps.get(g).map_or("", |m| m.as_str()));
                            out.push_str(&digits[taken..]);
                            break;
                        }
                        _ if taken > 1 => taken -= 1,
                        // No valid group: the reference expands to nothing.
                        _ => break,
                    }
                }
                i = j;
            }
            Some(_) => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}
