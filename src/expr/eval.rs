/// Tree-walking evaluator.
///
/// Reduces an AST and an input value to a result value under a frame chain.
/// Sequences produced by path traversal flatten at step boundaries and
/// collapse at result boundaries; `Undefined` propagates silently through
/// most operators.
use std::rc::Rc;

use crate::error::{EvalError, MAX_RANGE_ITEMS};
use crate::value::{ArrayFlags, Callable, Composed, Lambda, Partial, Transformer, Value};

use super::frame::Frame;
use super::functions::{self, regexes};
use super::value_ops::{self, is_truthy};
use super::{BooleanOp, ComparisonOp, Node, NodeKind, NumericOp, SortTerm};

/// Evaluate a node against an input value. The result is fully collapsed:
/// an empty sequence has become Undefined and a singleton sequence has
/// unwrapped, unless a keep-arrays marker forbids it.
pub fn eval(node: &Node, input: &Value, frame: &Frame) -> Result<Value, EvalError> {
    match &node.kind {
        NodeKind::Null => Ok(Value::Null),
        NodeKind::Bool(b) => Ok(Value::Bool(*b)),
        NodeKind::Number(n) => Ok(Value::Number(*n)),
        NodeKind::Str(s) => Ok(Value::String(s.clone())),
        NodeKind::Regex { pattern, flags } => Ok(Value::Function(Callable::Matcher(Rc::new(
            regexes::matcher(pattern, flags).expect("regex validated at parse time"),
        )))),
        NodeKind::Var(name) => Ok(match name.as_str() {
            "" => input.clone(),
            _ => frame
                .lookup(name)
                .or_else(|| {
                    functions::lookup(name).map(|b| Value::Function(Callable::Builtin(b)))
                })
                .unwrap_or(Value::Undefined),
        }),
        NodeKind::Name(name) => Ok(finalize(lookup_name(input, name))),
        NodeKind::EscapedName(name) => Ok(finalize(lookup_name(input, name))),
        NodeKind::Wildcard => {
            let mut out = Vec::new();
            wildcard_into(input, &mut out);
            Ok(finalize(Value::sequence(out)))
        }
        NodeKind::Descendent => {
            let mut out = Vec::new();
            descendants_into(input, &mut out);
            Ok(finalize(Value::sequence(out)))
        }
        NodeKind::Neg(expr) => {
            let v = eval(expr, input, frame)?;
            match v {
                Value::Undefined => Ok(Value::Undefined),
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(EvalError::NonNumberRhs {
                    position: node.position,
                    op: "-".into(),
                }),
            }
        }
        NodeKind::Range(lhs, rhs) => {
            let l = eval(lhs, input, frame)?;
            let r = eval(rhs, input, frame)?;
            Ok(finalize(eval_range(&l, &r, node.position)?))
        }
        NodeKind::ArrayConstruct(items) => {
            let mut out = Vec::new();
            for item in items {
                let v = eval(item, input, frame)?;
                append_step_result(&mut out, v);
            }
            Ok(Value::user_array(out))
        }
        NodeKind::ObjectConstruct(pairs) => eval_object(pairs, input, frame),
        NodeKind::Block(exprs) => {
            let scope = frame.child();
            let mut result = Value::Undefined;
            for expr in exprs {
                result = eval(expr, input, &scope)?;
            }
            Ok(result)
        }
        NodeKind::Path { steps, keep_arrays } => eval_path(steps, *keep_arrays, input, frame),
        NodeKind::Group { input: src, pairs } => {
            let v = eval(src, input, frame)?;
            eval_group(&v, pairs, frame)
        }
        NodeKind::Predicate { expr, filters } => {
            let mut current = eval(expr, input, frame)?;
            for filter in filters {
                current = apply_filter(current, filter, frame)?;
            }
            Ok(finalize(current))
        }
        NodeKind::Conditional {
            cond,
            then,
            otherwise,
        } => {
            let c = eval(cond, input, frame)?;
            if is_truthy(&c) {
                eval(then, input, frame)
            } else if let Some(e) = otherwise {
                eval(e, input, frame)
            } else {
                Ok(Value::Undefined)
            }
        }
        NodeKind::Assignment { name, value } => {
            let v = eval(value, input, frame)?;
            frame.bind(name, v.clone());
            Ok(v)
        }
        NodeKind::Lambda {
            params,
            body,
            signature,
            ..
        } => Ok(Value::Function(Callable::Lambda(Rc::new(Lambda {
            params: params.clone(),
            body: body.clone(),
            frame: frame.clone(),
            input: input.clone(),
            signature: signature.clone(),
        })))),
        NodeKind::Placeholder => Ok(Value::Undefined),
        NodeKind::FunctionCall { proc, args } => {
            let f = eval(proc, input, frame)?;
            let mut argv = Vec::with_capacity(args.len());
            for arg in args {
                argv.push(eval(arg, input, frame)?);
            }
            let Some(callable) = f.as_callable() else {
                return Err(EvalError::NonCallable {
                    position: node.position,
                    name: call_hint(proc),
                });
            };
            apply(callable, &argv, input)
        }
        NodeKind::PartialCall { proc, args } => {
            let f = eval(proc, input, frame)?;
            let Some(callable) = f.as_callable() else {
                return Err(EvalError::NonCallablePartial {
                    position: node.position,
                });
            };
            let mut slots = Vec::with_capacity(args.len());
            for arg in args {
                match arg.kind {
                    NodeKind::Placeholder => slots.push(None),
                    _ => slots.push(Some(eval(arg, input, frame)?)),
                }
            }
            Ok(Value::Function(Callable::Partial(Rc::new(Partial {
                callable: callable.clone(),
                args: slots,
            }))))
        }
        NodeKind::Apply { lhs, rhs } => eval_apply(lhs, rhs, input, frame),
        NodeKind::Sort { expr, terms } => eval_sort(expr, terms, input, frame, node.position),
        NodeKind::Numeric { op, lhs, rhs } => {
            let l = eval(lhs, input, frame)?;
            let r = eval(rhs, input, frame)?;
            eval_numeric(*op, &l, &r, node.position)
        }
        NodeKind::Comparison { op, lhs, rhs } => {
            let l = eval(lhs, input, frame)?;
            let r = eval(rhs, input, frame)?;
            eval_comparison(*op, l, r, node.position)
        }
        NodeKind::Boolean { op, lhs, rhs } => {
            let l = is_truthy(&eval(lhs, input, frame)?);
            match op {
                BooleanOp::And => {
                    if !l {
                        return Ok(Value::Bool(false));
                    }
                }
                BooleanOp::Or => {
                    if l {
                        return Ok(Value::Bool(true));
                    }
                }
            }
            let r = is_truthy(&eval(rhs, input, frame)?);
            Ok(Value::Bool(r))
        }
        NodeKind::Concat { lhs, rhs } => {
            let l = eval(lhs, input, frame)?;
            let r = eval(rhs, input, frame)?;
            // Undefined contributes an empty string.
            Ok(Value::String(format!(
                "{}{}",
                value_ops::string_of(&l),
                value_ops::string_of(&r)
            )))
        }
        NodeKind::Transform {
            pattern,
            update,
            delete,
        } => Ok(Value::Function(Callable::Transformer(Rc::new(
            Transformer {
                pattern: pattern.clone(),
                update: update.clone(),
                delete: delete.clone(),
                frame: frame.clone(),
            },
        )))),
    }
}

/// Collapse a sequence at a result boundary.
pub fn finalize(v: Value) -> Value {
    match v {
        Value::Array(items, flags) if flags.sequence => {
            if items.is_empty() {
                Value::Undefined
            } else if items.len() == 1 && !flags.keep_singleton {
                items.into_iter().next().expect("length checked")
            } else {
                Value::Array(items, flags)
            }
        }
        other => other,
    }
}

/// Fan a value out into the item list a path step iterates over.
fn fan_out(v: Value) -> Vec<Value> {
    match v {
        Value::Undefined => Vec::new(),
        Value::Array(items, _) => items,
        other => vec![other],
    }
}

/// Append a step result to an output sequence: sequences and plain JSON
/// arrays flatten, user arrays and scalars append whole, Undefined vanishes.
fn append_step_result(out: &mut Vec<Value>, v: Value) {
    match v {
        Value::Undefined => {}
        Value::Array(items, flags) if !flags.constructed => out.extend(items),
        other => out.push(other),
    }
}

fn eval_path(
    steps: &[Node],
    keep_arrays: bool,
    input: &Value,
    frame: &Frame,
) -> Result<Value, EvalError> {
    let mut current = eval(&steps[0], input, frame)?;

    for (i, step) in steps.iter().enumerate().skip(1) {
        let last = i == steps.len() - 1;
        let items = fan_out(current);
        let mut raw: Vec<Value> = Vec::new();
        for item in &items {
            let res = eval(step, item, frame)?;
            if !res.is_undefined() {
                raw.push(res);
            }
        }
        // A final step that produced exactly one explicit array keeps it
        // whole, so `foo.bar` returns the array stored at bar.
        if last
            && raw.len() == 1
            && matches!(&raw[0], Value::Array(_, flags) if !flags.sequence)
        {
            current = raw.into_iter().next().expect("length checked");
        } else {
            let mut out = Vec::new();
            for res in raw {
                append_step_result(&mut out, res);
            }
            current = Value::sequence(out);
        }
    }

    if keep_arrays {
        Ok(match current {
            Value::Undefined => Value::Undefined,
            Value::Array(items, _) if items.is_empty() => Value::Undefined,
            Value::Array(items, mut flags) => {
                flags.sequence = true;
                flags.keep_singleton = true;
                Value::Array(items, flags)
            }
            other => Value::Array(
                vec![other],
                ArrayFlags {
                    sequence: true,
                    constructed: false,
                    keep_singleton: true,
                },
            ),
        })
    } else {
        Ok(finalize(current))
    }
}

/// Name lookup: object entry, or fan-out over an array.
fn lookup_name(input: &Value, name: &str) -> Value {
    match input {
        Value::Object(_) => input.entry(name),
        Value::Array(items, _) => {
            let mut out = Vec::new();
            for item in items {
                append_step_result(&mut out, lookup_name(item, name));
            }
            Value::sequence(out)
        }
        _ => Value::Undefined,
    }
}

/// Wildcard: every value of an object, arrays flattened; fans out over
/// arrays.
fn wildcard_into(input: &Value, out: &mut Vec<Value>) {
    match input {
        Value::Object(pairs) => {
            for (_, v) in pairs {
                flatten_into(v, out);
            }
        }
        Value::Array(items, _) => {
            for item in items {
                wildcard_into(item, out);
            }
        }
        _ => {}
    }
}

fn flatten_into(v: &Value, out: &mut Vec<Value>) {
    match v {
        Value::Undefined => {}
        Value::Array(items, _) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        other => out.push(other.clone()),
    }
}

/// Descendants in pre-order: objects and scalars are emitted, arrays are
/// traversed without being emitted themselves.
fn descendants_into(input: &Value, out: &mut Vec<Value>) {
    match input {
        Value::Undefined => {}
        Value::Array(items, _) => {
            for item in items {
                descendants_into(item, out);
            }
        }
        Value::Object(pairs) => {
            out.push(input.clone());
            for (_, v) in pairs {
                descendants_into(v, out);
            }
        }
        other => out.push(other.clone()),
    }
}

/// `expr[filter]`: numbers index (negative from the end, non-integers
/// floored), arrays of numbers and booleans select per element, anything
/// else gates by truthiness with the item as context.
fn apply_filter(value: Value, filter: &Node, frame: &Frame) -> Result<Value, EvalError> {
    if value.is_undefined() {
        return Ok(Value::Undefined);
    }
    let items = fan_out(value);
    let len = items.len() as f64;
    let mut out = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let res = eval(filter, item, frame)?;
        if filter_keeps(&res, index as f64, len) {
            out.push(item.clone());
        }
    }
    Ok(Value::sequence(out))
}

fn index_matches(n: f64, index: f64, len: f64) -> bool {
    let wanted = n.floor();
    let wanted = if wanted < 0.0 { len + wanted } else { wanted };
    wanted == index
}

fn filter_keeps(res: &Value, index: f64, len: f64) -> bool {
    match res {
        Value::Number(n) => index_matches(*n, index, len),
        Value::Array(entries, _) => entries.iter().any(|e| match e {
            Value::Number(n) => index_matches(*n, index, len),
            other => is_truthy(other),
        }),
        other => is_truthy(other),
    }
}

fn eval_range(l: &Value, r: &Value, position: usize) -> Result<Value, EvalError> {
    let lo = match l {
        Value::Undefined => return Ok(Value::sequence(Vec::new())),
        Value::Number(n) if n.fract() == 0.0 => *n,
        _ => return Err(EvalError::NonIntegerLhs { position }),
    };
    let hi = match r {
        Value::Undefined => return Ok(Value::sequence(Vec::new())),
        Value::Number(n) if n.fract() == 0.0 => *n,
        _ => return Err(EvalError::NonIntegerRhs { position }),
    };
    if lo > hi {
        return Ok(Value::sequence(Vec::new()));
    }
    let size = hi - lo + 1.0;
    if size > MAX_RANGE_ITEMS {
        return Err(EvalError::MaxRangeItems { position, size });
    }
    let mut out = Vec::with_capacity(size as usize);
    let mut n = lo;
    while n <= hi {
        out.push(Value::Number(n));
        n += 1.0;
    }
    Ok(Value::sequence(out))
}

fn eval_object(
    pairs: &[(Node, Node)],
    input: &Value,
    frame: &Frame,
) -> Result<Value, EvalError> {
    let mut obj: Vec<(String, Value)> = Vec::with_capacity(pairs.len());
    for (knode, vnode) in pairs {
        let k = eval(knode, input, frame)?;
        let key = match k {
            Value::String(s) => s,
            other => {
                return Err(EvalError::IllegalKey {
                    position: knode.position,
                    value: value_ops::string_of(&other),
                });
            }
        };
        if obj.iter().any(|(existing, _)| existing == &key) {
            return Err(EvalError::DuplicateKey {
                position: knode.position,
                key,
            });
        }
        let v = eval(vnode, input, frame)?;
        if !v.is_undefined() {
            obj.push((key, v));
        }
    }
    Ok(Value::Object(obj))
}

/// Grouping: each input item is bucketed under its evaluated keys, then
/// each pair's value expression runs once per bucket with the collected
/// items as context.
fn eval_group(
    input: &Value,
    pairs: &[(Node, Node)],
    frame: &Frame,
) -> Result<Value, EvalError> {
    if input.is_undefined() {
        return Ok(Value::Undefined);
    }
    let items = fan_out(input.clone());

    struct Bucket {
        key: String,
        pair: usize,
        items: Vec<Value>,
    }
    let mut buckets: Vec<Bucket> = Vec::new();

    for item in &items {
        for (pi, (knode, _)) in pairs.iter().enumerate() {
            let k = eval(knode, item, frame)?;
            let key = match k {
                Value::Undefined => continue,
                Value::String(s) => s,
                other => {
                    return Err(EvalError::IllegalKey {
                        position: knode.position,
                        value: value_ops::string_of(&other),
                    });
                }
            };
            match buckets.iter_mut().find(|b| b.key == key) {
                Some(bucket) => {
                    if bucket.pair != pi {
                        return Err(EvalError::DuplicateKey {
                            position: knode.position,
                            key,
                        });
                    }
                    bucket.items.push(item.clone());
                }
                None => buckets.push(Bucket {
                    key,
                    pair: pi,
                    items: vec![item.clone()],
                }),
            }
        }
    }

    let mut obj: Vec<(String, Value)> = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let context = finalize(Value::sequence(bucket.items));
        let (_, vnode) = &pairs[bucket.pair];
        let v = eval(vnode, &context, frame)?;
        if !v.is_undefined() {
            obj.push((bucket.key, v));
        }
    }
    Ok(Value::Object(obj))
}

fn call_hint(proc: &Node) -> Option<String> {
    match &proc.kind {
        NodeKind::Name(name) if functions::lookup(name).is_some() => Some(name.clone()),
        _ => None,
    }
}

fn eval_apply(lhs: &Node, rhs: &Node, input: &Value, frame: &Frame) -> Result<Value, EvalError> {
    // `x ~> $f(a, b)` invokes $f with x as the first argument.
    if let NodeKind::FunctionCall { proc, args } = &rhs.kind {
        let chained = eval(lhs, input, frame)?;
        let f = eval(proc, input, frame)?;
        let Some(callable) = f.as_callable() else {
            return Err(EvalError::NonCallableApply {
                position: rhs.position,
            });
        };
        let mut argv = vec![chained];
        for arg in args {
            argv.push(eval(arg, input, frame)?);
        }
        return apply(callable, &argv, input);
    }

    let l = eval(lhs, input, frame)?;
    let r = eval(rhs, input, frame)?;
    let Some(rc) = r.as_callable() else {
        return Err(EvalError::NonCallableApply {
            position: rhs.position,
        });
    };
    if let Some(lc) = l.as_callable() {
        // Both sides callable: composition.
        return Ok(Value::Function(Callable::Composed(Rc::new(Composed {
            first: lc.clone(),
            second: rc.clone(),
        }))));
    }
    apply(rc, &[l], input)
}

fn eval_numeric(op: NumericOp, l: &Value, r: &Value, position: usize) -> Result<Value, EvalError> {
    if l.is_undefined() || r.is_undefined() {
        return Ok(Value::Undefined);
    }
    let Some(a) = l.as_number() else {
        return Err(EvalError::NonNumberLhs {
            position,
            op: op.symbol().into(),
        });
    };
    let Some(b) = r.as_number() else {
        return Err(EvalError::NonNumberRhs {
            position,
            op: op.symbol().into(),
        });
    };
    let result = match op {
        NumericOp::Add => a + b,
        NumericOp::Sub => a - b,
        NumericOp::Mul => a * b,
        NumericOp::Div => a / b,
        NumericOp::Rem => a % b,
    };
    checked_number(result)
}

/// Numeric results must stay inside the representable range.
pub fn checked_number(n: f64) -> Result<Value, EvalError> {
    if n.is_nan() {
        Err(EvalError::NumberNaN)
    } else if n.is_infinite() {
        Err(EvalError::NumberInf { value: n })
    } else {
        Ok(Value::Number(n))
    }
}

fn eval_comparison(
    op: ComparisonOp,
    l: Value,
    r: Value,
    position: usize,
) -> Result<Value, EvalError> {
    if l.is_undefined() || r.is_undefined() {
        return Ok(Value::Undefined);
    }
    match op {
        ComparisonOp::Eq => Ok(Value::Bool(l == r)),
        ComparisonOp::Ne => Ok(Value::Bool(l != r)),
        ComparisonOp::In => {
            let found = match &r {
                Value::Array(items, _) => items.iter().any(|item| item == &l),
                other => other == &l,
            };
            Ok(Value::Bool(found))
        }
        _ => {
            let ordering = match (&l, &r) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                (Value::Number(_) | Value::String(_), Value::Number(_) | Value::String(_)) => {
                    return Err(EvalError::TypeMismatch {
                        position,
                        op: op.symbol().into(),
                    });
                }
                (Value::Number(_) | Value::String(_), _) => {
                    return Err(EvalError::NonComparableRhs {
                        position,
                        op: op.symbol().into(),
                    });
                }
                _ => {
                    return Err(EvalError::NonComparableLhs {
                        position,
                        op: op.symbol().into(),
                    });
                }
            };
            let Some(ordering) = ordering else {
                return Err(EvalError::NumberNaN);
            };
            let keep = match op {
                ComparisonOp::Lt => ordering.is_lt(),
                ComparisonOp::Le => ordering.is_le(),
                ComparisonOp::Gt => ordering.is_gt(),
                ComparisonOp::Ge => ordering.is_ge(),
                _ => unreachable!("handled above"),
            };
            Ok(Value::Bool(keep))
        }
    }
}

fn eval_sort(
    expr: &Node,
    terms: &[SortTerm],
    input: &Value,
    frame: &Frame,
    position: usize,
) -> Result<Value, EvalError> {
    let v = eval(expr, input, frame)?;
    let (items, flags) = match v {
        Value::Undefined => return Ok(Value::Undefined),
        Value::Array(items, flags) => (items, flags),
        other => return Ok(other),
    };

    // Precompute the sort key for every item and term.
    let mut keyed: Vec<(Vec<Value>, Value)> = Vec::with_capacity(items.len());
    for item in items {
        let mut keys = Vec::with_capacity(terms.len());
        for term in terms {
            keys.push(eval(&term.expr, &item, frame)?);
        }
        keyed.push((keys, item));
    }

    let sorted = merge_sort(keyed, &mut |a, b| {
        for (ti, term) in terms.iter().enumerate() {
            let ka = &a.0[ti];
            let kb = &b.0[ti];
            let after = match (ka, kb) {
                (Value::Undefined, Value::Undefined) => continue,
                (Value::Undefined, _) => true,
                (_, Value::Undefined) => false,
                (Value::Number(x), Value::Number(y)) => {
                    if x == y {
                        continue;
                    }
                    x > y
                }
                (Value::String(x), Value::String(y)) => {
                    if x == y {
                        continue;
                    }
                    x > y
                }
                (Value::Number(_) | Value::String(_), Value::Number(_) | Value::String(_)) => {
                    return Err(EvalError::SortMismatch { position });
                }
                _ => return Err(EvalError::NonSortable { position }),
            };
            return Ok(if term.descending { !after } else { after });
        }
        Ok(false)
    })?;

    Ok(Value::Array(
        sorted.into_iter().map(|(_, item)| item).collect(),
        flags,
    ))
}

/// Stable merge sort with a fallible "a sorts after b" comparator.
fn merge_sort<T, F>(items: Vec<T>, after: &mut F) -> Result<Vec<T>, EvalError>
where
    F: FnMut(&T, &T) -> Result<bool, EvalError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut rest = items;
    let right = rest.split_off(rest.len() / 2);
    let left = merge_sort(rest, after)?;
    let right = merge_sort(right, after)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut li = left.into_iter().peekable();
    let mut ri = right.into_iter().peekable();
    loop {
        match (li.peek(), ri.peek()) {
            (Some(l), Some(r)) => {
                // Take from the left unless it sorts strictly after the
                // right; ties keep original order.
                if after(l, r)? {
                    out.push(ri.next().expect("peeked"));
                } else {
                    out.push(li.next().expect("peeked"));
                }
            }
            (Some(_), None) => out.push(li.next().expect("peeked")),
            (None, Some(_)) => out.push(ri.next().expect("peeked")),
            (None, None) => break,
        }
    }
    Ok(out)
}

/// Stable sort for `$sort`: comparator answers "does a sort after b".
pub fn merge_sort_values<F>(items: Vec<Value>, after: &mut F) -> Result<Vec<Value>, EvalError>
where
    F: FnMut(&Value, &Value) -> Result<bool, EvalError>,
{
    merge_sort(items, after)
}

/// Invoke a callable with already-evaluated arguments. `context` is the
/// evaluation context at the call site, used for context-bound parameters.
pub fn apply(callable: &Callable, args: &[Value], context: &Value) -> Result<Value, EvalError> {
    match callable {
        Callable::Lambda(l) => {
            let argv = match &l.signature {
                Some(sig) => sig.validate("lambda", args, context)?,
                None => args.to_vec(),
            };
            let scope = l.frame.child();
            for (i, param) in l.params.iter().enumerate() {
                scope.bind(param, argv.get(i).cloned().unwrap_or(Value::Undefined));
            }
            eval(&l.body, &l.input, &scope)
        }
        Callable::Builtin(b) => {
            let argv = match b.parsed_signature() {
                Some(sig) => sig.validate(b.name, args, context)?,
                None => args.to_vec(),
            };
            if argv.len() > b.max_args || argv.len() < b.min_args {
                return Err(EvalError::ArgCount {
                    function: b.name.to_string(),
                    got: argv.len(),
                    max: b.max_args,
                });
            }
            for &slot in b.undef_prop {
                if argv.get(slot).is_none_or(Value::is_undefined) {
                    return Ok(Value::Undefined);
                }
            }
            (b.func)(&argv)
        }
        Callable::Host(h) => {
            if let Some(src) = h.signature() {
                let sig = crate::expr::signature::parse(src, 0).map_err(|_| {
                    EvalError::ArgType {
                        function: h.name().to_string(),
                        index: 0,
                    }
                })?;
                let argv = sig.validate(h.name(), args, context)?;
                return h.invoke(&argv);
            }
            if args.len() > h.param_count() {
                return Err(EvalError::ArgCount {
                    function: h.name().to_string(),
                    got: args.len(),
                    max: h.param_count(),
                });
            }
            h.invoke(args)
        }
        Callable::Partial(p) => {
            let mut supplied = args.iter();
            let mut merged = Vec::with_capacity(p.args.len());
            for slot in &p.args {
                match slot {
                    Some(v) => merged.push(v.clone()),
                    None => merged.push(supplied.next().cloned().unwrap_or(Value::Undefined)),
                }
            }
            apply(&p.callable, &merged, context)
        }
        Callable::Composed(c) => {
            let mid = apply(&c.first, args, context)?;
            apply(&c.second, &[mid], context)
        }
        Callable::Matcher(m) => {
            let subject = match args.first() {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Undefined) | None => return Ok(Value::Undefined),
                Some(_) => {
                    return Err(EvalError::ArgType {
                        function: "match".into(),
                        index: 1,
                    });
                }
            };
            Ok(regexes::match_record(m, &subject, 0))
        }
        Callable::MatchCursor(c) => Ok(regexes::match_record(&c.matcher, &c.subject, c.from)),
        Callable::Transformer(t) => {
            let Some(target) = args.first() else {
                return Ok(Value::Undefined);
            };
            apply_transform(t, target)
        }
    }
}

/// Invoke a callable under the higher-order convention: pass only as many
/// of (value, index-or-key, collection) as the callable declares.
pub fn apply_trimmed(
    callable: &Callable,
    args: &[Value],
    context: &Value,
) -> Result<Value, EvalError> {
    let n = callable.param_count().max(1).min(args.len());
    apply(callable, &args[..n], context)
}

fn apply_transform(t: &Transformer, input: &Value) -> Result<Value, EvalError> {
    if input.is_undefined() {
        return Ok(Value::Undefined);
    }
    let copy = value_ops::clone_checked(input)?;
    let matched = eval(&t.pattern, &copy, &t.frame)?;
    let targets = fan_out(matched);
    if targets.is_empty() {
        return Ok(copy);
    }
    rewrite_matches(&copy, &targets, t)
}

/// Walk the copy bottom-up, replacing every subtree the pattern matched
/// with its updated form.
fn rewrite_matches(
    value: &Value,
    targets: &[Value],
    t: &Transformer,
) -> Result<Value, EvalError> {
    let rebuilt = match value {
        Value::Object(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                out.push((k.clone(), rewrite_matches(v, targets, t)?));
            }
            Value::Object(out)
        }
        Value::Array(items, flags) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(rewrite_matches(item, targets, t)?);
            }
            Value::Array(out, *flags)
        }
        other => other.clone(),
    };
    if targets.iter().any(|target| target == value) {
        apply_update(rebuilt, t)
    } else {
        Ok(rebuilt)
    }
}

fn apply_update(value: Value, t: &Transformer) -> Result<Value, EvalError> {
    let update = eval(&t.update, &value, &t.frame)?;
    let update_pairs = match update {
        Value::Undefined => Vec::new(),
        Value::Object(pairs) => pairs,
        other => {
            return Err(EvalError::IllegalUpdate {
                value: value_ops::string_of(&other),
            });
        }
    };

    // Merging only applies to object matches; other matches pass through.
    let mut pairs = match value {
        Value::Object(pairs) => pairs,
        other => return Ok(other),
    };
    for (k, v) in update_pairs {
        match pairs.iter_mut().find(|(existing, _)| existing == &k) {
            Some((_, slot)) => *slot = v,
            None => pairs.push((k, v)),
        }
    }

    let merged = Value::Object(pairs);
    let Some(delete) = &t.delete else {
        return Ok(merged);
    };
    let deletions = eval(delete, &merged, &t.frame)?;
    let keys: Vec<String> = match deletions {
        Value::Undefined => Vec::new(),
        Value::String(s) => vec![s],
        Value::Array(items, _) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => keys.push(s),
                    other => {
                        return Err(EvalError::IllegalDelete {
                            value: value_ops::string_of(&other),
                        });
                    }
                }
            }
            keys
        }
        other => {
            return Err(EvalError::IllegalDelete {
                value: value_ops::string_of(&other),
            });
        }
    };
    let Value::Object(pairs) = merged else {
        unreachable!("merged is an object");
    };
    Ok(Value::Object(
        pairs
            .into_iter()
            .filter(|(k, _)| !keys.contains(k))
            .collect(),
    ))
}
