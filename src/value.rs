/// Runtime value representation.
///
/// A tagged variant over JSON values plus the non-JSON runtime objects the
/// evaluator needs: callables, regex matchers, and the `Undefined` sentinel.
/// `Object` uses `Vec<(String, Value)>` to preserve key insertion order.
/// Arrays carry flags: *sequence* (produced by path traversal, flattens at
/// step boundaries and collapses singletons at result boundaries),
/// *constructed* (built by a constructor or library function, never
/// flattened), and *keep singleton* (trailing `[]`, disables the collapse).
use std::fmt;
use std::rc::Rc;

use crate::expr::Node;
use crate::expr::frame::Frame;
use crate::expr::functions::Builtin;
use crate::expr::signature::Signature;
use crate::HostCallable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayFlags {
    /// Produced by path traversal: flattens into enclosing sequences and
    /// collapses singletons at result boundaries.
    pub sequence: bool,
    /// Built by an array constructor or a library function: never flattened
    /// by path steps.
    pub constructed: bool,
    /// Trailing `[]` marker: exempt from singleton collapse.
    pub keep_singleton: bool,
}

impl ArrayFlags {
    pub const SEQUENCE: ArrayFlags = ArrayFlags {
        sequence: true,
        constructed: false,
        keep_singleton: false,
    };
    pub const CONSTRUCTED: ArrayFlags = ArrayFlags {
        sequence: false,
        constructed: true,
        keep_singleton: false,
    };
}

#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value. Not representable in JSON output.
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>, ArrayFlags),
    Object(Vec<(String, Value)>),
    Function(Callable),
}

impl Value {
    /// A plain JSON array, as found in input documents. Path steps flatten
    /// these into their result sequences.
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(items, ArrayFlags::default())
    }

    /// A user array (array literal, `$map` result, ...). Never flattened or
    /// collapsed by path traversal.
    pub fn user_array(items: Vec<Value>) -> Value {
        Value::Array(items, ArrayFlags::CONSTRUCTED)
    }

    /// A sequence produced by path traversal.
    pub fn sequence(items: Vec<Value>) -> Value {
        Value::Array(items, ArrayFlags::SEQUENCE)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(..) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Array(_, flags) if flags.sequence)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a key on an object. Returns Undefined for non-objects and
    /// missing keys.
    pub fn entry(&self, key: &str) -> Value {
        match self {
            Value::Object(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Convert to a `serde_json::Value`. Returns None for Undefined and
    /// callables at the top level; nested, object entries holding them are
    /// omitted and array slots holding them become null.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => {
                // Integral doubles serialize as JSON integers.
                if n.fract() == 0.0 && n.abs() < 9e15 {
                    Some(serde_json::Value::Number(serde_json::Number::from(
                        *n as i64,
                    )))
                } else {
                    serde_json::Number::from_f64(*n).map(serde_json::Value::Number)
                }
            }
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Array(items, _) => Some(serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(pairs) => Some(serde_json::Value::Object(
                pairs
                    .iter()
                    .filter_map(|(k, v)| v.to_json().map(|j| (k.clone(), j)))
                    .collect(),
            )),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Structural equality. Array flags are ignored; objects compare without
/// regard to key order; callables are equal only if they are the same object.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a, _), Value::Array(b, _)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (Value::Function(a), Value::Function(b)) => a.same_object(b),
            _ => false,
        }
    }
}

/// An invocable runtime object: a built-in, a user lambda closed over its
/// environment, a partial application, a composition, a regex matcher, or a
/// transform.
#[derive(Clone)]
pub enum Callable {
    Builtin(&'static Builtin),
    Lambda(Rc<Lambda>),
    Partial(Rc<Partial>),
    Composed(Rc<Composed>),
    Matcher(Rc<Matcher>),
    MatchCursor(Rc<MatchCursor>),
    Transformer(Rc<Transformer>),
    Host(Rc<dyn HostCallable>),
}

/// A user lambda: parameters, body, and the environment and context value
/// captured at creation.
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub frame: Frame,
    pub input: Value,
    pub signature: Option<Signature>,
}

/// A partial application; `None` slots are placeholders filled at invocation.
pub struct Partial {
    pub callable: Callable,
    pub args: Vec<Option<Value>>,
}

/// `x -> second(first(x))`, produced by `f ~> g` over two callables.
pub struct Composed {
    pub first: Callable,
    pub second: Callable,
}

/// A compiled regex literal. Invoking it on a string yields the first match
/// record, whose `next` entry is a `MatchCursor`.
pub struct Matcher {
    pub regex: regex::Regex,
    pub pattern: String,
    pub flags: String,
}

/// Continuation over a subject string: yields the next match at or after
/// `from`, or Undefined when the matches are exhausted.
pub struct MatchCursor {
    pub matcher: Rc<Matcher>,
    pub subject: String,
    pub from: usize,
}

/// A transform expression `|pattern|update[,delete]|` closed over its
/// environment; applied to an input via `~>` or a direct call.
pub struct Transformer {
    pub pattern: Rc<Node>,
    pub update: Rc<Node>,
    pub delete: Option<Rc<Node>>,
    pub frame: Frame,
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Builtin(b) => b.name,
            Callable::Lambda(_) => "lambda",
            Callable::Partial(p) => p.callable.name(),
            Callable::Composed(_) => "",
            Callable::Matcher(_) => "match",
            Callable::MatchCursor(_) => "next",
            Callable::Transformer(_) => "transform",
            Callable::Host(h) => h.name(),
        }
    }

    /// Declared parameter count, used by the higher-order calling convention
    /// (callables receive only as many arguments as they declare).
    pub fn param_count(&self) -> usize {
        match self {
            Callable::Builtin(b) => b.max_args,
            Callable::Lambda(l) => l.params.len(),
            Callable::Partial(p) => p.args.iter().filter(|a| a.is_none()).count(),
            Callable::Composed(_) => 1,
            Callable::Matcher(_) => 1,
            Callable::MatchCursor(_) => 0,
            Callable::Transformer(_) => 1,
            Callable::Host(h) => h.param_count(),
        }
    }

    fn same_object(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Builtin(a), Callable::Builtin(b)) => std::ptr::eq(*a, *b),
            (Callable::Lambda(a), Callable::Lambda(b)) => Rc::ptr_eq(a, b),
            (Callable::Partial(a), Callable::Partial(b)) => Rc::ptr_eq(a, b),
            (Callable::Composed(a), Callable::Composed(b)) => Rc::ptr_eq(a, b),
            (Callable::Matcher(a), Callable::Matcher(b)) => Rc::ptr_eq(a, b),
            (Callable::MatchCursor(a), Callable::MatchCursor(b)) => Rc::ptr_eq(a, b),
            (Callable::Transformer(a), Callable::Transformer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function:{}>", self.name())
    }
}
