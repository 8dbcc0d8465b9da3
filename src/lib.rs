//! A JSONata expression compiler and evaluator.
//!
//! JSONata is a small functional query and transformation language over
//! JSON-shaped data. This crate compiles an expression string into an
//! executable [`Expression`] and evaluates it against an input [`Value`],
//! producing a JSON-shaped result:
//!
//! ```
//! use serde_json::json;
//!
//! let expr = jsonata::compile("$sum(orders.(price * quantity))").unwrap();
//! let input = jsonata::Value::from(json!({
//!     "orders": [
//!         {"price": 10, "quantity": 3},
//!         {"price": 0.5, "quantity": 10},
//!         {"price": 100, "quantity": 1}
//!     ]
//! }));
//! assert_eq!(expr.evaluate(&input).unwrap(), jsonata::Value::Number(135.0));
//! ```
//!
//! Compilation and evaluation are synchronous and single-threaded per call;
//! a compiled expression is immutable and each `evaluate` call owns a fresh
//! environment chain.

pub mod error;
pub mod expr;
pub mod value;

pub use error::{Error, EvalError, ParseError, Result};
pub use value::Value;

use std::rc::Rc;

use expr::Node;
use expr::frame::Frame;
use value::Callable;

/// A callable provided by the host and registered with
/// [`Expression::bind_callable`]. Built-ins satisfy the same contract
/// internally: a name, a declared parameter count, an optional type
/// signature, and an invocation entry point.
pub trait HostCallable {
    fn name(&self) -> &str;
    fn param_count(&self) -> usize;
    fn signature(&self) -> Option<&str> {
        None
    }
    fn invoke(&self, args: &[Value]) -> std::result::Result<Value, EvalError>;
}

/// A compiled JSONata expression. Create with [`compile`], optionally bind
/// host values and callables, then [`evaluate`](Expression::evaluate)
/// against inputs.
pub struct Expression {
    ast: Node,
    bindings: Vec<(String, Value)>,
}

/// Compile an expression string into an [`Expression`].
pub fn compile(source: &str) -> Result<Expression> {
    let ast = expr::parser::parse(source)?;
    tracing::debug!(source_len = source.len(), "compiled expression");
    Ok(Expression {
        ast,
        bindings: Vec::new(),
    })
}

impl Expression {
    /// Bind a value to `$name` for every subsequent evaluation.
    pub fn bind_value(&mut self, name: &str, value: Value) {
        self.bindings.push((name.to_string(), value));
    }

    /// Bind a host callable to `$name` for every subsequent evaluation.
    pub fn bind_callable(&mut self, name: &str, callable: Rc<dyn HostCallable>) {
        self.bindings
            .push((name.to_string(), Value::Function(Callable::Host(callable))));
    }

    /// Evaluate against an input value. The result may be
    /// [`Value::Undefined`] when the expression selects nothing; that is a
    /// value, not an error.
    pub fn evaluate(&self, input: &Value) -> Result<Value> {
        tracing::trace!("evaluating expression");
        let frame = Frame::new_evaluation(input);
        for (name, value) in &self.bindings {
            frame.bind(name, value.clone());
        }
        let result = expr::eval::eval(&self.ast, input, &frame)?;
        Ok(expr::eval::finalize(result))
    }

    /// The compiled AST in canonical printed form.
    pub fn to_canonical(&self) -> String {
        self.ast.to_string()
    }
}
