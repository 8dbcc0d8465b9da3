//! Expression compiler and evaluator: lexer, Pratt parser, AST, environment,
//! tree-walking interpreter, and the built-in function library.
pub mod eval;
pub mod frame;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod signature;
pub(crate) mod value_ops;

use std::fmt;
use std::rc::Rc;

use signature::Signature;

/// An AST node: the kind plus the byte offset of the token that produced it.
/// Structural equality ignores positions.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: usize,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(position: usize, kind: NodeKind) -> Node {
        Node { position, kind }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl NumericOp {
    pub fn symbol(self) -> &'static str {
        match self {
            NumericOp::Add => "+",
            NumericOp::Sub => "-",
            NumericOp::Mul => "*",
            NumericOp::Div => "/",
            NumericOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BooleanOp::And => "and",
            BooleanOp::Or => "or",
        }
    }
}

/// One term of an order-by clause: `^(expr, >other)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortTerm {
    pub descending: bool,
    pub expr: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Regex {
        pattern: String,
        flags: String,
    },
    /// `$name`. An empty name is the context value `$`; the name `"$"` is
    /// the evaluation root `$$`.
    Var(String),
    Name(String),
    EscapedName(String),
    Wildcard,
    Descendent,
    Neg(Box<Node>),
    Range(Box<Node>, Box<Node>),
    ArrayConstruct(Vec<Node>),
    ObjectConstruct(Vec<(Node, Node)>),
    /// Parenthesized, semicolon-separated expressions in a nested scope.
    Block(Vec<Node>),
    /// Steps joined by `.`; `keep_arrays` is the trailing-`[]` marker that
    /// disables singleton collapse for the whole path.
    Path {
        steps: Vec<Node>,
        keep_arrays: bool,
    },
    /// A grouping object constructor applied to the fan-out of `input`.
    Group {
        input: Box<Node>,
        pairs: Vec<(Node, Node)>,
    },
    /// `expr[f1][f2]...` — filters applied in order.
    Predicate {
        expr: Box<Node>,
        filters: Vec<Node>,
    },
    Conditional {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    Assignment {
        name: String,
        value: Box<Node>,
    },
    Lambda {
        params: Vec<String>,
        body: Rc<Node>,
        signature: Option<Signature>,
        /// Written with `λ` rather than `function`.
        shorthand: bool,
    },
    Placeholder,
    FunctionCall {
        proc: Box<Node>,
        args: Vec<Node>,
    },
    /// A call with `?` placeholders among the arguments.
    PartialCall {
        proc: Box<Node>,
        args: Vec<Node>,
    },
    /// `lhs ~> rhs` — chain or composition.
    Apply {
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Sort {
        expr: Box<Node>,
        terms: Vec<SortTerm>,
    },
    Numeric {
        op: NumericOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Comparison {
        op: ComparisonOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Boolean {
        op: BooleanOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Concat {
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Transform {
        pattern: Rc<Node>,
        update: Rc<Node>,
        delete: Option<Rc<Node>>,
    },
}

/// Canonical printed form: one space around binary operators, strings
/// re-rendered double-quoted, `λ` and `function` preserved as written.
/// Reparsing the printed form yields a structurally equivalent AST.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Null => write!(f, "null"),
            NodeKind::Bool(b) => write!(f, "{b}"),
            NodeKind::Number(n) => write!(f, "{}", value_ops::number_to_string(*n)),
            NodeKind::Str(s) => write_quoted(f, s),
            NodeKind::Regex { pattern, flags } => write!(f, "/{pattern}/{flags}"),
            NodeKind::Var(name) => match name.as_str() {
                "" => write!(f, "$"),
                "$" => write!(f, "$$"),
                _ => write!(f, "${name}"),
            },
            NodeKind::Name(name) => write!(f, "{name}"),
            NodeKind::EscapedName(name) => write!(f, "`{name}`"),
            NodeKind::Wildcard => write!(f, "*"),
            NodeKind::Descendent => write!(f, "**"),
            NodeKind::Neg(expr) => write!(f, "-{expr}"),
            NodeKind::Range(lhs, rhs) => write!(f, "{lhs}..{rhs}"),
            NodeKind::ArrayConstruct(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            NodeKind::ObjectConstruct(pairs) => write_pairs(f, pairs),
            NodeKind::Block(exprs) => {
                write!(f, "(")?;
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            NodeKind::Path { steps, keep_arrays } => {
                for (i, step) in steps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{step}")?;
                }
                if *keep_arrays {
                    write!(f, "[]")?;
                }
                Ok(())
            }
            NodeKind::Group { input, pairs } => {
                write!(f, "{input}")?;
                write_pairs(f, pairs)
            }
            NodeKind::Predicate { expr, filters } => {
                write!(f, "{expr}")?;
                for filter in filters {
                    write!(f, "[{filter}]")?;
                }
                Ok(())
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                write!(f, "{cond} ? {then}")?;
                if let Some(e) = otherwise {
                    write!(f, " : {e}")?;
                }
                Ok(())
            }
            NodeKind::Assignment { name, value } => write!(f, "${name} := {value}"),
            NodeKind::Lambda {
                params,
                body,
                signature,
                shorthand,
            } => {
                write!(f, "{}(", if *shorthand { "λ" } else { "function" })?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "${p}")?;
                }
                write!(f, ")")?;
                if let Some(sig) = signature {
                    write!(f, "<{}>", sig.source)?;
                }
                write!(f, "{{{body}}}")
            }
            NodeKind::Placeholder => write!(f, "?"),
            NodeKind::FunctionCall { proc, args } | NodeKind::PartialCall { proc, args } => {
                write!(f, "{proc}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            NodeKind::Apply { lhs, rhs } => write!(f, "{lhs} ~> {rhs}"),
            NodeKind::Sort { expr, terms } => {
                write!(f, "{expr}^(")?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if term.descending {
                        write!(f, ">")?;
                    }
                    write!(f, "{}", term.expr)?;
                }
                write!(f, ")")
            }
            NodeKind::Numeric { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            NodeKind::Comparison { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            NodeKind::Boolean { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            NodeKind::Concat { lhs, rhs } => write!(f, "{lhs} & {rhs}"),
            NodeKind::Transform {
                pattern,
                update,
                delete,
            } => {
                write!(f, "|{pattern}|{update}")?;
                if let Some(d) = delete {
                    write!(f, ", {d}")?;
                }
                write!(f, "|")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_pairs(f: &mut fmt::Formatter<'_>, pairs: &[(Node, Node)]) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{k}: {v}")?;
    }
    write!(f, "}}")
}

/// Render a string literal double-quoted with JSON escapes.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            '\u{8}' => write!(f, "\\b")?,
            '\u{c}' => write!(f, "\\f")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind) -> Node {
        Node::new(0, kind)
    }

    #[test]
    fn equality_ignores_position() {
        let a = Node::new(3, NodeKind::Name("x".into()));
        let b = Node::new(9, NodeKind::Name("x".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn print_binary_with_spaces() {
        let n = node(NodeKind::Numeric {
            op: NumericOp::Mul,
            lhs: Box::new(node(NodeKind::Name("price".into()))),
            rhs: Box::new(node(NodeKind::Name("quantity".into()))),
        });
        assert_eq!(n.to_string(), "price * quantity");
    }

    #[test]
    fn print_string_requotes() {
        let n = node(NodeKind::Str("he said \"hi\"\n".into()));
        assert_eq!(n.to_string(), r#""he said \"hi\"\n""#);
    }

    #[test]
    fn print_path_with_keep_marker() {
        let n = node(NodeKind::Path {
            steps: vec![
                node(NodeKind::Name("a".into())),
                node(NodeKind::Name("b".into())),
            ],
            keep_arrays: true,
        });
        assert_eq!(n.to_string(), "a.b[]");
    }

    #[test]
    fn print_variables() {
        assert_eq!(node(NodeKind::Var(String::new())).to_string(), "$");
        assert_eq!(node(NodeKind::Var("$".into())).to_string(), "$$");
        assert_eq!(node(NodeKind::Var("x".into())).to_string(), "$x");
    }

    #[test]
    fn print_conditional_without_else() {
        let n = node(NodeKind::Conditional {
            cond: Box::new(node(NodeKind::Name("a".into()))),
            then: Box::new(node(NodeKind::Number(1.0))),
            otherwise: None,
        });
        assert_eq!(n.to_string(), "a ? 1");
    }
}
