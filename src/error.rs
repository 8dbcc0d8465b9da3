/// Error taxonomy for compilation and evaluation.
///
/// Two families: `ParseError` (lexical and syntactic, abort compilation) and
/// `EvalError` (abort the current evaluation). `Value::Undefined` is a value,
/// never an error; callers distinguish it at the result boundary.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Errors raised while lexing or parsing an expression. Positions are byte
/// offsets into the source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{position}: string literal must be terminated by a matching quote")]
    UnterminatedString { position: usize },

    #[error("{position}: no terminating / in regular expression")]
    UnterminatedRegex { position: usize },

    #[error("{position}: quoted name must be terminated by a backquote (`)")]
    UnterminatedName { position: usize },

    #[error("{position}: comment has no closing */")]
    UnterminatedComment { position: usize },

    #[error("{position}: unsupported escape sequence \\{escape}")]
    IllegalEscape { position: usize, escape: char },

    #[error("{position}: the escape sequence \\u must be followed by 4 hex digits")]
    IllegalEscapeHex { position: usize },

    #[error("{position}: invalid number literal {text}")]
    InvalidNumber { position: usize, text: String },

    #[error("{position}: number out of range: {text}")]
    NumberRange { position: usize, text: String },

    #[error("{position}: empty regular expressions are not allowed")]
    EmptyRegex { position: usize },

    #[error("{position}: invalid regular expression: {message}")]
    InvalidRegex { position: usize, message: String },

    #[error("{position}: syntax error: `{token}`")]
    SyntaxError { position: usize, token: String },

    #[error("{position}: unexpected end of expression")]
    UnexpectedEof { position: usize },

    #[error("{position}: expected `{expected}`, got `{found}`")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{position}: expected `{expected}` before end of expression")]
    MissingToken { position: usize, expected: String },

    #[error("{position}: the symbol `{token}` cannot be used as a prefix operator")]
    Prefix { position: usize, token: String },

    #[error("{position}: the symbol `{token}` cannot be used as an infix operator")]
    Infix { position: usize, token: String },

    #[error("{position}: a predicate cannot follow a grouping expression in a path step")]
    GroupPredicate { position: usize },

    #[error("{position}: each path step can only have one grouping expression")]
    GroupGroup { position: usize },

    #[error(
        "{position}: the literal value `{literal}` cannot be used as a step within a path expression"
    )]
    PathLiteral { position: usize, literal: String },

    #[error("{position}: the left side of `:=` must be a variable name (start with $)")]
    IllegalAssignment { position: usize },

    #[error(
        "{position}: parameter `{param}` of a function definition must be a variable name (start with $)"
    )]
    IllegalParam { position: usize, param: String },

    #[error("{position}: duplicate parameter `${param}` in function definition")]
    DuplicateParam { position: usize, param: String },

    #[error(
        "{position}: the signature does not declare the same number of parameters as the function definition"
    )]
    ParamCount { position: usize },

    #[error("{position}: invalid type in union: `{ch}`")]
    InvalidUnionType { position: usize, ch: char },

    #[error("{position}: option `{option}` must follow a parameter type")]
    UnmatchedOption { position: usize, option: char },

    #[error("{position}: no closing `>` for parameterised type")]
    UnmatchedSubtype { position: usize },

    #[error("{position}: type parameters can only be applied to functions and arrays")]
    InvalidSubtype { position: usize },

    #[error("{position}: unknown parameter type `{ch}` in signature")]
    InvalidParamType { position: usize, ch: char },
}

/// Errors raised while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{position}: the left side of the range operator (..) must evaluate to an integer")]
    NonIntegerLhs { position: usize },

    #[error("{position}: the right side of the range operator (..) must evaluate to an integer")]
    NonIntegerRhs { position: usize },

    #[error("{position}: the left side of the `{op}` operator must evaluate to a number")]
    NonNumberLhs { position: usize, op: String },

    #[error("{position}: the right side of the `{op}` operator must evaluate to a number")]
    NonNumberRhs { position: usize, op: String },

    #[error("{position}: the left side of the `{op}` operator must evaluate to a number or a string")]
    NonComparableLhs { position: usize, op: String },

    #[error("{position}: the right side of the `{op}` operator must evaluate to a number or a string")]
    NonComparableRhs { position: usize, op: String },

    #[error("{position}: the values either side of the `{op}` operator must be of the same data type")]
    TypeMismatch { position: usize, op: String },

    #[error("{position}: attempted to invoke a non-function{}", hint(.name))]
    NonCallable {
        position: usize,
        name: Option<String>,
    },

    #[error("{position}: the right side of `~>` must be a function")]
    NonCallableApply { position: usize },

    #[error("{position}: attempted to partially apply a non-function")]
    NonCallablePartial { position: usize },

    #[error("expression produced a number outside the representable range: {value}")]
    NumberInf { value: f64 },

    #[error("expression produced a result that is not a number")]
    NumberNaN,

    #[error("{position}: the range operator (..) would allocate {size} items, which exceeds the limit")]
    MaxRangeItems { position: usize, size: f64 },

    #[error("{position}: key in object structure must evaluate to a string; got: {value}")]
    IllegalKey { position: usize, value: String },

    #[error("{position}: multiple key definitions evaluate to the same key: {key}")]
    DuplicateKey { position: usize, key: String },

    #[error("transform expressions cannot clone a value containing a function")]
    Clone,

    #[error("the insert/update clause of a transform expression must evaluate to an object; got: {value}")]
    IllegalUpdate { value: String },

    #[error(
        "the delete clause of a transform expression must evaluate to a string or an array of strings; got: {value}"
    )]
    IllegalDelete { value: String },

    #[error("{position}: the expressions in an order-by clause must evaluate to numeric or string values")]
    NonSortable { position: usize },

    #[error("{position}: type mismatch when comparing values in an order-by clause")]
    SortMismatch { position: usize },

    #[error("function ${function} was invoked with {got} arguments; it accepts at most {max}")]
    ArgCount {
        function: String,
        got: usize,
        max: usize,
    },

    #[error("argument {index} of function ${function} does not match the function signature")]
    ArgType { function: String, index: usize },

    #[error("the $single() function expected exactly 1 matching result; it matched {matched}")]
    SingleMatch { matched: usize },
}

/// Cap on the number of items the range operator may allocate.
pub const MAX_RANGE_ITEMS: f64 = 1e7;

fn hint(name: &Option<String>) -> String {
    match name {
        Some(n) => format!(". Did you mean ${n}?"),
        None => String::new(),
    }
}
