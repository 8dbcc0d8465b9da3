/// Built-in function library.
///
/// Every built-in is declared with a name, an argument-count range, a type
/// signature in the `<...>` mini-language, and an undefined-propagation
/// mask: argument positions that short-circuit the whole invocation to
/// Undefined instead of erroring. Dispatch is by name through a static
/// table; the evaluator resolves `$name` against this table after the
/// frame chain.
mod arrays;
mod boolean;
mod datetime;
mod format;
mod numbers;
mod objects;
pub(crate) mod regexes;
mod strings;

use std::sync::OnceLock;

use crate::error::EvalError;
use crate::value::Value;

use super::signature::{self, Signature};

pub struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub signature: Option<&'static str>,
    /// Argument positions that, when Undefined, make the call Undefined.
    pub undef_prop: &'static [usize],
    pub func: fn(&[Value]) -> Result<Value, EvalError>,
    sig_cache: OnceLock<Signature>,
}

impl Builtin {
    const fn def(
        name: &'static str,
        min_args: usize,
        max_args: usize,
        signature: Option<&'static str>,
        undef_prop: &'static [usize],
        func: fn(&[Value]) -> Result<Value, EvalError>,
    ) -> Builtin {
        Builtin {
            name,
            min_args,
            max_args,
            signature,
            undef_prop,
            func,
            sig_cache: OnceLock::new(),
        }
    }

    pub fn parsed_signature(&self) -> Option<&Signature> {
        self.signature.map(|src| {
            self.sig_cache
                .get_or_init(|| signature::parse(src, 0).expect("built-in signatures are well-formed"))
        })
    }
}

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

static BUILTINS: [Builtin; 53] = [
    // Strings
    Builtin::def("string", 0, 1, Some("x-:s"), &[0], strings::string),
    Builtin::def("length", 0, 1, Some("s-:n"), &[0], strings::length),
    Builtin::def("substring", 1, 3, Some("s-nn?:s"), &[0], strings::substring),
    Builtin::def(
        "substringBefore",
        1,
        2,
        Some("s-s:s"),
        &[0],
        strings::substring_before,
    ),
    Builtin::def(
        "substringAfter",
        1,
        2,
        Some("s-s:s"),
        &[0],
        strings::substring_after,
    ),
    Builtin::def("lowercase", 0, 1, Some("s-:s"), &[0], strings::lowercase),
    Builtin::def("uppercase", 0, 1, Some("s-:s"), &[0], strings::uppercase),
    Builtin::def("trim", 0, 1, Some("s-:s"), &[0], strings::trim),
    Builtin::def("pad", 1, 3, Some("s-ns?:s"), &[0], strings::pad),
    Builtin::def("contains", 1, 2, Some("s-(sf):b"), &[0], strings::contains),
    Builtin::def("split", 1, 3, Some("s-(sf)n?:a<s>"), &[0], strings::split),
    Builtin::def("join", 1, 2, Some("a<s>s?:s"), &[0], strings::join),
    Builtin::def(
        "replace",
        2,
        4,
        Some("s-(sf)(sf)n?:s"),
        &[0],
        strings::replace,
    ),
    Builtin::def("match", 1, 3, Some("s-fn?:a<o>"), &[0], regexes::match_fn),
    // Numbers
    Builtin::def("number", 0, 1, Some("(nsb)-:n"), &[0], numbers::number),
    Builtin::def("abs", 0, 1, Some("n-:n"), &[0], numbers::abs),
    Builtin::def("floor", 0, 1, Some("n-:n"), &[0], numbers::floor),
    Builtin::def("ceil", 0, 1, Some("n-:n"), &[0], numbers::ceil),
    Builtin::def("round", 0, 2, Some("n-n?:n"), &[0], numbers::round),
    Builtin::def("sqrt", 0, 1, Some("n-:n"), &[0], numbers::sqrt),
    Builtin::def("power", 1, 2, Some("n-n:n"), &[0, 1], numbers::power),
    Builtin::def("random", 0, 0, Some(":n"), &[], numbers::random),
    Builtin::def("sum", 1, 1, Some("a<n>:n"), &[0], numbers::sum),
    Builtin::def("max", 1, 1, Some("a<n>:n"), &[0], numbers::max),
    Builtin::def("min", 1, 1, Some("a<n>:n"), &[0], numbers::min),
    Builtin::def("average", 1, 1, Some("a<n>:n"), &[0], numbers::average),
    Builtin::def(
        "formatNumber",
        1,
        3,
        Some("n-so?:s"),
        &[0],
        format::format_number,
    ),
    Builtin::def("formatBase", 1, 2, Some("n-n?:s"), &[0], format::format_base),
    // Arrays
    Builtin::def("count", 1, 1, Some("a:n"), &[], arrays::count),
    Builtin::def("append", 2, 2, Some("xx:a"), &[], arrays::append),
    Builtin::def("reverse", 1, 1, Some("a:a"), &[0], arrays::reverse),
    Builtin::def("sort", 1, 2, Some("af?:a"), &[0], arrays::sort),
    Builtin::def("shuffle", 1, 1, Some("a:a"), &[0], arrays::shuffle),
    Builtin::def("zip", 1, 8, Some("a+"), &[0], arrays::zip),
    Builtin::def("distinct", 1, 1, Some("x:x"), &[0], arrays::distinct),
    Builtin::def("map", 2, 2, Some("af:a"), &[0], arrays::map),
    Builtin::def("filter", 2, 2, Some("af:a"), &[0], arrays::filter),
    Builtin::def("reduce", 2, 3, Some("afj?:j"), &[0], arrays::reduce),
    Builtin::def("single", 1, 2, Some("af?:j"), &[0], arrays::single),
    // Objects
    Builtin::def("keys", 0, 1, Some("x-:a<s>"), &[0], objects::keys),
    Builtin::def("lookup", 1, 2, Some("x-s:x"), &[0], objects::lookup_fn),
    Builtin::def("spread", 0, 1, Some("x-:x"), &[0], objects::spread),
    Builtin::def("merge", 1, 1, Some("a<o>:o"), &[0], objects::merge),
    Builtin::def("each", 1, 2, Some("o-f:a"), &[0], objects::each),
    Builtin::def("sift", 1, 2, Some("o-f:o"), &[0], objects::sift),
    // Boolean
    Builtin::def("boolean", 0, 1, Some("x-:b"), &[0], boolean::boolean_fn),
    Builtin::def("not", 0, 1, Some("x-:b"), &[0], boolean::not),
    Builtin::def("exists", 1, 1, Some("x:b"), &[], boolean::exists),
    Builtin::def("type", 1, 1, Some("x:s"), &[0], boolean::type_of),
    // Date/time
    Builtin::def("now", 0, 0, Some(":s"), &[], datetime::now),
    Builtin::def("millis", 0, 0, Some(":n"), &[], datetime::millis),
    Builtin::def(
        "fromMillis",
        1,
        3,
        Some("n-s?s?:s"),
        &[0],
        datetime::from_millis,
    ),
    Builtin::def(
        "toMillis",
        1,
        3,
        Some("s-s?s?:n"),
        &[0],
        datetime::to_millis,
    ),
];

/// Shared helper: the ArgType error for argument `index` (1-based) of
/// built-in `name`.
pub(super) fn arg_error(name: &str, index: usize) -> EvalError {
    EvalError::ArgType {
        function: name.to_string(),
        index,
    }
}
