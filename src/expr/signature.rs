/// Lambda type-signature mini-language: the `<...>` annotation on function
/// definitions and built-in declarations.
///
/// Letters select parameter kinds (`b` boolean, `n` number, `s` string,
/// `l` null, `a` array, `o` object, `f` function, `x` any, `j` any JSON
/// value, `u` any defined value, `p` path-like). A type may be followed by
/// options: `?` optional, `+` variadic, `-` context-bindable. `(xy)` is a
/// union; `a<n>`/`f<...>` parameterize arrays and functions. The return
/// type follows `:` and is not enforced at runtime.
use crate::error::{EvalError, ParseError};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Bool,
    Number,
    Str,
    Null,
    Array,
    Object,
    Function,
    Any,
    Json,
    Defined,
    PathLike,
}

impl TypeCode {
    fn from_letter(ch: char) -> Option<TypeCode> {
        match ch {
            'b' => Some(TypeCode::Bool),
            'n' => Some(TypeCode::Number),
            's' => Some(TypeCode::Str),
            'l' => Some(TypeCode::Null),
            'a' => Some(TypeCode::Array),
            'o' => Some(TypeCode::Object),
            'f' => Some(TypeCode::Function),
            'x' => Some(TypeCode::Any),
            'j' => Some(TypeCode::Json),
            'u' => Some(TypeCode::Defined),
            'p' => Some(TypeCode::PathLike),
            _ => None,
        }
    }

    /// Whether a value satisfies this type. Undefined arguments are always
    /// admitted; the undefined-propagation rules of the callee decide what
    /// happens to them.
    fn admits(self, value: &Value) -> bool {
        if value.is_undefined() {
            return true;
        }
        match self {
            TypeCode::Bool => matches!(value, Value::Bool(_)),
            TypeCode::Number => matches!(value, Value::Number(_)),
            TypeCode::Str => matches!(value, Value::String(_)),
            TypeCode::Null => matches!(value, Value::Null),
            TypeCode::Array => matches!(value, Value::Array(..)),
            TypeCode::Object => matches!(value, Value::Object(_)),
            TypeCode::Function => matches!(value, Value::Function(_)),
            TypeCode::Any => true,
            TypeCode::Json | TypeCode::PathLike => !matches!(value, Value::Function(_)),
            TypeCode::Defined => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SigParam {
    /// Acceptable types; more than one for a union.
    pub types: Vec<TypeCode>,
    pub optional: bool,
    pub variadic: bool,
    /// `-`: when the caller supplies one argument too few, the evaluation
    /// context is bound to this parameter.
    pub context: bool,
    /// Element type for a parameterized array (`a<n>`).
    pub element: Option<TypeCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Original text between the angle brackets, preserved for printing.
    pub source: String,
    pub params: Vec<SigParam>,
    pub result: Option<TypeCode>,
}

/// Parse the text between `<` and `>`. `base` is the byte offset of the
/// opening bracket in the enclosing source, used for error positions.
pub fn parse(text: &str, base: usize) -> Result<Signature, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut params: Vec<SigParam> = Vec::new();
    let mut result = None;
    let mut i = 0;
    let mut in_result = false;

    while i < chars.len() {
        let pos = base + 1 + i;
        let ch = chars[i];
        match ch {
            '?' | '+' | '-' => {
                let Some(last) = params.last_mut() else {
                    return Err(ParseError::UnmatchedOption {
                        position: pos,
                        option: ch,
                    });
                };
                if in_result {
                    return Err(ParseError::UnmatchedOption {
                        position: pos,
                        option: ch,
                    });
                }
                match ch {
                    '?' => last.optional = true,
                    '+' => last.variadic = true,
                    _ => last.context = true,
                }
                i += 1;
            }
            '(' => {
                let mut types = Vec::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(')') => {
                            i += 1;
                            break;
                        }
                        Some(&c) => match TypeCode::from_letter(c) {
                            Some(t) => {
                                types.push(t);
                                i += 1;
                            }
                            None => {
                                return Err(ParseError::InvalidUnionType {
                                    position: base + 1 + i,
                                    ch: c,
                                });
                            }
                        },
                        None => {
                            return Err(ParseError::MissingToken {
                                position: pos,
                                expected: ")".into(),
                            });
                        }
                    }
                }
                if types.is_empty() {
                    return Err(ParseError::InvalidUnionType { position: pos, ch: ')' });
                }
                push_param(&mut params, &mut result, in_result, types);
            }
            '<' => {
                // Subtype for the preceding array or function type.
                let applies_to = if in_result {
                    result.ok_or(ParseError::UnmatchedSubtype { position: pos })?
                } else {
                    let Some(last) = params.last() else {
                        return Err(ParseError::UnmatchedSubtype { position: pos });
                    };
                    *last.types.last().unwrap_or(&TypeCode::Any)
                };
                if !matches!(applies_to, TypeCode::Array | TypeCode::Function) {
                    return Err(ParseError::InvalidSubtype { position: pos });
                }
                let mut depth = 1;
                let sub_start = i + 1;
                i += 1;
                while i < chars.len() && depth > 0 {
                    match chars[i] {
                        '<' => depth += 1,
                        '>' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                if depth > 0 {
                    return Err(ParseError::UnmatchedSubtype { position: pos });
                }
                let inner: String = chars[sub_start..i - 1].iter().collect();
                // Function subtypes and result subtypes are documentation;
                // only array parameter element types are enforced.
                if !in_result && applies_to == TypeCode::Array {
                    let mut inner_chars = inner.chars();
                    let elem = inner_chars
                        .next()
                        .and_then(TypeCode::from_letter)
                        .filter(|_| inner_chars.next().is_none())
                        .ok_or(ParseError::InvalidSubtype { position: pos })?;
                    if let Some(last) = params.last_mut() {
                        last.element = Some(elem);
                    }
                }
            }
            ':' => {
                in_result = true;
                i += 1;
            }
            c => match TypeCode::from_letter(c) {
                Some(t) => {
                    push_param(&mut params, &mut result, in_result, vec![t]);
                    i += 1;
                }
                None => {
                    return Err(ParseError::InvalidParamType { position: pos, ch: c });
                }
            },
        }
    }

    Ok(Signature {
        source: text.to_string(),
        params,
        result,
    })
}

fn push_param(
    params: &mut Vec<SigParam>,
    result: &mut Option<TypeCode>,
    in_result: bool,
    types: Vec<TypeCode>,
) {
    if in_result {
        *result = types.first().copied();
    } else {
        params.push(SigParam {
            types,
            optional: false,
            variadic: false,
            context: false,
            element: None,
        });
    }
}

impl Signature {
    /// Validate and coerce an argument list at invocation time.
    ///
    /// Applies context binding (`-` parameters receive the evaluation
    /// context when the caller supplied one argument too few), wraps
    /// non-array values passed to array parameters, and checks every
    /// argument against its declared type. Returns the effective argument
    /// list the callee sees.
    pub fn validate(
        &self,
        func_name: &str,
        args: &[Value],
        context: &Value,
    ) -> Result<Vec<Value>, EvalError> {
        match self.validate_exact(func_name, args.to_vec()) {
            Ok(out) => Ok(out),
            Err(err) => {
                // Context binding: a signature like <s-:s> invoked with one
                // argument too few takes the evaluation context at the
                // marked parameter.
                if args.len() < self.params.len() {
                    if let Some(slot) = self.params.iter().position(|p| p.context) {
                        if slot <= args.len() {
                            let mut retry = args.to_vec();
                            retry.insert(slot, context.clone());
                            return self.validate_exact(func_name, retry);
                        }
                    }
                }
                Err(err)
            }
        }
    }

    fn validate_exact(
        &self,
        func_name: &str,
        supplied: Vec<Value>,
    ) -> Result<Vec<Value>, EvalError> {
        let mut out: Vec<Value> = Vec::with_capacity(supplied.len());
        let mut next = 0usize;
        for (pi, param) in self.params.iter().enumerate() {
            if param.variadic {
                // One or more of the declared type, through the end.
                while next < supplied.len() {
                    let mut v = supplied[next].clone();
                    if param.types.contains(&TypeCode::Array)
                        && !matches!(v, Value::Array(..))
                        && !v.is_undefined()
                    {
                        v = Value::array(vec![v]);
                    }
                    self.check(param, pi, func_name, &v)?;
                    out.push(v);
                    next += 1;
                }
                continue;
            }
            if next >= supplied.len() {
                if param.optional {
                    continue;
                }
                // Missing required argument.
                return Err(EvalError::ArgType {
                    function: func_name.to_string(),
                    index: pi + 1,
                });
            }
            let mut v = supplied[next].clone();
            next += 1;
            // Singleton coercion for array parameters.
            if param.types.contains(&TypeCode::Array)
                && !matches!(v, Value::Array(..))
                && !v.is_undefined()
            {
                v = Value::array(vec![v]);
            }
            self.check(param, pi, func_name, &v)?;
            out.push(v);
        }
        if next < supplied.len() {
            return Err(EvalError::ArgCount {
                function: func_name.to_string(),
                got: supplied.len(),
                max: self.params.len(),
            });
        }
        Ok(out)
    }

    /// Whether the signature declares a context-bindable parameter.
    pub fn binds_context(&self) -> bool {
        self.params.iter().any(|p| p.context)
    }

    fn check(
        &self,
        param: &SigParam,
        pi: usize,
        func_name: &str,
        value: &Value,
    ) -> Result<(), EvalError> {
        let mismatch = || EvalError::ArgType {
            function: func_name.to_string(),
            index: pi + 1,
        };
        if !param.types.iter().any(|t| t.admits(value)) {
            return Err(mismatch());
        }
        if let (Some(elem), Value::Array(items, _)) = (param.element, value) {
            if !items.iter().all(|item| elem.admits(item)) {
                return Err(mismatch());
            }
        }
        Ok(())
    }

}
