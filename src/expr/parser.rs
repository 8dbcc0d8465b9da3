/// Pratt (top-down operator precedence) parser.
///
/// Each token has a left binding power. The core loop parses a prefix form
/// (nud) to get a left expression, then while the next token binds tighter
/// than the current right binding power, consumes it and applies its infix
/// form (led) to the left expression.
use std::rc::Rc;

use crate::error::ParseError;

use super::lexer::{Token, TokenKind, Tokenizer};
use super::signature;
use super::{BooleanOp, ComparisonOp, Node, NodeKind, NumericOp, SortTerm};

/// Parse an expression string into an AST.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(source)?;
    let node = parser.expression(0)?;
    match parser.token.kind {
        TokenKind::Eof => Ok(node),
        ref other => Err(ParseError::SyntaxError {
            position: parser.token.position,
            token: other.describe(),
        }),
    }
}

/// Left binding powers. Path steps bind just below their postfix operators
/// so that predicates and call parentheses attach to the step they follow.
fn lbp(kind: &TokenKind) -> u8 {
    match kind {
        TokenKind::LBracket | TokenKind::LParen => 80,
        TokenKind::Dot => 75,
        TokenKind::LBrace => 70,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent | TokenKind::DescendOp => 60,
        TokenKind::Plus | TokenKind::Minus | TokenKind::Ampersand | TokenKind::ConcatOp => 50,
        TokenKind::Equal
        | TokenKind::NotEqual
        | TokenKind::LessThan
        | TokenKind::LessEqual
        | TokenKind::GreaterThan
        | TokenKind::GreaterEqual
        | TokenKind::ApplyOp
        | TokenKind::Caret => 40,
        TokenKind::BindOp => 30,
        TokenKind::Question | TokenKind::RangeOp => 20,
        TokenKind::Name(name) => match name.as_str() {
            "in" => 40,
            "and" => 30,
            "or" => 25,
            _ => 0,
        },
        _ => 0,
    }
}

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    token: Token,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Parser<'a>, ParseError> {
        let mut tokenizer = Tokenizer::new(source);
        let token = tokenizer.next(true)?;
        Ok(Parser { tokenizer, token })
    }

    /// Consume the current token. `allow_regex` reflects whether the next
    /// token sits at an operand position.
    fn advance(&mut self, allow_regex: bool) -> Result<(), ParseError> {
        self.token = self.tokenizer.next(allow_regex)?;
        Ok(())
    }

    fn expect(&mut self, expected: &TokenKind, allow_regex: bool) -> Result<(), ParseError> {
        if self.token.kind == TokenKind::Eof {
            return Err(ParseError::MissingToken {
                position: self.token.position,
                expected: expected.describe(),
            });
        }
        if &self.token.kind != expected {
            return Err(ParseError::UnexpectedToken {
                position: self.token.position,
                expected: expected.describe(),
                found: self.token.kind.describe(),
            });
        }
        self.advance(allow_regex)
    }

    fn expression(&mut self, rbp: u8) -> Result<Node, ParseError> {
        let mut left = self.prefix()?;
        while rbp < lbp(&self.token.kind) {
            left = self.infix(left)?;
        }
        Ok(left)
    }

    fn prefix(&mut self) -> Result<Node, ParseError> {
        let Token { kind, position } = self.token.clone();
        match kind {
            TokenKind::Number(n) => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Number(n)))
            }
            TokenKind::Str(s) => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Str(s)))
            }
            TokenKind::Bool(b) => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Bool(b)))
            }
            TokenKind::Null => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Null))
            }
            TokenKind::Regex { pattern, flags } => {
                // Validate now so a bad pattern is a compile-time error.
                if let Err(e) = super::functions::regexes::build_regex(&pattern, &flags) {
                    return Err(ParseError::InvalidRegex {
                        position,
                        message: e.to_string(),
                    });
                }
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Regex { pattern, flags }))
            }
            TokenKind::Var(name) => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Var(name)))
            }
            TokenKind::Name(name) => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Name(name)))
            }
            TokenKind::EscapedName(name) => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::EscapedName(name)))
            }
            TokenKind::Star => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Wildcard))
            }
            TokenKind::DescendOp => {
                self.advance(false)?;
                Ok(Node::new(position, NodeKind::Descendent))
            }
            TokenKind::Minus => {
                self.advance(true)?;
                let rhs = self.expression(70)?;
                // A negated number literal folds into the literal.
                if let NodeKind::Number(n) = rhs.kind {
                    Ok(Node::new(position, NodeKind::Number(-n)))
                } else {
                    Ok(Node::new(position, NodeKind::Neg(Box::new(rhs))))
                }
            }
            TokenKind::LParen => {
                self.advance(true)?;
                let mut exprs = Vec::new();
                while self.token.kind != TokenKind::RParen {
                    exprs.push(self.expression(0)?);
                    if self.token.kind == TokenKind::Semicolon {
                        self.advance(true)?;
                    } else {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen, false)?;
                Ok(Node::new(position, NodeKind::Block(exprs)))
            }
            TokenKind::LBracket => {
                self.advance(true)?;
                let mut items = Vec::new();
                while self.token.kind != TokenKind::RBracket {
                    items.push(self.expression(0)?);
                    if self.token.kind == TokenKind::Comma {
                        self.advance(true)?;
                    } else {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket, false)?;
                Ok(Node::new(position, NodeKind::ArrayConstruct(items)))
            }
            TokenKind::LBrace => {
                self.advance(true)?;
                let pairs = self.object_pairs()?;
                Ok(Node::new(position, NodeKind::ObjectConstruct(pairs)))
            }
            TokenKind::Pipe => {
                self.advance(true)?;
                let pattern = self.expression(0)?;
                self.expect(&TokenKind::Pipe, true)?;
                let update = self.expression(0)?;
                let delete = if self.token.kind == TokenKind::Comma {
                    self.advance(true)?;
                    Some(Rc::new(self.expression(0)?))
                } else {
                    None
                };
                self.expect(&TokenKind::Pipe, false)?;
                Ok(Node::new(
                    position,
                    NodeKind::Transform {
                        pattern: Rc::new(pattern),
                        update: Rc::new(update),
                        delete,
                    },
                ))
            }
            TokenKind::Function { shorthand } => self.lambda(position, shorthand),
            TokenKind::Eof => Err(ParseError::UnexpectedEof { position }),
            other => Err(ParseError::Prefix {
                position,
                token: other.describe(),
            }),
        }
    }

    fn infix(&mut self, left: Node) -> Result<Node, ParseError> {
        let Token { kind, position } = self.token.clone();
        match kind {
            TokenKind::Dot => {
                self.advance(true)?;
                let rhs = self.expression(75)?;
                self.append_step(left, rhs, position)
            }
            TokenKind::LBracket => {
                self.advance(true)?;
                if self.token.kind == TokenKind::RBracket {
                    // `[]` — keep-arrays marker on the enclosing path.
                    self.advance(false)?;
                    let steps = match left.kind {
                        NodeKind::Path { steps, .. } => steps,
                        _ => vec![left],
                    };
                    Ok(Node::new(
                        position,
                        NodeKind::Path {
                            steps,
                            keep_arrays: true,
                        },
                    ))
                } else {
                    let filter = self.expression(0)?;
                    self.expect(&TokenKind::RBracket, false)?;
                    self.attach_filter(left, filter, position)
                }
            }
            TokenKind::LParen => {
                self.advance(true)?;
                let mut args = Vec::new();
                let mut partial = false;
                while self.token.kind != TokenKind::RParen {
                    if self.token.kind == TokenKind::Question {
                        partial = true;
                        args.push(Node::new(self.token.position, NodeKind::Placeholder));
                        self.advance(false)?;
                    } else {
                        args.push(self.expression(0)?);
                    }
                    if self.token.kind == TokenKind::Comma {
                        self.advance(true)?;
                    } else {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen, false)?;
                let proc = Box::new(left);
                let kind = if partial {
                    NodeKind::PartialCall { proc, args }
                } else {
                    NodeKind::FunctionCall { proc, args }
                };
                Ok(Node::new(position, kind))
            }
            TokenKind::LBrace => {
                if matches!(left.kind, NodeKind::Group { .. }) {
                    return Err(ParseError::GroupGroup { position });
                }
                self.advance(true)?;
                let pairs = self.object_pairs()?;
                Ok(Node::new(
                    position,
                    NodeKind::Group {
                        input: Box::new(left),
                        pairs,
                    },
                ))
            }
            TokenKind::Star => self.numeric(left, NumericOp::Mul, 60, position),
            TokenKind::Slash => self.numeric(left, NumericOp::Div, 60, position),
            TokenKind::Percent => self.numeric(left, NumericOp::Rem, 60, position),
            TokenKind::Plus => self.numeric(left, NumericOp::Add, 50, position),
            TokenKind::Minus => self.numeric(left, NumericOp::Sub, 50, position),
            TokenKind::Ampersand | TokenKind::ConcatOp => {
                self.advance(true)?;
                let rhs = self.expression(50)?;
                Ok(Node::new(
                    position,
                    NodeKind::Concat {
                        lhs: Box::new(left),
                        rhs: Box::new(rhs),
                    },
                ))
            }
            TokenKind::Equal => self.comparison(left, ComparisonOp::Eq, position),
            TokenKind::NotEqual => self.comparison(left, ComparisonOp::Ne, position),
            TokenKind::LessThan => self.comparison(left, ComparisonOp::Lt, position),
            TokenKind::LessEqual => self.comparison(left, ComparisonOp::Le, position),
            TokenKind::GreaterThan => self.comparison(left, ComparisonOp::Gt, position),
            TokenKind::GreaterEqual => self.comparison(left, ComparisonOp::Ge, position),
            TokenKind::ApplyOp => {
                self.advance(true)?;
                let rhs = self.expression(40)?;
                Ok(Node::new(
                    position,
                    NodeKind::Apply {
                        lhs: Box::new(left),
                        rhs: Box::new(rhs),
                    },
                ))
            }
            TokenKind::Caret => {
                self.advance(false)?;
                self.expect(&TokenKind::LParen, true)?;
                let mut terms = Vec::new();
                loop {
                    let mut descending = false;
                    if self.token.kind == TokenKind::LessThan {
                        self.advance(true)?;
                    } else if self.token.kind == TokenKind::GreaterThan {
                        descending = true;
                        self.advance(true)?;
                    }
                    let expr = self.expression(0)?;
                    terms.push(SortTerm { descending, expr });
                    if self.token.kind == TokenKind::Comma {
                        self.advance(true)?;
                    } else {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen, false)?;
                Ok(Node::new(
                    position,
                    NodeKind::Sort {
                        expr: Box::new(left),
                        terms,
                    },
                ))
            }
            TokenKind::BindOp => {
                let name = match left.kind {
                    NodeKind::Var(name) if !name.is_empty() && name != "$" => name,
                    _ => return Err(ParseError::IllegalAssignment { position }),
                };
                self.advance(true)?;
                let value = self.expression(29)?;
                Ok(Node::new(
                    position,
                    NodeKind::Assignment {
                        name,
                        value: Box::new(value),
                    },
                ))
            }
            TokenKind::Question => {
                self.advance(true)?;
                let then = self.expression(0)?;
                let otherwise = if self.token.kind == TokenKind::Colon {
                    self.advance(true)?;
                    Some(Box::new(self.expression(0)?))
                } else {
                    None
                };
                Ok(Node::new(
                    position,
                    NodeKind::Conditional {
                        cond: Box::new(left),
                        then: Box::new(then),
                        otherwise,
                    },
                ))
            }
            TokenKind::RangeOp => {
                self.advance(true)?;
                let rhs = self.expression(20)?;
                Ok(Node::new(
                    position,
                    NodeKind::Range(Box::new(left), Box::new(rhs)),
                ))
            }
            TokenKind::Name(name) => {
                let op = match name.as_str() {
                    "in" => {
                        return self.comparison(left, ComparisonOp::In, position);
                    }
                    "and" => BooleanOp::And,
                    "or" => BooleanOp::Or,
                    _ => {
                        return Err(ParseError::Infix {
                            position,
                            token: name,
                        });
                    }
                };
                self.advance(true)?;
                let rhs = self.expression(lbp(&TokenKind::Name(name)))?;
                Ok(Node::new(
                    position,
                    NodeKind::Boolean {
                        op,
                        lhs: Box::new(left),
                        rhs: Box::new(rhs),
                    },
                ))
            }
            other => Err(ParseError::Infix {
                position,
                token: other.describe(),
            }),
        }
    }

    fn numeric(
        &mut self,
        left: Node,
        op: NumericOp,
        bp: u8,
        position: usize,
    ) -> Result<Node, ParseError> {
        self.advance(true)?;
        let rhs = self.expression(bp)?;
        Ok(Node::new(
            position,
            NodeKind::Numeric {
                op,
                lhs: Box::new(left),
                rhs: Box::new(rhs),
            },
        ))
    }

    fn comparison(
        &mut self,
        left: Node,
        op: ComparisonOp,
        position: usize,
    ) -> Result<Node, ParseError> {
        self.advance(true)?;
        let rhs = self.expression(40)?;
        Ok(Node::new(
            position,
            NodeKind::Comparison {
                op,
                lhs: Box::new(left),
                rhs: Box::new(rhs),
            },
        ))
    }

    /// Append `rhs` to the path formed by `left`, creating the path if
    /// necessary. Literals are rejected on either side of the step.
    fn append_step(&mut self, left: Node, rhs: Node, position: usize) -> Result<Node, ParseError> {
        reject_literal_step(&rhs)?;
        let (mut steps, keep_arrays) = match left.kind {
            NodeKind::Path { steps, keep_arrays } => (steps, keep_arrays),
            _ => {
                reject_literal_step(&left)?;
                (vec![left], false)
            }
        };
        // A keep-arrays marker inside the step (e.g. `a.b[].c`) surfaces as
        // a nested path; splice it in and carry the flag.
        let keep_arrays = match rhs.kind {
            NodeKind::Path {
                steps: nested,
                keep_arrays: nested_keep,
            } => {
                steps.extend(nested);
                keep_arrays || nested_keep
            }
            _ => {
                steps.push(rhs);
                keep_arrays
            }
        };
        Ok(Node::new(
            position,
            NodeKind::Path { steps, keep_arrays },
        ))
    }

    /// Attach a `[filter]` to `left` per the predicate rules.
    fn attach_filter(
        &mut self,
        left: Node,
        filter: Node,
        position: usize,
    ) -> Result<Node, ParseError> {
        match left.kind {
            NodeKind::Group { .. } => Err(ParseError::GroupPredicate { position }),
            NodeKind::Predicate { expr, mut filters } => {
                filters.push(filter);
                Ok(Node::new(left.position, NodeKind::Predicate { expr, filters }))
            }
            NodeKind::Path {
                mut steps,
                keep_arrays,
            } => {
                // The filter belongs to the last step of the path.
                let last = steps.pop().expect("paths have at least one step");
                let wrapped = match last.kind {
                    NodeKind::Predicate { expr, mut filters } => {
                        filters.push(filter);
                        Node::new(last.position, NodeKind::Predicate { expr, filters })
                    }
                    _ => Node::new(
                        last.position,
                        NodeKind::Predicate {
                            expr: Box::new(last),
                            filters: vec![filter],
                        },
                    ),
                };
                steps.push(wrapped);
                Ok(Node::new(
                    position,
                    NodeKind::Path { steps, keep_arrays },
                ))
            }
            _ => Ok(Node::new(
                left.position,
                NodeKind::Predicate {
                    expr: Box::new(left),
                    filters: vec![filter],
                },
            )),
        }
    }

    /// `key: value` pairs up to the closing brace, which is consumed.
    fn object_pairs(&mut self) -> Result<Vec<(Node, Node)>, ParseError> {
        let mut pairs = Vec::new();
        while self.token.kind != TokenKind::RBrace {
            let key = self.expression(0)?;
            self.expect(&TokenKind::Colon, true)?;
            let value = self.expression(0)?;
            pairs.push((key, value));
            if self.token.kind == TokenKind::Comma {
                self.advance(true)?;
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, false)?;
        Ok(pairs)
    }

    /// `function($a, $b)<signature>{body}` — the keyword is current.
    fn lambda(&mut self, position: usize, shorthand: bool) -> Result<Node, ParseError> {
        self.advance(false)?;
        self.expect(&TokenKind::LParen, false)?;
        let mut params: Vec<String> = Vec::new();
        while self.token.kind != TokenKind::RParen {
            match &self.token.kind {
                TokenKind::Var(name) if !name.is_empty() && name != "$" => {
                    if params.iter().any(|p| p == name) {
                        return Err(ParseError::DuplicateParam {
                            position: self.token.position,
                            param: name.clone(),
                        });
                    }
                    params.push(name.clone());
                    self.advance(false)?;
                }
                other => {
                    return Err(ParseError::IllegalParam {
                        position: self.token.position,
                        param: other.describe(),
                    });
                }
            }
            if self.token.kind == TokenKind::Comma {
                self.advance(false)?;
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen, false)?;

        let sig = if self.token.kind == TokenKind::LessThan {
            let sig_pos = self.token.position;
            let text = self.tokenizer.scan_signature_text(sig_pos)?;
            let sig = signature::parse(&text, sig_pos)?;
            if sig.params.len() != params.len() {
                return Err(ParseError::ParamCount { position: sig_pos });
            }
            self.advance(false)?;
            Some(sig)
        } else {
            None
        };

        self.expect(&TokenKind::LBrace, true)?;
        let body = self.expression(0)?;
        self.expect(&TokenKind::RBrace, false)?;
        Ok(Node::new(
            position,
            NodeKind::Lambda {
                params,
                body: Rc::new(body),
                signature: sig,
                shorthand,
            },
        ))
    }
}

fn reject_literal_step(node: &Node) -> Result<(), ParseError> {
    match &node.kind {
        NodeKind::Str(_) | NodeKind::Number(_) | NodeKind::Bool(_) | NodeKind::Null => {
            Err(ParseError::PathLiteral {
                position: node.position,
                literal: node.to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(source: &str) -> Node {
        parse(source).unwrap_or_else(|e| panic!("parse {source:?} failed: {e}"))
    }

    fn perr(source: &str) -> ParseError {
        parse(source).expect_err("expected parse error")
    }

    fn name(n: &str) -> Node {
        Node::new(0, NodeKind::Name(n.into()))
    }

    #[test]
    fn parse_name_path() {
        assert_eq!(
            p("foo.bar.baz").kind,
            NodeKind::Path {
                steps: vec![name("foo"), name("bar"), name("baz")],
                keep_arrays: false,
            }
        );
    }

    #[test]
    fn parse_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        assert_eq!(p("1 + 2 * 3").to_string(), "1 + 2 * 3");
        match p("1 + 2 * 3").kind {
            NodeKind::Numeric {
                op: NumericOp::Add,
                rhs,
                ..
            } => {
                assert!(matches!(
                    rhs.kind,
                    NodeKind::Numeric {
                        op: NumericOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected Add at root, got {other:?}"),
        }
    }

    #[test]
    fn parse_parenthesized_block_survives() {
        match p("(1 + 2) * 3").kind {
            NodeKind::Numeric {
                op: NumericOp::Mul,
                lhs,
                ..
            } => assert!(matches!(lhs.kind, NodeKind::Block(_))),
            other => panic!("expected Mul at root, got {other:?}"),
        }
    }

    #[test]
    fn negative_number_folds_into_literal() {
        assert_eq!(p("-42").kind, NodeKind::Number(-42.0));
        assert!(matches!(p("-foo").kind, NodeKind::Neg(_)));
    }

    #[test]
    fn predicate_attaches_to_last_step() {
        // foo.bar[0] filters the bar step per item.
        match p("foo.bar[0]").kind {
            NodeKind::Path { steps, .. } => {
                assert_eq!(steps.len(), 2);
                assert!(matches!(steps[1].kind, NodeKind::Predicate { .. }));
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_predicate_applies_to_whole_value() {
        match p("(foo.bar)[0]").kind {
            NodeKind::Predicate { expr, .. } => {
                assert!(matches!(expr.kind, NodeKind::Block(_)));
            }
            other => panic!("expected predicate, got {other:?}"),
        }
    }

    #[test]
    fn keep_arrays_marker() {
        assert_eq!(
            p("a.b[]").kind,
            NodeKind::Path {
                steps: vec![name("a"), name("b")],
                keep_arrays: true,
            }
        );
    }

    #[test]
    fn group_on_path() {
        match p("a.b{c: d}").kind {
            NodeKind::Group { input, pairs } => {
                assert!(matches!(input.kind, NodeKind::Path { .. }));
                assert_eq!(pairs.len(), 1);
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn object_constructor_at_prefix() {
        assert!(matches!(
            p("{\"a\": 1}").kind,
            NodeKind::ObjectConstruct(_)
        ));
    }

    #[test]
    fn predicate_after_group_rejected() {
        assert!(matches!(
            perr("*{\"one\": 1}[0]"),
            ParseError::GroupPredicate { .. }
        ));
    }

    #[test]
    fn second_group_rejected() {
        assert!(matches!(
            perr("a{\"b\": 1}{\"c\": 2}"),
            ParseError::GroupGroup { .. }
        ));
    }

    #[test]
    fn literal_path_steps_rejected() {
        assert!(matches!(perr("path.0"), ParseError::PathLiteral { .. }));
        assert!(matches!(
            perr("\"x\".$uppercase()"),
            ParseError::PathLiteral { .. }
        ));
        assert!(matches!(perr("a.true"), ParseError::PathLiteral { .. }));
    }

    #[test]
    fn function_call_as_path_step() {
        match p("a.$uppercase()").kind {
            NodeKind::Path { steps, .. } => {
                assert!(matches!(steps[1].kind, NodeKind::FunctionCall { .. }));
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn conditional_with_and_without_else() {
        assert!(matches!(
            p("a ? 1 : 2").kind,
            NodeKind::Conditional {
                otherwise: Some(_),
                ..
            }
        ));
        assert!(matches!(
            p("a ? 1").kind,
            NodeKind::Conditional {
                otherwise: None,
                ..
            }
        ));
    }

    #[test]
    fn assignment_requires_variable_lhs() {
        assert!(matches!(
            p("$x := 5").kind,
            NodeKind::Assignment { .. }
        ));
        assert!(matches!(
            perr("x := 5"),
            ParseError::IllegalAssignment { .. }
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        match p("$a := $b := 5").kind {
            NodeKind::Assignment { name, value } => {
                assert_eq!(name, "a");
                assert!(matches!(value.kind, NodeKind::Assignment { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn lambda_with_signature() {
        match p("function($x, $y)<nn:n>{$x + $y}").kind {
            NodeKind::Lambda {
                params, signature, ..
            } => {
                assert_eq!(params, vec!["x".to_string(), "y".to_string()]);
                assert!(signature.is_some());
            }
            other => panic!("expected lambda, got {other:?}"),
        }
    }

    #[test]
    fn lambda_shorthand() {
        assert!(matches!(
            p("λ($x){$x}").kind,
            NodeKind::Lambda {
                shorthand: true,
                ..
            }
        ));
    }

    #[test]
    fn lambda_param_count_must_match_signature() {
        assert!(matches!(
            perr("function($x)<nn:n>{$x}"),
            ParseError::ParamCount { .. }
        ));
    }

    #[test]
    fn lambda_rejects_non_variable_params() {
        assert!(matches!(
            perr("function(x){x}"),
            ParseError::IllegalParam { .. }
        ));
        assert!(matches!(
            perr("function(?, $x){$x}"),
            ParseError::IllegalParam { .. }
        ));
    }

    #[test]
    fn lambda_rejects_duplicate_params() {
        assert!(matches!(
            perr("function($x, $x){$x}"),
            ParseError::DuplicateParam { .. }
        ));
    }

    #[test]
    fn partial_application_placeholder() {
        assert!(matches!(
            p("$substring(?, 0, 5)").kind,
            NodeKind::PartialCall { .. }
        ));
    }

    #[test]
    fn apply_operator() {
        assert!(matches!(p("a ~> $sum()").kind, NodeKind::Apply { .. }));
    }

    #[test]
    fn sort_terms_with_direction() {
        match p("a^(>b, c)").kind {
            NodeKind::Sort { terms, .. } => {
                assert!(terms[0].descending);
                assert!(!terms[1].descending);
            }
            other => panic!("expected sort, got {other:?}"),
        }
    }

    #[test]
    fn transform_expression() {
        assert!(matches!(
            p("|a|{\"b\": 1}|").kind,
            NodeKind::Transform { delete: None, .. }
        ));
        assert!(matches!(
            p("|a|{\"b\": 1}, \"c\"|").kind,
            NodeKind::Transform {
                delete: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn range_inside_array() {
        match p("[1..3, 5]").kind {
            NodeKind::ArrayConstruct(items) => {
                assert!(matches!(items[0].kind, NodeKind::Range(..)));
                assert_eq!(items[1].kind, NodeKind::Number(5.0));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn keywords_are_operators_only_in_operator_position() {
        // Prefix position: plain names.
        assert_eq!(p("and").kind, NodeKind::Name("and".into()));
        // Operator position: boolean / membership operators.
        assert!(matches!(p("a and b").kind, NodeKind::Boolean { .. }));
        assert!(matches!(
            p("1 in [1, 2]").kind,
            NodeKind::Comparison {
                op: ComparisonOp::In,
                ..
            }
        ));
    }

    #[test]
    fn regex_literal_in_operand_position() {
        assert!(matches!(p("/ab+/i").kind, NodeKind::Regex { .. }));
        // After a name, `/` is division.
        assert!(matches!(
            p("a / b").kind,
            NodeKind::Numeric {
                op: NumericOp::Div,
                ..
            }
        ));
    }

    #[test]
    fn invalid_regex_rejected_at_parse_time() {
        assert!(matches!(perr("/[unclosed/"), ParseError::InvalidRegex { .. }));
    }

    #[test]
    fn empty_block_parses() {
        assert_eq!(p("()").kind, NodeKind::Block(vec![]));
    }

    #[test]
    fn block_allows_trailing_semicolon() {
        assert_eq!(
            p("(1; 2;)").kind,
            NodeKind::Block(vec![
                Node::new(0, NodeKind::Number(1.0)),
                Node::new(0, NodeKind::Number(2.0)),
            ])
        );
    }

    #[test]
    fn trailing_tokens_rejected() {
        assert!(matches!(perr("1 2"), ParseError::SyntaxError { .. }));
    }

    #[test]
    fn unexpected_eof() {
        assert!(matches!(perr("1 +"), ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn duplicate_filters_fold_onto_one_predicate() {
        match p("foo[0][1]").kind {
            NodeKind::Predicate { filters, .. } => assert_eq!(filters.len(), 2),
            other => panic!("expected predicate, got {other:?}"),
        }
    }

    #[test]
    fn print_parse_round_trip() {
        for src in [
            "foo.bar.baz",
            "$sum(orders.(price * quantity))",
            "foo.blah.baz.fud[0]",
            "(foo.blah.baz.fud)[0]",
            "[0..9][$ % 2 = 0]",
            "$sift($, function($v){$v % 2})",
            "a ? b : c",
            "$x := 5",
            "a.b[]",
            "a{\"k\": v}",
            "{\"k\": \"v\"}",
            "a ~> $trim() ~> $uppercase()",
            "books^(>price, title)",
            "|a.b|{\"c\": 1}, \"d\"|",
            "λ($x)<n:n>{$x * 2}",
            "/ab+/i",
            "'single' & \"double\"",
            "$[0]",
            "**.fud",
            "a.`escaped name`",
        ] {
            let ast = p(src);
            let printed = ast.to_string();
            let reparsed = p(&printed);
            assert_eq!(ast, reparsed, "round trip failed for {src:?} -> {printed:?}");
        }
    }
}
