/// Printer round-trip property: for ASTs in the parser's canonical shape,
/// `parse(print(ast))` is structurally equivalent to the AST. Uses proptest
/// to generate expression trees; operands of binary operators are leaves or
/// parenthesized blocks, which is exactly the shape the parser produces.
use proptest::prelude::*;

use jsonata::expr::parser::parse;
use jsonata::expr::{BooleanOp, ComparisonOp, Node, NodeKind, NumericOp};

fn node(kind: NodeKind) -> Node {
    Node::new(0, kind)
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("keywords act as operators", |s| {
        !matches!(
            s.as_str(),
            "and" | "or" | "in" | "true" | "false" | "null" | "function"
        )
    })
}

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        Just(node(NodeKind::Null)),
        any::<bool>().prop_map(|b| node(NodeKind::Bool(b))),
        (-1.0e9..1.0e9f64).prop_map(|n| node(NodeKind::Number(n))),
        any::<i32>().prop_map(|n| node(NodeKind::Number(n as f64))),
        "[ -~]{0,12}".prop_map(|s| node(NodeKind::Str(s))),
        "\\PC{0,8}".prop_map(|s| node(NodeKind::Str(s))),
        name_strategy().prop_map(|n| node(NodeKind::Name(n))),
        name_strategy().prop_map(|n| node(NodeKind::Var(n))),
        Just(node(NodeKind::Var(String::new()))),
        Just(node(NodeKind::Var("$".into()))),
        "[a-z *+.]{1,8}".prop_map(|n| node(NodeKind::EscapedName(n))),
        Just(node(NodeKind::Wildcard)),
    ]
}

/// An operand in the canonical shape: leaves stand alone, anything
/// compound sits inside a parenthesized block, as the parser leaves it.
fn operand(inner: impl Strategy<Value = Node>) -> impl Strategy<Value = Node> {
    prop_oneof![
        leaf(),
        inner.prop_map(|n| node(NodeKind::Block(vec![n]))),
    ]
}

fn numeric_op() -> impl Strategy<Value = NumericOp> {
    prop_oneof![
        Just(NumericOp::Add),
        Just(NumericOp::Sub),
        Just(NumericOp::Mul),
        Just(NumericOp::Div),
        Just(NumericOp::Rem),
    ]
}

fn comparison_op() -> impl Strategy<Value = ComparisonOp> {
    prop_oneof![
        Just(ComparisonOp::Eq),
        Just(ComparisonOp::Ne),
        Just(ComparisonOp::Lt),
        Just(ComparisonOp::Le),
        Just(ComparisonOp::Gt),
        Just(ComparisonOp::Ge),
        Just(ComparisonOp::In),
    ]
}

fn expr_strategy() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            // Binary operators over canonical operands.
            (numeric_op(), operand(inner.clone()), operand(inner.clone())).prop_map(
                |(op, lhs, rhs)| node(NodeKind::Numeric {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            ),
            (comparison_op(), operand(inner.clone()), operand(inner.clone())).prop_map(
                |(op, lhs, rhs)| node(NodeKind::Comparison {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            ),
            (
                prop_oneof![Just(BooleanOp::And), Just(BooleanOp::Or)],
                operand(inner.clone()),
                operand(inner.clone())
            )
                .prop_map(|(op, lhs, rhs)| node(NodeKind::Boolean {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })),
            (operand(inner.clone()), operand(inner.clone())).prop_map(|(lhs, rhs)| {
                node(NodeKind::Concat {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }),
            // Paths over name steps.
            prop::collection::vec(name_strategy(), 2..4).prop_map(|names| {
                node(NodeKind::Path {
                    steps: names
                        .into_iter()
                        .map(|n| node(NodeKind::Name(n)))
                        .collect(),
                    keep_arrays: false,
                })
            }),
            // Predicates over a name with numeric or block filters.
            (name_strategy(), prop::collection::vec(operand(inner.clone()), 1..3)).prop_map(
                |(base, filters)| node(NodeKind::Predicate {
                    expr: Box::new(node(NodeKind::Name(base))),
                    filters,
                })
            ),
            // Constructors.
            prop::collection::vec(operand(inner.clone()), 0..4)
                .prop_map(|items| node(NodeKind::ArrayConstruct(items))),
            prop::collection::vec(("[a-z]{1,5}", operand(inner.clone())), 0..3).prop_map(
                |pairs| node(NodeKind::ObjectConstruct(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (node(NodeKind::Str(k)), v))
                        .collect(),
                ))
            ),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|exprs| node(NodeKind::Block(exprs))),
            // Conditionals.
            (operand(inner.clone()), operand(inner.clone()), operand(inner.clone())).prop_map(
                |(c, t, e)| node(NodeKind::Conditional {
                    cond: Box::new(c),
                    then: Box::new(t),
                    otherwise: Some(Box::new(e)),
                })
            ),
            // Assignment and lambdas.
            (name_strategy(), operand(inner.clone())).prop_map(|(name, value)| {
                node(NodeKind::Assignment {
                    name,
                    value: Box::new(value),
                })
            }),
            (
                prop::collection::vec(name_strategy(), 0..3).prop_map(|mut params| {
                    params.sort();
                    params.dedup();
                    params
                }),
                operand(inner.clone()),
                any::<bool>()
            )
                .prop_map(|(params, body, shorthand)| {
                    node(NodeKind::Lambda {
                        params,
                        body: std::rc::Rc::new(body),
                        signature: None,
                        shorthand,
                    })
                }),
            // Function calls on a variable.
            (name_strategy(), prop::collection::vec(operand(inner.clone()), 0..3)).prop_map(
                |(name, args)| node(NodeKind::FunctionCall {
                    proc: Box::new(node(NodeKind::Var(name))),
                    args,
                })
            ),
            // Negation of a non-literal.
            name_strategy().prop_map(|n| {
                node(NodeKind::Neg(Box::new(node(NodeKind::Name(n)))))
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn parse_print_parse_is_identity(ast in expr_strategy()) {
        let printed = ast.to_string();
        let reparsed = parse(&printed)
            .unwrap_or_else(|e| panic!("printed form failed to parse: {printed:?}: {e}"));
        prop_assert_eq!(&ast, &reparsed, "print form was {}", printed);
    }

    #[test]
    fn printing_is_a_normal_form(ast in expr_strategy()) {
        let printed = ast.to_string();
        let reparsed = parse(&printed).unwrap();
        prop_assert_eq!(printed.clone(), reparsed.to_string());
    }
}
