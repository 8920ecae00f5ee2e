//! Operators, ranges and truthiness.

use crate::ast::{Node, Resolution};
use crate::error::{LowerError, Result};
use crate::ir::{BinaryOp, Expr, Function, Stmt, UnaryOp};

use super::Lowerer;

/// Operators whose target form is a single binary operator.
fn direct_operator(op: &str) -> Option<BinaryOp> {
    Some(match op {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "==" | "===" => BinaryOp::Eq,
        "!=" | "!==" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        _ => return None,
    })
}

/// Whether `node` always evaluates to a boolean, so a condition on it
/// needs no truthiness conversion.
pub(crate) fn is_boolean(node: &Node) -> bool {
    match node {
        Node::Boolean(_) => true,
        Node::Atom(name) => name == "true" || name == "false",
        // `and`/`or` return their right operand when it is evaluated.
        Node::BinaryOp { op, right, .. } if op == "and" || op == "or" => is_boolean(right),
        Node::BinaryOp { op, .. } => {
            op == "in" || direct_operator(op).is_some_and(BinaryOp::is_boolean)
        }
        Node::UnaryOp { op, .. } => op == "not" || op == "!",
        Node::Call { name, meta, .. } => {
            name.starts_with("is_")
                && matches!(&meta.resolution, Resolution::Qualified(m) if m.len() == 1 && m[0] == "Kernel")
        }
        _ => false,
    }
}

/// `() => value`
fn thunk(value: Expr) -> Expr {
    Expr::function(Function::anonymous(
        vec![],
        vec![Stmt::return_stmt(Some(value))],
    ))
}

/// `String(value)` unless `value` is already a string literal.
fn coerce_string(value: Expr) -> Expr {
    if value.is_string_literal() {
        value
    } else {
        Expr::call(Expr::ident("String"), vec![value])
    }
}

impl Lowerer {
    pub(super) fn binary_op(&mut self, op: &str, left: &Node, right: &Node) -> Result<Expr> {
        if let Some(binary) = direct_operator(op) {
            let left = self.expr(left)?;
            let right = self.expr(right)?;
            return Ok(Expr::binary(left, binary, right));
        }

        let left = self.expr(left)?;
        let right = self.expr(right)?;
        Ok(match op {
            "&&" => self
                .runtime
                .call(&["Kernel", "relaxed_and"], vec![left, thunk(right)]),
            "||" => self
                .runtime
                .call(&["Kernel", "relaxed_or"], vec![left, thunk(right)]),
            "<>" => Expr::binary(coerce_string(left), BinaryOp::Add, coerce_string(right)),
            "++" => Expr::method(left, "concat", vec![right]),
            "--" => self.runtime.call(&["List", "subtract"], vec![left, right]),
            "in" => self.runtime.call(&["Kernel", "in"], vec![left, right]),
            other => {
                return Err(LowerError::unsupported(format!("operator `{other}`")));
            }
        })
    }

    pub(super) fn unary_op(&mut self, op: &str, operand: &Node) -> Result<Expr> {
        match (op, operand) {
            ("-", Node::Integer(n)) => Ok(n.checked_neg().map_or_else(
                || Expr::unary(UnaryOp::Neg, Expr::integer(*n)),
                Expr::integer,
            )),
            ("-", Node::Float(f)) => Ok(Expr::float(-f)),
            ("-", _) => Ok(Expr::unary(UnaryOp::Neg, self.expr(operand)?)),
            ("+", _) => self.expr(operand),
            ("not", _) => Ok(Expr::unary(UnaryOp::Not, self.expr(operand)?)),
            ("!", _) => Ok(Expr::unary(UnaryOp::Not, self.condition(operand)?)),
            (other, _) => Err(LowerError::unsupported(format!("unary operator `{other}`"))),
        }
    }

    pub(super) fn range(&mut self, first: &Node, last: &Node, step: Option<&Node>) -> Result<Expr> {
        let first = self.expr(first)?;
        let last = self.expr(last)?;
        let step = step.map(|s| self.expr(s)).transpose()?;
        Ok(self.runtime.range(first, last, step))
    }

    /// Lower `node` as a branch condition: only `false` and `nil` are
    /// falsy in the source language.
    pub(crate) fn condition(&mut self, node: &Node) -> Result<Expr> {
        let value = self.expr(node)?;
        Ok(if is_boolean(node) {
            value
        } else {
            self.runtime.truthy(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CallMeta;
    use crate::config::LowerConfig;

    fn lower(node: &Node) -> Result<Expr> {
        Lowerer::new(&LowerConfig::default()).lower_expr(node)
    }

    fn rt(path: &[&str]) -> Expr {
        path.iter()
            .fold(Expr::ident("Runtime"), |acc, s| Expr::member(acc, *s))
    }

    #[test]
    fn test_arithmetic_and_comparison() {
        assert_eq!(
            lower(&Node::op("+", Node::var("a"), Node::Integer(1))).unwrap(),
            Expr::binary(Expr::ident("a"), BinaryOp::Add, Expr::integer(1))
        );
        assert_eq!(
            lower(&Node::op("==", Node::var("a"), Node::var("b"))).unwrap(),
            Expr::binary(Expr::ident("a"), BinaryOp::Eq, Expr::ident("b"))
        );
        assert_eq!(
            lower(&Node::op("!==", Node::var("a"), Node::var("b"))).unwrap(),
            Expr::binary(Expr::ident("a"), BinaryOp::Ne, Expr::ident("b"))
        );
    }

    #[test]
    fn test_relaxed_boolean_operators_are_lazy() {
        let expr = lower(&Node::op("||", Node::var("a"), Node::var("b"))).unwrap();
        assert_eq!(
            expr,
            Expr::call(
                rt(&["Kernel", "relaxed_or"]),
                vec![Expr::ident("a"), thunk(Expr::ident("b"))]
            )
        );
    }

    #[test]
    fn test_string_concat() {
        let expr = lower(&Node::op("<>", Node::string("a"), Node::var("b"))).unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                Expr::string("a"),
                BinaryOp::Add,
                Expr::call(Expr::ident("String"), vec![Expr::ident("b")])
            )
        );
    }

    #[test]
    fn test_list_operators() {
        assert_eq!(
            lower(&Node::op("++", Node::var("a"), Node::var("b"))).unwrap(),
            Expr::method(Expr::ident("a"), "concat", vec![Expr::ident("b")])
        );
        assert_eq!(
            lower(&Node::op("in", Node::var("x"), Node::var("xs"))).unwrap(),
            Expr::call(
                rt(&["Kernel", "in"]),
                vec![Expr::ident("x"), Expr::ident("xs")]
            )
        );
    }

    #[test]
    fn test_unknown_operator_is_unsupported() {
        let err = lower(&Node::op("^^^", Node::Integer(1), Node::Integer(2))).unwrap_err();
        assert_eq!(err, LowerError::unsupported("operator `^^^`"));
    }

    #[test]
    fn test_unknown_operator_fails_inside_larger_tree() {
        let node = Node::tuple(vec![
            Node::Integer(1),
            Node::op("<<<", Node::Integer(1), Node::Integer(2)),
        ]);
        assert!(matches!(lower(&node), Err(LowerError::UnsupportedForm(_))));
    }

    #[test]
    fn test_negative_literal_folds() {
        let node = Node::UnaryOp {
            op: "-".into(),
            operand: Box::new(Node::Integer(5)),
        };
        assert_eq!(lower(&node).unwrap(), Expr::integer(-5));
    }

    #[test]
    fn test_bang_uses_truthiness() {
        let node = Node::UnaryOp {
            op: "!".into(),
            operand: Box::new(Node::var("x")),
        };
        assert_eq!(
            lower(&node).unwrap(),
            Expr::unary(
                UnaryOp::Not,
                Expr::call(rt(&["Kernel", "truthy"]), vec![Expr::ident("x")])
            )
        );
    }

    #[test]
    fn test_logical_operator_with_non_boolean_result_uses_truthiness() {
        // `true and 0` is `0`, which is truthy.
        let node = Node::If {
            condition: Box::new(Node::op("and", Node::var("x"), Node::Integer(0))),
            then: vec![Node::atom("yes")],
            otherwise: Some(vec![Node::atom("no")]),
        };
        let Expr::Conditional { test, .. } = lower(&node).unwrap() else {
            panic!("expected conditional");
        };
        assert_eq!(
            *test,
            Expr::call(
                rt(&["Kernel", "truthy"]),
                vec![Expr::binary(Expr::ident("x"), BinaryOp::And, Expr::integer(0))]
            )
        );

        let node = Node::op("or", Node::Boolean(false), Node::string(""));
        assert!(!is_boolean(&node));
    }

    #[test]
    fn test_range_with_step() {
        let node = Node::Range {
            first: Box::new(Node::Integer(1)),
            last: Box::new(Node::Integer(10)),
            step: Some(Box::new(Node::Integer(2))),
        };
        assert_eq!(
            lower(&node).unwrap(),
            Expr::call(
                rt(&["Range", "new"]),
                vec![Expr::integer(1), Expr::integer(10), Expr::integer(2)]
            )
        );
    }

    #[test]
    fn test_boolean_shapes() {
        assert!(is_boolean(&Node::op("<", Node::var("a"), Node::var("b"))));
        assert!(is_boolean(&Node::op(
            "and",
            Node::var("a"),
            Node::op("==", Node::var("b"), Node::Integer(1))
        )));
        assert!(!is_boolean(&Node::op("and", Node::var("a"), Node::var("b"))));
        assert!(!is_boolean(&Node::op("&&", Node::var("a"), Node::var("b"))));
        assert!(!is_boolean(&Node::var("a")));
        assert!(is_boolean(&Node::Call {
            name: "is_integer".into(),
            args: vec![Node::var("a")],
            meta: CallMeta {
                resolution: Resolution::Qualified(vec!["Kernel".into()]),
                line: None,
            },
        }));
    }
}
