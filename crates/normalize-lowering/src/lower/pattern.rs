//! Pattern compiler.
//!
//! A pattern applied to a subject expression compiles to a list of boolean
//! tests (all must hold for the match to succeed) and a list of bindings
//! (source name, accessor expression). Tests are evaluated before any
//! binding is declared; pins resolve against the scope in effect before
//! the match.

use std::collections::HashMap;

use crate::ast::Node;
use crate::error::{LowerError, Result};
use crate::ir::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::runtime;

use super::Lowerer;
use super::literal;

/// Tests and bindings produced by one or more patterns of a clause.
#[derive(Debug, Default)]
pub(crate) struct MatchPlan {
    pub tests: Vec<Expr>,
    pub bindings: Vec<(String, Expr)>,
    /// First accessor of each variable bound so far; a repeated variable
    /// must be equal to it.
    seen: HashMap<String, Expr>,
}

impl MatchPlan {
    /// The conjunction of all tests, `None` for an irrefutable pattern.
    pub fn test(&self) -> Option<Expr> {
        Expr::all(self.tests.clone())
    }
}

fn strict_eq(left: Expr, right: Expr) -> Expr {
    Expr::binary(left, BinaryOp::Eq, right)
}

/// `Array.isArray(value)`
fn is_array(value: Expr) -> Expr {
    Expr::call(
        Expr::member(Expr::ident("Array"), "isArray"),
        vec![value],
    )
}

/// A float literal pattern. `===` would also accept the integer of the
/// same value, so these compare through the runtime.
fn float_literal(node: &Node) -> Option<Expr> {
    match node {
        Node::Float(f) => Some(Expr::float(*f)),
        Node::UnaryOp { op, operand } if op == "-" => match operand.as_ref() {
            Node::Float(f) => Some(Expr::float(-f)),
            _ => None,
        },
        _ => None,
    }
}

/// Constant value of a literal pattern.
fn literal_value(node: &Node) -> Option<Expr> {
    Some(match node {
        Node::Integer(n) => Expr::integer(*n),
        Node::Float(f) => Expr::float(*f),
        Node::String(s) => Expr::string(s.clone()),
        Node::Boolean(b) => Expr::bool(*b),
        Node::Nil => Expr::null(),
        Node::Atom(name) => literal::atom(name),
        Node::UnaryOp { op, operand } if op == "-" => match operand.as_ref() {
            Node::Integer(n) => Expr::integer(n.checked_neg()?),
            Node::Float(f) => Expr::float(-f),
            _ => return None,
        },
        Node::Binary(segments) => Expr::string(literal::string_segments(segments)?),
        _ => return None,
    })
}

impl Lowerer {
    /// Compile `pattern` against `subject` into `plan`.
    pub(super) fn compile_pattern(
        &self,
        pattern: &Node,
        subject: Expr,
        plan: &mut MatchPlan,
    ) -> Result<()> {
        if let Some(value) = float_literal(pattern) {
            plan.tests.push(self.runtime.equals(subject, value));
            return Ok(());
        }
        if let Node::Alias { segments } = pattern {
            let module = literal::module_value(&self.resolve_module(segments));
            plan.tests.push(strict_eq(subject, module));
            return Ok(());
        }
        if let Some(value) = literal_value(pattern) {
            plan.tests.push(strict_eq(subject, value));
            return Ok(());
        }

        match pattern {
            Node::Var { name } if name == "_" => {}
            Node::Var { name } => match plan.seen.get(name) {
                Some(first) => {
                    let first = first.clone();
                    plan.tests.push(self.runtime.equals(subject, first));
                }
                None => {
                    plan.seen.insert(name.clone(), subject.clone());
                    plan.bindings.push((name.clone(), subject));
                }
            },

            Node::Pin(inner) => match inner.as_ref() {
                Node::Var { name } => {
                    let pinned = Expr::ident(self.resolve_name(name));
                    plan.tests.push(self.runtime.equals(subject, pinned));
                }
                other => {
                    return Err(LowerError::structure(
                        "pin",
                        format!("can only pin a variable, got {}", other.form_name()),
                    ));
                }
            },

            Node::Tuple(items) => {
                plan.tests.push(self.runtime.is_tuple(subject.clone()));
                plan.tests.push(strict_eq(
                    Expr::member(subject.clone(), "size"),
                    Expr::integer(items.len() as i64),
                ));
                for (i, item) in items.iter().enumerate() {
                    let slot = Expr::method(subject.clone(), "get", vec![Expr::integer(i as i64)]);
                    self.compile_pattern(item, slot, plan)?;
                }
            }

            Node::List(items) => {
                plan.tests.push(is_array(subject.clone()));
                plan.tests.push(strict_eq(
                    Expr::member(subject.clone(), "length"),
                    Expr::integer(items.len() as i64),
                ));
                for (i, item) in items.iter().enumerate() {
                    let element = Expr::index(subject.clone(), Expr::integer(i as i64));
                    self.compile_pattern(item, element, plan)?;
                }
            }

            Node::Cons { head, tail } => {
                let n = head.len() as i64;
                plan.tests.push(is_array(subject.clone()));
                plan.tests.push(Expr::binary(
                    Expr::member(subject.clone(), "length"),
                    BinaryOp::Ge,
                    Expr::integer(n),
                ));
                for (i, item) in head.iter().enumerate() {
                    let element = Expr::index(subject.clone(), Expr::integer(i as i64));
                    self.compile_pattern(item, element, plan)?;
                }
                let rest = Expr::method(subject, "slice", vec![Expr::integer(n)]);
                self.compile_pattern(tail, rest, plan)?;
            }

            Node::Map(pairs) => {
                plan.tests.push(self.runtime.is_map(subject.clone()));
                self.compile_entries(pairs, &subject, plan)?;
            }

            Node::Struct {
                module,
                fields,
                update: None,
            } => {
                plan.tests.push(self.runtime.is_map(subject.clone()));
                let tag = Expr::index(subject.clone(), runtime::atom("__struct__"));
                self.compile_pattern(module, tag, plan)?;
                self.compile_entries(fields, &subject, plan)?;
            }

            Node::Bind { pattern, value } => {
                self.compile_pattern(pattern, subject.clone(), plan)?;
                self.compile_pattern(value, subject, plan)?;
            }

            Node::BinaryOp { op, left, right } if op == "<>" => {
                let Node::String(prefix) = left.as_ref() else {
                    return Err(LowerError::unsupported(
                        "string pattern with a non-literal prefix",
                    ));
                };
                plan.tests.push(strict_eq(
                    Expr::unary(UnaryOp::TypeOf, subject.clone()),
                    Expr::string("string"),
                ));
                plan.tests.push(Expr::method(
                    subject.clone(),
                    "startsWith",
                    vec![Expr::string(prefix.clone())],
                ));
                let offset = prefix.encode_utf16().count() as i64;
                let rest = Expr::method(subject, "slice", vec![Expr::integer(offset)]);
                self.compile_pattern(right, rest, plan)?;
            }

            other => {
                return Err(LowerError::unsupported(format!(
                    "{} in a pattern",
                    other.form_name()
                )));
            }
        }
        Ok(())
    }

    fn compile_entries(
        &self,
        pairs: &[(Node, Node)],
        subject: &Expr,
        plan: &mut MatchPlan,
    ) -> Result<()> {
        for (key, value) in pairs {
            let key = self.pattern_key(key)?;
            plan.tests
                .push(Expr::binary(key.clone(), BinaryOp::In, subject.clone()));
            self.compile_pattern(value, Expr::index(subject.clone(), key), plan)?;
        }
        Ok(())
    }

    fn pattern_key(&self, key: &Node) -> Result<Expr> {
        if let Some(value) = literal_value(key) {
            return Ok(value);
        }
        match key {
            Node::Alias { segments } => Ok(literal::module_value(&self.resolve_module(segments))),
            Node::Pin(inner) => match inner.as_ref() {
                Node::Var { name } => Ok(Expr::ident(self.resolve_name(name))),
                other => Err(LowerError::structure(
                    "map pattern",
                    format!("can only pin a variable, got {}", other.form_name()),
                )),
            },
            other => Err(LowerError::structure(
                "map pattern",
                format!(
                    "keys must be literals or pinned variables, got {}",
                    other.form_name()
                ),
            )),
        }
    }

    /// Compile patterns against subjects into one plan.
    pub(super) fn plan(&self, patterns: &[Node], subjects: &[Expr]) -> Result<MatchPlan> {
        let mut plan = MatchPlan::default();
        for (pattern, subject) in patterns.iter().zip(subjects) {
            self.compile_pattern(pattern, subject.clone(), &mut plan)?;
        }
        Ok(plan)
    }

    /// Declare the plan's bindings in the current scope.
    pub(super) fn commit(&mut self, bindings: Vec<(String, Expr)>) -> Vec<Stmt> {
        bindings
            .into_iter()
            .map(|(name, accessor)| Stmt::const_decl(self.bind_name(&name), accessor))
            .collect()
    }

    /// `pattern = value` as statements, plus an expression holding the
    /// matched value. A failed match throws `MatchError`.
    pub(super) fn bind(&mut self, pattern: &Node, value: &Node) -> Result<(Vec<Stmt>, Expr)> {
        let value = self.expr(value)?;

        if let Node::Var { name } = pattern
            && name != "_"
        {
            let target = self.bind_name(name);
            return Ok((
                vec![Stmt::const_decl(target.clone(), value)],
                Expr::ident(target),
            ));
        }

        let mut stmts = Vec::new();
        let subject = if matches!(value, Expr::Ident(_)) {
            value
        } else {
            let temp = self.fresh("m");
            stmts.push(Stmt::const_decl(temp.clone(), value));
            Expr::ident(temp)
        };

        let plan = self.plan(std::slice::from_ref(pattern), std::slice::from_ref(&subject))?;
        if let Some(test) = plan.test() {
            stmts.push(Stmt::if_stmt(
                Expr::unary(UnaryOp::Not, test),
                Stmt::throw(self.runtime.error("MatchError", vec![subject.clone()])),
                None,
            ));
        }
        stmts.extend(self.commit(plan.bindings));
        Ok((stmts, subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LowerConfig;

    fn plan_for(pattern: &Node) -> Result<MatchPlan> {
        let lowerer = Lowerer::new(&LowerConfig::default());
        lowerer.plan(std::slice::from_ref(pattern), &[Expr::ident("s")])
    }

    fn rt(path: &[&str]) -> Expr {
        path.iter()
            .fold(Expr::ident("Runtime"), |acc, s| Expr::member(acc, *s))
    }

    #[test]
    fn test_variable_binds_subject() {
        let plan = plan_for(&Node::var("x")).unwrap();
        assert!(plan.tests.is_empty());
        assert_eq!(plan.bindings, vec![("x".to_string(), Expr::ident("s"))]);
    }

    #[test]
    fn test_wildcard_is_irrefutable() {
        let plan = plan_for(&Node::var("_")).unwrap();
        assert!(plan.test().is_none());
        assert!(plan.bindings.is_empty());
    }

    #[test]
    fn test_tuple_pattern() {
        let plan = plan_for(&Node::tuple(vec![Node::atom("ok"), Node::var("v")])).unwrap();
        let get = |i| Expr::method(Expr::ident("s"), "get", vec![Expr::integer(i)]);
        assert_eq!(
            plan.tests,
            vec![
                Expr::binary(Expr::ident("s"), BinaryOp::InstanceOf, rt(&["Tuple"])),
                strict_eq(Expr::member(Expr::ident("s"), "size"), Expr::integer(2)),
                strict_eq(get(0), runtime::atom("ok")),
            ]
        );
        assert_eq!(plan.bindings, vec![("v".to_string(), get(1))]);
    }

    #[test]
    fn test_repeated_variable_tests_equality() {
        let plan = plan_for(&Node::tuple(vec![Node::var("x"), Node::var("x")])).unwrap();
        assert_eq!(plan.bindings.len(), 1);
        let get = |i| Expr::method(Expr::ident("s"), "get", vec![Expr::integer(i)]);
        assert_eq!(
            plan.tests.last(),
            Some(&Expr::call(rt(&["Patterns", "equals"]), vec![get(1), get(0)]))
        );
    }

    #[test]
    fn test_cons_pattern() {
        let plan = plan_for(&Node::Cons {
            head: vec![Node::var("h")],
            tail: Box::new(Node::var("t")),
        })
        .unwrap();
        assert_eq!(plan.tests.len(), 2);
        assert_eq!(
            plan.bindings,
            vec![
                (
                    "h".to_string(),
                    Expr::index(Expr::ident("s"), Expr::integer(0))
                ),
                (
                    "t".to_string(),
                    Expr::method(Expr::ident("s"), "slice", vec![Expr::integer(1)])
                ),
            ]
        );
    }

    #[test]
    fn test_map_pattern_checks_keys() {
        let plan = plan_for(&Node::Map(vec![(Node::atom("name"), Node::var("n"))])).unwrap();
        let key = runtime::atom("name");
        assert_eq!(
            plan.tests,
            vec![
                Expr::call(rt(&["Patterns", "is_map"]), vec![Expr::ident("s")]),
                Expr::binary(key.clone(), BinaryOp::In, Expr::ident("s")),
            ]
        );
        assert_eq!(
            plan.bindings,
            vec![("n".to_string(), Expr::index(Expr::ident("s"), key))]
        );
    }

    #[test]
    fn test_struct_pattern_checks_module() {
        let plan = plan_for(&Node::Struct {
            module: Box::new(Node::alias(&["User"])),
            fields: vec![],
            update: None,
        })
        .unwrap();
        assert_eq!(
            plan.tests[1],
            strict_eq(
                Expr::index(Expr::ident("s"), runtime::atom("__struct__")),
                runtime::atom("Elixir.User")
            )
        );
    }

    #[test]
    fn test_pin_reads_outer_binding() {
        let mut lowerer = Lowerer::new(&LowerConfig::default());
        lowerer.bind_name("x");
        lowerer.bind_name("x");
        let plan = lowerer
            .plan(&[Node::Pin(Box::new(Node::var("x")))], &[Expr::ident("s")])
            .unwrap();
        assert_eq!(
            plan.tests,
            vec![Expr::call(
                rt(&["Patterns", "equals"]),
                vec![Expr::ident("s"), Expr::ident("x$1")]
            )]
        );
        assert!(plan.bindings.is_empty());
    }

    #[test]
    fn test_string_prefix_pattern() {
        let plan = plan_for(&Node::op("<>", Node::string("héllo "), Node::var("rest"))).unwrap();
        assert_eq!(plan.tests.len(), 2);
        assert_eq!(
            plan.bindings,
            vec![(
                "rest".to_string(),
                Expr::method(Expr::ident("s"), "slice", vec![Expr::integer(6)])
            )]
        );
    }

    #[test]
    fn test_negative_literal_pattern() {
        let plan = plan_for(&Node::UnaryOp {
            op: "-".into(),
            operand: Box::new(Node::Integer(1)),
        })
        .unwrap();
        assert_eq!(
            plan.tests,
            vec![strict_eq(Expr::ident("s"), Expr::integer(-1))]
        );
    }

    #[test]
    fn test_float_pattern_uses_runtime_equality() {
        let plan = plan_for(&Node::Float(1.0)).unwrap();
        assert_eq!(
            plan.tests,
            vec![Expr::call(
                rt(&["Patterns", "equals"]),
                vec![Expr::ident("s"), Expr::float(1.0)]
            )]
        );
        let plan = plan_for(&Node::UnaryOp {
            op: "-".into(),
            operand: Box::new(Node::Float(0.0)),
        })
        .unwrap();
        assert_eq!(
            plan.tests,
            vec![Expr::call(
                rt(&["Patterns", "equals"]),
                vec![Expr::ident("s"), Expr::float(-0.0)]
            )]
        );
    }

    #[test]
    fn test_string_binary_matches_its_own_value() {
        use crate::ast::Segment;

        let binary = Node::Binary(vec![Segment::Value(Node::string("abc"))]);
        let mut lowerer = Lowerer::new(&LowerConfig::default());
        let value = lowerer.expr(&binary).unwrap();
        let plan = lowerer
            .plan(std::slice::from_ref(&binary), std::slice::from_ref(&value))
            .unwrap();
        assert_eq!(plan.tests, vec![strict_eq(value.clone(), value)]);
    }

    #[test]
    fn test_call_in_pattern_is_unsupported() {
        assert!(matches!(
            plan_for(&Node::call("f", vec![])),
            Err(LowerError::UnsupportedForm(_))
        ));
    }

    #[test]
    fn test_non_literal_map_key_is_malformed() {
        assert!(matches!(
            plan_for(&Node::Map(vec![(Node::var("k"), Node::var("v"))])),
            Err(LowerError::Structure {
                form: "map pattern",
                ..
            })
        ));
    }

    #[test]
    fn test_bind_with_refutable_pattern_throws() {
        let mut lowerer = Lowerer::new(&LowerConfig::default());
        let (stmts, value) = lowerer
            .bind(
                &Node::tuple(vec![Node::atom("ok"), Node::var("v")]),
                &Node::call("fetch", vec![]),
            )
            .unwrap();
        assert_eq!(value, Expr::ident("$m0"));
        assert_eq!(stmts.len(), 3);
        assert!(matches!(&stmts[1], Stmt::If { consequent, .. } if consequent.is_terminal()));
        assert_eq!(
            stmts[2],
            Stmt::const_decl(
                "v",
                Expr::method(Expr::ident("$m0"), "get", vec![Expr::integer(1)])
            )
        );
    }
}
