//! Control flow: `if`/`unless`, `case`, `cond`, comprehensions and the
//! clause machinery shared with function lowering.

use crate::ast::{Clause, Node, Qualifier};
use crate::error::{LowerError, Result};
use crate::ir::{Expr, Stmt};

use super::Lowerer;

/// Split a clause head into its patterns and guards.
pub(super) fn split_head(head: &[Node]) -> Result<(&[Node], Vec<&Node>)> {
    match head {
        [Node::When { exprs, guard }] => Ok((exprs.as_slice(), flatten_guards(guard)?)),
        _ if head.iter().any(|n| matches!(n, Node::When { .. })) => Err(LowerError::structure(
            "when",
            "a guard must wrap the whole clause head",
        )),
        _ => Ok((head, Vec::new())),
    }
}

/// `a when b when c` nests as `a when (b when c)`; the chain is a list of
/// alternatives.
pub(super) fn flatten_guards(guard: &Node) -> Result<Vec<&Node>> {
    match guard {
        Node::When { exprs, guard } => match exprs.as_slice() {
            [first] => {
                let mut guards = vec![first];
                guards.extend(flatten_guards(guard)?);
                Ok(guards)
            }
            _ => Err(LowerError::structure(
                "when",
                "a chained guard must hold exactly one expression",
            )),
        },
        other => Ok(vec![other]),
    }
}

fn is_always_true(node: &Node) -> bool {
    matches!(node, Node::Boolean(true)) || matches!(node, Node::Atom(a) if a == "true")
}

impl Lowerer {
    /// One clause as a statement:
    ///
    /// ```text
    /// if (preconditions && tests) { bindings; if (guard) { body } }
    /// ```
    ///
    /// The body returns, so control falls through to the next clause only
    /// when the patterns or the guard fail.
    pub(super) fn clause_block(
        &mut self,
        preconditions: &[Expr],
        patterns: &[Node],
        subjects: &[Expr],
        guards: &[&Node],
        body: &[Node],
    ) -> Result<Stmt> {
        self.scoped(|this| {
            let plan = this.plan(patterns, subjects)?;
            let test = Expr::all(
                preconditions
                    .iter()
                    .cloned()
                    .chain(plan.tests)
                    .collect(),
            );
            let mut inner = this.commit(plan.bindings);

            if guards.is_empty() {
                inner.extend(this.body(body)?);
            } else {
                let guard = this.guard(guards)?;
                let body = this.body(body)?;
                inner.push(Stmt::if_stmt(guard, Stmt::block(body), None));
            }

            Ok(match test {
                Some(test) => Stmt::if_stmt(test, Stmt::block(inner), None),
                None => Stmt::block(inner),
            })
        })
    }

    /// Any of the guards passing selects the clause.
    fn guard(&mut self, guards: &[&Node]) -> Result<Expr> {
        let conditions = guards
            .iter()
            .map(|g| self.condition(g))
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::any(conditions).unwrap_or_else(|| Expr::bool(true)))
    }

    pub(super) fn conditional(
        &mut self,
        condition: &Node,
        then: &[Node],
        otherwise: Option<&[Node]>,
        negate: bool,
    ) -> Result<Expr> {
        let test = self.condition(condition)?;
        let then = self.value_of(then)?;
        let otherwise = self.value_of(otherwise.unwrap_or_default())?;
        Ok(if negate {
            Expr::conditional(test, otherwise, then)
        } else {
            Expr::conditional(test, then, otherwise)
        })
    }

    pub(super) fn if_tail(
        &mut self,
        condition: &Node,
        then: &[Node],
        otherwise: Option<&[Node]>,
        negate: bool,
    ) -> Result<Vec<Stmt>> {
        let test = self.condition(condition)?;
        let then = Stmt::block(self.scoped(|this| this.body(then))?);
        let otherwise =
            Stmt::block(self.scoped(|this| this.body(otherwise.unwrap_or_default()))?);
        let (consequent, alternate) = if negate {
            (otherwise, then)
        } else {
            (then, otherwise)
        };
        Ok(vec![Stmt::if_stmt(test, consequent, Some(alternate))])
    }

    /// Clauses are tried in source order; the first whose pattern and
    /// guard hold runs.
    pub(super) fn case(&mut self, subject: &Node, clauses: &[Clause]) -> Result<Vec<Stmt>> {
        if clauses.is_empty() {
            return Err(LowerError::structure("case", "no clauses"));
        }

        let value = self.expr(subject)?;
        let mut stmts = Vec::new();
        let subject = if matches!(value, Expr::Ident(_)) {
            value
        } else {
            let temp = self.fresh("case");
            stmts.push(Stmt::const_decl(temp.clone(), value));
            Expr::ident(temp)
        };

        for clause in clauses {
            let (patterns, guards) = split_head(&clause.head)?;
            if patterns.len() != 1 {
                return Err(LowerError::structure(
                    "case",
                    format!("clause has {} patterns, expected 1", patterns.len()),
                ));
            }
            let block = self.clause_block(
                &[],
                patterns,
                std::slice::from_ref(&subject),
                &guards,
                &clause.body,
            )?;
            let exhaustive = block.is_terminal();
            stmts.push(block);
            if exhaustive {
                break;
            }
        }

        if !stmts.last().is_some_and(Stmt::is_terminal) {
            stmts.push(Stmt::throw(
                self.runtime.error("CaseClauseError", vec![subject]),
            ));
        }
        Ok(stmts)
    }

    pub(super) fn cond(&mut self, clauses: &[Clause]) -> Result<Vec<Stmt>> {
        if clauses.is_empty() {
            return Err(LowerError::structure("cond", "no clauses"));
        }

        let mut stmts = Vec::new();
        for clause in clauses {
            let [condition] = clause.head.as_slice() else {
                return Err(LowerError::structure(
                    "cond",
                    format!(
                        "clause has {} conditions, expected 1",
                        clause.head.len()
                    ),
                ));
            };
            if is_always_true(condition) {
                stmts.push(Stmt::block(self.scoped(|this| this.body(&clause.body))?));
                return Ok(stmts);
            }
            let test = self.condition(condition)?;
            let body = self.scoped(|this| this.body(&clause.body))?;
            stmts.push(Stmt::if_stmt(test, Stmt::block(body), None));
        }

        stmts.push(Stmt::throw(self.runtime.error("CondClauseError", vec![])));
        Ok(stmts)
    }

    /// `for` comprehension: nested loops over `Enum.to_list` of each
    /// generator, filters as `if`s, results pushed onto an accumulator.
    pub(super) fn comprehension(
        &mut self,
        qualifiers: &[Qualifier],
        body: &[Node],
        into: Option<&Node>,
    ) -> Result<Expr> {
        if !matches!(qualifiers.first(), Some(Qualifier::Generator { .. })) {
            return Err(LowerError::structure(
                "for",
                "the first qualifier must be a generator",
            ));
        }

        let into = into.map(|n| self.expr(n)).transpose()?;
        self.scoped(|this| {
            let acc = this.fresh("acc");
            let loops = this.qualifiers(qualifiers, &acc, body)?;
            let result = match into {
                Some(into) => this
                    .runtime
                    .call(&["Enum", "into"], vec![Expr::ident(acc.clone()), into]),
                None => Expr::ident(acc.clone()),
            };
            Ok(Expr::iife(vec![
                Stmt::const_decl(acc, Expr::array(vec![])),
                loops,
                Stmt::return_stmt(Some(result)),
            ]))
        })
    }

    fn qualifiers(&mut self, qualifiers: &[Qualifier], acc: &str, body: &[Node]) -> Result<Stmt> {
        match qualifiers.split_first() {
            None => {
                let value = self.value_of(body)?;
                Ok(Stmt::expr(Expr::method(
                    Expr::ident(acc),
                    "push",
                    vec![value],
                )))
            }
            Some((
                Qualifier::Generator {
                    pattern,
                    collection,
                },
                rest,
            )) => {
                let collection = self.expr(collection)?;
                let iterable = self.runtime.to_list(collection);
                let item = self.fresh("gen");
                // Elements that do not match the pattern are skipped.
                let plan = self.plan(std::slice::from_ref(pattern), &[Expr::ident(item.clone())])?;
                let test = plan.test();
                let mut inner = self.commit(plan.bindings);
                inner.push(self.qualifiers(rest, acc, body)?);
                let body = match test {
                    Some(test) => Stmt::if_stmt(test, Stmt::block(inner), None),
                    None => Stmt::block(inner),
                };
                Ok(Stmt::for_in(item, iterable, body))
            }
            Some((Qualifier::Filter(condition), rest)) => {
                let test = self.condition(condition)?;
                let inner = self.qualifiers(rest, acc, body)?;
                Ok(Stmt::if_stmt(test, Stmt::block(vec![inner]), None))
            }
        }
    }
}
