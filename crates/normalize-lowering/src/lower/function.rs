//! Functions and calls: `fn`, named function clauses, local/remote calls,
//! field access, application and captures.

use std::collections::HashSet;

use crate::ast::{Access, CallMeta, Clause, DotMeta, Node, Resolution};
use crate::error::{LowerError, Result};
use crate::ir::{BinaryOp, Expr, Function, Stmt};
use crate::names;

use super::Lowerer;
use super::control::split_head;
use super::literal;
use super::scope::Scope;

/// One clause of a function: parameter patterns, guards and body.
pub(super) struct ClauseParts<'a> {
    pub patterns: &'a [Node],
    pub guards: Vec<&'a Node>,
    pub body: &'a [Node],
    /// Module attribute versions visible where the clause was written.
    pub attributes: Option<Scope>,
}

/// Parameter names of a clause whose parameters are all distinct plain
/// variables.
fn simple_params(patterns: &[Node]) -> Option<Vec<&str>> {
    let mut seen = HashSet::new();
    patterns
        .iter()
        .map(|p| match p {
            Node::Var { name } if name != "_" && seen.insert(name.as_str()) => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

fn param_name(index: usize) -> String {
    format!("$arg{index}")
}

/// Whether a parenthesis-less `target.name` on this target is a call.
fn is_module_target(target: &Node) -> bool {
    matches!(target, Node::Alias { .. } | Node::Atom(_))
}

impl Lowerer {
    /// Callee expression for `module.function`, routed to the runtime for
    /// runtime-served modules and to a plain identifier for the module
    /// being defined.
    pub(super) fn module_member(&self, module: &[String], function: &str) -> Expr {
        let module = self.resolve_module(module);
        if self.config.is_runtime_module(&module) {
            return self.runtime.module_function(&module, function);
        }
        if self.module.as_ref().is_some_and(|m| m.name == module) {
            return Expr::ident(names::escape_identifier(function));
        }
        Expr::member(
            Expr::ident(names::module_identifier(&module)),
            names::escape_identifier(function),
        )
    }

    pub(super) fn local_call(&mut self, name: &str, args: &[Node], meta: &CallMeta) -> Result<Expr> {
        let callee = match &meta.resolution {
            Resolution::Local | Resolution::ImportedUnqualified => {
                Expr::ident(names::escape_identifier(name))
            }
            Resolution::Qualified(module) => self.module_member(module, name),
        };
        let args = self.exprs(args)?;
        Ok(Expr::call(callee, args))
    }

    /// `target.name(args)` or a parenthesis-less `target.name`. Without an
    /// argument list the metadata decides between a zero-argument call and
    /// a field read; with no metadata, module targets are calls.
    pub(super) fn dot(
        &mut self,
        target: &Node,
        name: &str,
        args: Option<&[Node]>,
        meta: &DotMeta,
    ) -> Result<Expr> {
        let Some(args) = args else {
            let is_call = match meta.access {
                Some(Access::Call) => true,
                Some(Access::Field) => false,
                None => is_module_target(target),
            };
            return if is_call {
                self.remote_call(target, name, &[])
            } else {
                let object = self.expr(target)?;
                Ok(Expr::index(object, literal::atom(name)))
            };
        };
        self.remote_call(target, name, args)
    }

    fn remote_call(&mut self, target: &Node, name: &str, args: &[Node]) -> Result<Expr> {
        let callee = match target {
            Node::Alias { segments } => self.module_member(segments, name),
            Node::Atom(module) => self.runtime.erlang_function(module, name),
            other => {
                let module = self.expr(other)?;
                Expr::member(module, names::escape_identifier(name))
            }
        };
        let args = self.exprs(args)?;
        Ok(Expr::call(callee, args))
    }

    /// `fun.(args)`
    pub(super) fn apply(&mut self, fun: &Node, args: &[Node]) -> Result<Expr> {
        let fun = self.expr(fun)?;
        let args = self.exprs(args)?;
        Ok(Expr::call(fun, args))
    }

    /// `&name/arity`, `&Mod.name/arity`: a reference to the function.
    pub(super) fn capture(&mut self, module: Option<&Node>, name: &str) -> Result<Expr> {
        match module {
            None => Ok(Expr::ident(names::escape_identifier(name))),
            Some(Node::Alias { segments }) => Ok(self.module_member(segments, name)),
            Some(Node::Atom(module)) => Ok(self.runtime.erlang_function(module, name)),
            Some(other) => Err(LowerError::structure(
                "capture",
                format!("module must be an alias or atom, got {}", other.form_name()),
            )),
        }
    }

    pub(super) fn anonymous_fn(&mut self, clauses: &[Clause]) -> Result<Expr> {
        let parts = clauses
            .iter()
            .map(|clause| {
                let (patterns, guards) = split_head(&clause.head)?;
                Ok(ClauseParts {
                    patterns,
                    guards,
                    body: &clause.body,
                    attributes: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let Some(first) = parts.first() else {
            return Err(LowerError::structure("fn", "no clauses"));
        };
        let arity = first.patterns.len();
        if parts.iter().any(|p| p.patterns.len() != arity) {
            return Err(LowerError::structure(
                "fn",
                "all clauses must take the same number of arguments",
            ));
        }

        let function = self.scoped(|this| this.clauses_function("", "anonymous fn", &parts))?;
        Ok(Expr::function(function))
    }

    /// Build one target function from ordered clauses.
    ///
    /// A single unguarded clause of plain variables keeps its parameter
    /// names. Otherwise parameters are `$arg0..` and each clause is tried
    /// in turn; when clauses differ in arity, a clause only applies when
    /// exactly its arguments are present. No match throws
    /// `FunctionClauseError`.
    pub(super) fn clauses_function(
        &mut self,
        name: &str,
        label: &str,
        clauses: &[ClauseParts<'_>],
    ) -> Result<Function> {
        if let [only] = clauses
            && only.guards.is_empty()
            && let Some(params) = simple_params(only.patterns)
        {
            return self.with_attributes(only.attributes.as_ref(), |this| {
                let params = params.iter().map(|p| this.bind_name(p)).collect();
                let body = this.body(only.body)?;
                Ok(Function::new(name, params, body))
            });
        }

        let mut arities: Vec<usize> = clauses.iter().map(|c| c.patterns.len()).collect();
        arities.sort_unstable();
        arities.dedup();
        let max_arity = arities.last().copied().unwrap_or(0);
        let overloaded = arities.len() > 1;

        let params: Vec<String> = (0..max_arity).map(param_name).collect();
        let subjects: Vec<Expr> = params.iter().cloned().map(Expr::ident).collect();

        let mut body = Vec::new();
        for clause in clauses {
            let arity = clause.patterns.len();
            let preconditions = if overloaded {
                arity_tests(arity, max_arity)
            } else {
                Vec::new()
            };
            let block = self.with_attributes(clause.attributes.as_ref(), |this| {
                this.clause_block(
                    &preconditions,
                    clause.patterns,
                    &subjects[..arity],
                    &clause.guards,
                    clause.body,
                )
            })?;
            let exhaustive = block.is_terminal();
            body.push(block);
            if exhaustive && !overloaded {
                break;
            }
        }

        if !body.last().is_some_and(Stmt::is_terminal) {
            let arity_label = arities
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(",");
            body.push(Stmt::throw(self.runtime.error(
                "FunctionClauseError",
                vec![
                    Expr::string(format!("{label}/{arity_label}")),
                    Expr::array(subjects),
                ],
            )));
        }
        Ok(Function::new(name, params, body))
    }
}

/// Tests selecting calls with exactly `arity` of `max_arity` arguments.
/// Lowered values are never `undefined`, so a missing argument is one
/// that reads as `undefined`.
fn arity_tests(arity: usize, max_arity: usize) -> Vec<Expr> {
    let undefined = || Expr::ident("undefined");
    let mut tests = Vec::new();
    if arity > 0 {
        tests.push(Expr::binary(
            Expr::ident(param_name(arity - 1)),
            BinaryOp::Ne,
            undefined(),
        ));
    }
    if arity < max_arity {
        tests.push(Expr::binary(
            Expr::ident(param_name(arity)),
            BinaryOp::Eq,
            undefined(),
        ));
    }
    tests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LowerConfig;
    use crate::runtime;

    fn lower(node: &Node) -> Result<Expr> {
        Lowerer::new(&LowerConfig::default()).lower_expr(node)
    }

    fn rt(path: &[&str]) -> Expr {
        path.iter()
            .fold(Expr::ident("Runtime"), |acc, s| Expr::member(acc, *s))
    }

    fn function_of(expr: Expr) -> Function {
        match expr {
            Expr::Function(f) => *f,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_anonymous_fn_keeps_names() {
        let node = Node::Fn(vec![Clause::new(
            vec![Node::var("x")],
            vec![Node::op("+", Node::var("x"), Node::Integer(1))],
        )]);
        let f = function_of(lower(&node).unwrap());
        assert_eq!(f.params, vec!["x"]);
        assert_eq!(
            f.body,
            vec![Stmt::return_stmt(Some(Expr::binary(
                Expr::ident("x"),
                BinaryOp::Add,
                Expr::integer(1)
            )))]
        );
    }

    #[test]
    fn test_pattern_parameter_uses_match() {
        let node = Node::Fn(vec![Clause::new(
            vec![Node::tuple(vec![Node::atom("ok"), Node::var("v")])],
            vec![Node::var("v")],
        )]);
        let f = function_of(lower(&node).unwrap());
        assert_eq!(f.params, vec!["$arg0"]);
        assert!(matches!(f.body[0], Stmt::If { .. }));
        assert_eq!(
            f.body.last(),
            Some(&Stmt::throw(Expr::new_(
                rt(&["FunctionClauseError"]),
                vec![
                    Expr::string("anonymous fn/1"),
                    Expr::array(vec![Expr::ident("$arg0")])
                ]
            )))
        );
    }

    #[test]
    fn test_anonymous_fn_arity_mismatch() {
        let node = Node::Fn(vec![
            Clause::new(vec![Node::var("a")], vec![]),
            Clause::new(vec![Node::var("a"), Node::var("b")], vec![]),
        ]);
        assert!(matches!(
            lower(&node),
            Err(LowerError::Structure { form: "fn", .. })
        ));
    }

    #[test]
    fn test_closure_captures_current_version() {
        let node = Node::Block(vec![
            Node::bind(Node::var("x"), Node::Integer(1)),
            Node::bind(
                Node::var("f"),
                Node::Fn(vec![Clause::new(vec![], vec![Node::var("x")])]),
            ),
            Node::bind(Node::var("x"), Node::Integer(2)),
            Node::Apply {
                fun: Box::new(Node::var("f")),
                args: vec![],
            },
        ]);
        let expected = Expr::iife(vec![
            Stmt::const_decl("x", Expr::integer(1)),
            Stmt::const_decl(
                "f",
                Expr::function(Function::anonymous(
                    vec![],
                    vec![Stmt::return_stmt(Some(Expr::ident("x")))],
                )),
            ),
            Stmt::const_decl("x$1", Expr::integer(2)),
            Stmt::return_stmt(Some(Expr::call(Expr::ident("f"), vec![]))),
        ]);
        assert_eq!(lower(&node).unwrap(), expected);
    }

    #[test]
    fn test_call_resolutions() {
        let local = Node::call("helper", vec![Node::Integer(1)]);
        assert_eq!(
            lower(&local).unwrap(),
            Expr::call(Expr::ident("helper"), vec![Expr::integer(1)])
        );

        let qualified = Node::Call {
            name: "parse".into(),
            args: vec![],
            meta: CallMeta {
                resolution: Resolution::Qualified(vec!["Json".into()]),
                line: None,
            },
        };
        assert_eq!(
            lower(&qualified).unwrap(),
            Expr::call(Expr::member(Expr::ident("Json"), "parse"), vec![])
        );

        let runtime_qualified = Node::Call {
            name: "length".into(),
            args: vec![Node::var("xs")],
            meta: CallMeta {
                resolution: Resolution::Qualified(vec!["Kernel".into()]),
                line: None,
            },
        };
        assert_eq!(
            lower(&runtime_qualified).unwrap(),
            Expr::call(rt(&["Kernel", "length"]), vec![Expr::ident("xs")])
        );
    }

    #[test]
    fn test_remote_calls() {
        let node = Node::remote(Node::alias(&["My", "Mod"]), "valid?", vec![Node::var("x")]);
        assert_eq!(
            lower(&node).unwrap(),
            Expr::call(
                Expr::member(Expr::ident("My$Mod"), "valid$q"),
                vec![Expr::ident("x")]
            )
        );

        let erlang = Node::remote(Node::atom("lists"), "reverse", vec![Node::var("x")]);
        assert_eq!(
            lower(&erlang).unwrap(),
            Expr::call(rt(&["erlang", "lists", "reverse"]), vec![Expr::ident("x")])
        );
    }

    #[test]
    fn test_dot_without_args_uses_metadata() {
        let field = Node::Dot {
            target: Box::new(Node::var("user")),
            name: "name".into(),
            args: None,
            meta: DotMeta::default(),
        };
        assert_eq!(
            lower(&field).unwrap(),
            Expr::index(Expr::ident("user"), runtime::atom("name"))
        );

        let module_call = Node::Dot {
            target: Box::new(Node::alias(&["Config"])),
            name: "load".into(),
            args: None,
            meta: DotMeta::default(),
        };
        assert_eq!(
            lower(&module_call).unwrap(),
            Expr::call(Expr::member(Expr::ident("Config"), "load"), vec![])
        );

        let forced_field = Node::Dot {
            target: Box::new(Node::alias(&["Config"])),
            name: "load".into(),
            args: None,
            meta: DotMeta {
                access: Some(Access::Field),
                line: None,
            },
        };
        assert_eq!(
            lower(&forced_field).unwrap(),
            Expr::index(runtime::atom("Elixir.Config"), runtime::atom("load"))
        );

        let forced_call = Node::Dot {
            target: Box::new(Node::var("mod")),
            name: "run".into(),
            args: None,
            meta: DotMeta {
                access: Some(Access::Call),
                line: None,
            },
        };
        assert_eq!(
            lower(&forced_call).unwrap(),
            Expr::call(Expr::member(Expr::ident("mod"), "run"), vec![])
        );
    }

    #[test]
    fn test_captures() {
        let local = Node::Capture {
            module: None,
            name: "even?".into(),
            arity: 1,
        };
        assert_eq!(lower(&local).unwrap(), Expr::ident("even$q"));

        let remote = Node::Capture {
            module: Some(Box::new(Node::alias(&["Enum"]))),
            name: "sum".into(),
            arity: 1,
        };
        assert_eq!(lower(&remote).unwrap(), rt(&["Enum", "sum"]));
    }

    #[test]
    fn test_arity_tests() {
        assert_eq!(
            arity_tests(1, 2),
            vec![
                Expr::binary(Expr::ident("$arg0"), BinaryOp::Ne, Expr::ident("undefined")),
                Expr::binary(Expr::ident("$arg1"), BinaryOp::Eq, Expr::ident("undefined")),
            ]
        );
        assert_eq!(
            arity_tests(0, 1),
            vec![Expr::binary(
                Expr::ident("$arg0"),
                BinaryOp::Eq,
                Expr::ident("undefined")
            )]
        );
    }
}
