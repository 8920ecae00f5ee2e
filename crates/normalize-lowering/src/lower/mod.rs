//! The lowering dispatcher.
//!
//! `Lowerer` walks a pipe-free source tree and routes each node to the
//! builder for its form. Builders live in the sibling modules and are
//! methods on `Lowerer`, so they share the scope, the synthetic-name
//! counter and the enclosing-module context:
//!
//! - `literal`: scalars, atoms, lists, tuples, binaries
//! - `data`: maps, structs, `defstruct`/`defexception`, `raise`
//! - `expression`: operators, ranges, truthiness
//! - `pattern`: pattern compilation into tests and bindings
//! - `control`: blocks, `if`/`unless`, `case`, `cond`, `for`
//! - `function`: `fn`, calls, captures, grouped `def` clauses
//! - `module`: `defmodule`, attributes, import declarations
//!
//! Every node has three possible positions. `expr` yields a value,
//! `tail` yields statements ending in `return`/`throw`, and `effect`
//! yields statements evaluated only for their bindings and side effects.
//! Statement-shaped forms in expression position are wrapped in an
//! immediately-invoked arrow function.

mod control;
mod data;
mod expression;
mod function;
mod literal;
mod module;
mod pattern;
mod scope;

use tracing::trace;

use crate::ast::Node;
use crate::config::LowerConfig;
use crate::desugar::desugar_pipes;
use crate::error::{LowerError, Result};
use crate::ir::{Expr, Program, Stmt};
use crate::runtime::Runtime;

use module::ModuleContext;
use scope::{Scope, Versions};

/// Lowers source trees into the target IR.
///
/// State is reset at the start of every public call, so translating the
/// same node twice yields identical output.
pub struct Lowerer {
    config: LowerConfig,
    runtime: Runtime,
    scope: Scope,
    versions: Versions,
    synthetic: u32,
    module: Option<ModuleContext>,
}

impl Lowerer {
    pub fn new(config: &LowerConfig) -> Self {
        Self {
            runtime: Runtime::new(config.runtime()),
            config: config.clone(),
            scope: Scope::default(),
            versions: Versions::default(),
            synthetic: 0,
            module: None,
        }
    }

    pub fn config(&self) -> &LowerConfig {
        &self.config
    }

    /// Lower a single expression.
    pub fn lower_expr(&mut self, node: &Node) -> Result<Expr> {
        self.reset();
        let node = desugar_pipes(node)?;
        self.expr(&node)
    }

    /// Lower a sequence of top-level forms (modules, imports, expressions).
    pub fn lower_program(&mut self, nodes: &[Node]) -> Result<Program> {
        self.reset();
        let nodes = nodes
            .iter()
            .map(desugar_pipes)
            .collect::<Result<Vec<_>>>()?;
        let mut body = Vec::new();
        for node in &nodes {
            body.extend(self.top_level(node)?);
        }
        Ok(Program::new(body))
    }

    fn reset(&mut self) {
        self.scope = Scope::default();
        self.versions = Versions::default();
        self.synthetic = 0;
        self.module = None;
    }

    fn top_level(&mut self, node: &Node) -> Result<Vec<Stmt>> {
        match node {
            Node::Module { name, body } => {
                Ok(vec![Stmt::Module(Box::new(self.module(name, body)?))])
            }
            Node::Import { .. }
            | Node::ImportOnly { .. }
            | Node::AliasDecl { .. }
            | Node::Require { .. } => Ok(self.import_decl(node)?.map(Stmt::Import).into_iter().collect()),
            _ => self.effect(node),
        }
    }

    /// Lower `node` in expression position.
    pub(crate) fn expr(&mut self, node: &Node) -> Result<Expr> {
        trace!(form = node.form_name(), "lowering expression");
        match node {
            Node::Integer(n) => Ok(Expr::integer(*n)),
            Node::Float(f) => Ok(Expr::float(*f)),
            Node::String(s) => Ok(Expr::string(s.clone())),
            Node::Boolean(b) => Ok(Expr::bool(*b)),
            Node::Nil => Ok(Expr::null()),
            Node::Atom(name) => Ok(literal::atom(name)),
            Node::Var { name } => Ok(Expr::ident(self.resolve_name(name))),
            Node::Alias { segments } => Ok(literal::module_value(&self.resolve_module(segments))),

            Node::List(items) => Ok(Expr::array(self.exprs(items)?)),
            Node::Cons { head, tail } => self.cons(head, tail),
            Node::Tuple(items) => self.tuple(items),
            Node::Binary(segments) => self.binary(segments),

            Node::Map(pairs) => self.map(pairs),
            Node::MapUpdate { map, updates } => self.map_update(map, updates),
            Node::Struct {
                module,
                fields,
                update,
            } => self.struct_literal(module, fields, update.as_deref()),

            Node::BinaryOp { op, left, right } => self.binary_op(op, left, right),
            Node::UnaryOp { op, operand } => self.unary_op(op, operand),
            Node::Range { first, last, step } => self.range(first, last, step.as_deref()),

            Node::Call { name, args, meta } => self.local_call(name, args, meta),
            Node::Dot {
                target,
                name,
                args,
                meta,
            } => self.dot(target, name, args.as_deref(), meta),
            Node::Apply { fun, args } => self.apply(fun, args),
            Node::Capture { module, name, .. } => self.capture(module.as_deref(), name),
            Node::Fn(clauses) => self.anonymous_fn(clauses),

            Node::If {
                condition,
                then,
                otherwise,
            } => self.conditional(condition, then, otherwise.as_deref(), false),
            Node::Unless {
                condition,
                then,
                otherwise,
            } => self.conditional(condition, then, otherwise.as_deref(), true),
            Node::For {
                qualifiers,
                body,
                into,
            } => self.comprehension(qualifiers, body, into.as_deref()),
            Node::AttributeRef(name) => self.attribute_ref(name),

            Node::Bind { .. }
            | Node::Case { .. }
            | Node::Cond(_)
            | Node::Block(_)
            | Node::Raise { .. } => {
                let body = self.scoped(|this| this.tail(node))?;
                Ok(Expr::iife(body))
            }

            Node::Pipe { .. } => Err(LowerError::structure(
                "pipe",
                "pipes must be rewritten before dispatch",
            )),
            Node::Pin(_) => Err(LowerError::structure(
                "pin",
                "`^` is only valid inside a pattern",
            )),
            Node::When { .. } => Err(LowerError::structure(
                "when",
                "guard outside of a clause head",
            )),
            Node::Def { .. }
            | Node::Module { .. }
            | Node::Attribute { .. }
            | Node::Import { .. }
            | Node::ImportOnly { .. }
            | Node::AliasDecl { .. }
            | Node::Require { .. }
            | Node::DefStruct(_)
            | Node::DefException(_) => Err(LowerError::structure(
                node.form_name(),
                "not valid in expression position",
            )),
        }
    }

    pub(crate) fn exprs(&mut self, nodes: &[Node]) -> Result<Vec<Expr>> {
        nodes.iter().map(|n| self.expr(n)).collect()
    }

    /// Lower `node` as the last expression of a body: the statements end
    /// in `return` or `throw`.
    pub(crate) fn tail(&mut self, node: &Node) -> Result<Vec<Stmt>> {
        match node {
            Node::Bind { pattern, value } => {
                let (mut stmts, value) = self.bind(pattern, value)?;
                stmts.push(Stmt::return_stmt(Some(value)));
                Ok(stmts)
            }
            Node::Case { subject, clauses } => self.case(subject, clauses),
            Node::Cond(clauses) => self.cond(clauses),
            Node::Block(items) => self.body(items),
            Node::If {
                condition,
                then,
                otherwise,
            } => self.if_tail(condition, then, otherwise.as_deref(), false),
            Node::Unless {
                condition,
                then,
                otherwise,
            } => self.if_tail(condition, then, otherwise.as_deref(), true),
            Node::Raise {
                exception,
                attributes,
            } => Ok(vec![Stmt::throw(
                self.raise(exception, attributes.as_deref())?,
            )]),
            _ => Ok(vec![Stmt::return_stmt(Some(self.expr(node)?))]),
        }
    }

    /// Lower `node` for its effects only.
    pub(crate) fn effect(&mut self, node: &Node) -> Result<Vec<Stmt>> {
        match node {
            Node::Bind { pattern, value } => Ok(self.bind(pattern, value)?.0),
            Node::Block(items) => {
                let mut stmts = Vec::new();
                for item in items {
                    stmts.extend(self.effect(item)?);
                }
                Ok(stmts)
            }
            Node::Raise {
                exception,
                attributes,
            } => Ok(vec![Stmt::throw(
                self.raise(exception, attributes.as_deref())?,
            )]),
            Node::Case { .. } | Node::Cond(_) => {
                let body = self.scoped(|this| this.tail(node))?;
                Ok(vec![Stmt::expr(Expr::iife(body))])
            }
            _ => Ok(vec![Stmt::expr(self.expr(node)?)]),
        }
    }

    /// A body: every expression in order, the last one returned. An empty
    /// body returns `nil`.
    pub(crate) fn body(&mut self, items: &[Node]) -> Result<Vec<Stmt>> {
        let Some((last, rest)) = items.split_last() else {
            return Ok(vec![Stmt::return_stmt(Some(Expr::null()))]);
        };
        let mut stmts = Vec::new();
        for item in rest {
            stmts.extend(self.effect(item)?);
        }
        stmts.extend(self.tail(last)?);
        Ok(stmts)
    }

    /// The value of a body in expression position.
    pub(crate) fn value_of(&mut self, items: &[Node]) -> Result<Expr> {
        match items {
            [] => Ok(Expr::null()),
            [single] => self.scoped(|this| this.expr(single)),
            _ => {
                let body = self.scoped(|this| this.body(items))?;
                Ok(Expr::iife(body))
            }
        }
    }

    /// Run `f` in a child scope; bindings made inside are dropped after.
    pub(crate) fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.scope.clone();
        let result = f(self);
        self.scope = saved;
        result
    }

    /// Run `f` as the body of a named function: a fresh scope, fresh
    /// rebinding versions and a fresh synthetic counter.
    pub(crate) fn function_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let scope = std::mem::take(&mut self.scope);
        let versions = std::mem::take(&mut self.versions);
        let synthetic = std::mem::replace(&mut self.synthetic, 0);
        let result = f(self);
        self.scope = scope;
        self.versions = versions;
        self.synthetic = synthetic;
        result
    }

    /// Bind a source variable in the current scope.
    pub(crate) fn bind_name(&mut self, name: &str) -> String {
        let functions = self.module.as_ref().map(|m| &m.functions);
        scope::bind(&mut self.scope, &mut self.versions, name, functions)
    }

    pub(crate) fn resolve_name(&self, name: &str) -> String {
        let functions = self.module.as_ref().map(|m| &m.functions);
        scope::resolve(&self.scope, name, functions)
    }

    /// A synthetic identifier, e.g. `$m0`.
    pub(crate) fn fresh(&mut self, prefix: &str) -> String {
        let n = self.synthetic;
        self.synthetic += 1;
        format!("${prefix}{n}")
    }
}
