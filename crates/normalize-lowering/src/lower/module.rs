//! Modules: `defmodule`, attributes, import declarations and grouping of
//! `def`/`defp` clauses into target functions.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::ast::{Node, Visibility};
use crate::error::{LowerError, Result};
use crate::ir::{Expr, Import, ImportBinding, Module, ModuleFunction, Stmt};
use crate::names;

use super::Lowerer;
use super::control::flatten_guards;
use super::function::ClauseParts;
use super::scope::{Scope, Versions};

/// Attributes that only carry documentation or type information.
const SKIPPED_ATTRIBUTES: &[&str] = &[
    "doc",
    "moduledoc",
    "typedoc",
    "spec",
    "type",
    "typep",
    "opaque",
    "callback",
    "macrocallback",
    "impl",
    "behaviour",
    "since",
    "deprecated",
    "dialyzer",
];

/// The module currently being lowered.
pub(crate) struct ModuleContext {
    pub name: Vec<String>,
    attributes: Scope,
    attribute_versions: Versions,
    /// First segment of a nested module's name → its full name.
    aliases: HashMap<String, Vec<String>>,
    /// Escaped names of the functions callable unqualified in this module.
    pub functions: HashSet<String>,
}

impl ModuleContext {
    fn new(name: &[String], aliases: HashMap<String, Vec<String>>) -> Self {
        Self {
            name: name.to_vec(),
            attributes: Scope::default(),
            attribute_versions: Versions::default(),
            aliases,
            functions: HashSet::new(),
        }
    }

    fn define_attribute(&mut self, name: &str) -> String {
        let version = self.attribute_versions.allocate(name);
        self.attributes.set(name, version);
        names::versioned(&names::attribute_identifier(name), version)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .version(name)
            .map(|v| names::versioned(&names::attribute_identifier(name), v))
    }
}

/// Clauses of one source function name, in source order.
struct FunctionGroup<'a> {
    name: &'a str,
    visibility: Visibility,
    /// Arity of each clause, paired with its visibility, for mixed
    /// def/defp detection.
    arities: Vec<(usize, Visibility)>,
    clauses: Vec<ClauseParts<'a>>,
}

const NO_PARAMS: &[Node] = &[];

/// Name, parameters and guards of a `def` head.
fn def_head(head: &Node) -> Result<(&str, &[Node], Vec<&Node>)> {
    match head {
        Node::Call { name, args, .. } => Ok((name.as_str(), args.as_slice(), Vec::new())),
        // `def name do ... end` without parentheses.
        Node::Var { name } => Ok((name.as_str(), NO_PARAMS, Vec::new())),
        Node::When { exprs, guard } => match exprs.as_slice() {
            [Node::Call { name, args, .. }] => {
                Ok((name.as_str(), args.as_slice(), flatten_guards(guard)?))
            }
            [Node::Var { name }] => Ok((name.as_str(), NO_PARAMS, flatten_guards(guard)?)),
            _ => Err(LowerError::structure(
                "def",
                "`when` must wrap the function head",
            )),
        },
        other => Err(LowerError::structure(
            "def",
            format!("expected a function head, got {}", other.form_name()),
        )),
    }
}

/// Functions a module body makes callable without qualification.
fn local_functions(body: &[Node]) -> HashSet<String> {
    let mut functions = HashSet::new();
    for item in body {
        match item {
            Node::Def { head, .. } => {
                if let Ok((name, _, _)) = def_head(head) {
                    functions.insert(names::escape_identifier(name));
                }
            }
            Node::ImportOnly { only, .. } => {
                functions.extend(only.iter().map(|(name, _)| names::escape_identifier(name)));
            }
            Node::DefStruct(_) => {
                functions.insert("__struct__".to_string());
            }
            Node::DefException(_) => {
                functions.insert("__struct__".to_string());
                functions.insert("exception".to_string());
            }
            _ => {}
        }
    }
    functions
}

impl Lowerer {
    pub(super) fn module(&mut self, name: &[String], body: &[Node]) -> Result<Module> {
        let aliases = self
            .module
            .as_ref()
            .map(|m| m.aliases.clone())
            .unwrap_or_default();
        let outer = self.module.replace(ModuleContext::new(name, aliases));
        let result = self.function_scope(|this| this.module_body(name, body));
        self.module = outer;
        result
    }

    fn module_body(&mut self, name: &[String], body: &[Node]) -> Result<Module> {
        self.context_mut()?.functions = local_functions(body);
        let mut imports = Vec::new();
        let mut stmts = Vec::new();
        let mut groups: Vec<FunctionGroup<'_>> = Vec::new();
        let mut structs = Vec::new();

        for item in body {
            match item {
                Node::Def {
                    visibility,
                    head,
                    body,
                } => {
                    let (fname, patterns, guards) = def_head(head)?;
                    let clause = ClauseParts {
                        patterns,
                        guards,
                        body,
                        attributes: Some(self.context_mut()?.attributes.clone()),
                    };
                    self.add_clause(&mut groups, fname, *visibility, clause)?;
                }
                Node::Attribute {
                    name: attribute,
                    value,
                } => {
                    if SKIPPED_ATTRIBUTES.contains(&attribute.as_str()) {
                        debug!(attribute = %attribute, "skipping documentation attribute");
                        continue;
                    }
                    let value = self.expr(value)?;
                    let target = self.context_mut()?.define_attribute(attribute);
                    stmts.push(Stmt::const_decl(target, value));
                }
                Node::Import { .. }
                | Node::ImportOnly { .. }
                | Node::AliasDecl { .. }
                | Node::Require { .. } => imports.extend(self.import_decl(item)?),
                Node::DefStruct(fields) => structs.push((fields, false)),
                Node::DefException(fields) => structs.push((fields, true)),
                Node::Module {
                    name: inner,
                    body: inner_body,
                } => {
                    let full: Vec<String> = name.iter().chain(inner).cloned().collect();
                    if let Some(first) = inner.first() {
                        let target = name.iter().chain(Some(first)).cloned().collect();
                        self.context_mut()?.aliases.insert(first.clone(), target);
                    }
                    stmts.push(Stmt::Module(Box::new(self.module(&full, inner_body)?)));
                }
                other => stmts.extend(self.effect(other)?),
            }
        }

        let mut functions = Vec::new();
        if structs.len() > 1 {
            return Err(LowerError::structure(
                "defstruct",
                "a module defines at most one struct",
            ));
        }
        for (fields, exception) in structs {
            let custom_exception = groups
                .iter()
                .any(|g| g.name == "exception" && g.arities.iter().any(|(a, _)| *a == 1));
            functions.extend(self.struct_functions(name, fields, exception, custom_exception)?);
        }
        for group in &groups {
            functions.push(self.lower_group(group)?);
        }

        debug!(
            module = %names::module_path(name),
            functions = functions.len(),
            imports = imports.len(),
            "lowered module"
        );
        Ok(Module {
            name: names::module_identifier(name),
            imports,
            body: stmts,
            functions,
        })
    }

    fn add_clause<'a>(
        &self,
        groups: &mut Vec<FunctionGroup<'a>>,
        name: &'a str,
        visibility: Visibility,
        clause: ClauseParts<'a>,
    ) -> Result<()> {
        let arity = clause.patterns.len();
        let Some(index) = groups.iter().position(|g| g.name == name) else {
            groups.push(FunctionGroup {
                name,
                visibility,
                arities: vec![(arity, visibility)],
                clauses: vec![clause],
            });
            return Ok(());
        };

        let group = &mut groups[index];
        match group.arities.iter().find(|(a, _)| *a == arity) {
            Some((_, existing)) if *existing != visibility => {
                return Err(LowerError::structure(
                    "def",
                    format!("{name}/{arity} is defined with both def and defp"),
                ));
            }
            Some(_) => {}
            None => group.arities.push((arity, visibility)),
        }
        if visibility == Visibility::Public {
            group.visibility = Visibility::Public;
        }
        group.clauses.push(clause);
        Ok(())
    }

    fn lower_group(&mut self, group: &FunctionGroup<'_>) -> Result<ModuleFunction> {
        debug!(
            function = group.name,
            arities = ?group.arities.iter().map(|(a, _)| *a).collect::<Vec<_>>(),
            clauses = group.clauses.len(),
            "grouping function clauses"
        );
        let target = names::escape_identifier(group.name);
        let function =
            self.function_scope(|this| this.clauses_function(&target, group.name, &group.clauses))?;
        Ok(ModuleFunction {
            function,
            exported: group.visibility == Visibility::Public,
        })
    }

    /// Run `f` with the attribute versions a clause was written under.
    pub(super) fn with_attributes<T>(
        &mut self,
        attributes: Option<&Scope>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let Some(attributes) = attributes else {
            return f(self);
        };
        let saved = std::mem::replace(&mut self.context_mut()?.attributes, attributes.clone());
        let result = f(self);
        self.context_mut()?.attributes = saved;
        result
    }

    /// Expand a nested module's short name to its full name.
    pub(super) fn resolve_module(&self, segments: &[String]) -> Vec<String> {
        let expanded = segments.split_first().and_then(|(first, rest)| {
            let full = self.module.as_ref()?.aliases.get(first)?;
            Some(full.iter().chain(rest).cloned().collect::<Vec<_>>())
        });
        expanded.unwrap_or_else(|| segments.to_vec())
    }

    fn context_mut(&mut self) -> Result<&mut ModuleContext> {
        self.module.as_mut().ok_or_else(|| {
            LowerError::structure("module attribute", "used outside of a module")
        })
    }

    /// `@name`: the version of the attribute defined before this read.
    pub(super) fn attribute_ref(&mut self, name: &str) -> Result<Expr> {
        let Some(context) = &self.module else {
            return Err(LowerError::structure(
                "attribute read",
                "used outside of a module",
            ));
        };
        match context.attribute(name) {
            Some(target) => Ok(Expr::ident(target)),
            None => {
                warn!(
                    attribute = %name,
                    module = %names::module_path(&context.name),
                    "module attribute read before it was set; using nil"
                );
                Ok(Expr::null())
            }
        }
    }

    /// Import declaration for `import`/`alias`/`require`. Runtime-served
    /// modules need none.
    pub(super) fn import_decl(&self, node: &Node) -> Result<Option<Import>> {
        let (module, binding) = match node {
            Node::Import { module } => (
                module,
                ImportBinding::Namespace(names::module_identifier(module)),
            ),
            Node::ImportOnly { module, only } => {
                let mut functions: Vec<String> = Vec::with_capacity(only.len());
                for (name, _) in only {
                    let escaped = names::escape_identifier(name);
                    if !functions.contains(&escaped) {
                        functions.push(escaped);
                    }
                }
                (module, ImportBinding::Named(functions))
            }
            Node::AliasDecl { module, as_name } => {
                let local = match (as_name, module.last()) {
                    (Some(alias), _) => names::escape_identifier(alias),
                    (None, Some(last)) => names::escape_identifier(last),
                    (None, None) => {
                        return Err(LowerError::structure("alias", "empty module name"));
                    }
                };
                (module, ImportBinding::Default(local))
            }
            Node::Require { module, as_name } => {
                let local = match as_name {
                    Some(alias) => names::escape_identifier(alias),
                    None => names::module_identifier(module),
                };
                (module, ImportBinding::Default(local))
            }
            other => {
                return Err(LowerError::structure(
                    other.form_name(),
                    "not an import declaration",
                ));
            }
        };

        if module.is_empty() {
            return Err(LowerError::structure(node.form_name(), "empty module name"));
        }
        if self.config.is_runtime_module(module) {
            return Ok(None);
        }
        Ok(Some(Import {
            binding,
            source: self.config.import_source(&names::module_path(module)),
        }))
    }
}
