//! Maps, structs, struct definitions and `raise`.

use crate::ast::{Node, Segment};
use crate::error::{LowerError, Result};
use crate::ir::{Expr, Function, ModuleFunction, Property, Stmt};
use crate::runtime;

use super::Lowerer;
use super::literal;

impl Lowerer {
    /// String keys become plain property names; atoms and every other key
    /// are computed.
    fn property(&mut self, key: &Node, value: &Node) -> Result<Property> {
        match key {
            Node::String(name) => Ok(Property::named(name.clone(), self.expr(value)?)),
            _ => {
                let key = self.expr(key)?;
                Ok(Property::computed(key, self.expr(value)?))
            }
        }
    }

    fn object(&mut self, pairs: &[(Node, Node)]) -> Result<Expr> {
        let properties = pairs
            .iter()
            .map(|(k, v)| self.property(k, v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::object(properties))
    }

    pub(super) fn map(&mut self, pairs: &[(Node, Node)]) -> Result<Expr> {
        self.object(pairs)
    }

    /// `%{map | k => v}` → `Runtime.SpecialForms.map_update(map, {k: v})`
    pub(super) fn map_update(&mut self, map: &Node, updates: &[(Node, Node)]) -> Result<Expr> {
        let map = self.expr(map)?;
        let updates = self.object(updates)?;
        Ok(self.runtime.special_form("map_update", vec![map, updates]))
    }

    /// `%Mod{k: v}` → `Mod.__struct__({k: v})`; `%Mod{base | k: v}` is a
    /// map update of `base`.
    pub(super) fn struct_literal(
        &mut self,
        module: &Node,
        fields: &[(Node, Node)],
        update: Option<&Node>,
    ) -> Result<Expr> {
        let Node::Alias { segments } = module else {
            return Err(LowerError::structure(
                "struct",
                format!("module must be an alias, got {}", module.form_name()),
            ));
        };
        if let Some(base) = update {
            return self.map_update(base, fields);
        }
        let constructor = self.module_member(segments, "__struct__");
        let fields = self.object(fields)?;
        Ok(Expr::call(constructor, vec![fields]))
    }

    /// The value thrown by `raise`.
    pub(super) fn raise(&mut self, exception: &Node, attributes: Option<&Node>) -> Result<Expr> {
        match (exception, attributes) {
            (Node::String(_), None) => {
                let message = self.expr(exception)?;
                Ok(self.runtime.error("RuntimeError", vec![message]))
            }
            (Node::Binary(segments), None)
                if segments
                    .iter()
                    .any(|s| matches!(s, Segment::Interpolated(_))) =>
            {
                let message = self.expr(exception)?;
                Ok(self.runtime.error("RuntimeError", vec![message]))
            }
            (Node::Alias { segments }, attributes) => {
                let constructor = self.module_member(segments, "exception");
                let attributes = match attributes {
                    Some(attrs) => self.expr(attrs)?,
                    None => Expr::array(vec![]),
                };
                Ok(Expr::call(constructor, vec![attributes]))
            }
            (other, None) => {
                let value = self.expr(other)?;
                Ok(self.runtime.call(&["Kernel", "exception"], vec![value]))
            }
            (other, Some(_)) => Err(LowerError::structure(
                "raise",
                format!(
                    "attributes need an exception module, got {}",
                    other.form_name()
                ),
            )),
        }
    }

    /// Functions generated by `defstruct`/`defexception` in `module`.
    ///
    /// `__struct__(values)` builds an instance from the field defaults and
    /// the given overrides (a map or keyword list). Exceptions also get
    /// `exception(attrs)` unless the module defines its own.
    pub(super) fn struct_functions(
        &mut self,
        module: &[String],
        fields: &[(String, Node)],
        exception: bool,
        custom_exception: bool,
    ) -> Result<Vec<ModuleFunction>> {
        let mut defaults = Vec::with_capacity(fields.len() + 2);
        if exception {
            defaults.push(Property::computed(
                runtime::atom("__exception__"),
                Expr::bool(true),
            ));
        }
        for (name, default) in fields {
            let value = self.function_scope(|this| this.expr(default))?;
            defaults.push(Property::computed(literal::atom(name), value));
        }
        if exception && !fields.iter().any(|(name, _)| name == "message") {
            defaults.push(Property::computed(runtime::atom("message"), Expr::null()));
        }

        let values = "$values".to_string();
        let build = self.runtime.special_form(
            "struct",
            vec![
                literal::module_value(module),
                Expr::object(defaults),
                Expr::ident(values.clone()),
            ],
        );
        let mut functions = vec![ModuleFunction {
            function: Function::new(
                "__struct__",
                vec![values],
                vec![Stmt::return_stmt(Some(build))],
            ),
            exported: true,
        }];

        if exception && !custom_exception {
            let attrs = "$attrs".to_string();
            functions.push(ModuleFunction {
                function: Function::new(
                    "exception",
                    vec![attrs.clone()],
                    vec![Stmt::return_stmt(Some(Expr::call(
                        Expr::ident("__struct__"),
                        vec![Expr::ident(attrs)],
                    )))],
                ),
                exported: true,
            });
        }
        Ok(functions)
    }
}
