//! References into the external runtime library.
//!
//! The lowering never defines runtime behavior; it only emits member
//! expressions rooted at the configured namespace identifier. Every name
//! the generated code relies on is spelled here.

use crate::ir::{BinaryOp, Expr};
use crate::names;

pub struct Runtime {
    root: String,
}

impl Runtime {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> Expr {
        Expr::ident(self.root.clone())
    }

    /// `Runtime.a.b.c`
    pub fn path(&self, segments: &[&str]) -> Expr {
        segments
            .iter()
            .fold(self.root(), |acc, segment| Expr::member(acc, *segment))
    }

    /// `Runtime.a.b(args)`
    pub fn call(&self, segments: &[&str], args: Vec<Expr>) -> Expr {
        Expr::call(self.path(segments), args)
    }

    /// `Runtime.<Module>.<escaped fun>` for a runtime-served module.
    pub fn module_function<S: AsRef<str>>(&self, module: &[S], function: &str) -> Expr {
        let base = module
            .iter()
            .fold(self.root(), |acc, segment| Expr::member(acc, segment.as_ref()));
        Expr::member(base, names::escape_identifier(function))
    }

    /// `Runtime.erlang.<module>.<fun>` for calls on an atom-named module.
    pub fn erlang_function(&self, module: &str, function: &str) -> Expr {
        Expr::member(
            Expr::member(self.path(&["erlang"]), module),
            names::escape_identifier(function),
        )
    }

    /// `new Runtime.Tuple(items...)`
    pub fn tuple(&self, items: Vec<Expr>) -> Expr {
        Expr::new_(self.path(&["Tuple"]), items)
    }

    /// `value instanceof Runtime.Tuple`
    pub fn is_tuple(&self, value: Expr) -> Expr {
        Expr::binary(value, BinaryOp::InstanceOf, self.path(&["Tuple"]))
    }

    /// `Runtime.Kernel.truthy(value)`
    pub fn truthy(&self, value: Expr) -> Expr {
        self.call(&["Kernel", "truthy"], vec![value])
    }

    /// `Runtime.Kernel.to_string(value)`: display form for interpolation.
    pub fn to_display(&self, value: Expr) -> Expr {
        self.call(&["Kernel", "to_string"], vec![value])
    }

    /// `Runtime.Patterns.equals(a, b)`: structural equality for pins and
    /// repeated pattern variables.
    pub fn equals(&self, a: Expr, b: Expr) -> Expr {
        self.call(&["Patterns", "equals"], vec![a, b])
    }

    /// `Runtime.Patterns.is_map(value)`
    pub fn is_map(&self, value: Expr) -> Expr {
        self.call(&["Patterns", "is_map"], vec![value])
    }

    /// `new Runtime.<ErrorClass>(args...)`
    pub fn error(&self, class: &str, args: Vec<Expr>) -> Expr {
        Expr::new_(self.path(&[class]), args)
    }

    /// `Runtime.Range.new(first, last[, step])`
    pub fn range(&self, first: Expr, last: Expr, step: Option<Expr>) -> Expr {
        let mut args = vec![first, last];
        args.extend(step);
        self.call(&["Range", "new"], args)
    }

    /// `Runtime.Enum.to_list(collection)`
    pub fn to_list(&self, collection: Expr) -> Expr {
        self.call(&["Enum", "to_list"], vec![collection])
    }

    /// `Runtime.SpecialForms.<name>(args...)`
    pub fn special_form(&self, name: &str, args: Vec<Expr>) -> Expr {
        self.call(&["SpecialForms", name], args)
    }
}

/// `Symbol.for(name)`: atoms compare by identity, never equal to strings.
pub fn atom(name: &str) -> Expr {
    Expr::call(
        Expr::member(Expr::ident("Symbol"), "for"),
        vec![Expr::string(name)],
    )
}
