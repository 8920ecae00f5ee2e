//! Structural equality for IR types.
//!
//! `structure_eq` compares IR trees ignoring "surface hints" - fields that
//! only change how a printer spells a construct, not what it means.
//!
//! # Hint Fields (normalized during comparison)
//!
//! - `Stmt::Let { mutable }` - `let` vs `const` for a binding never reassigned
//! - `Expr::Member { computed }` - `obj.foo` and `obj["foo"]` are the same read
//! - `PropertyKey` - `{ foo: v }` and `{ ["foo"]: v }` are the same entry
//!
//! # Core Fields (must match exactly)
//!
//! - All names, values, operators
//! - Control flow structure
//! - Expression trees

use super::{
    Expr, Function, Import, Literal, Module, ModuleFunction, Program, Property, PropertyKey, Stmt,
};

/// Trait for structural equality comparison.
///
/// Unlike `PartialEq`, this ignores surface hint fields that may differ
/// between equivalent lowerings but don't affect program semantics.
pub trait StructureEq {
    /// Compare two values for structural equality.
    fn structure_eq(&self, other: &Self) -> bool;
}

impl StructureEq for Program {
    fn structure_eq(&self, other: &Self) -> bool {
        vec_structure_eq(&self.body, &other.body)
    }
}

impl StructureEq for Stmt {
    fn structure_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Stmt::Expr(a), Stmt::Expr(b)) => a.structure_eq(b),

            // Ignore `mutable` - it's a surface hint
            (
                Stmt::Let {
                    name: n1,
                    init: i1,
                    mutable: _,
                },
                Stmt::Let {
                    name: n2,
                    init: i2,
                    mutable: _,
                },
            ) => n1 == n2 && option_structure_eq(i1.as_ref(), i2.as_ref()),

            (Stmt::Block(a), Stmt::Block(b)) => vec_structure_eq(a, b),

            (
                Stmt::If {
                    test: t1,
                    consequent: c1,
                    alternate: a1,
                },
                Stmt::If {
                    test: t2,
                    consequent: c2,
                    alternate: a2,
                },
            ) => {
                t1.structure_eq(t2)
                    && c1.structure_eq(c2.as_ref())
                    && option_structure_eq(a1.as_deref(), a2.as_deref())
            }

            (
                Stmt::ForIn {
                    variable: v1,
                    iterable: i1,
                    body: b1,
                },
                Stmt::ForIn {
                    variable: v2,
                    iterable: i2,
                    body: b2,
                },
            ) => v1 == v2 && i1.structure_eq(i2) && b1.structure_eq(b2.as_ref()),

            (Stmt::Return(a), Stmt::Return(b)) => option_structure_eq(a.as_ref(), b.as_ref()),
            (Stmt::Throw(a), Stmt::Throw(b)) => a.structure_eq(b),
            (Stmt::Function(a), Stmt::Function(b)) => a.structure_eq(b),
            (Stmt::Import(a), Stmt::Import(b)) => a.structure_eq(b),
            (Stmt::Module(a), Stmt::Module(b)) => a.structure_eq(b.as_ref()),

            _ => false,
        }
    }
}

impl StructureEq for Expr {
    fn structure_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Literal(a), Expr::Literal(b)) => a == b,
            (Expr::Ident(a), Expr::Ident(b)) => a == b,

            (
                Expr::Binary {
                    left: l1,
                    op: o1,
                    right: r1,
                },
                Expr::Binary {
                    left: l2,
                    op: o2,
                    right: r2,
                },
            ) => o1 == o2 && l1.structure_eq(l2) && r1.structure_eq(r2),

            (Expr::Unary { op: o1, expr: e1 }, Expr::Unary { op: o2, expr: e2 }) => {
                o1 == o2 && e1.structure_eq(e2)
            }

            (
                Expr::Call {
                    callee: c1,
                    args: a1,
                },
                Expr::Call {
                    callee: c2,
                    args: a2,
                },
            )
            | (
                Expr::New {
                    callee: c1,
                    args: a1,
                },
                Expr::New {
                    callee: c2,
                    args: a2,
                },
            ) => c1.structure_eq(c2) && vec_structure_eq(a1, a2),

            // Normalize `computed` - a string property reads the same either way
            (
                Expr::Member {
                    object: o1,
                    property: p1,
                    computed: c1,
                },
                Expr::Member {
                    object: o2,
                    property: p2,
                    computed: c2,
                },
            ) => {
                o1.structure_eq(o2)
                    && p1.structure_eq(p2)
                    && (c1 == c2 || (p1.is_string_literal() && p2.is_string_literal()))
            }

            (Expr::Array(a), Expr::Array(b)) => vec_structure_eq(a, b),
            (Expr::Object(a), Expr::Object(b)) => vec_structure_eq(a, b),
            (Expr::Function(a), Expr::Function(b)) => a.structure_eq(b),

            (
                Expr::Conditional {
                    test: t1,
                    consequent: c1,
                    alternate: a1,
                },
                Expr::Conditional {
                    test: t2,
                    consequent: c2,
                    alternate: a2,
                },
            ) => t1.structure_eq(t2) && c1.structure_eq(c2) && a1.structure_eq(a2),

            _ => false,
        }
    }
}

impl StructureEq for Property {
    fn structure_eq(&self, other: &Self) -> bool {
        let keys_eq = match (&self.key, &other.key) {
            (PropertyKey::Name(a), PropertyKey::Name(b)) => a == b,
            (PropertyKey::Computed(a), PropertyKey::Computed(b)) => a.structure_eq(b),
            (PropertyKey::Name(n), PropertyKey::Computed(Expr::Literal(Literal::String(s))))
            | (PropertyKey::Computed(Expr::Literal(Literal::String(s))), PropertyKey::Name(n)) => {
                n == s
            }
            _ => false,
        };
        keys_eq && self.value.structure_eq(&other.value)
    }
}

impl StructureEq for Function {
    fn structure_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && vec_structure_eq(&self.body, &other.body)
    }
}

impl StructureEq for Import {
    fn structure_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl StructureEq for Module {
    fn structure_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && vec_structure_eq(&self.imports, &other.imports)
            && vec_structure_eq(&self.body, &other.body)
            && vec_structure_eq(&self.functions, &other.functions)
    }
}

impl StructureEq for ModuleFunction {
    fn structure_eq(&self, other: &Self) -> bool {
        self.exported == other.exported && self.function.structure_eq(&other.function)
    }
}

// Helper functions

fn vec_structure_eq<T: StructureEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structure_eq(y))
}

fn option_structure_eq<T: StructureEq + ?Sized>(a: Option<&T>, b: Option<&T>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.structure_eq(y),
        _ => false,
    }
}
