//! Target AST.
//!
//! A JavaScript-shaped tree (object/array literals, function expressions,
//! calls, binary operators) handed to an external printer. Builders create
//! fresh nodes; nothing here aliases the source tree.

mod structure_eq;

pub use structure_eq::StructureEq;

use serde::{Deserialize, Serialize};

/// A sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    Let {
        name: String,
        init: Option<Expr>,
        mutable: bool,
    },
    Block(Vec<Stmt>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    /// `for (const variable of iterable) body`
    ForIn {
        variable: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Function(Function),
    Import(Import),
    Module(Box<Module>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `new callee(args)`
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },
    Array(Vec<Expr>),
    Object(Vec<Property>),
    Function(Box<Function>),
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
    InstanceOf,
}

impl BinaryOp {
    /// Whether the operator always produces a boolean.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::In
                | BinaryOp::InstanceOf
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    TypeOf,
}

/// Object literal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    /// `{ name: value }` / `{ "name": value }`
    Name(String),
    /// `{ [expr]: value }`
    Computed(Expr),
}

/// Function declaration or expression. An empty name marks an anonymous
/// function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn anonymous(params: Vec<String>, body: Vec<Stmt>) -> Self {
        Self::new("", params, body)
    }
}

/// External binding declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub binding: ImportBinding,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportBinding {
    /// `import * as name from source`
    Namespace(String),
    /// `import { a, b } from source`
    Named(Vec<String>),
    /// `import name from source`
    Default(String),
}

/// A lowered module: an isolated namespace whose functions are collected
/// into one exported container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub imports: Vec<Import>,
    /// Module-level statements (attributes, top-level expressions),
    /// evaluated once at definition time.
    pub body: Vec<Stmt>,
    pub functions: Vec<ModuleFunction>,
}

impl Module {
    /// Functions visible outside the module.
    pub fn exports(&self) -> impl Iterator<Item = &Function> {
        self.functions
            .iter()
            .filter(|f| f.exported)
            .map(|f| &f.function)
    }

    pub fn function(&self, name: &str) -> Option<&ModuleFunction> {
        self.functions.iter().find(|f| f.function.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleFunction {
    pub function: Function,
    pub exported: bool,
}

// Helper constructors

impl Expr {
    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn integer(n: i64) -> Self {
        Expr::Literal(Literal::Integer(n))
    }

    pub fn float(n: f64) -> Self {
        Expr::Literal(Literal::Float(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn new_(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::New {
            callee: Box::new(callee),
            args,
        }
    }

    /// `object.property`
    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(Expr::string(property)),
            computed: false,
        }
    }

    /// `object[index]`
    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(index),
            computed: true,
        }
    }

    /// `receiver.method(args)`
    pub fn method(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(receiver, method), args)
    }

    pub fn array(items: Vec<Expr>) -> Self {
        Expr::Array(items)
    }

    pub fn object(properties: Vec<Property>) -> Self {
        Expr::Object(properties)
    }

    pub fn function(f: Function) -> Self {
        Expr::Function(Box::new(f))
    }

    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    /// `() => { body }` invoked in place.
    pub fn iife(body: Vec<Stmt>) -> Self {
        Expr::call(Expr::function(Function::anonymous(vec![], body)), vec![])
    }

    /// Fold a list of boolean tests into `a && b && ...`; `None` when empty.
    pub fn all(tests: Vec<Expr>) -> Option<Self> {
        tests
            .into_iter()
            .reduce(|acc, t| Expr::binary(acc, BinaryOp::And, t))
    }

    /// Fold a list of boolean tests into `a || b || ...`; `None` when empty.
    pub fn any(tests: Vec<Expr>) -> Option<Self> {
        tests
            .into_iter()
            .reduce(|acc, t| Expr::binary(acc, BinaryOp::Or, t))
    }

    pub fn is_string_literal(&self) -> bool {
        matches!(self, Expr::Literal(Literal::String(_)))
    }
}

impl Property {
    pub fn named(key: impl Into<String>, value: Expr) -> Self {
        Self {
            key: PropertyKey::Name(key.into()),
            value,
        }
    }

    pub fn computed(key: Expr, value: Expr) -> Self {
        Self {
            key: PropertyKey::Computed(key),
            value,
        }
    }
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn const_decl(name: impl Into<String>, init: Expr) -> Self {
        Stmt::Let {
            name: name.into(),
            init: Some(init),
            mutable: false,
        }
    }

    pub fn let_decl(name: impl Into<String>, init: Option<Expr>) -> Self {
        Stmt::Let {
            name: name.into(),
            init,
            mutable: true,
        }
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Stmt::Block(stmts)
    }

    pub fn if_stmt(test: Expr, consequent: Stmt, alternate: Option<Stmt>) -> Self {
        Stmt::If {
            test,
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        }
    }

    pub fn for_in(variable: impl Into<String>, iterable: Expr, body: Stmt) -> Self {
        Stmt::ForIn {
            variable: variable.into(),
            iterable,
            body: Box::new(body),
        }
    }

    pub fn return_stmt(expr: Option<Expr>) -> Self {
        Stmt::Return(expr)
    }

    pub fn throw(expr: Expr) -> Self {
        Stmt::Throw(expr)
    }

    pub fn function(f: Function) -> Self {
        Stmt::Function(f)
    }

    /// Whether control never continues past this statement.
    pub fn is_terminal(&self) -> bool {
        match self {
            Stmt::Return(_) | Stmt::Throw(_) => true,
            Stmt::Block(stmts) => stmts.last().is_some_and(Stmt::is_terminal),
            Stmt::If {
                consequent,
                alternate: Some(alternate),
                ..
            } => consequent.is_terminal() && alternate.is_terminal(),
            _ => false,
        }
    }
}
