//! Lowering of a pattern-matching functional language into a JavaScript-style
//! target AST.
//!
//! `normalize-lowering` sits between an external front end (which parses and
//! macro-expands source code into [`ast::Node`]) and an external printer
//! (which renders [`ir::Program`] as text). It maps tuples, atoms, pattern
//! matching, pipes, multi-clause functions and modules onto plain function
//! expressions, object/array literals and calls into a runtime library.
//!
//! # Architecture
//!
//! ```text
//! Front end           Lowering                          Printer
//! ─────────    ──────────────────────────────────    ──────────
//! ast::Node ─> desugar_pipes ─> Lowerer (dispatch) ─> ir::Program
//!                                 ├─ literal / data
//!                                 ├─ pattern
//!                                 ├─ control
//!                                 ├─ function
//!                                 └─ module
//! ```
//!
//! # Example
//!
//! ```
//! use normalize_lowering::{ast::Node, lower_expr, Expr};
//!
//! let tuple = Node::tuple(vec![Node::atom("ok"), Node::Integer(1)]);
//! let lowered = lower_expr(&tuple).unwrap();
//! assert!(matches!(lowered, Expr::New { .. }));
//! ```
//!
//! # Runtime library
//!
//! Generated code refers to a runtime namespace (`Runtime` by default, see
//! [`LowerConfig`]) for tuples, structural equality, truthiness and the
//! standard-library modules. The lowering only names those members; it
//! never defines them.

pub mod ast;
pub mod config;
pub mod desugar;
pub mod error;
pub mod ir;
pub mod lower;
pub mod names;
pub mod runtime;

// Re-exports: IR types
pub use ir::{
    BinaryOp, Expr, Function, Import, ImportBinding, Literal, Module, ModuleFunction, Program,
    Property, PropertyKey, Stmt, StructureEq, UnaryOp,
};

pub use ast::Node;
pub use config::{ConfigError, LowerConfig};
pub use desugar::desugar_pipes;
pub use error::LowerError;
pub use lower::Lowerer;
pub use names::escape_identifier;

/// Lower a single expression with the default configuration.
pub fn lower_expr(node: &Node) -> Result<Expr, LowerError> {
    Lowerer::new(&LowerConfig::default()).lower_expr(node)
}

/// Lower a sequence of top-level forms with the default configuration.
pub fn lower_program(nodes: &[Node]) -> Result<Program, LowerError> {
    Lowerer::new(&LowerConfig::default()).lower_program(nodes)
}
