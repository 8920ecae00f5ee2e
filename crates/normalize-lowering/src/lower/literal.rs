//! Literal builder: atoms, module values, cons lists, tuples, binaries.

use crate::ast::{Node, Segment};
use crate::error::{LowerError, Result};
use crate::ir::{BinaryOp, Expr};
use crate::names;
use crate::runtime;

use super::Lowerer;

/// An atom. `true`, `false` and `nil` are the target's own constants.
pub(crate) fn atom(name: &str) -> Expr {
    match name {
        "true" => Expr::bool(true),
        "false" => Expr::bool(false),
        "nil" => Expr::null(),
        _ => runtime::atom(name),
    }
}

/// A module alias used as a value evaluates to its atom.
pub(crate) fn module_value<S: AsRef<str>>(segments: &[S]) -> Expr {
    runtime::atom(&names::module_atom(segments))
}

/// Text of a binary made only of string segments; such a binary is a
/// string both as a value and as a pattern.
pub(crate) fn string_segments(segments: &[Segment]) -> Option<String> {
    let mut text = String::new();
    for segment in segments {
        match segment {
            Segment::Value(Node::String(s)) => text.push_str(s),
            _ => return None,
        }
    }
    Some(text)
}

impl Lowerer {
    /// `[a, b | tail]` → `[a, b].concat(tail)`
    pub(super) fn cons(&mut self, head: &[Node], tail: &Node) -> Result<Expr> {
        let head = self.exprs(head)?;
        let tail = self.expr(tail)?;
        Ok(Expr::method(Expr::array(head), "concat", vec![tail]))
    }

    pub(super) fn tuple(&mut self, items: &[Node]) -> Result<Expr> {
        let items = self.exprs(items)?;
        Ok(self.runtime.tuple(items))
    }

    /// A binary with interpolation becomes a left-to-right string
    /// concatenation; embedded values go through the runtime's display
    /// conversion. A binary of string segments is their concatenated text;
    /// any other binary of plain values is a byte list.
    pub(super) fn binary(&mut self, segments: &[Segment]) -> Result<Expr> {
        if let Some(text) = string_segments(segments) {
            return Ok(Expr::string(text));
        }
        let interpolated = segments
            .iter()
            .any(|s| matches!(s, Segment::Interpolated(_)));
        if !interpolated {
            let values = segments
                .iter()
                .map(|s| match s {
                    Segment::Value(n) | Segment::Interpolated(n) => self.expr(n),
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Expr::array(values));
        }

        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            let part = match segment {
                Segment::Value(Node::String(s)) => Expr::string(s.clone()),
                Segment::Value(other) => {
                    return Err(LowerError::unsupported(format!(
                        "{} segment in an interpolated string",
                        other.form_name()
                    )));
                }
                Segment::Interpolated(node) => {
                    let value = self.expr(node)?;
                    self.runtime.to_display(value)
                }
            };
            parts.push(part);
        }
        // `parts` is non-empty: at least one segment is interpolated.
        let mut parts = parts.into_iter();
        let first = parts.next().unwrap_or_else(|| Expr::string(""));
        Ok(parts.fold(first, |acc, part| Expr::binary(acc, BinaryOp::Add, part)))
    }
}
