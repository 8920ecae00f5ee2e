//! Pipe desugaring pre-pass.
//!
//! `left |> right` is not a target construct: it is rewritten into `right`
//! with `left` prepended to its argument list, producing a new tree with no
//! `Pipe` nodes. The dispatcher runs on the rewritten tree only.
//!
//! `a |> f(b) |> g(c)` parses as `(a |> f(b)) |> g(c)` and becomes
//! `g(f(a, b), c)`.

use crate::ast::{Clause, Node, Qualifier, Segment};
use crate::error::{LowerError, Result};

/// Rewrite every pipe in `node`.
pub fn desugar_pipes(node: &Node) -> Result<Node> {
    Ok(match node {
        Node::Pipe { left, right } => {
            let left = desugar_pipes(left)?;
            let right = desugar_pipes(right)?;
            prepend_argument(left, right)?
        }

        Node::Integer(_)
        | Node::Float(_)
        | Node::String(_)
        | Node::Boolean(_)
        | Node::Nil
        | Node::Atom(_)
        | Node::Var { .. }
        | Node::Alias { .. }
        | Node::AttributeRef(_)
        | Node::Import { .. }
        | Node::ImportOnly { .. }
        | Node::AliasDecl { .. }
        | Node::Require { .. } => node.clone(),

        Node::List(items) => Node::List(map_all(items)?),
        Node::Cons { head, tail } => Node::Cons {
            head: map_all(head)?,
            tail: map_box(tail)?,
        },
        Node::Tuple(items) => Node::Tuple(map_all(items)?),
        Node::Binary(segments) => Node::Binary(
            segments
                .iter()
                .map(|segment| {
                    Ok(match segment {
                        Segment::Value(n) => Segment::Value(desugar_pipes(n)?),
                        Segment::Interpolated(n) => Segment::Interpolated(desugar_pipes(n)?),
                    })
                })
                .collect::<Result<_>>()?,
        ),
        Node::Map(pairs) => Node::Map(map_pairs(pairs)?),
        Node::MapUpdate { map, updates } => Node::MapUpdate {
            map: map_box(map)?,
            updates: map_pairs(updates)?,
        },
        Node::Struct {
            module,
            fields,
            update,
        } => Node::Struct {
            module: map_box(module)?,
            fields: map_pairs(fields)?,
            update: map_opt_box(update.as_ref())?,
        },
        Node::Bind { pattern, value } => Node::Bind {
            pattern: map_box(pattern)?,
            value: map_box(value)?,
        },
        Node::Pin(inner) => Node::Pin(map_box(inner)?),
        Node::When { exprs, guard } => Node::When {
            exprs: map_all(exprs)?,
            guard: map_box(guard)?,
        },
        Node::BinaryOp { op, left, right } => Node::BinaryOp {
            op: op.clone(),
            left: map_box(left)?,
            right: map_box(right)?,
        },
        Node::UnaryOp { op, operand } => Node::UnaryOp {
            op: op.clone(),
            operand: map_box(operand)?,
        },
        Node::Range { first, last, step } => Node::Range {
            first: map_box(first)?,
            last: map_box(last)?,
            step: map_opt_box(step.as_ref())?,
        },
        Node::Call { name, args, meta } => Node::Call {
            name: name.clone(),
            args: map_all(args)?,
            meta: meta.clone(),
        },
        Node::Dot {
            target,
            name,
            args,
            meta,
        } => Node::Dot {
            target: map_box(target)?,
            name: name.clone(),
            args: args.as_deref().map(map_all).transpose()?,
            meta: meta.clone(),
        },
        Node::Apply { fun, args } => Node::Apply {
            fun: map_box(fun)?,
            args: map_all(args)?,
        },
        Node::Capture {
            module,
            name,
            arity,
        } => Node::Capture {
            module: map_opt_box(module.as_ref())?,
            name: name.clone(),
            arity: *arity,
        },
        Node::Fn(clauses) => Node::Fn(map_clauses(clauses)?),
        Node::Case { subject, clauses } => Node::Case {
            subject: map_box(subject)?,
            clauses: map_clauses(clauses)?,
        },
        Node::Cond(clauses) => Node::Cond(map_clauses(clauses)?),
        Node::If {
            condition,
            then,
            otherwise,
        } => Node::If {
            condition: map_box(condition)?,
            then: map_all(then)?,
            otherwise: otherwise.as_deref().map(map_all).transpose()?,
        },
        Node::Unless {
            condition,
            then,
            otherwise,
        } => Node::Unless {
            condition: map_box(condition)?,
            then: map_all(then)?,
            otherwise: otherwise.as_deref().map(map_all).transpose()?,
        },
        Node::For {
            qualifiers,
            body,
            into,
        } => Node::For {
            qualifiers: qualifiers
                .iter()
                .map(|q| {
                    Ok(match q {
                        Qualifier::Generator {
                            pattern,
                            collection,
                        } => Qualifier::Generator {
                            pattern: desugar_pipes(pattern)?,
                            collection: desugar_pipes(collection)?,
                        },
                        Qualifier::Filter(n) => Qualifier::Filter(desugar_pipes(n)?),
                    })
                })
                .collect::<Result<_>>()?,
            body: map_all(body)?,
            into: map_opt_box(into.as_ref())?,
        },
        Node::Block(items) => Node::Block(map_all(items)?),
        Node::Def {
            visibility,
            head,
            body,
        } => Node::Def {
            visibility: *visibility,
            head: map_box(head)?,
            body: map_all(body)?,
        },
        Node::Module { name, body } => Node::Module {
            name: name.clone(),
            body: map_all(body)?,
        },
        Node::Attribute { name, value } => Node::Attribute {
            name: name.clone(),
            value: map_box(value)?,
        },
        Node::DefStruct(fields) => Node::DefStruct(map_fields(fields)?),
        Node::DefException(fields) => Node::DefException(map_fields(fields)?),
        Node::Raise {
            exception,
            attributes,
        } => Node::Raise {
            exception: map_box(exception)?,
            attributes: map_opt_box(attributes.as_ref())?,
        },
    })
}

/// Insert `arg` as the first argument of the call-shaped `right`.
fn prepend_argument(arg: Node, right: Node) -> Result<Node> {
    match right {
        Node::Call {
            name,
            mut args,
            meta,
        } => {
            args.insert(0, arg);
            Ok(Node::Call { name, args, meta })
        }
        Node::Dot {
            target,
            name,
            args,
            meta,
        } => {
            let mut args = args.unwrap_or_default();
            args.insert(0, arg);
            Ok(Node::Dot {
                target,
                name,
                args: Some(args),
                meta,
            })
        }
        Node::Apply { fun, mut args } => {
            args.insert(0, arg);
            Ok(Node::Apply { fun, args })
        }
        // `x |> foo` where the parser saw `foo` as a bare identifier.
        Node::Var { name } => Ok(Node::call(name, vec![arg])),
        other => Err(LowerError::structure(
            "pipe",
            format!(
                "right-hand side must be a call, got {}",
                other.form_name()
            ),
        )),
    }
}

fn map_all(nodes: &[Node]) -> Result<Vec<Node>> {
    nodes.iter().map(desugar_pipes).collect()
}

fn map_box(node: &Node) -> Result<Box<Node>> {
    desugar_pipes(node).map(Box::new)
}

fn map_opt_box(node: Option<&Box<Node>>) -> Result<Option<Box<Node>>> {
    node.map(|n| map_box(n)).transpose()
}

fn map_pairs(pairs: &[(Node, Node)]) -> Result<Vec<(Node, Node)>> {
    pairs
        .iter()
        .map(|(k, v)| Ok((desugar_pipes(k)?, desugar_pipes(v)?)))
        .collect()
}

fn map_fields(fields: &[(String, Node)]) -> Result<Vec<(String, Node)>> {
    fields
        .iter()
        .map(|(name, default)| Ok((name.clone(), desugar_pipes(default)?)))
        .collect()
}

fn map_clauses(clauses: &[Clause]) -> Result<Vec<Clause>> {
    clauses
        .iter()
        .map(|c| Ok(Clause::new(map_all(&c.head)?, map_all(&c.body)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_into_local_call() {
        let piped = Node::pipe(Node::var("a"), Node::call("f", vec![Node::var("b")]));
        assert_eq!(
            desugar_pipes(&piped).unwrap(),
            Node::call("f", vec![Node::var("a"), Node::var("b")])
        );
    }

    #[test]
    fn test_chain_is_left_to_right() {
        let piped = Node::pipe(
            Node::pipe(Node::var("a"), Node::call("f", vec![Node::var("b")])),
            Node::call("g", vec![Node::var("c")]),
        );
        let nested = Node::call(
            "g",
            vec![
                Node::call("f", vec![Node::var("a"), Node::var("b")]),
                Node::var("c"),
            ],
        );
        assert_eq!(desugar_pipes(&piped).unwrap(), nested);
    }

    #[test]
    fn test_pipe_into_remote_call_without_parens() {
        let piped = Node::pipe(
            Node::var("list"),
            Node::Dot {
                target: Box::new(Node::alias(&["Enum"])),
                name: "reverse".into(),
                args: None,
                meta: Default::default(),
            },
        );
        assert_eq!(
            desugar_pipes(&piped).unwrap(),
            Node::remote(Node::alias(&["Enum"]), "reverse", vec![Node::var("list")])
        );
    }

    #[test]
    fn test_pipe_into_bare_identifier() {
        let piped = Node::pipe(Node::Integer(1), Node::var("inspect"));
        assert_eq!(
            desugar_pipes(&piped).unwrap(),
            Node::call("inspect", vec![Node::Integer(1)])
        );
    }

    #[test]
    fn test_nested_pipes_are_rewritten() {
        let inner = Node::pipe(Node::var("x"), Node::call("f", vec![]));
        let node = Node::Tuple(vec![inner]);
        assert_eq!(
            desugar_pipes(&node).unwrap(),
            Node::Tuple(vec![Node::call("f", vec![Node::var("x")])])
        );
    }

    #[test]
    fn test_pipe_into_literal_fails() {
        let piped = Node::pipe(Node::var("x"), Node::Integer(1));
        assert!(matches!(
            desugar_pipes(&piped),
            Err(LowerError::Structure { form: "pipe", .. })
        ));
    }
}
