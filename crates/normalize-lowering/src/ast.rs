//! Source AST handed over by the external front end.
//!
//! One variant per syntactic form, each carrying exactly the children its
//! shape implies. The front end has already expanded macros and attached
//! qualification hints to call nodes (`CallMeta`, `DotMeta`); the lowering
//! pass treats those hints as read-only input and never re-derives them.
//!
//! The JSON encoding is serde's default (externally tagged) representation:
//!
//! ```json
//! {"Tuple": [{"Atom": "ok"}, {"Var": {"name": "value"}}]}
//! ```

use serde::{Deserialize, Serialize};

/// A source node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Nil,
    Atom(String),

    /// Variable reference or binding site (in patterns).
    Var { name: String },
    /// Module name, e.g. `Foo.Bar` → `["Foo", "Bar"]`.
    Alias { segments: Vec<String> },

    List(Vec<Node>),
    /// `[a, b | tail]`
    Cons { head: Vec<Node>, tail: Box<Node> },
    Tuple(Vec<Node>),
    /// `<<...>>` and interpolated strings.
    Binary(Vec<Segment>),

    /// `%{k => v}`
    Map(Vec<(Node, Node)>),
    /// `%{map | k => v}`
    MapUpdate {
        map: Box<Node>,
        updates: Vec<(Node, Node)>,
    },
    /// `%Mod{k: v}` or `%Mod{base | k: v}`
    Struct {
        module: Box<Node>,
        fields: Vec<(Node, Node)>,
        update: Option<Box<Node>>,
    },

    /// `pattern = value`
    Bind { pattern: Box<Node>, value: Box<Node> },
    /// `^name`
    Pin(Box<Node>),
    /// `exprs when guard`. Chained guards nest in `guard`.
    When { exprs: Vec<Node>, guard: Box<Node> },

    BinaryOp {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp { op: String, operand: Box<Node> },
    /// `left |> right`; removed by the pipe pre-pass before dispatch.
    Pipe { left: Box<Node>, right: Box<Node> },
    /// `first..last` or `first..last//step`
    Range {
        first: Box<Node>,
        last: Box<Node>,
        step: Option<Box<Node>>,
    },

    /// Unqualified call `name(args)`.
    Call {
        name: String,
        args: Vec<Node>,
        #[serde(default)]
        meta: CallMeta,
    },
    /// `target.name(args)` or `target.name` (no argument list).
    Dot {
        target: Box<Node>,
        name: String,
        args: Option<Vec<Node>>,
        #[serde(default)]
        meta: DotMeta,
    },
    /// `fun.(args)`
    Apply { fun: Box<Node>, args: Vec<Node> },
    /// `&name/arity` or `&Mod.name/arity`
    Capture {
        module: Option<Box<Node>>,
        name: String,
        arity: usize,
    },

    Fn(Vec<Clause>),
    Case {
        subject: Box<Node>,
        clauses: Vec<Clause>,
    },
    Cond(Vec<Clause>),
    If {
        condition: Box<Node>,
        then: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
    Unless {
        condition: Box<Node>,
        then: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
    For {
        qualifiers: Vec<Qualifier>,
        body: Vec<Node>,
        into: Option<Box<Node>>,
    },
    Block(Vec<Node>),

    /// `def`/`defp`. `head` is a `Call` or a `When` wrapping one.
    Def {
        visibility: Visibility,
        head: Box<Node>,
        body: Vec<Node>,
    },
    Module { name: Vec<String>, body: Vec<Node> },
    /// `@name value`
    Attribute { name: String, value: Box<Node> },
    /// `@name`
    AttributeRef(String),
    Import { module: Vec<String> },
    ImportOnly {
        module: Vec<String>,
        only: Vec<(String, usize)>,
    },
    AliasDecl {
        module: Vec<String>,
        as_name: Option<String>,
    },
    Require {
        module: Vec<String>,
        as_name: Option<String>,
    },
    DefStruct(Vec<(String, Node)>),
    DefException(Vec<(String, Node)>),
    /// `raise exception` or `raise Module, attributes`
    Raise {
        exception: Box<Node>,
        attributes: Option<Box<Node>>,
    },
}

/// One `<<>>` segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Value(Node),
    /// `#{expr}` inside a string.
    Interpolated(Node),
}

/// A `head -> body` clause of `fn`, `case` or `cond`.
///
/// `head` holds the patterns (or the single `cond` condition). Guarded
/// clauses carry a single `When` node whose `exprs` are the patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub head: Vec<Node>,
    pub body: Vec<Node>,
}

/// One comprehension qualifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Qualifier {
    /// `pattern <- collection`
    Generator { pattern: Node, collection: Node },
    Filter(Node),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// How the front end resolved an unqualified call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Defined in the enclosing module.
    #[default]
    Local,
    /// Brought in by a whole-module import; emitted module-qualified.
    Qualified(Vec<String>),
    /// Brought in by a selective (`only:`) import; emitted bare.
    ImportedUnqualified,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallMeta {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub line: Option<u32>,
}

/// What a parenthesis-less `target.name` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Field,
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DotMeta {
    #[serde(default)]
    pub access: Option<Access>,
    #[serde(default)]
    pub line: Option<u32>,
}

impl Node {
    pub fn var(name: impl Into<String>) -> Self {
        Node::Var { name: name.into() }
    }

    pub fn atom(name: impl Into<String>) -> Self {
        Node::Atom(name.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::String(s.into())
    }

    pub fn alias(segments: &[&str]) -> Self {
        Node::Alias {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn tuple(items: Vec<Node>) -> Self {
        Node::Tuple(items)
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Call {
            name: name.into(),
            args,
            meta: CallMeta::default(),
        }
    }

    pub fn remote(target: Node, name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Dot {
            target: Box::new(target),
            name: name.into(),
            args: Some(args),
            meta: DotMeta::default(),
        }
    }

    pub fn op(op: impl Into<String>, left: Node, right: Node) -> Self {
        Node::BinaryOp {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn bind(pattern: Node, value: Node) -> Self {
        Node::Bind {
            pattern: Box::new(pattern),
            value: Box::new(value),
        }
    }

    pub fn pipe(left: Node, right: Node) -> Self {
        Node::Pipe {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn when(exprs: Vec<Node>, guard: Node) -> Self {
        Node::When {
            exprs,
            guard: Box::new(guard),
        }
    }

    /// Short form name used in logs and error messages.
    pub fn form_name(&self) -> &'static str {
        match self {
            Node::Integer(_) => "integer",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Boolean(_) => "boolean",
            Node::Nil => "nil",
            Node::Atom(_) => "atom",
            Node::Var { .. } => "variable",
            Node::Alias { .. } => "alias",
            Node::List(_) => "list",
            Node::Cons { .. } => "cons",
            Node::Tuple(_) => "tuple",
            Node::Binary(_) => "binary",
            Node::Map(_) => "map",
            Node::MapUpdate { .. } => "map update",
            Node::Struct { .. } => "struct",
            Node::Bind { .. } => "bind",
            Node::Pin(_) => "pin",
            Node::When { .. } => "when",
            Node::BinaryOp { .. } => "binary operator",
            Node::UnaryOp { .. } => "unary operator",
            Node::Pipe { .. } => "pipe",
            Node::Range { .. } => "range",
            Node::Call { .. } => "call",
            Node::Dot { .. } => "dot",
            Node::Apply { .. } => "apply",
            Node::Capture { .. } => "capture",
            Node::Fn(_) => "fn",
            Node::Case { .. } => "case",
            Node::Cond(_) => "cond",
            Node::If { .. } => "if",
            Node::Unless { .. } => "unless",
            Node::For { .. } => "for",
            Node::Block(_) => "block",
            Node::Def { .. } => "def",
            Node::Module { .. } => "defmodule",
            Node::Attribute { .. } => "module attribute",
            Node::AttributeRef(_) => "attribute read",
            Node::Import { .. } => "import",
            Node::ImportOnly { .. } => "import",
            Node::AliasDecl { .. } => "alias",
            Node::Require { .. } => "require",
            Node::DefStruct(_) => "defstruct",
            Node::DefException(_) => "defexception",
            Node::Raise { .. } => "raise",
        }
    }
}

impl Clause {
    pub fn new(head: Vec<Node>, body: Vec<Node>) -> Self {
        Self { head, body }
    }
}

/// Decode a node from the front end's JSON encoding.
pub fn from_json(source: &str) -> Result<Node, serde_json::Error> {
    serde_json::from_str(source)
}
