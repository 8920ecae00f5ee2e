//! Identifier escaping.
//!
//! Source names may end in `?` or `!` and may collide with target reserved
//! words; module names are dotted. Every identifier the lowering emits goes
//! through this module. `$` never appears in source identifiers, so all
//! escapes use it and the mapping stays injective:
//!
//! - `valid?` → `valid$q`, `save!` → `save$e`
//! - `new` → `new$` (reserved words get a trailing `$`)
//! - `Foo.Bar` → `Foo$Bar`
//!
//! Synthetic names generated by the lowering start with `$` and therefore
//! cannot clash with an escaped source name.

/// Target-language reserved words and globals a binding must not shadow.
const RESERVED: &[&str] = &[
    "arguments",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "undefined",
    "var",
    "void",
    "while",
    "with",
    "yield",
    "Symbol",
    "Array",
    "Object",
    "String",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Escape a source identifier (variable or function name).
pub fn escape_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        match c {
            '?' => out.push_str("$q"),
            '!' => out.push_str("$e"),
            '@' => out.push_str("$at"),
            c => out.push(c),
        }
    }
    if is_reserved(&out) {
        out.push('$');
    }
    out
}

/// Target identifier for a module name, e.g. `["Foo", "Bar"]` → `Foo$Bar`.
pub fn module_identifier<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("$");
    escape_identifier(&joined)
}

/// Dotted source spelling of a module name, e.g. `Foo.Bar`.
pub fn module_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

/// Atom name a module alias evaluates to, e.g. `Elixir.Foo.Bar`.
pub fn module_atom<S: AsRef<str>>(segments: &[S]) -> String {
    format!("Elixir.{}", module_path(segments))
}

/// Identifier of a variable whose escaped name is also a function callable
/// in the same module, e.g. `helper` → `helper$v`.
pub fn shadowing_variable(escaped: &str) -> String {
    format!("{escaped}$v")
}

/// Identifier holding a module attribute value.
pub fn attribute_identifier(name: &str) -> String {
    format!("$attr_{}", escape_identifier(name))
}

/// Versioned name for the `version`-th rebinding of an escaped identifier.
pub fn versioned(base: &str, version: u32) -> String {
    if version == 0 {
        base.to_string()
    } else {
        format!("{base}${version}")
    }
}
