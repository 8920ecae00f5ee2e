//! Lowering configuration.
//!
//! Example config.toml:
//! ```toml
//! [lowering]
//! runtime = "Runtime"          # identifier of the runtime-library namespace
//! import_prefix = "./"         # prefix for import specifiers
//! import_extension = ".js"     # suffix for import specifiers
//! runtime_modules = ["Enum"]   # modules served by the runtime (replaces the defaults)
//! ```

use serde::{Deserialize, Serialize};

const DEFAULT_RUNTIME: &str = "Runtime";
const DEFAULT_IMPORT_PREFIX: &str = "./";
const DEFAULT_IMPORT_EXTENSION: &str = ".js";

/// Standard-library modules (and exceptions) served by the runtime library.
const DEFAULT_RUNTIME_MODULES: &[&str] = &[
    "Kernel",
    "Enum",
    "List",
    "Map",
    "MapSet",
    "Keyword",
    "Tuple",
    "String",
    "Integer",
    "Float",
    "Atom",
    "IO",
    "Range",
    "Access",
    "ArgumentError",
    "ArithmeticError",
    "KeyError",
    "RuntimeError",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid lowering config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for the lowering pass.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LowerConfig {
    /// Runtime namespace identifier. Default: `Runtime`
    pub runtime: Option<String>,
    /// Prefix prepended to import specifiers. Default: `./`
    pub import_prefix: Option<String>,
    /// Suffix appended to import specifiers. Default: `.js`
    pub import_extension: Option<String>,
    /// Modules routed to the runtime namespace instead of being imported.
    pub runtime_modules: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    lowering: LowerConfig,
}

impl LowerConfig {
    /// Read the `[lowering]` table of a TOML document. A missing table
    /// yields the defaults.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        Ok(file.lowering)
    }

    pub fn runtime(&self) -> &str {
        self.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME)
    }

    pub fn import_prefix(&self) -> &str {
        self.import_prefix.as_deref().unwrap_or(DEFAULT_IMPORT_PREFIX)
    }

    pub fn import_extension(&self) -> &str {
        self.import_extension
            .as_deref()
            .unwrap_or(DEFAULT_IMPORT_EXTENSION)
    }

    /// Is `module` (a single-segment name) served by the runtime library?
    pub fn is_runtime_module<S: AsRef<str>>(&self, module: &[S]) -> bool {
        let [single] = module else {
            return false;
        };
        let name = single.as_ref();
        match &self.runtime_modules {
            Some(modules) => modules.iter().any(|m| m == name),
            None => DEFAULT_RUNTIME_MODULES.contains(&name),
        }
    }

    /// Import specifier for a module path such as `Foo.Bar`.
    pub fn import_source(&self, module_path: &str) -> String {
        format!(
            "{}{}{}",
            self.import_prefix(),
            module_path,
            self.import_extension()
        )
    }
}
