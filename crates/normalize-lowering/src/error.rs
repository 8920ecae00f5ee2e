//! Errors raised while lowering a source tree.

/// Error that can occur when lowering a source node into the target IR.
///
/// Lowering is all-or-nothing: when any sub-node fails, the whole request
/// fails and no partial tree is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LowerError {
    #[error("unsupported form: {0}")]
    UnsupportedForm(String),

    #[error("malformed {form}: {reason}")]
    Structure { form: &'static str, reason: String },
}

impl LowerError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedForm(what.into())
    }

    pub fn structure(form: &'static str, reason: impl Into<String>) -> Self {
        Self::Structure {
            form,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = LowerError> = std::result::Result<T, E>;
