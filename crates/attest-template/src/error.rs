use thiserror::Error;

use crate::fields::ContractKind;

/// Rejected contract input. Never retried: the caller fixes and resubmits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No template is registered for the action.
    #[error("unknown action \"{action}\"")]
    UnknownAction { action: String },

    /// Supplied field names differ from the template's required set.
    #[error("field set mismatch for \"{action}\": missing {missing:?}, unexpected {unexpected:?}")]
    FieldSet {
        action: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A field is present but has the wrong type or an illegal value.
    #[error("invalid field \"{field}\": {reason}")]
    InvalidField { field: String, reason: String },

    /// Fields of one kind were handed to a template of another.
    #[error("template expects {expected} fields, got {actual}")]
    KindMismatch {
        expected: ContractKind,
        actual: ContractKind,
    },
}

impl ValidationError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Bad template configuration, detected at load time.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read template file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template YAML is malformed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("template set is empty")]
    Empty,

    #[error("action \"{0}\" is defined more than once")]
    DuplicateAction(String),

    #[error("template \"{action}\": {reason}")]
    InvalidTemplate { action: String, reason: String },

    #[error("template \"{action}\" references \"{{{{{placeholder}}}}}\", which is not a field of {kind}")]
    UnknownPlaceholder {
        action: String,
        placeholder: String,
        kind: ContractKind,
    },
}
