//! Why a [`TagbusConfig`](crate::TagbusConfig) could not be loaded.

use std::path::PathBuf;

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// A layer could not be read, or a value had the wrong shape.
    #[error("Cannot load {}: {source}", .key.as_deref().unwrap_or("configuration"))]
    Parsing {
        /// Dotted key the failure was traced to, when there is one.
        key: Option<String>,
        #[source]
        source: Box<figment::Error>,
    },

    /// Every value parsed but some are out of range.
    #[error("Invalid configuration: {}", .problems.join("; "))]
    Validation {
        /// One `dotted.key: reason` entry per failed check, sorted.
        problems: Vec<String>,
        #[source]
        source: ValidationErrors,
    },
}

impl ConfigError {
    /// Dotted keys that failed validation, e.g. `connection.endpoint`.
    pub fn invalid_keys(&self) -> Vec<&str> {
        match self {
            ConfigError::Validation { problems, .. } => problems
                .iter()
                .filter_map(|p| p.split_once(':').map(|(key, _)| key))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        let key = (!error.path.is_empty()).then(|| error.path.join("."));
        ConfigError::Parsing {
            key,
            source: Box::new(error),
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        let mut problems = Vec::new();
        flatten("", &errors, &mut problems);
        problems.sort();
        ConfigError::Validation {
            problems,
            source: errors,
        }
    }
}

/// Walks nested sections so a bad `connection.endpoint` is named as such
/// rather than as `connection`.
fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let reason = error.message.as_deref().unwrap_or(error.code.as_ref());
                    out.push(format!("{key}: {reason}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&key, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{key}[{index}]"), inner, out);
                }
            }
        }
    }
}
