//! Error types for the core module.

use std::path::PathBuf;

use stage0_spec::{Location, LookupError, SpecError};
use stage0_templates::TemplateError;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while preparing or running a merge process.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Process descriptor not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid YAML in process descriptor {path}{location}: {message}")]
    Format {
        path: PathBuf,
        location: Location,
        message: String,
    },

    #[error("Invalid process descriptor {path}: {message}")]
    Validation { path: PathBuf, message: String },

    #[error("Environment variable not set: {0}")]
    MissingVariable(String),

    #[error("Context directive '{key}' failed: {source}")]
    PathNotFound {
        key: String,
        #[source]
        source: LookupError,
    },

    #[error("Context directive '{key}': no element of '{path}' has {property} = '{value}'; available values: {samples}")]
    SelectorNotFound {
        key: String,
        path: String,
        property: String,
        value: String,
        samples: String,
    },

    #[error("Context directive '{key}': cannot render {field}: {source}")]
    DirectiveTemplate {
        key: String,
        field: String,
        #[source]
        source: TemplateError,
    },

    #[error("Context directive '{key}' has unsupported type '{kind}' (expected path, selector or property)")]
    UnsupportedDirective { key: String, kind: String },

    #[error("Context directive '{key}': '{path}' must be a {expected}, found {found}")]
    TypeMismatch {
        key: String,
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Required property '{requirement}' is missing: {source}")]
    MissingRequirement {
        requirement: String,
        #[source]
        source: LookupError,
    },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}
