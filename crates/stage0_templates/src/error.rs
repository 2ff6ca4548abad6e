//! Error types for templates.

use std::path::PathBuf;

use stage0_spec::LookupError;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while rendering or merging templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(PathBuf),

    #[error("Template syntax error in {template}{}: {message}", element_suffix(.element))]
    Syntax {
        template: String,
        element: Option<String>,
        message: String,
    },

    #[error("Template rendering failed for {template}{}: {message}", element_suffix(.element))]
    Render {
        template: String,
        element: Option<String>,
        message: String,
    },

    #[error("Items '{items}' for template {template} could not be resolved: {source}")]
    ItemsNotFound {
        template: String,
        items: String,
        #[source]
        source: LookupError,
    },

    #[error("Items '{items}' for template {template} must be a {expected}, found {found}")]
    TypeMismatch {
        template: String,
        items: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Path '{path}' of template {template} is outside the repository root")]
    OutsideRepository { template: String, path: String },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    /// Attach the fan-out element being rendered when the error occurred.
    pub fn with_element(self, name: impl Into<String>) -> Self {
        match self {
            TemplateError::Syntax {
                template, message, ..
            } => TemplateError::Syntax {
                template,
                element: Some(name.into()),
                message,
            },
            TemplateError::Render {
                template, message, ..
            } => TemplateError::Render {
                template,
                element: Some(name.into()),
                message,
            },
            other => other,
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

fn element_suffix(element: &Option<String>) -> String {
    match element {
        Some(name) => format!(" (element '{}')", name),
        None => String::new(),
    }
}
