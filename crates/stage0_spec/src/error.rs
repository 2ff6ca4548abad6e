//! Error types for the spec module.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while loading a specification tree.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Specification root not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid YAML in file {path}{location}: {message}")]
    Format {
        path: PathBuf,
        location: Location,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk specification root: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Specification key '{key}' from {path} collides with an existing entry")]
    KeyCollision { key: String, path: PathBuf },
}

impl SpecError {
    /// Build a format error from a YAML parser failure, keeping its position.
    pub fn from_yaml(path: impl Into<PathBuf>, err: &serde_yaml::Error) -> Self {
        let location = err
            .location()
            .map(|l| Location::At {
                line: l.line(),
                column: l.column(),
            })
            .unwrap_or(Location::Unknown);
        SpecError::Format {
            path: path.into(),
            location,
            message: err.to_string(),
        }
    }
}

/// Position of a format error inside a document, when the parser knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Unknown,
    At { line: usize, column: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Unknown => Ok(()),
            Location::At { line, column } => write!(f, " at line {}, column {}", line, column),
        }
    }
}

/// Failure to walk a dotted path through a [`Node`](crate::Node).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// The container at `path` has no entry named `segment`.
    #[error("key '{segment}' not found at '{path}'; available keys: {}", format_keys(.available))]
    Missing {
        path: String,
        segment: String,
        available: Vec<String>,
    },

    /// The value at `path` is a scalar and cannot be descended into.
    #[error("cannot resolve '{segment}': value at '{path}' is a {found}, not a mapping or sequence")]
    NotAContainer {
        path: String,
        segment: String,
        found: &'static str,
    },
}

impl LookupError {
    /// The segment that failed to resolve.
    pub fn segment(&self) -> &str {
        match self {
            LookupError::Missing { segment, .. } | LookupError::NotAContainer { segment, .. } => {
                segment
            }
        }
    }
}

fn format_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        "(none)".to_string()
    } else {
        keys.join(", ")
    }
}
