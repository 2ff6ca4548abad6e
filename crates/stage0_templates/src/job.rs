//! Template job definitions.

use std::fmt;

/// One unit of generation work: a source template and how to expand it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateJob {
    /// Template path, relative to the repository root.
    pub path: String,
    pub mode: MergeMode,
}

/// How a template is expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeMode {
    /// Render once. With an output name the result goes there and the source is
    /// removed, otherwise the template is rewritten in place.
    Merge { output: Option<String> },
    /// One file per element of a sequence (or mapping, as `{name, content}` records).
    MergeFor(FanOut),
    /// One file per entry of a mapping, scoped to `item` only.
    MergeFrom(FanOut),
}

/// Collection path and output-name template for fan-out modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Dotted path into the context.
    pub items: String,
    /// Template for each output file name.
    pub output: String,
}

impl TemplateJob {
    pub fn merge(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: MergeMode::Merge { output: None },
        }
    }

    pub fn merge_to(path: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: MergeMode::Merge {
                output: Some(output.into()),
            },
        }
    }

    pub fn merge_for(
        path: impl Into<String>,
        items: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            mode: MergeMode::MergeFor(FanOut {
                items: items.into(),
                output: output.into(),
            }),
        }
    }

    pub fn merge_from(
        path: impl Into<String>,
        items: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            mode: MergeMode::MergeFrom(FanOut {
                items: items.into(),
                output: output.into(),
            }),
        }
    }
}

impl MergeMode {
    /// Descriptor keyword for this mode.
    pub fn keyword(&self) -> &'static str {
        match self {
            MergeMode::Merge { .. } => "merge",
            MergeMode::MergeFor(_) => "mergeFor",
            MergeMode::MergeFrom(_) => "mergeFrom",
        }
    }
}

impl fmt::Display for TemplateJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.mode.keyword())
    }
}
