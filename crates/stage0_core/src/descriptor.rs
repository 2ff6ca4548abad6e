//! Process descriptor loading.
//!
//! The descriptor (`process.yaml`) declares what a run needs and does:
//!
//! ```yaml
//! environment:
//!   - SERVICE_NAME
//! context:
//!   - key: service
//!     type: selector
//!     path: specifications.architecture.domains
//!     filter:
//!       property: name
//!       value: "{{ SERVICE_NAME }}"
//! requires:
//!   - service.name
//! templates:
//!   - path: ./README.md
//!     merge: true
//!   - path: ./service.ts
//!     mergeFor:
//!       items: service.data.sources
//!       output: "./{{ name }}Service.ts"
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use stage0_spec::Location;
use stage0_templates::{FanOut, MergeMode, TemplateJob};
use tracing::debug;

use crate::directive::{ContextDirective, DirectiveKind, SelectorFilter};
use crate::error::{CoreError, CoreResult};

/// The parsed descriptor. Absent sections are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessDescriptor {
    /// Environment variable names, in declaration order.
    pub environment: Vec<String>,
    pub context: Vec<ContextDirective>,
    /// Dotted paths that must resolve in the final context.
    pub requires: Vec<String>,
    pub templates: Vec<TemplateJob>,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    environment: Option<RawEnvironment>,
    #[serde(default)]
    context: Option<Vec<RawDirective>>,
    #[serde(default)]
    requires: Option<Vec<String>>,
    #[serde(default)]
    templates: Option<Vec<RawJob>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnvironment {
    Names(Vec<String>),
    Mapping(IndexMap<String, serde_yaml::Value>),
}

#[derive(Debug, Deserialize)]
struct RawDirective {
    key: String,
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    filter: Option<RawFilter>,
    #[serde(default)]
    property: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFilter {
    property: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    path: String,
    #[serde(default)]
    merge: Option<bool>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default, rename = "mergeFor")]
    merge_for: Option<RawFanOut>,
    #[serde(default, rename = "mergeFrom")]
    merge_from: Option<RawFanOut>,
}

#[derive(Debug, Deserialize)]
struct RawFanOut {
    items: String,
    output: String,
}

impl ProcessDescriptor {
    /// Load and validate the descriptor at `path`.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        debug!("Loading process descriptor from {:?}", path);

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(CoreError::Io {
                    action: "read",
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content, path)
    }

    /// Parse descriptor text; `path` is only used in diagnostics.
    pub fn parse(content: &str, path: &Path) -> CoreResult<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| CoreError::Format {
                path: path.to_path_buf(),
                location: e
                    .location()
                    .map(|l| Location::At {
                        line: l.line(),
                        column: l.column(),
                    })
                    .unwrap_or(Location::Unknown),
                message: e.to_string(),
            })?;

        if value.is_null() {
            return Err(validation(path, "document is empty"));
        }

        let raw: RawDescriptor =
            serde_yaml::from_value(value).map_err(|e| validation(path, e.to_string()))?;

        let environment = match raw.environment {
            None => Vec::new(),
            Some(RawEnvironment::Names(names)) => dedup(names),
            Some(RawEnvironment::Mapping(map)) => map.into_keys().collect(),
        };

        let context = raw
            .context
            .unwrap_or_default()
            .into_iter()
            .map(|d| directive(d, path))
            .collect::<CoreResult<Vec<_>>>()?;

        let templates = raw
            .templates
            .unwrap_or_default()
            .into_iter()
            .map(|j| job(j, path))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            environment,
            context,
            requires: raw.requires.unwrap_or_default(),
            templates,
        })
    }
}

fn directive(raw: RawDirective, path: &Path) -> CoreResult<ContextDirective> {
    let kind = match raw.kind.as_str() {
        "path" => DirectiveKind::Path,
        "selector" => {
            let filter = raw.filter.ok_or_else(|| {
                validation(
                    path,
                    format!("selector directive '{}' has no filter", raw.key),
                )
            })?;
            DirectiveKind::Selector(SelectorFilter {
                property: filter.property,
                value: filter.value,
            })
        }
        "property" => {
            let property = raw.property.ok_or_else(|| {
                validation(
                    path,
                    format!("property directive '{}' has no property", raw.key),
                )
            })?;
            DirectiveKind::Property(property)
        }
        other => {
            return Err(CoreError::UnsupportedDirective {
                key: raw.key,
                kind: other.to_string(),
            })
        }
    };

    Ok(ContextDirective {
        key: raw.key,
        path: raw.path,
        kind,
    })
}

fn job(raw: RawJob, path: &Path) -> CoreResult<TemplateJob> {
    let merge = raw.merge.unwrap_or(false);
    let declared = [merge, raw.merge_for.is_some(), raw.merge_from.is_some()]
        .iter()
        .filter(|d| **d)
        .count();
    if declared != 1 {
        return Err(validation(
            path,
            format!(
                "template '{}' must declare exactly one of merge, mergeFor, mergeFrom",
                raw.path
            ),
        ));
    }
    if !merge && raw.output.is_some() {
        return Err(validation(
            path,
            format!(
                "template '{}' declares a top-level output; fan-out jobs take it inside their block",
                raw.path
            ),
        ));
    }

    let mode = match (raw.merge_for, raw.merge_from) {
        (Some(f), None) => MergeMode::MergeFor(FanOut {
            items: f.items,
            output: f.output,
        }),
        (None, Some(f)) => MergeMode::MergeFrom(FanOut {
            items: f.items,
            output: f.output,
        }),
        _ => MergeMode::Merge { output: raw.output },
    };

    Ok(TemplateJob {
        path: raw.path,
        mode,
    })
}

fn dedup(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

fn validation(path: &Path, message: impl Into<String>) -> CoreError {
    CoreError::Validation {
        path: PathBuf::from(path),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> CoreResult<ProcessDescriptor> {
        ProcessDescriptor::parse(yaml, Path::new("process.yaml"))
    }

    #[test]
    fn test_parse_full_descriptor() {
        let descriptor = parse(
            r#"
environment:
  - SERVICE_NAME
  - DATA_SOURCE
context:
  - key: architecture
    type: path
    path: specifications.architecture
  - key: service
    type: selector
    path: specifications.architecture.domains
    filter:
      property: name
      value: "{{ SERVICE_NAME }}"
  - key: productName
    type: property
    path: specifications.architecture
    property: product
requires:
  - architecture.product
templates:
  - path: ./simple.md
    merge: true
  - path: ./README.md.template
    merge: true
    output: ./README.md
  - path: ./source.ts
    mergeFor:
      items: service.data.sources
      output: "./{{ name }}Service.ts"
  - path: ./dict-test.j2
    mergeFrom:
      items: specifications.dataDictionary.types
      output: "./types/{{ item.name }}.md"
"#,
        )
        .unwrap();

        assert_eq!(descriptor.environment, vec!["SERVICE_NAME", "DATA_SOURCE"]);
        assert_eq!(descriptor.context.len(), 3);
        assert_eq!(descriptor.context[1].key, "service");
        assert!(matches!(
            descriptor.context[1].kind,
            DirectiveKind::Selector(ref f) if f.property == "name"
        ));
        assert!(matches!(
            descriptor.context[2].kind,
            DirectiveKind::Property(ref p) if p == "product"
        ));
        assert_eq!(descriptor.requires, vec!["architecture.product"]);
        assert_eq!(descriptor.templates.len(), 4);
        assert_eq!(descriptor.templates[0], TemplateJob::merge("./simple.md"));
        assert_eq!(
            descriptor.templates[1],
            TemplateJob::merge_to("./README.md.template", "./README.md")
        );
        assert_eq!(descriptor.templates[2].mode.keyword(), "mergeFor");
        assert_eq!(descriptor.templates[3].mode.keyword(), "mergeFrom");
    }

    #[test]
    fn test_absent_sections_default_to_empty() {
        let descriptor = parse("environment:\n\ncontext: []\nrequires: []\n").unwrap();
        assert_eq!(descriptor, ProcessDescriptor::default());
    }

    #[test]
    fn test_environment_mapping_keys_are_names() {
        let descriptor = parse("environment:\n  SERVICE_NAME: ~\n  DATA_SOURCE: ~\n").unwrap();
        assert_eq!(descriptor.environment, vec!["SERVICE_NAME", "DATA_SOURCE"]);

        let descriptor = parse("environment: {}\n").unwrap();
        assert!(descriptor.environment.is_empty());
    }

    #[test]
    fn test_empty_document_is_validation_error() {
        assert!(matches!(parse(""), Err(CoreError::Validation { .. })));
        assert!(matches!(parse("~\n"), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn test_malformed_yaml_is_format_error() {
        let err = parse("templates:\n  - path: bad\n  invalid: yaml: [").unwrap_err();
        assert!(matches!(err, CoreError::Format { .. }));
        let message = err.to_string();
        assert!(message.contains("process.yaml"));
        assert!(message.contains("YAML"));
    }

    #[test]
    fn test_unknown_directive_type_is_rejected() {
        let err = parse("context:\n  - key: x\n    type: lookup\n    path: a\n").unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedDirective { ref key, ref kind } if key == "x" && kind == "lookup"
        ));
    }

    #[test]
    fn test_selector_without_filter_is_rejected() {
        let err = parse("context:\n  - key: x\n    type: selector\n    path: a\n").unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn test_job_must_declare_one_mode() {
        let err = parse(
            "templates:\n  - path: a\n    merge: true\n    mergeFor:\n      items: x\n      output: y\n",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        let err = parse("templates:\n  - path: a\n").unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = ProcessDescriptor::load("/nonexistent/process.yaml").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
