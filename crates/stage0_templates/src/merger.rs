//! Template merge execution.
//!
//! A merger runs [`TemplateJob`]s against a rendering context and writes the
//! results under the repository root. Fan-out jobs and renamed merges consume
//! their source template: it is removed once every output has been written.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use stage0_spec::{Mapping, Node, Scalar};
use tracing::{debug, info};

use crate::engine::TemplateEngine;
use crate::error::{TemplateError, TemplateResult};
use crate::job::{FanOut, MergeMode, TemplateJob};

/// Name under which a fan-out element is exposed to templates.
pub const ITEM_KEY: &str = "item";

/// What a single job did to the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Source template of the job.
    pub template: PathBuf,
    /// Files written, in order.
    pub written: Vec<PathBuf>,
    /// The source template, if it was removed.
    pub removed: Option<PathBuf>,
}

/// Executes template jobs relative to a repository root.
pub struct TemplateMerger {
    repo_root: PathBuf,
    engine: TemplateEngine,
}

impl TemplateMerger {
    /// Create a merger writing under `repo_root`.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            engine: TemplateEngine::new(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Run one job.
    ///
    /// `context` must be a mapping node. `environment` only takes part in rendering
    /// the output name of a plain merge.
    pub fn run(
        &mut self,
        job: &TemplateJob,
        context: &Node,
        environment: &IndexMap<String, String>,
    ) -> TemplateResult<MergeOutcome> {
        let template_path = self.resolve_output(job, &job.path)?;
        info!("Merging template {}", job);

        let source = match fs::read_to_string(&template_path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TemplateError::NotFound(template_path));
            }
            Err(e) => return Err(TemplateError::io("read", template_path, e)),
        };
        self.engine.add_template(&job.path, &source)?;

        let shared = scope_of(context);
        let mut outcome = MergeOutcome {
            template: template_path.clone(),
            ..MergeOutcome::default()
        };

        match &job.mode {
            MergeMode::Merge { output } => {
                self.merge(job, output.as_deref(), &shared, environment, &mut outcome)?
            }
            MergeMode::MergeFor(fan_out) => {
                self.merge_for(job, fan_out, context, &shared, &mut outcome)?
            }
            MergeMode::MergeFrom(fan_out) => {
                self.merge_from(job, fan_out, context, &shared, &mut outcome)?
            }
        }

        Ok(outcome)
    }

    fn merge(
        &mut self,
        job: &TemplateJob,
        output: Option<&str>,
        shared: &Map<String, Value>,
        environment: &IndexMap<String, String>,
        outcome: &mut MergeOutcome,
    ) -> TemplateResult<()> {
        let rendered = self.engine.render(&job.path, &Value::Object(shared.clone()))?;

        let target = match output {
            Some(name_template) => {
                let mut scope = shared.clone();
                for (name, value) in environment {
                    scope.insert(name.clone(), Value::String(value.clone()));
                }
                let name = self.render_name(job, name_template, scope)?;
                self.resolve_output(job, &name)?
            }
            None => outcome.template.clone(),
        };

        self.write(&target, &rendered)?;
        outcome.written.push(target.clone());

        if target != outcome.template {
            self.remove(&outcome.template)?;
            outcome.removed = Some(outcome.template.clone());
        }
        Ok(())
    }

    fn merge_for(
        &mut self,
        job: &TemplateJob,
        fan_out: &FanOut,
        context: &Node,
        shared: &Map<String, Value>,
        outcome: &mut MergeOutcome,
    ) -> TemplateResult<()> {
        let items = resolve_items(job, fan_out, context)?;
        let elements = match items {
            Node::Sequence(elements) => elements.clone(),
            Node::Mapping(map) => mapping_records(map),
            other => {
                return Err(TemplateError::TypeMismatch {
                    template: job.path.clone(),
                    items: fan_out.items.clone(),
                    expected: "sequence or mapping",
                    found: other.kind(),
                })
            }
        };
        self.fan_out(job, fan_out, &elements, shared, element_scope, outcome)
    }

    fn merge_from(
        &mut self,
        job: &TemplateJob,
        fan_out: &FanOut,
        context: &Node,
        shared: &Map<String, Value>,
        outcome: &mut MergeOutcome,
    ) -> TemplateResult<()> {
        let records = match resolve_items(job, fan_out, context)? {
            Node::Mapping(map) => mapping_records(map),
            other => {
                return Err(TemplateError::TypeMismatch {
                    template: job.path.clone(),
                    items: fan_out.items.clone(),
                    expected: "mapping",
                    found: other.kind(),
                })
            }
        };
        self.fan_out(job, fan_out, &records, shared, item_scope, outcome)
    }

    /// Render and write one file per element, then remove the source once.
    fn fan_out(
        &mut self,
        job: &TemplateJob,
        fan_out: &FanOut,
        elements: &[Node],
        shared: &Map<String, Value>,
        scope_for: fn(&Node) -> Map<String, Value>,
        outcome: &mut MergeOutcome,
    ) -> TemplateResult<()> {
        for (index, element) in elements.iter().enumerate() {
            let label = element_label(element, index);
            let local = scope_for(element);

            let name = self
                .render_name(job, &fan_out.output, local.clone())
                .map_err(|e| e.with_element(label.clone()))?;

            let mut scope = shared.clone();
            scope.extend(local);
            let rendered = self
                .engine
                .render(&job.path, &Value::Object(scope))
                .map_err(|e| e.with_element(label.clone()))?;

            let target = self.resolve_output(job, &name)?;
            self.write(&target, &rendered)?;
            debug!("Rendered element '{}' to {:?}", label, target);
            outcome.written.push(target);
        }

        self.remove(&outcome.template)?;
        outcome.removed = Some(outcome.template.clone());
        info!(
            "Template {} expanded into {} files",
            job.path,
            outcome.written.len()
        );
        Ok(())
    }

    fn render_name(
        &mut self,
        job: &TemplateJob,
        name_template: &str,
        scope: Map<String, Value>,
    ) -> TemplateResult<String> {
        let name = format!("{} (output)", job.path);
        let rendered = self
            .engine
            .render_str(&name, name_template, &Value::Object(scope))?;
        Ok(rendered.trim().to_string())
    }

    /// Join a repository-relative path onto the root and normalize it.
    ///
    /// Paths that normalize to the root itself or climb out of it are rejected.
    fn resolve_output(&self, job: &TemplateJob, relative: &str) -> TemplateResult<PathBuf> {
        let root = normalize_path(&self.repo_root);
        let target = normalize_path(&root.join(relative));
        let inside = target
            .strip_prefix(&root)
            .map(|rest| {
                rest.components().next().is_some()
                    && rest.components().all(|c| matches!(c, Component::Normal(_)))
            })
            .unwrap_or(false);
        if !inside {
            return Err(TemplateError::OutsideRepository {
                template: job.path.clone(),
                path: relative.to_string(),
            });
        }
        Ok(target)
    }

    fn write(&self, target: &Path, content: &str) -> TemplateResult<()> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| TemplateError::io("create", parent, e))?;
            }
        }
        fs::write(target, content).map_err(|e| TemplateError::io("write", target, e))
    }

    fn remove(&self, path: &Path) -> TemplateResult<()> {
        debug!("Removing consumed template {:?}", path);
        fs::remove_file(path).map_err(|e| TemplateError::io("remove", path, e))
    }
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above a relative path's start is kept; one above the
/// filesystem root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalize a mapping into `{name, content}` records, in insertion order.
pub fn mapping_records(map: &Mapping) -> Vec<Node> {
    map.iter()
        .map(|(name, content)| {
            let mut record = Mapping::with_capacity(2);
            record.insert("name".to_string(), Node::string(name.clone()));
            record.insert("content".to_string(), content.clone());
            Node::Mapping(record)
        })
        .collect()
}

fn resolve_items<'a>(
    job: &TemplateJob,
    fan_out: &FanOut,
    context: &'a Node,
) -> TemplateResult<&'a Node> {
    context
        .resolve(&fan_out.items)
        .map_err(|source| TemplateError::ItemsNotFound {
            template: job.path.clone(),
            items: fan_out.items.clone(),
            source,
        })
}

fn scope_of(node: &Node) -> Map<String, Value> {
    match node.to_json() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `item` plus, for mapping elements, every field hoisted to the top level.
fn element_scope(element: &Node) -> Map<String, Value> {
    let mut scope = scope_of(element);
    scope.insert(ITEM_KEY.to_string(), element.to_json());
    scope
}

/// `item` only.
fn item_scope(element: &Node) -> Map<String, Value> {
    let mut scope = Map::new();
    scope.insert(ITEM_KEY.to_string(), element.to_json());
    scope
}

/// Identifying name of an element for diagnostics.
fn element_label(element: &Node, index: usize) -> String {
    match element {
        Node::Scalar(Scalar::String(s)) => s.clone(),
        Node::Scalar(scalar) => scalar.to_string(),
        Node::Mapping(map) => match map.get("name").and_then(Node::as_scalar) {
            Some(name) => name.to_string(),
            None => format!("#{}", index),
        },
        Node::Sequence(_) => format!("#{}", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: Vec<(&str, Node)>) -> Node {
        Node::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_mapping_records_preserve_order() {
        let items = mapping(vec![
            ("t1", mapping(vec![("description", Node::from("d1"))])),
            ("t2", mapping(vec![("description", Node::from("d2"))])),
        ]);
        let records = mapping_records(items.as_mapping().unwrap());

        assert_eq!(
            records,
            vec![
                mapping(vec![
                    ("name", Node::from("t1")),
                    ("content", mapping(vec![("description", Node::from("d1"))])),
                ]),
                mapping(vec![
                    ("name", Node::from("t2")),
                    ("content", mapping(vec![("description", Node::from("d2"))])),
                ]),
            ]
        );
    }

    #[test]
    fn test_element_scope_hoists_mapping_fields() {
        let element = mapping(vec![("name", Node::from("svc")), ("port", Node::from(8080_i64))]);
        let scope = element_scope(&element);
        assert_eq!(scope["name"], Value::from("svc"));
        assert_eq!(scope["port"], Value::from(8080));
        assert!(scope[ITEM_KEY].is_object());

        let scope = item_scope(&element);
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_element_label() {
        assert_eq!(element_label(&Node::from("Create"), 0), "Create");
        assert_eq!(
            element_label(&mapping(vec![("name", Node::from("user"))]), 3),
            "user"
        );
        assert_eq!(element_label(&Node::mapping(), 3), "#3");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/repo/./sub/../simple.md")),
            PathBuf::from("/repo/simple.md")
        );
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("./a/.")), PathBuf::from("a"));
    }

    #[test]
    fn test_resolve_output_normalizes_within_root() {
        let merger = TemplateMerger::new("/repo");
        let job = TemplateJob::merge("t");
        assert_eq!(
            merger.resolve_output(&job, "./src/./main.rs").unwrap(),
            PathBuf::from("/repo/src/main.rs")
        );
        assert_eq!(
            merger.resolve_output(&job, "sub/../simple.md").unwrap(),
            PathBuf::from("/repo/simple.md")
        );
    }

    #[test]
    fn test_resolve_output_rejects_escapes() {
        let merger = TemplateMerger::new("/repo");
        let job = TemplateJob::merge("t");
        for escaping in ["../outside.md", "sub/../../outside.md", "/etc/passwd", ".", "sub/.."] {
            assert!(
                matches!(
                    merger.resolve_output(&job, escaping),
                    Err(TemplateError::OutsideRepository { .. })
                ),
                "{} accepted",
                escaping
            );
        }

        let relative = TemplateMerger::new("repo");
        assert!(relative.resolve_output(&job, "../x").is_err());
        assert!(TemplateMerger::new(".").resolve_output(&job, "../x").is_err());
        assert_eq!(
            TemplateMerger::new(".").resolve_output(&job, "./x").unwrap(),
            PathBuf::from("x")
        );
    }
}
