//! Context directives: declarative instructions that compute one context value.

use serde_json::Value;
use stage0_spec::{LookupError, Node};
use stage0_templates::TemplateEngine;

use crate::context::Context;
use crate::error::{CoreError, CoreResult};

/// Most candidate values listed when a selector matches nothing.
pub const SELECTOR_SAMPLE_LIMIT: usize = 5;

/// One `context` entry of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDirective {
    /// Context key the resolved value is stored under.
    pub key: String,
    /// Dotted path template, rendered against the environment.
    pub path: String,
    pub kind: DirectiveKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    /// The value at `path`.
    Path,
    /// The first element of the sequence at `path` matching the filter.
    Selector(SelectorFilter),
    /// One named property of the mapping at `path`.
    Property(String),
}

/// Property/value pair; both sides are templates rendered against the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorFilter {
    pub property: String,
    pub value: String,
}

impl ContextDirective {
    /// Compute this directive's value.
    ///
    /// `environment` is the template scope used to render `path` and the filter.
    pub fn resolve(
        &self,
        context: &Context,
        environment: &Value,
        engine: &mut TemplateEngine,
    ) -> CoreResult<Node> {
        let path = self.render(engine, "path", &self.path, environment)?;
        let base = context
            .resolve(&path)
            .map_err(|source| self.not_found(source))?;

        match &self.kind {
            DirectiveKind::Path => Ok(base.clone()),
            DirectiveKind::Selector(filter) => {
                let property = self.render(engine, "filter.property", &filter.property, environment)?;
                let value = self.render(engine, "filter.value", &filter.value, environment)?;
                self.select(base, &path, &property, &value)
            }
            DirectiveKind::Property(property) => {
                let property = self.render(engine, "property", property, environment)?;
                let map = base.as_mapping().ok_or_else(|| CoreError::TypeMismatch {
                    key: self.key.clone(),
                    path: path.clone(),
                    expected: "mapping",
                    found: base.kind(),
                })?;
                map.get(&property).cloned().ok_or_else(|| {
                    self.not_found(LookupError::Missing {
                        path: path.clone(),
                        segment: property.clone(),
                        available: base.available_keys(),
                    })
                })
            }
        }
    }

    fn select(&self, base: &Node, path: &str, property: &str, value: &str) -> CoreResult<Node> {
        let items = base.as_sequence().ok_or_else(|| CoreError::TypeMismatch {
            key: self.key.clone(),
            path: path.to_string(),
            expected: "sequence",
            found: base.kind(),
        })?;

        let candidate = |item: &Node| {
            item.as_mapping()
                .and_then(|m| m.get(property))
                .and_then(Node::as_scalar)
                .map(|s| s.to_string())
        };

        if let Some(found) = items
            .iter()
            .find(|item| candidate(*item).as_deref() == Some(value))
        {
            return Ok(found.clone());
        }

        let values: Vec<String> = items.iter().filter_map(candidate).collect();
        let mut samples = values
            .iter()
            .take(SELECTOR_SAMPLE_LIMIT)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if values.len() > SELECTOR_SAMPLE_LIMIT {
            samples.push_str(", ...");
        }
        if samples.is_empty() {
            samples.push_str("(none)");
        }

        Err(CoreError::SelectorNotFound {
            key: self.key.clone(),
            path: path.to_string(),
            property: property.to_string(),
            value: value.to_string(),
            samples,
        })
    }

    fn render(
        &self,
        engine: &mut TemplateEngine,
        field: &str,
        source: &str,
        environment: &Value,
    ) -> CoreResult<String> {
        let name = format!("context.{}.{}", self.key, field);
        let rendered = engine
            .render_str(&name, source, environment)
            .map_err(|source| CoreError::DirectiveTemplate {
                key: self.key.clone(),
                field: field.to_string(),
                source,
            })?;
        Ok(rendered.trim().to_string())
    }

    fn not_found(&self, source: LookupError) -> CoreError {
        CoreError::PathNotFound {
            key: self.key.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(yaml: &str) -> Context {
        let mut ctx = Context::new(Node::mapping());
        let extra = Node::from_yaml(serde_yaml::from_str(yaml).unwrap()).unwrap();
        for (k, v) in extra.as_mapping().unwrap() {
            ctx.insert(k.clone(), v.clone());
        }
        ctx
    }

    fn selector(path: &str, property: &str, value: &str) -> ContextDirective {
        ContextDirective {
            key: "picked".to_string(),
            path: path.to_string(),
            kind: DirectiveKind::Selector(SelectorFilter {
                property: property.to_string(),
                value: value.to_string(),
            }),
        }
    }

    #[test]
    fn test_path_directive() {
        let ctx = context("a:\n  b:\n    c: 5\n");
        let directive = ContextDirective {
            key: "five".to_string(),
            path: "a.b.c".to_string(),
            kind: DirectiveKind::Path,
        };
        let value = directive
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap();
        assert_eq!(value, Node::from(5_i64));
    }

    #[test]
    fn test_path_directive_missing_lists_available() {
        let ctx = context("a:\n  b:\n    c: 5\n");
        let directive = ContextDirective {
            key: "x".to_string(),
            path: "a.b.x".to_string(),
            kind: DirectiveKind::Path,
        };
        let err = directive
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, CoreError::PathNotFound { .. }));
        assert!(message.contains("'x'"));
        assert!(message.contains("c"));
    }

    #[test]
    fn test_path_is_rendered_against_environment() {
        let ctx = context("services:\n  user:\n    port: 8080\n");
        let directive = ContextDirective {
            key: "service".to_string(),
            path: "services.{{ SERVICE_NAME }}".to_string(),
            kind: DirectiveKind::Path,
        };
        let value = directive
            .resolve(&ctx, &json!({"SERVICE_NAME": "user"}), &mut TemplateEngine::new())
            .unwrap();
        assert_eq!(value.resolve("port").unwrap(), &Node::from(8080_i64));
    }

    #[test]
    fn test_path_template_failure_names_directive() {
        let ctx = context("services: {}\n");
        let directive = ContextDirective {
            key: "service".to_string(),
            path: "services.{{ UNDECLARED }}".to_string(),
            kind: DirectiveKind::Path,
        };
        let err = directive
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::DirectiveTemplate { ref key, ref field, .. } if key == "service" && field == "path"
        ));

        let broken = selector("services", "name", "{% if %}");
        let err = broken
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::DirectiveTemplate { ref field, .. } if field == "filter.value"
        ));
    }

    #[test]
    fn test_selector_picks_first_match() {
        let ctx = context("domains:\n  - name: user\n  - name: admin\n    id: 2\n");
        let value = selector("domains", "name", "admin")
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap();
        assert_eq!(value.resolve("id").unwrap(), &Node::from(2_i64));
    }

    #[test]
    fn test_selector_renders_filter_from_environment() {
        let ctx = context("domains:\n  - name: user\n  - name: admin\n");
        let value = selector("domains", "name", "{{ SERVICE_NAME }}")
            .resolve(&ctx, &json!({"SERVICE_NAME": "user"}), &mut TemplateEngine::new())
            .unwrap();
        assert_eq!(value.resolve("name").unwrap().as_str(), Some("user"));
    }

    #[test]
    fn test_selector_no_match_lists_candidates() {
        let ctx = context("domains:\n  - name: user\n    id: 1\n  - name: admin\n    id: 2\n");
        let err = selector("domains", "name", "nonexistent")
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        match &err {
            CoreError::SelectorNotFound { samples, .. } => assert_eq!(samples, "user, admin"),
            other => panic!("expected selector error, got {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("nonexistent"));
        assert!(message.contains("user"));
        assert!(message.contains("admin"));
    }

    #[test]
    fn test_selector_samples_are_truncated() {
        let ctx = context("n:\n  - {v: a}\n  - {v: b}\n  - {v: c}\n  - {v: d}\n  - {v: e}\n  - {v: f}\n");
        let err = selector("n", "v", "z")
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        match err {
            CoreError::SelectorNotFound { samples, .. } => assert_eq!(samples, "a, b, c, d, e, ..."),
            other => panic!("expected selector error, got {:?}", other),
        }
    }

    #[test]
    fn test_selector_requires_sequence() {
        let ctx = context("domains:\n  user: {}\n");
        let err = selector("domains", "name", "user")
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::TypeMismatch { expected: "sequence", found: "mapping", .. }
        ));
    }

    #[test]
    fn test_property_directive() {
        let ctx = context("architecture:\n  product: ProductSlug\n");
        let directive = ContextDirective {
            key: "productName".to_string(),
            path: "architecture".to_string(),
            kind: DirectiveKind::Property("product".to_string()),
        };
        let value = directive
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap();
        assert_eq!(value.as_str(), Some("ProductSlug"));

        let missing = ContextDirective {
            kind: DirectiveKind::Property("version".to_string()),
            ..directive
        };
        let err = missing
            .resolve(&ctx, &json!({}), &mut TemplateEngine::new())
            .unwrap_err();
        assert!(err.to_string().contains("product"));
    }
}
