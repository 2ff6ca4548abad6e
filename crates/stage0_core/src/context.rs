//! The run's rendering context.

use serde_json::Value;
use stage0_spec::{LookupError, Mapping, Node};
use stage0_templates::TemplateEngine;
use tracing::{debug, info};

use crate::directive::ContextDirective;
use crate::environment::{environment_scope, Environment};
use crate::error::CoreResult;

/// Context key holding the specification tree.
pub const SPECIFICATIONS_KEY: &str = "specifications";

/// Namespace that templates render against.
///
/// Starts as `{specifications: <tree>}` and gains one key per resolved directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    root: Node,
}

impl Context {
    /// Create a context holding only the specification tree.
    pub fn new(specifications: Node) -> Self {
        let mut root = Mapping::new();
        root.insert(SPECIFICATIONS_KEY.to_string(), specifications);
        Self {
            root: Node::Mapping(root),
        }
    }

    /// Store a value under `key`, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        if let Node::Mapping(map) = &mut self.root {
            map.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.root.as_mapping().and_then(|m| m.get(key))
    }

    /// Top-level keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.root.available_keys()
    }

    /// Walk a dotted path from the top of the context.
    pub fn resolve(&self, path: &str) -> Result<&Node, LookupError> {
        self.root.resolve(path)
    }

    /// The whole context as a mapping node.
    pub fn as_node(&self) -> &Node {
        &self.root
    }

    /// The whole context as a template scope.
    pub fn to_json(&self) -> Value {
        self.root.to_json()
    }
}

/// Evaluates context directives in order.
pub struct ContextResolver {
    scope: Value,
    engine: TemplateEngine,
}

impl ContextResolver {
    /// Create a resolver rendering directive templates against `environment`.
    pub fn new(environment: &Environment) -> Self {
        Self {
            scope: environment_scope(environment),
            engine: TemplateEngine::new(),
        }
    }

    /// Resolve every directive into `context`.
    ///
    /// Directive N sees the keys stored by directives before it. Returns the keys
    /// stored, in order.
    pub fn resolve_all(
        &mut self,
        directives: &[ContextDirective],
        context: &mut Context,
    ) -> CoreResult<Vec<String>> {
        let mut keys = Vec::with_capacity(directives.len());
        for directive in directives {
            let value = directive.resolve(context, &self.scope, &mut self.engine)?;
            debug!(
                "Directive '{}' resolved to a {}",
                directive.key,
                value.kind()
            );
            context.insert(directive.key.clone(), value);
            keys.push(directive.key.clone());
        }
        info!("Resolved {} context directives", keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveKind;

    #[test]
    fn test_context_starts_with_specifications() {
        let ctx = Context::new(Node::mapping());
        assert_eq!(ctx.keys(), vec![SPECIFICATIONS_KEY]);
        assert!(ctx.get(SPECIFICATIONS_KEY).is_some());
    }

    #[test]
    fn test_directives_see_earlier_keys() {
        let specs = Node::from_yaml(
            serde_yaml::from_str("architecture:\n  product: Demo\n").unwrap(),
        )
        .unwrap();
        let mut ctx = Context::new(specs);
        let directives = vec![
            ContextDirective {
                key: "architecture".to_string(),
                path: "specifications.architecture".to_string(),
                kind: DirectiveKind::Path,
            },
            ContextDirective {
                key: "product".to_string(),
                path: "architecture.product".to_string(),
                kind: DirectiveKind::Path,
            },
        ];

        let keys = ContextResolver::new(&Environment::new())
            .resolve_all(&directives, &mut ctx)
            .unwrap();
        assert_eq!(keys, vec!["architecture", "product"]);
        assert_eq!(ctx.get("product").and_then(Node::as_str), Some("Demo"));
    }

    #[test]
    fn test_directive_cannot_see_later_keys() {
        let mut ctx = Context::new(Node::mapping());
        let directives = vec![
            ContextDirective {
                key: "first".to_string(),
                path: "second".to_string(),
                kind: DirectiveKind::Path,
            },
            ContextDirective {
                key: "second".to_string(),
                path: "specifications".to_string(),
                kind: DirectiveKind::Path,
            },
        ];
        assert!(ContextResolver::new(&Environment::new())
            .resolve_all(&directives, &mut ctx)
            .is_err());
    }
}
