//! Thin wrapper around the Tera template language.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::{TemplateError, TemplateResult};
use crate::filters;

/// Template engine with the stage0 filters installed.
///
/// Autoescaping is off: outputs are source files, not HTML.
pub struct TemplateEngine {
    tera: Tera,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        filters::register(&mut tera);
        Self { tera }
    }

    /// Parse and register a template under `name`, replacing any previous one.
    ///
    /// `indent(4)` inside a tag is accepted as shorthand for `indent(n=4)`.
    pub fn add_template(&mut self, name: &str, source: &str) -> TemplateResult<()> {
        self.tera
            .add_raw_template(name, &keyword_indent_args(source))
            .map_err(|e| TemplateError::Syntax {
                template: name.to_string(),
                element: None,
                message: describe(&e),
            })
    }

    /// Render a registered template against a scope.
    ///
    /// The scope must be a JSON object; its keys become top-level variables.
    pub fn render(&self, name: &str, scope: &Value) -> TemplateResult<String> {
        let context = Context::from_serialize(scope).map_err(|e| TemplateError::Render {
            template: name.to_string(),
            element: None,
            message: describe(&e),
        })?;
        self.tera
            .render(name, &context)
            .map_err(|e| TemplateError::Render {
                template: name.to_string(),
                element: None,
                message: describe(&e),
            })
    }

    /// Register and render in one step.
    pub fn render_str(&mut self, name: &str, source: &str, scope: &Value) -> TemplateResult<String> {
        self.add_template(name, source)?;
        self.render(name, scope)
    }
}

fn tag_pattern() -> Option<&'static Regex> {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)\{[{%].*?[%}]\}").ok())
        .as_ref()
}

fn positional_indent_pattern() -> Option<&'static Regex> {
    static INDENT: OnceLock<Option<Regex>> = OnceLock::new();
    INDENT
        .get_or_init(|| Regex::new(r"\bindent\(\s*(\d+)\s*\)").ok())
        .as_ref()
}

/// Rewrite positional `indent(N)` calls inside tags to Tera's keyword form.
///
/// Text outside `{{ }}` and `{% %}` is left alone.
fn keyword_indent_args(source: &str) -> Cow<'_, str> {
    let (Some(tag), Some(indent)) = (tag_pattern(), positional_indent_pattern()) else {
        return Cow::Borrowed(source);
    };
    tag.replace_all(source, |caps: &Captures| {
        indent.replace_all(&caps[0], "indent(n=$1)").into_owned()
    })
}

/// Flatten Tera's error chain; the outer message alone rarely says what went wrong.
fn describe(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
