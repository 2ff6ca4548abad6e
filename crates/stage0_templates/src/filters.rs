//! Filters contributed to the template language.
//!
//! | filter             | output                                            |
//! |--------------------|---------------------------------------------------|
//! | `to_yaml`          | block-style YAML, keys sorted, no trailing newline |
//! | `to_json`          | pretty JSON, keys sorted, two-space indent       |
//! | `to_json_minified` | compact JSON                                      |
//! | `indent(n=2)`      | prefixes each non-blank line with `n` spaces      |

use std::collections::HashMap;

use serde_json::{Map, Value};
use tera::Tera;

/// Default width for [`indent_lines`] when the template gives none.
pub const DEFAULT_INDENT: usize = 2;

/// Register every filter on a Tera instance, replacing built-ins of the same name.
pub fn register(tera: &mut Tera) {
    tera.register_filter("to_yaml", to_yaml);
    tera.register_filter("to_json", to_json);
    tera.register_filter("to_json_minified", to_json_minified);
    tera.register_filter("indent", indent);
}

/// Dump a value as YAML with keys sorted at every level, without the trailing newline.
pub fn yaml_dump(value: &Value) -> Result<String, serde_yaml::Error> {
    let mut out = serde_yaml::to_string(&sorted(value))?;
    while out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

/// Pretty JSON with object keys sorted at every level.
pub fn json_pretty(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sorted(value))
}

/// JSON without any insignificant whitespace.
pub fn json_minified(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Prefix every non-blank line with `width` spaces.
///
/// Blank lines are left as they are and a trailing newline is not kept.
pub fn indent_lines(text: &str, width: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn to_yaml(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    yaml_dump(value)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("to_yaml: {}", e)))
}

fn to_json(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    json_pretty(value)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("to_json: {}", e)))
}

fn to_json_minified(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    json_minified(value)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("to_json_minified: {}", e)))
}

fn indent(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let width = match args.get("n") {
        None => DEFAULT_INDENT,
        Some(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| tera::Error::msg("indent: `n` must be a non-negative integer"))?,
    };
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Value::String(indent_lines(&text, width)))
}
