//! The value type shared by specification trees and rendering contexts.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::error::LookupError;

/// Insertion-ordered mapping of string keys to nodes.
pub type Mapping = IndexMap<String, Node>;

/// Label used in diagnostics for an empty (root) path.
const ROOT: &str = "<root>";

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// A specification value: scalar, sequence or mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Default for Node {
    fn default() -> Self {
        Node::Mapping(Mapping::new())
    }
}

impl Node {
    /// Create an empty mapping node.
    pub fn mapping() -> Self {
        Node::default()
    }

    /// Create a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::String(value.into()))
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(Scalar::Null) => "null",
            Node::Scalar(Scalar::Bool(_)) => "boolean",
            Node::Scalar(Scalar::Int(_)) | Node::Scalar(Scalar::Float(_)) => "number",
            Node::Scalar(Scalar::String(_)) => "string",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Look up a direct child.
    ///
    /// Mappings are addressed by key, sequences by decimal index. Distinguishes
    /// an absent key from a scalar that has no children at all.
    pub fn child(&self, segment: &str) -> Result<&Node, ChildError> {
        match self {
            Node::Mapping(map) => map.get(segment).ok_or(ChildError::Absent),
            Node::Sequence(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .ok_or(ChildError::Absent),
            Node::Scalar(_) => Err(ChildError::NotAContainer),
        }
    }

    /// Keys (or indices) available one level below this node.
    pub fn available_keys(&self) -> Vec<String> {
        match self {
            Node::Mapping(map) => map.keys().cloned().collect(),
            Node::Sequence(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Node::Scalar(_) => Vec::new(),
        }
    }

    /// Walk a dotted path (`a.b.c`) from this node.
    ///
    /// The empty path resolves to the node itself. Every other path is split on
    /// `.` as written, so `a..b` looks up an empty key. On failure the error names
    /// the deepest resolved prefix and the keys available there.
    pub fn resolve(&self, path: &str) -> Result<&Node, LookupError> {
        let mut current = self;
        let mut resolved: Vec<&str> = Vec::new();
        if path.is_empty() {
            return Ok(current);
        }

        for segment in path.split('.') {
            match current.child(segment) {
                Ok(next) => {
                    current = next;
                    resolved.push(segment);
                }
                Err(ChildError::Absent) => {
                    return Err(LookupError::Missing {
                        path: display_path(&resolved),
                        segment: segment.to_string(),
                        available: current.available_keys(),
                    });
                }
                Err(ChildError::NotAContainer) => {
                    return Err(LookupError::NotAContainer {
                        path: display_path(&resolved),
                        segment: segment.to_string(),
                        found: current.kind(),
                    });
                }
            }
        }

        Ok(current)
    }

    /// Convert a parsed YAML value.
    ///
    /// Tags are dropped in favour of the tagged value. Non-string scalar keys are
    /// stringified; sequence or mapping keys are rejected.
    pub fn from_yaml(value: YamlValue) -> Result<Node, String> {
        Ok(match value {
            YamlValue::Null => Node::Scalar(Scalar::Null),
            YamlValue::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            YamlValue::Number(n) => Node::Scalar(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            YamlValue::String(s) => Node::Scalar(Scalar::String(s)),
            YamlValue::Sequence(items) => Node::Sequence(
                items
                    .into_iter()
                    .map(Node::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            YamlValue::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(yaml_key(key)?, Node::from_yaml(value)?);
                }
                Node::Mapping(out)
            }
            YamlValue::Tagged(tagged) => Node::from_yaml(tagged.value)?,
        })
    }

    /// Convert to a JSON value for the template engine.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Node::Scalar(Scalar::Null) => JsonValue::Null,
            Node::Scalar(Scalar::Bool(b)) => JsonValue::Bool(*b),
            Node::Scalar(Scalar::Int(i)) => JsonValue::from(*i),
            Node::Scalar(Scalar::Float(x)) => serde_json::Number::from_f64(*x)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Node::Scalar(Scalar::String(s)) => JsonValue::String(s.clone()),
            Node::Sequence(items) => JsonValue::Array(items.iter().map(Node::to_json).collect()),
            Node::Mapping(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Node::Mapping(map)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::string(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::string(s)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Scalar(Scalar::Int(i))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Scalar(Scalar::Bool(b))
    }
}

/// Why [`Node::child`] found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildError {
    Absent,
    NotAContainer,
}

fn display_path(segments: &[&str]) -> String {
    if segments.is_empty() {
        ROOT.to_string()
    } else {
        segments.join(".")
    }
}

fn yaml_key(key: YamlValue) -> Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => yaml_key(tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => {
            Err("mapping keys must be scalars".to_string())
        }
    }
}
