//! Environment variable resolution.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Resolved variables, in declaration order.
pub type Environment = IndexMap<String, String>;

/// Source of variable values.
pub trait EnvironmentProvider {
    /// Value of `name`, or `None` when it is unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentProvider for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Look up every declared name; the first unset one fails the read.
pub fn read_environment(
    names: &[String],
    provider: &dyn EnvironmentProvider,
) -> CoreResult<Environment> {
    let mut environment = Environment::with_capacity(names.len());
    for name in names {
        let value = provider
            .var(name)
            .ok_or_else(|| CoreError::MissingVariable(name.clone()))?;
        debug!("Resolved environment variable {}", name);
        environment.insert(name.clone(), value);
    }
    Ok(environment)
}

/// The environment as a template scope.
pub fn environment_scope(environment: &Environment) -> Value {
    Value::Object(
        environment
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}
