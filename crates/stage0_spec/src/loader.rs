//! Specification tree loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Location, SpecError, SpecResult};
use crate::node::Node;
use crate::tree::{InsertConflict, SpecTree};

/// File extensions treated as specification documents.
pub const SPEC_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Loads every YAML document under a specification root into one [`SpecTree`].
///
/// A document at `services/user.yaml` lands under the key chain
/// `services` → `user`.
pub struct SpecLoader {
    root: PathBuf,
}

impl SpecLoader {
    /// Create a loader for the given specification root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and build the tree.
    ///
    /// Entries are visited in file-name order so the result does not depend on
    /// directory listing order.
    pub fn load(&self) -> SpecResult<SpecTree> {
        if !self.root.is_dir() {
            return Err(SpecError::NotFound(self.root.clone()));
        }

        let mut tree = SpecTree::new();
        let mut documents = 0usize;

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_spec_file(path) {
                continue;
            }

            let segments = self.key_chain(path);
            let value = Self::read_document(path)?;
            debug!("Loaded specification {:?} as {}", path, segments.join("."));

            tree.try_insert(&segments, value).map_err(|conflict| {
                let key = match conflict {
                    InsertConflict::Occupied(key) | InsertConflict::Blocked(key) => key,
                };
                SpecError::KeyCollision {
                    key,
                    path: path.to_path_buf(),
                }
            })?;
            documents += 1;
        }

        info!(
            "Loaded {} specification documents from {:?}",
            documents, self.root
        );
        Ok(tree)
    }

    /// Parse one document into a node.
    pub fn read_document(path: &Path) -> SpecResult<Node> {
        let content = fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| SpecError::from_yaml(path, &e))?;
        Node::from_yaml(value).map_err(|message| SpecError::Format {
            path: path.to_path_buf(),
            location: Location::Unknown,
            message,
        })
    }

    /// Relative path components with the leaf's extension stripped.
    fn key_chain(&self, path: &Path) -> Vec<String> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut segments: Vec<String> = relative
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if let Some(stem) = relative.file_stem() {
            segments.push(stem.to_string_lossy().into_owned());
        }
        segments
    }
}

fn is_spec_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            SPEC_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}
