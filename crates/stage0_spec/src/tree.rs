//! Nested namespace assembled from specification documents.

use crate::node::{Mapping, Node};

/// The specification tree: a mapping root addressed by key chains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecTree {
    root: Mapping,
}

/// Why a checked insert was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertConflict {
    /// The leaf key already holds a value.
    Occupied(String),
    /// An intermediate key holds a non-mapping value.
    Blocked(String),
}

impl SpecTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Consume the tree as a mapping node.
    pub fn into_node(self) -> Node {
        Node::Mapping(self.root)
    }

    /// Insert `value` under `segments`, creating intermediate mappings.
    ///
    /// Refuses to replace an existing leaf or to descend through a non-mapping.
    pub fn try_insert(&mut self, segments: &[String], value: Node) -> Result<(), InsertConflict> {
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };

        let mut current = &mut self.root;
        let mut walked = Vec::with_capacity(parents.len());
        for segment in parents {
            walked.push(segment.as_str());
            current = match current
                .entry(segment.clone())
                .or_insert_with(Node::mapping)
            {
                Node::Mapping(map) => map,
                _ => return Err(InsertConflict::Blocked(walked.join("."))),
            };
        }

        if current.contains_key(leaf) {
            walked.push(leaf.as_str());
            return Err(InsertConflict::Occupied(walked.join(".")));
        }
        current.insert(leaf.clone(), value);
        Ok(())
    }

    /// Insert `value` under `segments`, last write wins.
    ///
    /// An existing leaf is replaced and any non-mapping intermediate is replaced by
    /// an empty mapping.
    pub fn insert(&mut self, segments: &[String], value: Node) {
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut current = &mut self.root;
        for segment in parents {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(Node::mapping);
            if slot.as_mapping().is_none() {
                *slot = Node::mapping();
            }
            let Node::Mapping(map) = slot else {
                return;
            };
            current = map;
        }
        current.insert(leaf.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split('/').map(String::from).collect()
    }

    #[test]
    fn test_insert_creates_intermediate_nodes() {
        let mut tree = SpecTree::new();
        tree.try_insert(&segs("a/b/c"), Node::from("leaf")).unwrap();
        tree.try_insert(&segs("a/d"), Node::from(1_i64)).unwrap();

        let node = tree.into_node();
        assert_eq!(node.resolve("a.b.c").unwrap().as_str(), Some("leaf"));
        assert_eq!(node.resolve("a.d").unwrap(), &Node::from(1_i64));
    }

    #[test]
    fn test_try_insert_rejects_occupied_leaf() {
        let mut tree = SpecTree::new();
        tree.try_insert(&segs("a/b"), Node::from(1_i64)).unwrap();
        let err = tree.try_insert(&segs("a/b"), Node::from(2_i64)).unwrap_err();
        assert_eq!(err, InsertConflict::Occupied("a.b".to_string()));
    }

    #[test]
    fn test_try_insert_rejects_scalar_parent() {
        let mut tree = SpecTree::new();
        tree.try_insert(&segs("a"), Node::from("scalar")).unwrap();
        let err = tree.try_insert(&segs("a/b"), Node::from(2_i64)).unwrap_err();
        assert_eq!(err, InsertConflict::Blocked("a".to_string()));
    }

    #[test]
    fn test_insert_last_write_wins() {
        let mut tree = SpecTree::new();
        tree.insert(&segs("a"), Node::from("scalar"));
        tree.insert(&segs("a/b"), Node::from(2_i64));
        tree.insert(&segs("a/b"), Node::from(3_i64));
        assert_eq!(tree.into_node().resolve("a.b").unwrap(), &Node::from(3_i64));
    }
}
