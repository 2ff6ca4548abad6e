//! # stage0_spec
//!
//! Specification loading for stage0.
//!
//! A specification root is a directory of YAML documents. Every document is
//! parsed and placed into one nested namespace, keyed by its path relative to
//! the root (each directory is a nesting level, the file stem is the leaf key).
//!
//! ## Example
//!
//! ```rust,no_run
//! use stage0_spec::SpecLoader;
//!
//! let tree = SpecLoader::new("./specifications").load().unwrap();
//! let specs = tree.into_node();
//! let product = specs.resolve("architecture.product").unwrap();
//! println!("{:?}", product);
//! ```

pub mod error;
pub mod loader;
pub mod node;
pub mod tree;

pub use error::{Location, LookupError, SpecError, SpecResult};
pub use loader::{SpecLoader, SPEC_EXTENSIONS};
pub use node::{ChildError, Mapping, Node, Scalar};
pub use tree::{InsertConflict, SpecTree};
