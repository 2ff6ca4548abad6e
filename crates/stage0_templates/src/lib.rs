//! # stage0_templates
//!
//! Template rendering and merge jobs for stage0.
//!
//! Template text is written in the Tera language (interpolation, loops,
//! conditionals, filter sections). This crate adds four filters and the three
//! job modes that turn templates into repository files:
//!
//! - `merge`: render once, in place or to a rendered output name
//! - `mergeFor`: one file per element of a sequence or mapping
//! - `mergeFrom`: one file per entry of a mapping, as `{name, content}` records
//!
//! Tera filters take keyword arguments only. `indent` is the exception: the
//! positional `indent(2)` is rewritten to `indent(n=2)` before parsing. Other
//! filters need the keyword form, e.g. `truncate(length=10)`.
//!
//! Template paths and output names are resolved against the repository root;
//! any that leave it are rejected.
//!
//! ## Example
//!
//! ```rust,no_run
//! use indexmap::IndexMap;
//! use stage0_spec::Node;
//! use stage0_templates::{TemplateJob, TemplateMerger};
//!
//! let context = Node::mapping();
//! let job = TemplateJob::merge_for("routes.template", "controls", "{{ item | lower }}_routes.py");
//!
//! let mut merger = TemplateMerger::new("./repo");
//! let outcome = merger.run(&job, &context, &IndexMap::new()).unwrap();
//! println!("wrote {} files", outcome.written.len());
//! ```

pub mod engine;
pub mod error;
pub mod filters;
pub mod job;
pub mod merger;

pub use engine::TemplateEngine;
pub use error::{TemplateError, TemplateResult};
pub use job::{FanOut, MergeMode, TemplateJob};
pub use merger::{mapping_records, normalize_path, MergeOutcome, TemplateMerger, ITEM_KEY};
