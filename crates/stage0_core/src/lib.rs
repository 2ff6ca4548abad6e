//! # stage0_core
//!
//! The stage0 merge pipeline.
//!
//! A run is driven by a process descriptor and proceeds strictly in order:
//!
//! 1. read the declared environment variables
//! 2. evaluate context directives against the specification tree
//! 3. verify required paths resolve
//! 4. expand template jobs into repository files
//!
//! Any failure aborts the run with a diagnostic naming the failing artifact.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stage0_core::{ProcessEnvironment, Processor, ProcessorConfig};
//!
//! let config = ProcessorConfig::new("/specifications", "/repo");
//! let processor = Processor::load(config).unwrap();
//! let report = processor.run(&ProcessEnvironment).unwrap();
//! for file in report.written() {
//!     println!("wrote {}", file.display());
//! }
//! ```

pub mod context;
pub mod descriptor;
pub mod directive;
pub mod environment;
pub mod error;
pub mod processor;
pub mod verifier;

pub use context::{Context, ContextResolver, SPECIFICATIONS_KEY};
pub use descriptor::ProcessDescriptor;
pub use directive::{ContextDirective, DirectiveKind, SelectorFilter};
pub use environment::{
    read_environment, Environment, EnvironmentProvider, ProcessEnvironment, StaticEnvironment,
};
pub use error::{CoreError, CoreResult};
pub use processor::{
    Prepared, Processor, ProcessorConfig, RunReport, DESCRIPTOR_FILE, WORKING_DIR,
};
pub use verifier::RequirementVerifier;
