//! The merge pipeline: descriptor and specifications in, repository files out.

use std::fs;
use std::path::{Component, PathBuf};

use stage0_spec::{Node, SpecLoader};
use stage0_templates::{normalize_path, MergeOutcome, TemplateMerger};
use tracing::info;

use crate::context::{Context, ContextResolver};
use crate::descriptor::ProcessDescriptor;
use crate::environment::{read_environment, Environment, EnvironmentProvider};
use crate::error::{CoreError, CoreResult};
use crate::verifier::RequirementVerifier;

/// Directory inside the repository that holds the descriptor.
pub const WORKING_DIR: &str = ".stage0_template";

/// Descriptor file name inside [`WORKING_DIR`].
pub const DESCRIPTOR_FILE: &str = "process.yaml";

/// Locations a run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub specifications_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub descriptor_path: PathBuf,
}

impl ProcessorConfig {
    /// Config with the descriptor at its default place inside the repository.
    pub fn new(specifications_dir: impl Into<PathBuf>, repo_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        Self {
            specifications_dir: specifications_dir.into(),
            descriptor_path: repo_dir.join(WORKING_DIR).join(DESCRIPTOR_FILE),
            repo_dir,
        }
    }

    pub fn with_descriptor(mut self, descriptor_path: impl Into<PathBuf>) -> Self {
        self.descriptor_path = descriptor_path.into();
        self
    }

    /// Directory holding the descriptor, when it lies strictly inside the repository.
    ///
    /// Both paths are normalized lexically, so `..` cannot lead out of the repository.
    pub fn working_area(&self) -> Option<PathBuf> {
        let parent = normalize_path(self.descriptor_path.parent()?);
        let repo = normalize_path(&self.repo_dir);
        let inside = parent
            .strip_prefix(&repo)
            .map(|rest| {
                rest.components().next().is_some()
                    && rest.components().all(|c| matches!(c, Component::Normal(_)))
            })
            .unwrap_or(false);
        inside.then_some(parent)
    }
}

/// Everything resolved before any template is touched.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub environment: Environment,
    pub context: Context,
    /// Keys stored by context directives, in order.
    pub context_keys: Vec<String>,
    pub requirements_checked: usize,
}

/// What a full run did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub context_keys: Vec<String>,
    pub requirements_checked: usize,
    /// One entry per template job, in execution order.
    pub outcomes: Vec<MergeOutcome>,
}

impl RunReport {
    /// Every file written by the run.
    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().flat_map(|o| o.written.iter())
    }

    /// Every template source consumed by the run.
    pub fn removed(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().filter_map(|o| o.removed.as_ref())
    }
}

/// Loaded descriptor and specification tree, ready to run.
pub struct Processor {
    config: ProcessorConfig,
    descriptor: ProcessDescriptor,
    specifications: Node,
}

impl Processor {
    /// Load the descriptor, then the specification tree.
    pub fn load(config: ProcessorConfig) -> CoreResult<Self> {
        let descriptor = ProcessDescriptor::load(&config.descriptor_path)?;
        let specifications = SpecLoader::new(&config.specifications_dir)
            .load()?
            .into_node();
        Ok(Self {
            config,
            descriptor,
            specifications,
        })
    }

    /// Build from parts already in memory.
    pub fn from_parts(
        config: ProcessorConfig,
        descriptor: ProcessDescriptor,
        specifications: Node,
    ) -> Self {
        Self {
            config,
            descriptor,
            specifications,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &ProcessDescriptor {
        &self.descriptor
    }

    pub fn specifications(&self) -> &Node {
        &self.specifications
    }

    /// Read the environment, resolve the context and verify requirements.
    ///
    /// Touches no files.
    pub fn prepare(&self, provider: &dyn EnvironmentProvider) -> CoreResult<Prepared> {
        let environment = read_environment(&self.descriptor.environment, provider)?;

        let mut context = Context::new(self.specifications.clone());
        let context_keys =
            ContextResolver::new(&environment).resolve_all(&self.descriptor.context, &mut context)?;

        let requirements_checked = RequirementVerifier::verify(&self.descriptor.requires, &context)?;

        Ok(Prepared {
            environment,
            context,
            context_keys,
            requirements_checked,
        })
    }

    /// Prepare, then execute every template job in order.
    ///
    /// The first failure aborts the run; files written by earlier jobs stay.
    pub fn run(&self, provider: &dyn EnvironmentProvider) -> CoreResult<RunReport> {
        let prepared = self.prepare(provider)?;
        let mut merger = TemplateMerger::new(&self.config.repo_dir);

        let mut outcomes = Vec::with_capacity(self.descriptor.templates.len());
        for job in &self.descriptor.templates {
            outcomes.push(merger.run(job, prepared.context.as_node(), &prepared.environment)?);
        }

        let report = RunReport {
            context_keys: prepared.context_keys,
            requirements_checked: prepared.requirements_checked,
            outcomes,
        };
        info!(
            "Processed {} templates, wrote {} files",
            report.outcomes.len(),
            report.written().count()
        );
        Ok(report)
    }

    /// Delete the descriptor's working area, if it lies inside the repository.
    ///
    /// Returns the removed directory.
    pub fn remove_working_area(&self) -> CoreResult<Option<PathBuf>> {
        let Some(area) = self.config.working_area() else {
            return Ok(None);
        };
        if !area.exists() {
            return Ok(None);
        }
        fs::remove_dir_all(&area).map_err(|source| CoreError::Io {
            action: "remove",
            path: area.clone(),
            source,
        })?;
        info!("Removed working area {:?}", area);
        Ok(Some(area))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor_location() {
        let config = ProcessorConfig::new("/specifications", "/repo");
        assert_eq!(
            config.descriptor_path,
            PathBuf::from("/repo/.stage0_template/process.yaml")
        );
        assert_eq!(
            config.working_area(),
            Some(PathBuf::from("/repo/.stage0_template"))
        );
    }

    #[test]
    fn test_working_area_outside_repo_is_ignored() {
        let config = ProcessorConfig::new("/specifications", "/repo")
            .with_descriptor("/elsewhere/process.yaml");
        assert_eq!(config.working_area(), None);

        let config = ProcessorConfig::new("/specifications", "/repo")
            .with_descriptor("/repo/process.yaml");
        assert_eq!(config.working_area(), None);
    }

    #[test]
    fn test_working_area_parent_components_are_resolved() {
        let config = ProcessorConfig::new("/specifications", "/repo")
            .with_descriptor("/repo/../outside/process.yaml");
        assert_eq!(config.working_area(), None);

        let config = ProcessorConfig::new("/specifications", "/repo")
            .with_descriptor("/repo/sub/../process.yaml");
        assert_eq!(config.working_area(), None);

        let config = ProcessorConfig::new("/specifications", "/repo/./app/..")
            .with_descriptor("/repo/custom/./process.yaml");
        assert_eq!(config.working_area(), Some(PathBuf::from("/repo/custom")));
    }

    #[test]
    fn test_remove_working_area_leaves_siblings_alone() {
        let temp = tempfile::tempdir().unwrap();
        let repo = temp.path().join("repo");
        let outside = temp.path().join("outside");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("precious.txt"), "keep").unwrap();

        let config = ProcessorConfig::new(temp.path().join("specs"), &repo)
            .with_descriptor(repo.join("../outside/process.yaml"));
        let processor = Processor::from_parts(config, ProcessDescriptor::default(), Node::mapping());

        assert_eq!(processor.remove_working_area().unwrap(), None);
        assert!(outside.join("precious.txt").exists());
    }
}
