//! Requirement verification.

use tracing::{debug, info};

use crate::context::Context;
use crate::error::{CoreError, CoreResult};

/// Confirms required dotted paths resolve in the final context.
pub struct RequirementVerifier;

impl RequirementVerifier {
    /// Check every requirement, stopping at the first unmet one.
    ///
    /// Returns the number of requirements checked.
    pub fn verify(requires: &[String], context: &Context) -> CoreResult<usize> {
        for requirement in requires {
            context
                .resolve(requirement)
                .map_err(|source| CoreError::MissingRequirement {
                    requirement: requirement.clone(),
                    source,
                })?;
            debug!("Requirement '{}' satisfied", requirement);
        }
        info!("Verified {} requirements", requires.len());
        Ok(requires.len())
    }
}
