// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Deployment Errors
//!
//! Every collaborator failure surfaces to callers of the domain as a
//! [`DeploymentError`], with the collaborator error kept as its source.

use crate::domain::allocation::AllocationError;
use crate::domain::contribution::ContributionError;
use crate::domain::deployment::{BindingSelectionError, DeployerError, GenerationError};
use crate::domain::instantiation::InstantiationError;
use crate::domain::policy::{PolicyActivationError, PolicyResolutionError};
use crate::domain::repository::RepositoryError;
use std::fmt;
use thiserror::Error;

/// Aggregate of the errors reported while instantiating a deployable
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyError {
    errors: Vec<InstantiationError>,
}

impl AssemblyError {
    pub fn new(errors: Vec<InstantiationError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[InstantiationError] {
        &self.errors
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} assembly error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssemblyError {}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Contribution(#[from] ContributionError),

    #[error("Deployment plan not found: {0}")]
    DeploymentPlanNotFound(String),

    #[error("Allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Policy activation failed: {0}")]
    PolicyActivation(#[from] PolicyActivationError),

    #[error("Policy resolution failed: {0}")]
    PolicyResolution(#[from] PolicyResolutionError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Binding selection failed: {0}")]
    BindingSelection(#[from] BindingSelectionError),

    #[error("Deployment failed: {0}")]
    Deployer(#[from] DeployerError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl DeploymentError {
    pub fn is_already_deployed(&self) -> bool {
        matches!(
            self,
            DeploymentError::Contribution(ContributionError::CompositeAlreadyDeployed(_))
        )
    }

    pub fn is_not_deployed(&self) -> bool {
        matches!(
            self,
            DeploymentError::Contribution(ContributionError::CompositeNotDeployed(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qname::QName;
    use std::error::Error as _;

    #[test]
    fn test_collaborator_errors_keep_their_source() {
        let err: DeploymentError = GenerationError::Failed("zone offline".to_string()).into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("zone offline"));

        let err: DeploymentError =
            ContributionError::CompositeAlreadyDeployed(QName::local("Orders")).into();
        assert!(err.is_already_deployed());
        assert!(!err.is_not_deployed());
    }

    #[test]
    fn test_assembly_error_lists_every_cause() {
        let err = AssemblyError::new(vec![
            InstantiationError::InvalidWireSource("A".to_string()),
            InstantiationError::InvalidWireSource("B".to_string()),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 assembly error(s)"));
        assert!(text.contains("does not name a component reference"));
    }
}
