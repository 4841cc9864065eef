// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Metadata Repository Interfaces
//!
//! Contracts for looking up installed contributions, following the
//! Repository pattern: the interface lives in the domain layer and is
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Purpose | Implementations |
//! |-------|---------|----------------|
//! | `MetaDataStore` | stores contributions, resolves them by URI or symbol | `InMemoryMetaDataStore` |
//! | `ContributionHelper` | deployables, plans and lock management for the domain | `StandardContributionHelper` |

use crate::domain::contribution::{Contribution, ContributionError};
use crate::domain::definition::Composite;
use crate::domain::plan::DeploymentPlan;
use crate::domain::qname::QName;
use crate::domain::runtime::RuntimeMode;
use std::sync::Arc;
use url::Url;

/// Store of installed contributions
pub trait MetaDataStore: Send + Sync {
    /// Store a contribution; URIs are unique
    fn store(&self, contribution: Contribution) -> Result<Arc<Contribution>, RepositoryError>;

    fn find_contribution(&self, uri: &Url) -> Option<Arc<Contribution>>;

    /// Contribution declaring the named composite
    fn resolve_composite(&self, name: &QName) -> Option<(Arc<Contribution>, Arc<Composite>)>;

    /// First plan with the given name across contributions, in store order
    fn resolve_plan(&self, name: &str) -> Option<DeploymentPlan>;

    fn contributions(&self) -> Vec<Arc<Contribution>>;

    fn remove(&self, uri: &Url) -> Option<Arc<Contribution>>;
}

/// A deployable composite together with the contribution that owns its lock
#[derive(Debug, Clone)]
pub struct DeployableRef {
    pub contribution: Arc<Contribution>,
    pub composite: Arc<Composite>,
}

impl DeployableRef {
    pub fn name(&self) -> &QName {
        &self.composite.name
    }
}

pub trait ContributionHelper: Send + Sync {
    /// Fails unless the contribution exists and is installed
    fn find_contribution(&self, uri: &Url) -> Result<Arc<Contribution>, ContributionError>;

    fn find_contributions(&self, uris: &[Url]) -> Result<Vec<Arc<Contribution>>, ContributionError> {
        uris.iter().map(|uri| self.find_contribution(uri)).collect()
    }

    /// Resolve a deployable composite by name
    fn find_deployable(&self, name: &QName) -> Result<DeployableRef, ContributionError>;

    /// Deployables declared by the contributions, in declaration order,
    /// restricted to those that run in `mode`
    fn get_deployables(&self, contributions: &[Arc<Contribution>], mode: RuntimeMode) -> Vec<DeployableRef>;

    fn find_plan(&self, name: &str) -> Option<DeploymentPlan>;

    fn find_default_plan(&self, contribution: &Contribution) -> Option<DeploymentPlan>;

    /// Lock every deployable or none of them
    fn lock(&self, deployables: &[DeployableRef]) -> Result<(), ContributionError>;

    fn release_locks(&self, deployables: &[DeployableRef]);
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
