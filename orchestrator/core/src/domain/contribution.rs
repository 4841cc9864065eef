// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Contributions
//!
//! A contribution is an installed package of composites and deployment plans.
//! Its manifest names the deployables (composites activated as a unit) in
//! declaration order; undeployment walks that order backwards.
//!
//! Each contribution tracks which deployables are currently deployed through
//! per-deployable locks. A lock is held from a successful include until the
//! matching undeploy, so the same deployable cannot be included twice.

use crate::domain::definition::Composite;
use crate::domain::plan::DeploymentPlan;
use crate::domain::qname::QName;
use crate::domain::runtime::RuntimeMode;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContributionError {
    #[error("Contribution not found: {0}")]
    NotFound(Url),

    #[error("Contribution not installed: {0}")]
    NotInstalled(Url),

    #[error("Composite already deployed: {0}")]
    CompositeAlreadyDeployed(QName),

    #[error("Composite not deployed: {0}")]
    CompositeNotDeployed(QName),

    #[error("Deployable not found: {0}")]
    DeployableNotFound(QName),

    #[error("Composite {deployable} does not declare a contribution")]
    MissingContribution { deployable: QName },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContributionState {
    /// Stored in the metadata store but not yet resolved
    #[default]
    Stored,
    Installed,
}

/// A composite designated for activation, with the runtime modes it runs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployable {
    pub name: QName,
    /// Empty means every runtime mode
    #[serde(default)]
    pub modes: Vec<RuntimeMode>,
}

impl Deployable {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            modes: Vec::new(),
        }
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = RuntimeMode>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }

    pub fn runs_in(&self, mode: RuntimeMode) -> bool {
        self.modes.is_empty() || self.modes.contains(&mode)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionManifest {
    #[serde(default)]
    pub deployables: Vec<Deployable>,
}

#[derive(Debug)]
pub struct Contribution {
    uri: Url,
    state: ContributionState,
    manifest: ContributionManifest,
    composites: Vec<Arc<Composite>>,
    plans: Vec<DeploymentPlan>,
    /// Deployables currently holding a lock, in acquisition order
    lock_owners: Mutex<Vec<QName>>,
}

impl Contribution {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            state: ContributionState::Stored,
            manifest: ContributionManifest::default(),
            composites: Vec::new(),
            plans: Vec::new(),
            lock_owners: Mutex::new(Vec::new()),
        }
    }

    /// Adds the composite, stamping this contribution's URI on it
    pub fn with_composite(mut self, composite: Composite) -> Self {
        let composite = composite.with_contribution(self.uri.clone());
        self.composites.push(Arc::new(composite));
        self
    }

    /// Adds a composite and declares it as a deployable
    pub fn with_deployable(self, composite: Composite, modes: &[RuntimeMode]) -> Self {
        let name = composite.name.clone();
        let mut contribution = self.with_composite(composite);
        contribution
            .manifest
            .deployables
            .push(Deployable::new(name).with_modes(modes.iter().copied()));
        contribution
    }

    pub fn with_plan(mut self, plan: DeploymentPlan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn installed(mut self) -> Self {
        self.state = ContributionState::Installed;
        self
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn state(&self) -> ContributionState {
        self.state
    }

    pub fn is_installed(&self) -> bool {
        self.state == ContributionState::Installed
    }

    pub fn manifest(&self) -> &ContributionManifest {
        &self.manifest
    }

    pub fn composites(&self) -> &[Arc<Composite>] {
        &self.composites
    }

    pub fn find_composite(&self, name: &QName) -> Option<&Arc<Composite>> {
        self.composites.iter().find(|c| &c.name == name)
    }

    pub fn plans(&self) -> &[DeploymentPlan] {
        &self.plans
    }

    pub fn find_plan(&self, name: &str) -> Option<&DeploymentPlan> {
        self.plans.iter().find(|p| p.name == name)
    }

    /// The first plan declared by the contribution
    pub fn default_plan(&self) -> Option<&DeploymentPlan> {
        self.plans.first()
    }

    pub fn acquire_lock(&self, owner: QName) -> Result<(), ContributionError> {
        let mut owners = self.lock_owners.lock();
        if owners.contains(&owner) {
            return Err(ContributionError::CompositeAlreadyDeployed(owner));
        }
        owners.push(owner);
        Ok(())
    }

    /// Releasing a lock that is not held is a no-op
    pub fn release_lock(&self, owner: &QName) {
        self.lock_owners.lock().retain(|held| held != owner);
    }

    pub fn lock_owners(&self) -> Vec<QName> {
        self.lock_owners.lock().clone()
    }

    pub fn is_locked(&self) -> bool {
        !self.lock_owners.lock().is_empty()
    }

    pub fn is_locked_by(&self, owner: &QName) -> bool {
        self.lock_owners.lock().contains(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution() -> Contribution {
        Contribution::new(Url::parse("fabric://contributions/orders").unwrap())
            .with_deployable(Composite::new(QName::local("Orders")), &[])
            .with_deployable(
                Composite::new(QName::local("Controller")),
                &[RuntimeMode::Controller],
            )
            .with_plan(DeploymentPlan::new("plan1"))
            .with_plan(DeploymentPlan::new("plan2"))
            .installed()
    }

    #[test]
    fn test_lock_is_exclusive_per_deployable() {
        let contribution = contribution();
        let orders = QName::local("Orders");
        contribution.acquire_lock(orders.clone()).unwrap();
        assert_eq!(
            contribution.acquire_lock(orders.clone()),
            Err(ContributionError::CompositeAlreadyDeployed(orders.clone()))
        );
        contribution.acquire_lock(QName::local("Controller")).unwrap();
        assert_eq!(contribution.lock_owners().len(), 2);

        contribution.release_lock(&orders);
        assert!(!contribution.is_locked_by(&orders));
        contribution.acquire_lock(orders).unwrap();
    }

    #[test]
    fn test_composites_carry_contribution_uri() {
        let contribution = contribution();
        let composite = contribution.find_composite(&QName::local("Orders")).unwrap();
        assert_eq!(composite.contribution_uri.as_ref(), Some(contribution.uri()));
        assert_eq!(contribution.default_plan().unwrap().name, "plan1");
        assert!(contribution.manifest().deployables[0].runs_in(RuntimeMode::Participant));
        assert!(!contribution.manifest().deployables[1].runs_in(RuntimeMode::Vm));
    }
}
