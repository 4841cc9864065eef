// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::contribution::{Contribution, ContributionError};
use crate::domain::plan::DeploymentPlan;
use crate::domain::qname::QName;
use crate::domain::repository::{ContributionHelper, DeployableRef, MetaDataStore};
use crate::domain::runtime::RuntimeMode;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Contribution lookups and lock management backed by a [`MetaDataStore`]
pub struct StandardContributionHelper {
    store: Arc<dyn MetaDataStore>,
}

impl StandardContributionHelper {
    pub fn new(store: Arc<dyn MetaDataStore>) -> Self {
        Self { store }
    }
}

impl ContributionHelper for StandardContributionHelper {
    fn find_contribution(&self, uri: &Url) -> Result<Arc<Contribution>, ContributionError> {
        let contribution = self
            .store
            .find_contribution(uri)
            .ok_or_else(|| ContributionError::NotFound(uri.clone()))?;
        if !contribution.is_installed() {
            return Err(ContributionError::NotInstalled(uri.clone()));
        }
        Ok(contribution)
    }

    fn find_deployable(&self, name: &QName) -> Result<DeployableRef, ContributionError> {
        let (contribution, composite) = self
            .store
            .resolve_composite(name)
            .ok_or_else(|| ContributionError::DeployableNotFound(name.clone()))?;
        if !contribution.is_installed() {
            return Err(ContributionError::NotInstalled(contribution.uri().clone()));
        }
        Ok(DeployableRef {
            contribution,
            composite,
        })
    }

    fn get_deployables(&self, contributions: &[Arc<Contribution>], mode: RuntimeMode) -> Vec<DeployableRef> {
        let mut deployables = Vec::new();
        for contribution in contributions {
            for deployable in &contribution.manifest().deployables {
                if !deployable.runs_in(mode) {
                    continue;
                }
                match contribution.find_composite(&deployable.name) {
                    Some(composite) => deployables.push(DeployableRef {
                        contribution: Arc::clone(contribution),
                        composite: Arc::clone(composite),
                    }),
                    None => warn!(
                        contribution = %contribution.uri(),
                        deployable = %deployable.name,
                        "Manifest names a deployable the contribution does not contain"
                    ),
                }
            }
        }
        deployables
    }

    fn find_plan(&self, name: &str) -> Option<DeploymentPlan> {
        self.store.resolve_plan(name)
    }

    fn find_default_plan(&self, contribution: &Contribution) -> Option<DeploymentPlan> {
        contribution.default_plan().cloned()
    }

    fn lock(&self, deployables: &[DeployableRef]) -> Result<(), ContributionError> {
        for (index, deployable) in deployables.iter().enumerate() {
            if let Err(err) = deployable.contribution.acquire_lock(deployable.name().clone()) {
                self.release_locks(&deployables[..index]);
                return Err(err);
            }
        }
        Ok(())
    }

    fn release_locks(&self, deployables: &[DeployableRef]) {
        for deployable in deployables {
            deployable.contribution.release_lock(deployable.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::Composite;
    use crate::infrastructure::repositories::InMemoryMetaDataStore;

    fn helper() -> (StandardContributionHelper, Url) {
        let store = Arc::new(InMemoryMetaDataStore::new());
        let uri = Url::parse("fabric://contributions/orders").unwrap();
        store
            .store(
                Contribution::new(uri.clone())
                    .with_deployable(Composite::new(QName::local("D1")), &[])
                    .with_deployable(Composite::new(QName::local("D2")), &[RuntimeMode::Controller])
                    .with_deployable(Composite::new(QName::local("D3")), &[])
                    .installed(),
            )
            .unwrap();
        store
            .store(Contribution::new(Url::parse("fabric://contributions/staged").unwrap()))
            .unwrap();
        (StandardContributionHelper::new(store), uri)
    }

    #[test]
    fn test_contribution_must_be_installed() {
        let (helper, _) = helper();
        let staged = Url::parse("fabric://contributions/staged").unwrap();
        assert_eq!(
            helper.find_contribution(&staged).unwrap_err(),
            ContributionError::NotInstalled(staged)
        );
        let missing = Url::parse("fabric://contributions/missing").unwrap();
        assert_eq!(
            helper.find_contribution(&missing).unwrap_err(),
            ContributionError::NotFound(missing)
        );
    }

    #[test]
    fn test_deployables_follow_declaration_order_and_mode() {
        let (helper, uri) = helper();
        let contribution = helper.find_contribution(&uri).unwrap();
        let names = |mode| -> Vec<String> {
            helper
                .get_deployables(&[Arc::clone(&contribution)], mode)
                .iter()
                .map(|d| d.name().to_string())
                .collect()
        };
        assert_eq!(names(RuntimeMode::Vm), vec!["D1", "D3"]);
        assert_eq!(names(RuntimeMode::Controller), vec!["D1", "D2", "D3"]);
    }

    #[test]
    fn test_lock_is_all_or_nothing() {
        let (helper, uri) = helper();
        let contribution = helper.find_contribution(&uri).unwrap();
        let deployables = helper.get_deployables(&[Arc::clone(&contribution)], RuntimeMode::Vm);
        contribution.acquire_lock(QName::local("D3")).unwrap();

        let err = helper.lock(&deployables).unwrap_err();
        assert_eq!(err, ContributionError::CompositeAlreadyDeployed(QName::local("D3")));
        assert_eq!(contribution.lock_owners(), vec![QName::local("D3")]);
    }
}
