// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::contribution::Contribution;
use crate::domain::definition::Composite;
use crate::domain::plan::DeploymentPlan;
use crate::domain::qname::QName;
use crate::domain::repository::{MetaDataStore, RepositoryError};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;

/// In-memory contribution store, kept in insertion order
#[derive(Clone, Default)]
pub struct InMemoryMetaDataStore {
    contributions: Arc<RwLock<IndexMap<Url, Arc<Contribution>>>>,
}

impl InMemoryMetaDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaDataStore for InMemoryMetaDataStore {
    fn store(&self, contribution: Contribution) -> Result<Arc<Contribution>, RepositoryError> {
        let mut contributions = self.contributions.write();
        if contributions.contains_key(contribution.uri()) {
            return Err(RepositoryError::AlreadyExists(contribution.uri().to_string()));
        }
        let contribution = Arc::new(contribution);
        contributions.insert(contribution.uri().clone(), Arc::clone(&contribution));
        Ok(contribution)
    }

    fn find_contribution(&self, uri: &Url) -> Option<Arc<Contribution>> {
        self.contributions.read().get(uri).cloned()
    }

    fn resolve_composite(&self, name: &QName) -> Option<(Arc<Contribution>, Arc<Composite>)> {
        self.contributions.read().values().find_map(|contribution| {
            contribution
                .find_composite(name)
                .map(|composite| (Arc::clone(contribution), Arc::clone(composite)))
        })
    }

    fn resolve_plan(&self, name: &str) -> Option<DeploymentPlan> {
        self.contributions
            .read()
            .values()
            .find_map(|contribution| contribution.find_plan(name).cloned())
    }

    fn contributions(&self) -> Vec<Arc<Contribution>> {
        self.contributions.read().values().cloned().collect()
    }

    fn remove(&self, uri: &Url) -> Option<Arc<Contribution>> {
        self.contributions.write().shift_remove(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_resolve() {
        let store = InMemoryMetaDataStore::new();
        let uri = Url::parse("fabric://contributions/orders").unwrap();
        store
            .store(
                Contribution::new(uri.clone())
                    .with_composite(Composite::new(QName::local("Orders")))
                    .with_plan(DeploymentPlan::new("plan1")),
            )
            .unwrap();

        assert!(matches!(
            store.store(Contribution::new(uri.clone())),
            Err(RepositoryError::AlreadyExists(_))
        ));
        let (contribution, composite) = store.resolve_composite(&QName::local("Orders")).unwrap();
        assert_eq!(contribution.uri(), &uri);
        assert_eq!(composite.name, QName::local("Orders"));
        assert!(store.resolve_plan("plan1").is_some());
        assert!(store.resolve_plan("plan2").is_none());

        assert!(store.remove(&uri).is_some());
        assert!(store.contributions().is_empty());
    }
}
