// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy sets and the contracts for activating and attaching them.

use crate::domain::logical::LogicalCompositeComponent;
use crate::domain::qname::QName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyActivationError {
    #[error("Invalid policy set {policy_set}: {reason}")]
    InvalidPolicySet { policy_set: QName, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyResolutionError {
    #[error("Policy set {policy_set} required by {artifact} is not active")]
    PolicySetNotFound { artifact: Url, policy_set: QName },

    #[error("Policy resolution failed for {artifact}: {reason}")]
    Failed { artifact: Url, reason: String },
}

/// A named group of policies providing one or more intents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub name: QName,
    #[serde(default)]
    pub provides: BTreeSet<QName>,
}

impl PolicySet {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            provides: BTreeSet::new(),
        }
    }

    pub fn providing(mut self, intent: QName) -> Self {
        self.provides.insert(intent);
        self
    }

    pub fn provides_any(&self, intents: &BTreeSet<QName>) -> bool {
        !self.provides.is_disjoint(intents)
    }
}

/// Policy definitions contributed by installed contributions
#[async_trait]
pub trait PolicyRegistry: Send + Sync {
    /// Activate the contribution's policy sets, returning those newly active
    async fn activate_definitions(
        &self,
        contribution: &Url,
    ) -> Result<Vec<PolicySet>, PolicyActivationError>;

    /// Deactivate the contribution's policy sets, returning those removed
    async fn deactivate_definitions(
        &self,
        contribution: &Url,
    ) -> Result<Vec<PolicySet>, PolicyActivationError>;

    async fn active_policy_sets(&self) -> Vec<PolicySet>;
}

/// Resolves policy sets against logical artifacts
#[async_trait]
pub trait PolicyAttacher: Send + Sync {
    /// Attach every applicable active policy set across the tree.
    ///
    /// With `incremental`, provisioned components whose policies change are
    /// reset to NEW so they are regenerated.
    async fn attach_policies(
        &self,
        domain: &mut LogicalCompositeComponent,
        incremental: bool,
    ) -> Result<(), PolicyResolutionError>;

    async fn attach_policy_sets(
        &self,
        policy_sets: &[PolicySet],
        domain: &mut LogicalCompositeComponent,
        incremental: bool,
    ) -> Result<(), PolicyResolutionError>;

    async fn detach_policy_sets(
        &self,
        policy_sets: &[PolicySet],
        domain: &mut LogicalCompositeComponent,
    ) -> Result<(), PolicyResolutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_set_intent_matching() {
        let set = PolicySet::new(QName::local("Tls")).providing(QName::local("confidentiality"));
        let wanted: BTreeSet<QName> = [QName::local("confidentiality")].into_iter().collect();
        let other: BTreeSet<QName> = [QName::local("transaction")].into_iter().collect();
        assert!(set.provides_any(&wanted));
        assert!(!set.provides_any(&other));
        assert!(!set.provides_any(&BTreeSet::new()));
    }
}
