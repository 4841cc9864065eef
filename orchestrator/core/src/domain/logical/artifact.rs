// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Capabilities shared by every node of the logical tree.

use crate::domain::qname::QName;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Data carried by every logical artifact.
///
/// The parent is a non-owning handle: the URI of the enclosing artifact.
/// Only the domain root has no parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactCore {
    parent: Option<Url>,
    intents: BTreeSet<QName>,
    policy_sets: BTreeSet<QName>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl ArtifactCore {
    pub fn new(parent: Option<Url>) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    pub fn child_of(parent: &Url) -> Self {
        Self::new(Some(parent.clone()))
    }
}

pub trait LogicalArtifact {
    fn core(&self) -> &ArtifactCore;

    fn core_mut(&mut self) -> &mut ArtifactCore;

    fn parent(&self) -> Option<&Url> {
        self.core().parent.as_ref()
    }

    fn set_parent(&mut self, parent: Url) {
        self.core_mut().parent = Some(parent);
    }

    fn intents(&self) -> &BTreeSet<QName> {
        &self.core().intents
    }

    fn add_intent(&mut self, intent: QName) {
        self.core_mut().intents.insert(intent);
    }

    fn add_intents(&mut self, intents: &BTreeSet<QName>) {
        self.core_mut().intents.extend(intents.iter().cloned());
    }

    fn policy_sets(&self) -> &BTreeSet<QName> {
        &self.core().policy_sets
    }

    /// Returns `true` if the policy set was not attached before
    fn add_policy_set(&mut self, policy_set: QName) -> bool {
        self.core_mut().policy_sets.insert(policy_set)
    }

    fn add_policy_sets(&mut self, policy_sets: &BTreeSet<QName>) {
        self.core_mut().policy_sets.extend(policy_sets.iter().cloned());
    }

    fn remove_policy_set(&mut self, policy_set: &QName) -> bool {
        self.core_mut().policy_sets.remove(policy_set)
    }

    fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.core().metadata.get(key)
    }

    /// Keys are unique; a second value for the same key replaces the first
    fn add_metadata(&mut self, key: impl Into<String>, value: serde_json::Value)
    where
        Self: Sized,
    {
        self.core_mut().metadata.insert(key.into(), value);
    }
}

macro_rules! impl_logical_artifact {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::domain::logical::artifact::LogicalArtifact for $ty {
                fn core(&self) -> &$crate::domain::logical::artifact::ArtifactCore {
                    &self.core
                }

                fn core_mut(&mut self) -> &mut $crate::domain::logical::artifact::ArtifactCore {
                    &mut self.core
                }
            }
        )+
    };
}

pub(crate) use impl_logical_artifact;
