// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory policy registry and the intent-driven policy attacher.
//!
//! Contributions register their policy sets up front; activation makes them
//! visible to the attacher, which matches the intents of components, services
//! and references against what each active set provides.

use crate::domain::logical::{LogicalArtifact, LogicalComponent, LogicalCompositeComponent, LogicalNode, LogicalState};
use crate::domain::policy::{
    PolicyActivationError, PolicyAttacher, PolicyRegistry, PolicyResolutionError, PolicySet,
};
use crate::domain::qname::QName;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Default)]
pub struct InMemoryPolicyRegistry {
    definitions: RwLock<BTreeMap<Url, Vec<PolicySet>>>,
    active: RwLock<BTreeMap<Url, Vec<PolicySet>>>,
}

impl InMemoryPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the policy sets a contribution defines.
    ///
    /// Policy set names are unique across contributions. Registering again
    /// for the same contribution replaces its definitions.
    pub fn register(&self, contribution: Url, policy_sets: Vec<PolicySet>) -> Result<(), PolicyActivationError> {
        let mut definitions = self.definitions.write();
        for set in &policy_sets {
            let owner = definitions
                .iter()
                .find(|(uri, sets)| **uri != contribution && sets.iter().any(|s| s.name == set.name));
            if let Some((owner, _)) = owner {
                return Err(PolicyActivationError::InvalidPolicySet {
                    policy_set: set.name.clone(),
                    reason: format!("already defined by contribution {}", owner),
                });
            }
        }
        debug!(contribution = %contribution, count = policy_sets.len(), "Registered policy sets");
        definitions.insert(contribution, policy_sets);
        Ok(())
    }

    pub fn is_active(&self, policy_set: &QName) -> bool {
        self.active
            .read()
            .values()
            .flatten()
            .any(|set| &set.name == policy_set)
    }
}

#[async_trait]
impl PolicyRegistry for InMemoryPolicyRegistry {
    async fn activate_definitions(&self, contribution: &Url) -> Result<Vec<PolicySet>, PolicyActivationError> {
        let Some(definitions) = self.definitions.read().get(contribution).cloned() else {
            return Ok(Vec::new());
        };

        let mut active = self.active.write();
        let previous = active.get(contribution);
        let activated: Vec<PolicySet> = definitions
            .iter()
            .filter(|set| !previous.is_some_and(|sets| sets.contains(set)))
            .cloned()
            .collect();
        active.insert(contribution.clone(), definitions);

        if !activated.is_empty() {
            info!(contribution = %contribution, count = activated.len(), "Activated policy sets");
        }
        Ok(activated)
    }

    async fn deactivate_definitions(&self, contribution: &Url) -> Result<Vec<PolicySet>, PolicyActivationError> {
        let removed = self.active.write().remove(contribution).unwrap_or_default();
        if !removed.is_empty() {
            info!(contribution = %contribution, count = removed.len(), "Deactivated policy sets");
        }
        Ok(removed)
    }

    async fn active_policy_sets(&self) -> Vec<PolicySet> {
        self.active.read().values().flatten().cloned().collect()
    }
}

/// Attaches active policy sets to artifacts whose intents they provide
pub struct IntentPolicyAttacher {
    registry: Arc<dyn PolicyRegistry>,
}

impl IntentPolicyAttacher {
    pub fn new(registry: Arc<dyn PolicyRegistry>) -> Self {
        Self { registry }
    }
}

fn for_each_component<E>(
    scope: &mut LogicalCompositeComponent,
    visit: &mut impl FnMut(&mut LogicalComponent) -> Result<(), E>,
) -> Result<(), E> {
    for node in scope.components_mut() {
        match node {
            LogicalNode::Atomic(component) => visit(component)?,
            LogicalNode::Composite(composite) => for_each_component(composite, visit)?,
        }
    }
    Ok(())
}

/// Attach the sets matching the intents of the component or its members
fn attach_matching(component: &mut LogicalComponent, policy_sets: &[PolicySet]) -> bool {
    let mut changed = false;
    for set in policy_sets {
        if set.provides_any(component.intents()) {
            changed |= component.add_policy_set(set.name.clone());
        }
        for service in component.services_mut() {
            if set.provides_any(service.intents()) {
                changed |= service.add_policy_set(set.name.clone());
            }
        }
        for reference in component.references_mut() {
            if set.provides_any(reference.intents()) {
                changed |= reference.add_policy_set(set.name.clone());
            }
        }
    }
    changed
}

fn detach_all(component: &mut LogicalComponent, policy_sets: &[PolicySet]) -> bool {
    let mut changed = false;
    for set in policy_sets {
        changed |= component.remove_policy_set(&set.name);
        for service in component.services_mut() {
            changed |= service.remove_policy_set(&set.name);
        }
        for reference in component.references_mut() {
            changed |= reference.remove_policy_set(&set.name);
        }
    }
    changed
}

/// A provisioned component whose policies changed is regenerated
fn reprovision(component: &mut LogicalComponent) {
    if component.state() == LogicalState::Provisioned {
        debug!(component = %component.uri(), "Policies changed, component will be regenerated");
        component.set_state(LogicalState::New);
    }
}

#[async_trait]
impl PolicyAttacher for IntentPolicyAttacher {
    async fn attach_policies(
        &self,
        domain: &mut LogicalCompositeComponent,
        incremental: bool,
    ) -> Result<(), PolicyResolutionError> {
        let active = self.registry.active_policy_sets().await;
        let active_names: BTreeSet<&QName> = active.iter().map(|set| &set.name).collect();

        for_each_component(domain, &mut |component| {
            if incremental && component.state() != LogicalState::New {
                return Ok(());
            }
            // Explicitly requested sets must be active
            if let Some(missing) = component.policy_sets().iter().find(|name| !active_names.contains(name)) {
                return Err(PolicyResolutionError::PolicySetNotFound {
                    artifact: component.uri().clone(),
                    policy_set: missing.clone(),
                });
            }
            attach_matching(component, &active);
            Ok(())
        })
    }

    async fn attach_policy_sets(
        &self,
        policy_sets: &[PolicySet],
        domain: &mut LogicalCompositeComponent,
        incremental: bool,
    ) -> Result<(), PolicyResolutionError> {
        for_each_component(domain, &mut |component| {
            if component.state().is_marked() {
                return Ok(());
            }
            if attach_matching(component, policy_sets) && incremental {
                reprovision(component);
            }
            Ok::<(), PolicyResolutionError>(())
        })
    }

    async fn detach_policy_sets(
        &self,
        policy_sets: &[PolicySet],
        domain: &mut LogicalCompositeComponent,
    ) -> Result<(), PolicyResolutionError> {
        for_each_component(domain, &mut |component| {
            if detach_all(component, policy_sets) {
                reprovision(component);
            }
            Ok::<(), PolicyResolutionError>(())
        })
    }
}
