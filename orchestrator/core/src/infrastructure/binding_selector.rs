// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::definition::BindingDefinition;
use crate::domain::deployment::{BindingSelectionError, BindingSelector};
use crate::domain::logical::{component_uri_of, HasBindings, LogicalBinding, LogicalCompositeComponent};
use crate::domain::qname::QName;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const FABRIC_BINDING_TYPE: &str = "binding.fabric";

/// Assigns the fabric transport binding to new wires whose endpoints run in
/// different zones. Wires inside a single zone stay unbound.
pub struct ZoneBindingSelector {
    binding: Arc<BindingDefinition>,
}

/// A wire that needs a binding, located by its declaring scope
struct Assignment {
    scope: Url,
    source: Url,
    target: Url,
    leaf_reference: Url,
    leaf_service: Url,
    deployable: QName,
}

impl ZoneBindingSelector {
    pub fn new() -> Self {
        Self::with_binding(BindingDefinition::new("fabric", QName::local(FABRIC_BINDING_TYPE)))
    }

    pub fn with_binding(binding: BindingDefinition) -> Self {
        Self {
            binding: Arc::new(binding),
        }
    }

    fn zone_of<'a>(root: &'a LogicalCompositeComponent, member: &Url) -> Option<&'a str> {
        root.find_component(&component_uri_of(member)).map(|node| node.zone())
    }

    fn pending(&self, root: &LogicalCompositeComponent) -> Vec<Assignment> {
        let mut pending = Vec::new();
        root.visit_composites(&mut |scope| {
            for wire in scope.all_wires() {
                if !wire.state().is_new() || wire.is_bound() {
                    continue;
                }
                let (Some(reference), Some(service)) =
                    (root.find_reference(wire.source()), root.find_service(wire.target()))
                else {
                    // Dangling wires are reported by the generator
                    continue;
                };
                let source_zone = Self::zone_of(root, reference.leaf_reference());
                let target_zone = Self::zone_of(root, service.leaf_component());
                if source_zone == target_zone {
                    continue;
                }
                pending.push(Assignment {
                    scope: scope.uri().clone(),
                    source: wire.source().clone(),
                    target: wire.target().clone(),
                    leaf_reference: reference.leaf_reference().clone(),
                    leaf_service: service.leaf_service().clone(),
                    deployable: wire.deployable().clone(),
                });
            }
        });
        pending
    }

    fn assign(&self, root: &mut LogicalCompositeComponent, assignment: Assignment) -> Result<(), BindingSelectionError> {
        let Assignment {
            scope,
            source,
            target,
            leaf_reference,
            leaf_service,
            deployable,
        } = assignment;
        let no_binding = || BindingSelectionError::NoBindingAvailable {
            source_uri: source.clone(),
            target_uri: target.clone(),
        };

        let service = root.find_service_mut(&leaf_service).ok_or_else(no_binding)?;
        let already_bound = service
            .bindings()
            .iter()
            .any(|binding| binding.definition().binding_type == self.binding.binding_type);
        if !already_bound {
            service
                .add_binding(LogicalBinding::assigned(self.binding.clone(), &leaf_service, deployable.clone()))
                .map_err(|e| BindingSelectionError::Failed(e.to_string()))?;
        }

        let scope_component = if scope == *root.uri() {
            Some(root)
        } else {
            root.find_component_mut(&scope).and_then(|node| node.as_composite_mut())
        };
        let wire = scope_component
            .and_then(|composite| {
                composite
                    .all_wires_mut()
                    .find(|wire| *wire.source() == source && *wire.target() == target)
            })
            .ok_or_else(no_binding)?;
        wire.set_bindings(
            LogicalBinding::assigned(self.binding.clone(), &leaf_reference, deployable.clone()),
            LogicalBinding::assigned(self.binding.clone(), &leaf_service, deployable),
        );
        debug!(source = %source, target = %target, "Assigned cross-zone binding");
        Ok(())
    }
}

impl Default for ZoneBindingSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BindingSelector for ZoneBindingSelector {
    async fn select_bindings(&self, domain: &mut LogicalCompositeComponent) -> Result<(), BindingSelectionError> {
        for assignment in self.pending(domain) {
            self.assign(domain, assignment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::{ComponentDefinition, ComponentType, Composite, ServiceContract};
    use crate::domain::logical::{LogicalArtifact, LogicalComponent, LogicalReference, LogicalService, LogicalWire};

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn domain(target_zone: &str) -> LogicalCompositeComponent {
        let definition = Arc::new(ComponentDefinition::composite(
            "domain",
            Arc::new(Composite::new(QName::local("domain"))),
        ));
        let mut domain = LogicalCompositeComponent::new(uri("fabric://domain"), definition, None);
        let domain_uri = domain.uri().clone();

        let atomic = Arc::new(ComponentDefinition::atomic("X", "rust", ComponentType::default()));
        let mut a = LogicalComponent::new(uri("fabric://domain/A"), atomic.clone(), Some(&domain_uri));
        a.set_zone(target_zone);
        a.add_service(LogicalService::new(uri("fabric://domain/A#Svc"), ServiceContract::new("Svc"), a.uri()));
        let mut b = LogicalComponent::new(uri("fabric://domain/B"), atomic, Some(&domain_uri));
        b.set_zone("zone1");
        b.add_reference(LogicalReference::new(uri("fabric://domain/B#dep"), ServiceContract::new("Svc"), b.uri()));
        domain.add_component(a).unwrap();
        domain.add_component(b).unwrap();

        let reference = uri("fabric://domain/B#dep");
        domain.add_wire(
            &reference,
            LogicalWire::new(&domain_uri, reference.clone(), uri("fabric://domain/A#Svc"), QName::local("App")),
        );
        domain
    }

    #[tokio::test]
    async fn test_cross_zone_wire_gets_fabric_binding() {
        let mut domain = domain("zone2");
        ZoneBindingSelector::new().select_bindings(&mut domain).await.unwrap();

        let wire = domain.all_wires().next().unwrap();
        assert!(wire.is_bound());
        assert_eq!(wire.source_binding().unwrap().parent(), Some(&uri("fabric://domain/B#dep")));

        let service = domain.find_service(&uri("fabric://domain/A#Svc")).unwrap();
        assert_eq!(service.bindings().len(), 1);
        assert!(service.bindings()[0].is_assigned());
        assert_eq!(service.bindings()[0].deployable(), Some(&QName::local("App")));

        // A second pass finds nothing left to bind
        ZoneBindingSelector::new().select_bindings(&mut domain).await.unwrap();
        assert_eq!(domain.find_service(&uri("fabric://domain/A#Svc")).unwrap().bindings().len(), 1);
    }

    #[tokio::test]
    async fn test_same_zone_wire_stays_unbound() {
        let mut domain = domain("zone1");
        ZoneBindingSelector::new().select_bindings(&mut domain).await.unwrap();
        assert!(!domain.all_wires().next().unwrap().is_bound());
        assert!(domain
            .find_service(&uri("fabric://domain/A#Svc"))
            .unwrap()
            .bindings()
            .is_empty());
    }
}
