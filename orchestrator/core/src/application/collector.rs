// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Marks the artifacts of an undeployed deployable and prunes them once the
//! physical undeployment has been generated.

use crate::domain::logical::{
    is_within, HasBindings, LogicalCompositeComponent, LogicalNode, LogicalState,
};
use crate::domain::qname::QName;
use std::collections::BTreeSet;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, Default)]
pub struct Collector;

impl Collector {
    pub fn new() -> Self {
        Self
    }

    /// Mark every artifact provisioned by `deployable`
    pub fn mark_for_collection(&self, deployable: &QName, composite: &mut LogicalCompositeComponent) {
        for node in composite.components_mut() {
            if node.deployable() == Some(deployable) {
                mark_node(node);
                continue;
            }
            for service in node.component_mut().services_mut() {
                mark_assigned_bindings(service, deployable);
            }
            for reference in node.component_mut().references_mut() {
                mark_assigned_bindings(reference, deployable);
            }
            if let Some(nested) = node.as_composite_mut() {
                self.mark_for_collection(deployable, nested);
            }
        }
        for service in composite.component_mut().services_mut() {
            mark_assigned_bindings(service, deployable);
        }
        for channel in composite.channels_mut() {
            if channel.deployable() == Some(deployable) {
                channel.set_state(LogicalState::Marked);
            }
        }
        for resource in composite.resources_mut() {
            if resource.deployable() == Some(deployable) {
                resource.set_state(LogicalState::Marked);
            }
        }
        for wire in composite.all_wires_mut() {
            if wire.deployable() == deployable {
                wire.set_state(LogicalState::Marked);
            }
        }
    }

    /// Remove every MARKED artifact, returning the URIs of removed components
    pub fn collect(&self, composite: &mut LogicalCompositeComponent) -> Vec<Url> {
        let mut removed: Vec<Url> = Vec::new();
        for node in composite.components_mut() {
            if let Some(nested) = node.as_composite_mut() {
                if !nested.state().is_marked() {
                    removed.extend(self.collect(nested));
                }
            }
        }

        let marked: Vec<Url> = composite
            .components()
            .filter(|node| node.state().is_marked())
            .map(|node| node.uri().clone())
            .collect();
        composite.retain_components(|_, node| !node.state().is_marked());
        removed.extend(marked);

        composite.retain_channels(|_, channel| !channel.state().is_marked());
        composite.retain_resources(|resource| !resource.state().is_marked());

        let wired_before: BTreeSet<Url> = composite.wired_references().cloned().collect();
        composite.retain_wires(|wire| {
            !wire.state().is_marked()
                && !removed
                    .iter()
                    .any(|gone| is_within(wire.source(), gone) || is_within(wire.target(), gone))
        });
        let wired_after: BTreeSet<Url> = composite.wired_references().cloned().collect();
        for reference in wired_before.difference(&wired_after) {
            if let Some(reference) = composite.find_reference_mut(reference) {
                reference.set_resolved(false);
            }
        }

        for node in composite.components_mut() {
            drop_marked_bindings(node);
        }
        for service in composite.component_mut().services_mut() {
            service.retain_bindings(|binding| !binding.state().is_marked());
        }

        if !removed.is_empty() {
            debug!(composite = %composite.uri(), removed = removed.len(), "Collected components");
        }
        removed
    }

    /// Move every NEW artifact to PROVISIONED
    pub fn mark_as_provisioned(&self, composite: &mut LogicalCompositeComponent) {
        if composite.state().is_new() {
            composite.component_mut().set_state(LogicalState::Provisioned);
        }
        for node in composite.components_mut() {
            match node {
                LogicalNode::Atomic(component) => {
                    if component.state().is_new() {
                        component.set_state(LogicalState::Provisioned);
                    }
                }
                LogicalNode::Composite(nested) => self.mark_as_provisioned(nested),
            }
            provision_bindings(node);
        }
        for service in composite.component_mut().services_mut() {
            provision_binding_list(service);
        }
        for channel in composite.channels_mut() {
            if channel.state().is_new() {
                channel.set_state(LogicalState::Provisioned);
            }
            provision_binding_list(channel);
        }
        for resource in composite.resources_mut() {
            if resource.state().is_new() {
                resource.set_state(LogicalState::Provisioned);
            }
        }
        for wire in composite.all_wires_mut() {
            if wire.state().is_new() {
                wire.set_state(LogicalState::Provisioned);
            }
        }
    }
}

/// Marks the node and, for composites, everything it holds
fn mark_node(node: &mut LogicalNode) {
    node.set_state(LogicalState::Marked);
    if let Some(composite) = node.as_composite_mut() {
        mark_contents(composite);
    }
}

fn mark_contents(composite: &mut LogicalCompositeComponent) {
    for channel in composite.channels_mut() {
        channel.set_state(LogicalState::Marked);
    }
    for resource in composite.resources_mut() {
        resource.set_state(LogicalState::Marked);
    }
    for wire in composite.all_wires_mut() {
        wire.set_state(LogicalState::Marked);
    }
    for child in composite.components_mut() {
        if let Some(nested) = child.as_composite_mut() {
            mark_contents(nested);
        }
    }
}

fn mark_assigned_bindings<T: HasBindings>(bindable: &mut T, deployable: &QName) {
    for binding in bindable.bindings_mut() {
        if binding.is_assigned() && binding.deployable() == Some(deployable) {
            binding.set_state(LogicalState::Marked);
        }
    }
}

fn drop_marked_bindings(node: &mut LogicalNode) {
    let component = node.component_mut();
    for service in component.services_mut() {
        service.retain_bindings(|binding| !binding.state().is_marked());
    }
    for reference in component.references_mut() {
        reference.retain_bindings(|binding| !binding.state().is_marked());
    }
}

fn provision_bindings(node: &mut LogicalNode) {
    let component = node.component_mut();
    for service in component.services_mut() {
        provision_binding_list(service);
    }
    for reference in component.references_mut() {
        provision_binding_list(reference);
    }
}

fn provision_binding_list<T: HasBindings>(bindable: &mut T) {
    for binding in bindable.bindings_mut() {
        if binding.state().is_new() {
            binding.set_state(LogicalState::Provisioned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::{
        BindingDefinition, ComponentDefinition, ComponentType, Composite, ServiceContract,
    };
    use crate::domain::logical::{
        LogicalBinding, LogicalComponent, LogicalReference, LogicalService, LogicalWire,
    };
    use std::sync::Arc;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn component(name: &str, deployable: &str, domain: &Url) -> LogicalComponent {
        let definition = Arc::new(ComponentDefinition::atomic(name, "rust", ComponentType::default()));
        let component_uri = uri(&format!("{}/{}", domain, name));
        let mut component = LogicalComponent::new(component_uri.clone(), definition, Some(domain));
        component.set_deployable(QName::local(deployable));
        component.add_service(LogicalService::new(
            uri(&format!("{}#Svc", component_uri)),
            ServiceContract::new("Svc"),
            &component_uri,
        ));
        component.add_reference(LogicalReference::new(
            uri(&format!("{}#dep", component_uri)),
            ServiceContract::new("Svc"),
            &component_uri,
        ));
        component
    }

    fn domain() -> LogicalCompositeComponent {
        let definition = Arc::new(ComponentDefinition::composite(
            "domain",
            Arc::new(Composite::new(QName::local("domain"))),
        ));
        let mut domain = LogicalCompositeComponent::new(uri("fabric://domain"), definition, None);
        domain.set_state(LogicalState::Provisioned);
        let domain_uri = domain.uri().clone();
        domain.add_component(component("A", "D1", &domain_uri)).unwrap();
        domain.add_component(component("B", "D2", &domain_uri)).unwrap();

        // B (deployable D2) references A, the wire belongs to D2
        let reference = uri("fabric://domain/B#dep");
        domain.add_wire(
            &reference,
            LogicalWire::new(&domain_uri, reference.clone(), uri("fabric://domain/A#Svc"), QName::local("D2")),
        );
        domain
            .find_reference_mut(&reference)
            .unwrap()
            .set_resolved(true);
        domain
    }

    #[test]
    fn test_collect_removes_marked_component_and_its_wires() {
        let collector = Collector::new();
        let mut domain = domain();
        collector.mark_as_provisioned(&mut domain);

        // Undeploy D1: the D2 wire targets A, so it must go as well
        collector.mark_for_collection(&QName::local("D1"), &mut domain);
        assert_eq!(
            domain.find_component(&uri("fabric://domain/A")).unwrap().state(),
            LogicalState::Marked
        );
        assert_eq!(
            domain.find_component(&uri("fabric://domain/B")).unwrap().state(),
            LogicalState::Provisioned
        );

        let removed = collector.collect(&mut domain);
        assert_eq!(removed, vec![uri("fabric://domain/A")]);
        assert!(domain.find_component(&uri("fabric://domain/A")).is_none());
        let reference = uri("fabric://domain/B#dep");
        assert!(domain.wires(&reference).is_empty());
        assert!(!domain.find_reference(&reference).unwrap().is_resolved());
    }

    #[test]
    fn test_assigned_bindings_are_collected_with_their_deployable() {
        let collector = Collector::new();
        let mut domain = domain();
        let service_uri = uri("fabric://domain/A#Svc");
        let binding = Arc::new(BindingDefinition::new("fabric", QName::local("binding.fabric")));
        domain
            .find_service_mut(&service_uri)
            .unwrap()
            .add_binding(LogicalBinding::assigned(binding, &service_uri, QName::local("D2")))
            .unwrap();
        collector.mark_as_provisioned(&mut domain);

        collector.mark_for_collection(&QName::local("D2"), &mut domain);
        collector.collect(&mut domain);

        assert!(domain.find_component(&uri("fabric://domain/B")).is_none());
        assert!(domain.find_service(&service_uri).unwrap().bindings().is_empty());
    }

    #[test]
    fn test_mark_as_provisioned_only_moves_new_artifacts() {
        let collector = Collector::new();
        let mut domain = domain();
        collector.mark_for_collection(&QName::local("D1"), &mut domain);
        collector.mark_as_provisioned(&mut domain);

        assert_eq!(
            domain.find_component(&uri("fabric://domain/A")).unwrap().state(),
            LogicalState::Marked
        );
        assert_eq!(
            domain.find_component(&uri("fabric://domain/B")).unwrap().state(),
            LogicalState::Provisioned
        );
        let wire = &domain.wires(&uri("fabric://domain/B#dep"))[0];
        assert_eq!(wire.state(), LogicalState::Provisioned);
    }
}
