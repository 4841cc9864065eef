// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Logical Model Instantiator
//!
//! Expands composite definitions into logical artifacts under a target
//! composite. Includes are expanded first and merge into the including
//! scope. Nested composite implementations become nested
//! [`LogicalCompositeComponent`]s whose promoted services and references carry
//! leaf handles to the artifacts they resolve to.
//!
//! References are wired, in order of precedence, from their own targets,
//! from the wire definitions of the enclosing composite, or by autowire
//! (interface match within the scope). Every problem found is recorded in the
//! returned [`InstantiationContext`]; instantiation itself never fails.

use crate::domain::definition::{
    split_target, ChannelDefinition, ComponentDefinition, ComponentType, Composite, Implementation,
    ResourceDefinition,
};
use crate::domain::instantiation::{InstantiationContext, InstantiationError, LogicalModelInstantiator};
use crate::domain::logical::{
    child_uri, member_uri, HasBindings, HasOperations, LogicalArtifact, LogicalBinding, LogicalChannel,
    LogicalComponent, LogicalCompositeComponent, LogicalConsumer, LogicalNode, LogicalProducer,
    LogicalProperty, LogicalReference, LogicalResource, LogicalResourceReference, LogicalService,
    LogicalWire,
};
use crate::domain::qname::QName;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLogicalModelInstantiator;

impl StandardLogicalModelInstantiator {
    pub fn new() -> Self {
        Self
    }

    /// Includes of `composite` first, then its own declarations, all owned
    /// by `deployable`
    fn instantiate_contents(
        &self,
        composite: &Composite,
        target: &mut LogicalCompositeComponent,
        deployable: &QName,
        context: &mut InstantiationContext,
    ) {
        for include in &composite.includes {
            self.instantiate_contents(&include.composite, target, deployable, context);
        }
        self.instantiate_declared(composite, target, deployable, context);
    }

    fn instantiate_declared(
        &self,
        composite: &Composite,
        target: &mut LogicalCompositeComponent,
        deployable: &QName,
        context: &mut InstantiationContext,
    ) {
        for channel in &composite.channels {
            if let Err(err) = self.instantiate_channel(channel, target, deployable) {
                context.add_error(err);
            }
        }
        for resource in &composite.resources {
            match child_uri(target.uri(), &resource.name) {
                Ok(uri) => target.add_resource(instantiate_resource(uri, resource, target.uri(), deployable)),
                Err(err) => context.add_error(err),
            }
        }

        let mut added = Vec::with_capacity(composite.components.len());
        for definition in &composite.components {
            let Some(mut node) = self.instantiate_component(definition, target, deployable, context) else {
                continue;
            };
            node.component_mut().add_intents(&composite.intents);
            node.component_mut().add_policy_sets(&composite.policy_sets);
            let uri = node.uri().clone();
            match target.add_component(node) {
                Ok(()) => added.push(uri),
                Err(err) => context.add_error(err),
            }
        }

        let promoted: BTreeSet<Url> = composite
            .references
            .iter()
            .flat_map(|reference| reference.promotes.iter())
            .filter_map(|promote| resolve_reference(target, promote))
            .collect();
        self.wire_components(composite, target, &added, &promoted, deployable, context);
    }

    fn instantiate_channel(
        &self,
        definition: &Arc<ChannelDefinition>,
        target: &mut LogicalCompositeComponent,
        deployable: &QName,
    ) -> Result<(), InstantiationError> {
        let uri = child_uri(target.uri(), &definition.name)?;
        let mut channel = LogicalChannel::new(uri.clone(), Arc::clone(definition), target.uri());
        channel.set_deployable(deployable.clone());
        channel.add_intents(&definition.intents);
        if let Some(binding) = &definition.binding {
            channel.add_binding(LogicalBinding::new(Arc::clone(binding), &uri))?;
        }
        target.add_channel(channel)?;
        Ok(())
    }

    fn instantiate_component(
        &self,
        definition: &Arc<ComponentDefinition>,
        scope: &LogicalCompositeComponent,
        deployable: &QName,
        context: &mut InstantiationContext,
    ) -> Option<LogicalNode> {
        let uri = match child_uri(scope.uri(), &definition.name) {
            Ok(uri) => uri,
            Err(err) => {
                context.add_error(err);
                return None;
            }
        };
        debug!(component = %uri, deployable = %deployable, "Instantiating component");

        match &definition.implementation {
            Implementation::Atomic { component_type, .. } => {
                let mut component = LogicalComponent::new(uri, Arc::clone(definition), Some(scope.uri()));
                component.set_deployable(deployable.clone());
                component.add_intents(&definition.intents);
                component.add_policy_sets(&definition.policy_sets);
                populate_atomic(&mut component, component_type, scope, context);
                Some(LogicalNode::Atomic(component))
            }
            Implementation::Composite(composite) => {
                let mut logical = LogicalCompositeComponent::new(uri, Arc::clone(definition), Some(scope.uri()));
                logical.set_autowire(
                    definition
                        .autowire
                        .resolve(composite.autowire.resolve(scope.autowire())),
                );
                let core = logical.component_mut();
                core.set_deployable(deployable.clone());
                core.add_intents(&definition.intents);
                core.add_policy_sets(&definition.policy_sets);

                self.instantiate_contents(composite, &mut logical, deployable, context);
                promote_services(composite, &mut logical, context);
                promote_references(composite, &mut logical, context);
                Some(LogicalNode::Composite(logical))
            }
        }
    }

    /// Resolve and create the wires of every reference on the components
    /// just added to `target`
    fn wire_components(
        &self,
        composite: &Composite,
        target: &mut LogicalCompositeComponent,
        added: &[Url],
        promoted: &BTreeSet<Url>,
        deployable: &QName,
        context: &mut InstantiationContext,
    ) {
        // Wire definitions keyed by source reference
        let mut declared: IndexMap<Url, Vec<String>> = IndexMap::new();
        for wire in &composite.wires {
            match resolve_wire_source(target, added, &wire.source) {
                Some(reference) => declared.entry(reference).or_default().push(wire.target.clone()),
                None => context.add_error(InstantiationError::InvalidWireSource(wire.source.clone())),
            }
        }

        let mut resolved: Vec<(Url, Vec<Url>)> = Vec::new();
        for uri in added {
            let Some(node) = target.child(uri) else {
                continue;
            };
            for reference in node.component().references() {
                if promoted.contains(reference.uri()) {
                    continue;
                }
                let mut targets = reference_targets(node, reference.name());
                if let Some(extra) = declared.get(reference.uri()) {
                    targets.extend(extra.iter().cloned());
                }

                let services = if targets.is_empty() {
                    autowire_candidates(target, node, reference)
                } else {
                    let mut services = Vec::with_capacity(targets.len());
                    for name in &targets {
                        match resolve_service(target, name) {
                            Some(service) => services.push(service),
                            None => context.add_error(InstantiationError::UnresolvedTarget {
                                reference: reference.uri().clone(),
                                target: name.clone(),
                            }),
                        }
                    }
                    services
                };

                let multiplicity = reference.multiplicity();
                if services.is_empty() {
                    if multiplicity.is_required() {
                        context.add_error(InstantiationError::UnwiredReference(reference.uri().clone()));
                    }
                    continue;
                }
                if !multiplicity.is_multiple() && services.len() > 1 {
                    context.add_error(InstantiationError::TooManyTargets {
                        reference: reference.uri().clone(),
                        count: services.len(),
                    });
                    continue;
                }
                resolved.push((reference.uri().clone(), services));
            }
        }

        let scope = target.uri().clone();
        for (reference, services) in resolved {
            for service in services {
                let wire = LogicalWire::new(&scope, reference.clone(), service, deployable.clone());
                target.add_wire(&reference, wire);
            }
            if let Some(logical) = target.find_reference_mut(&reference) {
                logical.set_resolved(true);
            }
        }
    }
}

impl LogicalModelInstantiator for StandardLogicalModelInstantiator {
    fn include(
        &self,
        composites: &[Arc<Composite>],
        domain: &mut LogicalCompositeComponent,
    ) -> InstantiationContext {
        let mut context = InstantiationContext::new();
        for composite in composites {
            // Each include is a deployable in its own right
            for include in &composite.includes {
                self.instantiate_contents(&include.composite, domain, &include.name, &mut context);
            }
            self.instantiate_declared(composite, domain, &composite.name, &mut context);
        }
        if context.has_errors() {
            debug!(errors = context.errors().len(), "Instantiation finished with errors");
        }
        context
    }
}

fn instantiate_resource(
    uri: Url,
    definition: &Arc<ResourceDefinition>,
    parent: &Url,
    deployable: &QName,
) -> LogicalResource {
    let mut resource = LogicalResource::new(uri, Arc::clone(definition), parent);
    resource.set_deployable(deployable.clone());
    resource
}

fn populate_atomic(
    component: &mut LogicalComponent,
    component_type: &ComponentType,
    scope: &LogicalCompositeComponent,
    context: &mut InstantiationContext,
) {
    let uri = component.uri().clone();

    for definition in &component_type.services {
        let service_uri = member_uri(&uri, &definition.name);
        let mut service = LogicalService::new(service_uri.clone(), definition.contract.clone(), &uri);
        for binding in &definition.bindings {
            if let Err(err) = service.add_binding(LogicalBinding::new(Arc::clone(binding), &service_uri)) {
                context.add_error(err);
            }
        }
        for binding in &definition.callback_bindings {
            service.add_callback_binding(LogicalBinding::new_callback(Arc::clone(binding), &service_uri));
        }
        service.add_intents(&definition.intents);
        service.add_policy_sets(&definition.policy_sets);
        component.add_service(service);
    }

    for definition in &component_type.references {
        let reference_uri = member_uri(&uri, &definition.name);
        let mut reference = LogicalReference::new(reference_uri.clone(), definition.contract.clone(), &uri);
        reference.set_multiplicity(definition.multiplicity);
        reference.set_autowire(definition.autowire);
        for binding in &definition.bindings {
            if let Err(err) = reference.add_binding(LogicalBinding::new(Arc::clone(binding), &reference_uri)) {
                context.add_error(err);
            }
        }
        for binding in &definition.callback_bindings {
            reference.add_callback_binding(LogicalBinding::new_callback(Arc::clone(binding), &reference_uri));
        }
        reference.add_intents(&definition.intents);
        reference.add_policy_sets(&definition.policy_sets);
        component.add_reference(reference);
    }

    for definition in &component_type.producers {
        let mut producer = LogicalProducer::new(member_uri(&uri, &definition.name), definition.contract.clone(), &uri);
        for name in &definition.targets {
            match resolve_channel(scope, name) {
                Some(channel) => producer.add_target(channel),
                None => context.add_error(InstantiationError::ChannelNotFound {
                    uri: producer.uri().clone(),
                    channel: name.clone(),
                }),
            }
        }
        component.add_producer(producer);
    }

    for definition in &component_type.consumers {
        let mut consumer = LogicalConsumer::new(member_uri(&uri, &definition.name), definition.contract.clone(), &uri);
        for name in &definition.sources {
            match resolve_channel(scope, name) {
                Some(channel) => consumer.add_source(channel),
                None => context.add_error(InstantiationError::ChannelNotFound {
                    uri: consumer.uri().clone(),
                    channel: name.clone(),
                }),
            }
        }
        component.add_consumer(consumer);
    }

    for definition in &component_type.resource_references {
        let mut resource_reference = LogicalResourceReference::new(
            member_uri(&uri, &definition.name),
            definition.contract.clone(),
            definition.optional,
            &uri,
        );
        // Resources are matched by type against the reference's interface
        if let Some(resource) = scope
            .resources()
            .iter()
            .find(|r| r.definition().resource_type == definition.contract.interface_name)
        {
            resource_reference.set_target(resource.uri().clone());
        }
        component.add_resource_reference(resource_reference);
    }

    let configured = &component.definition().properties;
    let mut properties = Vec::with_capacity(component_type.properties.len());
    for definition in &component_type.properties {
        let value = configured
            .get(&definition.name)
            .cloned()
            .or_else(|| definition.default_value.clone());
        match value {
            Some(value) => properties.push(LogicalProperty::new(&definition.name, value, definition.many, &uri)),
            None if definition.required => context.add_error(InstantiationError::MissingProperty {
                component: uri.clone(),
                property: definition.name.clone(),
            }),
            None => {}
        }
    }
    for property in properties {
        component.set_property(property);
    }
}

fn promote_services(
    composite: &Composite,
    logical: &mut LogicalCompositeComponent,
    context: &mut InstantiationContext,
) {
    let uri = logical.uri().clone();
    let mut promoted = Vec::with_capacity(composite.services.len());
    for definition in &composite.services {
        let found = resolve_service(logical, &definition.promote)
            .and_then(|service_uri| logical.find_service(&service_uri));
        let Some(leaf) = found else {
            context.add_error(InstantiationError::PromotionNotFound {
                composite: uri.clone(),
                kind: "service",
                promote: definition.promote.clone(),
            });
            continue;
        };
        let mut service = LogicalService::new(member_uri(&uri, &definition.name), leaf.contract().clone(), &uri);
        service.set_leaf(leaf.leaf_component().clone(), leaf.leaf_service().clone());
        service.add_intents(leaf.intents());
        promoted.push(service);
    }
    for service in promoted {
        logical.component_mut().add_service(service);
    }
}

fn promote_references(
    composite: &Composite,
    logical: &mut LogicalCompositeComponent,
    context: &mut InstantiationContext,
) {
    let uri = logical.uri().clone();
    let mut promoted = Vec::with_capacity(composite.references.len());
    for definition in &composite.references {
        let mut leaves = Vec::with_capacity(definition.promotes.len());
        for promote in &definition.promotes {
            match resolve_reference(logical, promote).and_then(|r| logical.find_reference(&r)) {
                Some(reference) => leaves.push(reference),
                None => context.add_error(InstantiationError::PromotionNotFound {
                    composite: uri.clone(),
                    kind: "reference",
                    promote: promote.clone(),
                }),
            }
        }
        let Some(first) = leaves.first() else {
            continue;
        };
        let mut reference = LogicalReference::new(member_uri(&uri, &definition.name), first.contract().clone(), &uri);
        reference.set_multiplicity(definition.multiplicity);
        reference.set_leaf_reference(first.leaf_reference().clone());
        for leaf in &leaves {
            reference.add_intents(leaf.intents());
        }
        promoted.push(reference);
    }
    for reference in promoted {
        logical.component_mut().add_reference(reference);
    }
}

/// Targets declared on the reference's own definition
fn reference_targets(node: &LogicalNode, name: &str) -> Vec<String> {
    match &node.component().definition().implementation {
        Implementation::Atomic { component_type, .. } => component_type
            .references
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.targets.clone())
            .unwrap_or_default(),
        Implementation::Composite(composite) => composite
            .references
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.targets.clone())
            .unwrap_or_default(),
    }
}

/// Services in scope whose interface matches the reference, owner excluded.
/// A single-valued reference takes the first match.
fn autowire_candidates(
    scope: &LogicalCompositeComponent,
    owner: &LogicalNode,
    reference: &LogicalReference,
) -> Vec<Url> {
    if !reference.autowire().resolve(scope.autowire()).is_on() {
        return Vec::new();
    }
    let mut candidates = scope
        .components()
        .filter(|node| node.uri() != owner.uri())
        .flat_map(|node| node.component().services())
        .filter(|service| service.contract().is_assignable_from(reference.contract()))
        .map(|service| service.uri().clone());
    if reference.multiplicity().is_multiple() {
        candidates.collect()
    } else {
        candidates.next().into_iter().collect()
    }
}

/// `Component/Service`, or `Component` when it offers exactly one service
fn resolve_service(scope: &LogicalCompositeComponent, target: &str) -> Option<Url> {
    let (component, member) = split_target(target);
    let node = scope.child(&child_uri(scope.uri(), component).ok()?)?;
    let component = node.component();
    match member {
        Some(name) => component.service(name).map(|s| s.uri().clone()),
        None if component.service_count() == 1 => component.services().next().map(|s| s.uri().clone()),
        None => None,
    }
}

/// `Component/reference`, or `Component` when it has exactly one reference
fn resolve_reference(scope: &LogicalCompositeComponent, promote: &str) -> Option<Url> {
    let (component, member) = split_target(promote);
    let node = scope.child(&child_uri(scope.uri(), component).ok()?)?;
    let component = node.component();
    match member {
        Some(name) => component.reference(name).map(|r| r.uri().clone()),
        None => {
            let mut references = component.references();
            match (references.next(), references.next()) {
                (Some(only), None) => Some(only.uri().clone()),
                _ => None,
            }
        }
    }
}

fn resolve_wire_source(scope: &LogicalCompositeComponent, added: &[Url], source: &str) -> Option<Url> {
    let (component, member) = split_target(source);
    let component_uri = child_uri(scope.uri(), component).ok()?;
    if !added.contains(&component_uri) {
        return None;
    }
    let reference = member?;
    scope
        .child(&component_uri)?
        .component()
        .reference(reference)
        .map(|r| r.uri().clone())
}

fn resolve_channel(scope: &LogicalCompositeComponent, name: &str) -> Option<Url> {
    let uri = child_uri(scope.uri(), name).ok()?;
    scope.channel(&uri).map(|channel| channel.uri().clone())
}
