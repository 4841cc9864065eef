// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Static Assembly Model
//!
//! Immutable definitions produced by introspection and contribution
//! processing. The logical model holds `Arc` handles to these values, so a
//! copied logical tree shares definitions with the original.
//!
//! Wire targets and promotion paths use the textual `Component/member`
//! form; the member part is optional when the component exposes exactly one
//! service.

use crate::domain::qname::QName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use url::Url;

/// Autowire setting of a composite, component or reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Autowire {
    On,
    Off,
    #[default]
    Inherited,
}

impl Autowire {
    /// Resolve an inherited setting against the enclosing scope
    pub fn resolve(self, enclosing: Autowire) -> Autowire {
        match self {
            Autowire::Inherited => enclosing,
            explicit => explicit,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Autowire::On)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Multiplicity {
    ZeroOne,
    #[default]
    OneOne,
    ZeroN,
    OneN,
}

impl Multiplicity {
    pub fn is_required(self) -> bool {
        matches!(self, Multiplicity::OneOne | Multiplicity::OneN)
    }

    pub fn is_multiple(self) -> bool {
        matches!(self, Multiplicity::ZeroN | Multiplicity::OneN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDefinition {
    pub name: String,
    pub input_types: Vec<String>,
    pub output_type: Option<String>,
    pub one_way: bool,
}

impl OperationDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_types: Vec::new(),
            output_type: None,
            one_way: false,
        }
    }
}

/// Interface contract of a service, reference, producer or consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContract {
    pub interface_name: String,
    pub operations: Vec<OperationDefinition>,
    pub callback: Option<Box<ServiceContract>>,
}

impl ServiceContract {
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            operations: Vec::new(),
            callback: None,
        }
    }

    pub fn with_operation(mut self, name: impl Into<String>) -> Self {
        self.operations.push(OperationDefinition::new(name));
        self
    }

    pub fn with_callback(mut self, callback: ServiceContract) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Interface-level compatibility used by autowire
    pub fn is_assignable_from(&self, other: &ServiceContract) -> bool {
        self.interface_name == other.interface_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDefinition {
    pub name: String,
    pub binding_type: QName,
    pub target_uri: Option<Url>,
    pub intents: BTreeSet<QName>,
    pub configuration: BTreeMap<String, String>,
}

impl BindingDefinition {
    pub fn new(name: impl Into<String>, binding_type: QName) -> Self {
        Self {
            name: name.into(),
            binding_type,
            target_uri: None,
            intents: BTreeSet::new(),
            configuration: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub name: String,
    pub contract: ServiceContract,
    pub bindings: Vec<Arc<BindingDefinition>>,
    pub callback_bindings: Vec<Arc<BindingDefinition>>,
    pub intents: BTreeSet<QName>,
    pub policy_sets: BTreeSet<QName>,
}

impl ServiceDefinition {
    pub fn new(name: impl Into<String>, contract: ServiceContract) -> Self {
        Self {
            name: name.into(),
            contract,
            bindings: Vec::new(),
            callback_bindings: Vec::new(),
            intents: BTreeSet::new(),
            policy_sets: BTreeSet::new(),
        }
    }

    pub fn with_binding(mut self, binding: BindingDefinition) -> Self {
        self.bindings.push(Arc::new(binding));
        self
    }

    pub fn with_callback_binding(mut self, binding: BindingDefinition) -> Self {
        self.callback_bindings.push(Arc::new(binding));
        self
    }

    pub fn with_intent(mut self, intent: QName) -> Self {
        self.intents.insert(intent);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceDefinition {
    pub name: String,
    pub contract: ServiceContract,
    pub multiplicity: Multiplicity,
    pub targets: Vec<String>,
    pub autowire: Autowire,
    pub bindings: Vec<Arc<BindingDefinition>>,
    pub callback_bindings: Vec<Arc<BindingDefinition>>,
    pub intents: BTreeSet<QName>,
    pub policy_sets: BTreeSet<QName>,
}

impl ReferenceDefinition {
    pub fn new(name: impl Into<String>, contract: ServiceContract) -> Self {
        Self {
            name: name.into(),
            contract,
            multiplicity: Multiplicity::default(),
            targets: Vec::new(),
            autowire: Autowire::Inherited,
            bindings: Vec::new(),
            callback_bindings: Vec::new(),
            intents: BTreeSet::new(),
            policy_sets: BTreeSet::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn with_autowire(mut self, autowire: Autowire) -> Self {
        self.autowire = autowire;
        self
    }

    pub fn with_binding(mut self, binding: BindingDefinition) -> Self {
        self.bindings.push(Arc::new(binding));
        self
    }

    pub fn with_intent(mut self, intent: QName) -> Self {
        self.intents.insert(intent);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProducerDefinition {
    pub name: String,
    pub contract: ServiceContract,
    /// Channel names in the enclosing composite
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConsumerDefinition {
    pub name: String,
    pub contract: ServiceContract,
    /// Channel names in the enclosing composite
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResourceReferenceDefinition {
    pub name: String,
    pub contract: ServiceContract,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub name: String,
    pub default_value: Option<serde_json::Value>,
    pub required: bool,
    pub many: bool,
}

/// Introspected shape of an atomic implementation
#[derive(Debug, Clone, Default)]
pub struct ComponentType {
    pub services: Vec<ServiceDefinition>,
    pub references: Vec<ReferenceDefinition>,
    pub producers: Vec<ProducerDefinition>,
    pub consumers: Vec<ConsumerDefinition>,
    pub resource_references: Vec<ResourceReferenceDefinition>,
    pub properties: Vec<PropertyDefinition>,
}

impl ComponentType {
    pub fn with_service(mut self, service: ServiceDefinition) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_reference(mut self, reference: ReferenceDefinition) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_producer(mut self, producer: ProducerDefinition) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn with_consumer(mut self, consumer: ConsumerDefinition) -> Self {
        self.consumers.push(consumer);
        self
    }

    pub fn with_resource_reference(mut self, resource_reference: ResourceReferenceDefinition) -> Self {
        self.resource_references.push(resource_reference);
        self
    }

    pub fn with_property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Implementation {
    Atomic {
        implementation_type: String,
        component_type: ComponentType,
    },
    Composite(Arc<Composite>),
}

#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub name: String,
    pub implementation: Implementation,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub autowire: Autowire,
    pub intents: BTreeSet<QName>,
    pub policy_sets: BTreeSet<QName>,
}

impl ComponentDefinition {
    pub fn atomic(
        name: impl Into<String>,
        implementation_type: impl Into<String>,
        component_type: ComponentType,
    ) -> Self {
        Self::new(
            name,
            Implementation::Atomic {
                implementation_type: implementation_type.into(),
                component_type,
            },
        )
    }

    pub fn composite(name: impl Into<String>, composite: Arc<Composite>) -> Self {
        Self::new(name, Implementation::Composite(composite))
    }

    fn new(name: impl Into<String>, implementation: Implementation) -> Self {
        Self {
            name: name.into(),
            implementation,
            properties: BTreeMap::new(),
            autowire: Autowire::Inherited,
            intents: BTreeSet::new(),
            policy_sets: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_intent(mut self, intent: QName) -> Self {
        self.intents.insert(intent);
        self
    }

    pub fn with_policy_set(mut self, policy_set: QName) -> Self {
        self.policy_sets.insert(policy_set);
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.implementation, Implementation::Composite(_))
    }
}

#[derive(Debug, Clone)]
pub struct ChannelDefinition {
    pub name: String,
    pub channel_type: String,
    pub binding: Option<Arc<BindingDefinition>>,
    pub intents: BTreeSet<QName>,
}

impl ChannelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel_type: "default".to_string(),
            binding: None,
            intents: BTreeSet::new(),
        }
    }

    pub fn with_binding(mut self, binding: BindingDefinition) -> Self {
        self.binding = Some(Arc::new(binding));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    pub name: String,
    pub resource_type: String,
    pub configuration: BTreeMap<String, String>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            configuration: BTreeMap::new(),
        }
    }
}

/// Explicit `<wire>` declared in a composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDefinition {
    pub source: String,
    pub target: String,
}

/// A composite service promoting a child service
#[derive(Debug, Clone)]
pub struct CompositeService {
    pub name: String,
    pub promote: String,
}

/// A composite reference promoting one or more child references
#[derive(Debug, Clone)]
pub struct CompositeReference {
    pub name: String,
    pub promotes: Vec<String>,
    pub targets: Vec<String>,
    pub multiplicity: Multiplicity,
}

#[derive(Debug, Clone)]
pub struct Include {
    pub name: QName,
    pub composite: Arc<Composite>,
}

#[derive(Debug, Clone)]
pub struct Composite {
    pub name: QName,
    /// Contribution that declared this composite
    pub contribution_uri: Option<Url>,
    pub autowire: Autowire,
    pub components: Vec<Arc<ComponentDefinition>>,
    pub channels: Vec<Arc<ChannelDefinition>>,
    pub resources: Vec<Arc<ResourceDefinition>>,
    pub wires: Vec<WireDefinition>,
    pub services: Vec<CompositeService>,
    pub references: Vec<CompositeReference>,
    pub includes: Vec<Include>,
    pub intents: BTreeSet<QName>,
    pub policy_sets: BTreeSet<QName>,
}

impl Composite {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            contribution_uri: None,
            autowire: Autowire::Inherited,
            components: Vec::new(),
            channels: Vec::new(),
            resources: Vec::new(),
            wires: Vec::new(),
            services: Vec::new(),
            references: Vec::new(),
            includes: Vec::new(),
            intents: BTreeSet::new(),
            policy_sets: BTreeSet::new(),
        }
    }

    /// Throwaway composite that includes `deployable`, letting a
    /// non-root composite be expanded directly into the domain.
    pub fn wrap_include(deployable: &Arc<Composite>) -> Arc<Composite> {
        let mut wrapper = Composite::new(QName::new(
            deployable.name.namespace(),
            format!("{}.wrapper", deployable.name.local_part()),
        ));
        wrapper.contribution_uri = deployable.contribution_uri.clone();
        wrapper.includes.push(Include {
            name: deployable.name.clone(),
            composite: Arc::clone(deployable),
        });
        Arc::new(wrapper)
    }

    pub fn with_contribution(mut self, uri: Url) -> Self {
        self.contribution_uri = Some(uri);
        self
    }

    pub fn with_autowire(mut self, autowire: Autowire) -> Self {
        self.autowire = autowire;
        self
    }

    pub fn with_component(mut self, component: ComponentDefinition) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    pub fn with_channel(mut self, channel: ChannelDefinition) -> Self {
        self.channels.push(Arc::new(channel));
        self
    }

    pub fn with_resource(mut self, resource: ResourceDefinition) -> Self {
        self.resources.push(Arc::new(resource));
        self
    }

    pub fn with_wire(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.wires.push(WireDefinition {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    pub fn with_service(mut self, name: impl Into<String>, promote: impl Into<String>) -> Self {
        self.services.push(CompositeService {
            name: name.into(),
            promote: promote.into(),
        });
        self
    }

    pub fn with_reference(mut self, reference: CompositeReference) -> Self {
        self.references.push(reference);
        self
    }
}

/// Split a `Component/member` path into its two parts
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('/') {
        Some((component, member)) if !member.is_empty() => (component, Some(member)),
        Some((component, _)) => (component, None),
        None => (target, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autowire_resolution() {
        assert_eq!(Autowire::Inherited.resolve(Autowire::On), Autowire::On);
        assert_eq!(Autowire::Off.resolve(Autowire::On), Autowire::Off);
        assert!(Autowire::On.resolve(Autowire::Off).is_on());
    }

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("Billing/Invoices"), ("Billing", Some("Invoices")));
        assert_eq!(split_target("Billing"), ("Billing", None));
        assert_eq!(split_target("Billing/"), ("Billing", None));
    }

    #[test]
    fn test_wrap_include_points_at_deployable() {
        let deployable = Arc::new(
            Composite::new(QName::new("urn:test", "Orders"))
                .with_contribution(Url::parse("fabric://contributions/orders").unwrap()),
        );
        let wrapper = Composite::wrap_include(&deployable);
        assert_eq!(wrapper.includes.len(), 1);
        assert_eq!(wrapper.includes[0].name, deployable.name);
        assert!(wrapper.components.is_empty());
        assert_eq!(wrapper.contribution_uri, deployable.contribution_uri);
    }
}
