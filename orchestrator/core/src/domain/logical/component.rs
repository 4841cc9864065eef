// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::artifact::{impl_logical_artifact, ArtifactCore};
use super::composite::LogicalCompositeComponent;
use super::invocable::{
    LogicalConsumer, LogicalProducer, LogicalReference, LogicalResourceReference, LogicalService,
};
use super::member_name;
use super::resource::LogicalProperty;
use super::state::LogicalState;
use crate::domain::definition::ComponentDefinition;
use crate::domain::qname::QName;
use crate::domain::runtime::LOCAL_ZONE;
use indexmap::IndexMap;
use std::sync::Arc;
use url::Url;

/// A component instance in the domain.
///
/// Members are keyed by local name, which is also the fragment of their URI.
#[derive(Debug, Clone)]
pub struct LogicalComponent {
    uri: Url,
    core: ArtifactCore,
    definition: Arc<ComponentDefinition>,
    zone: String,
    deployable: Option<QName>,
    state: LogicalState,
    services: IndexMap<String, LogicalService>,
    references: IndexMap<String, LogicalReference>,
    producers: IndexMap<String, LogicalProducer>,
    consumers: IndexMap<String, LogicalConsumer>,
    resource_references: IndexMap<String, LogicalResourceReference>,
    properties: IndexMap<String, LogicalProperty>,
}

impl_logical_artifact!(LogicalComponent);

impl LogicalComponent {
    pub fn new(uri: Url, definition: Arc<ComponentDefinition>, parent: Option<&Url>) -> Self {
        Self {
            uri,
            core: ArtifactCore::new(parent.cloned()),
            definition,
            zone: LOCAL_ZONE.to_string(),
            deployable: None,
            state: LogicalState::New,
            services: IndexMap::new(),
            references: IndexMap::new(),
            producers: IndexMap::new(),
            consumers: IndexMap::new(),
            resource_references: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Arc<ComponentDefinition> {
        &self.definition
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn set_zone(&mut self, zone: impl Into<String>) {
        self.zone = zone.into();
    }

    pub fn deployable(&self) -> Option<&QName> {
        self.deployable.as_ref()
    }

    pub fn set_deployable(&mut self, deployable: QName) {
        self.deployable = Some(deployable);
    }

    pub fn state(&self) -> LogicalState {
        self.state
    }

    pub fn set_state(&mut self, state: LogicalState) {
        self.state = state;
    }

    pub fn services(&self) -> impl Iterator<Item = &LogicalService> {
        self.services.values()
    }

    pub fn services_mut(&mut self) -> impl Iterator<Item = &mut LogicalService> {
        self.services.values_mut()
    }

    pub fn service(&self, name: &str) -> Option<&LogicalService> {
        self.services.get(name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut LogicalService> {
        self.services.get_mut(name)
    }

    pub fn add_service(&mut self, service: LogicalService) {
        self.services.insert(service.name().to_string(), service);
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn references(&self) -> impl Iterator<Item = &LogicalReference> {
        self.references.values()
    }

    pub fn references_mut(&mut self) -> impl Iterator<Item = &mut LogicalReference> {
        self.references.values_mut()
    }

    pub fn reference(&self, name: &str) -> Option<&LogicalReference> {
        self.references.get(name)
    }

    pub fn reference_mut(&mut self, name: &str) -> Option<&mut LogicalReference> {
        self.references.get_mut(name)
    }

    pub fn add_reference(&mut self, reference: LogicalReference) {
        self.references.insert(reference.name().to_string(), reference);
    }

    pub fn producers(&self) -> impl Iterator<Item = &LogicalProducer> {
        self.producers.values()
    }

    pub fn add_producer(&mut self, producer: LogicalProducer) {
        self.producers.insert(member_name(producer.uri()), producer);
    }

    pub fn consumers(&self) -> impl Iterator<Item = &LogicalConsumer> {
        self.consumers.values()
    }

    pub fn add_consumer(&mut self, consumer: LogicalConsumer) {
        self.consumers.insert(member_name(consumer.uri()), consumer);
    }

    pub fn resource_references(&self) -> impl Iterator<Item = &LogicalResourceReference> {
        self.resource_references.values()
    }

    pub fn add_resource_reference(&mut self, resource_reference: LogicalResourceReference) {
        self.resource_references
            .insert(member_name(resource_reference.uri()), resource_reference);
    }

    pub fn properties(&self) -> impl Iterator<Item = &LogicalProperty> {
        self.properties.values()
    }

    pub fn property(&self, name: &str) -> Option<&LogicalProperty> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, property: LogicalProperty) {
        self.properties.insert(property.name().to_string(), property);
    }
}

/// A child of a composite: either an atomic component or a nested composite
#[derive(Debug, Clone)]
pub enum LogicalNode {
    Atomic(LogicalComponent),
    Composite(LogicalCompositeComponent),
}

impl LogicalNode {
    pub fn component(&self) -> &LogicalComponent {
        match self {
            LogicalNode::Atomic(component) => component,
            LogicalNode::Composite(composite) => composite.component(),
        }
    }

    pub fn component_mut(&mut self) -> &mut LogicalComponent {
        match self {
            LogicalNode::Atomic(component) => component,
            LogicalNode::Composite(composite) => composite.component_mut(),
        }
    }

    pub fn uri(&self) -> &Url {
        self.component().uri()
    }

    pub fn state(&self) -> LogicalState {
        self.component().state()
    }

    /// Composites propagate the state to their current children
    pub fn set_state(&mut self, state: LogicalState) {
        match self {
            LogicalNode::Atomic(component) => component.set_state(state),
            LogicalNode::Composite(composite) => composite.set_state(state),
        }
    }

    pub fn zone(&self) -> &str {
        self.component().zone()
    }

    pub fn deployable(&self) -> Option<&QName> {
        self.component().deployable()
    }

    pub fn as_composite(&self) -> Option<&LogicalCompositeComponent> {
        match self {
            LogicalNode::Composite(composite) => Some(composite),
            LogicalNode::Atomic(_) => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut LogicalCompositeComponent> {
        match self {
            LogicalNode::Composite(composite) => Some(composite),
            LogicalNode::Atomic(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, LogicalNode::Composite(_))
    }
}

impl From<LogicalComponent> for LogicalNode {
    fn from(component: LogicalComponent) -> Self {
        LogicalNode::Atomic(component)
    }
}

impl From<LogicalCompositeComponent> for LogicalNode {
    fn from(composite: LogicalCompositeComponent) -> Self {
        LogicalNode::Composite(composite)
    }
}
