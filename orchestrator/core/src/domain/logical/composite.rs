// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::channel::LogicalChannel;
use super::component::{LogicalComponent, LogicalNode};
use super::invocable::{LogicalReference, LogicalService};
use super::resource::LogicalResource;
use super::state::LogicalState;
use super::wire::LogicalWire;
use super::{component_uri_of, LogicalModelError};
use crate::domain::definition::{Autowire, ComponentDefinition, Implementation};
use crate::domain::qname::QName;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// A composite component: the exclusive owner of its child components,
/// channels, resources and the wires declared in its scope.
#[derive(Debug, Clone)]
pub struct LogicalCompositeComponent {
    component: LogicalComponent,
    autowire: Autowire,
    components: IndexMap<Url, LogicalNode>,
    channels: IndexMap<Url, LogicalChannel>,
    resources: Vec<LogicalResource>,
    wires: IndexMap<Url, Vec<LogicalWire>>,
}

impl LogicalCompositeComponent {
    pub fn new(uri: Url, definition: Arc<ComponentDefinition>, parent: Option<&Url>) -> Self {
        let autowire = match &definition.implementation {
            Implementation::Composite(composite) => composite.autowire,
            Implementation::Atomic { .. } => Autowire::Inherited,
        };
        Self {
            component: LogicalComponent::new(uri, definition, parent),
            autowire,
            components: IndexMap::new(),
            channels: IndexMap::new(),
            resources: Vec::new(),
            wires: IndexMap::new(),
        }
    }

    pub fn component(&self) -> &LogicalComponent {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut LogicalComponent {
        &mut self.component
    }

    pub fn uri(&self) -> &Url {
        self.component.uri()
    }

    pub fn state(&self) -> LogicalState {
        self.component.state()
    }

    /// Sets the state on this composite and every child it currently holds.
    /// Children added afterwards keep their own state.
    pub fn set_state(&mut self, state: LogicalState) {
        self.component.set_state(state);
        for child in self.components.values_mut() {
            child.set_state(state);
        }
    }

    pub fn zone(&self) -> &str {
        self.component.zone()
    }

    pub fn deployable(&self) -> Option<&QName> {
        self.component.deployable()
    }

    pub fn autowire(&self) -> Autowire {
        self.autowire
    }

    pub fn set_autowire(&mut self, autowire: Autowire) {
        self.autowire = autowire;
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    pub fn components(&self) -> impl Iterator<Item = &LogicalNode> {
        self.components.values()
    }

    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut LogicalNode> {
        self.components.values_mut()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn child(&self, uri: &Url) -> Option<&LogicalNode> {
        self.components.get(uri)
    }

    pub fn child_mut(&mut self, uri: &Url) -> Option<&mut LogicalNode> {
        self.components.get_mut(uri)
    }

    pub fn add_component(&mut self, node: impl Into<LogicalNode>) -> Result<(), LogicalModelError> {
        let node = node.into();
        if self.components.contains_key(node.uri()) {
            return Err(LogicalModelError::DuplicateComponent(node.uri().clone()));
        }
        self.components.insert(node.uri().clone(), node);
        Ok(())
    }

    pub fn remove_component(&mut self, uri: &Url) -> Option<LogicalNode> {
        self.components.shift_remove(uri)
    }

    pub fn retain_components(&mut self, keep: impl FnMut(&Url, &mut LogicalNode) -> bool) {
        self.components.retain(keep);
    }

    // ------------------------------------------------------------------
    // Channels and resources
    // ------------------------------------------------------------------

    pub fn channels(&self) -> impl Iterator<Item = &LogicalChannel> {
        self.channels.values()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut LogicalChannel> {
        self.channels.values_mut()
    }

    pub fn channel(&self, uri: &Url) -> Option<&LogicalChannel> {
        self.channels.get(uri)
    }

    pub fn add_channel(&mut self, channel: LogicalChannel) -> Result<(), LogicalModelError> {
        if self.channels.contains_key(channel.uri()) {
            return Err(LogicalModelError::DuplicateChannel(channel.uri().clone()));
        }
        self.channels.insert(channel.uri().clone(), channel);
        Ok(())
    }

    pub fn retain_channels(&mut self, keep: impl FnMut(&Url, &mut LogicalChannel) -> bool) {
        self.channels.retain(keep);
    }

    pub fn resources(&self) -> &[LogicalResource] {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> impl Iterator<Item = &mut LogicalResource> {
        self.resources.iter_mut()
    }

    pub fn add_resource(&mut self, resource: LogicalResource) {
        self.resources.push(resource);
    }

    pub fn retain_resources(&mut self, keep: impl FnMut(&LogicalResource) -> bool) {
        self.resources.retain(keep);
    }

    // ------------------------------------------------------------------
    // Wires, keyed by source reference URI
    // ------------------------------------------------------------------

    pub fn wires(&self, reference: &Url) -> &[LogicalWire] {
        self.wires.get(reference).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every wire declared in this composite's own scope
    pub fn all_wires(&self) -> impl Iterator<Item = &LogicalWire> {
        self.wires.values().flatten()
    }

    pub fn all_wires_mut(&mut self) -> impl Iterator<Item = &mut LogicalWire> {
        self.wires.values_mut().flatten()
    }

    /// Returns `false` when an equal wire is already held for the reference
    pub fn add_wire(&mut self, reference: &Url, wire: LogicalWire) -> bool {
        let wires = self.wires.entry(reference.clone()).or_default();
        if wires.contains(&wire) {
            return false;
        }
        wires.push(wire);
        true
    }

    pub fn add_wires(&mut self, reference: &Url, wires: impl IntoIterator<Item = LogicalWire>) {
        for wire in wires {
            self.add_wire(reference, wire);
        }
    }

    /// Replace the reference's wires, dropping duplicates from the input
    pub fn override_wires(&mut self, reference: &Url, wires: impl IntoIterator<Item = LogicalWire>) {
        let mut unique: Vec<LogicalWire> = Vec::new();
        for wire in wires {
            if !unique.contains(&wire) {
                unique.push(wire);
            }
        }
        self.wires.insert(reference.clone(), unique);
    }

    pub fn remove_wires(&mut self, reference: &Url) -> Vec<LogicalWire> {
        self.wires.shift_remove(reference).unwrap_or_default()
    }

    /// Keeps wires for which `keep` holds; references left without wires
    /// are dropped from the mapping
    pub fn retain_wires(&mut self, mut keep: impl FnMut(&LogicalWire) -> bool) {
        for wires in self.wires.values_mut() {
            wires.retain(&mut keep);
        }
        self.wires.retain(|_, wires| !wires.is_empty());
    }

    pub fn wired_references(&self) -> impl Iterator<Item = &Url> {
        self.wires.keys()
    }

    // ------------------------------------------------------------------
    // Hierarchical lookup
    // ------------------------------------------------------------------

    /// Chain of ancestor URIs from this composite's direct child down to `uri`
    fn descent_path(&self, uri: &Url) -> Option<Vec<Url>> {
        let target = component_uri_of(uri);
        let rest = target
            .as_str()
            .strip_prefix(self.uri().as_str())?
            .strip_prefix('/')?;
        let mut current = self.uri().as_str().trim_end_matches('/').to_string();
        let mut path = Vec::new();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            current = format!("{}/{}", current, segment);
            path.push(Url::parse(&current).ok()?);
        }
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Resolve a component URI one path segment at a time from this composite
    pub fn find_component(&self, uri: &Url) -> Option<&LogicalNode> {
        let path = self.descent_path(uri)?;
        let (last, ancestors) = path.split_last()?;
        let mut scope = self;
        for key in ancestors {
            scope = scope.components.get(key)?.as_composite()?;
        }
        scope.components.get(last)
    }

    pub fn find_component_mut(&mut self, uri: &Url) -> Option<&mut LogicalNode> {
        let path = self.descent_path(uri)?;
        let (last, ancestors) = path.split_last()?;
        let mut scope = self;
        for key in ancestors {
            scope = scope.components.get_mut(key)?.as_composite_mut()?;
        }
        scope.components.get_mut(last)
    }

    /// Find a service by `component#service` URI; the domain's own services included
    pub fn find_service(&self, uri: &Url) -> Option<&LogicalService> {
        let name = uri.fragment()?;
        if component_uri_of(uri) == *self.uri() {
            return self.component.service(name);
        }
        self.find_component(uri)?.component().service(name)
    }

    pub fn find_service_mut(&mut self, uri: &Url) -> Option<&mut LogicalService> {
        let name = uri.fragment()?.to_string();
        if component_uri_of(uri) == *self.uri() {
            return self.component.service_mut(&name);
        }
        self.find_component_mut(uri)?.component_mut().service_mut(&name)
    }

    pub fn find_reference(&self, uri: &Url) -> Option<&LogicalReference> {
        let name = uri.fragment()?;
        if component_uri_of(uri) == *self.uri() {
            return self.component.reference(name);
        }
        self.find_component(uri)?.component().reference(name)
    }

    pub fn find_reference_mut(&mut self, uri: &Url) -> Option<&mut LogicalReference> {
        let name = uri.fragment()?.to_string();
        if component_uri_of(uri) == *self.uri() {
            return self.component.reference_mut(&name);
        }
        self.find_component_mut(uri)?.component_mut().reference_mut(&name)
    }

    /// URIs of every component below this composite
    pub fn component_uris(&self) -> BTreeSet<Url> {
        let mut uris = BTreeSet::new();
        self.collect_uris(&mut uris);
        uris
    }

    fn collect_uris(&self, uris: &mut BTreeSet<Url>) {
        for child in self.components.values() {
            uris.insert(child.uri().clone());
            if let Some(composite) = child.as_composite() {
                composite.collect_uris(uris);
            }
        }
    }

    /// Depth-first visit of every component below this composite
    pub fn visit_components(&self, visitor: &mut impl FnMut(&LogicalNode)) {
        for child in self.components.values() {
            visitor(child);
            if let Some(composite) = child.as_composite() {
                composite.visit_components(visitor);
            }
        }
    }

    /// Depth-first visit of this composite and every nested composite
    pub fn visit_composites(&self, visitor: &mut impl FnMut(&LogicalCompositeComponent)) {
        visitor(self);
        for child in self.components.values() {
            if let Some(composite) = child.as_composite() {
                composite.visit_composites(visitor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::{Composite, ComponentType};

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn atomic(uri_str: &str, parent: &Url) -> LogicalComponent {
        let definition = Arc::new(ComponentDefinition::atomic("leaf", "rust", ComponentType::default()));
        LogicalComponent::new(uri(uri_str), definition, Some(parent))
    }

    fn composite(uri_str: &str, parent: Option<&Url>) -> LogicalCompositeComponent {
        let definition = Arc::new(ComponentDefinition::composite(
            "composite",
            Arc::new(Composite::new(QName::local("composite"))),
        ));
        LogicalCompositeComponent::new(uri(uri_str), definition, parent)
    }

    #[test]
    fn test_set_state_propagates_to_current_children_only() {
        let mut domain = composite("fabric://domain", None);
        let mut nested = composite("fabric://domain/B", Some(domain.uri()));
        nested.add_component(atomic("fabric://domain/B/X", &uri("fabric://domain/B"))).unwrap();
        domain.add_component(atomic("fabric://domain/A", &uri("fabric://domain"))).unwrap();
        domain.add_component(nested).unwrap();

        domain.set_state(LogicalState::Provisioned);
        domain.add_component(atomic("fabric://domain/Late", &uri("fabric://domain"))).unwrap();

        let state_of = |u: &str| domain.find_component(&uri(u)).unwrap().state();
        assert_eq!(state_of("fabric://domain/A"), LogicalState::Provisioned);
        assert_eq!(state_of("fabric://domain/B"), LogicalState::Provisioned);
        assert_eq!(state_of("fabric://domain/B/X"), LogicalState::Provisioned);
        assert_eq!(state_of("fabric://domain/Late"), LogicalState::New);
    }

    #[test]
    fn test_find_component_descends_by_segment() {
        let mut domain = composite("fabric://domain", None);
        let mut nested = composite("fabric://domain/B", Some(domain.uri()));
        nested.add_component(atomic("fabric://domain/B/X", &uri("fabric://domain/B"))).unwrap();
        domain.add_component(nested).unwrap();

        assert!(domain.find_component(&uri("fabric://domain/B/X")).is_some());
        assert!(domain.find_component(&uri("fabric://domain/B/X#service")).is_some());
        assert!(domain.find_component(&uri("fabric://domain/B/Y")).is_none());
        assert!(domain.find_component(&uri("fabric://domain/Z/X")).is_none());
        assert!(domain.find_component(&uri("fabric://domain")).is_none());
        assert!(domain.find_component(&uri("fabric://other/B")).is_none());
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut domain = composite("fabric://domain", None);
        domain.add_component(atomic("fabric://domain/A", &uri("fabric://domain"))).unwrap();
        let err = domain
            .add_component(atomic("fabric://domain/A", &uri("fabric://domain")))
            .unwrap_err();
        assert_eq!(err, LogicalModelError::DuplicateComponent(uri("fabric://domain/A")));
        assert_eq!(domain.component_count(), 1);
    }

    #[test]
    fn test_wires_deduplicate_by_endpoints() {
        let mut domain = composite("fabric://domain", None);
        let reference = uri("fabric://domain/A#orders");
        let target = uri("fabric://domain/B#Orders");
        let first = LogicalWire::new(domain.uri(), reference.clone(), target.clone(), QName::local("C"));
        let again = LogicalWire::new(domain.uri(), reference.clone(), target.clone(), QName::local("D"));
        let other = LogicalWire::new(domain.uri(), reference.clone(), uri("fabric://domain/E#Orders"), QName::local("C"));

        assert!(domain.add_wire(&reference, first));
        assert!(!domain.add_wire(&reference, again.clone()));
        domain.add_wires(&reference, vec![again.clone(), other.clone()]);
        assert_eq!(domain.wires(&reference).len(), 2);

        domain.override_wires(&reference, vec![other.clone(), other, again]);
        let wires = domain.wires(&reference);
        assert_eq!(wires.len(), 2);
        assert_eq!(wires[0].target(), &uri("fabric://domain/E#Orders"));
        assert_eq!(wires[1].deployable(), &QName::local("D"));
    }
}
