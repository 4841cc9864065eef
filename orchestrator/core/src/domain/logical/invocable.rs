// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Services, references, producers, consumers and resource references.

use super::artifact::{impl_logical_artifact, ArtifactCore};
use super::binding::{impl_has_bindings, Bindings};
use super::operation::{derive_operations, impl_has_operations, LogicalOperation};
use crate::domain::definition::{Autowire, Multiplicity, ServiceContract};
use url::Url;

#[derive(Debug, Clone)]
pub struct LogicalService {
    uri: Url,
    core: ArtifactCore,
    contract: ServiceContract,
    operations: Vec<LogicalOperation>,
    bindings: Bindings,
    leaf_component: Url,
    leaf_service: Url,
}

impl LogicalService {
    /// `uri` carries the service name as its fragment; `component` is the owner
    pub fn new(uri: Url, contract: ServiceContract, component: &Url) -> Self {
        let operations = derive_operations(&contract, &uri);
        Self {
            leaf_component: component.clone(),
            leaf_service: uri.clone(),
            core: ArtifactCore::child_of(component),
            uri,
            contract,
            operations,
            bindings: Bindings::default(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn name(&self) -> &str {
        self.uri.fragment().unwrap_or_default()
    }

    /// Atomic component that ultimately provides this service
    pub fn leaf_component(&self) -> &Url {
        &self.leaf_component
    }

    pub fn leaf_service(&self) -> &Url {
        &self.leaf_service
    }

    /// Point a promoted service at the service it ultimately resolves to
    pub fn set_leaf(&mut self, component: Url, service: Url) {
        self.leaf_component = component;
        self.leaf_service = service;
    }

    pub fn is_promoted(&self) -> bool {
        self.leaf_service != self.uri
    }
}

#[derive(Debug, Clone)]
pub struct LogicalReference {
    uri: Url,
    core: ArtifactCore,
    contract: ServiceContract,
    operations: Vec<LogicalOperation>,
    bindings: Bindings,
    multiplicity: Multiplicity,
    autowire: Autowire,
    resolved: bool,
    leaf_reference: Url,
}

impl LogicalReference {
    pub fn new(uri: Url, contract: ServiceContract, component: &Url) -> Self {
        let operations = derive_operations(&contract, &uri);
        Self {
            leaf_reference: uri.clone(),
            core: ArtifactCore::child_of(component),
            uri,
            contract,
            operations,
            bindings: Bindings::default(),
            multiplicity: Multiplicity::default(),
            autowire: Autowire::Inherited,
            resolved: false,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn name(&self) -> &str {
        self.uri.fragment().unwrap_or_default()
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn set_multiplicity(&mut self, multiplicity: Multiplicity) {
        self.multiplicity = multiplicity;
    }

    pub fn autowire(&self) -> Autowire {
        self.autowire
    }

    pub fn set_autowire(&mut self, autowire: Autowire) {
        self.autowire = autowire;
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn set_resolved(&mut self, resolved: bool) {
        self.resolved = resolved;
    }

    /// Non-composite reference this one resolves to through promotion
    pub fn leaf_reference(&self) -> &Url {
        &self.leaf_reference
    }

    pub fn set_leaf_reference(&mut self, leaf: Url) {
        self.leaf_reference = leaf;
    }
}

#[derive(Debug, Clone)]
pub struct LogicalProducer {
    uri: Url,
    core: ArtifactCore,
    contract: ServiceContract,
    operations: Vec<LogicalOperation>,
    targets: Vec<Url>,
}

impl LogicalProducer {
    pub fn new(uri: Url, contract: ServiceContract, component: &Url) -> Self {
        let operations = derive_operations(&contract, &uri);
        Self {
            core: ArtifactCore::child_of(component),
            uri,
            contract,
            operations,
            targets: Vec::new(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Channels this producer publishes to
    pub fn targets(&self) -> &[Url] {
        &self.targets
    }

    pub fn add_target(&mut self, channel: Url) {
        self.targets.push(channel);
    }
}

#[derive(Debug, Clone)]
pub struct LogicalConsumer {
    uri: Url,
    core: ArtifactCore,
    contract: ServiceContract,
    operations: Vec<LogicalOperation>,
    sources: Vec<Url>,
}

impl LogicalConsumer {
    pub fn new(uri: Url, contract: ServiceContract, component: &Url) -> Self {
        let operations = derive_operations(&contract, &uri);
        Self {
            core: ArtifactCore::child_of(component),
            uri,
            contract,
            operations,
            sources: Vec::new(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Channels this consumer subscribes to
    pub fn sources(&self) -> &[Url] {
        &self.sources
    }

    pub fn add_source(&mut self, channel: Url) {
        self.sources.push(channel);
    }
}

#[derive(Debug, Clone)]
pub struct LogicalResourceReference {
    uri: Url,
    core: ArtifactCore,
    contract: ServiceContract,
    optional: bool,
    target: Option<Url>,
}

impl LogicalResourceReference {
    pub fn new(uri: Url, contract: ServiceContract, optional: bool, component: &Url) -> Self {
        Self {
            core: ArtifactCore::child_of(component),
            uri,
            contract,
            optional,
            target: None,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn contract(&self) -> &ServiceContract {
        &self.contract
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Url) {
        self.target = Some(target);
    }
}

impl_logical_artifact!(
    LogicalService,
    LogicalReference,
    LogicalProducer,
    LogicalConsumer,
    LogicalResourceReference,
);
impl_has_bindings!(LogicalService, LogicalReference);
impl_has_operations!(LogicalService, LogicalReference, LogicalProducer, LogicalConsumer);
