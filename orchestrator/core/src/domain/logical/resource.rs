// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::artifact::{impl_logical_artifact, ArtifactCore};
use super::state::LogicalState;
use crate::domain::definition::ResourceDefinition;
use crate::domain::qname::QName;
use crate::domain::runtime::LOCAL_ZONE;
use std::sync::Arc;
use url::Url;

/// Shared resource (datasource, timer pool, ...) contributed by a composite
#[derive(Debug, Clone)]
pub struct LogicalResource {
    uri: Url,
    core: ArtifactCore,
    definition: Arc<ResourceDefinition>,
    zone: String,
    state: LogicalState,
    deployable: Option<QName>,
}

impl LogicalResource {
    pub fn new(uri: Url, definition: Arc<ResourceDefinition>, parent: &Url) -> Self {
        Self {
            uri,
            core: ArtifactCore::child_of(parent),
            definition,
            zone: LOCAL_ZONE.to_string(),
            state: LogicalState::New,
            deployable: None,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn definition(&self) -> &Arc<ResourceDefinition> {
        &self.definition
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn set_zone(&mut self, zone: impl Into<String>) {
        self.zone = zone.into();
    }

    pub fn state(&self) -> LogicalState {
        self.state
    }

    pub fn set_state(&mut self, state: LogicalState) {
        self.state = state;
    }

    pub fn deployable(&self) -> Option<&QName> {
        self.deployable.as_ref()
    }

    pub fn set_deployable(&mut self, deployable: QName) {
        self.deployable = Some(deployable);
    }
}

#[derive(Debug, Clone)]
pub struct LogicalProperty {
    name: String,
    core: ArtifactCore,
    value: serde_json::Value,
    many: bool,
}

impl LogicalProperty {
    pub fn new(name: impl Into<String>, value: serde_json::Value, many: bool, component: &Url) -> Self {
        Self {
            name: name.into(),
            core: ArtifactCore::child_of(component),
            value,
            many,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn is_many(&self) -> bool {
        self.many
    }
}

impl_logical_artifact!(LogicalResource, LogicalProperty);
