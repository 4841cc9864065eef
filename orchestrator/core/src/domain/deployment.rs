// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Physical Deployments
//!
//! The generator compiles the logical tree into a [`Deployment`]: per-zone
//! command lists ordered by [`CommandPhase`]. The deployer executes a
//! [`DeploymentPackage`] holding the incremental deployment and, for
//! distributed controllers, a full snapshot of the domain.

use crate::domain::logical::LogicalCompositeComponent;
use crate::domain::qname::QName;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Execution order of commands inside one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    StopComponents,
    DetachWires,
    DisposeComponents,
    DisposeChannels,
    DisposeResources,
    BuildResources,
    BuildChannels,
    BuildComponents,
    AttachWires,
    StartComponents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeploymentCommand {
    BuildResource { uri: Url },
    BuildChannel { uri: Url },
    BuildComponent { uri: Url },
    /// Binding types are set when the wire crosses zones
    AttachWire {
        source: Url,
        target: Url,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_binding: Option<QName>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_binding: Option<QName>,
    },
    StartComponent { uri: Url },
    StopComponent { uri: Url },
    DetachWire { source: Url, target: Url },
    DisposeComponent { uri: Url },
    DisposeChannel { uri: Url },
    DisposeResource { uri: Url },
}

impl DeploymentCommand {
    pub fn phase(&self) -> CommandPhase {
        match self {
            DeploymentCommand::BuildResource { .. } => CommandPhase::BuildResources,
            DeploymentCommand::BuildChannel { .. } => CommandPhase::BuildChannels,
            DeploymentCommand::BuildComponent { .. } => CommandPhase::BuildComponents,
            DeploymentCommand::AttachWire { .. } => CommandPhase::AttachWires,
            DeploymentCommand::StartComponent { .. } => CommandPhase::StartComponents,
            DeploymentCommand::StopComponent { .. } => CommandPhase::StopComponents,
            DeploymentCommand::DetachWire { .. } => CommandPhase::DetachWires,
            DeploymentCommand::DisposeComponent { .. } => CommandPhase::DisposeComponents,
            DeploymentCommand::DisposeChannel { .. } => CommandPhase::DisposeChannels,
            DeploymentCommand::DisposeResource { .. } => CommandPhase::DisposeResources,
        }
    }
}

/// Commands grouped by target zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    commands: IndexMap<String, Vec<DeploymentCommand>>,
}

impl Deployment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, zone: impl Into<String>, command: DeploymentCommand) {
        self.commands.entry(zone.into()).or_default().push(command);
    }

    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn commands_for(&self, zone: &str) -> &[DeploymentCommand] {
        self.commands.get(zone).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn command_count(&self) -> usize {
        self.commands.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.command_count() == 0
    }

    /// Stable sort of every zone's commands by phase
    pub fn sort_by_phase(&mut self) {
        for commands in self.commands.values_mut() {
            commands.sort_by_key(DeploymentCommand::phase);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPackage {
    pub id: Uuid,
    /// Incremental changes to apply
    pub current: Deployment,
    /// Complete domain snapshot, produced by distributed controllers
    pub full: Option<Deployment>,
}

impl DeploymentPackage {
    pub fn new(current: Deployment, full: Option<Deployment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            current,
            full,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Wire source reference not found: {0}")]
    SourceNotFound(Url),

    #[error("Wire target service not found: {0}")]
    TargetNotFound(Url),

    #[error("Generation failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeployerError {
    #[error("Zone {0} is not reachable from this runtime")]
    ZoneUnavailable(String),

    #[error("Deployment {package} failed: {reason}")]
    Failed { package: Uuid, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingSelectionError {
    #[error("No binding available for wire {source_uri} -> {target_uri}")]
    NoBindingAvailable { source_uri: Url, target_uri: Url },

    #[error("Binding selection failed: {0}")]
    Failed(String),
}

/// Compiles the logical tree into a physical deployment
#[async_trait]
pub trait Generator: Send + Sync {
    /// With `incremental`, only NEW and MARKED artifacts produce commands
    async fn generate(
        &self,
        domain: &LogicalCompositeComponent,
        incremental: bool,
    ) -> Result<Deployment, GenerationError>;
}

/// Executes physical deployments against running zones
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, package: &DeploymentPackage) -> Result<(), DeployerError>;
}

/// Picks transport bindings for wires crossing zone boundaries
#[async_trait]
pub trait BindingSelector: Send + Sync {
    async fn select_bindings(
        &self,
        domain: &mut LogicalCompositeComponent,
    ) -> Result<(), BindingSelectionError>;
}
