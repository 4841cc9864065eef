// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::deployment::{Deployer, DeployerError, DeploymentCommand, DeploymentPackage};
use crate::domain::events::DeploymentEvent;
use crate::domain::runtime::LOCAL_ZONE;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Executes deployment packages for the zones hosted by this runtime.
///
/// A package that targets any other zone is rejected before a single command
/// runs.
pub struct LocalDeployer {
    zones: BTreeSet<String>,
    event_bus: Option<EventBus>,
    executed: Mutex<Vec<Uuid>>,
}

impl LocalDeployer {
    pub fn new<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            zones: zones.into_iter().map(Into::into).collect(),
            event_bus: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Deployer hosting only the local zone
    pub fn local() -> Self {
        Self::new([LOCAL_ZONE])
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn hosts(&self, zone: &str) -> bool {
        self.zones.contains(zone)
    }

    /// Ids of the packages executed so far, oldest first
    pub fn executed_packages(&self) -> Vec<Uuid> {
        self.executed.lock().clone()
    }

    fn execute(&self, zone: &str, command: &DeploymentCommand) {
        match command {
            DeploymentCommand::BuildResource { uri }
            | DeploymentCommand::BuildChannel { uri }
            | DeploymentCommand::BuildComponent { uri }
            | DeploymentCommand::StartComponent { uri }
            | DeploymentCommand::StopComponent { uri }
            | DeploymentCommand::DisposeComponent { uri }
            | DeploymentCommand::DisposeChannel { uri }
            | DeploymentCommand::DisposeResource { uri } => {
                debug!(zone, phase = ?command.phase(), uri = %uri, "Executing command");
            }
            DeploymentCommand::AttachWire {
                source,
                target,
                source_binding,
                ..
            } => {
                debug!(
                    zone,
                    phase = ?command.phase(),
                    source = %source,
                    target = %target,
                    binding = ?source_binding,
                    "Executing command"
                );
            }
            DeploymentCommand::DetachWire { source, target } => {
                debug!(zone, phase = ?command.phase(), source = %source, target = %target, "Executing command");
            }
        }
    }
}

#[async_trait]
impl Deployer for LocalDeployer {
    async fn deploy(&self, package: &DeploymentPackage) -> Result<(), DeployerError> {
        let deployment = &package.current;
        if let Some(zone) = deployment.zones().find(|zone| !self.hosts(zone)) {
            return Err(DeployerError::ZoneUnavailable(zone.to_string()));
        }

        for zone in deployment.zones() {
            for command in deployment.commands_for(zone) {
                self.execute(zone, command);
            }
        }
        self.executed.lock().push(package.id);

        let zones: Vec<String> = deployment.zones().map(str::to_string).collect();
        info!(
            package = %package.id,
            zones = ?zones,
            commands = deployment.command_count(),
            "Deployment executed"
        );
        if let Some(bus) = &self.event_bus {
            bus.publish_deployment_event(DeploymentEvent::DeploymentExecuted {
                package_id: package.id,
                zones,
                command_count: deployment.command_count(),
                executed_at: Utc::now(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deployment::Deployment;
    use crate::infrastructure::event_bus::DomainEvent;
    use url::Url;

    fn package(zone: &str) -> DeploymentPackage {
        let mut deployment = Deployment::new();
        deployment.add_command(
            zone,
            DeploymentCommand::BuildComponent {
                uri: Url::parse("fabric://domain/A").unwrap(),
            },
        );
        DeploymentPackage::new(deployment, None)
    }

    #[tokio::test]
    async fn test_deploy_publishes_executed_event() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();
        let deployer = LocalDeployer::new(["zone1"]).with_event_bus(bus);

        let package = package("zone1");
        deployer.deploy(&package).await.unwrap();
        assert_eq!(deployer.executed_packages(), vec![package.id]);

        match receiver.recv().await.unwrap() {
            DomainEvent::Deployment(DeploymentEvent::DeploymentExecuted {
                package_id,
                command_count,
                ..
            }) => {
                assert_eq!(package_id, package.id);
                assert_eq!(command_count, 1);
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_foreign_zone_is_rejected() {
        let deployer = LocalDeployer::local();
        let result = deployer.deploy(&package("zone9")).await;
        assert_eq!(result, Err(DeployerError::ZoneUnavailable("zone9".to_string())));
        assert!(deployer.executed_packages().is_empty());
    }
}
