// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Compiles the logical tree into zone-grouped deployment commands.
//!
//! An incremental deployment covers the difference the pending operation
//! introduces: NEW artifacts are built, attached and started; MARKED ones are
//! stopped, detached and disposed. A full deployment rebuilds every artifact
//! that is not MARKED. Commands are ordered by phase within each zone.

use crate::domain::deployment::{Deployment, DeploymentCommand, GenerationError, Generator};
use crate::domain::logical::{
    component_uri_of, LogicalCompositeComponent, LogicalNode, LogicalState, LogicalWire,
};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGenerator;

/// What a generation pass does with an artifact in a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Build,
    Dispose,
    Keep,
}

impl StandardGenerator {
    pub fn new() -> Self {
        Self
    }

    fn change(state: LogicalState, incremental: bool) -> Change {
        match (state, incremental) {
            (LogicalState::Marked, true) => Change::Dispose,
            (LogicalState::Marked, false) => Change::Keep,
            (LogicalState::New, _) => Change::Build,
            (LogicalState::Provisioned, true) => Change::Keep,
            (LogicalState::Provisioned, false) => Change::Build,
        }
    }

    fn generate_scope(
        &self,
        root: &LogicalCompositeComponent,
        scope: &LogicalCompositeComponent,
        incremental: bool,
        deployment: &mut Deployment,
    ) -> Result<(), GenerationError> {
        for resource in scope.resources() {
            let uri = resource.uri().clone();
            match Self::change(resource.state(), incremental) {
                Change::Build => deployment.add_command(resource.zone(), DeploymentCommand::BuildResource { uri }),
                Change::Dispose => deployment.add_command(resource.zone(), DeploymentCommand::DisposeResource { uri }),
                Change::Keep => {}
            }
        }

        for channel in scope.channels() {
            let uri = channel.uri().clone();
            match Self::change(channel.state(), incremental) {
                Change::Build => deployment.add_command(channel.zone(), DeploymentCommand::BuildChannel { uri }),
                Change::Dispose => deployment.add_command(channel.zone(), DeploymentCommand::DisposeChannel { uri }),
                Change::Keep => {}
            }
        }

        for node in scope.components() {
            match node {
                LogicalNode::Atomic(component) => {
                    let zone = component.zone();
                    let uri = component.uri().clone();
                    match Self::change(component.state(), incremental) {
                        Change::Build => {
                            deployment.add_command(zone, DeploymentCommand::BuildComponent { uri: uri.clone() });
                            deployment.add_command(zone, DeploymentCommand::StartComponent { uri });
                        }
                        Change::Dispose => {
                            deployment.add_command(zone, DeploymentCommand::StopComponent { uri: uri.clone() });
                            deployment.add_command(zone, DeploymentCommand::DisposeComponent { uri });
                        }
                        Change::Keep => {}
                    }
                }
                // Composites are logical only: their contents are what runs
                LogicalNode::Composite(composite) => {
                    self.generate_scope(root, composite, incremental, deployment)?;
                }
            }
        }

        for wire in scope.all_wires() {
            self.generate_wire(root, wire, incremental, deployment)?;
        }
        Ok(())
    }

    fn generate_wire(
        &self,
        root: &LogicalCompositeComponent,
        wire: &LogicalWire,
        incremental: bool,
        deployment: &mut Deployment,
    ) -> Result<(), GenerationError> {
        let source = root
            .find_reference(wire.source())
            .ok_or_else(|| GenerationError::SourceNotFound(wire.source().clone()))?;
        let target = root
            .find_service(wire.target())
            .ok_or_else(|| GenerationError::TargetNotFound(wire.target().clone()))?;
        let source_uri = source.leaf_reference().clone();
        let target_uri = target.leaf_service().clone();

        let source_component = component_state(root, &source_uri);
        let target_component = component_state(root, target.leaf_component());
        let zone = source_component
            .map(|(_, zone)| zone)
            .unwrap_or(crate::domain::runtime::LOCAL_ZONE)
            .to_string();

        // A wire goes with either of its endpoints
        let endpoint_marked = [source_component, target_component]
            .iter()
            .flatten()
            .any(|(state, _)| state.is_marked());
        let endpoint_new = [source_component, target_component]
            .iter()
            .flatten()
            .any(|(state, _)| state.is_new());

        let change = match Self::change(wire.state(), incremental) {
            Change::Keep if incremental && endpoint_marked => Change::Dispose,
            Change::Keep if incremental && endpoint_new => Change::Build,
            Change::Build if endpoint_marked => Change::Keep,
            other => other,
        };
        match change {
            Change::Build => deployment.add_command(
                zone,
                DeploymentCommand::AttachWire {
                    source: source_uri,
                    target: target_uri,
                    source_binding: wire.source_binding().map(|b| b.definition().binding_type.clone()),
                    target_binding: wire.target_binding().map(|b| b.definition().binding_type.clone()),
                },
            ),
            Change::Dispose => deployment.add_command(
                zone,
                DeploymentCommand::DetachWire {
                    source: source_uri,
                    target: target_uri,
                },
            ),
            Change::Keep => {}
        }
        Ok(())
    }
}

/// State and zone of the component owning `member`
fn component_state<'a>(root: &'a LogicalCompositeComponent, member: &Url) -> Option<(LogicalState, &'a str)> {
    root.find_component(&component_uri_of(member))
        .map(|node| (node.state(), node.zone()))
}

#[async_trait]
impl Generator for StandardGenerator {
    async fn generate(
        &self,
        domain: &LogicalCompositeComponent,
        incremental: bool,
    ) -> Result<Deployment, GenerationError> {
        let mut deployment = Deployment::new();
        self.generate_scope(domain, domain, incremental, &mut deployment)?;
        deployment.sort_by_phase();
        debug!(
            incremental,
            commands = deployment.command_count(),
            zones = deployment.zones().count(),
            "Generated deployment"
        );
        Ok(deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::{ComponentDefinition, ComponentType, Composite, ServiceContract};
    use crate::domain::deployment::CommandPhase;
    use crate::domain::logical::{LogicalComponent, LogicalReference, LogicalService};
    use crate::domain::qname::QName;
    use std::sync::Arc;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn component(name: &str, zone: &str, domain: &Url) -> LogicalComponent {
        let definition = Arc::new(ComponentDefinition::atomic(name, "rust", ComponentType::default()));
        let component_uri = uri(&format!("{}/{}", domain, name));
        let mut component = LogicalComponent::new(component_uri.clone(), definition, Some(domain));
        component.set_zone(zone);
        component.set_deployable(QName::local("App"));
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
        let domain_uri = domain.uri().clone();
        domain.add_component(component("A", "zone1", &domain_uri)).unwrap();
        domain.add_component(component("B", "zone2", &domain_uri)).unwrap();
        let reference = uri("fabric://domain/B#dep");
        domain.add_wire(
            &reference,
            LogicalWire::new(&domain_uri, reference.clone(), uri("fabric://domain/A#Svc"), QName::local("App")),
        );
        domain
    }

    #[tokio::test]
    async fn test_incremental_builds_new_artifacts_per_zone() {
        let deployment = StandardGenerator::new().generate(&domain(), true).await.unwrap();

        assert_eq!(deployment.zones().collect::<Vec<_>>(), vec!["zone1", "zone2"]);
        assert_eq!(
            deployment.commands_for("zone1"),
            &[
                DeploymentCommand::BuildComponent { uri: uri("fabric://domain/A") },
                DeploymentCommand::StartComponent { uri: uri("fabric://domain/A") },
            ]
        );
        // The wire is attached in the zone of its source, after the build
        let zone2 = deployment.commands_for("zone2");
        let phases: Vec<CommandPhase> = zone2.iter().map(DeploymentCommand::phase).collect();
        assert_eq!(
            phases,
            vec![CommandPhase::BuildComponents, CommandPhase::AttachWires, CommandPhase::StartComponents]
        );
    }

    #[tokio::test]
    async fn test_provisioned_tree_yields_empty_incremental_and_complete_full() {
        let mut domain = domain();
        domain.set_state(LogicalState::Provisioned);
        for wire in domain.all_wires_mut() {
            wire.set_state(LogicalState::Provisioned);
        }

        let generator = StandardGenerator::new();
        assert!(generator.generate(&domain, true).await.unwrap().is_empty());
        assert_eq!(generator.generate(&domain, false).await.unwrap().command_count(), 5);
    }

    #[tokio::test]
    async fn test_marked_component_is_disposed_with_its_wires() {
        let mut domain = domain();
        domain.set_state(LogicalState::Provisioned);
        for wire in domain.all_wires_mut() {
            wire.set_state(LogicalState::Provisioned);
        }
        domain
            .find_component_mut(&uri("fabric://domain/A"))
            .unwrap()
            .set_state(LogicalState::Marked);

        let deployment = StandardGenerator::new().generate(&domain, true).await.unwrap();
        assert_eq!(
            deployment.commands_for("zone1"),
            &[
                DeploymentCommand::StopComponent { uri: uri("fabric://domain/A") },
                DeploymentCommand::DisposeComponent { uri: uri("fabric://domain/A") },
            ]
        );
        assert_eq!(
            deployment.commands_for("zone2"),
            &[DeploymentCommand::DetachWire {
                source: uri("fabric://domain/B#dep"),
                target: uri("fabric://domain/A#Svc"),
            }]
        );
    }

    #[tokio::test]
    async fn test_dangling_wire_is_an_error() {
        let mut domain = domain();
        let reference = uri("fabric://domain/B#dep");
        domain.add_wire(
            &reference,
            LogicalWire::new(domain.uri(), reference.clone(), uri("fabric://domain/C#Svc"), QName::local("App")),
        );
        let result = StandardGenerator::new().generate(&domain, true).await;
        assert_eq!(result, Err(GenerationError::TargetNotFound(uri("fabric://domain/C#Svc"))));
    }

    #[tokio::test]
    async fn test_attach_carries_wire_binding_types() {
        use crate::domain::definition::BindingDefinition;
        use crate::domain::logical::LogicalBinding;

        let mut domain = domain();
        let fabric = Arc::new(BindingDefinition::new("fabric", QName::local("binding.fabric")));
        let source = uri("fabric://domain/B#dep");
        let target = uri("fabric://domain/A#Svc");
        for wire in domain.all_wires_mut() {
            wire.set_bindings(
                LogicalBinding::assigned(fabric.clone(), &source, QName::local("App")),
                LogicalBinding::assigned(fabric.clone(), &target, QName::local("App")),
            );
        }

        let deployment = StandardGenerator::new().generate(&domain, true).await.unwrap();
        let attach = deployment
            .commands_for("zone2")
            .iter()
            .find(|command| command.phase() == CommandPhase::AttachWires)
            .cloned();
        assert_eq!(
            attach,
            Some(DeploymentCommand::AttachWire {
                source,
                target,
                source_binding: Some(QName::local("binding.fabric")),
                target_binding: Some(QName::local("binding.fabric")),
            })
        );
    }
}
