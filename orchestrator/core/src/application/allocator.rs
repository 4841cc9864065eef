// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::allocation::{AllocationError, Allocator};
use crate::domain::logical::{LogicalChannel, LogicalCompositeComponent, LogicalNode, LogicalResource};
use crate::domain::plan::DeploymentPlan;
use crate::domain::qname::QName;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// Places NEW artifacts in the zone the plan maps their deployable to
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneAllocator;

impl ZoneAllocator {
    pub fn new() -> Self {
        Self
    }

    fn zone<'p>(
        uri: &Url,
        deployable: Option<&QName>,
        plan: &'p DeploymentPlan,
    ) -> Result<&'p str, AllocationError> {
        let zone = match deployable {
            Some(deployable) => plan.zone_for(deployable),
            None => plan.default_zone.as_deref(),
        };
        zone.ok_or_else(|| AllocationError::ZoneNotMapped {
            uri: uri.clone(),
            deployable: deployable.cloned(),
            plan: plan.name.clone(),
        })
    }

    fn allocate_node(&self, node: &mut LogicalNode, plan: &DeploymentPlan) -> Result<(), AllocationError> {
        if node.state().is_new() {
            let zone = Self::zone(node.uri(), node.deployable(), plan)?;
            debug!(component = %node.uri(), zone, "Allocating component");
            node.component_mut().set_zone(zone);
        }
        if let Some(composite) = node.as_composite_mut() {
            self.allocate_contents(composite, plan)?;
        }
        Ok(())
    }

    fn allocate_contents(
        &self,
        composite: &mut LogicalCompositeComponent,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError> {
        for child in composite.components_mut() {
            self.allocate_node(child, plan)?;
        }
        for channel in composite.channels_mut() {
            self.place_channel(channel, plan)?;
        }
        for resource in composite.resources_mut() {
            self.place_resource(resource, plan)?;
        }
        Ok(())
    }

    fn place_channel(&self, channel: &mut LogicalChannel, plan: &DeploymentPlan) -> Result<(), AllocationError> {
        if channel.state().is_new() {
            let zone = Self::zone(channel.uri(), channel.deployable(), plan)?;
            channel.set_zone(zone);
        }
        Ok(())
    }

    fn place_resource(&self, resource: &mut LogicalResource, plan: &DeploymentPlan) -> Result<(), AllocationError> {
        if resource.state().is_new() {
            let zone = Self::zone(resource.uri(), resource.deployable(), plan)?;
            resource.set_zone(zone);
        }
        Ok(())
    }
}

#[async_trait]
impl Allocator for ZoneAllocator {
    async fn allocate_component(
        &self,
        component: &mut LogicalNode,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError> {
        self.allocate_node(component, plan)
    }

    async fn allocate_channel(
        &self,
        channel: &mut LogicalChannel,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError> {
        self.place_channel(channel, plan)
    }

    async fn allocate_resource(
        &self,
        resource: &mut LogicalResource,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError> {
        self.place_resource(resource, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::{ComponentDefinition, ComponentType, Composite};
    use crate::domain::logical::{LogicalComponent, LogicalCompositeComponent, LogicalState};
    use std::sync::Arc;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn nested_node() -> LogicalNode {
        let definition = Arc::new(ComponentDefinition::composite(
            "B",
            Arc::new(Composite::new(QName::local("B"))),
        ));
        let domain = uri("fabric://domain");
        let mut composite = LogicalCompositeComponent::new(uri("fabric://domain/B"), definition, Some(&domain));
        composite.component_mut().set_deployable(QName::local("D1"));
        let leaf = Arc::new(ComponentDefinition::atomic("X", "rust", ComponentType::default()));
        let mut x = LogicalComponent::new(uri("fabric://domain/B/X"), leaf, Some(composite.uri()));
        x.set_deployable(QName::local("D1"));
        composite.add_component(x).unwrap();
        LogicalNode::Composite(composite)
    }

    #[tokio::test]
    async fn test_allocates_new_components_recursively() {
        let allocator = ZoneAllocator::new();
        let plan = DeploymentPlan::new("plan1").with_mapping(QName::local("D1"), "zone1");
        let mut node = nested_node();

        allocator.allocate_component(&mut node, &plan).await.unwrap();

        assert_eq!(node.zone(), "zone1");
        let composite = node.as_composite().unwrap();
        assert_eq!(composite.find_component(&uri("fabric://domain/B/X")).unwrap().zone(), "zone1");
    }

    #[tokio::test]
    async fn test_provisioned_components_keep_their_zone() {
        let allocator = ZoneAllocator::new();
        let mut node = nested_node();
        let first = DeploymentPlan::new("plan1").with_mapping(QName::local("D1"), "zone1");
        allocator.allocate_component(&mut node, &first).await.unwrap();
        node.set_state(LogicalState::Provisioned);

        let second = DeploymentPlan::new("plan2").with_mapping(QName::local("D1"), "zone2");
        allocator.allocate_component(&mut node, &second).await.unwrap();

        assert_eq!(node.zone(), "zone1");
        let composite = node.as_composite().unwrap();
        assert_eq!(composite.find_component(&uri("fabric://domain/B/X")).unwrap().zone(), "zone1");
    }

    #[tokio::test]
    async fn test_unmapped_deployable_fails() {
        let allocator = ZoneAllocator::new();
        let mut node = nested_node();
        let plan = DeploymentPlan::new("plan1");

        let err = allocator.allocate_component(&mut node, &plan).await.unwrap_err();
        assert!(matches!(err, AllocationError::ZoneNotMapped { plan, .. } if plan == "plan1"));
    }
}
