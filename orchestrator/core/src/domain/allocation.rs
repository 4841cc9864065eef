// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::logical::{LogicalChannel, LogicalNode, LogicalResource};
use crate::domain::plan::DeploymentPlan;
use crate::domain::qname::QName;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Plan {plan} maps no zone for {uri} (deployable {deployable:?})")]
    ZoneNotMapped {
        uri: Url,
        deployable: Option<QName>,
        plan: String,
    },

    #[error("Allocation failed for {uri}: {reason}")]
    Failed { uri: Url, reason: String },
}

/// Assigns NEW artifacts to execution zones.
///
/// Artifacts that are already provisioned keep their zone. Composites are
/// allocated together with everything they contain.
#[async_trait]
pub trait Allocator: Send + Sync {
    async fn allocate_component(
        &self,
        component: &mut LogicalNode,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError>;

    async fn allocate_channel(
        &self,
        channel: &mut LogicalChannel,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError>;

    async fn allocate_resource(
        &self,
        resource: &mut LogicalResource,
        plan: &DeploymentPlan,
    ) -> Result<(), AllocationError>;
}
