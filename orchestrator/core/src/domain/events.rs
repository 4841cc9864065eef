// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::qname::QName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Deployment lifecycle events published by the domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeploymentEvent {
    ContributionDeploymentStarted {
        contribution: Url,
        started_at: DateTime<Utc>,
    },
    ContributionDeploymentCompleted {
        contribution: Url,
        completed_at: DateTime<Utc>,
    },
    DeploymentStarted {
        deployable: QName,
        plan: String,
        started_at: DateTime<Utc>,
    },
    DeploymentCompleted {
        deployable: QName,
        plan: String,
        completed_at: DateTime<Utc>,
    },
    ContributionUndeploymentStarted {
        contribution: Url,
        started_at: DateTime<Utc>,
    },
    ContributionUndeploymentCompleted {
        contribution: Url,
        completed_at: DateTime<Utc>,
    },
    UndeploymentStarted {
        deployable: QName,
        started_at: DateTime<Utc>,
    },
    UndeploymentCompleted {
        deployable: QName,
        completed_at: DateTime<Utc>,
    },
    /// A deployer ran a package against its zones
    DeploymentExecuted {
        package_id: Uuid,
        zones: Vec<String>,
        command_count: usize,
        executed_at: DateTime<Utc>,
    },
}

impl DeploymentEvent {
    /// Deployable the event refers to, if any
    pub fn deployable(&self) -> Option<&QName> {
        match self {
            DeploymentEvent::DeploymentStarted { deployable, .. }
            | DeploymentEvent::DeploymentCompleted { deployable, .. }
            | DeploymentEvent::UndeploymentStarted { deployable, .. }
            | DeploymentEvent::UndeploymentCompleted { deployable, .. } => Some(deployable),
            DeploymentEvent::ContributionDeploymentStarted { .. }
            | DeploymentEvent::ContributionDeploymentCompleted { .. }
            | DeploymentEvent::ContributionUndeploymentStarted { .. }
            | DeploymentEvent::ContributionUndeploymentCompleted { .. }
            | DeploymentEvent::DeploymentExecuted { .. } => None,
        }
    }

    pub fn contribution(&self) -> Option<&Url> {
        match self {
            DeploymentEvent::ContributionDeploymentStarted { contribution, .. }
            | DeploymentEvent::ContributionDeploymentCompleted { contribution, .. }
            | DeploymentEvent::ContributionUndeploymentStarted { contribution, .. }
            | DeploymentEvent::ContributionUndeploymentCompleted { contribution, .. } => {
                Some(contribution)
            }
            _ => None,
        }
    }
}
