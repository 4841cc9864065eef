// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::qname::QName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A deployed composite and the plan it was deployed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub deployable: QName,
    pub plan: String,
}

/// Persisted record of domain activity, replayed by recovery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainJournal {
    /// Contributions whose definitions were activated
    #[serde(default)]
    pub contributions: Vec<Url>,
    /// Deployables in deployment order
    #[serde(default)]
    pub deployables: Vec<JournalEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_at: Option<DateTime<Utc>>,
}

impl DomainJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contribution(mut self, uri: Url) -> Self {
        self.record_contribution(uri);
        self
    }

    pub fn with_deployable(mut self, deployable: QName, plan: impl Into<String>) -> Self {
        self.record_deployable(deployable, plan.into());
        self
    }

    pub fn record_contribution(&mut self, uri: Url) {
        if !self.contributions.contains(&uri) {
            self.contributions.push(uri);
        }
    }

    pub fn remove_contribution(&mut self, uri: &Url) {
        self.contributions.retain(|c| c != uri);
    }

    /// Re-recording a deployable replaces its plan
    pub fn record_deployable(&mut self, deployable: QName, plan: String) {
        match self.deployables.iter_mut().find(|e| e.deployable == deployable) {
            Some(entry) => entry.plan = plan,
            None => self.deployables.push(JournalEntry { deployable, plan }),
        }
    }

    pub fn remove_deployable(&mut self, deployable: &QName) {
        self.deployables.retain(|e| &e.deployable != deployable);
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty() && self.deployables.is_empty()
    }
}
