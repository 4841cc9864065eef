// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::journal::DomainJournal;
use crate::domain::listener::DeployListener;
use crate::domain::qname::QName;
use crate::domain::repository::RepositoryError;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::Path;
use tracing::info;
use url::Url;

/// Keeps a [`DomainJournal`] current from deployment callbacks so the domain
/// can be recovered after a restart
#[derive(Default)]
pub struct JournalListener {
    journal: Mutex<DomainJournal>,
}

impl JournalListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: DomainJournal) -> Self {
        Self {
            journal: Mutex::new(journal),
        }
    }

    /// Copy of the current journal, stamped with the time it was taken
    pub fn snapshot(&self) -> DomainJournal {
        let mut journal = self.journal.lock().clone();
        journal.written_at = Some(Utc::now());
        journal
    }

    pub fn save(&self, path: &Path) -> Result<(), RepositoryError> {
        let journal = self.snapshot();
        let json = serde_json::to_string_pretty(&journal)?;
        std::fs::write(path, json)?;
        info!(
            path = %path.display(),
            contributions = journal.contributions.len(),
            deployables = journal.deployables.len(),
            "Domain journal saved"
        );
        Ok(())
    }

    /// Read a journal written by [`JournalListener::save`]
    pub fn load(path: &Path) -> Result<DomainJournal, RepositoryError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl DeployListener for JournalListener {
    fn on_deploy_contribution_completed(&self, contribution: &Url) {
        self.journal.lock().record_contribution(contribution.clone());
    }

    fn on_deploy_completed(&self, deployable: &QName, plan: &str) {
        self.journal.lock().record_deployable(deployable.clone(), plan.to_string());
    }

    fn on_undeploy_contribution_completed(&self, contribution: &Url) {
        self.journal.lock().remove_contribution(contribution);
    }

    fn on_undeploy_completed(&self, deployable: &QName) {
        self.journal.lock().remove_deployable(deployable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::journal::JournalEntry;

    #[test]
    fn test_journal_follows_callbacks() {
        let listener = JournalListener::new();
        let contribution = Url::parse("fabric://contributions/orders").unwrap();
        let orders = QName::new("urn:test", "Orders");

        listener.on_deploy_contribution_completed(&contribution);
        listener.on_deploy_completed(&orders, "plan1");
        let journal = listener.snapshot();
        assert_eq!(journal.contributions, vec![contribution.clone()]);
        assert_eq!(
            journal.deployables,
            vec![JournalEntry {
                deployable: orders.clone(),
                plan: "plan1".to_string(),
            }]
        );
        assert!(journal.written_at.is_some());

        listener.on_undeploy_completed(&orders);
        listener.on_undeploy_contribution_completed(&contribution);
        assert!(listener.snapshot().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.json");
        let listener = JournalListener::with_journal(
            DomainJournal::new().with_deployable(QName::local("Orders"), "plan1"),
        );

        listener.save(&path).unwrap();
        let loaded = JournalListener::load(&path).unwrap();
        assert_eq!(loaded.deployables.len(), 1);
        assert_eq!(loaded.deployables[0].plan, "plan1");
        assert!(loaded.written_at.is_some());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = JournalListener::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(RepositoryError::Io(_))));
    }
}
