// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Logical Component Manager
//!
//! Sole owner of the committed domain root. Readers take an `Arc` snapshot;
//! committing swaps the snapshot in one step, so a reader holding the old
//! root keeps a consistent, if stale, view.

use crate::domain::definition::{Autowire, ComponentDefinition, Composite};
use crate::domain::logical::{LogicalCompositeComponent, LogicalNode, LogicalState};
use crate::domain::qname::QName;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub struct LogicalComponentManager {
    domain_uri: Url,
    root: RwLock<Arc<LogicalCompositeComponent>>,
}

impl LogicalComponentManager {
    /// The root starts PROVISIONED with the given autowire setting
    pub fn new(domain_uri: Url, autowire: Autowire) -> Self {
        let name = domain_uri.host_str().unwrap_or("domain").to_string();
        let composite = Composite::new(QName::local(name.clone())).with_autowire(autowire);
        let definition = Arc::new(ComponentDefinition::composite(name, Arc::new(composite)));
        let mut root = LogicalCompositeComponent::new(domain_uri.clone(), definition, None);
        root.set_autowire(autowire);
        root.set_state(LogicalState::Provisioned);
        Self {
            domain_uri,
            root: RwLock::new(Arc::new(root)),
        }
    }

    pub fn domain_uri(&self) -> &Url {
        &self.domain_uri
    }

    pub fn root_component(&self) -> Arc<LogicalCompositeComponent> {
        Arc::clone(&self.root.read())
    }

    /// Commit point for every domain update
    pub fn replace_root_component(&self, root: LogicalCompositeComponent) {
        debug!(components = root.component_count(), "Replacing domain root");
        *self.root.write() = Arc::new(root);
    }

    /// Resolve a component one path segment at a time from the root
    pub fn get_component(&self, uri: &Url) -> Option<LogicalNode> {
        self.root_component().find_component(uri).cloned()
    }
}
