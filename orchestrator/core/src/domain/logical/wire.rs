// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::artifact::{impl_logical_artifact, ArtifactCore};
use super::binding::LogicalBinding;
use super::state::LogicalState;
use crate::domain::qname::QName;
use std::hash::{Hash, Hasher};
use url::Url;

/// Connection from one reference to one service inside a composite.
///
/// Identity is the `(source, target)` pair. Binding overrides and state do
/// not take part in equality, so wires de-duplicate by endpoints.
#[derive(Debug, Clone)]
pub struct LogicalWire {
    core: ArtifactCore,
    source: Url,
    target: Url,
    source_binding: Option<LogicalBinding>,
    target_binding: Option<LogicalBinding>,
    state: LogicalState,
    deployable: QName,
}

impl_logical_artifact!(LogicalWire);

impl LogicalWire {
    /// `parent` is the composite in whose scope the wire was declared
    pub fn new(parent: &Url, source: Url, target: Url, deployable: QName) -> Self {
        Self {
            core: ArtifactCore::child_of(parent),
            source,
            target,
            source_binding: None,
            target_binding: None,
            state: LogicalState::New,
            deployable,
        }
    }

    /// URI of the source reference
    pub fn source(&self) -> &Url {
        &self.source
    }

    /// URI of the target service
    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn source_binding(&self) -> Option<&LogicalBinding> {
        self.source_binding.as_ref()
    }

    pub fn target_binding(&self) -> Option<&LogicalBinding> {
        self.target_binding.as_ref()
    }

    /// Set the per-end bindings used when the wire crosses a transport boundary
    pub fn set_bindings(&mut self, source: LogicalBinding, target: LogicalBinding) {
        self.source_binding = Some(source);
        self.target_binding = Some(target);
    }

    pub fn is_bound(&self) -> bool {
        self.source_binding.is_some() || self.target_binding.is_some()
    }

    pub fn state(&self) -> LogicalState {
        self.state
    }

    pub fn set_state(&mut self, state: LogicalState) {
        self.state = state;
    }

    pub fn deployable(&self) -> &QName {
        &self.deployable
    }
}

impl PartialEq for LogicalWire {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.target == other.target
    }
}

impl Eq for LogicalWire {}

impl Hash for LogicalWire {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.target.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::BindingDefinition;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_wire_identity_ignores_bindings() {
        let parent = Url::parse("fabric://domain").unwrap();
        let source = Url::parse("fabric://domain/A#orders").unwrap();
        let target = Url::parse("fabric://domain/B#OrderService").unwrap();
        let plain = LogicalWire::new(&parent, source.clone(), target.clone(), QName::local("C"));
        let mut bound = LogicalWire::new(&parent, source.clone(), target.clone(), QName::local("Other"));
        let definition = Arc::new(BindingDefinition::new("ws", QName::local("binding.ws")));
        bound.set_bindings(
            LogicalBinding::new(definition.clone(), &source),
            LogicalBinding::new(definition, &target),
        );

        assert_eq!(plain, bound);
        let unique: HashSet<_> = [plain, bound].into_iter().collect();
        assert_eq!(unique.len(), 1);
    }
}
