// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::artifact::{impl_logical_artifact, ArtifactCore};
use super::binding::{BindingError, Bindings, HasBindings, LogicalBinding};
use super::state::LogicalState;
use crate::domain::definition::ChannelDefinition;
use crate::domain::qname::QName;
use crate::domain::runtime::LOCAL_ZONE;
use std::sync::Arc;
use url::Url;

/// Publish/subscribe endpoint. Unlike services and references a channel
/// carries at most one binding.
#[derive(Debug, Clone)]
pub struct LogicalChannel {
    uri: Url,
    core: ArtifactCore,
    definition: Arc<ChannelDefinition>,
    zone: String,
    state: LogicalState,
    deployable: Option<QName>,
    bindings: Bindings,
}

impl_logical_artifact!(LogicalChannel);

impl LogicalChannel {
    pub fn new(uri: Url, definition: Arc<ChannelDefinition>, parent: &Url) -> Self {
        Self {
            uri,
            core: ArtifactCore::child_of(parent),
            definition,
            zone: LOCAL_ZONE.to_string(),
            state: LogicalState::New,
            deployable: None,
            bindings: Bindings::default(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn definition(&self) -> &Arc<ChannelDefinition> {
        &self.definition
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn set_zone(&mut self, zone: impl Into<String>) {
        self.zone = zone.into();
    }

    pub fn state(&self) -> LogicalState {
        self.state
    }

    pub fn set_state(&mut self, state: LogicalState) {
        self.state = state;
    }

    pub fn deployable(&self) -> Option<&QName> {
        self.deployable.as_ref()
    }

    pub fn set_deployable(&mut self, deployable: QName) {
        self.deployable = Some(deployable);
    }

    pub fn binding(&self) -> Option<&LogicalBinding> {
        self.bindings.forward.first()
    }
}

impl HasBindings for LogicalChannel {
    fn binding_lists(&self) -> &Bindings {
        &self.bindings
    }

    fn binding_lists_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    fn add_binding(&mut self, binding: LogicalBinding) -> Result<(), BindingError> {
        if !self.bindings.forward.is_empty() {
            return Err(BindingError::ChannelAlreadyBound(self.uri.clone()));
        }
        self.bindings.forward.push(binding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::BindingDefinition;

    #[test]
    fn test_channel_accepts_a_single_binding() {
        let parent = Url::parse("fabric://domain").unwrap();
        let uri = Url::parse("fabric://domain/Events").unwrap();
        let mut channel = LogicalChannel::new(uri.clone(), Arc::new(ChannelDefinition::new("Events")), &parent);
        let definition = Arc::new(BindingDefinition::new("zmq", QName::local("binding.zeromq")));

        channel.add_binding(LogicalBinding::new(definition.clone(), &uri)).unwrap();
        let second = channel.add_binding(LogicalBinding::new(definition, &uri));

        assert_eq!(second, Err(BindingError::ChannelAlreadyBound(uri)));
        assert_eq!(channel.bindings().len(), 1);
        assert!(channel.binding().is_some());
    }
}
