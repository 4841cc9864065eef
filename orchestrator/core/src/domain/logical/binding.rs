// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::artifact::{impl_logical_artifact, ArtifactCore};
use super::state::LogicalState;
use crate::domain::definition::BindingDefinition;
use crate::domain::qname::QName;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("Channel {0} is already bound; channels accept a single binding")]
    ChannelAlreadyBound(Url),
}

/// A binding attached to a service, reference or channel
#[derive(Debug, Clone)]
pub struct LogicalBinding {
    core: ArtifactCore,
    definition: Arc<BindingDefinition>,
    state: LogicalState,
    deployable: Option<QName>,
    assigned: bool,
    callback: bool,
}

impl_logical_artifact!(LogicalBinding);

impl LogicalBinding {
    /// Binding declared explicitly on the parent artifact
    pub fn new(definition: Arc<BindingDefinition>, parent: &Url) -> Self {
        Self {
            core: ArtifactCore::child_of(parent),
            definition,
            state: LogicalState::New,
            deployable: None,
            assigned: false,
            callback: false,
        }
    }

    pub fn new_callback(definition: Arc<BindingDefinition>, parent: &Url) -> Self {
        Self {
            callback: true,
            ..Self::new(definition, parent)
        }
    }

    /// Binding selected at deployment time on behalf of `deployable`
    pub fn assigned(definition: Arc<BindingDefinition>, parent: &Url, deployable: QName) -> Self {
        Self {
            deployable: Some(deployable),
            assigned: true,
            ..Self::new(definition, parent)
        }
    }

    pub fn definition(&self) -> &Arc<BindingDefinition> {
        &self.definition
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

    pub fn is_assigned(&self) -> bool {
        self.assigned
    }

    pub fn is_callback(&self) -> bool {
        self.callback
    }
}

/// Forward and callback binding lists of a bindable artifact
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub(crate) forward: Vec<LogicalBinding>,
    pub(crate) callback: Vec<LogicalBinding>,
}

pub trait HasBindings {
    fn binding_lists(&self) -> &Bindings;

    fn binding_lists_mut(&mut self) -> &mut Bindings;

    fn bindings(&self) -> &[LogicalBinding] {
        &self.binding_lists().forward
    }

    fn callback_bindings(&self) -> &[LogicalBinding] {
        &self.binding_lists().callback
    }

    fn add_binding(&mut self, binding: LogicalBinding) -> Result<(), BindingError> {
        self.binding_lists_mut().forward.push(binding);
        Ok(())
    }

    fn add_callback_binding(&mut self, binding: LogicalBinding) {
        self.binding_lists_mut().callback.push(binding);
    }

    fn is_bound(&self) -> bool {
        !self.binding_lists().forward.is_empty()
    }

    fn bindings_mut(&mut self) -> impl Iterator<Item = &mut LogicalBinding>
    where
        Self: Sized,
    {
        let lists = self.binding_lists_mut();
        lists.forward.iter_mut().chain(lists.callback.iter_mut())
    }

    /// Drop bindings for which `keep` returns false, in both lists
    fn retain_bindings(&mut self, keep: impl Fn(&LogicalBinding) -> bool)
    where
        Self: Sized,
    {
        let lists = self.binding_lists_mut();
        lists.forward.retain(&keep);
        lists.callback.retain(&keep);
    }
}

macro_rules! impl_has_bindings {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::domain::logical::binding::HasBindings for $ty {
                fn binding_lists(&self) -> &$crate::domain::logical::binding::Bindings {
                    &self.bindings
                }

                fn binding_lists_mut(&mut self) -> &mut $crate::domain::logical::binding::Bindings {
                    &mut self.bindings
                }
            }
        )+
    };
}

pub(crate) use impl_has_bindings;
