// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Contract for expanding composite definitions into the logical tree.

use crate::domain::definition::Composite;
use crate::domain::logical::{BindingError, LogicalCompositeComponent, LogicalModelError};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstantiationError {
    #[error(transparent)]
    Model(#[from] LogicalModelError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("Reference {reference} targets unknown service {target}")]
    UnresolvedTarget { reference: Url, target: String },

    #[error("Required reference {0} has no target")]
    UnwiredReference(Url),

    #[error("Reference {reference} accepts one target but resolved {count}")]
    TooManyTargets { reference: Url, count: usize },

    #[error("Composite {composite} promotes unknown {kind} {promote}")]
    PromotionNotFound {
        composite: Url,
        kind: &'static str,
        promote: String,
    },

    #[error("Channel {channel} not found in scope of {uri}")]
    ChannelNotFound { uri: Url, channel: String },

    #[error("Component {component} is missing required property {property}")]
    MissingProperty { component: Url, property: String },

    #[error("Wire source {0} does not name a component reference")]
    InvalidWireSource(String),
}

/// Errors gathered while instantiating; instantiation never stops at the first one
#[derive(Debug, Default)]
pub struct InstantiationContext {
    errors: Vec<InstantiationError>,
}

impl InstantiationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: impl Into<InstantiationError>) {
        self.errors.push(error.into());
    }

    pub fn errors(&self) -> &[InstantiationError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<InstantiationError> {
        self.errors
    }
}

pub trait LogicalModelInstantiator: Send + Sync {
    /// Expand `composites` into `domain`. Includes are expanded before the
    /// composite's own contents.
    fn include(
        &self,
        composites: &[Arc<Composite>],
        domain: &mut LogicalCompositeComponent,
    ) -> InstantiationContext;
}
