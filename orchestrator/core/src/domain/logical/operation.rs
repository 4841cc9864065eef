// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::artifact::{impl_logical_artifact, ArtifactCore};
use crate::domain::definition::{OperationDefinition, ServiceContract};
use url::Url;

#[derive(Debug, Clone)]
pub struct LogicalOperation {
    core: ArtifactCore,
    definition: OperationDefinition,
    callback: bool,
}

impl_logical_artifact!(LogicalOperation);

impl LogicalOperation {
    pub fn new(definition: OperationDefinition, parent: &Url, callback: bool) -> Self {
        Self {
            core: ArtifactCore::child_of(parent),
            definition,
            callback,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &OperationDefinition {
        &self.definition
    }

    pub fn is_callback(&self) -> bool {
        self.callback
    }
}

/// One logical operation per contract operation, followed by the callback
/// contract's operations when the contract declares one.
pub fn derive_operations(contract: &ServiceContract, parent: &Url) -> Vec<LogicalOperation> {
    let forward = contract
        .operations
        .iter()
        .map(|op| LogicalOperation::new(op.clone(), parent, false));
    let callback = contract
        .callback
        .iter()
        .flat_map(|cb| cb.operations.iter())
        .map(|op| LogicalOperation::new(op.clone(), parent, true));
    forward.chain(callback).collect()
}

pub trait HasOperations {
    fn contract(&self) -> &ServiceContract;

    fn operations(&self) -> &[LogicalOperation];

    fn operations_mut(&mut self) -> &mut Vec<LogicalOperation>;

    fn operation(&self, name: &str) -> Option<&LogicalOperation> {
        self.operations().iter().find(|op| op.name() == name && !op.is_callback())
    }

    fn callback_operations(&self) -> impl Iterator<Item = &LogicalOperation>
    where
        Self: Sized,
    {
        self.operations().iter().filter(|op| op.is_callback())
    }
}

macro_rules! impl_has_operations {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::domain::logical::operation::HasOperations for $ty {
                fn contract(&self) -> &$crate::domain::definition::ServiceContract {
                    &self.contract
                }

                fn operations(&self) -> &[$crate::domain::logical::operation::LogicalOperation] {
                    &self.operations
                }

                fn operations_mut(&mut self) -> &mut Vec<$crate::domain::logical::operation::LogicalOperation> {
                    &mut self.operations
                }
            }
        )+
    };
}

pub(crate) use impl_has_operations;
