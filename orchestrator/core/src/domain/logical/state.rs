// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

/// Lifecycle shared by components, channels, resources, bindings and wires.
///
/// Normal progression is `New -> Provisioned -> Marked`. Marked artifacts are
/// pruned by the collector and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalState {
    /// Instantiated, not yet provisioned to a zone
    #[default]
    New,
    /// Running in its zone
    Provisioned,
    /// Scheduled for removal
    Marked,
}

impl LogicalState {
    pub fn is_new(self) -> bool {
        self == LogicalState::New
    }

    pub fn is_marked(self) -> bool {
        self == LogicalState::Marked
    }
}
