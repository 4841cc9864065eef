// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transactional copy of a logical tree.
//!
//! Every cross reference in the tree (parent links, wire endpoints, leaf
//! handles) is a URI, so a structural clone already yields a replica whose
//! references resolve inside the replica. Only the immutable definitions
//! behind `Arc` are shared between the two trees.

use super::composite::LogicalCompositeComponent;

/// Produce an independent replica of `composite` and everything below it
pub fn copy(composite: &LogicalCompositeComponent) -> LogicalCompositeComponent {
    composite.clone()
}
