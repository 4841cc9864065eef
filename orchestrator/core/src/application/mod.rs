// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod allocator;
pub mod collector;
pub mod component_manager;
pub mod contribution_helper;
pub mod domain;

// Re-export the orchestrator for convenience
pub use allocator::ZoneAllocator;
pub use collector::Collector;
pub use component_manager::LogicalComponentManager;
pub use contribution_helper::StandardContributionHelper;
pub use domain::{Domain, DomainExtensions, DomainKind, DomainServices};
