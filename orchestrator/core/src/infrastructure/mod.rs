// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Concrete collaborators for the domain orchestrator: the model
//! instantiator, generator, deployer, binding selector, policy registry,
//! contribution store, event streaming, journaling and logging setup.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements the traits declared in `crate::domain`

pub mod binding_selector;
pub mod deployer;
pub mod event_bus;
pub mod generator;
pub mod instantiator;
pub mod journal;
pub mod policy;
pub mod repositories;
pub mod telemetry;

pub use binding_selector::ZoneBindingSelector;
pub use deployer::LocalDeployer;
pub use event_bus::{EventBus, EventBusDeployListener, EventBusError};
pub use generator::StandardGenerator;
pub use instantiator::StandardLogicalModelInstantiator;
pub use journal::JournalListener;
pub use policy::{InMemoryPolicyRegistry, IntentPolicyAttacher};
pub use repositories::InMemoryMetaDataStore;
