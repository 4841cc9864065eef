// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fabric Orchestrator Core
//!
//! Assembly and deployment of composite applications into a service fabric
//! domain. Composites are instantiated into a logical component tree, zones
//! are allocated from deployment plans, and the tree is compiled into
//! zone-grouped physical deployments.
//!
//! # Architecture
//!
//! - **domain:** definitions, the logical model and collaborator contracts
//! - **application:** the domain orchestrator and its in-process services
//! - **infrastructure:** default collaborator implementations

pub mod application;
pub mod domain;
pub mod infrastructure;
