// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Static definitions, the logical model and the contracts of every
//! collaborator the domain orchestrator drives.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and traits shared by the application and infrastructure layers

pub mod allocation;
pub mod contribution;
pub mod definition;
pub mod deployment;
pub mod domain_config;
pub mod errors;
pub mod events;
pub mod instantiation;
pub mod journal;
pub mod listener;
pub mod logical;
pub mod plan;
pub mod policy;
pub mod qname;
pub mod repository;
pub mod runtime;
