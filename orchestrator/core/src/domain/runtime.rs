// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Host runtime identity: which domain it belongs to, the role it plays and
//! the zone it executes in.

use crate::domain::definition::Autowire;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Zone assigned to artifacts before allocation
pub const LOCAL_ZONE: &str = "LocalZone";

/// Role of this runtime in the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Single process hosting the whole domain
    #[default]
    Vm,
    /// Distributed controller placing components across zones
    Controller,
    /// Zone member receiving deployments from a controller
    Participant,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown runtime mode: {0} (expected vm, controller or participant)")]
pub struct RuntimeModeParseError(pub String);

impl FromStr for RuntimeMode {
    type Err = RuntimeModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vm" => Ok(RuntimeMode::Vm),
            "controller" => Ok(RuntimeMode::Controller),
            "participant" => Ok(RuntimeMode::Participant),
            other => Err(RuntimeModeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeMode::Vm => "vm",
            RuntimeMode::Controller => "controller",
            RuntimeMode::Participant => "participant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostInfo {
    runtime_name: String,
    domain: Url,
    mode: RuntimeMode,
    zone: String,
    transactional: bool,
    autowire: Option<Autowire>,
}

impl HostInfo {
    pub fn new(domain: Url, mode: RuntimeMode) -> Self {
        Self {
            runtime_name: "fabric".to_string(),
            domain,
            mode,
            zone: LOCAL_ZONE.to_string(),
            transactional: false,
            autowire: None,
        }
    }

    pub fn with_runtime_name(mut self, name: impl Into<String>) -> Self {
        self.runtime_name = name.into();
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Override the autowire setting of the domain root
    pub fn with_autowire(mut self, autowire: Autowire) -> Self {
        self.autowire = Some(autowire);
        self
    }

    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    pub fn domain(&self) -> &Url {
        &self.domain
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Requested transactional behaviour for local domains
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn autowire(&self) -> Option<Autowire> {
        self.autowire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_mode_parsing() {
        assert_eq!("VM".parse::<RuntimeMode>().unwrap(), RuntimeMode::Vm);
        assert_eq!("controller".parse::<RuntimeMode>().unwrap(), RuntimeMode::Controller);
        assert!("leader".parse::<RuntimeMode>().is_err());
        assert_eq!(RuntimeMode::Participant.to_string(), "participant");
    }

    #[test]
    fn test_host_defaults() {
        let host = HostInfo::new(Url::parse("fabric://domain").unwrap(), RuntimeMode::Vm);
        assert_eq!(host.zone(), LOCAL_ZONE);
        assert!(!host.is_transactional());
        assert!(host.autowire().is_none());
    }
}
