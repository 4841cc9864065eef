// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Domain Configuration Types
//
// Defines the configuration schema for a fabric runtime hosting a domain:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Runtime role and zone
// - Domain URI, autowire and transactional overrides
// - Observability settings

use crate::domain::definition::Autowire;
use crate::domain::runtime::{HostInfo, RuntimeMode, LOCAL_ZONE};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

pub const API_VERSION: &str = "fabric.dev/v1";
pub const KIND: &str = "DomainConfig";
pub const DOMAIN_SCHEME: &str = "fabric";

/// Top-level Kubernetes-style domain configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfigManifest {
    /// API version (must be "fabric.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "DomainConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: DomainConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable runtime name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfigSpec {
    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub domain: DomainSection,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSection {
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Zone this runtime executes in
    #[serde(default = "default_zone")]
    pub zone: String,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Vm,
            zone: default_zone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSection {
    #[serde(default = "default_domain_uri")]
    pub uri: String,

    /// Overrides the autowire setting of the domain root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autowire: Option<Autowire>,

    /// Local domains only; distributed domains are always transactional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactional: Option<bool>,
}

impl Default for DomainSection {
    fn default() -> Self {
        Self {
            uri: default_domain_uri(),
            autowire: None,
            transactional: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_zone() -> String {
    LOCAL_ZONE.to_string()
}

fn default_domain_uri() -> String {
    "fabric://domain".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for DomainConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "fabric-runtime".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: DomainConfigSpec::default(),
        }
    }
}

impl DomainConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. FABRIC_CONFIG_PATH environment variable
    /// 2. ./fabric-config.yaml (working directory)
    /// 3. ~/.fabric/config.yaml (user home)
    /// 4. /etc/fabric/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FABRIC_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./fabric-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".fabric").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/fabric/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply FABRIC_* overrides read through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("FABRIC_RUNTIME_MODE") {
            match val.parse::<RuntimeMode>() {
                Ok(mode) => {
                    tracing::info!("Environment override: FABRIC_RUNTIME_MODE={}", mode);
                    self.spec.runtime.mode = mode;
                }
                Err(e) => tracing::warn!("Ignoring FABRIC_RUNTIME_MODE: {}", e),
            }
        }

        if let Some(val) = lookup("FABRIC_TRANSACTIONAL") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: FABRIC_TRANSACTIONAL=true");
                    self.spec.domain.transactional = Some(true);
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: FABRIC_TRANSACTIONAL=false");
                    self.spec.domain.transactional = Some(false);
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for FABRIC_TRANSACTIONAL: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Some(zone) = lookup("FABRIC_ZONE") {
            if zone.trim().is_empty() {
                tracing::warn!("Ignoring empty FABRIC_ZONE");
            } else {
                tracing::info!("Environment override: FABRIC_ZONE={}", zone);
                self.spec.runtime.zone = zone;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.trim().is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let uri = self.domain_uri()?;
        if uri.scheme() != DOMAIN_SCHEME {
            anyhow::bail!(
                "spec.domain.uri must use the '{}' scheme: {}",
                DOMAIN_SCHEME,
                uri
            );
        }

        if self.spec.runtime.zone.trim().is_empty() {
            anyhow::bail!("spec.runtime.zone cannot be empty");
        }

        Ok(())
    }

    pub fn domain_uri(&self) -> anyhow::Result<Url> {
        Url::parse(&self.spec.domain.uri)
            .with_context(|| format!("Invalid spec.domain.uri: '{}'", self.spec.domain.uri))
    }

    pub fn logging(&self) -> LoggingConfig {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_default()
    }

    /// Host identity described by this configuration
    pub fn host_info(&self) -> anyhow::Result<HostInfo> {
        let mut host = HostInfo::new(self.domain_uri()?, self.spec.runtime.mode)
            .with_runtime_name(self.metadata.name.clone())
            .with_zone(self.spec.runtime.zone.clone())
            .with_transactional(self.spec.domain.transactional.unwrap_or(false));
        if let Some(autowire) = self.spec.domain.autowire {
            host = host.with_autowire(autowire);
        }
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let config = DomainConfigManifest::default();
        assert_eq!(config.api_version, API_VERSION);
        assert_eq!(config.kind, KIND);
        assert!(config.validate().is_ok());
        let host = config.host_info().unwrap();
        assert_eq!(host.mode(), RuntimeMode::Vm);
        assert_eq!(host.zone(), LOCAL_ZONE);
        assert!(!host.is_transactional());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
apiVersion: fabric.dev/v1
kind: DomainConfig
metadata:
  name: controller-1
spec:
  runtime:
    mode: controller
    zone: zone1
  domain:
    uri: fabric://orders
    autowire: "on"
    transactional: true
  observability:
    logging:
      level: debug
      format: json
"#;
        let config = DomainConfigManifest::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();
        let host = config.host_info().unwrap();
        assert_eq!(host.mode(), RuntimeMode::Controller);
        assert_eq!(host.zone(), "zone1");
        assert_eq!(host.domain().as_str(), "fabric://orders");
        assert_eq!(host.autowire(), Some(Autowire::On));
        assert!(host.is_transactional());
        assert_eq!(config.logging().format, "json");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DomainConfigManifest::default();
        config.apply_overrides(|key| match key {
            "FABRIC_RUNTIME_MODE" => Some("participant".to_string()),
            "FABRIC_TRANSACTIONAL" => Some("yes".to_string()),
            "FABRIC_ZONE" => Some("zone7".to_string()),
            _ => None,
        });
        assert_eq!(config.spec.runtime.mode, RuntimeMode::Participant);
        assert_eq!(config.spec.domain.transactional, Some(true));
        assert_eq!(config.spec.runtime.zone, "zone7");

        config.apply_overrides(|key| match key {
            "FABRIC_RUNTIME_MODE" => Some("bogus".to_string()),
            "FABRIC_TRANSACTIONAL" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.spec.runtime.mode, RuntimeMode::Participant);
        assert_eq!(config.spec.domain.transactional, Some(true));
    }

    #[test]
    fn test_validation_rejects_bad_manifests() {
        let mut config = DomainConfigManifest::default();
        config.kind = "NodeConfig".to_string();
        assert!(config.validate().is_err());

        let mut config = DomainConfigManifest::default();
        config.spec.domain.uri = "http://domain".to_string();
        assert!(config.validate().is_err());

        let mut config = DomainConfigManifest::default();
        config.metadata.name = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fabric-config.yaml");
        let mut config = DomainConfigManifest::default();
        config.spec.runtime.zone = "zone3".to_string();
        config.to_yaml_file(&path).unwrap();

        let loaded = DomainConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, config.metadata.name);
    }
}
