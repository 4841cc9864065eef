// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Deployment Plans
//!
//! A plan maps deployable composites to the zone their artifacts run in.
//! Plans are declared by contributions (YAML documents) or synthesised when a
//! deployable is included without one.
//!
//! ```yaml
//! name: plan1
//! default_zone: zone2
//! mappings:
//!   "{urn:orders}OrdersComposite": zone1
//! ```

use crate::domain::qname::QName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Name given to plans synthesised by the domain
pub const SYNTHETIC_PLAN_NAME: &str = "fabric.synthetic";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to parse deployment plan: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Deployment plan has no name")]
    MissingName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub name: String,
    /// Zone for deployables without a mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_zone: Option<String>,
    #[serde(default)]
    pub mappings: IndexMap<QName, String>,
}

impl DeploymentPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_zone: None,
            mappings: IndexMap::new(),
        }
    }

    /// Plan placing every given deployable in `zone`
    pub fn synthetic<'a>(deployables: impl IntoIterator<Item = &'a QName>, zone: &str) -> Self {
        let mut plan = Self::new(SYNTHETIC_PLAN_NAME);
        for deployable in deployables {
            plan.mappings.insert(deployable.clone(), zone.to_string());
        }
        plan
    }

    pub fn with_mapping(mut self, deployable: QName, zone: impl Into<String>) -> Self {
        self.mappings.insert(deployable, zone.into());
        self
    }

    pub fn with_default_zone(mut self, zone: impl Into<String>) -> Self {
        self.default_zone = Some(zone.into());
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.name == SYNTHETIC_PLAN_NAME
    }

    /// Zone for a deployable: its mapping, else the default zone
    pub fn zone_for(&self, deployable: &QName) -> Option<&str> {
        self.mappings
            .get(deployable)
            .or(self.default_zone.as_ref())
            .map(String::as_str)
    }

    /// Additive merge into one synthetic plan.
    ///
    /// The first mapping seen for a deployable is kept; later conflicting
    /// mappings are logged and ignored. The first default zone wins likewise.
    pub fn merge<'a>(plans: impl IntoIterator<Item = &'a DeploymentPlan>) -> DeploymentPlan {
        let mut merged = DeploymentPlan::new(SYNTHETIC_PLAN_NAME);
        for plan in plans {
            if merged.default_zone.is_none() {
                merged.default_zone = plan.default_zone.clone();
            }
            for (deployable, zone) in &plan.mappings {
                match merged.mappings.get(deployable) {
                    None => {
                        merged.mappings.insert(deployable.clone(), zone.clone());
                    }
                    Some(existing) if existing != zone => {
                        warn!(
                            deployable = %deployable,
                            kept = %existing,
                            ignored = %zone,
                            plan = %plan.name,
                            "Conflicting zone mapping while merging deployment plans"
                        );
                    }
                    Some(_) => {}
                }
            }
        }
        merged
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PlanError> {
        let plan: DeploymentPlan = serde_yaml::from_str(yaml)?;
        if plan.name.trim().is_empty() {
            return Err(PlanError::MissingName);
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_lookup_falls_back_to_default() {
        let plan = DeploymentPlan::new("plan1")
            .with_mapping(QName::local("A"), "zone1")
            .with_default_zone("zone2");
        assert_eq!(plan.zone_for(&QName::local("A")), Some("zone1"));
        assert_eq!(plan.zone_for(&QName::local("B")), Some("zone2"));
        assert_eq!(DeploymentPlan::new("empty").zone_for(&QName::local("A")), None);
    }

    #[test]
    fn test_merge_keeps_first_mapping() {
        let first = DeploymentPlan::new("p1").with_mapping(QName::local("A"), "zone1");
        let second = DeploymentPlan::new("p2")
            .with_mapping(QName::local("A"), "zone9")
            .with_mapping(QName::local("B"), "zone2")
            .with_default_zone("zone3");

        let merged = DeploymentPlan::merge([&first, &second]);
        assert!(merged.is_synthetic());
        assert_eq!(merged.zone_for(&QName::local("A")), Some("zone1"));
        assert_eq!(merged.zone_for(&QName::local("B")), Some("zone2"));
        assert_eq!(merged.default_zone.as_deref(), Some("zone3"));
    }

    #[test]
    fn test_plan_from_yaml() {
        let yaml = r#"
name: plan1
mappings:
  "{urn:orders}OrdersComposite": zone1
"#;
        let plan = DeploymentPlan::from_yaml(yaml).unwrap();
        assert_eq!(plan.name, "plan1");
        assert_eq!(
            plan.zone_for(&QName::new("urn:orders", "OrdersComposite")),
            Some("zone1")
        );
        assert!(matches!(
            DeploymentPlan::from_yaml("name: ''"),
            Err(PlanError::MissingName)
        ));
    }
}
