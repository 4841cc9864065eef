// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Qualified names for composites, deployables, intents and policy sets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QNameError {
    #[error("Qualified name cannot be empty")]
    Empty,

    #[error("Unterminated namespace in qualified name: {0}")]
    UnterminatedNamespace(String),
}

/// A namespace-qualified name, written as `{namespace}local` in text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: String,
    local_part: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local_part: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_part: local_part.into(),
        }
    }

    /// Name without a namespace
    pub fn local(local_part: impl Into<String>) -> Self {
        Self::new(String::new(), local_part)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_part)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_part)
        }
    }
}

impl FromStr for QName {
    type Err = QNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(QNameError::Empty);
        }
        match s.strip_prefix('{') {
            Some(rest) => {
                let (namespace, local) = rest
                    .split_once('}')
                    .ok_or_else(|| QNameError::UnterminatedNamespace(s.to_string()))?;
                if local.is_empty() {
                    return Err(QNameError::Empty);
                }
                Ok(Self::new(namespace, local))
            }
            None => Ok(Self::local(s)),
        }
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_and_local_names() {
        let qualified: QName = "{urn:fabric}Orders".parse().unwrap();
        assert_eq!(qualified.namespace(), "urn:fabric");
        assert_eq!(qualified.local_part(), "Orders");
        assert_eq!(qualified.to_string(), "{urn:fabric}Orders");

        let local: QName = "Orders".parse().unwrap();
        assert_eq!(local.namespace(), "");
        assert_eq!(local.to_string(), "Orders");
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert_eq!("".parse::<QName>(), Err(QNameError::Empty));
        assert!(matches!(
            "{urn:fabric".parse::<QName>(),
            Err(QNameError::UnterminatedNamespace(_))
        ));
        assert_eq!("{urn:fabric}".parse::<QName>(), Err(QNameError::Empty));
    }

    #[test]
    fn test_serializes_as_string() {
        let name = QName::new("urn:fabric", "Billing");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"{urn:fabric}Billing\"");
        let back: QName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
