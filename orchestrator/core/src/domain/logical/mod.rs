// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Logical Model
//!
//! In-memory tree describing what is deployed, or being deployed, in the
//! domain. The domain root is a [`LogicalCompositeComponent`]; it exclusively
//! owns its child components, which in turn own their services, references,
//! producers, consumers, resource references and properties.
//!
//! | Capability | Implemented by |
//! |------------|----------------|
//! | [`LogicalArtifact`] | every node |
//! | [`HasBindings`] | `LogicalService`, `LogicalReference`, `LogicalChannel` |
//! | [`HasOperations`] | `LogicalService`, `LogicalReference`, `LogicalProducer`, `LogicalConsumer` |
//!
//! Links between nodes (parents, wire endpoints, promotion leaves) are URI
//! handles rather than pointers.

pub mod artifact;
pub mod binding;
pub mod channel;
pub mod component;
pub mod composite;
pub mod copy;
pub mod invocable;
pub mod operation;
pub mod resource;
pub mod state;
pub mod wire;

pub use artifact::{ArtifactCore, LogicalArtifact};
pub use binding::{BindingError, HasBindings, LogicalBinding};
pub use channel::LogicalChannel;
pub use component::{LogicalComponent, LogicalNode};
pub use composite::LogicalCompositeComponent;
pub use copy::copy;
pub use invocable::{
    LogicalConsumer, LogicalProducer, LogicalReference, LogicalResourceReference, LogicalService,
};
pub use operation::{HasOperations, LogicalOperation};
pub use resource::{LogicalProperty, LogicalResource};
pub use state::LogicalState;
pub use wire::LogicalWire;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LogicalModelError {
    #[error("Component already exists in the domain: {0}")]
    DuplicateComponent(Url),
    #[error("Channel already exists in the domain: {0}")]
    DuplicateChannel(Url),
    #[error("Invalid logical URI: {0}")]
    InvalidUri(String),
}

/// URI of a child artifact one path segment below `parent`
pub fn child_uri(parent: &Url, name: &str) -> Result<Url, LogicalModelError> {
    let mut uri = component_uri_of(parent);
    uri.path_segments_mut()
        .map_err(|_| LogicalModelError::InvalidUri(parent.to_string()))?
        .pop_if_empty()
        .push(name);
    Ok(uri)
}

/// URI of a named member (service, reference, ...) of a component
pub fn member_uri(component: &Url, name: &str) -> Url {
    let mut uri = component.clone();
    uri.set_fragment(Some(name));
    uri
}

/// Strip a member fragment, leaving the owning component's URI
pub fn component_uri_of(uri: &Url) -> Url {
    let mut component = uri.clone();
    component.set_fragment(None);
    component
}

/// Local name of a member URI
pub fn member_name(uri: &Url) -> String {
    uri.fragment().unwrap_or_default().to_string()
}

/// Whether `uri` names `component` itself or something below it
pub fn is_within(uri: &Url, component: &Url) -> bool {
    let base = component_uri_of(component);
    let candidate = component_uri_of(uri);
    if candidate == base {
        return true;
    }
    candidate
        .as_str()
        .strip_prefix(base.as_str())
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_member_uris() {
        let domain = Url::parse("fabric://domain").unwrap();
        let child = child_uri(&domain, "Billing").unwrap();
        assert_eq!(child.as_str(), "fabric://domain/Billing");
        let nested = child_uri(&child, "Invoices").unwrap();
        assert_eq!(nested.as_str(), "fabric://domain/Billing/Invoices");

        let service = member_uri(&nested, "Ledger");
        assert_eq!(service.as_str(), "fabric://domain/Billing/Invoices#Ledger");
        assert_eq!(member_name(&service), "Ledger");
        assert_eq!(component_uri_of(&service), nested);
    }

    #[test]
    fn test_is_within_respects_segment_boundaries() {
        let billing = Url::parse("fabric://domain/Billing").unwrap();
        assert!(is_within(&Url::parse("fabric://domain/Billing").unwrap(), &billing));
        assert!(is_within(&Url::parse("fabric://domain/Billing/Invoices#x").unwrap(), &billing));
        assert!(!is_within(&Url::parse("fabric://domain/BillingX").unwrap(), &billing));
        assert!(!is_within(&Url::parse("fabric://domain").unwrap(), &billing));
    }
}
