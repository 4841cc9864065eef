// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for Domain Events
//
// In-memory streaming of deployment events over tokio broadcast channels.
// Events are not persisted; a subscriber only sees events published after
// it subscribed.

use crate::domain::events::DeploymentEvent;
use crate::domain::listener::DeployListener;
use crate::domain::qname::QName;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Deployment(DeploymentEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_deployment_event(&self, event: DeploymentEvent) {
        self.publish(DomainEvent::Deployment(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() fails only when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single deployable
    pub fn subscribe_deployable(&self, deployable: QName) -> DeployableEventReceiver {
        DeployableEventReceiver {
            receiver: self.sender.subscribe(),
            deployable,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(err: broadcast::error::RecvError) -> EventBusError {
    match err {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one deployable's events (filtered)
pub struct DeployableEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    deployable: QName,
}

impl DeployableEventReceiver {
    /// Skips events of other deployables and contribution-level events
    pub async fn recv(&mut self) -> Result<DeploymentEvent, EventBusError> {
        loop {
            let DomainEvent::Deployment(event) = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.deployable() == Some(&self.deployable) {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

/// Publishes a [`DeploymentEvent`] for every listener callback
pub struct EventBusDeployListener {
    bus: EventBus,
}

impl EventBusDeployListener {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl DeployListener for EventBusDeployListener {
    fn on_deploy_contribution(&self, contribution: &Url) {
        self.bus.publish_deployment_event(DeploymentEvent::ContributionDeploymentStarted {
            contribution: contribution.clone(),
            started_at: Utc::now(),
        });
    }

    fn on_deploy_contribution_completed(&self, contribution: &Url) {
        self.bus.publish_deployment_event(DeploymentEvent::ContributionDeploymentCompleted {
            contribution: contribution.clone(),
            completed_at: Utc::now(),
        });
    }

    fn on_deploy(&self, deployable: &QName, plan: &str) {
        self.bus.publish_deployment_event(DeploymentEvent::DeploymentStarted {
            deployable: deployable.clone(),
            plan: plan.to_string(),
            started_at: Utc::now(),
        });
    }

    fn on_deploy_completed(&self, deployable: &QName, plan: &str) {
        self.bus.publish_deployment_event(DeploymentEvent::DeploymentCompleted {
            deployable: deployable.clone(),
            plan: plan.to_string(),
            completed_at: Utc::now(),
        });
    }

    fn on_undeploy_contribution(&self, contribution: &Url) {
        self.bus.publish_deployment_event(DeploymentEvent::ContributionUndeploymentStarted {
            contribution: contribution.clone(),
            started_at: Utc::now(),
        });
    }

    fn on_undeploy_contribution_completed(&self, contribution: &Url) {
        self.bus.publish_deployment_event(DeploymentEvent::ContributionUndeploymentCompleted {
            contribution: contribution.clone(),
            completed_at: Utc::now(),
        });
    }

    fn on_undeploy(&self, deployable: &QName) {
        self.bus.publish_deployment_event(DeploymentEvent::UndeploymentStarted {
            deployable: deployable.clone(),
            started_at: Utc::now(),
        });
    }

    fn on_undeploy_completed(&self, deployable: &QName) {
        self.bus.publish_deployment_event(DeploymentEvent::UndeploymentCompleted {
            deployable: deployable.clone(),
            completed_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let contribution = Url::parse("fabric://contributions/orders").unwrap();
        event_bus.publish_deployment_event(DeploymentEvent::ContributionDeploymentStarted {
            contribution: contribution.clone(),
            started_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        match received {
            DomainEvent::Deployment(DeploymentEvent::ContributionDeploymentStarted {
                contribution: uri,
                ..
            }) => assert_eq!(uri, contribution),
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_deployable_event_filtering() {
        let event_bus = EventBus::new(10);
        let listener = EventBusDeployListener::new(event_bus.clone());
        let orders = QName::new("urn:test", "Orders");
        let billing = QName::new("urn:test", "Billing");

        let mut receiver = event_bus.subscribe_deployable(orders.clone());

        // Other deployables and contribution events are filtered out
        listener.on_deploy(&billing, "plan1");
        listener.on_deploy_contribution(&Url::parse("fabric://contributions/orders").unwrap());
        listener.on_deploy_completed(&orders, "plan1");

        match receiver.recv().await.unwrap() {
            DeploymentEvent::DeploymentCompleted { deployable, plan, .. } => {
                assert_eq!(deployable, orders);
                assert_eq!(plan, "plan1");
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        EventBusDeployListener::new(event_bus.clone()).on_undeploy(&QName::local("Orders"));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
        assert!(matches!(receiver1.try_recv(), Err(EventBusError::Empty)));
    }
}
