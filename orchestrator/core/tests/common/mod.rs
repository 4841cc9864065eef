// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use fabric_orchestrator_core::application::{
    Domain, DomainExtensions, DomainKind, DomainServices, LogicalComponentManager, StandardContributionHelper,
    ZoneAllocator,
};
use fabric_orchestrator_core::domain::contribution::Contribution;
use fabric_orchestrator_core::domain::definition::{
    ComponentDefinition, ComponentType, Composite, ReferenceDefinition, ServiceContract, ServiceDefinition,
};
use fabric_orchestrator_core::domain::deployment::{
    BindingSelector, Deployer, DeployerError, Deployment, DeploymentPackage, GenerationError, Generator,
};
use fabric_orchestrator_core::domain::listener::DeployListener;
use fabric_orchestrator_core::domain::logical::LogicalCompositeComponent;
use fabric_orchestrator_core::domain::qname::QName;
use fabric_orchestrator_core::domain::repository::MetaDataStore;
use fabric_orchestrator_core::domain::runtime::{HostInfo, RuntimeMode};
use fabric_orchestrator_core::infrastructure::{
    InMemoryMetaDataStore, InMemoryPolicyRegistry, IntentPolicyAttacher, StandardGenerator,
    StandardLogicalModelInstantiator,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub fn uri(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub fn host(mode: RuntimeMode) -> HostInfo {
    HostInfo::new(uri("fabric://domain"), mode)
}

/// Deployer that records every package and can be switched to fail
#[derive(Default)]
pub struct RecordingDeployer {
    packages: Mutex<Vec<DeploymentPackage>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingDeployer {
    pub fn failing() -> Self {
        let deployer = Self::default();
        deployer.set_failing(true);
        deployer
    }

    /// Deployer that holds every package for `delay` before recording it
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn packages(&self) -> Vec<DeploymentPackage> {
        self.packages.lock().unwrap().clone()
    }

    /// Highest number of deploy calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Deployer for RecordingDeployer {
    async fn deploy(&self, package: &DeploymentPackage) -> Result<(), DeployerError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(DeployerError::Failed {
                package: package.id,
                reason: "zone offline".to_string(),
            });
        }
        self.packages.lock().unwrap().push(package.clone());
        Ok(())
    }
}

/// Generator that always fails
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(
        &self,
        _domain: &LogicalCompositeComponent,
        _incremental: bool,
    ) -> Result<Deployment, GenerationError> {
        Err(GenerationError::Failed("command compiler unavailable".to_string()))
    }
}

/// Listener recording callbacks as `event:argument` strings
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl DeployListener for RecordingListener {
    fn on_deploy_contribution(&self, contribution: &Url) {
        self.push(format!("deploy_contribution:{}", contribution));
    }

    fn on_deploy_contribution_completed(&self, contribution: &Url) {
        self.push(format!("deploy_contribution_completed:{}", contribution));
    }

    fn on_deploy(&self, deployable: &QName, plan: &str) {
        self.push(format!("deploy:{}:{}", deployable.local_part(), plan));
    }

    fn on_deploy_completed(&self, deployable: &QName, plan: &str) {
        self.push(format!("deploy_completed:{}:{}", deployable.local_part(), plan));
    }

    fn on_undeploy_contribution(&self, contribution: &Url) {
        self.push(format!("undeploy_contribution:{}", contribution));
    }

    fn on_undeploy_contribution_completed(&self, contribution: &Url) {
        self.push(format!("undeploy_contribution_completed:{}", contribution));
    }

    fn on_undeploy(&self, deployable: &QName) {
        self.push(format!("undeploy:{}", deployable.local_part()));
    }

    fn on_undeploy_completed(&self, deployable: &QName) {
        self.push(format!("undeploy_completed:{}", deployable.local_part()));
    }
}

/// Atomic component offering one service
pub fn provider(name: &str, interface: &str) -> ComponentDefinition {
    ComponentDefinition::atomic(
        name,
        "rust",
        ComponentType::default().with_service(ServiceDefinition::new(interface, ServiceContract::new(interface))),
    )
}

/// Atomic component with a single required reference
pub fn client(name: &str, reference: ReferenceDefinition) -> ComponentDefinition {
    ComponentDefinition::atomic(name, "rust", ComponentType::default().with_reference(reference))
}

/// Deployable named `name` holding a single `<name>Service` component
pub fn deployable(name: &str) -> Composite {
    Composite::new(QName::local(name)).with_component(provider(&format!("{}Service", name), "Svc"))
}

pub struct Fixture {
    pub store: Arc<InMemoryMetaDataStore>,
    pub registry: Arc<InMemoryPolicyRegistry>,
    pub deployer: Arc<RecordingDeployer>,
    pub listener: Arc<RecordingListener>,
    pub domain: Domain,
}

impl Fixture {
    pub fn new(kind: DomainKind, host: HostInfo) -> Self {
        Self::with_deployer(kind, host, RecordingDeployer::default())
    }

    pub fn with_deployer(kind: DomainKind, host: HostInfo, deployer: RecordingDeployer) -> Self {
        Self::build(kind, host, deployer, Arc::new(StandardGenerator::new()), None)
    }

    pub fn with_generator(kind: DomainKind, host: HostInfo, generator: Arc<dyn Generator>) -> Self {
        Self::build(kind, host, RecordingDeployer::default(), generator, None)
    }

    pub fn with_binding_selector(kind: DomainKind, host: HostInfo, selector: Arc<dyn BindingSelector>) -> Self {
        Self::build(
            kind,
            host,
            RecordingDeployer::default(),
            Arc::new(StandardGenerator::new()),
            Some(selector),
        )
    }

    fn build(
        kind: DomainKind,
        host: HostInfo,
        deployer: RecordingDeployer,
        generator: Arc<dyn Generator>,
        binding_selector: Option<Arc<dyn BindingSelector>>,
    ) -> Self {
        let store = Arc::new(InMemoryMetaDataStore::new());
        let registry = Arc::new(InMemoryPolicyRegistry::new());
        let deployer = Arc::new(deployer);
        let listener = Arc::new(RecordingListener::default());

        let manager = Arc::new(LogicalComponentManager::new(
            host.domain().clone(),
            kind.root_autowire(&host),
        ));
        let services = DomainServices {
            instantiator: Arc::new(StandardLogicalModelInstantiator::new()),
            policy_attacher: Arc::new(IntentPolicyAttacher::new(registry.clone())),
            generator,
            deployer: deployer.clone(),
            contribution_helper: Arc::new(StandardContributionHelper::new(store.clone())),
            binding_selector,
        };
        let domain = Domain::new(kind, host, manager, services).with_listener(listener.clone());
        let extensions = DomainExtensions::new()
            .with_allocator(Arc::new(ZoneAllocator::new()))
            .with_policy_registry(registry.clone());
        assert!(domain.complete_bootstrap(extensions).is_ok());

        Self {
            store,
            registry,
            deployer,
            listener,
            domain,
        }
    }

    pub fn install(&self, contribution: Contribution) -> Arc<Contribution> {
        self.store.store(contribution.installed()).unwrap()
    }
}
