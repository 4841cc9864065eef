// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Domain Orchestrator
//!
//! Coordinates every structural change to the domain: include, undeploy,
//! recovery and policy (de)activation. Each operation runs as
//!
//! ```text
//! lock contribution -> working tree -> instantiate -> attach policies
//!     -> allocate -> select bindings -> generate -> deploy -> commit
//! ```
//!
//! In transactional mode the working tree is a copy of the committed root and
//! is discarded on failure. Otherwise the working tree replaces the root
//! whatever the outcome, so a failure may leave a partially applied update.
//!
//! Public operations are serialised by a single async mutex per domain.

use crate::application::collector::Collector;
use crate::application::component_manager::LogicalComponentManager;
use crate::domain::allocation::Allocator;
use crate::domain::contribution::ContributionError;
use crate::domain::definition::{Autowire, Composite};
use crate::domain::deployment::{BindingSelector, Deployer, Deployment, DeploymentPackage, Generator};
use crate::domain::errors::{AssemblyError, DeploymentError};
use crate::domain::instantiation::LogicalModelInstantiator;
use crate::domain::journal::DomainJournal;
use crate::domain::listener::DeployListener;
use crate::domain::logical::{copy, LogicalCompositeComponent, LogicalNode};
use crate::domain::plan::{DeploymentPlan, SYNTHETIC_PLAN_NAME};
use crate::domain::policy::{PolicyAttacher, PolicyRegistry, PolicySet};
use crate::domain::qname::QName;
use crate::domain::repository::{ContributionHelper, DeployableRef};
use crate::domain::runtime::{HostInfo, RuntimeMode};
use metrics::counter;
use scopeguard::{guard, ScopeGuard};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

/// Flavour of domain, deciding transactionality and root autowire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    /// Application domain of a single VM
    Local,
    /// Application domain spanning zones, driven by a controller
    Distributed,
    /// Bootstrap domain hosting the runtime's own system components
    Runtime,
}

impl DomainKind {
    /// Autowire of the domain root: the host override if configured, else
    /// on for the runtime domain and off for application domains
    pub fn root_autowire(self, host: &HostInfo) -> Autowire {
        host.autowire().unwrap_or(match self {
            DomainKind::Runtime => Autowire::On,
            DomainKind::Local | DomainKind::Distributed => Autowire::Off,
        })
    }
}

/// Collaborators every domain needs from construction
#[derive(Clone)]
pub struct DomainServices {
    pub instantiator: Arc<dyn LogicalModelInstantiator>,
    pub policy_attacher: Arc<dyn PolicyAttacher>,
    pub generator: Arc<dyn Generator>,
    pub deployer: Arc<dyn Deployer>,
    pub contribution_helper: Arc<dyn ContributionHelper>,
    /// Only distributed domains select bindings for cross-zone wires
    pub binding_selector: Option<Arc<dyn BindingSelector>>,
}

/// Collaborators that only become available once the runtime has booted
#[derive(Clone, Default)]
pub struct DomainExtensions {
    pub allocator: Option<Arc<dyn Allocator>>,
    pub policy_registry: Option<Arc<dyn PolicyRegistry>>,
}

impl DomainExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    pub fn with_policy_registry(mut self, registry: Arc<dyn PolicyRegistry>) -> Self {
        self.policy_registry = Some(registry);
        self
    }
}

pub struct Domain {
    kind: DomainKind,
    host: HostInfo,
    manager: Arc<LogicalComponentManager>,
    services: DomainServices,
    collector: Collector,
    extensions: OnceLock<DomainExtensions>,
    listeners: Vec<Arc<dyn DeployListener>>,
    lock: Mutex<()>,
}

impl Domain {
    pub fn new(
        kind: DomainKind,
        host: HostInfo,
        manager: Arc<LogicalComponentManager>,
        services: DomainServices,
    ) -> Self {
        Self {
            kind,
            host,
            manager,
            services,
            collector: Collector::new(),
            extensions: OnceLock::new(),
            listeners: Vec::new(),
            lock: Mutex::new(()),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn DeployListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Install the post-bootstrap collaborators. Succeeds once; a second
    /// call hands the rejected extensions back.
    pub fn complete_bootstrap(&self, extensions: DomainExtensions) -> Result<(), DomainExtensions> {
        let allocator = extensions.allocator.is_some();
        let policy_registry = extensions.policy_registry.is_some();
        self.extensions.set(extensions)?;
        info!(
            domain = %self.host.domain(),
            allocator,
            policy_registry,
            "Domain bootstrap complete"
        );
        Ok(())
    }

    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn manager(&self) -> &Arc<LogicalComponentManager> {
        &self.manager
    }

    pub fn root_component(&self) -> Arc<LogicalCompositeComponent> {
        self.manager.root_component()
    }

    pub fn get_component(&self, uri: &Url) -> Option<LogicalNode> {
        self.manager.get_component(uri)
    }

    pub fn is_transactional(&self) -> bool {
        match self.kind {
            DomainKind::Distributed => true,
            DomainKind::Runtime => false,
            DomainKind::Local => self.host.is_transactional(),
        }
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Include a deployable composite using the named plan, or the plan the
    /// runtime mode implies when none is given
    pub async fn include(&self, deployable: &QName, plan: Option<&str>) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.include_composite(deployable, plan, false).await;
        self.record("include", &result);
        result
    }

    /// Instantiate without allocating or deploying. Assembly errors are
    /// logged rather than returned.
    pub async fn include_simulated(
        &self,
        deployable: &QName,
        plan: Option<&str>,
    ) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.include_composite(deployable, plan, true).await;
        self.record("include_simulated", &result);
        result
    }

    /// Include every deployable of the given contributions as one batch
    pub async fn include_contributions(&self, uris: &[Url]) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.include_batch(uris).await;
        self.record("include_contributions", &result);
        result
    }

    /// Undeploy every deployable of a contribution, last deployed first.
    /// With `force`, deployer failures are logged and undeployment proceeds.
    pub async fn undeploy_contribution(&self, uri: &Url, force: bool) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.undeploy_all(uri, force).await;
        self.record("undeploy_contribution", &result);
        result
    }

    /// Undeploy a single composite. A simulated undeploy prunes the logical
    /// model without touching any zone.
    pub async fn undeploy(&self, deployable: &QName, simulated: bool) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.undeploy_composite(deployable, simulated).await;
        self.record("undeploy", &result);
        result
    }

    /// Rebuild the logical model from a journal. Outside VM mode nothing is
    /// pushed to zones. Listeners are not notified.
    pub async fn recover(&self, journal: &DomainJournal) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.recover_journal(journal).await;
        self.record("recover", &result);
        result
    }

    pub async fn activate_definitions(&self, contribution: &Url) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.change_definitions(contribution, true).await;
        self.record("activate_definitions", &result);
        result
    }

    pub async fn deactivate_definitions(&self, contribution: &Url) -> Result<(), DeploymentError> {
        let _serial = self.lock.lock().await;
        let result = self.change_definitions(contribution, false).await;
        self.record("deactivate_definitions", &result);
        result
    }

    // ------------------------------------------------------------------
    // Operation bodies, called with the domain lock held
    // ------------------------------------------------------------------

    async fn include_composite(
        &self,
        name: &QName,
        plan_name: Option<&str>,
        simulated: bool,
    ) -> Result<(), DeploymentError> {
        // 1. Resolve the deployable and its plan
        let deployable = self.services.contribution_helper.find_deployable(name)?;
        let plan = self.resolve_plan(&deployable, plan_name)?;
        info!(deployable = %name, plan = %plan.name, simulated, "Including composite");
        self.notify(|listener| listener.on_deploy(name, &plan.name));

        // 2. Wrap the deployable and take its lock
        let wrapper = Composite::wrap_include(&deployable.composite);
        deployable.contribution.acquire_lock(name.clone())?;
        let release = guard((), |_| {
            warn!(deployable = %name, "Releasing contribution lock after failed include");
            deployable.contribution.release_lock(name);
        });

        // 3. Instantiate and deploy against the working tree
        let mut domain = self.working_tree();
        let result = self
            .instantiate_and_deploy(
                &mut domain,
                &[wrapper],
                std::slice::from_ref(deployable.contribution.uri()),
                &plan,
                simulated,
                false,
            )
            .await;
        self.finish(domain, &result);
        result?;

        ScopeGuard::into_inner(release);
        self.notify(|listener| listener.on_deploy_completed(name, &plan.name));
        Ok(())
    }

    async fn include_batch(&self, uris: &[Url]) -> Result<(), DeploymentError> {
        let helper = &self.services.contribution_helper;

        // 1. Resolve one plan per contribution and merge them
        let contributions = helper.find_contributions(uris)?;
        let deployables = helper.get_deployables(&contributions, self.host.mode());
        let mut plans = Vec::with_capacity(contributions.len());
        let mut entries: Vec<(QName, String)> = Vec::with_capacity(deployables.len());
        for contribution in &contributions {
            let names: Vec<&QName> = deployables
                .iter()
                .filter(|d| d.contribution.uri() == contribution.uri())
                .map(DeployableRef::name)
                .collect();
            let plan = if self.is_controller() {
                helper
                    .find_default_plan(contribution)
                    .unwrap_or_else(|| self.synthetic_plan(names.iter().copied()))
            } else {
                self.synthetic_plan(names.iter().copied())
            };
            entries.extend(names.into_iter().map(|name| (name.clone(), plan.name.clone())));
            plans.push(plan);
        }
        let plan = DeploymentPlan::merge(&plans);
        info!(
            contributions = uris.len(),
            deployables = deployables.len(),
            "Including contributions"
        );

        for uri in uris {
            self.notify(|listener| listener.on_deploy_contribution(uri));
        }
        for (name, plan_name) in &entries {
            self.notify(|listener| listener.on_deploy(name, plan_name));
        }

        // 2. Lock every deployable, all or nothing
        helper.lock(&deployables)?;
        let release = guard((), |_| {
            warn!(contributions = uris.len(), "Releasing contribution locks after failed include");
            helper.release_locks(&deployables);
        });

        // 3. Instantiate and deploy the whole batch once
        let wrappers: Vec<Arc<Composite>> = deployables
            .iter()
            .map(|d| Composite::wrap_include(&d.composite))
            .collect();
        let mut domain = self.working_tree();
        let result = self
            .instantiate_and_deploy(&mut domain, &wrappers, uris, &plan, false, false)
            .await;
        self.finish(domain, &result);
        result?;

        ScopeGuard::into_inner(release);
        for (name, plan_name) in &entries {
            self.notify(|listener| listener.on_deploy_completed(name, plan_name));
        }
        for uri in uris {
            self.notify(|listener| listener.on_deploy_contribution_completed(uri));
        }
        Ok(())
    }

    async fn undeploy_all(&self, uri: &Url, force: bool) -> Result<(), DeploymentError> {
        let helper = &self.services.contribution_helper;
        let contribution = helper.find_contribution(uri)?;
        let deployables = helper.get_deployables(std::slice::from_ref(&contribution), self.host.mode());

        // 1. Every deployable must currently be deployed
        if let Some(missing) = deployables.iter().find(|d| !contribution.is_locked_by(d.name())) {
            return Err(ContributionError::CompositeNotDeployed(missing.name().clone()).into());
        }
        info!(contribution = %uri, deployables = deployables.len(), force, "Undeploying contribution");
        self.notify(|listener| listener.on_undeploy_contribution(uri));

        // 2. Mark in reverse declaration order
        let mut domain = self.working_tree();
        for deployable in deployables.iter().rev() {
            self.notify(|listener| listener.on_undeploy(deployable.name()));
            self.collector.mark_for_collection(deployable.name(), &mut domain);
        }

        // 3. Physical undeploy, then prune
        let result = self.undeploy_marked(&mut domain, force).await;
        self.finish(domain, &result);
        result?;

        // 4. Locks go only once the zones are done
        helper.release_locks(&deployables);
        for deployable in deployables.iter().rev() {
            self.notify(|listener| listener.on_undeploy_completed(deployable.name()));
        }
        self.notify(|listener| listener.on_undeploy_contribution_completed(uri));
        Ok(())
    }

    async fn undeploy_composite(&self, name: &QName, simulated: bool) -> Result<(), DeploymentError> {
        let deployable = self.services.contribution_helper.find_deployable(name)?;
        if !deployable.contribution.is_locked_by(name) {
            return Err(ContributionError::CompositeNotDeployed(name.clone()).into());
        }
        info!(deployable = %name, simulated, "Undeploying composite");
        self.notify(|listener| listener.on_undeploy(name));

        let mut domain = self.working_tree();
        self.collector.mark_for_collection(name, &mut domain);
        let result = if simulated {
            let removed = self.collector.collect(&mut domain);
            debug!(deployable = %name, removed = removed.len(), "Simulated undeploy");
            Ok(())
        } else {
            self.undeploy_marked(&mut domain, false).await
        };
        self.finish(domain, &result);
        result?;

        deployable.contribution.release_lock(name);
        self.notify(|listener| listener.on_undeploy_completed(name));
        Ok(())
    }

    async fn recover_journal(&self, journal: &DomainJournal) -> Result<(), DeploymentError> {
        let helper = &self.services.contribution_helper;
        info!(
            contributions = journal.contributions.len(),
            deployables = journal.deployables.len(),
            mode = %self.host.mode(),
            "Recovering domain"
        );

        // 1. Resolve a plan per journaled deployable
        let mut deployables = Vec::with_capacity(journal.deployables.len());
        let mut plans = Vec::with_capacity(journal.deployables.len());
        for entry in &journal.deployables {
            let deployable = helper.find_deployable(&entry.deployable)?;
            let plan = if entry.plan == SYNTHETIC_PLAN_NAME {
                // Re-resolved: the runtime may have become a controller since
                if self.is_controller() {
                    helper
                        .find_default_plan(&deployable.contribution)
                        .unwrap_or_else(|| self.synthetic_plan([deployable.name()]))
                } else {
                    self.synthetic_plan([deployable.name()])
                }
            } else {
                helper
                    .find_plan(&entry.plan)
                    .ok_or_else(|| DeploymentError::DeploymentPlanNotFound(entry.plan.clone()))?
            };
            plans.push(plan);
            deployables.push(deployable);
        }
        let plan = DeploymentPlan::merge(&plans);

        let mut contributions = journal.contributions.clone();
        for deployable in &deployables {
            if !contributions.contains(deployable.contribution.uri()) {
                contributions.push(deployable.contribution.uri().clone());
            }
        }

        // 2. Lock, then rebuild
        helper.lock(&deployables)?;
        let release = guard((), |_| {
            warn!("Releasing contribution locks after failed recovery");
            helper.release_locks(&deployables);
        });
        let wrappers: Vec<Arc<Composite>> = deployables
            .iter()
            .map(|d| Composite::wrap_include(&d.composite))
            .collect();
        let mut domain = self.working_tree();
        let result = self
            .instantiate_and_deploy(&mut domain, &wrappers, &contributions, &plan, false, true)
            .await;
        self.finish(domain, &result);
        result?;

        ScopeGuard::into_inner(release);
        Ok(())
    }

    async fn change_definitions(&self, contribution: &Url, activate: bool) -> Result<(), DeploymentError> {
        let Some(registry) = self.policy_registry() else {
            debug!(contribution = %contribution, "No policy registry installed");
            return Ok(());
        };
        let policy_sets = if activate {
            registry.activate_definitions(contribution).await?
        } else {
            registry.deactivate_definitions(contribution).await?
        };
        if policy_sets.is_empty() {
            return Ok(());
        }
        info!(
            contribution = %contribution,
            policy_sets = policy_sets.len(),
            activate,
            "Applying policy definition change"
        );

        let mut domain = self.working_tree();
        let result = self.apply_policy_sets(&mut domain, &policy_sets, activate).await;
        self.finish(domain, &result);
        result
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    async fn instantiate_and_deploy(
        &self,
        domain: &mut LogicalCompositeComponent,
        composites: &[Arc<Composite>],
        contributions: &[Url],
        plan: &DeploymentPlan,
        simulated: bool,
        recover: bool,
    ) -> Result<(), DeploymentError> {
        // 1. Policy definitions visible from the contributions
        if let Some(registry) = self.policy_registry() {
            for uri in contributions {
                registry.activate_definitions(uri).await?;
            }
        }

        // 2. Logical model
        let context = self.services.instantiator.include(composites, domain);
        if context.has_errors() {
            if !simulated {
                return Err(AssemblyError::new(context.into_errors()).into());
            }
            for err in context.errors() {
                warn!(error = %err, "Ignoring assembly error in simulated include");
            }
        }

        // 3. Policies
        self.services
            .policy_attacher
            .attach_policies(domain, !recover)
            .await?;

        if simulated {
            self.collector.mark_as_provisioned(domain);
            return Ok(());
        }

        // 4. Zones
        self.allocate(domain, plan).await?;

        // 5. Cross-zone bindings
        if let Some(selector) = &self.services.binding_selector {
            selector.select_bindings(domain).await?;
        }

        if recover && self.host.mode() != RuntimeMode::Vm {
            debug!(mode = %self.host.mode(), "Recovered logical model without deploying");
            self.collector.mark_as_provisioned(domain);
            return Ok(());
        }

        // 6. Physical deployment
        self.deploy_changes(domain).await
    }

    async fn apply_policy_sets(
        &self,
        domain: &mut LogicalCompositeComponent,
        policy_sets: &[PolicySet],
        attach: bool,
    ) -> Result<(), DeploymentError> {
        let attacher = &self.services.policy_attacher;
        if attach {
            attacher.attach_policy_sets(policy_sets, domain, true).await?;
        } else {
            attacher.detach_policy_sets(policy_sets, domain).await?;
        }
        self.deploy_changes(domain).await
    }

    /// Generate the incremental deployment, provision and hand it over
    async fn deploy_changes(&self, domain: &mut LogicalCompositeComponent) -> Result<(), DeploymentError> {
        let current = self.services.generator.generate(domain, true).await?;
        self.collector.mark_as_provisioned(domain);
        let full = self.full_deployment(domain).await?;
        let package = DeploymentPackage::new(current, full);
        debug!(
            package = %package.id,
            commands = package.current.command_count(),
            "Deploying package"
        );
        self.services.deployer.deploy(&package).await?;
        Ok(())
    }

    async fn undeploy_marked(
        &self,
        domain: &mut LogicalCompositeComponent,
        force: bool,
    ) -> Result<(), DeploymentError> {
        let current = self.services.generator.generate(domain, true).await?;
        let removed = self.collector.collect(domain);
        debug!(removed = removed.len(), "Collected undeployed components");
        let full = self.full_deployment(domain).await?;
        let package = DeploymentPackage::new(current, full);
        match self.services.deployer.deploy(&package).await {
            Ok(()) => Ok(()),
            Err(err) if force => {
                warn!(package = %package.id, error = %err, "Ignoring deployment failure during forced undeploy");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Controllers also ship the full deployment so zones can resynchronise
    async fn full_deployment(
        &self,
        domain: &LogicalCompositeComponent,
    ) -> Result<Option<Deployment>, DeploymentError> {
        if self.is_controller() {
            Ok(Some(self.services.generator.generate(domain, false).await?))
        } else {
            Ok(None)
        }
    }

    async fn allocate(
        &self,
        domain: &mut LogicalCompositeComponent,
        plan: &DeploymentPlan,
    ) -> Result<(), DeploymentError> {
        let Some(allocator) = self.allocator() else {
            return Ok(());
        };
        for component in domain.components_mut() {
            allocator.allocate_component(component, plan).await?;
        }
        for channel in domain.channels_mut() {
            allocator.allocate_channel(channel, plan).await?;
        }
        for resource in domain.resources_mut() {
            allocator.allocate_resource(resource, plan).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Tree the operation mutates. Readers hold the committed root behind an
    /// `Arc`, so both modes work on a private tree; they differ in `finish`.
    fn working_tree(&self) -> LogicalCompositeComponent {
        let root = self.manager.root_component();
        if self.is_transactional() {
            copy(&root)
        } else {
            Arc::unwrap_or_clone(root)
        }
    }

    fn finish<T>(&self, domain: LogicalCompositeComponent, result: &Result<T, DeploymentError>) {
        match result {
            Ok(_) => self.manager.replace_root_component(domain),
            Err(err) if !self.is_transactional() => {
                warn!(error = %err, "Committing partially applied domain update");
                self.manager.replace_root_component(domain);
            }
            Err(err) => debug!(error = %err, "Discarding working copy of the domain"),
        }
    }

    fn resolve_plan(
        &self,
        deployable: &DeployableRef,
        plan_name: Option<&str>,
    ) -> Result<DeploymentPlan, DeploymentError> {
        let helper = &self.services.contribution_helper;
        match plan_name {
            Some(name) => helper
                .find_plan(name)
                .ok_or_else(|| DeploymentError::DeploymentPlanNotFound(name.to_string())),
            None if self.is_controller() => Ok(helper
                .find_default_plan(&deployable.contribution)
                .unwrap_or_else(|| self.synthetic_plan([deployable.name()]))),
            None => Ok(self.synthetic_plan([deployable.name()])),
        }
    }

    fn synthetic_plan<'a>(&self, deployables: impl IntoIterator<Item = &'a QName>) -> DeploymentPlan {
        DeploymentPlan::synthetic(deployables, self.host.zone())
    }

    fn is_controller(&self) -> bool {
        self.host.mode() == RuntimeMode::Controller
    }

    fn allocator(&self) -> Option<&Arc<dyn Allocator>> {
        self.extensions.get().and_then(|ext| ext.allocator.as_ref())
    }

    fn policy_registry(&self) -> Option<&Arc<dyn PolicyRegistry>> {
        self.extensions.get().and_then(|ext| ext.policy_registry.as_ref())
    }

    fn notify(&self, event: impl Fn(&dyn DeployListener)) {
        for listener in &self.listeners {
            event(listener.as_ref());
        }
    }

    fn record<T>(&self, operation: &'static str, result: &Result<T, DeploymentError>) {
        counter!("fabric_domain_operations_total", "operation" => operation).increment(1);
        if let Err(err) = result {
            counter!("fabric_domain_operation_failures_total", "operation" => operation).increment(1);
            error!(operation, error = %err, "Domain operation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(mode: RuntimeMode) -> HostInfo {
        HostInfo::new(Url::parse("fabric://domain").unwrap(), mode)
    }

    #[test]
    fn test_root_autowire_by_kind() {
        let vm = host(RuntimeMode::Vm);
        assert_eq!(DomainKind::Runtime.root_autowire(&vm), Autowire::On);
        assert_eq!(DomainKind::Local.root_autowire(&vm), Autowire::Off);
        assert_eq!(DomainKind::Distributed.root_autowire(&vm), Autowire::Off);

        let configured = host(RuntimeMode::Controller).with_autowire(Autowire::On);
        assert_eq!(DomainKind::Distributed.root_autowire(&configured), Autowire::On);
    }
}
