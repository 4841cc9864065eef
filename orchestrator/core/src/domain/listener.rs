// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::qname::QName;
use url::Url;

/// Observer of domain deployment activity.
///
/// Callbacks come at contribution granularity (batch operations) and at
/// deployable granularity. Every method defaults to a no-op.
pub trait DeployListener: Send + Sync {
    fn on_deploy_contribution(&self, _contribution: &Url) {}

    fn on_deploy_contribution_completed(&self, _contribution: &Url) {}

    fn on_deploy(&self, _deployable: &QName, _plan: &str) {}

    fn on_deploy_completed(&self, _deployable: &QName, _plan: &str) {}

    fn on_undeploy_contribution(&self, _contribution: &Url) {}

    fn on_undeploy_contribution_completed(&self, _contribution: &Url) {}

    fn on_undeploy(&self, _deployable: &QName) {}

    fn on_undeploy_completed(&self, _deployable: &QName) {}
}
