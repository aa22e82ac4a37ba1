//! Target group membership diff and apply
//!
//! Registration existence is the only signal used: target health is never
//! consulted. The two mutating calls are not transactional, so a failure
//! after deregistration can leave the group under-populated until the next
//! pass.

use std::collections::BTreeSet;
use std::net::IpAddr;

use tracing::{debug, info};

use crate::clients::{RegisteredTarget, TargetGroupApi};
use crate::controller::error::{Error, Result};
use crate::controller::target_set::TargetSet;

/// Minimal set of changes that brings a target group to the desired state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_register: BTreeSet<IpAddr>,
    /// Targets to remove, with the port they are currently registered on
    pub to_deregister: BTreeSet<RegisteredTarget>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_register.is_empty() && self.to_deregister.is_empty()
    }

    /// IPs the plan removes from the group
    pub fn deregister_ips(&self) -> BTreeSet<IpAddr> {
        self.to_deregister.iter().map(|t| t.ip).collect()
    }
}

/// Compute the diff between current registrations and the desired set.
///
/// Targets are compared by IP alone: a desired IP that is registered on any
/// port is left untouched.
pub fn plan(current: &[RegisteredTarget], desired: &TargetSet) -> ReconciliationPlan {
    let current_ips: BTreeSet<IpAddr> = current.iter().map(|t| t.ip).collect();

    ReconciliationPlan {
        to_register: desired.difference(&current_ips).copied().collect(),
        to_deregister: current
            .iter()
            .filter(|t| !desired.contains(&t.ip))
            .copied()
            .collect(),
    }
}

/// Bring `target_group` to `desired`, registering new targets on `port`.
///
/// Issues at most one deregistration and one registration call, and none at
/// all when the group already matches.
pub async fn reconcile(
    api: &dyn TargetGroupApi,
    target_group: &str,
    desired: &TargetSet,
    port: u16,
) -> Result<ReconciliationPlan> {
    let current = api
        .describe_targets(target_group)
        .await
        .map_err(|e| Error::target_group(&format!("describe targets of {}", target_group), e))?;

    let plan = plan(&current, desired);
    if plan.is_empty() {
        debug!(
            "Target group {} already has the desired {} targets",
            target_group,
            desired.len()
        );
        return Ok(plan);
    }

    if !plan.to_deregister.is_empty() {
        let targets: Vec<RegisteredTarget> = plan.to_deregister.iter().copied().collect();
        api.deregister_targets(target_group, &targets)
            .await
            .map_err(|e| Error::target_group("deregister targets", e))?;
        info!(
            "Deregistered {} targets from {}: {:?}",
            targets.len(),
            target_group,
            plan.deregister_ips()
        );
    }

    if !plan.to_register.is_empty() {
        let targets: Vec<RegisteredTarget> = plan
            .to_register
            .iter()
            .map(|&ip| RegisteredTarget { ip, port })
            .collect();
        api.register_targets(target_group, &targets)
            .await
            .map_err(|e| Error::target_group("register targets", e))?;
        info!(
            "Registered {} targets with {} on port {}: {:?}",
            targets.len(),
            target_group,
            port,
            plan.to_register
        );
    }

    Ok(plan)
}
