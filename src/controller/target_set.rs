//! Desired target set construction
//!
//! Applies the role filter and exclusion rules to a [`TopologyView`] and
//! resolves the surviving endpoints to IP addresses.

use std::collections::BTreeSet;
use std::net::IpAddr;

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::controller::error::{Error, Result};
use crate::controller::status::Anomaly;
use crate::resolver::EndpointResolver;
use crate::topology::{MemberRole, RoleRequest, TopologyMember, TopologyView};

/// Deduplicated set of target IPs
pub type TargetSet = BTreeSet<IpAddr>;

/// Desired targets for one pass along with anything worth reporting
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DesiredTargets {
    pub targets: TargetSet,
    pub anomalies: Vec<Anomaly>,
}

/// Members of `view` that qualify for `role`, before endpoint resolution.
///
/// Excluded members never qualify. In a cluster, a member qualifies when its
/// membership role matches. A standalone instance additionally has to be
/// available.
pub fn candidates(view: &TopologyView, role: RoleRequest) -> Vec<&TopologyMember> {
    match view {
        TopologyView::Cluster { members, .. } => members
            .iter()
            .filter(|m| !m.excluded && role.matches(m.role))
            .collect(),
        TopologyView::StandaloneInstance { member } => {
            if !member.excluded && member.available && role.matches(member.role) {
                vec![member]
            } else {
                vec![]
            }
        }
    }
}

/// Build the desired target set for `role`.
///
/// Resolution failures on qualifying members abort the pass, as does a
/// qualifying member with no endpoint yet. Members that do not qualify are
/// never resolved. The reader fallback is best effort: if the cluster reader
/// endpoint does not resolve the result is an empty set.
pub async fn build(
    view: &TopologyView,
    role: RoleRequest,
    resolver: &dyn EndpointResolver,
) -> Result<DesiredTargets> {
    let mut anomalies = collect_anomalies(view);

    let selected = candidates(view, role);
    for member in &selected {
        debug!(
            "Selected {} ({:?}) for {} targets",
            member.instance_id, member.role, role
        );
    }

    let resolved = try_join_all(
        selected
            .iter()
            .map(|member| resolve_member(member, resolver)),
    )
    .await?;
    let mut targets: TargetSet = resolved.into_iter().collect();

    if targets.is_empty() {
        if let TopologyView::Cluster {
            reader_fallback_host,
            ..
        } = view
        {
            match role {
                RoleRequest::Reader => {
                    let host = reader_fallback_host.as_deref();
                    if let Some(ip) = resolve_fallback(host, resolver, &mut anomalies).await {
                        targets.insert(ip);
                    }
                }
                // No fallback exists for writers; an empty writer set is surfaced as is
                RoleRequest::Writer => anomalies.push(Anomaly::NoWriterTargets),
            }
        }
    }

    for anomaly in &anomalies {
        warn!("{}", anomaly);
    }

    Ok(DesiredTargets { targets, anomalies })
}

async fn resolve_member(member: &TopologyMember, resolver: &dyn EndpointResolver) -> Result<IpAddr> {
    match member.endpoint_host.as_deref() {
        Some(host) => resolver.resolve(host).await,
        None => Err(Error::TopologyLookup(format!(
            "instance {} qualifies as a target but has no endpoint address",
            member.instance_id
        ))),
    }
}

/// Conditions visible from the topology alone
fn collect_anomalies(view: &TopologyView) -> Vec<Anomaly> {
    match view {
        TopologyView::Cluster { members, .. } => members
            .iter()
            .filter(|m| !m.excluded && m.role == MemberRole::Unknown)
            .map(|m| Anomaly::UnknownRole {
                instance_id: m.instance_id.clone(),
            })
            .collect(),
        TopologyView::StandaloneInstance { member } if !member.available && !member.excluded => {
            vec![Anomaly::StandaloneUnavailable {
                instance_id: member.instance_id.clone(),
            }]
        }
        TopologyView::StandaloneInstance { .. } => vec![],
    }
}

async fn resolve_fallback(
    host: Option<&str>,
    resolver: &dyn EndpointResolver,
    anomalies: &mut Vec<Anomaly>,
) -> Option<IpAddr> {
    let Some(host) = host else {
        anomalies.push(Anomaly::NoReaderFallbackHost);
        return None;
    };

    match resolver.resolve(host).await {
        Ok(ip) => {
            debug!("No reader instance qualified, using reader endpoint {}", host);
            Some(ip)
        }
        Err(e) => {
            let reason = match e {
                Error::EndpointResolution { reason, .. } => reason,
                other => other.to_string(),
            };
            anomalies.push(Anomaly::ReaderFallbackUnresolved {
                host: host.to_string(),
                reason,
            });
            None
        }
    }
}
