//! Topology inspection against the database control plane
//!
//! An identifier is first looked up as a cluster and, when the control plane
//! reports no such cluster, as a standalone instance. The two-branch lookup is
//! modelled as an explicit [`Lookup`] value rather than by matching on errors.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use crate::clients::{ClusterDescription, DatabaseApi, InstanceDescription};
use crate::controller::error::{Error, Result};
use crate::topology::{MemberRole, TopologyMember, TopologyView};

/// Tag key the autoscaler puts on instances it manages
pub const AUTOSCALING_TAG_KEY: &str = "application-autoscaling:resourceId";

/// Instance status that counts as ready to serve traffic
pub const READY_STATUS: &str = "available";

/// What a database identifier refers to
enum Lookup {
    Cluster(ClusterDescription),
    Standalone(InstanceDescription),
    NotFound,
}

/// Inspect `identifier` and enumerate its members with role, availability
/// and exclusion state.
///
/// Fails with [`Error::TopologyLookup`] when the identifier names neither a
/// cluster nor an instance, or when a control plane call fails. Instances
/// without an endpoint yet are kept in the view with no endpoint host.
#[instrument(skip(db))]
pub async fn inspect(db: &dyn DatabaseApi, identifier: &str) -> Result<TopologyView> {
    match lookup(db, identifier).await? {
        Lookup::Cluster(cluster) => inspect_cluster(db, cluster).await,
        Lookup::Standalone(instance) => inspect_instance(db, instance).await,
        Lookup::NotFound => Err(Error::TopologyLookup(format!(
            "{} is neither a cluster nor an instance",
            identifier
        ))),
    }
}

async fn lookup(db: &dyn DatabaseApi, identifier: &str) -> Result<Lookup> {
    if let Some(cluster) = db
        .describe_cluster(identifier)
        .await
        .map_err(|e| Error::topology(&format!("describe cluster {}", identifier), e))?
    {
        return Ok(Lookup::Cluster(cluster));
    }

    debug!("No cluster named {}, trying as instance", identifier);

    let instance = db
        .describe_instance(identifier)
        .await
        .map_err(|e| Error::topology(&format!("describe instance {}", identifier), e))?;

    Ok(match instance {
        Some(instance) => Lookup::Standalone(instance),
        None => Lookup::NotFound,
    })
}

async fn inspect_cluster(db: &dyn DatabaseApi, cluster: ClusterDescription) -> Result<TopologyView> {
    let roles: HashMap<&str, MemberRole> = cluster
        .members
        .iter()
        .map(|m| {
            let role = if m.is_writer {
                MemberRole::Writer
            } else {
                MemberRole::Reader
            };
            (m.instance_id.as_str(), role)
        })
        .collect();

    // Tags and endpoints are not part of the cluster description, so the
    // instances have to be listed separately
    let instances = db
        .list_instances_in_cluster(&cluster.cluster_id)
        .await
        .map_err(|e| Error::topology(&format!("list instances of {}", cluster.cluster_id), e))?;

    let mut members = Vec::with_capacity(instances.len());
    for instance in instances {
        if instance.cluster_id.as_deref() != Some(cluster.cluster_id.as_str()) {
            debug!(
                "Skipping instance {} (cluster {:?})",
                instance.instance_id, instance.cluster_id
            );
            continue;
        }

        let tags = fetch_tags(db, &instance).await?;
        let role = roles
            .get(instance.instance_id.as_str())
            .copied()
            .unwrap_or(MemberRole::Unknown);

        members.push(to_member(instance, role, &tags));
    }

    debug!(
        "Cluster {} has {} instances ({} listed as members)",
        cluster.cluster_id,
        members.len(),
        cluster.members.len()
    );

    Ok(TopologyView::Cluster {
        members,
        reader_fallback_host: cluster.reader_endpoint.filter(|h| !h.is_empty()),
    })
}

async fn inspect_instance(
    db: &dyn DatabaseApi,
    instance: InstanceDescription,
) -> Result<TopologyView> {
    let tags = fetch_tags(db, &instance).await?;

    // A standalone instance has no membership metadata; its role follows
    // from whether it replicates from another instance
    let role = if instance.replica_source_id.is_some() {
        MemberRole::Reader
    } else {
        MemberRole::Writer
    };

    let member = to_member(instance, role, &tags);
    Ok(TopologyView::StandaloneInstance { member })
}

async fn fetch_tags(
    db: &dyn DatabaseApi,
    instance: &InstanceDescription,
) -> Result<BTreeMap<String, String>> {
    db.list_tags(&instance.arn)
        .await
        .map_err(|e| Error::topology(&format!("list tags of {}", instance.instance_id), e))
}

fn to_member(
    instance: InstanceDescription,
    role: MemberRole,
    tags: &BTreeMap<String, String>,
) -> TopologyMember {
    let endpoint_host = instance.endpoint_host.filter(|h| !h.is_empty());
    if endpoint_host.is_none() {
        debug!(
            "Instance {} has no endpoint yet (status: {})",
            instance.instance_id, instance.status
        );
    }

    TopologyMember {
        available: instance.status == READY_STATUS,
        is_read_replica: instance.replica_source_id.is_some(),
        excluded: tags.contains_key(AUTOSCALING_TAG_KEY),
        instance_id: instance.instance_id,
        role,
        endpoint_host,
    }
}
