//! Control plane interfaces consumed by the sync pass
//!
//! The database and load balancer control planes are reached only through
//! the traits in this module. Responses are modelled as typed records so that
//! malformed payloads are rejected at the boundary instead of deep inside the
//! reconciliation logic.
//!
//! Production adapters for AWS live in [`aws`] (behind the `aws` feature).

#[cfg(feature = "aws")]
pub mod aws;

use std::collections::BTreeMap;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors reported by a control plane client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The service rejected or failed the request
    #[error("service error: {0}")]
    Service(String),

    /// The request never produced a response (network, credentials, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// The response was missing a required field
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Membership entry from a cluster description
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterMember {
    pub instance_id: String,
    pub is_writer: bool,
}

/// Cluster description as returned by the database control plane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterDescription {
    pub cluster_id: String,
    pub members: Vec<ClusterMember>,
    /// Built-in reader endpoint that balances across available readers
    pub reader_endpoint: Option<String>,
}

/// Instance description as returned by the database control plane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceDescription {
    pub instance_id: String,
    /// Resource name used for tag lookups
    pub arn: String,
    pub status: String,
    /// Absent while the instance is still being created
    pub endpoint_host: Option<String>,
    pub cluster_id: Option<String>,
    /// Set when the instance is a read replica of another instance
    pub replica_source_id: Option<String>,
}

/// A target as registered with the load balancer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegisteredTarget {
    pub ip: IpAddr,
    pub port: u16,
}

/// Read access to the managed database topology
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    /// Describe a cluster. `Ok(None)` means the identifier does not name a cluster.
    async fn describe_cluster(
        &self,
        cluster_id: &str,
    ) -> Result<Option<ClusterDescription>, ApiError>;

    /// Describe a single instance. `Ok(None)` means no such instance exists.
    async fn describe_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceDescription>, ApiError>;

    /// List every instance whose cluster membership matches `cluster_id`
    async fn list_instances_in_cluster(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<InstanceDescription>, ApiError>;

    /// Fetch the resource tags of an instance
    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>, ApiError>;
}

/// Read/write access to a load balancer target group
#[async_trait]
pub trait TargetGroupApi: Send + Sync {
    /// Currently registered targets, regardless of health state
    async fn describe_targets(&self, target_group: &str)
    -> Result<Vec<RegisteredTarget>, ApiError>;

    async fn register_targets(
        &self,
        target_group: &str,
        targets: &[RegisteredTarget],
    ) -> Result<(), ApiError>;

    async fn deregister_targets(
        &self,
        target_group: &str,
        targets: &[RegisteredTarget],
    ) -> Result<(), ApiError>;
}
