//! AWS adapters for the control plane interfaces
//!
//! RDS provides the database topology, Elastic Load Balancing v2 the target
//! group. Credentials and region come from the standard AWS configuration
//! chain, resolved by the caller.

use std::collections::BTreeMap;
use std::net::IpAddr;

use async_trait::async_trait;
use aws_sdk_elasticloadbalancingv2::types::TargetDescription;
use aws_sdk_rds::error::{DisplayErrorContext, SdkError};
use aws_sdk_rds::types::DbInstance;
use tracing::debug;

use crate::clients::{
    ApiError, ClusterDescription, ClusterMember, DatabaseApi, InstanceDescription,
    RegisteredTarget, TargetGroupApi,
};

/// Flatten an SDK error, keeping the service/transport distinction
fn api_error<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => ApiError::Service(message),
        _ => ApiError::Transport(message),
    }
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Malformed(format!("{} missing", what)))
}

fn to_instance(instance: &DbInstance) -> Result<InstanceDescription, ApiError> {
    let instance_id = required(instance.db_instance_identifier(), "DBInstanceIdentifier")?;
    let arn = required(
        instance.db_instance_arn(),
        &format!("DBInstanceArn of {}", instance_id),
    )?;

    Ok(InstanceDescription {
        instance_id: instance_id.to_string(),
        arn: arn.to_string(),
        status: instance.db_instance_status().unwrap_or_default().to_string(),
        endpoint_host: instance
            .endpoint()
            .and_then(|e| e.address())
            .map(str::to_string),
        cluster_id: instance.db_cluster_identifier().map(str::to_string),
        replica_source_id: instance
            .read_replica_source_db_instance_identifier()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

/// RDS-backed [`DatabaseApi`]
#[derive(Clone, Debug)]
pub struct AwsDatabaseApi {
    client: aws_sdk_rds::Client,
}

impl AwsDatabaseApi {
    pub fn new(client: aws_sdk_rds::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatabaseApi for AwsDatabaseApi {
    async fn describe_cluster(
        &self,
        cluster_id: &str,
    ) -> Result<Option<ClusterDescription>, ApiError> {
        let output = match self
            .client
            .describe_db_clusters()
            .db_cluster_identifier(cluster_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_cluster_not_found_fault()) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(api_error(err)),
        };

        let Some(cluster) = output.db_clusters().first() else {
            return Ok(None);
        };

        let members = cluster
            .db_cluster_members()
            .iter()
            .map(|m| {
                Ok(ClusterMember {
                    instance_id: required(m.db_instance_identifier(), "DBClusterMember id")?
                        .to_string(),
                    is_writer: m.is_cluster_writer().unwrap_or(false),
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(Some(ClusterDescription {
            cluster_id: cluster
                .db_cluster_identifier()
                .unwrap_or(cluster_id)
                .to_string(),
            members,
            reader_endpoint: cluster.reader_endpoint().map(str::to_string),
        }))
    }

    async fn describe_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceDescription>, ApiError> {
        let output = match self
            .client
            .describe_db_instances()
            .db_instance_identifier(instance_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_instance_not_found_fault()) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(api_error(err)),
        };

        output.db_instances().first().map(to_instance).transpose()
    }

    async fn list_instances_in_cluster(
        &self,
        cluster_id: &str,
    ) -> Result<Vec<InstanceDescription>, ApiError> {
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_db_instances()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(api_error)?;

            for instance in output.db_instances() {
                if instance.db_cluster_identifier() == Some(cluster_id) {
                    instances.push(to_instance(instance)?);
                }
            }

            match output.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        debug!("Found {} instances in cluster {}", instances.len(), cluster_id);
        Ok(instances)
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>, ApiError> {
        let output = self
            .client
            .list_tags_for_resource()
            .resource_name(arn)
            .send()
            .await
            .map_err(api_error)?;

        Ok(output
            .tag_list()
            .iter()
            .filter_map(|tag| {
                let key = tag.key()?;
                Some((key.to_string(), tag.value().unwrap_or_default().to_string()))
            })
            .collect())
    }
}

/// Elastic Load Balancing v2 backed [`TargetGroupApi`]
#[derive(Clone, Debug)]
pub struct AwsTargetGroupApi {
    client: aws_sdk_elasticloadbalancingv2::Client,
}

impl AwsTargetGroupApi {
    pub fn new(client: aws_sdk_elasticloadbalancingv2::Client) -> Self {
        Self { client }
    }
}

fn to_description(target: &RegisteredTarget) -> Result<TargetDescription, ApiError> {
    TargetDescription::builder()
        .id(target.ip.to_string())
        .port(i32::from(target.port))
        .build()
        .map_err(|e| ApiError::Malformed(e.to_string()))
}

fn to_descriptions(targets: &[RegisteredTarget]) -> Result<Vec<TargetDescription>, ApiError> {
    targets.iter().map(to_description).collect()
}

#[async_trait]
impl TargetGroupApi for AwsTargetGroupApi {
    async fn describe_targets(
        &self,
        target_group: &str,
    ) -> Result<Vec<RegisteredTarget>, ApiError> {
        let output = self
            .client
            .describe_target_health()
            .target_group_arn(target_group)
            .send()
            .await
            .map_err(api_error)?;

        output
            .target_health_descriptions()
            .iter()
            .filter_map(|d| d.target())
            .map(|target| {
                let id = target.id();
                let ip: IpAddr = id.parse().map_err(|_| {
                    ApiError::Malformed(format!(
                        "target {} is not an IP address; only IP target groups are supported",
                        id
                    ))
                })?;
                let port = target
                    .port()
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| ApiError::Malformed(format!("target {} has no port", id)))?;
                Ok(RegisteredTarget { ip, port })
            })
            .collect()
    }

    async fn register_targets(
        &self,
        target_group: &str,
        targets: &[RegisteredTarget],
    ) -> Result<(), ApiError> {
        self.client
            .register_targets()
            .target_group_arn(target_group)
            .set_targets(Some(to_descriptions(targets)?))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn deregister_targets(
        &self,
        target_group: &str,
        targets: &[RegisteredTarget],
    ) -> Result<(), ApiError> {
        self.client
            .deregister_targets()
            .target_group_arn(target_group)
            .set_targets(Some(to_descriptions(targets)?))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }
}
