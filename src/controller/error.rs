//! Error types for the target group sync pass

use thiserror::Error;

use crate::clients::ApiError;

/// Failures that abort a reconciliation pass.
///
/// Non-fatal conditions (unknown member roles, a missing reader fallback)
/// are reported as [`Anomaly`](crate::controller::Anomaly) values instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Topology lookup failed: {0}")]
    TopologyLookup(String),

    #[error("Failed to resolve endpoint {host}: {reason}")]
    EndpointResolution { host: String, reason: String },

    #[error("Target group API error: {0}")]
    TargetGroupApi(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Name of the error kind as surfaced in pass results
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TopologyLookup(_) => "TopologyLookupFailure",
            Error::EndpointResolution { .. } => "EndpointResolutionFailure",
            Error::TargetGroupApi(_) => "TargetGroupApiFailure",
            Error::InvalidConfig(_) => "InvalidConfiguration",
        }
    }

    /// Check if the next scheduled pass can be expected to succeed without
    /// operator intervention
    pub fn is_retryable(&self) -> bool {
        match self {
            // Control plane hiccups and DNS propagation delays clear up on their own
            Error::TopologyLookup(_) => true,
            Error::EndpointResolution { .. } => true,
            Error::TargetGroupApi(_) => true,
            Error::InvalidConfig(_) => false,
        }
    }

    /// Wrap a database control plane failure
    pub(crate) fn topology(context: &str, err: ApiError) -> Self {
        Error::TopologyLookup(format!("{}: {}", context, err))
    }

    /// Wrap a load balancer control plane failure
    pub(crate) fn target_group(context: &str, err: ApiError) -> Self {
        Error::TargetGroupApi(format!("{}: {}", context, err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
