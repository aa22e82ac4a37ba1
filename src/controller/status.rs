//! Pass results and non-fatal anomalies
//!
//! A successful pass produces a [`ReconciliationSummary`]. Either outcome can
//! be flattened into a [`ReconcileOutcome`] (status code plus message) for
//! whatever trigger invoked the pass.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::controller::error::Error;
use crate::topology::RoleRequest;

/// Status codes reported in pass outcomes
pub mod status_codes {
    pub const OK: u16 = 200;
    pub const BAD_CONFIG: u16 = 400;
    pub const FAILED: u16 = 500;
}

/// Condition worth reporting that does not abort the pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Instance belongs to the cluster but is not listed as a member
    UnknownRole { instance_id: String },
    /// No reader qualified and the cluster exposes no reader endpoint
    NoReaderFallbackHost,
    /// No reader qualified and the reader endpoint did not resolve
    ReaderFallbackUnresolved { host: String, reason: String },
    /// Writer requested but the cluster currently lists no writer
    NoWriterTargets,
    /// Standalone instance is not in the ready state
    StandaloneUnavailable { instance_id: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UnknownRole { instance_id } => {
                write!(f, "instance {} has no cluster role", instance_id)
            }
            Anomaly::NoReaderFallbackHost => {
                write!(f, "no reader qualified and no reader endpoint is available")
            }
            Anomaly::ReaderFallbackUnresolved { host, reason } => {
                write!(f, "reader endpoint {} did not resolve: {}", host, reason)
            }
            Anomaly::NoWriterTargets => write!(f, "cluster lists no writer instance"),
            Anomaly::StandaloneUnavailable { instance_id } => {
                write!(f, "instance {} is not in the ready state", instance_id)
            }
        }
    }
}

/// Result of a completed pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub target_group: String,
    pub role: RoleRequest,
    /// Targets the group carries after the pass
    pub desired: BTreeSet<IpAddr>,
    pub registered: usize,
    pub deregistered: usize,
    pub anomalies: Vec<Anomaly>,
}

impl ReconciliationSummary {
    /// Whether the pass had to change the target group
    pub fn changed(&self) -> bool {
        self.registered > 0 || self.deregistered > 0
    }

    /// Human-readable description of the resulting membership
    pub fn describe(&self) -> String {
        let ips: Vec<String> = self.desired.iter().map(IpAddr::to_string).collect();
        format!(
            "Updated target group {} with {} IPs: [{}]",
            self.target_group,
            self.role,
            ips.join(", ")
        )
    }
}

/// Flattened pass result suitable for any trigger mechanism
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub status_code: u16,
    pub body: String,
    /// Error kind for failed passes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl ReconcileOutcome {
    pub fn is_success(&self) -> bool {
        self.status_code == status_codes::OK
    }
}

impl From<&ReconciliationSummary> for ReconcileOutcome {
    fn from(summary: &ReconciliationSummary) -> Self {
        Self {
            status_code: status_codes::OK,
            body: summary.describe(),
            error_kind: None,
        }
    }
}

impl From<&Error> for ReconcileOutcome {
    fn from(error: &Error) -> Self {
        let status_code = match error {
            Error::InvalidConfig(_) => status_codes::BAD_CONFIG,
            _ => status_codes::FAILED,
        };
        Self {
            status_code,
            body: error.to_string(),
            error_kind: Some(error.kind()),
        }
    }
}

impl From<&Result<ReconciliationSummary, Error>> for ReconcileOutcome {
    fn from(result: &Result<ReconciliationSummary, Error>) -> Self {
        match result {
            Ok(summary) => summary.into(),
            Err(e) => e.into(),
        }
    }
}
