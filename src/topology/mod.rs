//! Database topology model
//!
//! A [`TopologyView`] is rebuilt from the control plane on every pass and is
//! never persisted.

mod inspector;

pub use inspector::{AUTOSCALING_TAG_KEY, READY_STATUS, inspect};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a topology member currently plays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Writer,
    Reader,
    /// Instance is in the cluster but not (yet) listed as a member
    Unknown,
}

/// Role whose endpoints the target group should carry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleRequest {
    #[default]
    Reader,
    Writer,
}

impl RoleRequest {
    /// Check if a member with `role` satisfies this request
    pub fn matches(self, role: MemberRole) -> bool {
        matches!(
            (self, role),
            (RoleRequest::Reader, MemberRole::Reader) | (RoleRequest::Writer, MemberRole::Writer)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleRequest::Reader => "reader",
            RoleRequest::Writer => "writer",
        }
    }
}

impl fmt::Display for RoleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoleRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reader" => Ok(RoleRequest::Reader),
            "writer" => Ok(RoleRequest::Writer),
            other => Err(format!("unknown role '{}', expected reader or writer", other)),
        }
    }
}

/// A database instance as seen by one pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopologyMember {
    pub instance_id: String,
    pub role: MemberRole,
    /// Absent while the instance is still being provisioned
    pub endpoint_host: Option<String>,
    pub available: bool,
    pub is_read_replica: bool,
    /// Carries the autoscaling-managed marker; never targeted
    pub excluded: bool,
}

/// Result of inspecting a database identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyView {
    Cluster {
        members: Vec<TopologyMember>,
        reader_fallback_host: Option<String>,
    },
    StandaloneInstance {
        member: TopologyMember,
    },
}

impl TopologyView {
    /// All members in the view, excluded ones included
    pub fn members(&self) -> &[TopologyMember] {
        match self {
            TopologyView::Cluster { members, .. } => members,
            TopologyView::StandaloneInstance { member } => std::slice::from_ref(member),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TopologyView::Cluster { .. } => "cluster",
            TopologyView::StandaloneInstance { .. } => "instance",
        }
    }
}
