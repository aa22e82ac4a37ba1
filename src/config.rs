//! Runtime configuration
//!
//! Configuration is read from the environment once at startup and stays fixed
//! for the lifetime of the process.

use std::net::SocketAddr;
use std::time::Duration;

use crate::controller::error::{Error, Result};
use crate::topology::RoleRequest;

/// Port used for new registrations when `TARGET_PORT` is not set
pub const DEFAULT_TARGET_PORT: u16 = 3306;

/// Bind address of the health server in periodic mode
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

pub mod env {
    pub const DB_IDENTIFIER: &str = "DB_IDENTIFIER";
    /// Accepted in place of `DB_IDENTIFIER`
    pub const AURORA_CLUSTER_ID: &str = "AURORA_CLUSTER_ID";
    pub const TARGET_GROUP_ARN: &str = "TARGET_GROUP_ARN";
    pub const TARGET_PORT: &str = "TARGET_PORT";
    pub const TARGET_ROLE: &str = "TARGET_ROLE";
    /// Accepted in place of `TARGET_ROLE`
    pub const TYPE: &str = "TYPE";
    pub const SYNC_INTERVAL_SECS: &str = "SYNC_INTERVAL_SECS";
    pub const HEALTH_ADDR: &str = "HEALTH_ADDR";
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Cluster or instance to inspect
    pub database_identifier: String,
    /// Target group to reconcile
    pub target_group: String,
    /// Port paired with newly registered targets
    pub target_port: u16,
    pub role: RoleRequest,
    /// Run passes on this cadence instead of once
    pub sync_interval: Option<Duration>,
    pub health_addr: SocketAddr,
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_identifier = get(env::DB_IDENTIFIER)
            .or_else(|| get(env::AURORA_CLUSTER_ID))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "{} (or {}) must be set",
                    env::DB_IDENTIFIER,
                    env::AURORA_CLUSTER_ID
                ))
            })?;

        let target_group = get(env::TARGET_GROUP_ARN)
            .ok_or_else(|| Error::InvalidConfig(format!("{} must be set", env::TARGET_GROUP_ARN)))?;

        let target_port = match get(env::TARGET_PORT) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_TARGET_PORT,
        };

        let role = match get(env::TARGET_ROLE).or_else(|| get(env::TYPE)) {
            Some(raw) => raw
                .parse::<RoleRequest>()
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", env::TARGET_ROLE, e)))?,
            None => RoleRequest::default(),
        };

        let sync_interval = get(env::SYNC_INTERVAL_SECS)
            .map(|raw| parse_interval(&raw))
            .transpose()?;

        let health_addr = get(env::HEALTH_ADDR)
            .unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", env::HEALTH_ADDR, e)))?;

        Ok(Self {
            database_identifier: database_identifier.trim().to_string(),
            target_group: target_group.trim().to_string(),
            target_port,
            role,
            sync_interval,
            health_addr,
        })
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::InvalidConfig(format!(
            "{} must be a port between 1 and 65535, got '{}'",
            env::TARGET_PORT,
            raw
        ))),
        Ok(port) => Ok(port),
    }
}

fn parse_interval(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::InvalidConfig(format!(
            "{} must be a positive number of seconds, got '{}'",
            env::SYNC_INTERVAL_SECS,
            raw
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}
