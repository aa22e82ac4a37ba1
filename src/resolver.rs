//! Endpoint hostname to IP address resolution

use std::net::IpAddr;

use async_trait::async_trait;
use tokio::net::lookup_host;
use tracing::trace;

use crate::controller::error::{Error, Result};

/// Interface that turns a database endpoint hostname into a single IP address.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    /// Resolve `host`, failing with [`Error::EndpointResolution`] when the name
    /// has no usable address.
    async fn resolve(&self, host: &str) -> Result<IpAddr>;
}

/// Resolver backed by the system DNS configuration
#[derive(Clone, Debug, Default)]
pub struct DnsResolver;

#[async_trait]
impl EndpointResolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        // lookup_host wants a socket address; the port is irrelevant here
        let addrs: Vec<IpAddr> = lookup_host((host, 0))
            .await
            .map_err(|e| Error::EndpointResolution {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .map(|addr| addr.ip())
            .collect();

        let ip = pick_address(&addrs).ok_or_else(|| Error::EndpointResolution {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })?;

        trace!(host, %ip, "Resolved endpoint");
        Ok(ip)
    }
}

/// Prefer the first IPv4 answer, falling back to the first answer of any family
fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
