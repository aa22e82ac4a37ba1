use std::sync::Arc;

use crate::clients::{DatabaseApi, TargetGroupApi};
use crate::health::HealthState;
use crate::resolver::EndpointResolver;

/// Collaborator handles shared by every pass
#[derive(Clone)]
pub struct Context {
    /// Database control plane client
    pub database: Arc<dyn DatabaseApi>,
    /// Load balancer control plane client
    pub target_groups: Arc<dyn TargetGroupApi>,
    /// Endpoint hostname resolver
    pub resolver: Arc<dyn EndpointResolver>,
    /// Health state for recording metrics (optional)
    pub health_state: Option<Arc<HealthState>>,
}

impl Context {
    pub fn new(
        database: Arc<dyn DatabaseApi>,
        target_groups: Arc<dyn TargetGroupApi>,
        resolver: Arc<dyn EndpointResolver>,
    ) -> Self {
        Self {
            database,
            target_groups,
            resolver,
            health_state: None,
        }
    }

    /// Attach health state so passes are recorded in the metrics registry
    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }
}
