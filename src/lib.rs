pub mod clients;
pub mod config;
pub mod controller;
pub mod health;
pub mod resolver;
pub mod topology;

pub use clients::{
    ApiError, ClusterDescription, ClusterMember, DatabaseApi, InstanceDescription,
    RegisteredTarget, TargetGroupApi,
};
pub use config::Config;
pub use controller::{
    Anomaly, Context, Error, ReconcileOutcome, ReconciliationPlan, ReconciliationSummary, Result,
    TargetSet, reconcile,
};
pub use health::{HealthState, Metrics};
pub use resolver::{DnsResolver, EndpointResolver};
pub use topology::{MemberRole, RoleRequest, TopologyMember, TopologyView};

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

/// Run reconciliation passes every `period`, starting immediately.
///
/// A failed pass is logged and left for the next tick to correct; there is
/// no retry in between. This future only returns if the caller drops it.
pub async fn run_periodic(config: &Config, ctx: &Context, period: Duration) {
    tracing::info!(
        "Starting periodic sync of {} into {} every {:?}",
        config.database_identifier,
        config.target_group,
        period
    );

    let mut ticker = interval(period);
    // A slow pass should not be followed by a burst of catch-up passes
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // reconcile() logs and records failures itself
        if reconcile(config, ctx).await.is_err() {
            tracing::debug!("Next pass in {:?}", period);
        }
    }
}
