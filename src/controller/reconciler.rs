//! Reconciliation pass for a database-backed target group
//!
//! One pass inspects the database topology, builds the desired target set for
//! the configured role and applies the minimal diff to the target group.

use std::time::Instant;

use tracing::{error, info, instrument};

use crate::config::Config;
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::status::ReconciliationSummary;
use crate::controller::{target_group, target_set};
use crate::topology;

/// Run a single reconciliation pass
#[instrument(skip(config, ctx), fields(db = %config.database_identifier, role = %config.role))]
pub async fn reconcile(config: &Config, ctx: &Context) -> Result<ReconciliationSummary> {
    let started = Instant::now();

    info!("Reconciling target group {}", config.target_group);

    let result = reconcile_target_group(config, ctx).await;
    let elapsed = started.elapsed().as_secs_f64();

    if let Some(ref state) = ctx.health_state {
        state.record_pass(config, &result, elapsed).await;
    }

    match result {
        Ok(summary) => {
            info!(
                registered = summary.registered,
                deregistered = summary.deregistered,
                "{}",
                summary.describe()
            );
            Ok(summary)
        }
        Err(e) => {
            error!(
                kind = e.kind(),
                retryable = e.is_retryable(),
                "Reconciliation failed: {}",
                e
            );
            Err(e)
        }
    }
}

async fn reconcile_target_group(config: &Config, ctx: &Context) -> Result<ReconciliationSummary> {
    let view = topology::inspect(ctx.database.as_ref(), &config.database_identifier).await?;
    info!(
        "Inspected {} {} with {} instances",
        view.kind(),
        config.database_identifier,
        view.members().len()
    );

    let desired = target_set::build(&view, config.role, ctx.resolver.as_ref()).await?;

    let plan = target_group::reconcile(
        ctx.target_groups.as_ref(),
        &config.target_group,
        &desired.targets,
        config.target_port,
    )
    .await?;

    Ok(ReconciliationSummary {
        target_group: config.target_group.clone(),
        role: config.role,
        registered: plan.to_register.len(),
        deregistered: plan.to_deregister.len(),
        desired: desired.targets,
        anomalies: desired.anomalies,
    })
}
