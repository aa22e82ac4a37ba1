use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use db_target_sync::clients::aws::{AwsDatabaseApi, AwsTargetGroupApi};
use db_target_sync::health::{HealthState, run_health_server};
use db_target_sync::{Config, Context, DnsResolver, ReconcileOutcome, reconcile, run_periodic};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("db_target_sync=info".parse()?),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return report(&ReconcileOutcome::from(&e));
        }
    };

    info!(
        db = %config.database_identifier,
        target_group = %config.target_group,
        role = %config.role,
        port = config.target_port,
        "Starting db-target-sync"
    );

    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let ctx = Context::new(
        Arc::new(AwsDatabaseApi::new(aws_sdk_rds::Client::new(&sdk_config))),
        Arc::new(AwsTargetGroupApi::new(
            aws_sdk_elasticloadbalancingv2::Client::new(&sdk_config),
        )),
        Arc::new(DnsResolver),
    );

    match config.sync_interval {
        None => run_once(&config, &ctx).await,
        Some(period) => {
            let health_state = Arc::new(HealthState::new());
            let ctx = ctx.with_health_state(health_state.clone());
            run_service(&config, &ctx, health_state, period).await;
            Ok(())
        }
    }
}

/// Single pass: print the outcome and exit non-zero on failure
async fn run_once(config: &Config, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let result = reconcile(config, ctx).await;
    report(&ReconcileOutcome::from(&result))
}

/// Print `outcome` as JSON; a non-success outcome exits with status 1
fn report(outcome: &ReconcileOutcome) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(outcome)?);

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Periodic passes alongside the health server until a shutdown signal arrives
async fn run_service(
    config: &Config,
    ctx: &Context,
    health_state: Arc<HealthState>,
    period: std::time::Duration,
) {
    let health_handle = {
        let health_state = health_state.clone();
        let addr = config.health_addr;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, addr).await {
                error!("Health server error: {}", e);
            }
        })
    };

    tokio::select! {
        _ = run_periodic(config, ctx, period) => {
            error!("Sync loop ended unexpectedly");
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping");
            health_state.set_ready(false).await;
        }
    }

    info!("db-target-sync stopped");
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
