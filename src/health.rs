//! Health server for liveness/readiness probes and Prometheus metrics
//!
//! Only started when passes run periodically. Provides HTTP endpoints for:
//! - `/healthz` - Liveness probe (is the process alive?)
//! - `/readyz` - Readiness probe (has a pass succeeded yet?)
//! - `/metrics` - Prometheus metrics

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::controller::error::Error;
use crate::controller::status::ReconciliationSummary;

/// Labels identifying the target group a pass works on
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PassLabels {
    pub target_group: String,
    pub role: String,
}

impl prometheus_client::encoding::EncodeLabelSet for PassLabels {
    fn encode(
        &self,
        encoder: &mut prometheus_client::encoding::LabelSetEncoder,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("target_group", self.target_group.as_str()).encode(encoder.encode_label())?;
        ("role", self.role.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for failed passes
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ErrorLabels {
    pub target_group: String,
    pub kind: String,
}

impl prometheus_client::encoding::EncodeLabelSet for ErrorLabels {
    fn encode(
        &self,
        encoder: &mut prometheus_client::encoding::LabelSetEncoder,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("target_group", self.target_group.as_str()).encode(encoder.encode_label())?;
        ("kind", self.kind.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics state
pub struct Metrics {
    /// Completed passes
    pub passes_total: Family<PassLabels, Counter>,
    /// Failed passes by error kind
    pub pass_errors_total: Family<ErrorLabels, Counter>,
    /// Pass duration histogram
    pub pass_duration_seconds: Family<PassLabels, Histogram>,
    /// Size of the desired target set after the last successful pass
    pub desired_targets: Family<PassLabels, Gauge>,
    pub targets_registered_total: Family<PassLabels, Counter>,
    pub targets_deregistered_total: Family<PassLabels, Counter>,
    /// Non-fatal anomalies observed
    pub anomalies_total: Family<PassLabels, Counter>,
    /// Completion time of the last successful pass, seconds since the epoch
    pub last_success_timestamp_seconds: Gauge,

    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let passes_total = Family::<PassLabels, Counter>::default();
        registry.register(
            "db_target_sync_passes",
            "Total number of completed reconciliation passes",
            passes_total.clone(),
        );

        let pass_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "db_target_sync_pass_errors",
            "Total number of failed reconciliation passes",
            pass_errors_total.clone(),
        );

        let pass_duration_seconds = Family::<PassLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.01, 2.0, 12))
        });
        registry.register(
            "db_target_sync_pass_duration_seconds",
            "Duration of reconciliation passes in seconds",
            pass_duration_seconds.clone(),
        );

        let desired_targets = Family::<PassLabels, Gauge>::default();
        registry.register(
            "db_target_sync_desired_targets",
            "Number of targets the group should carry",
            desired_targets.clone(),
        );

        let targets_registered_total = Family::<PassLabels, Counter>::default();
        registry.register(
            "db_target_sync_targets_registered",
            "Total number of targets registered",
            targets_registered_total.clone(),
        );

        let targets_deregistered_total = Family::<PassLabels, Counter>::default();
        registry.register(
            "db_target_sync_targets_deregistered",
            "Total number of targets deregistered",
            targets_deregistered_total.clone(),
        );

        let anomalies_total = Family::<PassLabels, Counter>::default();
        registry.register(
            "db_target_sync_anomalies",
            "Total number of non-fatal topology anomalies",
            anomalies_total.clone(),
        );

        let last_success_timestamp_seconds = Gauge::default();
        registry.register(
            "db_target_sync_last_success_timestamp_seconds",
            "Unix time of the last successful reconciliation pass",
            last_success_timestamp_seconds.clone(),
        );

        Self {
            passes_total,
            pass_errors_total,
            pass_duration_seconds,
            desired_targets,
            targets_registered_total,
            targets_deregistered_total,
            anomalies_total,
            last_success_timestamp_seconds,
            registry,
        }
    }

    /// Record a successful pass
    pub fn record_success(&self, summary: &ReconciliationSummary, duration_secs: f64) {
        let labels = PassLabels {
            target_group: summary.target_group.clone(),
            role: summary.role.to_string(),
        };
        self.passes_total.get_or_create(&labels).inc();
        self.pass_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
        self.desired_targets
            .get_or_create(&labels)
            .set(summary.desired.len() as i64);
        self.targets_registered_total
            .get_or_create(&labels)
            .inc_by(summary.registered as u64);
        self.targets_deregistered_total
            .get_or_create(&labels)
            .inc_by(summary.deregistered as u64);
        self.anomalies_total
            .get_or_create(&labels)
            .inc_by(summary.anomalies.len() as u64);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        self.last_success_timestamp_seconds.set(now);
    }

    /// Record a failed pass
    pub fn record_error(&self, target_group: &str, error: &Error) {
        let labels = ErrorLabels {
            target_group: target_group.to_string(),
            kind: error.kind().to_string(),
        };
        self.pass_errors_total.get_or_create(&labels).inc();
    }

    /// Encode metrics to Prometheus text format
    ///
    /// Returns an empty string if encoding fails (should never happen with valid metrics).
    fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether a pass has succeeded and the process is not shutting down
    pub ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }

    /// Record the outcome of a pass; the first success marks the process ready
    pub async fn record_pass(
        &self,
        config: &Config,
        result: &Result<ReconciliationSummary, Error>,
        duration_secs: f64,
    ) {
        match result {
            Ok(summary) => {
                self.metrics.record_success(summary, duration_secs);
                self.set_ready(true).await;
            }
            Err(e) => self.metrics.record_error(&config.target_group, e),
        }
    }
}

/// Liveness probe handler
///
/// Returns 200 OK if the process is alive.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Returns 503 Service Unavailable until the first pass succeeds.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
async fn metrics(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Run the health server on `addr`
pub async fn run_health_server(
    state: Arc<HealthState>,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health server listening on {}", addr);

    axum::serve(listener, app).await
}
