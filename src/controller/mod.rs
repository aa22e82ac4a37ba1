pub mod context;
pub mod error;
pub mod reconciler;
pub mod status;
pub mod target_group;
pub mod target_set;

pub use context::Context;
pub use error::{Error, Result};
pub use reconciler::reconcile;
pub use status::{Anomaly, ReconcileOutcome, ReconciliationSummary, status_codes};
pub use target_group::ReconciliationPlan;
pub use target_set::{DesiredTargets, TargetSet};
