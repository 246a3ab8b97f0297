mod loop_runner;
mod metrics;

pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, LoopConfig, RunSummary, StopReason,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
