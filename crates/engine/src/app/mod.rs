mod keyboard;
mod loop_runner;
mod metrics;
mod rendering;

pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{OverlayData, Renderer};
