pub mod log;
pub mod metrics;

pub use log::{LogManager, PROCESSOR_TARGET};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
