use serde::Serialize;
use smurfcore::telemetry::MetricsSnapshot;
use smurfcore::SmurfProcessor;

/// Read-only view served on `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusModel {
    pub num_ch: usize,
    pub payload_size: usize,
    pub unwrapper_enabled: bool,
    pub filter_enabled: bool,
    pub downsampler_enabled: bool,
    pub metrics: MetricsSnapshot,
}

impl StatusModel {
    pub fn capture(processor: &SmurfProcessor) -> Self {
        Self {
            num_ch: processor.num_ch(),
            payload_size: processor.payload_size(),
            unwrapper_enabled: processor.unwrapper_enabled(),
            filter_enabled: processor.filter_enabled(),
            downsampler_enabled: processor.downsampler_enabled(),
            metrics: processor.metrics(),
        }
    }
}
