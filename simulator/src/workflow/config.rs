use anyhow::Context;
use serde::{Deserialize, Serialize};
use smurfcore::ProcessorConfig;
use std::fs;
use std::path::Path;

use crate::generator::profile::GeneratorConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of frames fed through the processor in an offline run.
    pub frames: usize,
    /// Pause between frames while serving.
    pub frame_interval_ms: u64,
    /// Output channel whose spectrum is reported.
    pub report_channel: usize,
    pub processor: ProcessorConfig,
    pub generator: GeneratorConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            frames: 400,
            frame_interval_ms: 1,
            report_channel: 0,
            processor: ProcessorConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Workflow mapping the first `channels` input channels in order.
    pub fn from_args(frames: usize, channels: usize, factor: usize) -> Self {
        let mut config = Self {
            frames,
            ..Default::default()
        };
        config.processor.mask = (0..channels).collect();
        config.processor.downsampler.factor = factor;
        config
    }
}
