use serde::{Deserialize, Serialize};

use crate::prelude::MAX_NUM_CH;
use crate::processing::downsampler::DEFAULT_FACTOR;
use crate::processing::filter::{DEFAULT_GAIN, DEFAULT_ORDER};

/// Complete set of control-plane settings of a processor.
///
/// Missing fields take the same defaults as a freshly built processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub payload_size: usize,
    pub mask: Vec<usize>,
    pub unwrapper: UnwrapperConfig,
    pub filter: FilterConfig,
    pub downsampler: DownsamplerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnwrapperConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub order: usize,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    pub gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownsamplerConfig {
    pub enabled: bool,
    pub factor: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            payload_size: 0,
            mask: vec![0; MAX_NUM_CH],
            unwrapper: UnwrapperConfig::default(),
            filter: FilterConfig::default(),
            downsampler: DownsamplerConfig::default(),
        }
    }
}

impl Default for UnwrapperConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: DEFAULT_ORDER,
            a: vec![1.0; DEFAULT_ORDER + 1],
            b: vec![1.0; DEFAULT_ORDER + 1],
            gain: DEFAULT_GAIN,
        }
    }
}

impl Default for DownsamplerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: DEFAULT_FACTOR,
        }
    }
}
