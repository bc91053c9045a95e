use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::prelude::ConfigError;
use crate::processing::SmurfProcessor;

/// One control-plane operation, as received from an external controller.
///
/// Serialized as JSON objects tagged by `op`, e.g.
/// `{"op": "set_mask", "mask": [0, 1]}` or `{"op": "reset_filter"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlCommand {
    SetPayloadSize { size: usize },
    SetMask { mask: Vec<usize> },
    SetUnwrapperEnabled { enabled: bool },
    ResetUnwrapper,
    SetFilterEnabled { enabled: bool },
    SetOrder { order: usize },
    SetA { a: Vec<f64> },
    SetB { b: Vec<f64> },
    SetGain { gain: f64 },
    ResetFilter,
    SetDownsamplerEnabled { enabled: bool },
    SetFactor { factor: usize },
    ResetDownsampler,
}

impl ControlCommand {
    pub fn apply(self, processor: &SmurfProcessor) -> Result<(), ConfigError> {
        match self {
            ControlCommand::SetPayloadSize { size } => processor.set_payload_size(size),
            ControlCommand::SetMask { mask } => processor.set_mask(mask)?,
            ControlCommand::SetUnwrapperEnabled { enabled } => {
                processor.set_unwrapper_enabled(enabled)
            }
            ControlCommand::ResetUnwrapper => processor.reset_unwrapper(),
            ControlCommand::SetFilterEnabled { enabled } => processor.set_filter_enabled(enabled),
            ControlCommand::SetOrder { order } => processor.set_order(order),
            ControlCommand::SetA { a } => processor.set_a(a),
            ControlCommand::SetB { b } => processor.set_b(b),
            ControlCommand::SetGain { gain } => processor.set_gain(gain),
            ControlCommand::ResetFilter => processor.reset_filter(),
            ControlCommand::SetDownsamplerEnabled { enabled } => {
                processor.set_downsampler_enabled(enabled)
            }
            ControlCommand::SetFactor { factor } => processor.set_factor(factor)?,
            ControlCommand::ResetDownsampler => processor.reset_downsampler(),
        }
        Ok(())
    }
}

impl FromStr for ControlCommand {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|err| ConfigError::InvalidCommand(err.to_string()))
    }
}
