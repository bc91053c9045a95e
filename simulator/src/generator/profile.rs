use anyhow::ensure;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smurfcore::frame_interface::{InputFrame, HEADER_SIZE};
use smurfcore::prelude::{RawWord, MAX_NUM_CH, RAW_WORD_SIZE};
use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::generator::template::HeaderTemplate;

/// Configuration for generating synthetic readout frames.
///
/// Each channel carries a linear phase drift plus a tone plus noise; the sum
/// is wrapped into the raw word, so drifting channels exercise the unwrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub channels: usize,
    /// Phase drift per frame, in raw counts, for channel 0.
    pub drift: f64,
    pub amplitude: f64,
    /// Tone frequency in cycles per frame.
    pub tone: f64,
    pub noise: f64,
    pub seed: u64,
    pub crate_id: u8,
    pub slot_number: u8,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            channels: MAX_NUM_CH,
            drift: 1500.0,
            amplitude: 4000.0,
            tone: 0.05,
            noise: 50.0,
            seed: 0,
            crate_id: 1,
            slot_number: 2,
        }
    }
}

/// Produces consecutive frames with continuous per-channel phase.
pub struct FrameGenerator {
    config: GeneratorConfig,
    template: HeaderTemplate,
    rng: StdRng,
    frame_counter: u32,
}

impl FrameGenerator {
    pub fn new(config: GeneratorConfig) -> anyhow::Result<Self> {
        ensure!(
            config.channels >= MAX_NUM_CH,
            "generator needs at least {} channels, got {}",
            MAX_NUM_CH,
            config.channels
        );
        let channels = u32::try_from(config.channels)?;
        let template = HeaderTemplate {
            version: 1,
            crate_id: config.crate_id,
            slot_number: config.slot_number,
            channels,
        };
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            template,
            rng,
            frame_counter: 0,
        })
    }

    /// Continuous (not wrapped) phase of `channel` at frame `n`.
    pub fn phase(&self, channel: usize, n: u32) -> f64 {
        let n = f64::from(n);
        let drift = self.config.drift * (1 + channel % 4) as f64 * n;
        let tone = self.config.amplitude
            * (2.0 * PI * self.config.tone * n + channel as f64 * 0.01).sin();
        drift + tone
    }

    pub fn next_frame(&mut self) -> InputFrame {
        let n = self.frame_counter;
        let header = self.template.render(n, unix_time_ns());

        let mut payload = Vec::with_capacity(HEADER_SIZE + self.config.channels * RAW_WORD_SIZE);
        payload.extend_from_slice(&header);
        for channel in 0..self.config.channels {
            let jitter = if self.config.noise > 0.0 {
                self.rng.gen_range(-self.config.noise..self.config.noise)
            } else {
                0.0
            };
            payload.extend_from_slice(&wrap(self.phase(channel, n) + jitter).to_le_bytes());
        }

        self.frame_counter = self.frame_counter.wrapping_add(1);
        InputFrame::new(payload)
    }
}

/// Folds a continuous value into the raw word range, two's complement style.
pub fn wrap(value: f64) -> RawWord {
    value.round() as i64 as RawWord
}

fn unix_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}
