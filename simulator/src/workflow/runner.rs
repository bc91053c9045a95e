use crate::generator::profile::FrameGenerator;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::warn;
use smurfcore::math::{FftHelper, StatsHelper};
use smurfcore::telemetry::MetricsSnapshot;
use smurfcore::{ControlCommand, Disposition, SmurfHeader, SmurfProcessor, HEADER_SIZE};
use std::sync::mpsc;
use std::time::Duration;

/// How long an offline run waits for the transmitter to emit a staged frame.
const OUTPUT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WorkflowResult {
    pub frames_in: usize,
    pub frames_out: usize,
    pub output_channels: usize,
    pub channel_rms: Vec<f64>,
    pub dominant_bin: Option<usize>,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    commands: Vec<ControlCommand>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            commands: Vec::new(),
        }
    }

    /// Control commands applied after the configuration, in order.
    pub fn with_commands(mut self, commands: Vec<ControlCommand>) -> Self {
        self.commands = commands;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Builds a processor wired to `sink`, configured and scripted.
    pub fn build_processor<S: smurfcore::FrameSink>(&self, sink: S) -> anyhow::Result<SmurfProcessor> {
        let processor = SmurfProcessor::with_config(&self.config.processor, sink)
            .context("building processor")?;
        for command in &self.commands {
            command
                .clone()
                .apply(&processor)
                .with_context(|| format!("applying control command {:?}", command))?;
        }
        Ok(processor)
    }

    /// Feeds the configured number of frames, waiting for every emitted
    /// frame before producing the next so that none is superseded.
    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let (sink, outputs) = mpsc::channel();
        let mut processor = self.build_processor(sink)?;
        let mut generator =
            FrameGenerator::new(self.config.generator.clone()).context("building generator")?;

        let mut series: Vec<Vec<f64>> = Vec::new();
        for _ in 0..self.config.frames {
            let frame = generator.next_frame();
            match processor.process(&frame) {
                Ok(Disposition::Staged) => {
                    let out = outputs
                        .recv_timeout(OUTPUT_TIMEOUT)
                        .context("waiting for transmitted frame")?;
                    collect_channels(&out, &mut series)?;
                }
                Ok(Disposition::Suppressed) => {}
                Err(err) => warn!("generated frame rejected: {}", err),
            }
        }
        processor.shutdown().context("stopping transmitter")?;

        let channel_rms = series.iter().map(|s| StatsHelper::ac_rms(s)).collect();
        let dominant_bin = series.get(self.config.report_channel).and_then(|samples| {
            let fft = FftHelper::new(samples.len());
            fft.dominant_bin(samples)
        });

        Ok(WorkflowResult {
            frames_in: self.config.frames,
            frames_out: series.first().map(Vec::len).unwrap_or_default(),
            output_channels: series.len(),
            channel_rms,
            dominant_bin,
            metrics: processor.metrics(),
        })
    }
}

/// Appends each output channel of `frame` to its time series.
fn collect_channels(frame: &[u8], series: &mut Vec<Vec<f64>>) -> anyhow::Result<()> {
    let header = SmurfHeader::new(frame).context("decoding output header")?;
    let channels = header.number_of_channels() as usize;
    if series.len() != channels {
        series.clear();
        series.resize(channels, Vec::new());
    }
    let words = frame[HEADER_SIZE..].chunks_exact(4).take(channels);
    for (samples, word) in series.iter_mut().zip(words) {
        samples.push(f64::from(i32::from_le_bytes([word[0], word[1], word[2], word[3]])));
    }
    Ok(())
}
