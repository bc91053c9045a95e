use std::sync::{Arc, Mutex};

use crate::config::{DownsamplerConfig, FilterConfig, ProcessorConfig, UnwrapperConfig};
use crate::frame_interface::{InputFrame, SmurfHeader};
use crate::prelude::{lock, ConfigError, FrameError, FrameSink, ProcessorResult, MAX_NUM_CH};
use crate::processing::downsampler::Downsampler;
use crate::processing::filter::FilterBank;
use crate::processing::mapper::{validate_mask, ChannelMapper};
use crate::processing::transmitter::{StagedFrame, Transmitter};
use crate::processing::unwrapper::Unwrapper;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};

/// What happened to a frame that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The output was handed to the transmitter.
    Staged,
    /// The downsampler held the output back.
    Suppressed,
}

/// Map, unwrap, filter and downsample pipeline feeding a transmitter thread.
///
/// `process` must not be called concurrently with itself; every other method
/// may be called from any thread at any time. Locks are always taken in the
/// order mapper, unwrapper, filter, downsampler.
pub struct SmurfProcessor {
    mapper: Mutex<ChannelMapper>,
    unwrapper: Mutex<Unwrapper>,
    filter: Mutex<FilterBank>,
    downsampler: Mutex<Downsampler>,
    transmitter: Transmitter,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl SmurfProcessor {
    pub fn new<S: FrameSink>(sink: S) -> ProcessorResult<Self> {
        let metrics = Arc::new(MetricsRecorder::new());
        let transmitter = Transmitter::spawn(sink, metrics.clone())?;
        Ok(Self {
            mapper: Mutex::new(ChannelMapper::new()),
            unwrapper: Mutex::new(Unwrapper::new(MAX_NUM_CH)),
            filter: Mutex::new(FilterBank::new(MAX_NUM_CH)),
            downsampler: Mutex::new(Downsampler::new()),
            transmitter,
            metrics,
            logger: LogManager::default(),
        })
    }

    pub fn with_config<S: FrameSink>(config: &ProcessorConfig, sink: S) -> ProcessorResult<Self> {
        let processor = Self::new(sink)?;
        processor.apply_config(config)?;
        Ok(processor)
    }

    /// Runs one input frame through the pipeline.
    ///
    /// Malformed frames are logged and dropped without touching any state.
    pub fn process(&self, frame: &InputFrame) -> Result<Disposition, FrameError> {
        self.metrics.record_received();
        let result = self.run_pipeline(frame);
        match &result {
            Ok(Disposition::Suppressed) => self.metrics.record_suppressed(),
            Ok(Disposition::Staged) => {}
            Err(err) => {
                self.metrics.record_rejected();
                self.logger.error(&format!("Dropping received frame: {}", err));
            }
        }
        result
    }

    fn run_pipeline(&self, frame: &InputFrame) -> Result<Disposition, FrameError> {
        let valid = frame.validate()?;

        // Held for the whole chain so the channel count can not change mid-frame.
        let mapper = lock(&self.mapper);
        let mut unwrapper = lock(&self.unwrapper);
        let unwrapped = unwrapper.ingest(mapper.samples(&valid.words))?;

        let mut header = SmurfHeader::from_bytes(valid.header.to_owned_bytes());
        header.set_number_of_channels(mapper.num_ch() as u32);

        let mut filter = lock(&self.filter);
        filter.apply(unwrapped);

        if !lock(&self.downsampler).tick() {
            return Ok(Disposition::Suppressed);
        }

        let data = filter.output(unwrapped);
        drop(filter);
        drop(unwrapper);
        drop(mapper);

        self.transmitter.stage(StagedFrame {
            header: header.into_inner(),
            data,
        });
        Ok(Disposition::Staged)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn num_ch(&self) -> usize {
        lock(&self.mapper).num_ch()
    }

    pub fn payload_size(&self) -> usize {
        self.transmitter.payload_size()
    }

    pub fn set_payload_size(&self, size: usize) {
        self.transmitter.set_payload_size(size);
    }

    pub fn mask(&self) -> Vec<usize> {
        lock(&self.mapper).mask().to_vec()
    }

    /// Replaces the channel mask; a new channel count resets unwrapper and filter.
    pub fn set_mask(&self, mask: Vec<usize>) -> Result<(), ConfigError> {
        let mut mapper = lock(&self.mapper);
        match mapper.set_mask(mask) {
            Ok(true) => {
                let channels = mapper.num_ch();
                lock(&self.unwrapper).resize(channels);
                lock(&self.filter).resize(channels);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) => {
                self.logger.error(&format!("Mask not updated: {}", err));
                Err(err)
            }
        }
    }

    pub fn unwrapper_enabled(&self) -> bool {
        lock(&self.unwrapper).is_enabled()
    }

    pub fn set_unwrapper_enabled(&self, enabled: bool) {
        lock(&self.unwrapper).set_enabled(enabled);
    }

    pub fn reset_unwrapper(&self) {
        lock(&self.unwrapper).reset();
    }

    pub fn filter_enabled(&self) -> bool {
        lock(&self.filter).is_enabled()
    }

    pub fn set_filter_enabled(&self, enabled: bool) {
        lock(&self.filter).set_enabled(enabled);
    }

    pub fn order(&self) -> usize {
        lock(&self.filter).order()
    }

    pub fn set_order(&self, order: usize) {
        lock(&self.filter).set_order(order);
    }

    pub fn a(&self) -> Vec<f64> {
        lock(&self.filter).a().to_vec()
    }

    pub fn set_a(&self, a: Vec<f64>) {
        lock(&self.filter).set_a(a);
    }

    pub fn b(&self) -> Vec<f64> {
        lock(&self.filter).b().to_vec()
    }

    pub fn set_b(&self, b: Vec<f64>) {
        lock(&self.filter).set_b(b);
    }

    pub fn gain(&self) -> f64 {
        lock(&self.filter).gain()
    }

    pub fn set_gain(&self, gain: f64) {
        lock(&self.filter).set_gain(gain);
    }

    pub fn reset_filter(&self) {
        lock(&self.filter).reset();
    }

    pub fn downsampler_enabled(&self) -> bool {
        lock(&self.downsampler).is_enabled()
    }

    pub fn set_downsampler_enabled(&self, enabled: bool) {
        lock(&self.downsampler).set_enabled(enabled);
    }

    pub fn factor(&self) -> usize {
        lock(&self.downsampler).factor()
    }

    pub fn set_factor(&self, factor: usize) -> Result<(), ConfigError> {
        lock(&self.downsampler).set_factor(factor).map_err(|err| {
            self.logger.error(&format!("Factor not updated: {}", err));
            err
        })
    }

    pub fn reset_downsampler(&self) {
        lock(&self.downsampler).reset();
    }

    /// Current settings, as they would be read back through the getters.
    pub fn config(&self) -> ProcessorConfig {
        let mask = self.mask();
        let unwrapper = UnwrapperConfig {
            enabled: self.unwrapper_enabled(),
        };
        let filter = lock(&self.filter);
        let downsampler = lock(&self.downsampler);
        ProcessorConfig {
            payload_size: self.payload_size(),
            mask,
            unwrapper,
            filter: FilterConfig {
                enabled: filter.is_enabled(),
                order: filter.order(),
                a: filter.a().to_vec(),
                b: filter.b().to_vec(),
                gain: filter.gain(),
            },
            downsampler: DownsamplerConfig {
                enabled: downsampler.is_enabled(),
                factor: downsampler.factor(),
            },
        }
    }

    /// Pushes every setting of `config` through the validated setters.
    ///
    /// A config with an invalid mask or factor is rejected before anything
    /// is applied.
    pub fn apply_config(&self, config: &ProcessorConfig) -> Result<(), ConfigError> {
        let checked = validate_mask(&config.mask).and_then(|()| {
            if config.downsampler.factor == 0 {
                Err(ConfigError::ZeroFactor)
            } else {
                Ok(())
            }
        });
        if let Err(err) = checked {
            self.logger.error(&format!("Config not applied: {}", err));
            return Err(err);
        }

        self.set_mask(config.mask.clone())?;
        self.set_factor(config.downsampler.factor)?;
        self.set_payload_size(config.payload_size);
        self.set_unwrapper_enabled(config.unwrapper.enabled);

        let mut filter = lock(&self.filter);
        filter.set_enabled(config.filter.enabled);
        filter.set_order(config.filter.order);
        filter.set_a(config.filter.a.clone());
        filter.set_b(config.filter.b.clone());
        filter.set_gain(config.filter.gain);
        drop(filter);

        self.set_downsampler_enabled(config.downsampler.enabled);
        Ok(())
    }

    /// Stops the transmitter thread; frames staged afterwards are never sent.
    pub fn shutdown(&mut self) -> ProcessorResult<()> {
        self.transmitter.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_interface::HEADER_SIZE;
    use crate::prelude::{RawWord, OUTPUT_WORD_SIZE};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn frame(words: &[(usize, RawWord)], counter: u32) -> InputFrame {
        let mut header = SmurfHeader::blank();
        header.set_number_of_channels(MAX_NUM_CH as u32);
        header.set_crate_id(3);
        header.set_frame_counter(counter);
        let mut payload = header.to_owned_bytes().to_vec();
        payload.resize(HEADER_SIZE + MAX_NUM_CH * 2, 0);
        for &(index, value) in words {
            let offset = HEADER_SIZE + index * 2;
            payload[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }
        InputFrame::new(payload)
    }

    fn plain_processor() -> (SmurfProcessor, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        let processor = SmurfProcessor::new(tx).unwrap();
        processor.set_filter_enabled(false);
        processor.set_downsampler_enabled(false);
        (processor, rx)
    }

    fn words(out: &[u8]) -> Vec<i32> {
        out[HEADER_SIZE..]
            .chunks_exact(OUTPUT_WORD_SIZE)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn end_to_end_mask_selects_raw_words() {
        let (processor, rx) = plain_processor();
        processor.set_mask(vec![0, 1]).unwrap();

        let input = frame(&[(0, 1234), (1, -42), (2, 999)], 17);
        assert_eq!(processor.process(&input).unwrap(), Disposition::Staged);

        let out = rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(out.len(), HEADER_SIZE + 2 * OUTPUT_WORD_SIZE);
        let header = SmurfHeader::new(out.as_slice()).unwrap();
        assert_eq!(header.number_of_channels(), 2);
        assert_eq!(header.crate_id(), 3);
        assert_eq!(header.frame_counter(), 17);
        assert_eq!(words(&out), vec![1234, -42]);
    }

    #[test]
    fn mask_order_defines_output_channels() {
        let (processor, rx) = plain_processor();
        processor.set_payload_size(4);
        processor.set_mask(vec![9, 4095, 9]).unwrap();
        processor
            .process(&frame(&[(9, -7), (4095, 300)], 0))
            .unwrap();

        let out = rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(words(&out), vec![-7, 300, -7, 0]);
    }

    #[test]
    fn unwrapped_values_reach_the_output() {
        let (processor, rx) = plain_processor();
        processor.set_mask(vec![5]).unwrap();
        processor.process(&frame(&[(5, 30000)], 0)).unwrap();
        assert_eq!(words(&rx.recv_timeout(RECV_TIMEOUT).unwrap()), vec![30000]);

        processor.process(&frame(&[(5, -30000)], 1)).unwrap();
        assert_eq!(
            words(&rx.recv_timeout(RECV_TIMEOUT).unwrap()),
            vec![-30000 + 65536]
        );
    }

    #[test]
    fn identity_filter_passes_unwrapped_values() {
        let (processor, rx) = plain_processor();
        processor.set_mask(vec![0, 1]).unwrap();
        processor.set_filter_enabled(true);
        processor.set_order(0);
        processor.set_a(vec![1.0]);
        processor.set_b(vec![1.0]);
        processor.set_gain(1.0);

        processor.process(&frame(&[(0, -5), (1, 25000)], 0)).unwrap();
        assert_eq!(words(&rx.recv_timeout(RECV_TIMEOUT).unwrap()), vec![-5, 25000]);
    }

    #[test]
    fn downsampler_stages_every_third_frame() {
        let (processor, _rx) = plain_processor();
        processor.set_mask(vec![0]).unwrap();
        processor.set_downsampler_enabled(true);
        processor.set_factor(3).unwrap();

        let dispositions: Vec<_> = (0..9)
            .map(|i| processor.process(&frame(&[(0, i as RawWord)], i)).unwrap())
            .collect();
        let staged: Vec<usize> = dispositions
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == Disposition::Staged)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(staged, vec![2, 5, 8]);

        let metrics = processor.metrics();
        assert_eq!(metrics.staged, 3);
        assert_eq!(metrics.suppressed, 6);
    }

    #[test]
    fn valid_mask_resets_unwrap_and_filter_state() {
        let (tx, _rx) = mpsc::channel();
        let processor = SmurfProcessor::new(tx).unwrap();
        processor.set_mask(vec![0, 1, 2]).unwrap();
        processor.process(&frame(&[(0, 30000), (1, 10)], 0)).unwrap();
        processor.process(&frame(&[(0, -30000), (1, 20)], 1)).unwrap();
        assert_eq!(lock(&processor.unwrapper).wrap_counters()[0], 65536);

        processor.set_mask(vec![3, 2]).unwrap();
        assert_eq!(processor.num_ch(), 2);
        let unwrapper = lock(&processor.unwrapper);
        assert_eq!(unwrapper.wrap_counters(), &[0, 0]);
        assert_eq!(unwrapper.unwrapped(), &[0, 0]);
        drop(unwrapper);

        let filter = lock(&processor.filter);
        assert_eq!(filter.history().channels(), 2);
        assert_eq!(filter.history().cursor(), 0);
        assert!(filter.history().latest_outputs().all(|y| y == 0.0));
    }

    #[test]
    fn invalid_mask_is_a_no_op() {
        let (tx, _rx) = mpsc::channel();
        let processor = SmurfProcessor::new(tx).unwrap();
        processor.set_mask(vec![1, 2]).unwrap();

        let err = processor.set_mask(vec![0, 1, MAX_NUM_CH + 3]).unwrap_err();
        assert!(matches!(err, ConfigError::MaskEntryOutOfRange { index: 2, .. }));
        assert_eq!(processor.mask(), vec![1, 2]);
        assert_eq!(processor.num_ch(), 2);
    }

    #[test]
    fn rejected_frames_leave_state_unchanged() {
        let (processor, _rx) = plain_processor();
        processor.set_mask(vec![0]).unwrap();
        processor.process(&frame(&[(0, 30000)], 0)).unwrap();

        let errored = frame(&[(0, -30000)], 1).with_error(1);
        assert_eq!(processor.process(&errored), Err(FrameError::ErrorFlag(1)));
        let flagged = frame(&[(0, -30000)], 1).with_flags(0x100);
        assert!(processor.process(&flagged).is_err());

        assert_eq!(lock(&processor.unwrapper).unwrapped(), &[30000]);
        let metrics = processor.metrics();
        assert_eq!(metrics.received, 3);
        assert_eq!(metrics.rejected, 2);
    }

    #[test]
    fn zero_factor_keeps_previous_factor() {
        let (tx, _rx) = mpsc::channel();
        let processor = SmurfProcessor::new(tx).unwrap();
        processor.set_factor(7).unwrap();
        assert_eq!(processor.set_factor(0), Err(ConfigError::ZeroFactor));
        assert_eq!(processor.factor(), 7);
    }

    #[test]
    fn config_round_trips_through_getters() {
        let config = ProcessorConfig {
            payload_size: 16,
            mask: vec![4, 5, 6],
            unwrapper: UnwrapperConfig { enabled: false },
            filter: FilterConfig {
                enabled: true,
                order: 2,
                a: vec![1.0, -0.5, 0.25],
                b: vec![0.5, 0.5, 0.0],
                gain: 2.0,
            },
            downsampler: DownsamplerConfig {
                enabled: false,
                factor: 4,
            },
        };
        let (tx, _rx) = mpsc::channel();
        let processor = SmurfProcessor::with_config(&config, tx).unwrap();
        assert_eq!(processor.config(), config);
    }

    #[test]
    fn rejected_config_changes_nothing() {
        let (processor, _rx) = plain_processor();
        processor.set_mask(vec![1, 2]).unwrap();
        processor.set_factor(1).unwrap();
        processor.process(&frame(&[(1, 30000), (2, 7)], 0)).unwrap();
        let before = processor.config();

        let mut config = before.clone();
        config.mask = vec![7, 8, 9];
        config.downsampler.factor = 0;
        config.filter.gain = 9.0;
        assert_eq!(processor.apply_config(&config), Err(ConfigError::ZeroFactor));

        let mut config = before.clone();
        config.mask = vec![7, MAX_NUM_CH];
        assert!(matches!(
            processor.apply_config(&config),
            Err(ConfigError::MaskEntryOutOfRange { index: 1, .. })
        ));

        assert_eq!(processor.config(), before);
        assert_eq!(lock(&processor.unwrapper).unwrapped(), &[30000, 7]);
    }

    #[test]
    fn order_changes_during_processing_keep_buffers_consistent() {
        let (tx, _rx) = mpsc::channel();
        let processor = Arc::new(SmurfProcessor::new(tx).unwrap());
        processor.set_mask((0..64).collect()).unwrap();
        processor.set_downsampler_enabled(false);

        let control = processor.clone();
        let reconfigure = thread::spawn(move || {
            for i in 0..200 {
                control.set_order(i % 7);
                if i % 50 == 0 {
                    control.set_mask((0..(32 + i % 3)).collect()).unwrap();
                }
            }
        });

        for i in 0..200u32 {
            let input = frame(&[(0, (i * 300) as RawWord), (63, -(i as RawWord))], i);
            processor.process(&input).unwrap();
        }
        reconfigure.join().unwrap();

        let channels = processor.num_ch();
        let filter = lock(&processor.filter);
        assert_eq!(filter.history().slots(), filter.order() + 1);
        assert_eq!(filter.history().channels(), channels);
    }
}
