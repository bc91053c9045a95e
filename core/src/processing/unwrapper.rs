use crate::prelude::{FrameError, RawWord, UnwrapWord};

/// A sample above this value following one below `LOWER_UNWRAP` is a wrap.
pub const UPPER_UNWRAP: RawWord = 0x6000;
pub const LOWER_UNWRAP: RawWord = -0x6000;
/// Full dynamic range of the raw word.
pub const STEP_UNWRAP: UnwrapWord = 0x10000;

/// Per-channel phase unwrapper with persistent wrap counters.
#[derive(Debug, Clone)]
pub struct Unwrapper {
    enabled: bool,
    current: Vec<RawWord>,
    previous: Vec<RawWord>,
    incoming: Vec<RawWord>,
    wrap_counter: Vec<UnwrapWord>,
    unwrapped: Vec<UnwrapWord>,
}

impl Unwrapper {
    pub fn new(channels: usize) -> Self {
        Self {
            enabled: true,
            current: vec![0; channels],
            previous: vec![0; channels],
            incoming: vec![0; channels],
            wrap_counter: vec![0; channels],
            unwrapped: vec![0; channels],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Re-enabling starts again from a clean state.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.reset();
        }
    }

    pub fn channels(&self) -> usize {
        self.current.len()
    }

    /// Zeroes all per-channel state, keeping the channel count.
    pub fn reset(&mut self) {
        self.resize(self.channels());
    }

    /// Resizes to `channels` and zeroes all per-channel state.
    pub fn resize(&mut self, channels: usize) {
        let enabled = self.enabled;
        *self = Self::new(channels);
        self.enabled = enabled;
    }

    /// Consumes one frame worth of mapped samples.
    ///
    /// The samples are committed only if all of them were read successfully,
    /// so a failed read leaves the unwrap history untouched.
    pub fn ingest<I>(&mut self, samples: I) -> Result<&[UnwrapWord], FrameError>
    where
        I: IntoIterator<Item = Result<RawWord, FrameError>>,
    {
        for (slot, sample) in self.incoming.iter_mut().zip(samples) {
            *slot = sample?;
        }
        std::mem::swap(&mut self.previous, &mut self.current);
        std::mem::swap(&mut self.current, &mut self.incoming);

        let channels = self
            .current
            .iter()
            .zip(&self.previous)
            .zip(self.wrap_counter.iter_mut())
            .zip(self.unwrapped.iter_mut());
        for (((&current, &previous), wrap), unwrapped) in channels {
            *unwrapped = UnwrapWord::from(current);
            if self.enabled {
                if current > UPPER_UNWRAP && previous < LOWER_UNWRAP {
                    *wrap = wrap.wrapping_sub(STEP_UNWRAP);
                } else if current < LOWER_UNWRAP && previous > UPPER_UNWRAP {
                    *wrap = wrap.wrapping_add(STEP_UNWRAP);
                }
                *unwrapped = unwrapped.wrapping_add(*wrap);
            }
        }
        Ok(&self.unwrapped)
    }

    pub fn unwrapped(&self) -> &[UnwrapWord] {
        &self.unwrapped
    }

    pub fn wrap_counters(&self) -> &[UnwrapWord] {
        &self.wrap_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(unwrapper: &mut Unwrapper, samples: &[RawWord]) -> Vec<UnwrapWord> {
        unwrapper
            .ingest(samples.iter().copied().map(Ok))
            .unwrap()
            .to_vec()
    }

    #[test]
    fn positive_to_negative_jump_counts_upward_wrap() {
        let mut unwrapper = Unwrapper::new(1);
        feed(&mut unwrapper, &[RawWord::MAX]);
        let out = feed(&mut unwrapper, &[RawWord::MIN]);
        assert_eq!(unwrapper.wrap_counters(), &[2 * 32768]);
        assert_eq!(out, vec![i32::from(RawWord::MIN) + 65536]);
    }

    #[test]
    fn one_way_drift_wraps_the_counter_instead_of_overflowing() {
        let mut unwrapper = Unwrapper::new(1);
        let cycles = 40_000;
        for _ in 0..cycles {
            for sample in [30000, -30000, -10000, 10000] {
                feed(&mut unwrapper, &[sample]);
            }
        }
        let counter = STEP_UNWRAP.wrapping_mul(cycles);
        assert!(counter < 0);
        assert_eq!(unwrapper.wrap_counters(), &[counter]);
        assert_eq!(unwrapper.unwrapped(), &[counter.wrapping_add(10000)]);
    }

    #[test]
    fn negative_to_positive_jump_counts_downward_wrap() {
        let mut unwrapper = Unwrapper::new(1);
        feed(&mut unwrapper, &[RawWord::MIN]);
        let out = feed(&mut unwrapper, &[RawWord::MAX]);
        assert_eq!(unwrapper.wrap_counters(), &[-65536]);
        assert_eq!(out, vec![i32::from(RawWord::MAX) - 65536]);
    }

    #[test]
    fn jumps_within_thresholds_do_not_wrap() {
        let mut unwrapper = Unwrapper::new(3);
        feed(&mut unwrapper, &[0x6000, -0x6001, 20000]);
        feed(&mut unwrapper, &[-0x7000, 0x7000, -20000]);
        assert_eq!(unwrapper.wrap_counters(), &[0, 0, 0]);
    }

    #[test]
    fn wrap_trajectory_is_deterministic() {
        let sequence: [&[RawWord]; 4] = [&[30000], &[-30000], &[-1000], &[30000]];
        let run = || {
            let mut unwrapper = Unwrapper::new(1);
            sequence
                .iter()
                .map(|s| {
                    feed(&mut unwrapper, s);
                    unwrapper.wrap_counters()[0]
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), vec![0, 65536, 65536, 65536]);
        assert_eq!(run(), run());
    }

    #[test]
    fn disabled_unwrapper_passes_raw_values_and_freezes_counter() {
        let mut unwrapper = Unwrapper::new(1);
        feed(&mut unwrapper, &[30000]);
        feed(&mut unwrapper, &[-30000]);
        unwrapper.set_enabled(false);

        feed(&mut unwrapper, &[30000]);
        let out = feed(&mut unwrapper, &[-30000]);
        assert_eq!(out, vec![-30000]);
        assert_eq!(unwrapper.wrap_counters(), &[65536]);

        unwrapper.set_enabled(true);
        assert_eq!(unwrapper.wrap_counters(), &[0]);
        assert!(unwrapper.is_enabled());
    }

    #[test]
    fn failed_reads_leave_history_untouched() {
        let mut unwrapper = Unwrapper::new(2);
        feed(&mut unwrapper, &[100, 200]);
        let result = unwrapper.ingest(vec![Ok(5), Err(FrameError::WordOutOfRange { index: 9 })]);
        assert!(result.is_err());
        assert_eq!(unwrapper.unwrapped(), &[100, 200]);
    }

    #[test]
    fn resize_keeps_enable_flag() {
        let mut unwrapper = Unwrapper::new(2);
        unwrapper.set_enabled(false);
        unwrapper.resize(5);
        assert_eq!(unwrapper.channels(), 5);
        assert!(!unwrapper.is_enabled());
    }
}
