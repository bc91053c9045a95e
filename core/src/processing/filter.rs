use crate::prelude::{OutputWord, UnwrapWord};
use crate::processing::history::FilterHistory;
use crate::telemetry::LogManager;

pub const DEFAULT_ORDER: usize = 4;
pub const DEFAULT_GAIN: f64 = 1.0;

/// Bank of identical direct-form IIR filters, one per channel.
///
/// All channels share the coefficients and a common circular time axis.
#[derive(Debug, Clone)]
pub struct FilterBank {
    enabled: bool,
    order: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    gain: f64,
    channels: usize,
    history: FilterHistory,
    logger: LogManager,
}

impl FilterBank {
    pub fn new(channels: usize) -> Self {
        let mut bank = Self {
            enabled: true,
            order: DEFAULT_ORDER,
            a: vec![1.0; DEFAULT_ORDER + 1],
            b: vec![1.0; DEFAULT_ORDER + 1],
            gain: DEFAULT_GAIN,
            channels,
            history: FilterHistory::new(DEFAULT_ORDER + 1, channels),
            logger: LogManager::default(),
        };
        bank.reset();
        bank
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.reset();
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn set_order(&mut self, order: usize) {
        if order != self.order {
            self.order = order;
            self.reset();
        }
    }

    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Sets the feedback coefficients; `a[0]` must be non-zero.
    pub fn set_a(&mut self, a: Vec<f64>) {
        self.a = match a.first() {
            None => {
                self.logger
                    .error("Trying to set an empty set of a coefficients. Defaulting to 'a = [1.0]'");
                vec![1.0]
            }
            Some(&first) if first == 0.0 => {
                self.logger
                    .error("The first a coefficient can not be zero. Defaulting to 'a = [1.0]'");
                vec![1.0]
            }
            Some(_) => a,
        };
        self.reset();
    }

    pub fn b(&self) -> &[f64] {
        &self.b
    }

    pub fn set_b(&mut self, b: Vec<f64>) {
        self.b = if b.is_empty() {
            self.logger
                .error("Trying to set an empty set of b coefficients. Defaulting to 'b = [0.0]'");
            vec![0.0]
        } else {
            b
        };
        self.reset();
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn resize(&mut self, channels: usize) {
        self.channels = channels;
        self.reset();
    }

    /// Clears the history, sized to the current order and channel count, and
    /// zero-pads the coefficient vectors up to `order + 1` taps.
    pub fn reset(&mut self) {
        let taps = self.order + 1;
        self.history.reset(taps, self.channels);
        if self.a.len() < taps {
            self.a.resize(taps, 0.0);
        }
        if self.b.len() < taps {
            self.b.resize(taps, 0.0);
        }
    }

    pub fn history(&self) -> &FilterHistory {
        &self.history
    }

    /// Runs one sample set through every channel filter.
    ///
    /// Does nothing while the bank is disabled.
    pub fn apply(&mut self, input: &[UnwrapWord]) {
        if !self.enabled {
            return;
        }

        let current = self.history.advance();
        let a0 = self.a[0];
        for (ch, &sample) in input.iter().enumerate().take(self.channels) {
            let x = f64::from(sample);
            self.history.set_x(current, ch, x);

            let mut y = self.b[0] * x;
            for t in 1..=self.order {
                let past = self.history.past(t);
                y += self.b[t] * self.history.x(past, ch) - self.a[t] * self.history.y(past, ch);
            }
            self.history.set_y(current, ch, y / a0);
        }
    }

    /// Values to transmit for the sample set last passed to `apply`.
    ///
    /// Filtered outputs are scaled by the gain and truncated; with the bank
    /// disabled the unwrapped input is forwarded as is.
    pub fn output(&self, input: &[UnwrapWord]) -> Vec<OutputWord> {
        if self.enabled {
            self.history
                .latest_outputs()
                .map(|y| (y * self.gain) as OutputWord)
                .collect()
        } else {
            input.iter().map(|&v| OutputWord::from(v)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(bank: &mut FilterBank, samples: &[UnwrapWord]) -> Vec<OutputWord> {
        bank.apply(samples);
        bank.output(samples)
    }

    #[test]
    fn order_zero_unit_filter_is_identity() {
        let mut bank = FilterBank::new(3);
        bank.set_order(0);
        bank.set_a(vec![1.0]);
        bank.set_b(vec![1.0]);
        bank.set_gain(1.0);

        for samples in [[1, -2, 3], [70000, -70000, 0], [5, 5, 5]] {
            assert_eq!(run(&mut bank, &samples), samples.to_vec());
        }
    }

    #[test]
    fn moving_sum_uses_past_inputs() {
        let mut bank = FilterBank::new(1);
        bank.set_order(2);
        bank.set_a(vec![1.0]);
        bank.set_b(vec![1.0, 1.0, 1.0]);

        assert_eq!(run(&mut bank, &[1]), vec![1]);
        assert_eq!(run(&mut bank, &[2]), vec![3]);
        assert_eq!(run(&mut bank, &[3]), vec![6]);
        assert_eq!(run(&mut bank, &[4]), vec![9]);
    }

    #[test]
    fn feedback_taps_use_past_outputs() {
        // y[n] = x[n] + 0.5 y[n-1]
        let mut bank = FilterBank::new(1);
        bank.set_order(1);
        bank.set_a(vec![1.0, -0.5]);
        bank.set_b(vec![1.0, 0.0]);

        assert_eq!(run(&mut bank, &[8]), vec![8]);
        assert_eq!(run(&mut bank, &[0]), vec![4]);
        assert_eq!(run(&mut bank, &[0]), vec![2]);
        assert!((bank.history().y(bank.history().cursor(), 0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn leading_coefficient_and_gain_scale_output() {
        let mut bank = FilterBank::new(2);
        bank.set_order(0);
        bank.set_a(vec![2.0]);
        bank.set_b(vec![1.0]);
        bank.set_gain(3.0);
        assert_eq!(run(&mut bank, &[10, -7]), vec![15, -10]);
    }

    #[test]
    fn channels_are_filtered_independently() {
        let mut bank = FilterBank::new(2);
        bank.set_order(1);
        bank.set_a(vec![1.0]);
        bank.set_b(vec![1.0, 1.0]);
        assert_eq!(run(&mut bank, &[1, 100]), vec![1, 100]);
        assert_eq!(run(&mut bank, &[2, 200]), vec![3, 300]);
    }

    #[test]
    fn invalid_coefficients_fall_back_to_defaults() {
        let mut bank = FilterBank::new(1);
        bank.set_order(0);
        bank.set_a(vec![]);
        assert_eq!(bank.a(), &[1.0]);
        bank.set_a(vec![0.0, 1.0]);
        assert_eq!(bank.a(), &[1.0]);
        bank.set_b(vec![]);
        assert_eq!(bank.b(), &[0.0]);
    }

    #[test]
    fn reset_pads_coefficients_to_order() {
        let mut bank = FilterBank::new(4);
        bank.set_order(3);
        bank.set_a(vec![1.0]);
        bank.set_b(vec![0.5]);
        assert_eq!(bank.a(), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(bank.b(), &[0.5, 0.0, 0.0, 0.0]);
        assert_eq!(bank.history().slots(), 4);
        assert_eq!(bank.history().channels(), 4);
        assert_eq!(bank.history().cursor(), 0);
    }

    #[test]
    fn longer_coefficients_are_kept_after_order_drop() {
        let mut bank = FilterBank::new(1);
        bank.set_b(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        bank.set_order(1);
        assert_eq!(bank.b().len(), 5);
        bank.set_a(vec![1.0]);
        assert_eq!(run(&mut bank, &[1]), vec![1]);
        assert_eq!(run(&mut bank, &[1]), vec![3]);
    }

    #[test]
    fn disabled_bank_forwards_input() {
        let mut bank = FilterBank::new(2);
        bank.set_gain(10.0);
        bank.set_enabled(false);
        assert_eq!(run(&mut bank, &[-65536, 65535]), vec![-65536, 65535]);
        assert_eq!(bank.history().cursor(), 0);
    }
}
