use crate::prelude::ConfigError;

pub const DEFAULT_FACTOR: usize = 20;

/// Lets through one processed sample set out of every `factor`.
#[derive(Debug, Clone)]
pub struct Downsampler {
    enabled: bool,
    factor: usize,
    sample_count: usize,
}

impl Downsampler {
    pub fn new() -> Self {
        Self {
            enabled: true,
            factor: DEFAULT_FACTOR,
            sample_count: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    pub fn set_factor(&mut self, factor: usize) -> Result<(), ConfigError> {
        if factor == 0 {
            return Err(ConfigError::ZeroFactor);
        }
        self.factor = factor;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.sample_count = 0;
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Counts one sample set; returns whether it should be emitted.
    pub fn tick(&mut self) -> bool {
        if !self.enabled {
            return true;
        }
        self.sample_count += 1;
        if self.sample_count < self.factor {
            return false;
        }
        self.reset();
        true
    }
}

impl Default for Downsampler {
    fn default() -> Self {
        Self::new()
    }
}
