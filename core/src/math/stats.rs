pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    /// RMS about the mean.
    pub fn ac_rms(samples: &[f64]) -> f64 {
        let mean = Self::mean(samples);
        let centered: Vec<f64> = samples.iter().map(|&v| v - mean).collect();
        Self::rms(&centered)
    }
}
