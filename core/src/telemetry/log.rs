use log::{debug, error, info};

/// Logger target shared by the processor and its transmitter thread.
pub const PROCESSOR_TARGET: &str = "smurf::processor";

/// Thin handle that routes every record of one component to a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    target: &'static str,
}

impl LogManager {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn error(&self, message: &str) {
        error!(target: self.target, "{}", message);
    }

    pub fn record(&self, message: &str) {
        info!(target: self.target, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        debug!(target: self.target, "{}", message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(PROCESSOR_TARGET)
    }
}
