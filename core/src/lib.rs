//! Streaming processor for SMuRF detector readout frames.
//!
//! Frames are mapped to a user-selected channel set, phase-unwrapped, run
//! through a per-channel IIR filter, downsampled, and handed to a background
//! transmitter thread that rebuilds the output frame for the downstream sink.

pub mod config;
pub mod control;
pub mod frame_interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use config::ProcessorConfig;
pub use control::ControlCommand;
pub use frame_interface::{InputFrame, SmurfHeader, HEADER_SIZE};
pub use prelude::{ConfigError, FrameError, FrameSink, ProcessorError, SinkError, MAX_NUM_CH};
pub use processing::{Disposition, SmurfProcessor};
