pub mod downsampler;
pub mod filter;
pub mod history;
pub mod mapper;
pub mod processor;
pub mod transmitter;
pub mod unwrapper;

pub use downsampler::Downsampler;
pub use filter::FilterBank;
pub use history::FilterHistory;
pub use mapper::ChannelMapper;
pub use processor::{Disposition, SmurfProcessor};
pub use transmitter::{output_frame_size, StagedFrame, Transmitter, TX_WAIT};
pub use unwrapper::Unwrapper;
