pub mod frame;
pub mod header;

pub use frame::{put_output_words, InputFrame, RawWords, ValidFrame, INVALID_FRAME_FLAG};
pub use header::{HeaderBytes, SmurfHeader, HEADER_SIZE};
