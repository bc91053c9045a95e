use crate::frame_interface::header::{SmurfHeader, HEADER_SIZE};
use crate::prelude::{FrameError, OutputWord, RawWord, MAX_NUM_CH, OUTPUT_WORD_SIZE, RAW_WORD_SIZE};

/// Transport flag bit marking an incomplete or otherwise invalid frame.
pub const INVALID_FRAME_FLAG: u32 = 0x100;

/// A frame as delivered by the upstream transport.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    payload: Vec<u8>,
    error: u32,
    flags: u32,
}

impl InputFrame {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            error: 0,
            flags: 0,
        }
    }

    pub fn with_error(mut self, error: u32) -> Self {
        self.error = error;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn error(&self) -> u32 {
        self.error
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Runs the sanity checks a frame must pass before it enters the pipeline.
    ///
    /// Frames may be padded beyond the channels their header declares.
    pub fn validate(&self) -> Result<ValidFrame<'_>, FrameError> {
        if self.error != 0 {
            return Err(FrameError::ErrorFlag(self.error));
        }
        if self.flags & INVALID_FRAME_FLAG != 0 {
            return Err(FrameError::Flagged(self.flags));
        }

        let header = SmurfHeader::new(self.payload.as_slice())?;
        let channels = header.number_of_channels() as usize;
        if channels < MAX_NUM_CH {
            return Err(FrameError::TooFewChannels {
                found: channels,
                max: MAX_NUM_CH,
            });
        }

        let payload = channels.saturating_mul(RAW_WORD_SIZE);
        if HEADER_SIZE.saturating_add(payload) > self.payload.len() {
            return Err(FrameError::Truncated {
                size: self.payload.len(),
                header: HEADER_SIZE,
                payload,
            });
        }

        Ok(ValidFrame {
            header,
            words: RawWords {
                data: &self.payload[HEADER_SIZE..HEADER_SIZE + payload],
            },
        })
    }
}

/// A frame that passed validation, split into header and sample words.
#[derive(Debug, Clone)]
pub struct ValidFrame<'a> {
    pub header: SmurfHeader<&'a [u8]>,
    pub words: RawWords<'a>,
}

/// Bounds-checked reader over the raw sample region of a frame.
#[derive(Debug, Clone, Copy)]
pub struct RawWords<'a> {
    data: &'a [u8],
}

impl<'a> RawWords<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len() / RAW_WORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<RawWord, FrameError> {
        let start = index
            .checked_mul(RAW_WORD_SIZE)
            .filter(|start| self.data.len().saturating_sub(*start) >= RAW_WORD_SIZE)
            .ok_or(FrameError::WordOutOfRange { index })?;
        Ok(RawWord::from_le_bytes([
            self.data[start],
            self.data[start + 1],
        ]))
    }
}

/// Writes `words` little-endian into the front of `dst`.
///
/// Returns the number of bytes written; words that do not fit are dropped.
pub fn put_output_words(dst: &mut [u8], words: &[OutputWord]) -> usize {
    let mut written = 0;
    for (chunk, word) in dst.chunks_exact_mut(OUTPUT_WORD_SIZE).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
        written += OUTPUT_WORD_SIZE;
    }
    written
}
