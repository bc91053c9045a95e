/// Raw sample as carried in the input frame payload.
pub type RawWord = i16;
/// Accumulator width used by the unwrapper.
pub type UnwrapWord = i32;
/// Sample width written to the output frame payload.
pub type OutputWord = i32;

/// Maximum number of channels a readout frame carries.
pub const MAX_NUM_CH: usize = 4096;

pub const RAW_WORD_SIZE: usize = std::mem::size_of::<RawWord>();
pub const OUTPUT_WORD_SIZE: usize = std::mem::size_of::<OutputWord>();

/// Reasons an incoming frame is dropped before reaching the pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame carries the transport error flag (0x{0:x})")]
    ErrorFlag(u32),
    #[error("frame carries the invalid-frame flag (flags=0x{0:x})")]
    Flagged(u32),
    #[error("frame size {size} is smaller than the header size {header}")]
    ShorterThanHeader { size: usize, header: usize },
    #[error("frame declares {found} channels, fewer than the supported maximum {max}")]
    TooFewChannels { found: usize, max: usize },
    #[error("frame size {size} cannot hold header ({header}) plus payload ({payload})")]
    Truncated {
        size: usize,
        header: usize,
        payload: usize,
    },
    #[error("word {index} lies outside the frame payload")]
    WordOutOfRange { index: usize },
}

/// Rejected control-plane updates.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("mask of length {len} is larger than the number of channels in a frame ({max})")]
    MaskTooLong { len: usize, max: usize },
    #[error("mask value at index {index} is {value}, outside the input channel range (max {max})")]
    MaskEntryOutOfRange {
        index: usize,
        value: usize,
        max: usize,
    },
    #[error("downsampling factor can not be zero")]
    ZeroFactor,
    #[error("invalid control command: {0}")]
    InvalidCommand(String),
}

/// Failures reported by a downstream frame sink.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("could not allocate an output frame of {0} bytes")]
    Allocation(usize),
    #[error("downstream sink is closed")]
    Closed,
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building or tearing down a processor.
#[derive(thiserror::Error, Debug)]
pub enum ProcessorError {
    #[error("failed to start the transmitter thread: {0}")]
    TransmitterStart(#[source] std::io::Error),
    #[error("transmitter thread panicked")]
    TransmitterPanicked,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Downstream consumer of assembled output frames.
///
/// `request_frame` plays the role of the transport's frame allocator: the
/// transmitter writes header and channel data into the returned buffer and
/// leaves any padding untouched.
pub trait FrameSink: Send + 'static {
    fn request_frame(&mut self, size: usize) -> Result<Vec<u8>, SinkError> {
        Ok(vec![0; size])
    }

    fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), SinkError>;
}

impl FrameSink for std::sync::mpsc::Sender<Vec<u8>> {
    fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), SinkError> {
        self.send(frame).map_err(|_| SinkError::Closed)
    }
}

impl FrameSink for tokio::sync::mpsc::UnboundedSender<Vec<u8>> {
    fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), SinkError> {
        self.send(frame).map_err(|_| SinkError::Closed)
    }
}

/// Recovers the guard of a poisoned mutex.
///
/// Every state group is left reset-consistent by its owner, so a panic in
/// another holder does not invalidate the data.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
