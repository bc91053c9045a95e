use crate::prelude::FrameError;

/// Size in bytes of the SMuRF frame header.
pub const HEADER_SIZE: usize = 128;

/// Owned copy of a header, as staged for transmission.
pub type HeaderBytes = [u8; HEADER_SIZE];

const VERSION_OFFSET: usize = 0;
const CRATE_ID_OFFSET: usize = 1;
const SLOT_NUMBER_OFFSET: usize = 2;
const TIMING_CONFIGURATION_OFFSET: usize = 3;
const NUMBER_OF_CHANNELS_OFFSET: usize = 4;
const UNIX_TIME_OFFSET: usize = 48;
const FRAME_COUNTER_OFFSET: usize = 84;

/// Little-endian view over the leading `HEADER_SIZE` bytes of a frame.
///
/// Generic over the backing storage so the same codec reads borrowed input
/// frames and rewrites owned header copies.
#[derive(Debug, Clone)]
pub struct SmurfHeader<T> {
    buf: T,
}

impl<T: AsRef<[u8]>> SmurfHeader<T> {
    pub fn new(buf: T) -> Result<Self, FrameError> {
        let size = buf.as_ref().len();
        if size < HEADER_SIZE {
            return Err(FrameError::ShorterThanHeader {
                size,
                header: HEADER_SIZE,
            });
        }
        Ok(Self { buf })
    }

    pub fn version(&self) -> u8 {
        self.bytes()[VERSION_OFFSET]
    }

    pub fn crate_id(&self) -> u8 {
        self.bytes()[CRATE_ID_OFFSET]
    }

    pub fn slot_number(&self) -> u8 {
        self.bytes()[SLOT_NUMBER_OFFSET]
    }

    pub fn timing_configuration(&self) -> u8 {
        self.bytes()[TIMING_CONFIGURATION_OFFSET]
    }

    pub fn number_of_channels(&self) -> u32 {
        u32::from_le_bytes(read_array(self.bytes(), NUMBER_OF_CHANNELS_OFFSET))
    }

    pub fn unix_time(&self) -> u64 {
        u64::from_le_bytes(read_array(self.bytes(), UNIX_TIME_OFFSET))
    }

    pub fn frame_counter(&self) -> u32 {
        u32::from_le_bytes(read_array(self.bytes(), FRAME_COUNTER_OFFSET))
    }

    /// The header bytes, without any payload that follows them.
    pub fn bytes(&self) -> &[u8] {
        &self.buf.as_ref()[..HEADER_SIZE]
    }

    pub fn to_owned_bytes(&self) -> HeaderBytes {
        read_array(self.bytes(), 0)
    }

    pub fn into_inner(self) -> T {
        self.buf
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> SmurfHeader<T> {
    pub fn set_version(&mut self, version: u8) {
        self.bytes_mut()[VERSION_OFFSET] = version;
    }

    pub fn set_crate_id(&mut self, crate_id: u8) {
        self.bytes_mut()[CRATE_ID_OFFSET] = crate_id;
    }

    pub fn set_slot_number(&mut self, slot: u8) {
        self.bytes_mut()[SLOT_NUMBER_OFFSET] = slot;
    }

    pub fn set_timing_configuration(&mut self, timing: u8) {
        self.bytes_mut()[TIMING_CONFIGURATION_OFFSET] = timing;
    }

    pub fn set_number_of_channels(&mut self, channels: u32) {
        write_bytes(
            self.bytes_mut(),
            NUMBER_OF_CHANNELS_OFFSET,
            &channels.to_le_bytes(),
        );
    }

    pub fn set_unix_time(&mut self, nanoseconds: u64) {
        write_bytes(self.bytes_mut(), UNIX_TIME_OFFSET, &nanoseconds.to_le_bytes());
    }

    pub fn set_frame_counter(&mut self, counter: u32) {
        write_bytes(self.bytes_mut(), FRAME_COUNTER_OFFSET, &counter.to_le_bytes());
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf.as_mut()[..HEADER_SIZE]
    }
}

impl SmurfHeader<HeaderBytes> {
    /// An all-zero header, used as a template by frame producers.
    pub fn blank() -> Self {
        Self::from_bytes([0; HEADER_SIZE])
    }

    pub fn from_bytes(buf: HeaderBytes) -> Self {
        Self { buf }
    }
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

fn write_bytes(buf: &mut [u8], offset: usize, value: &[u8]) {
    buf[offset..offset + value.len()].copy_from_slice(value);
}
