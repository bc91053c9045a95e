use smurfcore::frame_interface::{HeaderBytes, SmurfHeader};

/// Fields stamped into every generated header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderTemplate {
    pub version: u8,
    pub crate_id: u8,
    pub slot_number: u8,
    pub channels: u32,
}

impl HeaderTemplate {
    pub fn render(&self, frame_counter: u32, unix_time_ns: u64) -> HeaderBytes {
        let mut header = SmurfHeader::blank();
        header.set_version(self.version);
        header.set_crate_id(self.crate_id);
        header.set_slot_number(self.slot_number);
        header.set_number_of_channels(self.channels);
        header.set_frame_counter(frame_counter);
        header.set_unix_time(unix_time_ns);
        header.into_inner()
    }
}
