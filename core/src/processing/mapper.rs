use crate::frame_interface::RawWords;
use crate::prelude::{ConfigError, FrameError, RawWord, MAX_NUM_CH};

/// Selects and reorders input channels; mask position is the output channel.
#[derive(Debug, Clone)]
pub struct ChannelMapper {
    mask: Vec<usize>,
}

impl ChannelMapper {
    pub fn new() -> Self {
        Self {
            mask: vec![0; MAX_NUM_CH],
        }
    }

    pub fn mask(&self) -> &[usize] {
        &self.mask
    }

    pub fn num_ch(&self) -> usize {
        self.mask.len()
    }

    /// Replaces the mask if every entry is valid.
    ///
    /// Returns whether the number of mapped channels changed. On error the
    /// current mask is left untouched.
    pub fn set_mask(&mut self, mask: Vec<usize>) -> Result<bool, ConfigError> {
        validate_mask(&mask)?;
        let changed = mask.len() != self.mask.len();
        self.mask = mask;
        Ok(changed)
    }

    /// Mapped samples of one frame, in output channel order.
    pub fn samples<'a>(
        &'a self,
        words: &'a RawWords<'_>,
    ) -> impl Iterator<Item = Result<RawWord, FrameError>> + 'a {
        self.mask.iter().map(move |&index| words.get(index))
    }
}

impl Default for ChannelMapper {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_mask(mask: &[usize]) -> Result<(), ConfigError> {
    if mask.len() > MAX_NUM_CH {
        return Err(ConfigError::MaskTooLong {
            len: mask.len(),
            max: MAX_NUM_CH,
        });
    }
    match mask.iter().position(|&value| value >= MAX_NUM_CH) {
        Some(index) => Err(ConfigError::MaskEntryOutOfRange {
            index,
            value: mask[index],
            max: MAX_NUM_CH,
        }),
        None => Ok(()),
    }
}
