//! Decode raw X11 pixel values into 8-bit RGB using the visual's channel
//! masks.
//!
//! A TrueColor visual describes each channel as a contiguous bit mask,
//! e.g. `0xff0000` for red in a 24-bit visual or `0xf800` in RGB565. We
//! store where each channel starts and how wide it is, keep at most its
//! 8 most significant bits, and left-align the result in a byte.

use crate::Color;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PixelFormatError {
    #[error("visual has an empty {channel} channel mask")]
    EmptyMask { channel: &'static str },
}

/// Position and width of one color channel inside a pixel value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelMask {
    pub shift: u32,
    pub bits: u32,
}

impl ChannelMask {
    /// Derive shift and width from a channel mask.
    ///
    /// Only the lowest contiguous run of set bits counts. Channels wider
    /// than 8 bits are narrowed to their top 8 bits.
    pub fn from_mask(mask: u64, channel: &'static str) -> Result<Self, PixelFormatError> {
        if mask == 0 {
            return Err(PixelFormatError::EmptyMask { channel });
        }

        let mut shift = mask.trailing_zeros();
        let mut bits = (mask >> shift).trailing_ones();
        if bits > 8 {
            shift += bits - 8;
            bits = 8;
        }

        Ok(Self { shift, bits })
    }

    /// Extract this channel from `pixel` as an 8-bit intensity.
    #[inline]
    pub fn extract(self, pixel: u64) -> u8 {
        let value = (pixel >> self.shift) & ((1u64 << self.bits) - 1);
        (value << (8 - self.bits)) as u8
    }
}

/// Channel layout of a visual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    pub red: ChannelMask,
    pub green: ChannelMask,
    pub blue: ChannelMask,
}

impl PixelFormat {
    pub fn from_masks(red: u64, green: u64, blue: u64) -> Result<Self, PixelFormatError> {
        Ok(Self {
            red: ChannelMask::from_mask(red, "red")?,
            green: ChannelMask::from_mask(green, "green")?,
            blue: ChannelMask::from_mask(blue, "blue")?,
        })
    }

    #[inline]
    pub fn decode(&self, pixel: u64) -> Color {
        Color::new(
            self.red.extract(pixel),
            self.green.extract(pixel),
            self.blue.extract(pixel),
        )
    }
}
