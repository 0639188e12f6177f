use serde::{Deserialize, Serialize};

use crate::foundation::error::{StoryError, StoryResult};

/// Output surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Width over height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Dimensions as the `u16` pair the raster surfaces take.
    pub(crate) fn raster_dims(self) -> StoryResult<(u16, u16)> {
        let w = u16::try_from(self.width).map_err(|_| {
            StoryError::render_context(format!("canvas width {} exceeds u16", self.width))
        })?;
        let h = u16::try_from(self.height).map_err(|_| {
            StoryError::render_context(format!("canvas height {} exceeds u16", self.height))
        })?;
        Ok((w, h))
    }

    /// Byte length of one tightly packed RGBA8 buffer at these dimensions.
    pub(crate) fn byte_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}
