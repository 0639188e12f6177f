//! PNG encoding of the finished canvas.

use std::io::Cursor;

use base64::Engine as _;

use crate::foundation::error::{StoryError, StoryResult};

/// The encoded composition.
#[derive(Clone, Debug)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RenderedImage {
    /// `data:image/png;base64,` form for embedding.
    pub fn to_data_uri(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&self.png);
        format!("data:image/png;base64,{b64}")
    }
}

/// Unpremultiply a finished canvas buffer and encode PNG.
pub(crate) fn encode_canvas_png(
    premul: &[u8],
    width: u32,
    height: u32,
) -> StoryResult<RenderedImage> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| StoryError::render_context("encode buffer size overflow"))?;
    if premul.len() != expected {
        return Err(StoryError::render_context(
            "encode expects a buffer matching width*height*4",
        ));
    }

    let mut straight = premul.to_vec();
    unpremultiply_rgba8_in_place(&mut straight);

    let img = image::RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| StoryError::render_context("canvas buffer rejected by the encoder"))?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| StoryError::render_context(format!("png encode: {e}")))?;

    Ok(RenderedImage { width, height, png })
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in 0..3 {
            let v = (u16::from(px[c]) * 255 + a / 2) / a;
            px[c] = v.min(255) as u8;
        }
    }
}
