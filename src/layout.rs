//! Canvas geometry: the fixed story canvas, cover-fit and foreground
//! rectangles, font scaling and title line stacking.

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{StoryError, StoryResult};

/// The story canvas. Every composition renders at this size.
pub const STORY_CANVAS: Canvas = Canvas {
    width: 720,
    height: 1280,
};

/// Inset from the canvas edges used by the avatar and the title lines.
pub const MARGIN_PX: f64 = 30.0;
/// Gaussian radius applied to the cover-fit background.
pub const BACKGROUND_BLUR_RADIUS: u32 = 8;
/// Rendered avatar size (and its circular clip diameter).
pub const AVATAR_DIAMETER_PX: f64 = 60.0;
/// Horizontal gap between the avatar and the channel label.
pub const AVATAR_LABEL_GAP_PX: f64 = 20.0;
/// Distance from the canvas bottom to the last title line's bottom edge.
pub const TITLE_BOTTOM_OFFSET_PX: f64 = 90.0;
/// Vertical advance between stacked title lines, in font-size units.
pub const LINE_ADVANCE_FACTOR: f64 = 1.2;
/// Foreground width as a fraction of the canvas width.
pub const FOREGROUND_WIDTH_RATIO: f64 = 0.85;
/// Foreground height cap as a fraction of the canvas height.
pub const FOREGROUND_MAX_HEIGHT_RATIO: f64 = 0.6;
/// Reference canvas width the configured font sizes are expressed against.
pub const FONT_REFERENCE_WIDTH: f64 = 1080.0;
/// Text shadow offset on both axes.
pub const SHADOW_OFFSET_PX: f64 = 2.0;
/// Gaussian radius applied to the text shadow pass.
pub const SHADOW_BLUR_RADIUS: u32 = 8;
/// Text shadow color, black at half opacity.
pub const SHADOW_COLOR: Rgba8 = Rgba8::new(0, 0, 0, 128);

/// Pixel dimensions of a decoded source image, both known positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSize {
    width: u32,
    height: u32,
}

impl SourceSize {
    pub fn new(width: u32, height: u32) -> StoryResult<Self> {
        if width == 0 || height == 0 {
            return Err(StoryError::invalid_asset(format!(
                "source image has degenerate dimensions {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }

    /// Width over height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// A placement rectangle in canvas space. Coordinates may be negative and
/// dimensions may exceed the canvas; the painter clips.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale-to-cover: the source fills the whole canvas at preserved aspect,
/// centered, with the overflowing axis cropped by the canvas edges.
pub fn cover_fit(source: SourceSize, canvas: Canvas) -> DrawRect {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    if source.aspect() > canvas.aspect() {
        let height = ch;
        let width = height * source.aspect();
        DrawRect {
            x: -(width - cw) / 2.0,
            y: 0.0,
            width,
            height,
        }
    } else {
        let width = cw;
        let height = width / source.aspect();
        DrawRect {
            x: 0.0,
            y: -(height - ch) / 2.0,
            width,
            height,
        }
    }
}

/// Foreground placement: 85% of the canvas width at preserved aspect. When
/// that height exceeds 60% of the canvas height, the height is clamped to
/// the cap and the width recomputed from the aspect. Centered both ways.
pub fn foreground_fit(source: SourceSize, canvas: Canvas) -> DrawRect {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    let mut width = cw * FOREGROUND_WIDTH_RATIO;
    let mut height = width / source.aspect();
    let max_height = ch * FOREGROUND_MAX_HEIGHT_RATIO;
    if height > max_height {
        height = max_height;
        width = height * source.aspect();
    }
    DrawRect {
        x: (cw - width) / 2.0,
        y: (ch - height) / 2.0,
        width,
        height,
    }
}

/// Factor applied to configured font sizes on this canvas.
pub fn font_scale(canvas: Canvas) -> f64 {
    f64::from(canvas.width) / FONT_REFERENCE_WIDTH
}

/// A configured font size scaled to the canvas, floored to whole pixels and
/// kept at least 1px so shaping never sees a zero size.
pub fn scaled_font_px(configured: f64, canvas: Canvas) -> f64 {
    (configured * font_scale(canvas)).floor().max(1.0)
}

/// Bottom edge for each of `count` title lines, top-to-bottom. The last
/// line's bottom sits `TITLE_BOTTOM_OFFSET_PX` above the canvas bottom and
/// earlier lines stack upward by the line advance.
pub fn title_line_bottoms(count: usize, scaled_font_px: f64, canvas: Canvas) -> Vec<f64> {
    let advance = scaled_font_px * LINE_ADVANCE_FACTOR;
    let anchor = f64::from(canvas.height) - TITLE_BOTTOM_OFFSET_PX;
    (0..count)
        .map(|i| anchor - advance * ((count - 1 - i) as f64))
        .collect()
}
