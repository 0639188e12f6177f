//! Story composition: validate, fetch, lay out, paint, encode.

use std::path::PathBuf;
use std::time::Duration;

use crate::assets::fetch::{
    AssetFetcher, DEFAULT_AVATAR_TEMPLATE, DEFAULT_FETCH_TIMEOUT, HttpFetcher, avatar_url,
    load_story_assets,
};
use crate::config::CompositionConfig;
use crate::fonts::{FontLibrary, ResolvedFont};
use crate::foundation::error::StoryResult;
use crate::layout::{
    AVATAR_DIAMETER_PX, AVATAR_LABEL_GAP_PX, BACKGROUND_BLUR_RADIUS, DrawRect, MARGIN_PX,
    SHADOW_BLUR_RADIUS, SHADOW_COLOR, SHADOW_OFFSET_PX, STORY_CANVAS, SourceSize, cover_fit,
    foreground_fit, scaled_font_px, title_line_bottoms,
};
use crate::render::canvas::{PositionedLine, ShadowSpec, StoryScene, paint_story};
use crate::render::encode::{RenderedImage, encode_canvas_png};
use crate::render::gradient::overlay_stops;
use crate::text::{EngineMeasurer, TextBrushRgba8, TextLayoutEngine, wrap_title};

/// Composer construction options.
#[derive(Clone, Debug)]
pub struct ComposerOpts {
    /// Timeout applied to each asset fetch.
    pub fetch_timeout: Duration,
    /// Avatar service endpoint; the user email is appended as the seed.
    pub avatar_url_template: String,
    /// Explicit font file for label and title; system bold sans-serif
    /// otherwise.
    pub font_path: Option<PathBuf>,
}

impl Default for ComposerOpts {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            avatar_url_template: DEFAULT_AVATAR_TEMPLATE.to_string(),
            font_path: None,
        }
    }
}

/// One `compose(config) -> image` entry point.
pub trait StoryBackend {
    fn compose(&self, config: &CompositionConfig) -> StoryResult<RenderedImage>;
}

/// The CPU composer. Construction resolves fonts once; composition is pure
/// in the config plus the fetched bytes, so one instance serves many calls.
pub struct StoryComposer {
    fetcher: Box<dyn AssetFetcher>,
    fonts: FontLibrary,
    font: ResolvedFont,
    opts: ComposerOpts,
}

impl StoryComposer {
    /// Composer with the default blocking HTTP fetcher.
    pub fn new(opts: ComposerOpts) -> StoryResult<Self> {
        let fetcher = HttpFetcher::new(opts.fetch_timeout)?;
        Self::with_fetcher(opts, Box::new(fetcher))
    }

    /// Composer over a caller-supplied byte source (tests, offline runs).
    pub fn with_fetcher(opts: ComposerOpts, fetcher: Box<dyn AssetFetcher>) -> StoryResult<Self> {
        let fonts = FontLibrary::new(opts.font_path.as_deref())?;
        let font = fonts.resolve_bold()?;
        Ok(Self {
            fetcher,
            fonts,
            font,
            opts,
        })
    }

    /// Compose one story image for `config`.
    #[tracing::instrument(skip_all, fields(video = %config.video.id))]
    pub fn compose(&self, config: &CompositionConfig) -> StoryResult<RenderedImage> {
        let text_color = config.validate()?;
        let canvas = STORY_CANVAS;

        let avatar_src = avatar_url(&self.opts.avatar_url_template, &config.user_email)?;
        let assets = load_story_assets(
            self.fetcher.as_ref(),
            &self.fonts,
            config.subject_source(),
            &avatar_src,
            AVATAR_DIAMETER_PX as u32,
        )?;

        let subject_size = SourceSize::new(assets.subject.width, assets.subject.height)?;
        let background_rect = cover_fit(subject_size, canvas);
        let foreground_rect = foreground_fit(subject_size, canvas);
        tracing::debug!(?background_rect, ?foreground_rect, "layout solved");

        let mut engine = TextLayoutEngine::new();
        let family = engine.register(&self.font)?;
        let brush = TextBrushRgba8 {
            r: text_color.r,
            g: text_color.g,
            b: text_color.b,
            a: text_color.a,
        };
        let label_px = scaled_font_px(config.channel_name_size, canvas) as f32;
        let title_px = scaled_font_px(config.font_size, canvas) as f32;

        let mut lines = Vec::new();

        // Channel label, vertically centered on the avatar.
        let label = engine.layout_line(&config.user_email, &family, label_px, brush)?;
        let label_y =
            MARGIN_PX + AVATAR_DIAMETER_PX / 2.0 - f64::from(label.height()) / 2.0;
        lines.push(PositionedLine {
            layout: label,
            x: MARGIN_PX + AVATAR_DIAMETER_PX + AVATAR_LABEL_GAP_PX,
            y: label_y,
        });

        // Title, wrapped and stacked up from the bottom anchor.
        let max_width = f64::from(canvas.width) - 2.0 * MARGIN_PX;
        let title_lines = {
            let mut measurer = EngineMeasurer {
                engine: &mut engine,
                family: &family,
                size_px: title_px,
            };
            wrap_title(&config.video.title, max_width, &mut measurer)?
        };
        tracing::debug!(count = title_lines.len(), "title wrapped");
        let bottoms = title_line_bottoms(title_lines.len(), f64::from(title_px), canvas);
        for (text, bottom) in title_lines.iter().zip(bottoms) {
            let layout = engine.layout_line(text, &family, title_px, brush)?;
            let y = bottom - f64::from(layout.height());
            lines.push(PositionedLine {
                layout,
                x: MARGIN_PX,
                y,
            });
        }

        let scene = StoryScene {
            canvas,
            subject: &assets.subject,
            background_rect,
            background_blur_radius: BACKGROUND_BLUR_RADIUS,
            foreground_rect,
            gradient_stops: overlay_stops(config.overlay_opacity),
            avatar: &assets.avatar,
            avatar_rect: DrawRect {
                x: MARGIN_PX,
                y: MARGIN_PX,
                width: AVATAR_DIAMETER_PX,
                height: AVATAR_DIAMETER_PX,
            },
            font: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(self.font.bytes.as_ref().clone()),
                self.font.index,
            ),
            lines,
            shadow: ShadowSpec {
                offset_x: SHADOW_OFFSET_PX,
                offset_y: SHADOW_OFFSET_PX,
                radius: SHADOW_BLUR_RADIUS,
                color: SHADOW_COLOR,
            },
        };

        let canvas_buf = paint_story(&scene)?;
        let image = encode_canvas_png(&canvas_buf, canvas.width, canvas.height)?;
        tracing::debug!(png_bytes = image.png.len(), "story encoded");
        Ok(image)
    }
}

impl StoryBackend for StoryComposer {
    fn compose(&self, config: &CompositionConfig) -> StoryResult<RenderedImage> {
        StoryComposer::compose(self, config)
    }
}
