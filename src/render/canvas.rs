//! The story paint sequence.
//!
//! One `RenderContext` is reused across stages; each stage renders into a
//! staging pixmap and is composited onto the canvas buffer with source-over.
//! Z-order: blurred background, sharp foreground, gradient overlay, circular
//! avatar, blurred text shadow, sharp text.

use std::sync::Arc;

use kurbo::Shape as _;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{StoryError, StoryResult};
use crate::layout::DrawRect;
use crate::render::blur::blur_rgba8_premul_in_place;
use crate::render::composite::over_in_place;
use crate::render::gradient::{GradientStop, vertical_gradient_rgba8};
use crate::text::TextBrushRgba8;

/// A shaped single-line layout positioned by its top-left corner.
pub(crate) struct PositionedLine {
    pub(crate) layout: parley::Layout<TextBrushRgba8>,
    pub(crate) x: f64,
    pub(crate) y: f64,
}

/// Drop shadow drawn under both text passes.
pub(crate) struct ShadowSpec {
    pub(crate) offset_x: f64,
    pub(crate) offset_y: f64,
    pub(crate) radius: u32,
    pub(crate) color: Rgba8,
}

/// Everything the painter consumes, already fetched, decoded and laid out.
pub(crate) struct StoryScene<'a> {
    pub(crate) canvas: Canvas,
    pub(crate) subject: &'a PreparedImage,
    pub(crate) background_rect: DrawRect,
    pub(crate) background_blur_radius: u32,
    pub(crate) foreground_rect: DrawRect,
    pub(crate) gradient_stops: [GradientStop; 4],
    pub(crate) avatar: &'a PreparedImage,
    pub(crate) avatar_rect: DrawRect,
    pub(crate) font: vello_cpu::peniko::FontData,
    pub(crate) lines: Vec<PositionedLine>,
    pub(crate) shadow: ShadowSpec,
}

/// Paint the full z-order and return the canvas as premultiplied RGBA8.
#[tracing::instrument(skip_all, fields(w = scene.canvas.width, h = scene.canvas.height))]
pub(crate) fn paint_story(scene: &StoryScene<'_>) -> StoryResult<Vec<u8>> {
    let (w16, h16) = scene.canvas.raster_dims()?;
    let len = scene.canvas.byte_len();
    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    let mut stage = vello_cpu::Pixmap::new(w16, h16);
    let mut canvas_buf = vec![0u8; len];

    let subject_paint = image_paint(scene.subject)?;
    let avatar_paint = image_paint(scene.avatar)?;

    // Cover-fit background, blurred in place.
    ctx.reset();
    draw_image(
        &mut ctx,
        subject_paint.clone(),
        scene.subject,
        scene.background_rect,
    );
    render_stage(&mut ctx, &mut stage);
    let bytes = stage.data_as_u8_slice();
    if bytes.len() != len {
        return Err(StoryError::render_context(
            "staging surface does not match the canvas size",
        ));
    }
    canvas_buf.copy_from_slice(bytes);
    blur_rgba8_premul_in_place(
        &mut canvas_buf,
        scene.canvas.width,
        scene.canvas.height,
        scene.background_blur_radius,
    )?;

    // Sharp centered foreground.
    ctx.reset();
    draw_image(&mut ctx, subject_paint, scene.subject, scene.foreground_rect);
    compose_stage(&mut ctx, &mut stage, &mut canvas_buf)?;

    // Legibility gradient, synthesized directly.
    let gradient =
        vertical_gradient_rgba8(&scene.gradient_stops, scene.canvas.width, scene.canvas.height)?;
    over_in_place(&mut canvas_buf, &gradient)?;

    // Avatar clipped to its inscribed circle.
    ctx.reset();
    draw_avatar(&mut ctx, avatar_paint, scene.avatar, scene.avatar_rect);
    compose_stage(&mut ctx, &mut stage, &mut canvas_buf)?;

    // Shadow pass: all lines offset and recolored, blurred once together.
    ctx.reset();
    draw_lines(
        &mut ctx,
        scene,
        Some(scene.shadow.color),
        scene.shadow.offset_x,
        scene.shadow.offset_y,
    );
    render_stage(&mut ctx, &mut stage);
    let mut shadow_buf = stage.data_as_u8_slice().to_vec();
    blur_rgba8_premul_in_place(
        &mut shadow_buf,
        scene.canvas.width,
        scene.canvas.height,
        scene.shadow.radius,
    )?;
    over_in_place(&mut canvas_buf, &shadow_buf)?;

    // Sharp text on top.
    ctx.reset();
    draw_lines(&mut ctx, scene, None, 0.0, 0.0);
    compose_stage(&mut ctx, &mut stage, &mut canvas_buf)?;

    tracing::debug!(lines = scene.lines.len(), "story painted");
    Ok(canvas_buf)
}

fn render_stage(ctx: &mut vello_cpu::RenderContext, stage: &mut vello_cpu::Pixmap) {
    stage.data_as_u8_slice_mut().fill(0);
    ctx.flush();
    ctx.render_to_pixmap(stage);
}

fn compose_stage(
    ctx: &mut vello_cpu::RenderContext,
    stage: &mut vello_cpu::Pixmap,
    canvas_buf: &mut [u8],
) -> StoryResult<()> {
    render_stage(ctx, stage);
    over_in_place(canvas_buf, stage.data_as_u8_slice())
}

/// Fill the image's natural rectangle under a transform that lands it on
/// `rect`, so the sampler sees no resample direction bias.
fn draw_image(
    ctx: &mut vello_cpu::RenderContext,
    paint: vello_cpu::Image,
    img: &PreparedImage,
    rect: DrawRect,
) {
    let (iw, ih) = (f64::from(img.width), f64::from(img.height));
    let tr = kurbo::Affine::translate((rect.x, rect.y))
        * kurbo::Affine::scale_non_uniform(rect.width / iw, rect.height / ih);
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
}

fn draw_avatar(
    ctx: &mut vello_cpu::RenderContext,
    paint: vello_cpu::Image,
    img: &PreparedImage,
    rect: DrawRect,
) {
    let (iw, ih) = (f64::from(img.width), f64::from(img.height));
    let tr = kurbo::Affine::translate((rect.x, rect.y))
        * kurbo::Affine::scale_non_uniform(rect.width / iw, rect.height / ih);

    // Inscribed ellipse in image space; the transform makes it the badge
    // circle in canvas space.
    let ellipse = kurbo::Ellipse::new((iw / 2.0, ih / 2.0), (iw / 2.0, ih / 2.0), 0.0);
    let mut clip = vello_cpu::kurbo::BezPath::new();
    for el in ellipse.path_elements(0.1) {
        clip.push(el);
    }

    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint(paint);
    ctx.fill_path(&clip);
}

fn draw_lines(
    ctx: &mut vello_cpu::RenderContext,
    scene: &StoryScene<'_>,
    override_color: Option<Rgba8>,
    dx: f64,
    dy: f64,
) {
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    for line in &scene.lines {
        ctx.set_transform(affine_to_cpu(kurbo::Affine::translate((
            line.x + dx,
            line.y + dy,
        ))));
        for l in line.layout.lines() {
            for item in l.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let brush = glyph_run.style().brush;
                let color = override_color
                    .unwrap_or(Rgba8::new(brush.r, brush.g, brush.b, brush.a));
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    color.r, color.g, color.b, color.a,
                ));
                let glyphs = glyph_run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&scene.font)
                    .font_size(glyph_run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_paint(img: &PreparedImage) -> StoryResult<vello_cpu::Image> {
    let w = u16::try_from(img.width)
        .map_err(|_| StoryError::render_context(format!("image width {} exceeds u16", img.width)))?;
    let h = u16::try_from(img.height).map_err(|_| {
        StoryError::render_context(format!("image height {} exceeds u16", img.height))
    })?;
    let bytes = img.rgba8_premul.as_slice();
    let expected = (img.width as usize) * (img.height as usize) * 4;
    if bytes.len() != expected {
        return Err(StoryError::render_context(
            "prepared image byte length does not match its dimensions",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(expected / 4);
    for px in bytes.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontLibrary;
    use crate::layout;
    use crate::render::gradient::overlay_stops;

    fn flat_image(w: u32, h: u32, px: [u8; 4]) -> PreparedImage {
        PreparedImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(px.repeat((w * h) as usize)),
        }
    }

    #[test]
    fn image_paint_rejects_mismatched_buffer() {
        let img = PreparedImage {
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(vec![0u8; 4]),
        };
        assert!(image_paint(&img).is_err());
    }

    #[test]
    fn paint_story_without_text_covers_the_canvas() {
        let fonts = FontLibrary::new(None).unwrap();
        let Ok(resolved) = fonts.resolve_bold() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(resolved.bytes.as_ref().clone()),
            resolved.index,
        );

        let canvas = Canvas {
            width: 36,
            height: 64,
        };
        let subject = flat_image(18, 32, [0, 80, 0, 255]);
        let avatar = flat_image(6, 6, [200, 0, 0, 255]);
        let src = layout::SourceSize::new(subject.width, subject.height).unwrap();
        let scene = StoryScene {
            canvas,
            subject: &subject,
            background_rect: layout::cover_fit(src, canvas),
            background_blur_radius: 2,
            foreground_rect: layout::foreground_fit(src, canvas),
            gradient_stops: overlay_stops(50.0),
            avatar: &avatar,
            avatar_rect: DrawRect {
                x: 2.0,
                y: 2.0,
                width: 6.0,
                height: 6.0,
            },
            font,
            lines: Vec::new(),
            shadow: ShadowSpec {
                offset_x: 2.0,
                offset_y: 2.0,
                radius: 2,
                color: Rgba8::new(0, 0, 0, 128),
            },
        };

        let buf = paint_story(&scene).unwrap();
        assert_eq!(buf.len(), canvas.byte_len());
        // The blurred cover plus gradient leaves every pixel opaque.
        assert!(buf.chunks_exact(4).all(|px| px[3] == 255));
        // The avatar badge center must show the avatar, not the background.
        let center = ((5 * canvas.width + 5) * 4) as usize;
        assert!(buf[center] > 100);
    }
}
