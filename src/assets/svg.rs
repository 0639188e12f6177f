//! SVG avatar parsing and rasterization.
//!
//! Avatar services answer with SVG documents that carry `<text>` nodes, so
//! parsing installs the shared font database and a lenient resolver that
//! falls back to any installed face rather than dropping the glyphs.

use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::fonts::FontLibrary;
use crate::foundation::error::{StoryError, StoryResult};

/// Hard cap on either rasterization axis.
const MAX_RASTER_DIM: u32 = 16_384;

/// Parse SVG bytes into a render tree with text already resolved.
pub fn parse_svg(bytes: &[u8], fonts: &FontLibrary) -> StoryResult<Arc<usvg::Tree>> {
    let opts = usvg::Options {
        fontdb: fonts.database(),
        font_resolver: lenient_font_resolver(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| StoryError::asset_load(format!("parse svg: {e}")))?;
    Ok(Arc::new(tree))
}

/// Rasterize a parsed tree to exactly `width` x `height`, scaling each axis
/// independently. Returns premultiplied RGBA8.
pub fn rasterize_svg(tree: &usvg::Tree, width: u32, height: u32) -> StoryResult<PreparedImage> {
    if width == 0 || height == 0 || width > MAX_RASTER_DIM || height > MAX_RASTER_DIM {
        return Err(StoryError::invalid_asset(format!(
            "svg raster size {width}x{height} out of range (max {MAX_RASTER_DIM})"
        )));
    }
    let size = tree.size();
    if !(size.width() > 0.0) || !(size.height() > 0.0) {
        return Err(StoryError::invalid_asset(
            "svg document has a degenerate viewport",
        ));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| StoryError::render_context("allocate svg raster surface"))?;
    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();
    resvg::render(
        tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

/// Resolver that tries the document's families, then the generic ones, then
/// whatever face exists. Avatar text must render with *some* face.
fn lenient_font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families: Vec<usvg::fontdb::Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Named(name) => usvg::fontdb::Family::Name(name.as_str()),
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                })
                .collect();
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Serif);
            families.push(usvg::fontdb::Family::Monospace);

            let stretch = match font.stretch() {
                usvg::FontStretch::UltraCondensed => usvg::fontdb::Stretch::UltraCondensed,
                usvg::FontStretch::ExtraCondensed => usvg::fontdb::Stretch::ExtraCondensed,
                usvg::FontStretch::Condensed => usvg::fontdb::Stretch::Condensed,
                usvg::FontStretch::SemiCondensed => usvg::fontdb::Stretch::SemiCondensed,
                usvg::FontStretch::Normal => usvg::fontdb::Stretch::Normal,
                usvg::FontStretch::SemiExpanded => usvg::fontdb::Stretch::SemiExpanded,
                usvg::FontStretch::Expanded => usvg::fontdb::Stretch::Expanded,
                usvg::FontStretch::ExtraExpanded => usvg::fontdb::Stretch::ExtraExpanded,
                usvg::FontStretch::UltraExpanded => usvg::fontdb::Stretch::UltraExpanded,
            };
            let style = match font.style() {
                usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
                usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
                usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
            };

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch,
                style,
            };
            fontdb
                .query(&query)
                .or_else(|| fontdb.faces().next().map(|f| f.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCLE_SVG: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><circle cx="50" cy="50" r="40" fill="#e9c46a"/></svg>"##;

    #[test]
    fn circle_rasterizes_opaque_center_transparent_corners() {
        let fonts = FontLibrary::new(None).unwrap();
        let tree = parse_svg(CIRCLE_SVG, &fonts).unwrap();
        let img = rasterize_svg(&tree, 60, 60).unwrap();
        assert_eq!(img.width, 60);
        assert_eq!(img.height, 60);

        let px = |x: usize, y: usize| {
            let i = (y * 60 + x) * 4;
            img.rgba8_premul[i + 3]
        };
        assert_eq!(px(30, 30), 255);
        assert_eq!(px(0, 0), 0);
        assert_eq!(px(59, 59), 0);
    }

    #[test]
    fn non_square_target_stretches_both_axes() {
        let fonts = FontLibrary::new(None).unwrap();
        let tree = parse_svg(CIRCLE_SVG, &fonts).unwrap();
        let img = rasterize_svg(&tree, 30, 90).unwrap();
        assert_eq!((img.width, img.height), (30, 90));
        assert_eq!(img.rgba8_premul.len(), 30 * 90 * 4);
    }

    #[test]
    fn malformed_svg_is_an_asset_error() {
        let fonts = FontLibrary::new(None).unwrap();
        assert!(matches!(
            parse_svg(br#"<svg"#, &fonts),
            Err(StoryError::AssetLoad(_))
        ));
    }

    #[test]
    fn degenerate_raster_size_is_rejected() {
        let fonts = FontLibrary::new(None).unwrap();
        let tree = parse_svg(CIRCLE_SVG, &fonts).unwrap();
        assert!(rasterize_svg(&tree, 0, 60).is_err());
        assert!(rasterize_svg(&tree, 60, MAX_RASTER_DIM + 1).is_err());
    }
}
