//! Vertical black gradient synthesis for the legibility overlay.

use crate::foundation::error::{StoryError, StoryResult};

/// One gradient stop: a position along the vertical axis and a black alpha,
/// both in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub position: f64,
    pub alpha: f64,
}

/// The story overlay: darker bands top and bottom, the configurable opacity
/// across the middle. `overlay_opacity_percent` is the `[0, 100]` config
/// value.
pub fn overlay_stops(overlay_opacity_percent: f64) -> [GradientStop; 4] {
    let mid = (overlay_opacity_percent / 100.0).clamp(0.0, 1.0);
    [
        GradientStop {
            position: 0.0,
            alpha: 0.7,
        },
        GradientStop {
            position: 0.3,
            alpha: mid,
        },
        GradientStop {
            position: 0.7,
            alpha: mid,
        },
        GradientStop {
            position: 1.0,
            alpha: 0.7,
        },
    ]
}

/// Synthesize a full-canvas premultiplied RGBA8 buffer: black at the alpha
/// interpolated between stops, constant per row. Row 0 evaluates at
/// position 0 and the last row at position 1.
pub fn vertical_gradient_rgba8(
    stops: &[GradientStop],
    width: u32,
    height: u32,
) -> StoryResult<Vec<u8>> {
    if stops.is_empty() {
        return Err(StoryError::render_context("gradient needs at least one stop"));
    }
    for pair in stops.windows(2) {
        if pair[1].position < pair[0].position {
            return Err(StoryError::render_context(
                "gradient stop positions must be non-decreasing",
            ));
        }
    }
    for stop in stops {
        if !(0.0..=1.0).contains(&stop.position) || !(0.0..=1.0).contains(&stop.alpha) {
            return Err(StoryError::render_context(
                "gradient stop position and alpha must be in [0, 1]",
            ));
        }
    }

    let w = width as usize;
    let h = height as usize;
    let mut buf = vec![0u8; w * h * 4];
    let h1 = (h.max(1) - 1) as f64;
    for y in 0..h {
        let t = if h1 > 0.0 { y as f64 / h1 } else { 0.0 };
        let a = (alpha_at(stops, t) * 255.0).round() as u8;
        let row = &mut buf[y * w * 4..(y + 1) * w * 4];
        for px in row.chunks_exact_mut(4) {
            px[3] = a;
        }
    }
    Ok(buf)
}

fn alpha_at(stops: &[GradientStop], t: f64) -> f64 {
    let first = stops[0];
    if t <= first.position {
        return first.alpha;
    }
    let last = stops[stops.len() - 1];
    if t >= last.position {
        return last.alpha;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.position {
            let span = b.position - a.position;
            if span <= 0.0 {
                return b.alpha;
            }
            let f = (t - a.position) / span;
            return a.alpha + (b.alpha - a.alpha) * f;
        }
    }
    last.alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_of_row(buf: &[u8], width: u32, y: u32) -> u8 {
        buf[((y * width) * 4 + 3) as usize]
    }

    #[test]
    fn overlay_stops_follow_the_configured_opacity() {
        let stops = overlay_stops(50.0);
        assert_eq!(stops[0].alpha, 0.7);
        assert_eq!(stops[1].alpha, 0.5);
        assert_eq!(stops[2].alpha, 0.5);
        assert_eq!(stops[3].alpha, 0.7);
        assert_eq!(stops[1].position, 0.3);
        assert_eq!(stops[2].position, 0.7);
    }

    #[test]
    fn gradient_edges_and_middle_match_stops() {
        let stops = overlay_stops(50.0);
        let (w, h) = (4u32, 101u32);
        let buf = vertical_gradient_rgba8(&stops, w, h).unwrap();

        assert_eq!(alpha_of_row(&buf, w, 0), 179); // 0.7
        assert_eq!(alpha_of_row(&buf, w, 100), 179);
        assert_eq!(alpha_of_row(&buf, w, 50), 128); // flat middle at 0.5
        assert_eq!(alpha_of_row(&buf, w, 30), 128);
        assert_eq!(alpha_of_row(&buf, w, 70), 128);
    }

    #[test]
    fn gradient_rows_are_constant_and_black() {
        let stops = overlay_stops(80.0);
        let (w, h) = (8u32, 16u32);
        let buf = vertical_gradient_rgba8(&stops, w, h).unwrap();
        for y in 0..h {
            let row = &buf[(y * w * 4) as usize..((y + 1) * w * 4) as usize];
            let a = row[3];
            for px in row.chunks_exact(4) {
                assert_eq!(px[0], 0);
                assert_eq!(px[1], 0);
                assert_eq!(px[2], 0);
                assert_eq!(px[3], a);
            }
        }
    }

    #[test]
    fn gradient_interpolates_between_stops() {
        let stops = [
            GradientStop {
                position: 0.0,
                alpha: 0.0,
            },
            GradientStop {
                position: 1.0,
                alpha: 1.0,
            },
        ];
        let buf = vertical_gradient_rgba8(&stops, 1, 3).unwrap();
        assert_eq!(buf[3], 0);
        assert_eq!(buf[7], 128);
        assert_eq!(buf[11], 255);
    }

    #[test]
    fn gradient_rejects_bad_stop_lists() {
        assert!(vertical_gradient_rgba8(&[], 2, 2).is_err());
        let out_of_order = [
            GradientStop {
                position: 0.5,
                alpha: 0.1,
            },
            GradientStop {
                position: 0.2,
                alpha: 0.4,
            },
        ];
        assert!(vertical_gradient_rgba8(&out_of_order, 2, 2).is_err());
    }
}
