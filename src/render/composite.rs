//! Premultiplied RGBA8 source-over kernels used between paint stages.

use crate::foundation::error::{StoryError, StoryResult};

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> StoryResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StoryError::render_context(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 200];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_half_alpha_black_darkens_white() {
        let dst = [255, 255, 255, 255];
        let src = [0, 0, 0, 128];
        let out = over(dst, src);
        assert_eq!(out[3], 255);
        assert!(out[0] > 120 && out[0] < 132);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
    }

    #[test]
    fn over_in_place_rejects_mismatched_lengths() {
        let mut dst = vec![0u8; 8];
        let src = vec![0u8; 12];
        assert!(over_in_place(&mut dst, &src).is_err());

        let mut dst = vec![0u8; 6];
        let src = vec![0u8; 6];
        assert!(over_in_place(&mut dst, &src).is_err());
    }

    #[test]
    fn over_in_place_composites_every_pixel() {
        let mut dst = vec![0u8, 0, 0, 255, 255, 255, 255, 255];
        let src = vec![255u8, 0, 0, 255, 0, 0, 0, 0];
        over_in_place(&mut dst, &src).unwrap();
        assert_eq!(&dst[0..4], &[255, 0, 0, 255]);
        assert_eq!(&dst[4..8], &[255, 255, 255, 255]);
    }
}
