// convert.rs — RGB ↔ RGBA channel padding.
//
// GPU image objects only come in 1, 2 or 4 channel layouts, so the 3-channel
// pixels read from disk are padded with an alpha byte before upload and the
// alpha byte is dropped again after readback. The inserted alpha is 0; it
// is blurred along with the colour channels and then discarded, so its value
// never reaches the output file.

use crate::image::{Channels, PixelBuffer};

/// Alpha value inserted by [`rgb_to_rgba`].
pub const PADDING_ALPHA: u8 = 0;

/// Pad a 3-channel image to 4 channels.
///
/// # Panics
/// Panics if `src` is not RGB.
pub fn rgb_to_rgba(src: &PixelBuffer) -> PixelBuffer {
    assert_eq!(src.channels(), Channels::Rgb, "rgb_to_rgba expects an RGB image");
    let mut out = Vec::with_capacity(src.width() * src.height() * 4);
    for px in src.as_bytes().chunks_exact(3) {
        out.extend_from_slice(px);
        out.push(PADDING_ALPHA);
    }
    PixelBuffer::from_vec(src.width(), src.height(), Channels::Rgba, out)
}

/// Drop the alpha channel of a 4-channel image.
///
/// # Panics
/// Panics if `src` is not RGBA.
pub fn rgba_to_rgb(src: &PixelBuffer) -> PixelBuffer {
    assert_eq!(src.channels(), Channels::Rgba, "rgba_to_rgb expects an RGBA image");
    let mut out = Vec::with_capacity(src.width() * src.height() * 3);
    for px in src.as_bytes().chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    PixelBuffer::from_vec(src.width(), src.height(), Channels::Rgb, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_rgba_inserts_alpha() {
        let src = PixelBuffer::from_vec(2, 1, Channels::Rgb, vec![1, 2, 3, 4, 5, 6]);
        let out = rgb_to_rgba(&src);
        assert_eq!(out.channels(), Channels::Rgba);
        assert_eq!(out.as_bytes(), &[1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn test_rgba_to_rgb_ignores_alpha() {
        let src = PixelBuffer::from_vec(2, 1, Channels::Rgba, vec![1, 2, 3, 200, 4, 5, 6, 17]);
        let out = rgba_to_rgb(&src);
        assert_eq!(out.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!((out.width(), out.height()), (2, 1));
    }

    #[test]
    #[should_panic(expected = "expects an RGB image")]
    fn test_rgb_to_rgba_rejects_rgba() {
        rgb_to_rgba(&PixelBuffer::new(1, 1, Channels::Rgba));
    }
}
