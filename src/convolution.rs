// convolution.rs — Host reference for the GPU blur.
//
// This is the CPU mirror of kernels/blur.wgsl and the ground truth that GPU
// output is validated against. It reproduces the device arithmetic step for
// step rather than being the fastest possible CPU blur:
//
//   1. Each 8-bit sample is normalised to [0, 1] (what an Rgba8Unorm texture
//      load returns).
//   2. The full (2r+1)² window is accumulated in f32, weight[i][j] applied to
//      the sample at (x + i - r, y + j - r).
//   3. The sum is scaled back to [0, 255], clamped and rounded to nearest
//      (what an Rgba8Unorm texture store does).
//
// BORDER HANDLING: clamp-to-edge. Out-of-range coordinates are replaced by
// the nearest valid border pixel, so a constant image stays constant for any
// radius.
//
// Every channel is convolved independently, alpha included.

use crate::image::PixelBuffer;
use crate::kernel::Kernel;

/// Blur `src` with `kernel` using clamp-to-edge sampling.
///
/// Works for both RGB and RGBA buffers; the output has the same layout and
/// dimensions as the input.
pub fn convolve_reference(src: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
    let mut dst = PixelBuffer::new(src.width(), src.height(), src.channels());
    if src.is_empty() {
        return dst;
    }

    let w = src.width() as isize;
    let h = src.height() as isize;
    let r = kernel.radius() as isize;
    let n = src.channels().count();
    let mut acc = [0.0f32; 4];
    let mut out = [0u8; 4];

    for y in 0..h {
        for x in 0..w {
            acc[..n].fill(0.0);
            for i in 0..kernel.side() {
                let sx = (x + i as isize - r).clamp(0, w - 1) as usize;
                for (j, &weight) in kernel.row(i).iter().enumerate() {
                    let sy = (y + j as isize - r).clamp(0, h - 1) as usize;
                    let px = src.pixel(sx, sy);
                    for c in 0..n {
                        acc[c] += unorm_to_f32(px[c]) * weight;
                    }
                }
            }
            for c in 0..n {
                out[c] = f32_to_unorm(acc[c]);
            }
            dst.set_pixel(x as usize, y as usize, &out[..n]);
        }
    }
    dst
}

/// u8 → [0, 1], as sampled from a unorm texture.
#[inline]
pub fn unorm_to_f32(v: u8) -> f32 {
    v as f32 / 255.0
}

/// [0, 1] → u8 with clamping and round-to-nearest, as stored to a unorm
/// texture.
#[inline]
pub fn f32_to_unorm(v: f32) -> u8 {
    (v * 255.0).clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Channels;

    #[test]
    fn test_unorm_round_trip_exact() {
        for v in 0..=255u8 {
            assert_eq!(f32_to_unorm(unorm_to_f32(v)), v);
        }
    }

    #[test]
    fn test_f32_to_unorm_clamps() {
        assert_eq!(f32_to_unorm(-0.5), 0);
        assert_eq!(f32_to_unorm(1.5), 255);
    }

    #[test]
    fn test_identity_radius_zero() {
        let data: Vec<u8> = (0..48).map(|i| (i * 5) as u8).collect();
        let img = PixelBuffer::from_vec(4, 3, Channels::Rgba, data);
        assert_eq!(convolve_reference(&img, &Kernel::build(0)), img);
    }

    #[test]
    fn test_single_pixel_any_radius() {
        // Every tap clamps onto the one pixel.
        let img = PixelBuffer::from_vec(1, 1, Channels::Rgb, vec![42, 0, 255]);
        for r in 0..5 {
            assert_eq!(convolve_reference(&img, &Kernel::build(r)), img, "radius {r}");
        }
    }

    #[test]
    fn test_weights_applied_along_x_for_first_index() {
        // 3×1 image [0, 255, 0] in red. With height 1 every j tap clamps to
        // row 0, so the middle pixel collects the whole of kernel row 1.
        let img = PixelBuffer::from_vec(3, 1, Channels::Rgb, vec![0, 0, 0, 255, 0, 0, 0, 0, 0]);
        let k = Kernel::build(1);
        let out = convolve_reference(&img, &k);
        let centre_weight: f32 = k.row(1).iter().sum();
        assert_eq!(out.pixel(1, 0)[0], f32_to_unorm(centre_weight));
        assert_eq!(out.pixel(0, 0)[0], out.pixel(2, 0)[0]);
    }

    #[test]
    fn test_empty_image() {
        let img = PixelBuffer::new(0, 0, Channels::Rgba);
        assert!(convolve_reference(&img, &Kernel::build(3)).is_empty());
    }
}
