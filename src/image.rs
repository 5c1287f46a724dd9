// image.rs — Host-side pixel buffer.
//
// `PixelBuffer` is a tightly-packed, row-major, 8-bit-per-channel image
// with either 3 (RGB, the on-disk layout) or 4 (RGBA, the GPU texture
// layout) interleaved channels. There is no stride: row y starts at byte
// `y * width * channels`. The GPU copy helpers in `gpu::image` add and
// strip the 256-byte row alignment wgpu needs, so it never leaks here.

use std::fmt;

/// Interleaved channel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// 3 bytes per pixel: R, G, B.
    Rgb,
    /// 4 bytes per pixel: R, G, B, A.
    Rgba,
}

impl Channels {
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channels::Rgb => write!(f, "RGB"),
            Channels::Rgba => write!(f, "RGBA"),
        }
    }
}

/// An 8-bit interleaved image with runtime dimensions.
///
/// Invariant: `data.len() == width * height * channels.count()`.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: Channels,
}

impl PixelBuffer {
    /// Zero-filled buffer (solid black, alpha 0).
    pub fn new(width: usize, height: usize, channels: Channels) -> Self {
        PixelBuffer {
            data: vec![0u8; width * height * channels.count()],
            width,
            height,
            channels,
        }
    }

    /// Wrap an existing byte vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height * channels.count()`.
    pub fn from_vec(width: usize, height: usize, channels: Channels, data: Vec<u8>) -> Self {
        let expected = width * height * channels.count();
        assert_eq!(
            data.len(),
            expected,
            "data length ({}) must equal width * height * channels ({expected})",
            data.len(),
        );
        PixelBuffer { data, width, height, channels }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Bytes per row (`width * channels`).
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width * self.channels.count()
    }

    /// True if the image has no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Borrow the channel values of pixel (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.channels.count()]
    }

    /// Overwrite pixel (x, y). `value` must hold exactly one pixel.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, value: &[u8]) {
        let start = self.offset(x, y);
        let n = self.channels.count();
        self.data[start..start + n].copy_from_slice(value);
    }

    /// Borrow one row of interleaved bytes.
    pub fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.row_bytes();
        &self.data[start..start + self.row_bytes()]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
        (y * self.width + x) * self.channels.count()
    }
}

// Small images print their pixels; large ones only the header.
impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelBuffer {{ {}×{} {} }}", self.width, self.height, self.channels)?;
        if self.width * self.height <= 16 {
            for y in 0..self.height {
                write!(f, "\n  row {y}:")?;
                for x in 0..self.width {
                    write!(f, " {:?}", self.pixel(x, y))?;
                }
            }
        }
        Ok(())
    }
}
