// gpu/image.rs — RGBA images on the GPU: upload, storage targets, readback.
//
// All device images are Rgba8Unorm 2D textures. Kernels see normalised
// floats in [0, 1]; the host sees interleaved 8-bit RGBA.
//
// ROW ALIGNMENT
// ─────────────
// Buffer↔texture copies require `bytes_per_row` to be a multiple of
// `wgpu::COPY_BYTES_PER_ROW_ALIGNMENT` (256). A tightly packed host row is
// `width * 4` bytes, so both directions go through a padded staging layout:
//
//   host   : [r g b a r g b a ...]                          width*4 bytes
//   staging: [r g b a r g b a ... 0 0 0 0 ...]              padded_row bytes
//
// Upload pads each row into the staging buffer; readback strips the padding
// again while copying out of the mapped range.

use wgpu::util::DeviceExt;

use crate::gpu::device::GpuContext;
use crate::gpu::error::GpuError;
use crate::image::{Channels, PixelBuffer};

const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Bytes per pixel of an Rgba8Unorm texel.
const TEXEL_BYTES: u32 = 4;

/// Format of every image texture.
pub const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ---------------------------------------------------------------------------
// GpuImage
// ---------------------------------------------------------------------------

/// An RGBA8 image resident on the GPU.
///
/// Owns its texture; dropping it releases the device memory.
pub struct GpuImage {
    pub texture: wgpu::Texture,
    /// Full-texture view, bound to kernels.
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuImage {
    /// Allocate a texture of `width × height` with `usage` and no contents.
    fn allocate(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
        what: &'static str,
    ) -> Result<Self, GpuError> {
        let texture = ctx
            .guarded(|device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(what),
                    size: extent(width, height),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: IMAGE_FORMAT,
                    usage,
                    view_formats: &[],
                })
            })
            .map_err(|source| GpuError::MemObjectAllocation { what, source })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuImage { texture, view, width, height })
    }

    /// Upload an RGBA [`PixelBuffer`] into a new read-only texture.
    ///
    /// The copy is submitted immediately; later submissions on the same
    /// queue observe the uploaded contents.
    ///
    /// # Panics
    /// Panics if `src` is not RGBA.
    pub fn upload(ctx: &GpuContext, src: &PixelBuffer) -> Result<Self, GpuError> {
        assert_eq!(src.channels(), Channels::Rgba, "GPU images must be RGBA");
        let (width, height) = dims_u32(src)?;

        let image = Self::allocate(
            ctx,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            "input image",
        )?;

        let padded_row = padded_row_bytes(width);
        let staging_data = pad_rows(src.as_bytes(), src.row_bytes(), padded_row as usize);

        let staging = ctx
            .guarded(|device| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("GpuImage::staging"),
                    contents: &staging_data,
                    usage: wgpu::BufferUsages::COPY_SRC,
                })
            })
            .map_err(|source| GpuError::MemObjectAllocation { what: "upload staging buffer", source })?;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("GpuImage::upload") });
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &image.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            extent(width, height),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        tracing::trace!(width, height, padded_row, "uploaded image");
        Ok(image)
    }

    /// Allocate a write-only storage texture for kernel output.
    pub fn storage(ctx: &GpuContext, width: u32, height: u32) -> Result<Self, GpuError> {
        Self::allocate(
            ctx,
            width,
            height,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            "output image",
        )
    }

    /// Record a copy of this texture into `target`.
    ///
    /// # Panics
    /// Panics if `target` was created for different dimensions.
    pub fn encode_readback(&self, encoder: &mut wgpu::CommandEncoder, target: &ReadbackBuffer) {
        assert_eq!(
            (self.width, self.height),
            (target.width, target.height),
            "readback buffer dimensions differ from the image"
        );
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &target.buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            extent(self.width, self.height),
        );
    }

    /// Read the texture back into an RGBA [`PixelBuffer`]. Blocks until the
    /// copy completes.
    pub fn readback(&self, ctx: &GpuContext) -> Result<PixelBuffer, GpuError> {
        let target = ReadbackBuffer::new(ctx, self.width, self.height)?;
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("GpuImage::readback") });
        self.encode_readback(&mut encoder, &target);
        ctx.queue.submit(std::iter::once(encoder.finish()));
        target.read(ctx)
    }
}

// ---------------------------------------------------------------------------
// ReadbackBuffer
// ---------------------------------------------------------------------------

/// A host-mappable buffer sized for one padded RGBA image.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
}

impl ReadbackBuffer {
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Result<Self, GpuError> {
        let padded_row = padded_row_bytes(width);
        let buffer = ctx
            .guarded(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("GpuImage::readback"),
                    size: u64::from(padded_row) * u64::from(height),
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .map_err(|source| GpuError::MemObjectAllocation { what: "readback buffer", source })?;
        Ok(ReadbackBuffer { buffer, width, height, padded_row })
    }

    /// Map the buffer and copy its rows into a new RGBA [`PixelBuffer`].
    ///
    /// Waits for all submitted work touching the buffer.
    pub fn read(&self, ctx: &GpuContext) -> Result<PixelBuffer, GpuError> {
        let slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver outlives the poll below; a failed send only means
            // nobody is waiting any more.
            let _ = sender.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| GpuError::MapFailure("map callback was never invoked".into()))?
            .map_err(|e| GpuError::MapFailure(e.to_string()))?;

        let mut out = PixelBuffer::new(self.width as usize, self.height as usize, Channels::Rgba);
        {
            let mapped = slice.get_mapped_range();
            unpad_rows(&mapped, self.padded_row as usize, out.as_bytes_mut());
        }
        self.buffer.unmap();
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d { width, height, depth_or_array_layers: 1 }
}

fn dims_u32(img: &PixelBuffer) -> Result<(u32, u32), GpuError> {
    let too_large = || GpuError::InvalidImageSize { width: img.width(), height: img.height() };
    let width = u32::try_from(img.width()).map_err(|_| too_large())?;
    let height = u32::try_from(img.height()).map_err(|_| too_large())?;
    Ok((width, height))
}

/// Row pitch of a staging buffer for an RGBA image `width` pixels wide.
pub(crate) fn padded_row_bytes(width: u32) -> u32 {
    align_to(width * TEXEL_BYTES, COPY_ALIGNMENT)
}

/// Round `value` up to the next multiple of `alignment`.
///
///   align_to(100, 256) = 256
///   align_to(256, 256) = 256
///   align_to(257, 256) = 512
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Copy tightly packed rows of `row_bytes` into a buffer with `padded_row`
/// pitch. Padding bytes are zero.
fn pad_rows(src: &[u8], row_bytes: usize, padded_row: usize) -> Vec<u8> {
    if row_bytes == 0 {
        return Vec::new();
    }
    let rows = src.len() / row_bytes;
    let mut out = vec![0u8; rows * padded_row];
    for (dst, row) in out.chunks_exact_mut(padded_row).zip(src.chunks_exact(row_bytes)) {
        dst[..row_bytes].copy_from_slice(row);
    }
    out
}

/// Inverse of [`pad_rows`]: fill `dst` row by row from a padded buffer.
fn unpad_rows(src: &[u8], padded_row: usize, dst: &mut [u8]) {
    let rows = src.len() / padded_row.max(1);
    if rows == 0 {
        return;
    }
    let row_bytes = dst.len() / rows;
    if row_bytes == 0 {
        return;
    }
    for (row, padded) in dst.chunks_exact_mut(row_bytes).zip(src.chunks_exact(padded_row)) {
        row.copy_from_slice(&padded[..row_bytes]);
    }
}
