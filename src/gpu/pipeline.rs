// gpu/pipeline.rs — One blur pass on the device.
//
// `ConvolutionPipeline::run` is the full host↔device round trip:
//
//   1. upload the RGBA image into a sampled texture
//   2. upload the weights into a read-only storage buffer
//   3. allocate the output storage texture and its readback buffer
//   4. bind (input, weights, output) to `Filter` in that order
//   5. dispatch ceil(w / wg_x) × ceil(h / wg_y) workgroups
//   6. copy the output texture into the readback buffer, submit, wait
//   7. map the readback buffer into a new host image
//
// Every device object created here lives in `DispatchResources` and is
// released when `run` returns, on success or error. The program and the
// context belong to the caller and outlive the call.

use wgpu::util::DeviceExt;

use crate::gpu::device::GpuContext;
use crate::gpu::error::GpuError;
use crate::gpu::image::{GpuImage, ReadbackBuffer};
use crate::gpu::program::{ComputeProgram, ENTRY_POINT};
use crate::image::{Channels, PixelBuffer};
use crate::kernel::Kernel;

/// Runs a compiled blur program against host images.
pub struct ConvolutionPipeline<'a> {
    ctx: &'a GpuContext,
    program: &'a ComputeProgram,
}

/// Per-dispatch device objects. Field order is release order: output
/// side first, then the weights, then the input image.
struct DispatchResources {
    readback: ReadbackBuffer,
    output: GpuImage,
    weights: wgpu::Buffer,
    input: GpuImage,
}

impl Drop for DispatchResources {
    fn drop(&mut self) {
        tracing::trace!(width = self.input.width, height = self.input.height, "releasing dispatch resources");
    }
}

impl<'a> ConvolutionPipeline<'a> {
    pub fn new(ctx: &'a GpuContext, program: &'a ComputeProgram) -> Self {
        ConvolutionPipeline { ctx, program }
    }

    /// Blur an RGBA image with `kernel` on the device.
    ///
    /// Returns an RGBA image of the same dimensions. A zero-sized image is
    /// returned as-is without touching the device.
    ///
    /// # Panics
    /// Panics if `image` is not RGBA or `kernel` has a different radius from
    /// the one the program was compiled with.
    #[tracing::instrument(skip_all, fields(width = image.width(), height = image.height(), radius = kernel.radius()))]
    pub fn run(&self, image: &PixelBuffer, kernel: &Kernel) -> Result<PixelBuffer, GpuError> {
        assert_eq!(image.channels(), Channels::Rgba, "device blur expects an RGBA image");
        assert_eq!(
            kernel.radius(),
            self.program.radius(),
            "kernel radius differs from the compiled program"
        );
        if image.is_empty() {
            return Ok(image.clone());
        }

        let ctx = self.ctx;
        let res = self.allocate(image, kernel)?;

        let bind_group = ctx
            .guarded(|device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Filter args"),
                    layout: self.program.bind_group_layout(),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&res.input.view),
                        },
                        wgpu::BindGroupEntry { binding: 1, resource: res.weights.as_entire_binding() },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&res.output.view),
                        },
                    ],
                })
            })
            .map_err(GpuError::InvalidKernelArgs)?;

        let (groups_x, groups_y) = self
            .program
            .workgroup_size()
            .dispatch_size(res.input.width, res.input.height);
        tracing::debug!(groups_x, groups_y, "dispatching {ENTRY_POINT}");

        ctx.guarded(|device| {
            let mut encoder =
                device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("blur") });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(ENTRY_POINT),
                    timestamp_writes: None,
                });
                pass.set_pipeline(self.program.kernel());
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(groups_x, groups_y, 1);
            }
            res.output.encode_readback(&mut encoder, &res.readback);
            ctx.queue.submit(std::iter::once(encoder.finish()));
        })
        .map_err(GpuError::OutOfResources)?;

        res.readback.read(ctx)
    }

    fn allocate(&self, image: &PixelBuffer, kernel: &Kernel) -> Result<DispatchResources, GpuError> {
        let ctx = self.ctx;
        let input = GpuImage::upload(ctx, image)?;

        let weights = ctx
            .guarded(|device| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("weights"),
                    contents: bytemuck::cast_slice(kernel.as_slice()),
                    usage: wgpu::BufferUsages::STORAGE,
                })
            })
            .map_err(|source| GpuError::MemObjectAllocation { what: "weights buffer", source })?;

        let output = GpuImage::storage(ctx, input.width, input.height)?;
        let readback = ReadbackBuffer::new(ctx, input.width, input.height)?;

        Ok(DispatchResources { readback, output, weights, input })
    }
}
