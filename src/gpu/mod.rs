// gpu/mod.rs — Device side of the blur.
//
// The host modules in the parent crate own the data (PPM codec, channel
// conversion, kernel weights). This layer moves that data through wgpu:
//
//   device   : platform/device discovery and the compute context
//   program  : WGSL source → compiled `Filter` kernel for one radius
//   image    : RGBA textures, upload and readback
//   pipeline : one dispatch of the blur over a host image
//   error    : `GpuError` with stable numeric status codes
//
// `crate::convolution::convolve_reference` is the host mirror of the kernel
// and the reference the device output is tested against.

pub mod device;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod program;

pub use device::{Discovery, GpuContext, WorkgroupSize};
pub use error::GpuError;
pub use pipeline::ConvolutionPipeline;
pub use program::ComputeProgram;
