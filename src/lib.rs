// gaussblur: Gaussian blur of binary PPM images on the GPU
//
// Host side: PPM codec, RGB↔RGBA padding, kernel weights, and a CPU
// reference convolution. Device side (`gpu`): adapter discovery, program
// compilation and a single compute dispatch through wgpu.

pub mod config;
pub mod convert;
pub mod convolution;
pub mod error;
pub mod gpu;
pub mod image;
pub mod kernel;
pub mod ppm;

use std::io::Write;

pub use config::BlurConfig;
pub use error::{Error, Result};
pub use image::{Channels, PixelBuffer};
pub use kernel::Kernel;

use gpu::{ComputeProgram, ConvolutionPipeline, Discovery, GpuContext};

/// Blur an RGB image on the device: pad to RGBA, dispatch, drop alpha.
pub fn blur_rgb(
    ctx: &GpuContext,
    program: &ComputeProgram,
    kernel: &Kernel,
    rgb: &PixelBuffer,
) -> std::result::Result<PixelBuffer, gpu::GpuError> {
    let rgba = convert::rgb_to_rgba(rgb);
    let blurred = ConvolutionPipeline::new(ctx, program).run(&rgba, kernel)?;
    Ok(convert::rgba_to_rgb(&blurred))
}

/// One full run of the tool.
///
/// The input image is read and validated before any device work, so format
/// errors never need an adapter. The platform/device report is written to
/// `report`. Nothing is written to `config.output` unless the blur succeeds.
pub fn run<W: Write>(config: &BlurConfig, report: &mut W) -> Result<()> {
    let rgb = ppm::load(&config.input)?;
    tracing::info!(
        input = %config.input.display(),
        width = rgb.width(),
        height = rgb.height(),
        radius = config.radius,
        "blurring"
    );

    let kernel = Kernel::build(config.radius);

    let discovery = Discovery::enumerate()?;
    write!(report, "{discovery}")?;
    report.flush()?;

    let ctx = GpuContext::create(discovery, config.workgroup)?;
    writeln!(report, "Context created")?;
    let source = ComputeProgram::load_source(&config.kernel_source)?;
    let program = ComputeProgram::compile(&ctx, &source, config.radius)?;

    let blurred = blur_rgb(&ctx, &program, &kernel, &rgb)?;
    ppm::save(&blurred, &config.output)?;
    tracing::info!(output = %config.output.display(), "done");
    Ok(())
}
