// config.rs — Run configuration.
//
// Everything one invocation of the tool needs, independent of how it was
// obtained. The binary builds it from the command line; tests and benches
// build it directly.

use std::path::PathBuf;

use crate::gpu::device::WorkgroupSize;
use crate::gpu::program::DEFAULT_SOURCE_PATH;

pub const DEFAULT_INPUT: &str = "test.ppm";
pub const DEFAULT_OUTPUT: &str = "output.ppm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlurConfig {
    /// Gaussian kernel radius; the kernel is (2r+1)×(2r+1).
    pub radius: u32,
    /// P6 image to blur.
    pub input: PathBuf,
    /// Where the blurred P6 image is written.
    pub output: PathBuf,
    /// WGSL program source.
    pub kernel_source: PathBuf,
    pub workgroup: WorkgroupSize,
}

impl BlurConfig {
    /// Defaults for everything but the radius.
    pub fn new(radius: u32) -> Self {
        BlurConfig {
            radius,
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            kernel_source: PathBuf::from(DEFAULT_SOURCE_PATH),
            workgroup: WorkgroupSize::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BlurConfig::new(3);
        assert_eq!(cfg.radius, 3);
        assert_eq!(cfg.input, PathBuf::from("test.ppm"));
        assert_eq!(cfg.output, PathBuf::from("output.ppm"));
        assert_eq!(cfg.kernel_source, PathBuf::from("kernels/blur.wgsl"));
        assert_eq!(cfg.workgroup, WorkgroupSize { x: 16, y: 8 });
    }
}
