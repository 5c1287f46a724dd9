// gpu/error.rs — Errors from the GPU layer.
//
// Every failing device call ends up here. Each variant carries a stable
// negative status code in the OpenCL numbering (`GpuError::code`) so the
// binary can report "GPU call failed with error <code>" and operators can
// grep for it, independent of the wgpu message text.

use std::path::PathBuf;

/// Errors from device discovery, program compilation and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// No backend reported any adapter.
    #[error("no GPU platform found")]
    NoPlatform,

    /// The first platform has no compute-capable adapter.
    #[error("no compute-capable GPU device found on platform {platform}")]
    NoDevice { platform: String },

    /// `request_device` on the primary adapter failed.
    #[error("failed to create a context on {device}: {source}")]
    ContextCreation {
        device: String,
        #[source]
        source: wgpu::RequestDeviceError,
    },

    /// Texture or buffer creation was rejected.
    #[error("failed to allocate {what}: {source}")]
    MemObjectAllocation {
        what: &'static str,
        #[source]
        source: wgpu::Error,
    },

    /// Submitting the dispatch failed.
    #[error("dispatch failed: {0}")]
    OutOfResources(#[source] wgpu::Error),

    /// Binding the resources to the kernel failed.
    #[error("invalid kernel arguments: {0}")]
    InvalidKernelArgs(#[source] wgpu::Error),

    /// Preprocessing or WGSL validation failed.
    #[error("program build failed:\n{log}")]
    BuildProgramFailure { log: String },

    /// The image does not fit in a 2D texture.
    #[error("invalid image size {width}×{height}")]
    InvalidImageSize { width: usize, height: usize },

    /// The readback buffer could not be mapped.
    #[error("failed to map readback buffer: {0}")]
    MapFailure(String),

    /// The program source could not be read.
    #[error("failed to read program source {}: {source}", .path.display())]
    ProgramSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiled program has no usable entry point of this name.
    #[error("cannot create kernel {name:?}: {log}")]
    InvalidKernelName { name: String, log: String },

    /// Workgroup dimensions exceed the device limits or are zero.
    #[error("invalid workgroup size {x}×{y}: {reason}")]
    InvalidWorkgroupSize { x: u32, y: u32, reason: String },
}

impl GpuError {
    /// Numeric status code (OpenCL numbering).
    pub fn code(&self) -> i32 {
        match self {
            GpuError::NoPlatform => -1001,
            GpuError::NoDevice { .. } => -1,
            GpuError::ContextCreation { .. } => -2,
            GpuError::MemObjectAllocation { .. } => -4,
            GpuError::OutOfResources(_) => -5,
            GpuError::BuildProgramFailure { .. } => -11,
            GpuError::MapFailure(_) => -12,
            GpuError::ProgramSource { .. } => -30,
            GpuError::InvalidImageSize { .. } => -40,
            GpuError::InvalidKernelName { .. } => -46,
            GpuError::InvalidKernelArgs(_) => -52,
            GpuError::InvalidWorkgroupSize { .. } => -54,
        }
    }
}
