// gpu/program.rs — Compiling the blur program.
//
// The device program is WGSL text with `{{NAME}}` define tokens. Compiling
// substitutes every define and hands the result to wgpu, the way an OpenCL
// build would receive `-D RADIUS=3`:
//
//   const RADIUS: i32 = {{RADIUS}};              // kernels/blur.wgsl
//   @compute @workgroup_size({{WG_X}}, {{WG_Y}}, 1)
//
// Baking the radius in lets the shader compiler see a constant loop bound,
// at the cost of one compile per radius. The radius is fixed for the life of
// the process, so every run compiles exactly once.
//
// naga does not accept pipeline-overridable constants inside
// @workgroup_size(), so the workgroup size goes through the same
// substitution instead of `PipelineCompilationOptions::constants`.
//
// Binding interface of the `Filter` entry point (group 0):
//   0  texture_2d<f32>                     input image
//   1  var<storage, read> array<f32>       weights, row-major (2r+1)²
//   2  texture_storage_2d<rgba8unorm, write> output image

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use crate::gpu::device::{GpuContext, WorkgroupSize};
use crate::gpu::error::GpuError;

/// Name of the kernel entry point.
pub const ENTRY_POINT: &str = "Filter";

/// Where the binary looks for the program source by default.
pub const DEFAULT_SOURCE_PATH: &str = "kernels/blur.wgsl";

/// The blur program shipped with the crate.
pub const BLUR_WGSL: &str = include_str!("../../kernels/blur.wgsl");

/// Compile-time definitions applied to the program source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramOptions {
    defines: Vec<(String, String)>,
}

impl ProgramOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition, like `-D name=value`.
    pub fn define(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let name = name.into();
        let value = value.to_string();
        match self.defines.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.defines.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.defines.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Substitute every `{{NAME}}` token in `source`.
    ///
    /// # Errors
    /// `BuildProgramFailure` naming the first token without a definition.
    pub fn apply(&self, source: &str) -> Result<String, GpuError> {
        let mut out = source.to_owned();
        for (name, value) in &self.defines {
            out = out.replace(&format!("{{{{{name}}}}}"), value);
        }
        if let Some(start) = out.find("{{") {
            let rest = &out[start + 2..];
            let name = rest.split("}}").next().unwrap_or(rest);
            return Err(GpuError::BuildProgramFailure {
                log: format!("undefined program constant {name:?} (options: {self})"),
            });
        }
        Ok(out)
    }
}

impl fmt::Display for ProgramOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.defines.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "-D {name}={value}")?;
        }
        Ok(())
    }
}

/// A compiled blur program: the `Filter` kernel plus the shader module and
/// binding layout it was built from.
///
/// Borrows nothing, but is only valid with the `GpuContext` that compiled
/// it. Fields are declared kernel first so the kernel is released before
/// the program module.
pub struct ComputeProgram {
    kernel: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    _module: wgpu::ShaderModule,
    radius: u32,
    workgroup_size: WorkgroupSize,
}

impl ComputeProgram {
    /// Read program source text from `path`.
    pub fn load_source(path: impl AsRef<Path>) -> Result<String, GpuError> {
        let path = path.as_ref();
        std::fs::read_to_string(path).map_err(|source| GpuError::ProgramSource {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compile `source` for the context's device with `RADIUS = radius` and
    /// the context's workgroup size baked in.
    pub fn compile(ctx: &GpuContext, source: &str, radius: u32) -> Result<Self, GpuError> {
        let ws = ctx.workgroup_size;
        let options = ProgramOptions::new()
            .define("RADIUS", radius)
            .define("WG_X", ws.x)
            .define("WG_Y", ws.y);
        let text = options.apply(source)?;
        tracing::debug!(%options, device = %ctx.primary_device(), "building program");

        let module = ctx
            .guarded(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("blur.wgsl"),
                    source: wgpu::ShaderSource::Wgsl(Cow::Owned(text)),
                })
            })
            .map_err(|e| GpuError::BuildProgramFailure { log: e.to_string() })?;

        let layout = ctx
            .guarded(|device| device.create_bind_group_layout(&filter_layout_descriptor()))
            .map_err(|e| GpuError::BuildProgramFailure { log: e.to_string() })?;

        let kernel = ctx
            .guarded(|device| {
                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Filter pipeline layout"),
                    bind_group_layouts: &[&layout],
                    push_constant_ranges: &[],
                });
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(ENTRY_POINT),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: ENTRY_POINT,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
            })
            .map_err(|e| GpuError::InvalidKernelName {
                name: ENTRY_POINT.to_owned(),
                log: e.to_string(),
            })?;

        tracing::info!(radius, workgroup = %ws, "program built");
        Ok(ComputeProgram { kernel, layout, _module: module, radius, workgroup_size: ws })
    }

    /// The radius baked into this program.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn workgroup_size(&self) -> WorkgroupSize {
        self.workgroup_size
    }

    pub(crate) fn kernel(&self) -> &wgpu::ComputePipeline {
        &self.kernel
    }

    pub(crate) fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }
}

/// Layout matching the `@group(0)` bindings of `Filter`.
fn filter_layout_descriptor() -> wgpu::BindGroupLayoutDescriptor<'static> {
    const ENTRIES: &[wgpu::BindGroupLayoutEntry] = &[
        // Binding 0 — input image
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
            },
            count: None,
        },
        // Binding 1 — weights
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        // Binding 2 — output image
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba8Unorm,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        },
    ];
    wgpu::BindGroupLayoutDescriptor { label: Some("Filter BGL"), entries: ENTRIES }
}
