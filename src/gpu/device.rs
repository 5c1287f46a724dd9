// gpu/device.rs — Platform/device discovery and the compute context.
//
// Responsibilities:
//   - Enumerate every adapter wgpu can see and group them into platforms
//     (one platform per backend: Vulkan, Metal, DX12, GL), in the order the
//     instance reports them.
//   - Select the first platform and its compute-capable adapters (devices).
//   - Open a logical device + queue on the primary (first) device. Together
//     with the instance this is the context every later stage borrows.
//   - Funnel every device call through `GpuContext::guarded`, which turns
//     wgpu's out-of-band validation / out-of-memory reports into a `Result`.
//
// REPORT
// The discovery report is a `Display` impl so the binary can print it to
// stdout before the context is created:
//
//   Found 1 platform(s)
//   	 (1) : Vulkan
//   Found 2 device(s)
//   	 (1) : NVIDIA GeForce RTX 3070
//   	 (2) : llvmpipe (LLVM 17.0.6, 256 bits)
//
// ERROR SCOPES
// wgpu reports most creation failures asynchronously to the device's error
// sink instead of returning them; the default sink panics. Wrapping a call
// in a Validation + OutOfMemory error scope and popping both right after
// gives the synchronous, per-call status the pipeline needs.

use std::fmt;
use std::str::FromStr;

use crate::gpu::error::GpuError;

/// A workgroup size configuration for 2D compute dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Upper bound on invocations per workgroup guaranteed by every WebGPU
    /// implementation (`Limits::default().max_compute_invocations_per_workgroup`).
    pub const MAX_PORTABLE_INVOCATIONS: u32 = 256;

    /// Total invocations per workgroup (x * y).
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Validate against device limits.
    pub fn validate(&self, limits: &wgpu::Limits) -> Result<(), GpuError> {
        let fail = |reason: String| GpuError::InvalidWorkgroupSize { x: self.x, y: self.y, reason };
        if self.x == 0 || self.y == 0 {
            return Err(fail("dimensions must be non-zero".into()));
        }
        if self.x > limits.max_compute_workgroup_size_x || self.y > limits.max_compute_workgroup_size_y {
            return Err(fail(format!(
                "exceeds per-dimension limit {}×{}",
                limits.max_compute_workgroup_size_x, limits.max_compute_workgroup_size_y,
            )));
        }
        let max = limits.max_compute_invocations_per_workgroup;
        match self.x.checked_mul(self.y) {
            Some(total) if total <= max => Ok(()),
            _ => Err(fail(format!("exceeds limit of {max} invocations"))),
        }
    }

    /// Number of workgroups covering a `width × height` grid (ceiling
    /// division). The shader discards invocations outside the image.
    pub fn dispatch_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(self.x), height.div_ceil(self.y))
    }
}

impl Default for WorkgroupSize {
    /// 16×8 = 128 invocations: four 32-wide warps or two 64-wide wavefronts.
    fn default() -> Self {
        WorkgroupSize { x: 16, y: 8 }
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl FromStr for WorkgroupSize {
    type Err = String;

    /// Parse `"<x>x<y>"`, e.g. `"16x8"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected <x>x<y>, got {s:?}"))?;
        let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
        let ws = WorkgroupSize { x: parse(x)?, y: parse(y)? };
        if ws.x == 0 || ws.y == 0 {
            return Err("workgroup dimensions must be non-zero".into());
        }
        if ws.x.saturating_mul(ws.y) > Self::MAX_PORTABLE_INVOCATIONS {
            return Err(format!(
                "{ws} has {} invocations, more than {}",
                ws.x.saturating_mul(ws.y),
                Self::MAX_PORTABLE_INVOCATIONS
            ));
        }
        Ok(ws)
    }
}

// ============================================================
// Discovery
// ============================================================

/// Cached adapter information for reporting and logging.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl From<wgpu::AdapterInfo> for DeviceInfo {
    fn from(info: wgpu::AdapterInfo) -> Self {
        DeviceInfo {
            name: info.name,
            vendor: info.vendor,
            device: info.device,
            device_type: info.device_type,
            backend: info.backend,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// All adapters reported for one backend.
#[derive(Debug, Clone)]
pub struct Platform {
    pub backend: wgpu::Backend,
    /// Adapters of this backend that can run compute shaders.
    pub devices: Vec<DeviceInfo>,
}

impl Platform {
    pub fn name(&self) -> String {
        format!("{:?}", self.backend)
    }
}

/// Result of probing the host for platforms and devices.
///
/// Holds the instance and the adapters of the first platform until
/// [`GpuContext::create`] consumes it.
pub struct Discovery {
    platforms: Vec<Platform>,
    adapters: Vec<wgpu::Adapter>,
    instance: wgpu::Instance,
}

impl Discovery {
    /// Enumerate every adapter on every backend and select the first
    /// platform.
    ///
    /// # Errors
    /// `NoPlatform` if nothing is reported at all, `NoDevice` if the first
    /// platform has no adapter able to run compute shaders.
    pub fn enumerate() -> Result<Self, GpuError> {
        let flags = if cfg!(debug_assertions) {
            // Validation layer in debug builds for shader error feedback.
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            // Lets dzn (D3D12-on-Vulkan, WSL2) show up as a device.
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            ..Default::default()
        });

        let mut platforms: Vec<Platform> = Vec::new();
        let mut first_adapters: Vec<wgpu::Adapter> = Vec::new();

        for adapter in instance.enumerate_adapters(wgpu::Backends::all()) {
            let info = DeviceInfo::from(adapter.get_info());
            let idx = match platforms.iter().position(|p| p.backend == info.backend) {
                Some(i) => i,
                None => {
                    platforms.push(Platform { backend: info.backend, devices: Vec::new() });
                    platforms.len() - 1
                }
            };

            let compute = adapter
                .get_downlevel_capabilities()
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
            tracing::debug!(adapter = %info, compute, "enumerated adapter");
            if !compute {
                tracing::warn!(adapter = %info, "skipping adapter without compute shader support");
                continue;
            }

            platforms[idx].devices.push(info);
            if idx == 0 {
                first_adapters.push(adapter);
            }
        }

        let first = platforms.first().ok_or(GpuError::NoPlatform)?;
        if first.devices.is_empty() {
            return Err(GpuError::NoDevice { platform: first.name() });
        }

        Ok(Discovery { platforms, adapters: first_adapters, instance })
    }

    /// The platform a context will be bound to.
    pub fn selected(&self) -> &Platform {
        &self.platforms[0]
    }
}

impl fmt::Display for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_report(f, &self.platforms)
    }
}

/// Platform list, then the devices of the first platform.
fn write_report(f: &mut fmt::Formatter<'_>, platforms: &[Platform]) -> fmt::Result {
    writeln!(f, "Found {} platform(s)", platforms.len())?;
    for (i, p) in platforms.iter().enumerate() {
        writeln!(f, "\t ({}) : {}", i + 1, p.name())?;
    }
    let devices = platforms.first().map(|p| p.devices.as_slice()).unwrap_or_default();
    writeln!(f, "Found {} device(s)", devices.len())?;
    for (i, d) in devices.iter().enumerate() {
        writeln!(f, "\t ({}) : {}", i + 1, d.name)?;
    }
    Ok(())
}

// ============================================================
// Context
// ============================================================

/// The compute context: a logical device + queue on the primary device of
/// the selected platform.
///
/// Create once per process. Programs and dispatches borrow it, so the
/// borrow checker guarantees they are released first.
///
/// # Field drop order
/// Rust drops struct fields in declaration order. `device` and `queue` come
/// first; the adapters and the instance are declared last so they outlive
/// every device-level object.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub platform: Platform,
    pub workgroup_size: WorkgroupSize,
    _adapters: Vec<wgpu::Adapter>,
    _instance: wgpu::Instance,
}

impl GpuContext {
    /// Enumerate adapters and open a context with the default workgroup size.
    pub fn new() -> Result<Self, GpuError> {
        Self::create(Discovery::enumerate()?, WorkgroupSize::default())
    }

    /// Bind a context to the selected platform of `discovery`, opening the
    /// device on its first adapter.
    pub fn create(discovery: Discovery, workgroup_size: WorkgroupSize) -> Result<Self, GpuError> {
        let Discovery { mut platforms, adapters, instance } = discovery;
        let platform = platforms.swap_remove(0);
        let primary = &adapters[0];
        let primary_info = &platform.devices[0];

        let limits = primary.limits();
        workgroup_size.validate(&limits)?;

        let (device, queue) = pollster::block_on(primary.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("gaussblur"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|source| GpuError::ContextCreation {
            device: primary_info.name.clone(),
            source,
        })?;

        tracing::info!(
            device = %primary_info,
            platform = %platform.name(),
            devices = platform.devices.len(),
            workgroup = %workgroup_size,
            "context created",
        );

        Ok(GpuContext {
            device,
            queue,
            platform,
            workgroup_size,
            _adapters: adapters,
            _instance: instance,
        })
    }

    /// The device every resource is created on.
    pub fn primary_device(&self) -> &DeviceInfo {
        &self.platform.devices[0]
    }

    /// Run `f` inside a Validation + OutOfMemory error scope and return the
    /// first error the device reported while it ran.
    pub fn guarded<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, wgpu::Error> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let value = f(&self.device);
        let oom = pollster::block_on(self.device.pop_error_scope());
        let validation = pollster::block_on(self.device.pop_error_scope());
        match oom.or(validation) {
            Some(err) => {
                tracing::debug!(error = %err, "device call failed");
                Err(err)
            }
            None => Ok(value),
        }
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_default() {
        let ws = WorkgroupSize::default();
        assert_eq!((ws.x, ws.y), (16, 8));
        assert_eq!(ws.total(), 128);
    }

    #[test]
    fn test_workgroup_parse() {
        assert_eq!("8x8".parse::<WorkgroupSize>(), Ok(WorkgroupSize { x: 8, y: 8 }));
        assert_eq!("32X4".parse::<WorkgroupSize>(), Ok(WorkgroupSize { x: 32, y: 4 }));
        assert!("16".parse::<WorkgroupSize>().is_err());
        assert!("0x8".parse::<WorkgroupSize>().is_err());
        assert!("ax8".parse::<WorkgroupSize>().is_err());
        assert!("32x16".parse::<WorkgroupSize>().is_err());
    }

    #[test]
    fn test_workgroup_display_round_trips() {
        let ws = WorkgroupSize { x: 4, y: 2 };
        assert_eq!(ws.to_string().parse::<WorkgroupSize>(), Ok(ws));
    }

    #[test]
    fn test_workgroup_validate_against_default_limits() {
        let limits = wgpu::Limits::default();
        assert!(WorkgroupSize { x: 16, y: 16 }.validate(&limits).is_ok());
        let err = WorkgroupSize { x: 16, y: 17 }.validate(&limits).unwrap_err();
        assert!(matches!(err, GpuError::InvalidWorkgroupSize { x: 16, y: 17, .. }));
        assert!(WorkgroupSize { x: 512, y: 1 }.validate(&limits).is_err());
    }

    #[test]
    fn test_dispatch_size_exact() {
        let ws = WorkgroupSize::default();
        assert_eq!(ws.dispatch_size(640, 480), (40, 60));
    }

    #[test]
    fn test_dispatch_size_ceiling() {
        let ws = WorkgroupSize { x: 8, y: 8 };
        // 100 / 8 = 12.5 → 13 groups; invocations 100..104 are discarded.
        assert_eq!(ws.dispatch_size(100, 100), (13, 13));
        assert_eq!(ws.dispatch_size(1, 1), (1, 1));
    }

    #[test]
    fn test_report_format() {
        let platforms = vec![Platform {
            backend: wgpu::Backend::Vulkan,
            devices: vec![DeviceInfo {
                name: "Test GPU".into(),
                vendor: 0,
                device: 0,
                device_type: wgpu::DeviceType::DiscreteGpu,
                backend: wgpu::Backend::Vulkan,
            }],
        }];
        let report = format_report(&platforms);
        assert_eq!(
            report,
            "Found 1 platform(s)\n\t (1) : Vulkan\nFound 1 device(s)\n\t (1) : Test GPU\n"
        );
    }

    // Discovery needs a live instance; render from the platform list alone.
    fn format_report(platforms: &[Platform]) -> String {
        struct Report<'a>(&'a [Platform]);
        impl fmt::Display for Report<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_report(f, self.0)
            }
        }
        Report(platforms).to_string()
    }
}
