// benches/blur_benchmarks.rs — Kernel construction and blur throughput.
//
//   cargo bench --bench blur_benchmarks
//
// The GPU group is skipped (with a message) when no adapter is available.
// Its timings include upload, dispatch, readback and the RGB↔RGBA
// conversion: the full per-image cost of the tool minus file I/O.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use gaussblur::convert::rgb_to_rgba;
use gaussblur::convolution::convolve_reference;
use gaussblur::gpu::program::BLUR_WGSL;
use gaussblur::gpu::{ComputeProgram, GpuContext};
use gaussblur::image::{Channels, PixelBuffer};
use gaussblur::kernel::Kernel;

// ============================================================
// Shared helpers
// ============================================================

fn make_scene(w: usize, h: usize) -> PixelBuffer {
    let mut img = PixelBuffer::new(w, h, Channels::Rgb);
    for y in 0..h {
        for x in 0..w {
            let r = (x * 255 / w) as u8;
            let g = (y * 255 / h) as u8;
            let b = if (x / 32 + y / 32) % 2 == 0 { 220 } else { 30 };
            img.set_pixel(x, y, &[r, g, b]);
        }
    }
    img
}

// ============================================================
// Kernel
// ============================================================

fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_build");
    for r in [1u32, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(r), &r, |b, &r| b.iter(|| Kernel::build(r)));
    }
    group.finish();
}

// ============================================================
// Blur: CPU reference vs GPU
// ============================================================

fn bench_cpu_reference(c: &mut Criterion) {
    let img = rgb_to_rgba(&make_scene(320, 240));
    let mut group = c.benchmark_group("cpu_reference_320x240");
    group.sample_size(10);
    for r in [1u32, 3, 6] {
        let kernel = Kernel::build(r);
        group.bench_with_input(BenchmarkId::from_parameter(r), &kernel, |b, k| {
            b.iter(|| convolve_reference(&img, k))
        });
    }
    group.finish();
}

fn bench_gpu(c: &mut Criterion) {
    let ctx = match GpuContext::new() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("skipping GPU benchmarks: {e}");
            return;
        }
    };
    let img = make_scene(752, 480);

    let mut group = c.benchmark_group("gpu_blur_752x480");
    group.warm_up_time(Duration::from_secs(2));
    for r in [1u32, 3, 6] {
        let program = ComputeProgram::compile(&ctx, BLUR_WGSL, r).expect("program build");
        let kernel = Kernel::build(r);
        group.bench_with_input(BenchmarkId::from_parameter(r), &kernel, |b, k| {
            b.iter(|| gaussblur::blur_rgb(&ctx, &program, k, &img).expect("dispatch"))
        });
    }
    group.finish();
}

// ============================================================
// Register
// ============================================================

criterion_group!(benches, bench_kernel, bench_cpu_reference, bench_gpu);
criterion_main!(benches);
