use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use gaussblur::config::{DEFAULT_INPUT, DEFAULT_OUTPUT};
use gaussblur::gpu::program::DEFAULT_SOURCE_PATH;
use gaussblur::gpu::WorkgroupSize;
use gaussblur::BlurConfig;

const USAGE: &str =
    "Usage: gaussblur <RADIUS> [--input PATH] [--output PATH] [--kernel PATH] [--workgroup WxH] [-v...]";

/// Gaussian blur of a binary PPM image on the GPU.
#[derive(Parser, Debug)]
#[command(name = "gaussblur", version)]
struct Cli {
    /// Kernel radius; the kernel is (2r+1)×(2r+1) with sigma = r/2.
    radius: u32,

    /// P6 image to blur.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Where to write the blurred P6 image.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// WGSL program source.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SOURCE_PATH)]
    kernel: PathBuf,

    /// Compute workgroup size.
    #[arg(long, value_name = "WxH", default_value_t = WorkgroupSize::default())]
    workgroup: WorkgroupSize,

    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl From<Cli> for BlurConfig {
    fn from(cli: Cli) -> Self {
        BlurConfig {
            radius: cli.radius,
            input: cli.input,
            output: cli.output,
            kernel_source: cli.kernel,
            workgroup: cli.workgroup,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            // clap prints parse errors to stderr.
            let _ = e.print();
            println!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);
    let config = BlurConfig::from(cli);

    match gaussblur::run(&config, &mut std::io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.gpu_code() {
                Some(code) => eprintln!("GPU call failed with error {code}: {e}"),
                None => eprintln!("error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}
