//! Write a synthesized smoothing kernel to a FITS file for inspection

use std::path::PathBuf;

use anyhow::Result;
use astro_tools::args::KernelArgs;
use astro_tools::pipeline::write_kernel_fits;
use clap::Parser;
use smoothing::{synthesize_1d, synthesize_3d, Normalization, WIDTH_TOLERANCE};

/// Command line arguments for kernel export
#[derive(Parser, Debug)]
#[command(
    name = "kernel_fits",
    about = "Writes a Gaussian smoothing kernel as a FITS image",
    long_about = None
)]
struct Args {
    /// Output FITS file
    output: PathBuf,

    #[command(flatten)]
    kernel: KernelArgs,

    /// Scale samples by the Gaussian PDF constant instead of to unit sum
    #[arg(long, default_value_t = false)]
    density: bool,

    /// Always build the full 3D kernel, even for equal widths
    #[arg(long, default_value_t = false)]
    full: bool,

    /// Gzip the output to <output>.gz
    #[arg(long, default_value_t = false)]
    compress: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let params = args.kernel.to_parameters();
    let normalization = if args.density {
        Normalization::Density
    } else {
        Normalization::Filter
    };

    let widths = params.effective_widths();
    let isotropic = (widths[0] - widths[1]).abs() < WIDTH_TOLERANCE
        && (widths[1] - widths[2]).abs() < WIDTH_TOLERANCE;
    let kernel = if isotropic && !args.full {
        synthesize_1d(widths[0], params.accuracy, normalization)
    } else {
        synthesize_3d(widths, params.accuracy, params.rotation_degrees(), normalization)
    };

    let outcome = write_kernel_fits(&kernel, &args.output, args.compress)?;
    let lengths = kernel.lengths();
    println!(
        "{:?} kernel {}x{}x{} (sum {:.6}, center {:.6}) written to {}",
        kernel.shape(),
        lengths.x,
        lengths.y,
        lengths.z,
        kernel.sum(),
        kernel.center(),
        outcome.path.display()
    );
    Ok(())
}
