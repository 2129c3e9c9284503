//! Smooth a FITS data cube with a Gaussian or box kernel
//!
//! Reads the primary image of a (possibly gzipped) FITS file, convolves it
//! and writes the smoothed cube with the original header carried over.

use std::path::PathBuf;

use anyhow::Result;
use astro_tools::args::KernelArgs;
use astro_tools::pipeline::{smooth_fits, PipelineOptions};
use clap::Parser;
use smoothing::SmoothingParameters;

/// Command line arguments for cube smoothing
#[derive(Parser, Debug)]
#[command(
    name = "smooth_cube",
    about = "Smooths a FITS data cube with a Gaussian or box kernel",
    long_about = None
)]
struct Args {
    /// Input FITS file (.fits or .fits.gz)
    input: PathBuf,

    /// Output FITS file
    output: PathBuf,

    #[command(flatten)]
    kernel: KernelArgs,

    /// Load smoothing parameters from a JSON file instead of the flags
    #[arg(long)]
    params: Option<PathBuf>,

    /// Save the smoothing parameters used to a JSON file
    #[arg(long)]
    save_params: Option<PathBuf>,

    /// Gzip the output to <output>.gz
    #[arg(long, default_value_t = false)]
    compress: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut params = match &args.params {
        Some(path) => SmoothingParameters::load_from_file(path)?,
        None => args.kernel.to_parameters(),
    };

    let options = PipelineOptions {
        compress: args.compress,
        cancel: None,
    };
    let report = smooth_fits(&args.input, &args.output, &params, &options)?;

    if let Some(path) = &args.save_params {
        params.recompute_kernels();
        params.save_to_file(path)?;
    }

    println!(
        "Smoothed {:?} cube with a {}x{}x{} kernel: {} ({} voxels)",
        report.dimensions,
        report.kernel_lengths.x,
        report.kernel_lengths.y,
        report.kernel_lengths.z,
        report.output.path.display(),
        report.output.elements_written
    );
    Ok(())
}
