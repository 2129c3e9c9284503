//! Read, smooth and write FITS cubes

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fits_io::{
    attribute_key, image_attributes, read_fits, AttributeMap, FitsVolume, FitsWriter,
    VoxelBuffer, VoxelData, WriteOutcome,
};
use log::info;
use ndarray::Array3;
use smoothing::{
    box_kernels, recompute_kernels, smooth, ConvolveOptions, FilterKind, Kernel, KernelLengths,
    KernelShape, SmoothingParameters,
};

/// Options for [`smooth_fits`]
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Gzip the output to `<output>.gz`
    pub compress: bool,
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Summary of one [`smooth_fits`] run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub dimensions: Vec<usize>,
    pub kernel_lengths: KernelLengths,
    pub output: WriteOutcome,
}

fn kernel_lengths(params: &SmoothingParameters) -> KernelLengths {
    match params.filter {
        FilterKind::Box => box_kernels(params).lengths(),
        FilterKind::Gaussian => recompute_kernels(params).lengths(),
    }
}

fn history_line(params: &SmoothingParameters) -> String {
    let [wx, wy, wz] = params.effective_widths();
    match params.filter {
        FilterKind::Box => format!("Box smoothing widths {wx} {wy} {wz}"),
        FilterKind::Gaussian => {
            let [rx, ry, rz] = params.rotation_degrees();
            format!(
                "Gaussian smoothing FWHM {wx} {wy} {wz} rotation {rx} {ry} {rz} accuracy {}",
                params.accuracy
            )
        }
    }
}

/// Insert `text` under the first free `HISTORYn` attribute
fn append_history(attributes: &mut AttributeMap, text: String) {
    let key = (1..)
        .map(|n| attribute_key(&format!("HISTORY{n}")))
        .find(|key| !attributes.contains_key(key))
        .unwrap_or_else(|| attribute_key("HISTORY"));
    attributes.insert(key, text);
}

fn volume_array<T>(volume: &FitsVolume, data: Vec<T>) -> Result<Array3<T>> {
    Array3::from_shape_vec(volume.shape_zyx(), data).with_context(|| {
        format!(
            "{} voxels do not fill a {:?} cube",
            volume.data.len(),
            volume.dimensions
        )
    })
}

/// Smooth the primary image of `input` and write it to `output`.
///
/// Double-precision cubes stay double; everything else is smoothed and
/// written as 32-bit floats. The header is carried over with BITPIX
/// updated and a HISTORY card describing the filter.
pub fn smooth_fits(
    input: &Path,
    output: &Path,
    params: &SmoothingParameters,
    options: &PipelineOptions,
) -> Result<PipelineReport> {
    let volume = read_fits(input).with_context(|| format!("reading {}", input.display()))?;
    if volume.element_count() == 0 {
        bail!("{} holds an empty image", input.display());
    }

    let convolve = ConvolveOptions {
        cores: params.cores,
        cancel: options.cancel.clone(),
    };
    let lengths = kernel_lengths(params);
    info!(
        "Smoothing {:?} cube from {} with kernel {}x{}x{}",
        volume.dimensions,
        input.display(),
        lengths.x,
        lengths.y,
        lengths.z
    );

    let mut attributes = volume.attributes.clone();
    attributes.remove(&attribute_key("BLANK"));
    append_history(&mut attributes, history_line(params));

    let mut writer = FitsWriter::new(output).compression(options.compress);
    if let Some(flag) = &options.cancel {
        writer = writer.cancellation(Arc::clone(flag));
    }

    let outcome = match &volume.data {
        VoxelData::Float64(data) => {
            let cube = volume_array(&volume, data.clone())?;
            let smoothed = smooth(&cube, params, &convolve)?;
            attributes.insert(attribute_key("BITPIX"), "-64".to_string());
            let flat: Vec<f64> = smoothed.iter().copied().collect();
            writer.write_image(&attributes, VoxelBuffer::Float64(&flat), &volume.dimensions)?
        }
        other => {
            let cube = volume_array(&volume, other.to_f32())?;
            let smoothed = smooth(&cube, params, &convolve)?;
            attributes.insert(attribute_key("BITPIX"), "-32".to_string());
            let flat: Vec<f32> = smoothed.iter().copied().collect();
            writer.write_image(&attributes, VoxelBuffer::Float32(&flat), &volume.dimensions)?
        }
    };

    info!("Wrote smoothed cube to {}", outcome.path.display());
    Ok(PipelineReport {
        input: input.to_path_buf(),
        dimensions: volume.dimensions.clone(),
        kernel_lengths: lengths,
        output: outcome,
    })
}

/// Write a synthesized kernel as a double-precision FITS image.
///
/// 3D kernels become an `x * y * z` cube, 1D kernels a single row.
pub fn write_kernel_fits(kernel: &Kernel, path: &Path, compress: bool) -> Result<WriteOutcome> {
    let lengths = kernel.lengths();
    let dims = match kernel.shape() {
        KernelShape::OneDimensional => vec![kernel.len()],
        KernelShape::ThreeDimensional => vec![lengths.x, lengths.y, lengths.z],
    };
    let attributes = image_attributes(-64, &dims);
    let outcome = FitsWriter::new(path)
        .compression(compress)
        .write_image(&attributes, VoxelBuffer::Float64(kernel.samples()), &dims)
        .with_context(|| format!("writing kernel to {}", path.display()))?;
    Ok(outcome)
}
