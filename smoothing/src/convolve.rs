//! Volume convolution for `Array3` cubes laid out `[z, y, x]`
//!
//! Samples falling outside the volume or holding NaN contribute nothing,
//! and the remaining weights are not renormalized, so edges darken the
//! same way blank regions do. Work is spread over a rayon pool sized by
//! `ConvolveOptions::cores`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use ndarray::{Array3, Axis, Zip};

use crate::boxcar::box_kernels;
use crate::error::SmoothingError;
use crate::kernel::{recompute_kernels, Kernel, KernelShape, SeparableKernel};
use crate::params::{FilterKind, SmoothingParameters};

/// Element types a volume can hold
pub trait VoxelValue: Copy + Send + Sync + 'static {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl VoxelValue for f32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl VoxelValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Options for controlling the convolution operation
#[derive(Debug, Clone, Default)]
pub struct ConvolveOptions {
    /// Worker threads, 0 uses the global rayon pool
    pub cores: usize,

    /// Set to abort the convolution between voxels
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ConvolveOptions {
    pub fn with_cores(cores: usize) -> Self {
        Self {
            cores,
            cancel: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn check_cancelled(&self) -> Result<(), SmoothingError> {
        if self.is_cancelled() {
            Err(SmoothingError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn run<R: Send>(
        &self,
        job: impl FnOnce() -> R + Send,
    ) -> Result<R, SmoothingError> {
        if self.cores == 0 {
            return Ok(job());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.cores)
            .build()?;
        Ok(pool.install(job))
    }
}

fn to_f64_volume<T: VoxelValue>(volume: &Array3<T>) -> Array3<f64> {
    volume.mapv(VoxelValue::to_f64)
}

fn from_f64_volume<T: VoxelValue>(volume: Array3<f64>) -> Array3<T> {
    volume.mapv(T::from_f64)
}

/// One 1D pass of `weights` along `axis`
fn convolve_axis(
    input: &Array3<f64>,
    weights: &[f64],
    axis: Axis,
    options: &ConvolveOptions,
) -> Array3<f64> {
    let dim = input.raw_dim();
    let extent = input.len_of(axis) as isize;
    let half = (weights.len() as isize - 1) / 2;
    let mut output = Array3::<f64>::zeros(dim);

    Zip::indexed(&mut output).par_for_each(|(z, y, x), out| {
        if options.is_cancelled() {
            return;
        }
        let mut index = [z, y, x];
        let origin = index[axis.index()] as isize;
        let mut sum = 0.0;
        for (offset, &weight) in weights.iter().enumerate() {
            let position = origin + offset as isize - half;
            if position < 0 || position >= extent {
                continue;
            }
            index[axis.index()] = position as usize;
            let value = input[index];
            if value.is_nan() {
                continue;
            }
            sum += value * weight;
        }
        *out = sum;
    });

    output
}

/// Apply per-axis weights as three successive 1D passes (x, then y, then z)
///
/// # Arguments
///
/// * `volume` - Input volume indexed `[z, y, x]`
/// * `kernel` - Odd-length weights for each axis
/// * `options` - Thread count and cancellation
///
/// # Returns
///
/// A new volume of the same shape, or `KernelShapeMismatch` when an axis
/// has an even number of weights
pub fn convolve_separable<T: VoxelValue>(
    volume: &Array3<T>,
    kernel: &SeparableKernel,
    options: &ConvolveOptions,
) -> Result<Array3<T>, SmoothingError> {
    for weights in [&kernel.x, &kernel.y, &kernel.z] {
        if weights.len() % 2 == 0 {
            return Err(SmoothingError::KernelShapeMismatch {
                expected: weights.len() + 1,
                actual: weights.len(),
            });
        }
    }

    let input = to_f64_volume(volume);
    let result = options.run(|| {
        let mut current = input;
        for (axis, weights) in [(Axis(2), &kernel.x), (Axis(1), &kernel.y), (Axis(0), &kernel.z)] {
            if weights.len() == 1 && weights[0] == 1.0 {
                continue;
            }
            current = convolve_axis(&current, weights, axis, options);
            if options.is_cancelled() {
                break;
            }
        }
        current
    })?;
    options.check_cancelled()?;

    Ok(from_f64_volume(result))
}

/// Apply a full 3D kernel voxel by voxel
pub fn convolve_3d<T: VoxelValue>(
    volume: &Array3<T>,
    kernel: &Kernel,
    options: &ConvolveOptions,
) -> Result<Array3<T>, SmoothingError> {
    let lengths = kernel.lengths();
    if kernel.len() != lengths.volume() {
        return Err(SmoothingError::KernelShapeMismatch {
            expected: lengths.volume(),
            actual: kernel.len(),
        });
    }

    let input = to_f64_volume(volume);
    let (depth, rows, cols) = input.dim();
    let (depth, rows, cols) = (depth as isize, rows as isize, cols as isize);
    let (xmax, ymax, zmax) = lengths.half_extents();
    let samples = kernel.samples();
    let (len_x, len_y) = (lengths.x, lengths.y);

    let result = options.run(|| {
        let mut output = Array3::<f64>::zeros(input.raw_dim());
        Zip::indexed(&mut output).par_for_each(|(z, y, x), out| {
            if options.is_cancelled() {
                return;
            }
            let mut sum = 0.0;
            for k in -zmax..=zmax {
                let zz = z as isize + k;
                if zz < 0 || zz >= depth {
                    continue;
                }
                for j in -ymax..=ymax {
                    let yy = y as isize + j;
                    if yy < 0 || yy >= rows {
                        continue;
                    }
                    let row = ((k + zmax) as usize * len_y + (j + ymax) as usize) * len_x;
                    for i in -xmax..=xmax {
                        let xx = x as isize + i;
                        if xx < 0 || xx >= cols {
                            continue;
                        }
                        let value = input[[zz as usize, yy as usize, xx as usize]];
                        if value.is_nan() {
                            continue;
                        }
                        sum += value * samples[row + (i + xmax) as usize];
                    }
                }
            }
            *out = sum;
        });
        output
    })?;
    options.check_cancelled()?;

    Ok(from_f64_volume(result))
}

/// Smooth a volume with the filter named in `params`.
///
/// Gaussian parameters with matching widths run separably and ignore
/// rotation; anisotropic ones use the full rotated 3D kernel.
///
/// # Arguments
///
/// * `volume` - Input volume indexed `[z, y, x]`
/// * `params` - Filter, widths, rotation and accuracy
/// * `options` - Thread count and cancellation
///
/// # Returns
///
/// The smoothed volume, or `Cancelled` if the flag was raised mid-run
pub fn smooth<T: VoxelValue>(
    volume: &Array3<T>,
    params: &SmoothingParameters,
    options: &ConvolveOptions,
) -> Result<Array3<T>, SmoothingError> {
    let (depth, rows, cols) = volume.dim();
    match params.filter {
        FilterKind::Box => {
            let kernel = box_kernels(params);
            debug!(
                "Box smoothing {}x{}x{} volume with lengths {:?}",
                cols,
                rows,
                depth,
                kernel.lengths()
            );
            convolve_separable(volume, &kernel, options)
        }
        FilterKind::Gaussian => {
            let kernel = recompute_kernels(params);
            debug!(
                "Gaussian smoothing {}x{}x{} volume with {:?} kernel {:?}",
                cols,
                rows,
                depth,
                kernel.shape(),
                kernel.lengths()
            );
            match kernel.shape() {
                KernelShape::OneDimensional => {
                    let separable = SeparableKernel::isotropic(kernel.into_samples());
                    convolve_separable(volume, &separable, options)
                }
                KernelShape::ThreeDimensional => convolve_3d(volume, &kernel, options),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{synthesize_1d, synthesize_3d, Normalization};
    use approx::assert_relative_eq;

    fn delta_volume(shape: (usize, usize, usize)) -> Array3<f64> {
        let mut volume = Array3::<f64>::zeros(shape);
        volume[[shape.0 / 2, shape.1 / 2, shape.2 / 2]] = 1.0;
        volume
    }

    #[test]
    fn test_constant_interior_is_preserved() {
        let volume = Array3::<f32>::from_elem((9, 11, 13), 2.5);
        let params = SmoothingParameters::new(1.5, 3);
        let result = smooth(&volume, &params, &ConvolveOptions::default()).unwrap();
        // Kernel half-width is 1, so the interior is unaffected by edges
        assert_eq!(recompute_kernels(&params).len(), 3);
        for z in 1..8 {
            for y in 1..10 {
                for x in 1..12 {
                    assert_relative_eq!(result[[z, y, x]], 2.5, epsilon = 1e-5);
                }
            }
        }
        // Corners lose the weight that fell outside
        assert!(result[[0, 0, 0]] < 2.5);
    }

    #[test]
    fn test_delta_reproduces_separable_kernel() {
        let kernel = synthesize_1d(2.0, 3, Normalization::Filter);
        let n = kernel.len();
        assert_eq!(n, 3);
        let volume = delta_volume((7, 7, 7));
        let separable = SeparableKernel::isotropic(kernel.samples().to_vec());
        let result = convolve_separable(&volume, &separable, &ConvolveOptions::default()).unwrap();
        let w = kernel.samples();
        for dz in 0..3 {
            for dy in 0..3 {
                for dx in 0..3 {
                    assert_relative_eq!(
                        result[[2 + dz, 2 + dy, 2 + dx]],
                        w[dz] * w[dy] * w[dx],
                        epsilon = 1e-12
                    );
                }
            }
        }
        assert_relative_eq!(result.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_reproduces_3d_kernel() {
        let kernel = synthesize_3d([1.0, 2.0, 3.0], 4, [10.0, 20.0, 30.0], Normalization::Filter);
        let lengths = kernel.lengths();
        let volume = delta_volume((lengths.z + 4, lengths.y + 4, lengths.x + 4));
        let result = convolve_3d(&volume, &kernel, &ConvolveOptions::with_cores(2)).unwrap();

        let (xmax, ymax, zmax) = lengths.half_extents();
        let (cz, cy, cx) = (
            (lengths.z + 4) as isize / 2,
            (lengths.y + 4) as isize / 2,
            (lengths.x + 4) as isize / 2,
        );
        // Correlation against a delta reads the kernel back mirrored
        for k in -zmax..=zmax {
            for j in -ymax..=ymax {
                for i in -xmax..=xmax {
                    let voxel = result[[(cz - k) as usize, (cy - j) as usize, (cx - i) as usize]];
                    assert_relative_eq!(voxel, kernel.get(i, j, k).unwrap(), epsilon = 1e-12);
                }
            }
        }
        assert_relative_eq!(result.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nan_voxels_are_skipped() {
        let mut volume = Array3::<f64>::from_elem((5, 5, 5), 1.0);
        volume[[2, 2, 2]] = f64::NAN;
        let separable = SeparableKernel::isotropic(vec![0.25, 0.5, 0.25]);
        let result = convolve_separable(&volume, &separable, &ConvolveOptions::default()).unwrap();
        assert!(result.iter().all(|v| v.is_finite()));
        // The first pass along x at the NaN voxel keeps only its neighbours
        assert!(result[[2, 2, 2]] < 1.0);
    }

    #[test]
    fn test_box_filter_matches_mean() {
        let mut volume = Array3::<f64>::zeros((3, 3, 3));
        volume[[1, 1, 1]] = 27.0;
        let params = SmoothingParameters::new(3.0, 20).with_filter(FilterKind::Box);
        let result = smooth(&volume, &params, &ConvolveOptions::default()).unwrap();
        for value in result.iter() {
            assert_relative_eq!(*value, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_even_separable_weights_rejected() {
        let volume = Array3::<f64>::zeros((3, 3, 3));
        let kernel = SeparableKernel {
            x: vec![0.5, 0.5],
            y: vec![1.0],
            z: vec![1.0],
        };
        let err = convolve_separable(&volume, &kernel, &ConvolveOptions::default()).unwrap_err();
        assert!(matches!(err, SmoothingError::KernelShapeMismatch { .. }));
    }

    #[test]
    fn test_1d_kernel_rejected_by_3d_convolution() {
        let volume = Array3::<f64>::zeros((3, 3, 3));
        let kernel = synthesize_1d(3.0, 3, Normalization::Filter);
        let err = convolve_3d(&volume, &kernel, &ConvolveOptions::default()).unwrap_err();
        assert!(matches!(err, SmoothingError::KernelShapeMismatch { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let volume = Array3::<f64>::ones((4, 4, 4));
        let options = ConvolveOptions {
            cores: 1,
            cancel: Some(Arc::new(AtomicBool::new(true))),
        };
        let params = SmoothingParameters::new(2.0, 3).with_widths(2.0, 3.0, 4.0);
        let err = smooth(&volume, &params, &options).unwrap_err();
        assert!(matches!(err, SmoothingError::Cancelled));
    }

    #[test]
    fn test_core_count_does_not_change_result() {
        let volume = Array3::from_shape_fn((6, 7, 8), |(z, y, x)| (z * 56 + y * 8 + x) as f64);
        let params = SmoothingParameters::new(2.0, 4).with_widths(2.0, 3.0, 2.5);
        let serial = smooth(&volume, &params, &ConvolveOptions::with_cores(1)).unwrap();
        let parallel = smooth(&volume, &params, &ConvolveOptions::default()).unwrap();
        for (a, b) in serial.iter().zip(parallel.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
