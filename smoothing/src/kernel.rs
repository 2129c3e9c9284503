//! Gaussian kernel synthesis
//!
//! Widths are given as FWHM and converted to standard deviations with
//! [`FWHM_TO_SIGMA`]. Kernel lengths scale with the sigma times an
//! oversampling `accuracy` and are always odd so every kernel has a
//! center sample.
//!
//! Two kernel layouts are produced:
//! - a 1D kernel, reused along all three axes by a separable convolution
//! - a 3D kernel laid out `[z, y, x]` row-major, evaluated on a rotated
//!   coordinate frame so anisotropic beams can be tilted
//!
//! [`recompute_kernels`] picks between them from the parameter widths.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::params::SmoothingParameters;

/// Ratio between FWHM and standard deviation, `2·√(2·ln 2)`
pub const FWHM_TO_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Smallest sigma used in any evaluation
pub const MIN_SIGMA: f64 = 0.001;

/// Widths closer than this are treated as equal when choosing the 1D path
pub const WIDTH_TOLERANCE: f64 = 0.001;

/// How kernel samples are scaled after evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalization {
    /// Samples are divided by their sum so the kernel has unit mass
    #[default]
    Filter,
    /// Samples carry the analytic Gaussian PDF constant and are not re-summed
    Density,
}

/// Which synthesis path produced a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    OneDimensional,
    ThreeDimensional,
}

/// Extent of a kernel along each axis, all odd and at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelLengths {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl KernelLengths {
    pub fn uniform(n: usize) -> Self {
        Self { x: n, y: n, z: n }
    }

    /// Half-extents `(length - 1) / 2` as `(x, y, z)`
    pub fn half_extents(&self) -> (isize, isize, isize) {
        (
            (self.x as isize - 1) / 2,
            (self.y as isize - 1) / 2,
            (self.z as isize - 1) / 2,
        )
    }

    /// Number of samples in the full 3D box
    pub fn volume(&self) -> usize {
        self.x * self.y * self.z
    }
}

/// A synthesized kernel together with the lengths it was built for
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    samples: Vec<f64>,
    lengths: KernelLengths,
    shape: KernelShape,
}

impl Kernel {
    /// Flat samples; 1D kernels hold `lengths.x` values, 3D kernels
    /// hold `lengths.volume()` values indexed
    /// `(k + Zmax) * lenX * lenY + (j + Ymax) * lenX + (i + Xmax)`.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    pub fn lengths(&self) -> KernelLengths {
        self.lengths
    }

    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.samples.iter().sum()
    }

    /// Sample at offset `(i, j, k)` from the center.
    ///
    /// A 1D kernel only has samples along `i`, so `j` and `k` must be 0.
    pub fn get(&self, i: isize, j: isize, k: isize) -> Option<f64> {
        let (xmax, ymax, zmax) = self.lengths.half_extents();
        if i.abs() > xmax {
            return None;
        }
        match self.shape {
            KernelShape::OneDimensional => {
                if j != 0 || k != 0 {
                    return None;
                }
                self.samples.get((i + xmax) as usize).copied()
            }
            KernelShape::ThreeDimensional => {
                if j.abs() > ymax || k.abs() > zmax {
                    return None;
                }
                let (len_x, len_y) = (self.lengths.x as isize, self.lengths.y as isize);
                let pos = (k + zmax) * len_x * len_y + (j + ymax) * len_x + (i + xmax);
                self.samples.get(pos as usize).copied()
            }
        }
    }

    pub fn center(&self) -> f64 {
        self.get(0, 0, 0).unwrap_or(0.0)
    }

    /// View a 3D kernel as an `[z, y, x]` array. 1D kernels return `None`.
    pub fn as_array3(&self) -> Option<Array3<f64>> {
        if self.shape != KernelShape::ThreeDimensional {
            return None;
        }
        let shape = (self.lengths.z, self.lengths.y, self.lengths.x);
        Array3::from_shape_vec(shape, self.samples.clone()).ok()
    }
}

/// Per-axis 1D weights for a separable convolution
#[derive(Debug, Clone, PartialEq)]
pub struct SeparableKernel {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl SeparableKernel {
    /// The same weights along every axis
    pub fn isotropic(weights: Vec<f64>) -> Self {
        Self {
            x: weights.clone(),
            y: weights.clone(),
            z: weights,
        }
    }

    /// Split a 1D kernel into per-axis weights; 3D kernels are not separable.
    pub fn from_kernel(kernel: &Kernel) -> Option<Self> {
        match kernel.shape {
            KernelShape::OneDimensional => Some(Self::isotropic(kernel.samples.clone())),
            KernelShape::ThreeDimensional => None,
        }
    }

    pub fn lengths(&self) -> KernelLengths {
        KernelLengths {
            x: self.x.len(),
            y: self.y.len(),
            z: self.z.len(),
        }
    }
}

/// Convert a FWHM to a standard deviation, floored at [`MIN_SIGMA`]
pub fn fwhm_to_sigma(width: f64) -> f64 {
    // f64::max drops NaN, so a NaN width also lands on the floor
    (width / FWHM_TO_SIGMA).max(MIN_SIGMA)
}

/// Kernel length for a FWHM `width` sampled at `accuracy` samples per sigma.
///
/// The result is rounded, then bumped to the next odd number if even,
/// so it is never less than 1.
pub fn compute_kernel_length(width: f64, accuracy: u32) -> usize {
    let raw = (fwhm_to_sigma(width) * f64::from(accuracy)).round();
    let length = raw as usize;
    if length % 2 == 0 {
        length + 1
    } else {
        length
    }
}

fn gauss_1d(x: f64, sigma: f64) -> f64 {
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}

fn gauss_3d(x: f64, sx: f64, y: f64, sy: f64, z: f64, sz: f64) -> f64 {
    (-(x * x / (2.0 * sx * sx) + y * y / (2.0 * sy * sy) + z * z / (2.0 * sz * sz))).exp()
}

fn normalize(samples: &mut [f64], normalization: Normalization, density_constant: f64) {
    match normalization {
        Normalization::Filter => {
            let sum: f64 = samples.iter().sum();
            samples.iter_mut().for_each(|s| *s /= sum);
        }
        Normalization::Density => samples.iter_mut().for_each(|s| *s *= density_constant),
    }
}

/// Build a 1D Gaussian kernel for a FWHM `width`.
///
/// A length-1 kernel is always `[1.0]` regardless of normalization.
pub fn synthesize_1d(width: f64, accuracy: u32, normalization: Normalization) -> Kernel {
    let n = compute_kernel_length(width, accuracy);
    let lengths = KernelLengths::uniform(n);
    if n == 1 {
        return Kernel {
            samples: vec![1.0],
            lengths,
            shape: KernelShape::OneDimensional,
        };
    }

    let sigma = fwhm_to_sigma(width);
    let midpoint = ((n - 1) / 2) as f64;
    let mut samples: Vec<f64> = (0..n)
        .map(|i| gauss_1d(i as f64 - midpoint, sigma))
        .collect();

    let density = 1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt());
    normalize(&mut samples, normalization, density);

    Kernel {
        samples,
        lengths,
        shape: KernelShape::OneDimensional,
    }
}

/// Build a rotated anisotropic 3D Gaussian kernel.
///
/// `widths` are FWHM along x, y, z; `rotation_degrees` rotate the
/// kernel frame about x, then y, then z.
pub fn synthesize_3d(
    widths: [f64; 3],
    accuracy: u32,
    rotation_degrees: [f64; 3],
    normalization: Normalization,
) -> Kernel {
    let lengths = KernelLengths {
        x: compute_kernel_length(widths[0], accuracy),
        y: compute_kernel_length(widths[1], accuracy),
        z: compute_kernel_length(widths[2], accuracy),
    };
    if lengths.volume() == 1 {
        return Kernel {
            samples: vec![1.0],
            lengths,
            shape: KernelShape::ThreeDimensional,
        };
    }

    let (sigma_x, sigma_y, sigma_z) = (
        fwhm_to_sigma(widths[0]),
        fwhm_to_sigma(widths[1]),
        fwhm_to_sigma(widths[2]),
    );
    let [rx, ry, rz] = rotation_degrees.map(f64::to_radians);
    let (sx, cx) = rx.sin_cos();
    let (sy, cy) = ry.sin_cos();
    let (sz, cz) = rz.sin_cos();

    let (xmax, ymax, zmax) = lengths.half_extents();
    let mut samples = Vec::with_capacity(lengths.volume());
    for k in -zmax..=zmax {
        let k = k as f64;
        for j in -ymax..=ymax {
            let j = j as f64;
            for i in -xmax..=xmax {
                let i = i as f64;
                let x = i * cy * cz - j * cy * sz + k * sy;
                let y = i * (cz * sx * sy + cx * sz) + j * (cx * cz - sx * sy * sz) - k * cy * sx;
                let z = i * (-cx * cz * sy + sx * sz) + j * (cz * sx + cx * sy * sz) + k * cx * cy;
                samples.push(gauss_3d(x, sigma_x, y, sigma_y, z, sigma_z));
            }
        }
    }

    let density =
        1.0 / (sigma_x * sigma_y * sigma_z * (2.0 * std::f64::consts::PI).powf(1.5));
    normalize(&mut samples, normalization, density);

    Kernel {
        samples,
        lengths,
        shape: KernelShape::ThreeDimensional,
    }
}

/// Pick the cheaper 1D path when all three widths agree, the full
/// rotated 3D kernel otherwise. Always uses [`Normalization::Filter`].
pub fn recompute_kernels(params: &SmoothingParameters) -> Kernel {
    let [wx, wy, wz] = params.effective_widths();
    if (wx - wy).abs() < WIDTH_TOLERANCE && (wy - wz).abs() < WIDTH_TOLERANCE {
        synthesize_1d(wx, params.accuracy, Normalization::Filter)
    } else {
        synthesize_3d(
            [wx, wy, wz],
            params.accuracy,
            params.rotation_degrees(),
            Normalization::Filter,
        )
    }
}
