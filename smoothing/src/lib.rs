//! Smoothing kernels for spectral data cubes
//!
//! Synthesizes normalized Gaussian kernels from full-width-at-half-maximum
//! widths (isotropic 1D kernels, or rotated anisotropic 3D kernels), uniform
//! box kernels, and applies them to `Array3` volumes laid out as `[z, y, x]`.

pub mod boxcar;
pub mod convolve;
pub mod error;
pub mod kernel;
pub mod params;

pub use boxcar::{box_kernel_length, box_kernels};
pub use convolve::{convolve_3d, convolve_separable, smooth, ConvolveOptions, VoxelValue};
pub use error::SmoothingError;
pub use kernel::{
    compute_kernel_length, fwhm_to_sigma, recompute_kernels, synthesize_1d, synthesize_3d,
    Kernel, KernelLengths, KernelShape, Normalization, SeparableKernel, FWHM_TO_SIGMA, MIN_SIGMA,
    WIDTH_TOLERANCE,
};
pub use params::{FilterKind, SmoothingParameters};
