//! Uniform box kernels

use crate::kernel::SeparableKernel;
use crate::params::SmoothingParameters;

/// Box length for a width: truncated, bumped to odd, at least 1
pub fn box_kernel_length(width: f64) -> usize {
    let length = width.trunc().max(0.0) as usize;
    if length % 2 == 0 {
        length + 1
    } else {
        length
    }
}

fn uniform(length: usize) -> Vec<f64> {
    vec![1.0 / length as f64; length]
}

/// Per-axis uniform weights for the parameter widths
pub fn box_kernels(params: &SmoothingParameters) -> SeparableKernel {
    let [wx, wy, wz] = params.effective_widths();
    SeparableKernel {
        x: uniform(box_kernel_length(wx)),
        y: uniform(box_kernel_length(wy)),
        z: uniform(box_kernel_length(wz)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_length() {
        assert_eq!(box_kernel_length(0.0), 1);
        assert_eq!(box_kernel_length(-2.0), 1);
        assert_eq!(box_kernel_length(1.9), 1);
        assert_eq!(box_kernel_length(2.0), 3);
        assert_eq!(box_kernel_length(3.99), 3);
        assert_eq!(box_kernel_length(5.0), 5);
        assert_eq!(box_kernel_length(6.5), 7);
    }

    #[test]
    fn test_box_weights_are_uniform_and_unit_mass() {
        let params = SmoothingParameters::new(5.0, 20).with_widths(5.0, 2.0, 0.5);
        let kernels = box_kernels(&params);
        assert_eq!(kernels.x.len(), 5);
        assert_eq!(kernels.y.len(), 3);
        assert_eq!(kernels.z, vec![1.0]);
        for axis in [&kernels.x, &kernels.y, &kernels.z] {
            let sum: f64 = axis.iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
            assert!(axis.iter().all(|&w| (w - axis[0]).abs() < 1e-15));
        }
    }
}
