//! Smoothing parameter set and its JSON persistence

use serde::{Deserialize, Serialize};

use crate::kernel::{recompute_kernels, Kernel};

/// Which smoothing filter to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterKind {
    /// Uniform weights over a truncated width
    Box,
    /// Gaussian weights from a FWHM
    #[default]
    Gaussian,
}

/// Parameters driving kernel synthesis and convolution.
///
/// Widths are FWHM in voxels, rotations in degrees. The `kernel_length_*`
/// fields are outputs of [`SmoothingParameters::recompute_kernels`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParameters {
    pub filter: FilterKind,
    pub width_x: f64,
    pub width_y: f64,
    pub width_z: f64,
    pub accuracy: u32,
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub rotation_z: f64,

    /// When set, the y and z widths follow `width_x`
    #[serde(default)]
    pub link: bool,

    /// Worker threads for convolution, 0 uses every core
    #[serde(default)]
    pub cores: usize,

    #[serde(default = "unit_length")]
    pub kernel_length_x: usize,
    #[serde(default = "unit_length")]
    pub kernel_length_y: usize,
    #[serde(default = "unit_length")]
    pub kernel_length_z: usize,
}

fn unit_length() -> usize {
    1
}

impl Default for SmoothingParameters {
    fn default() -> Self {
        Self::new(5.0, 20)
    }
}

impl SmoothingParameters {
    /// Isotropic Gaussian with no rotation
    pub fn new(width: f64, accuracy: u32) -> Self {
        Self {
            filter: FilterKind::Gaussian,
            width_x: width,
            width_y: width,
            width_z: width,
            accuracy,
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_z: 0.0,
            link: false,
            cores: 0,
            kernel_length_x: 1,
            kernel_length_y: 1,
            kernel_length_z: 1,
        }
    }

    pub fn with_widths(mut self, x: f64, y: f64, z: f64) -> Self {
        self.width_x = x;
        self.width_y = y;
        self.width_z = z;
        self
    }

    pub fn with_rotation(mut self, x: f64, y: f64, z: f64) -> Self {
        self.rotation_x = x;
        self.rotation_y = y;
        self.rotation_z = z;
        self
    }

    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    pub fn with_link(mut self, link: bool) -> Self {
        self.link = link;
        self
    }

    /// Widths after applying `link`
    pub fn effective_widths(&self) -> [f64; 3] {
        if self.link {
            [self.width_x; 3]
        } else {
            [self.width_x, self.width_y, self.width_z]
        }
    }

    pub fn rotation_degrees(&self) -> [f64; 3] {
        [self.rotation_x, self.rotation_y, self.rotation_z]
    }

    /// Build the Gaussian kernel for these parameters and store its lengths
    pub fn recompute_kernels(&mut self) -> Kernel {
        let kernel = recompute_kernels(self);
        let lengths = kernel.lengths();
        self.kernel_length_x = lengths.x;
        self.kernel_length_y = lengths.y;
        self.kernel_length_z = lengths.z;
        log::debug!(
            "Recomputed {:?} kernel with lengths {}x{}x{}",
            kernel.shape(),
            lengths.x,
            lengths.y,
            lengths.z
        );
        kernel
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{compute_kernel_length, KernelShape};
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let params = SmoothingParameters::default();
        assert_eq!(params.filter, FilterKind::Gaussian);
        assert_eq!(params.effective_widths(), [5.0; 3]);
        assert_eq!(params.accuracy, 20);
        assert_eq!(params.rotation_degrees(), [0.0; 3]);
        assert_eq!(params.cores, 0);
        assert!(!params.link);
    }

    #[test]
    fn test_recompute_writes_lengths() {
        let mut params = SmoothingParameters::new(3.0, 4).with_widths(1.0, 2.0, 3.0);
        let kernel = params.recompute_kernels();
        assert_eq!(kernel.shape(), KernelShape::ThreeDimensional);
        assert_eq!(params.kernel_length_x, compute_kernel_length(1.0, 4));
        assert_eq!(params.kernel_length_y, compute_kernel_length(2.0, 4));
        assert_eq!(params.kernel_length_z, compute_kernel_length(3.0, 4));

        let mut params = SmoothingParameters::new(2.0, 20);
        let kernel = params.recompute_kernels();
        let n = compute_kernel_length(2.0, 20);
        assert_eq!(kernel.len(), n);
        assert_eq!(
            (params.kernel_length_x, params.kernel_length_y, params.kernel_length_z),
            (n, n, n)
        );
    }

    #[test]
    fn test_link_forces_isotropic() {
        let mut params = SmoothingParameters::new(2.0, 10)
            .with_widths(2.0, 7.0, 9.0)
            .with_link(true);
        assert_eq!(params.effective_widths(), [2.0; 3]);
        assert_eq!(params.recompute_kernels().shape(), KernelShape::OneDimensional);
    }

    #[test]
    fn test_json_round_trip() {
        let params = SmoothingParameters::new(4.0, 8)
            .with_widths(4.0, 3.0, 2.0)
            .with_rotation(10.0, -20.0, 45.0)
            .with_filter(FilterKind::Box)
            .with_cores(3);
        let json = params.to_json().unwrap();
        let restored = SmoothingParameters::from_json(&json).unwrap();
        assert_eq!(params, restored);
    }

    #[test]
    fn test_json_missing_optional_fields() {
        let json = r#"{
            "filter": "Gaussian",
            "width_x": 2.0, "width_y": 2.0, "width_z": 2.0,
            "accuracy": 5,
            "rotation_x": 0.0, "rotation_y": 0.0, "rotation_z": 0.0
        }"#;
        let params = SmoothingParameters::from_json(json).unwrap();
        assert!(!params.link);
        assert_eq!(params.cores, 0);
        assert_eq!(params.kernel_length_x, 1);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        let params = SmoothingParameters::new(1.5, 12).with_rotation(0.0, 0.0, 30.0);
        params.save_to_file(&path).unwrap();
        let loaded = SmoothingParameters::load_from_file(&path).unwrap();
        assert_eq!(params, loaded);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, "not json").unwrap();
        let err = SmoothingParameters::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
