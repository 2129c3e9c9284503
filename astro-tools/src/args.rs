use clap::{Parser, ValueEnum};
use smoothing::{FilterKind, SmoothingParameters};

/// Parse a triplet string in format "x,y,z"
fn parse_triplet(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err("Expected three comma separated values 'x,y,z'".to_string());
    }

    let mut values = [0.0; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid number '{}'", part.trim()))?;
    }
    Ok(values)
}

/// Smoothing filter selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    Box,
    Gaussian,
}

impl From<FilterArg> for FilterKind {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::Box => FilterKind::Box,
            FilterArg::Gaussian => FilterKind::Gaussian,
        }
    }
}

/// Kernel arguments shared by the smoothing binaries
#[derive(Parser, Debug, Clone)]
pub struct KernelArgs {
    /// Filter shape
    #[arg(long, value_enum, default_value_t = FilterArg::Gaussian)]
    pub filter: FilterArg,

    /// FWHM in voxels along every axis
    #[arg(long, default_value_t = 5.0)]
    pub width: f64,

    /// Per-axis FWHM in voxels (format: "x,y,z"), overrides --width
    #[arg(long, value_parser = parse_triplet)]
    pub widths: Option<[f64; 3]>,

    /// Kernel rotation about x, y and z in degrees (format: "x,y,z")
    #[arg(long, default_value = "0,0,0", value_parser = parse_triplet)]
    pub rotation: [f64; 3],

    /// Kernel samples per sigma
    #[arg(long, default_value_t = 20)]
    pub accuracy: u32,

    /// Force the y and z widths to follow x
    #[arg(long, default_value_t = false)]
    pub link: bool,

    /// Worker threads, 0 for all cores
    #[arg(long, default_value_t = 0)]
    pub cores: usize,
}

impl KernelArgs {
    pub fn to_parameters(&self) -> SmoothingParameters {
        let [wx, wy, wz] = self.widths.unwrap_or([self.width; 3]);
        let [rx, ry, rz] = self.rotation;
        SmoothingParameters::new(self.width, self.accuracy)
            .with_widths(wx, wy, wz)
            .with_rotation(rx, ry, rz)
            .with_filter(self.filter.into())
            .with_link(self.link)
            .with_cores(self.cores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        kernel: KernelArgs,
    }

    #[test]
    fn test_parse_triplet() {
        assert_eq!(parse_triplet("1,2.5, -3").unwrap(), [1.0, 2.5, -3.0]);
        assert!(parse_triplet("1,2").is_err());
        assert!(parse_triplet("1,x,3").is_err());
    }

    #[test]
    fn test_defaults_match_parameters() {
        let harness = Harness::try_parse_from(["test"]).unwrap();
        assert_eq!(harness.kernel.to_parameters(), SmoothingParameters::default());
    }

    #[test]
    fn test_widths_override_width() {
        let harness = Harness::try_parse_from([
            "test",
            "--widths",
            "1,2,3",
            "--rotation",
            "0,0,45",
            "--filter",
            "box",
            "--cores",
            "2",
        ])
        .unwrap();
        let params = harness.kernel.to_parameters();
        assert_eq!(params.effective_widths(), [1.0, 2.0, 3.0]);
        assert_eq!(params.rotation_degrees(), [0.0, 0.0, 45.0]);
        assert_eq!(params.filter, FilterKind::Box);
        assert_eq!(params.cores, 2);
    }
}
