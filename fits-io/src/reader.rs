//! FITS primary image reader
//!
//! Loads the primary HDU of a plain or gzipped FITS file into a
//! [`FitsVolume`]: a `SlicerAstro.`-prefixed attribute dictionary built
//! from the header, the axis extents and the raw voxels.

use std::fs;
use std::path::Path;

use fitsio::hdu::parse_fits;
use fitsio::header::Card;
use fitsio::image::read_image_data;
use fitsio::value::Value;
use log::{debug, info};

use crate::attributes::{attribute_key, AttributeMap};
use crate::compress::{gunzip_bytes, is_gzip};
use crate::error::ReadError;
use crate::numeric::parse_int_lenient;
use crate::voxel::VoxelData;

/// Most axes a volume may keep after collapsing a unit fourth axis
const MAX_AXES: usize = 3;

/// A primary image read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct FitsVolume {
    pub attributes: AttributeMap,
    /// Axis extents, NAXIS1 first
    pub dimensions: Vec<usize>,
    /// Voxels with NAXIS1 varying fastest
    pub data: VoxelData,
}

impl FitsVolume {
    /// Extents ordered `(z, y, x)` for an `Array3`, missing axes as 1
    pub fn shape_zyx(&self) -> (usize, usize, usize) {
        let extent = |axis: usize| self.dimensions.get(axis).copied().unwrap_or(1);
        (extent(2), extent(1), extent(0))
    }

    pub fn element_count(&self) -> usize {
        self.dimensions.iter().product()
    }
}

fn render_value(value: &Value) -> String {
    let text = match value {
        Value::Logical(true) => "T".to_string(),
        Value::Logical(false) => "F".to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Float(v) => format!("{v:?}"),
        Value::String(s) => s.clone(),
        Value::ComplexInt(re, im) => format!("({re},{im})"),
        Value::ComplexFloat(re, im) => format!("({re:?},{im:?})"),
        Value::Undefined => String::new(),
    };
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Header cards as prefixed attributes; commentary cards are dropped
pub fn header_attributes(cards: &[Card]) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    for card in cards {
        if card.is_commentary() {
            continue;
        }
        let keyword = card.keyword_str();
        let Some(value) = &card.value else {
            continue;
        };
        let rendered = render_value(value);
        // compat names every primary image it creates
        if keyword == "EXTNAME" && rendered == "_PRIMARY" {
            continue;
        }
        attributes.insert(attribute_key(keyword), rendered);
    }
    attributes
}

/// Axis extents from the header attributes, collapsing a unit NAXIS4
fn axis_dimensions(attributes: &mut AttributeMap) -> Result<Vec<usize>, ReadError> {
    let naxis = attributes
        .get(&attribute_key("NAXIS"))
        .ok_or_else(|| ReadError::MissingKeyword("NAXIS".to_string()))?;
    let mut naxes = usize::try_from(parse_int_lenient(naxis)).unwrap_or(0);

    let mut dimensions = Vec::with_capacity(naxes);
    for axis in 1..=naxes {
        let keyword = format!("NAXIS{axis}");
        let extent = attributes
            .get(&attribute_key(&keyword))
            .ok_or(ReadError::MissingKeyword(keyword))?;
        dimensions.push(usize::try_from(parse_int_lenient(extent)).unwrap_or(0));
    }

    if naxes == 4 && dimensions[3] == 1 {
        debug!("Dropping unit fourth axis");
        dimensions.truncate(3);
        naxes = 3;
        attributes.remove(&attribute_key("NAXIS4"));
        attributes.insert(attribute_key("NAXIS"), naxes.to_string());
    }
    if naxes == 0 || naxes > MAX_AXES {
        return Err(ReadError::UnsupportedAxes(naxes));
    }
    Ok(dimensions)
}

/// Read the primary image of `path`, inflating it first if gzipped
pub fn read_fits<P: AsRef<Path>>(path: P) -> Result<FitsVolume, ReadError> {
    let path = path.as_ref();
    let io_error = |source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut bytes = fs::read(path).map_err(io_error)?;
    if is_gzip(&bytes) {
        bytes = gunzip_bytes(&bytes).map_err(io_error)?;
    }

    let parsed = parse_fits(&bytes)?;
    let primary = parsed.hdus.first().ok_or(ReadError::Empty)?;
    let mut attributes = header_attributes(&primary.cards);
    let dimensions = axis_dimensions(&mut attributes)?;
    let data = VoxelData::from(read_image_data(&bytes, primary)?);

    info!(
        "Read {} {:?} image from {}",
        data.element_type(),
        dimensions,
        path.display()
    );
    Ok(FitsVolume {
        attributes,
        dimensions,
        data,
    })
}
