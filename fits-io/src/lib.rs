//! FITS image I/O driven by a flat attribute dictionary
//!
//! Header cards travel as `"SlicerAstro.<KEYWORD>" -> value` string pairs.
//! [`FitsWriter`] turns such a dictionary plus a voxel buffer into a
//! primary-image FITS file (optionally gzipped), inferring each card's
//! type through a [`HeaderPolicy`]. [`read_fits`] goes the other way.

pub mod attributes;
pub mod compress;
pub mod error;
pub mod numeric;
pub mod policy;
pub mod reader;
pub mod sink;
pub mod voxel;
pub mod writer;

pub use attributes::{
    attribute_key, declared_dimensions, declared_element_count, header_keyword, image_attributes,
    AttributeMap, ATTRIBUTE_PREFIX,
};
pub use error::{FitsStatus, ReadError, WriteError};
pub use numeric::{parse_float_lenient, parse_int_lenient};
pub use policy::{CardKind, HeaderPolicy, HeaderRule, KeyMatch};
pub use reader::{read_fits, FitsVolume};
pub use sink::{CardValue, CompatSink, FitsSink};
pub use voxel::{ElementType, VoxelBuffer, VoxelData};
pub use writer::{write_image, FileType, FitsWriter, WriteOutcome};
