//! Low-level FITS output primitives
//!
//! [`FitsWriter`](crate::FitsWriter) drives a [`FitsSink`]; the production
//! sink is [`CompatSink`], built on the `fitsio` compat layer.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use fitsio::compat::fitsfile::FitsFile;
use fitsio::compat::hdu::FitsHdu;
use fitsio::compat::images::{ImageDescription, ImageType, WriteImage};
use fitsio::compat::sys;
use fitsio::header::Card;
use log::{debug, warn};

use crate::error::FitsStatus;
use crate::voxel::{ElementType, VoxelBuffer};

/// Longest text placed on a single COMMENT or HISTORY card
const COMMENTARY_CHUNK: usize = 70;

/// Typed value of a key=value header card
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Output side of one open FITS primary image
pub trait FitsSink {
    /// Write or replace a keyword
    fn update_key(&mut self, keyword: &str, value: CardValue) -> Result<(), FitsStatus>;

    fn write_comment(&mut self, text: &str) -> Result<(), FitsStatus>;

    fn write_history(&mut self, text: &str) -> Result<(), FitsStatus>;

    /// Write `count` elements of `buffer` starting at 1-based `first_element`
    fn write_pixels(
        &mut self,
        first_element: usize,
        count: usize,
        buffer: &VoxelBuffer<'_>,
    ) -> Result<(), FitsStatus>;

    /// Flush and release the file
    fn close(self) -> Result<(), FitsStatus>;
}

fn image_type(element: ElementType) -> Result<ImageType, FitsStatus> {
    match element {
        ElementType::Int16 => Ok(ImageType::Short),
        ElementType::Float32 => Ok(ImageType::Float),
        ElementType::Float64 => Ok(ImageType::Double),
        other => Err(FitsStatus::new(
            sys::BAD_DATATYPE,
            format!("cannot create {other} image"),
        )),
    }
}

/// Primary image written through `fitsio::compat`
pub struct CompatSink {
    file: FitsFile,
    hdu: FitsHdu,
    /// Keywords fixed when the image was created
    structural: BTreeMap<String, i64>,
    /// COMMENT/HISTORY cards waiting for the next header edit
    commentary: Vec<Card>,
}

impl CompatSink {
    /// Create `path` holding an empty primary image of `element` values.
    ///
    /// `dims` lists extents NAXIS1 first.
    pub fn create(path: &Path, element: ElementType, dims: &[usize]) -> Result<Self, FitsStatus> {
        let data_type = image_type(element)?;
        // compat takes the slowest axis first
        let row_major: Vec<usize> = dims.iter().rev().copied().collect();
        let description = ImageDescription {
            data_type,
            dimensions: &row_major,
        };
        let file = FitsFile::create(path)
            .overwrite()
            .with_custom_primary(&description)
            .open()?;
        let hdu = file.primary_hdu()?;

        let mut structural = BTreeMap::new();
        structural.insert("BITPIX".to_string(), element.bitpix());
        structural.insert("NAXIS".to_string(), dims.len() as i64);
        for (i, extent) in dims.iter().enumerate() {
            structural.insert(format!("NAXIS{}", i + 1), *extent as i64);
        }

        debug!("Created {element} FITS image {dims:?} at {}", path.display());
        Ok(Self {
            file,
            hdu,
            structural,
            commentary: Vec::new(),
        })
    }

    fn queue_commentary(&mut self, keyword: [u8; 8], text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let chunks: Vec<String> = if chars.is_empty() {
            vec![String::new()]
        } else {
            chars
                .chunks(COMMENTARY_CHUNK)
                .map(|chunk| chunk.iter().collect())
                .collect()
        };
        self.commentary.extend(chunks.into_iter().map(|chunk| Card {
            keyword,
            value: None,
            comment: Some(chunk),
        }));
    }

    /// Insert every queued commentary card in one pass over the file image
    fn apply_commentary(&mut self) -> Result<(), FitsStatus> {
        if self.commentary.is_empty() {
            return Ok(());
        }
        let mut cursor = Cursor::new(self.file.data()?.to_vec());
        for card in self.commentary.drain(..) {
            fitsio::edit::update_card_growing(&mut cursor, self.hdu.number, &card)?;
        }
        self.file.set_data(cursor.into_inner());
        Ok(())
    }
}

impl FitsSink for CompatSink {
    fn update_key(&mut self, keyword: &str, value: CardValue) -> Result<(), FitsStatus> {
        if let Some(&created) = self.structural.get(keyword) {
            if value != CardValue::Integer(created) {
                warn!("Ignoring {keyword} = {value:?}; the image was created with {created}");
            }
            return Ok(());
        }

        match value {
            CardValue::Integer(v) => self.hdu.write_key(&mut self.file, keyword, v)?,
            CardValue::Float(v) => self.hdu.write_key(&mut self.file, keyword, v)?,
            CardValue::Text(v) => self.hdu.write_key(&mut self.file, keyword, v.as_str())?,
        }
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<(), FitsStatus> {
        self.queue_commentary(*b"COMMENT ", text);
        Ok(())
    }

    fn write_history(&mut self, text: &str) -> Result<(), FitsStatus> {
        self.queue_commentary(*b"HISTORY ", text);
        Ok(())
    }

    fn write_pixels(
        &mut self,
        first_element: usize,
        count: usize,
        buffer: &VoxelBuffer<'_>,
    ) -> Result<(), FitsStatus> {
        self.apply_commentary()?;
        let start = first_element.saturating_sub(1);
        let range = start..start + count;
        match buffer {
            VoxelBuffer::Int16(data) => i16::write_section(&mut self.file, &self.hdu, range, data)?,
            VoxelBuffer::Float32(data) => {
                f32::write_section(&mut self.file, &self.hdu, range, data)?
            }
            VoxelBuffer::Float64(data) => {
                f64::write_section(&mut self.file, &self.hdu, range, data)?
            }
            other => {
                return Err(FitsStatus::new(
                    sys::BAD_DATATYPE,
                    format!("cannot write {} pixels", other.element_type()),
                ))
            }
        }
        Ok(())
    }

    fn close(mut self) -> Result<(), FitsStatus> {
        self.apply_commentary()?;
        self.file.flush()?;
        Ok(())
    }
}
