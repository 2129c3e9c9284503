//! Attribute-driven FITS image writer
//!
//! Writing a file goes through these steps:
//! 1. reject empty paths, ASCII output and element types the image
//!    cannot hold
//! 2. replace any existing file with a new primary image shaped by `dims`
//! 3. turn every `SlicerAstro.` attribute into a header card as the
//!    [`HeaderPolicy`] says
//! 4. write as many pixels as the `NAXISn` attributes declare
//! 5. close the file, whatever happened in 3 and 4
//! 6. optionally gzip the result to `<path>.gz`
//!
//! The pixel count comes from the attributes, not from `dims`; callers
//! keep the two consistent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::attributes::{declared_element_count, header_keyword, AttributeMap};
use crate::compress::compress_in_place;
use crate::error::{FitsStatus, WriteError};
use crate::numeric::{parse_float_lenient, parse_int_lenient};
use crate::policy::{CardKind, HeaderPolicy};
use crate::sink::{CardValue, CompatSink, FitsSink};
use crate::voxel::{ElementType, VoxelBuffer};

/// FITS encoding of the data unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    Binary,
    Ascii,
}

/// What a successful write produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The file left on disk, `.gz` suffixed when compressed
    pub path: PathBuf,
    pub compressed: bool,
    pub elements_written: usize,
}

/// Writes one primary-image FITS file per call
#[derive(Debug, Clone)]
pub struct FitsWriter {
    path: PathBuf,
    compression: bool,
    file_type: FileType,
    policy: HeaderPolicy,
    cancel: Option<Arc<AtomicBool>>,
}

impl FitsWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compression: false,
            file_type: FileType::Binary,
            policy: HeaderPolicy::default(),
            cancel: None,
        }
    }

    /// Gzip the file after writing
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn policy(mut self, policy: HeaderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checked between header, pixel and compression steps
    pub fn cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `buffer` with a header built from `attributes`.
    ///
    /// # Arguments
    ///
    /// * `attributes` - `SlicerAstro.`-prefixed header values; other keys are ignored
    /// * `buffer` - Voxels in file order, NAXIS1 fastest
    /// * `dims` - Image extents, NAXIS1 first
    ///
    /// # Returns
    ///
    /// Where the file landed and how many elements went into it. The element
    /// count follows the `NAXISn` attributes rather than `dims`.
    pub fn write_image(
        &self,
        attributes: &AttributeMap,
        buffer: VoxelBuffer<'_>,
        dims: &[usize],
    ) -> Result<WriteOutcome, WriteError> {
        self.write_image_with(CompatSink::create, attributes, buffer, dims)
    }

    /// [`FitsWriter::write_image`] through a caller-supplied sink
    pub fn write_image_with<S, F>(
        &self,
        create: F,
        attributes: &AttributeMap,
        buffer: VoxelBuffer<'_>,
        dims: &[usize],
    ) -> Result<WriteOutcome, WriteError>
    where
        S: FitsSink,
        F: FnOnce(&Path, ElementType, &[usize]) -> Result<S, FitsStatus>,
    {
        if self.path.as_os_str().is_empty() {
            return Err(WriteError::InvalidPath);
        }
        if self.file_type == FileType::Ascii {
            return Err(WriteError::UnsupportedFileType);
        }
        let element = buffer.element_type();
        if !element.is_writable() {
            return Err(WriteError::UnsupportedDataType(element));
        }

        remove_existing(&self.path)?;
        let mut sink = create(&self.path, element, dims)?;

        let written = self.write_contents(&mut sink, attributes, &buffer, dims.len());
        let closed = sink.close();
        let elements_written = match (written, closed) {
            (Ok(count), Ok(())) => count,
            (Ok(_), Err(status)) => return Err(status.into()),
            (Err(err), Ok(())) => return Err(err),
            (Err(err), Err(status)) => {
                warn!("Closing {} also failed: {status}", self.path.display());
                return Err(err);
            }
        };

        info!(
            "Wrote {elements_written} {element} elements to {}",
            self.path.display()
        );

        if !self.compression {
            return Ok(WriteOutcome {
                path: self.path.clone(),
                compressed: false,
                elements_written,
            });
        }

        self.check_cancelled()?;
        let path = compress_in_place(&self.path)?;
        Ok(WriteOutcome {
            path,
            compressed: true,
            elements_written,
        })
    }

    fn check_cancelled(&self) -> Result<(), WriteError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(WriteError::Cancelled),
            _ => Ok(()),
        }
    }

    fn write_contents<S: FitsSink>(
        &self,
        sink: &mut S,
        attributes: &AttributeMap,
        buffer: &VoxelBuffer<'_>,
        naxes: usize,
    ) -> Result<usize, WriteError> {
        self.check_cancelled()?;
        self.write_header(sink, attributes)?;

        self.check_cancelled()?;
        let count = declared_element_count(attributes, naxes);
        if count > buffer.len() {
            return Err(WriteError::BufferTooSmall {
                declared: count,
                available: buffer.len(),
            });
        }
        if count > 0 {
            sink.write_pixels(1, count, buffer)?;
        }
        Ok(count)
    }

    fn write_header<S: FitsSink>(
        &self,
        sink: &mut S,
        attributes: &AttributeMap,
    ) -> Result<(), WriteError> {
        for (key, value) in attributes {
            let Some(keyword) = header_keyword(key) else {
                continue;
            };
            match self.policy.classify(keyword, value) {
                CardKind::Skip => debug!("Skipping header keyword {keyword}"),
                CardKind::Integer => {
                    sink.update_key(keyword, CardValue::Integer(parse_int_lenient(value)))?
                }
                CardKind::Float => {
                    sink.update_key(keyword, CardValue::Float(parse_float_lenient(value)))?
                }
                CardKind::String => sink.update_key(keyword, CardValue::Text(value.clone()))?,
                CardKind::Comment => sink.write_comment(value)?,
                CardKind::History => sink.write_history(value)?,
            }
        }
        Ok(())
    }
}

fn remove_existing(path: &Path) -> Result<(), WriteError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed existing {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WriteError::ExistingFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write a binary FITS image with the default header policy
pub fn write_image(
    attributes: &AttributeMap,
    buffer: VoxelBuffer<'_>,
    dims: &[usize],
    path: impl Into<PathBuf>,
    use_compression: bool,
) -> Result<WriteOutcome, WriteError> {
    FitsWriter::new(path)
        .compression(use_compression)
        .write_image(attributes, buffer, dims)
}
