use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::voxel::ElementType;

/// A low-level FITS status code with its rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitsStatus {
    pub code: i32,
    pub message: String,
}

impl FitsStatus {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
        }
    }
}

impl fmt::Display for FitsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {}", self.code, self.message)
    }
}

impl From<fitsio::compat::errors::Error> for FitsStatus {
    fn from(err: fitsio::compat::errors::Error) -> Self {
        match err {
            fitsio::compat::errors::Error::Fits(fits) => Self {
                code: fits.status,
                message: fits.message,
            },
            other => Self::new(fitsio::compat::sys::WRITE_ERROR, other.to_string()),
        }
    }
}

impl From<fitsio::Error> for FitsStatus {
    fn from(err: fitsio::Error) -> Self {
        fitsio::compat::errors::Error::from(err).into()
    }
}

/// Errors that can occur while writing a FITS image
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("output path is empty")]
    InvalidPath,

    #[error("unsupported voxel data type: {0}")]
    UnsupportedDataType(ElementType),

    #[error("ASCII FITS output is not supported")]
    UnsupportedFileType,

    #[error("FITS I/O failure ({code}): {message}")]
    IoFailure { code: i32, message: String },

    #[error("header declares {declared} elements but the buffer holds {available}")]
    BufferTooSmall { declared: usize, available: usize },

    #[error("could not replace existing file {path}: {source}")]
    ExistingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compress {path}: {source}")]
    CompressionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wrote {compressed} but could not remove {original}: {source}")]
    CleanupFailed {
        original: PathBuf,
        compressed: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write was cancelled")]
    Cancelled,
}

impl WriteError {
    /// The finished file an error still leaves behind, if any.
    ///
    /// Only [`WriteError::CleanupFailed`] has one: the compressed
    /// artifact is complete even though the original was not removed.
    pub fn written_artifact(&self) -> Option<&Path> {
        match self {
            WriteError::CleanupFailed { compressed, .. } => Some(compressed),
            _ => None,
        }
    }
}

impl From<FitsStatus> for WriteError {
    fn from(status: FitsStatus) -> Self {
        WriteError::IoFailure {
            code: status.code,
            message: status.message,
        }
    }
}

/// Errors that can occur while reading a FITS image
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("FITS parse error: {0}")]
    Fits(#[from] fitsio::Error),

    #[error("file holds no header data units")]
    Empty,

    #[error("missing required keyword {0}")]
    MissingKeyword(String),

    #[error("images with {0} axes are not supported")]
    UnsupportedAxes(usize),
}
