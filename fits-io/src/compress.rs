//! Gzip post-processing of written files

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, warn};

use crate::error::WriteError;

/// Bytes moved per read while compressing
const CHUNK_SIZE: usize = 64 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// `cube.fits` -> `cube.fits.gz`
pub fn compressed_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

/// Stream `source` through a gzip encoder into `target`, returning the
/// number of uncompressed bytes read
pub fn gzip_file(source: &Path, target: &Path) -> io::Result<u64> {
    let mut input = BufReader::new(File::open(source)?);
    let output = BufWriter::new(File::create(target)?);
    let mut encoder = GzEncoder::new(output, Compression::default());

    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let read = input.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        encoder.write_all(&chunk[..read])?;
        total += read as u64;
    }
    encoder.finish()?.flush()?;
    Ok(total)
}

/// Compress `path` to `path.gz` and remove `path`
pub fn compress_in_place(path: &Path) -> Result<PathBuf, WriteError> {
    compress_then_remove(path, |original| fs::remove_file(original))
}

fn compress_then_remove<R>(path: &Path, remove: R) -> Result<PathBuf, WriteError>
where
    R: FnOnce(&Path) -> io::Result<()>,
{
    let target = compressed_path(path);
    match gzip_file(path, &target) {
        Ok(bytes) => debug!("Compressed {bytes} bytes into {}", target.display()),
        Err(source) => {
            // Clean up partial files on error
            let _ = fs::remove_file(&target);
            return Err(WriteError::CompressionFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    if let Err(source) = remove(path) {
        warn!(
            "Compressed {} but could not remove the original: {source}",
            target.display()
        );
        return Err(WriteError::CleanupFailed {
            original: path.to_path_buf(),
            compressed: target,
            source,
        });
    }
    Ok(target)
}

/// Whether `bytes` start with the gzip magic number
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Inflate a whole gzip stream held in memory
pub fn gunzip_bytes(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;
    Ok(inflated)
}
