use std::fs;

use fits_io::compress::gunzip_bytes;
use fits_io::{
    attribute_key, image_attributes, read_fits, write_image, AttributeMap, FitsWriter, VoxelBuffer,
    VoxelData, WriteError,
};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn plane_attributes() -> AttributeMap {
    let mut attributes = AttributeMap::new();
    attributes.insert(attribute_key("NAXIS"), "2".to_string());
    attributes.insert(attribute_key("NAXIS1"), "4".to_string());
    attributes.insert(attribute_key("NAXIS2"), "3".to_string());
    attributes.insert(attribute_key("BITPIX"), "-32".to_string());
    attributes
}

#[test]
fn float_plane_round_trip() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plane.fits");
    let data: Vec<f32> = (0..12).map(|v| v as f32 * 1.25 - 3.0).collect();

    let outcome = write_image(
        &plane_attributes(),
        VoxelBuffer::Float32(&data),
        &[4, 3],
        &path,
        false,
    )
    .unwrap();
    assert_eq!(outcome.path, path);
    assert_eq!(outcome.elements_written, 12);

    let volume = read_fits(&path).unwrap();
    assert_eq!(volume.dimensions, vec![4, 3]);
    assert_eq!(volume.attributes["SlicerAstro.NAXIS1"], "4");
    assert_eq!(volume.attributes["SlicerAstro.NAXIS2"], "3");
    assert_eq!(volume.data, VoxelData::Float32(data));
}

#[test]
fn int16_cube_round_trip_keeps_header() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cube.fits");
    let dims = [3, 2, 2];
    let data: Vec<i16> = (0..12).map(|v| v * 100 - 500).collect();

    let mut attributes = image_attributes(16, &dims);
    attributes.insert(attribute_key("CTYPE3"), "VRAD".to_string());
    attributes.insert(attribute_key("CRVAL3"), "1.5e3".to_string());
    attributes.insert(attribute_key("DATE-OBS"), "2001-02-03".to_string());
    attributes.insert(attribute_key("BUNIT"), "JY/BEAM".to_string());

    write_image(&attributes, VoxelBuffer::Int16(&data), &dims, &path, false).unwrap();

    let volume = read_fits(&path).unwrap();
    assert_eq!(volume.dimensions, dims.to_vec());
    assert_eq!(volume.data, VoxelData::Int16(data));
    assert_eq!(volume.attributes["SlicerAstro.BITPIX"], "16");
    assert_eq!(volume.attributes["SlicerAstro.CTYPE3"], "VRAD");
    assert_eq!(volume.attributes["SlicerAstro.CRVAL3"], "1500.0");
    assert_eq!(volume.attributes["SlicerAstro.DATE-OBS"], "2001-02-03");
    assert_eq!(volume.attributes["SlicerAstro.BUNIT"], "JY/BEAM");
    assert!(!volume.attributes.contains_key("SlicerAstro.EXTNAME"));
}

#[test]
fn compressed_write_matches_plain_write() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("plain.fits");
    let packed = dir.path().join("packed.fits");
    let data: Vec<f64> = (0..12).map(|v| (v as f64).sqrt()).collect();
    let mut attributes = plane_attributes();
    attributes.insert(attribute_key("BITPIX"), "-64".to_string());

    write_image(&attributes, VoxelBuffer::Float64(&data), &[4, 3], &plain, false).unwrap();
    let outcome =
        write_image(&attributes, VoxelBuffer::Float64(&data), &[4, 3], &packed, true).unwrap();

    let gz = dir.path().join("packed.fits.gz");
    assert!(outcome.compressed);
    assert_eq!(outcome.path, gz);
    assert!(gz.exists());
    assert!(!packed.exists());

    let inflated = gunzip_bytes(&fs::read(&gz).unwrap()).unwrap();
    assert_eq!(inflated, fs::read(&plain).unwrap());

    // The reader inflates gzipped files on its own
    let volume = read_fits(&gz).unwrap();
    assert_eq!(volume.data, VoxelData::Float64(data));
}

#[test]
fn existing_file_is_replaced() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plane.fits");
    fs::write(&path, b"stale contents").unwrap();

    let data = vec![7.0f32; 12];
    write_image(&plane_attributes(), VoxelBuffer::Float32(&data), &[4, 3], &path, false).unwrap();
    let volume = read_fits(&path).unwrap();
    assert_eq!(volume.data, VoxelData::Float32(data));
}

#[test]
fn commentary_attributes_become_cards() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plane.fits");
    let mut attributes = plane_attributes();
    attributes.insert(attribute_key("COMMENT1"), "reduced by hand".to_string());
    attributes.insert(attribute_key("HISTORY1"), "smoothed with a 3 voxel beam".to_string());
    let data = vec![0.5f32; 12];

    FitsWriter::new(&path)
        .write_image(&attributes, VoxelBuffer::Float32(&data), &[4, 3])
        .unwrap();

    let bytes = fs::read(&path).unwrap();
    let parsed = fitsio::hdu::parse_fits(&bytes).unwrap();
    let cards = &parsed.hdus[0].cards;
    let text_of = |keyword: &str| -> Vec<String> {
        cards
            .iter()
            .filter(|card| card.keyword_str() == keyword)
            .filter_map(|card| card.comment.as_deref().map(|c| c.trim().to_string()))
            .collect()
    };
    assert!(text_of("COMMENT").contains(&"reduced by hand".to_string()));
    assert!(text_of("HISTORY").contains(&"smoothed with a 3 voxel beam".to_string()));

    // Commentary is not read back as attributes, but pixels still are
    let volume = read_fits(&path).unwrap();
    assert!(!volume.attributes.contains_key("SlicerAstro.COMMENT1"));
    assert_eq!(volume.data, VoxelData::Float32(data));
}

#[test]
fn unsupported_type_leaves_no_file() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ints.fits");
    let data = [1i32; 12];
    let err = write_image(&plane_attributes(), VoxelBuffer::Int32(&data), &[4, 3], &path, false)
        .unwrap_err();
    assert!(matches!(err, WriteError::UnsupportedDataType(_)));
    assert!(!path.exists());
    assert!(!dir.path().join("ints.fits.gz").exists());
}

#[test]
fn reread_attributes_write_back_identically() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.fits");
    let second = dir.path().join("second.fits");
    let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
    let mut attributes = image_attributes(-32, &[4, 3, 2]);
    attributes.insert(attribute_key("CDELT1"), "-0.0025".to_string());
    attributes.insert(attribute_key("OBJECT"), "NGC253".to_string());

    write_image(&attributes, VoxelBuffer::Float32(&data), &[4, 3, 2], &first, false).unwrap();
    let volume = read_fits(&first).unwrap();
    write_image(
        &volume.attributes,
        volume.data.as_buffer(),
        &volume.dimensions,
        &second,
        false,
    )
    .unwrap();
    let again = read_fits(&second).unwrap();

    assert_eq!(again.attributes, volume.attributes);
    assert_eq!(again.data, volume.data);
}
