//! Voxel element types and buffers

use std::fmt;

use fitsio::image::ImageData;

/// Element type tag of a voxel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    UInt8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    /// FITS BITPIX value for this type
    pub fn bitpix(&self) -> i64 {
        match self {
            ElementType::UInt8 => 8,
            ElementType::Int16 => 16,
            ElementType::Int32 => 32,
            ElementType::Int64 => 64,
            ElementType::Float32 => -32,
            ElementType::Float64 => -64,
        }
    }

    /// Whether [`crate::FitsWriter`] can store this type
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            ElementType::Int16 | ElementType::Float32 | ElementType::Float64
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Borrowed voxels in FITS order (NAXIS1 varies fastest)
#[derive(Debug, Clone, Copy)]
pub enum VoxelBuffer<'a> {
    UInt8(&'a [u8]),
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Float32(&'a [f32]),
    Float64(&'a [f64]),
}

impl VoxelBuffer<'_> {
    pub fn element_type(&self) -> ElementType {
        match self {
            VoxelBuffer::UInt8(_) => ElementType::UInt8,
            VoxelBuffer::Int16(_) => ElementType::Int16,
            VoxelBuffer::Int32(_) => ElementType::Int32,
            VoxelBuffer::Int64(_) => ElementType::Int64,
            VoxelBuffer::Float32(_) => ElementType::Float32,
            VoxelBuffer::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VoxelBuffer::UInt8(d) => d.len(),
            VoxelBuffer::Int16(d) => d.len(),
            VoxelBuffer::Int32(d) => d.len(),
            VoxelBuffer::Int64(d) => d.len(),
            VoxelBuffer::Float32(d) => d.len(),
            VoxelBuffer::Float64(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owned voxels read back from a file
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelData {
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl VoxelData {
    pub fn as_buffer(&self) -> VoxelBuffer<'_> {
        match self {
            VoxelData::UInt8(d) => VoxelBuffer::UInt8(d),
            VoxelData::Int16(d) => VoxelBuffer::Int16(d),
            VoxelData::Int32(d) => VoxelBuffer::Int32(d),
            VoxelData::Int64(d) => VoxelBuffer::Int64(d),
            VoxelData::Float32(d) => VoxelBuffer::Float32(d),
            VoxelData::Float64(d) => VoxelBuffer::Float64(d),
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.as_buffer().element_type()
    }

    pub fn len(&self) -> usize {
        self.as_buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen or narrow every voxel to `f32`
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            VoxelData::UInt8(d) => d.iter().map(|&v| f32::from(v)).collect(),
            VoxelData::Int16(d) => d.iter().map(|&v| f32::from(v)).collect(),
            VoxelData::Int32(d) => d.iter().map(|&v| v as f32).collect(),
            VoxelData::Int64(d) => d.iter().map(|&v| v as f32).collect(),
            VoxelData::Float32(d) => d.clone(),
            VoxelData::Float64(d) => d.iter().map(|&v| v as f32).collect(),
        }
    }
}

impl From<ImageData> for VoxelData {
    fn from(data: ImageData) -> Self {
        match data {
            ImageData::U8(d) => VoxelData::UInt8(d),
            ImageData::I16(d) => VoxelData::Int16(d),
            ImageData::I32(d) => VoxelData::Int32(d),
            ImageData::I64(d) => VoxelData::Int64(d),
            ImageData::F32(d) => VoxelData::Float32(d),
            ImageData::F64(d) => VoxelData::Float64(d),
        }
    }
}
