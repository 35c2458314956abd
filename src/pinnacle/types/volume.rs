//! Typed 3-D voxel buffers decoded from raw binary files.

use super::error::{PinnacleError, Result};

/// Element type of a voxel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Int8,
    Int16,
    Float32,
}

impl ElementKind {
    /// Selects the element kind from the header's `(datatype, bytes_pix)` codes.
    ///
    /// - `(1, 2)` → int16
    /// - `(1, 1)` → int8
    /// - `(2, _)` → float32
    /// - anything else falls back to int16
    pub fn from_codes(datatype: i64, bytes_per_pixel: i64) -> Self {
        match (datatype, bytes_per_pixel) {
            (1, 2) => ElementKind::Int16,
            (1, 1) => ElementKind::Int8,
            (2, _) => ElementKind::Float32,
            _ => ElementKind::Int16,
        }
    }

    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElementKind::Int8 => 1,
            ElementKind::Int16 => 2,
            ElementKind::Float32 => 4,
        }
    }
}

/// Contiguous voxel storage in `(z, y, x)` order.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl VolumeData {
    pub fn kind(&self) -> ElementKind {
        match self {
            VolumeData::Int8(_) => ElementKind::Int8,
            VolumeData::Int16(_) => ElementKind::Int16,
            VolumeData::Float32(_) => ElementKind::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VolumeData::Int8(v) => v.len(),
            VolumeData::Int16(v) => v.len(),
            VolumeData::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            VolumeData::Int8(v) => v.get(idx).map(|&x| x as f64),
            VolumeData::Int16(v) => v.get(idx).map(|&x| x as f64),
            VolumeData::Float32(v) => v.get(idx).map(|&x| x as f64),
        }
    }
}

/// Number of voxels in a `(depth, rows, cols)` shape.
///
/// # Errors
/// `DimensionMismatch` if the product does not fit in `usize`. `expected` then
/// holds the largest count the other factors allow.
pub fn voxel_count(shape: (usize, usize, usize)) -> Result<usize> {
    let (depth, rows, cols) = shape;
    let plane = rows.checked_mul(cols).ok_or(PinnacleError::DimensionMismatch {
        context: "rows per plane",
        expected: usize::MAX / cols.max(1),
        found: rows,
    })?;
    plane.checked_mul(depth).ok_or(PinnacleError::DimensionMismatch {
        context: "planes per volume",
        expected: usize::MAX / plane.max(1),
        found: depth,
    })
}

/// A 3-D voxel volume with shape `(depth, rows, cols)`.
///
/// Invariant: `data.len() == depth * rows * cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBuffer {
    shape: (usize, usize, usize),
    data: VolumeData,
}

impl VolumeBuffer {
    /// Wraps `data` after checking it matches `shape`.
    pub fn new(shape: (usize, usize, usize), data: VolumeData) -> Result<Self> {
        let expected = voxel_count(shape)?;
        if data.len() != expected {
            return Err(PinnacleError::DimensionMismatch {
                context: "voxel buffer length",
                expected,
                found: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// `(depth, rows, cols)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn depth(&self) -> usize {
        self.shape.0
    }

    pub fn rows(&self) -> usize {
        self.shape.1
    }

    pub fn cols(&self) -> usize {
        self.shape.2
    }

    pub fn element_kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn data(&self) -> &VolumeData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn plane_len(&self) -> usize {
        self.shape.1 * self.shape.2
    }

    /// Voxel value at `(z, y, x)`, widened to `f64`.
    pub fn value_at(&self, z: usize, y: usize, x: usize) -> Option<f64> {
        if z >= self.shape.0 || y >= self.shape.1 || x >= self.shape.2 {
            return None;
        }
        self.data.get_f64((z * self.shape.1 + y) * self.shape.2 + x)
    }

    /// The axial plane `z` converted to int16, row-major.
    ///
    /// Float voxels are truncated and saturate at the int16 range.
    pub fn plane_i16(&self, z: usize) -> Option<Vec<i16>> {
        if z >= self.shape.0 {
            return None;
        }
        let range = z * self.plane_len()..(z + 1) * self.plane_len();
        let plane = match &self.data {
            VolumeData::Int8(v) => v[range].iter().map(|&x| x as i16).collect(),
            VolumeData::Int16(v) => v[range].to_vec(),
            VolumeData::Float32(v) => v[range].iter().map(|&x| x as i16).collect(),
        };
        Some(plane)
    }

    /// The axial plane `z` as float32, row-major.
    pub fn plane_f32(&self, z: usize) -> Option<Vec<f32>> {
        if z >= self.shape.0 {
            return None;
        }
        let range = z * self.plane_len()..(z + 1) * self.plane_len();
        let plane = match &self.data {
            VolumeData::Int8(v) => v[range].iter().map(|&x| x as f32).collect(),
            VolumeData::Int16(v) => v[range].iter().map(|&x| x as f32).collect(),
            VolumeData::Float32(v) => v[range].to_vec(),
        };
        Some(plane)
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            VolumeData::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match &self.data {
            VolumeData::Int16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<&[i8]> {
        match &self.data {
            VolumeData::Int8(v) => Some(v),
            _ => None,
        }
    }

    /// Largest voxel value, or `None` for an empty volume.
    pub fn max_value(&self) -> Option<f64> {
        (0..self.data.len())
            .filter_map(|i| self.data.get_f64(i))
            .reduce(f64::max)
    }
}
