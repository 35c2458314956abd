//! Raw voxel buffer decoding.
//!
//! Image volumes are headerless little-endian buffers of `x * y * z` elements
//! stored slice after slice, row after row. Dose volumes are split into one
//! float32 file per axial plane named `<trial stem>.binary.<index:03>`.

use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, trace, warn};

use crate::pinnacle::types::error::{PinnacleError, Result};
use crate::pinnacle::types::volume::{self as voxels, ElementKind, VolumeBuffer, VolumeData};
use crate::pinnacle::utils;

/// Decodes an image volume.
///
/// # Parameters
/// * `bytes` - Full file contents; bytes past the expected size are ignored
/// * `dims` - `(x, y, z)` voxel counts
/// * `kind` - Element type selected from the header codes
/// * `source` - File the bytes came from, used for error context
///
/// # Errors
/// `DimensionMismatch` if `x * y * z` overflows, `SizeMismatch` if `bytes` holds
/// fewer than `x * y * z * kind.size()` bytes.
pub fn decode(
    bytes: &[u8],
    dims: (usize, usize, usize),
    kind: ElementKind,
    source: &Path,
) -> Result<VolumeBuffer> {
    let (x, y, z) = dims;
    let count = voxels::voxel_count((z, y, x))?;
    let expected = count.saturating_mul(kind.size());
    trace!(
        "Decoding {:?} volume {}x{}x{}: expected {} bytes, have {}",
        kind,
        x,
        y,
        z,
        expected,
        bytes.len()
    );

    if bytes.len() < expected {
        return Err(PinnacleError::SizeMismatch {
            context: "image volume",
            path: source.to_path_buf(),
            expected: expected as u64,
            found: bytes.len() as u64,
        });
    }
    if bytes.len() > expected {
        debug!(
            "{} has {} trailing bytes beyond the declared volume",
            source.display(),
            bytes.len() - expected
        );
    }

    let bytes = &bytes[..expected];
    let data = match kind {
        ElementKind::Int8 => VolumeData::Int8(bytes.iter().map(|&b| b as i8).collect()),
        ElementKind::Int16 => {
            let mut values = vec![0i16; count];
            LittleEndian::read_i16_into(bytes, &mut values);
            VolumeData::Int16(values)
        }
        ElementKind::Float32 => {
            let mut values = vec![0f32; count];
            LittleEndian::read_f32_into(bytes, &mut values);
            VolumeData::Float32(values)
        }
    };

    VolumeBuffer::new((z, y, x), data)
}

/// Path of dose plane `index` for a trial: `<dir>/<stem>.binary.<index:03>`.
pub fn dose_slice_path(dir: &Path, trial_stem: &str, index: usize) -> PathBuf {
    dir.join(format!("{}.binary.{:03}", trial_stem, index))
}

/// Decodes one dose plane of `rows * cols` float32 values.
///
/// # Errors
/// `SizeMismatch` unless `bytes` holds exactly one plane.
pub fn decode_dose_plane(bytes: &[u8], rows: usize, cols: usize, source: &Path) -> Result<Vec<f32>> {
    let count = rows.saturating_mul(cols);
    let expected = count.saturating_mul(4);
    if bytes.len() != expected {
        return Err(PinnacleError::SizeMismatch {
            context: "dose slice",
            path: source.to_path_buf(),
            expected: expected as u64,
            found: bytes.len() as u64,
        });
    }
    let mut plane = vec![0f32; count];
    LittleEndian::read_f32_into(bytes, &mut plane);
    Ok(plane)
}

/// Reads one dose plane. An absent slice file is `Ok(None)`.
pub fn read_dose_slice(
    dir: &Path,
    trial_stem: &str,
    index: usize,
    rows: usize,
    cols: usize,
) -> Result<Option<Vec<f32>>> {
    let path = dose_slice_path(dir, trial_stem, index);
    match utils::read_optional_file(&path)? {
        Some(bytes) => decode_dose_plane(&bytes, rows, cols, &path).map(Some),
        None => Ok(None),
    }
}

/// Assembles a dose volume from its per-plane files.
///
/// `dims` is `(x, y, z)`. A missing slice file, or one of the wrong size, leaves
/// its plane zero-filled; only an unreadable file aborts the read.
///
/// # Errors
/// `DimensionMismatch` if the grid dimensions overflow, before any slice is read.
pub fn read_dose_volume(dir: &Path, trial_stem: &str, dims: (usize, usize, usize)) -> Result<VolumeBuffer> {
    let (cols, rows, depth) = dims;
    let total = voxels::voxel_count((depth, rows, cols))?;
    let plane_len = rows * cols;
    let mut values = vec![0f32; total];
    let mut loaded = 0usize;

    for (index, plane) in values.chunks_exact_mut(plane_len.max(1)).enumerate().take(depth) {
        let path = dose_slice_path(dir, trial_stem, index);
        let Some(bytes) = utils::read_optional_file(&path)? else {
            debug!("Dose slice {} is missing; plane {} stays zero", path.display(), index);
            continue;
        };
        match decode_dose_plane(&bytes, rows, cols, &path) {
            Ok(decoded) => {
                plane.copy_from_slice(&decoded);
                loaded += 1;
            }
            Err(e) => warn!("{}; plane {} stays zero", e, index),
        }
    }

    info!("Dose volume read: {}/{} planes loaded from {}", loaded, depth, dir.display());
    VolumeBuffer::new((depth, rows, cols), VolumeData::Float32(values))
}
