use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use log::{debug, info};

use super::assemble;
use super::format::{block, header, roi, volume};
use super::types::error::Result;
use super::types::models::*;
use super::types::volume::{ElementKind, VolumeBuffer};
use super::utils;

/// Reader for an image header and its raw volume.
///
/// The header is read and parsed eagerly; the volume is only loaded by
/// [`read_volume`](Self::read_volume).
#[derive(Debug, Clone)]
pub struct ImageReader {
    header_path: PathBuf,
    header: HeaderRecord,
}

impl ImageReader {
    /// Reads and parses an image header file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or no fallback encoding decodes it.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening image header: {}", path.display());
        let (content, _) = utils::read_text(path)?;
        Ok(Self {
            header_path: path.to_path_buf(),
            header: header::parse(&content),
        })
    }

    pub fn header_path(&self) -> &Path {
        &self.header_path
    }

    pub fn header(&self) -> &HeaderRecord {
        &self.header
    }

    /// Geometry and identity with defaults applied.
    pub fn image_info(&self) -> ImageInfo {
        assemble::image_info(&self.header)
    }

    /// The header path with its extension replaced by `img`.
    pub fn default_image_path(&self) -> PathBuf {
        self.header_path.with_extension("img")
    }

    /// Reads the image volume as `(z, y, x)`.
    ///
    /// Uses [`default_image_path`](Self::default_image_path) when `image_path` is `None`.
    ///
    /// # Errors
    /// `Read` if the volume file cannot be read, `SizeMismatch` if it is shorter
    /// than the header's dimensions require.
    pub fn read_volume(&self, image_path: Option<&Path>) -> Result<VolumeBuffer> {
        let path = image_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_image_path());
        let info = self.image_info();
        let kind = ElementKind::from_codes(info.datatype, info.bytes_per_pixel);
        debug!(
            "Image codes datatype={} bytes_pix={} select {:?}",
            info.datatype, info.bytes_per_pixel, kind
        );

        let bytes = utils::read_file(&path)?;
        let buffer = volume::decode(&bytes, info.dimensions, kind, &path)?;
        info!("Image volume read: {:?} {:?} from {}", buffer.shape(), kind, path.display());
        Ok(buffer)
    }
}

/// Reader for a `.roi` structure file.
#[derive(Debug, Clone)]
pub struct RoiReader {
    path: PathBuf,
    structures: Vec<Structure>,
}

impl RoiReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening ROI file: {}", path.display());
        let (content, _) = utils::read_text(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            structures: roi::parse(&content),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Structures in file order.
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn structure_names(&self) -> Vec<&str> {
        self.structures.iter().map(|s| s.name.as_str()).collect()
    }

    /// First structure with exactly this name.
    pub fn structure_by_name(&self, name: &str) -> Option<&Structure> {
        self.structures.iter().find(|s| s.name == name)
    }

    pub fn into_structures(self) -> Vec<Structure> {
        self.structures
    }
}

/// Reader for a `.Trial` plan file and the dose slices stored next to it.
#[derive(Debug, Clone)]
pub struct TrialReader {
    trial_path: PathBuf,
    dose_dir: PathBuf,
    trial: ConfigNode,
    encoding: &'static Encoding,
}

impl TrialReader {
    /// Reads and parses a trial file.
    ///
    /// Dose slices are looked up in `dose_dir`, or next to the trial file when `None`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or no fallback encoding decodes it.
    pub fn new(path: impl AsRef<Path>, dose_dir: Option<&Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening trial file: {}", path.display());
        let (content, encoding) = utils::read_text(path)?;
        let dose_dir = dose_dir
            .map(Path::to_path_buf)
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        Ok(Self {
            trial_path: path.to_path_buf(),
            dose_dir,
            trial: block::parse(&content),
            encoding,
        })
    }

    pub fn trial_path(&self) -> &Path {
        &self.trial_path
    }

    pub fn dose_dir(&self) -> &Path {
        &self.dose_dir
    }

    pub fn trial(&self) -> &ConfigNode {
        &self.trial
    }

    /// Encoding that decoded the trial file.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// File name without its extension; dose slices are named after it.
    pub fn stem(&self) -> String {
        self.trial_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn dose_grid_info(&self) -> DoseGridInfo {
        assemble::dose_grid_info(&self.trial)
    }

    pub fn prescription_info(&self) -> Option<PrescriptionInfo> {
        assemble::prescription_info(&self.trial)
    }

    pub fn beam_info(&self) -> Vec<BeamInfo> {
        assemble::beam_info(&self.trial)
    }

    pub fn patient_representation(&self) -> PatientRepresentation {
        assemble::patient_representation(&self.trial)
    }

    /// Reads dose plane `index` sized by the dose grid. `Ok(None)` when the slice file is absent.
    pub fn read_dose_slice(&self, index: usize) -> Result<Option<Vec<f32>>> {
        let (cols, rows, _) = self.dose_grid_info().dimensions;
        volume::read_dose_slice(&self.dose_dir, &self.stem(), index, rows, cols)
    }

    /// Reads every dose plane of the grid; missing planes stay zero.
    pub fn read_dose_volume(&self) -> Result<VolumeBuffer> {
        let grid = self.dose_grid_info();
        volume::read_dose_volume(&self.dose_dir, &self.stem(), grid.dimensions)
    }
}
