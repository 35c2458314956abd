//! # Dataset Facade
//!
//! Ties the file readers to the assembler for one exported patient dataset.
//!
//! Only the image header is read by [`Dataset::open`]; it fixes the study
//! identity shared by every output. Each output step reads its own files when
//! called, so a missing ROI or trial file only fails the step that needs it.

use std::path::PathBuf;

use log::{debug, info};

use super::assemble::{
    self, AssembleOptions, ConversionBundle, DoseVolume, ImageSeries, PlanInfo, StructureSet,
    StudyIdentity,
};
use super::reader::{ImageReader, RoiReader, TrialReader};
use super::types::error::{PinnacleError, Result};
use super::types::models::ImageInfo;

/// Locations of the files making up one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub header: PathBuf,
    /// Raw image volume; defaults to `header` with extension `img`.
    pub image: Option<PathBuf>,
    pub roi: Option<PathBuf>,
    pub trial: Option<PathBuf>,
    /// Directory holding the dose slices; defaults to the trial file's directory.
    pub dose_dir: Option<PathBuf>,
}

impl DatasetPaths {
    pub fn new(header: impl Into<PathBuf>) -> Self {
        Self {
            header: header.into(),
            image: None,
            roi: None,
            trial: None,
            dose_dir: None,
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }

    pub fn with_roi(mut self, path: impl Into<PathBuf>) -> Self {
        self.roi = Some(path.into());
        self
    }

    pub fn with_trial(mut self, path: impl Into<PathBuf>) -> Self {
        self.trial = Some(path.into());
        self
    }

    pub fn with_dose_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dose_dir = Some(path.into());
        self
    }
}

/// One opened dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    paths: DatasetPaths,
    image: ImageReader,
    info: ImageInfo,
    identity: StudyIdentity,
    options: AssembleOptions,
}

impl Dataset {
    /// Reads the image header and derives the study identity.
    ///
    /// # Errors
    /// Returns an error if the header cannot be read or decoded.
    pub fn open(paths: DatasetPaths, options: &AssembleOptions) -> Result<Self> {
        let image = ImageReader::new(&paths.header)?;
        let info = image.image_info();
        let identity = StudyIdentity::derive(&info, options);
        info!(
            "Dataset opened: {}x{}x{} {} image, ROI {}, trial {}",
            info.dimensions.0,
            info.dimensions.1,
            info.dimensions.2,
            info.modality,
            if paths.roi.is_some() { "given" } else { "absent" },
            if paths.trial.is_some() { "given" } else { "absent" },
        );

        Ok(Self {
            paths,
            image,
            info,
            identity,
            options: options.clone(),
        })
    }

    pub fn paths(&self) -> &DatasetPaths {
        &self.paths
    }

    pub fn image_info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn identity(&self) -> &StudyIdentity {
        &self.identity
    }

    /// Reads the image volume and splits it into slices.
    pub fn image_series(&self) -> Result<ImageSeries> {
        let volume = self.image.read_volume(self.paths.image.as_deref())?;
        Ok(assemble::image_series(&self.info, &volume, &self.identity))
    }

    /// Reads the ROI file.
    ///
    /// # Errors
    /// `MissingInput` when no ROI path was given.
    pub fn structure_set(&self) -> Result<StructureSet> {
        let reader = self.roi_reader()?;
        Ok(assemble::structure_set(reader.structures(), &self.identity))
    }

    /// Opens the ROI file.
    ///
    /// # Errors
    /// `MissingInput` when no ROI path was given.
    pub fn roi_reader(&self) -> Result<RoiReader> {
        let path = self
            .paths
            .roi
            .as_deref()
            .ok_or(PinnacleError::MissingInput("ROI file"))?;
        RoiReader::new(path)
    }

    /// Opens the trial file.
    ///
    /// # Errors
    /// `MissingInput` when no trial path was given.
    pub fn trial_reader(&self) -> Result<TrialReader> {
        let path = self
            .paths
            .trial
            .as_deref()
            .ok_or(PinnacleError::MissingInput("trial file"))?;
        TrialReader::new(path, self.paths.dose_dir.as_deref())
    }

    /// Reads the trial file and every dose slice it names.
    pub fn dose_volume(&self) -> Result<DoseVolume> {
        let trial = self.trial_reader()?;
        let volume = trial.read_dose_volume()?;
        Ok(assemble::dose_volume(trial.dose_grid_info(), volume, &self.identity))
    }

    /// Reads the trial file and summarises it as a plan.
    pub fn plan(&self) -> Result<PlanInfo> {
        let trial = self.trial_reader()?;
        Ok(assemble::plan(trial.trial(), &self.identity))
    }

    /// Reads every supplied input and hands it to [`assemble::assemble`].
    ///
    /// Steps without input are left as `None`; any other error is returned.
    pub fn bundle(&self) -> Result<ConversionBundle> {
        let volume = self.image.read_volume(self.paths.image.as_deref())?;
        let rois = skip_missing(self.roi_reader())?;
        let trial = skip_missing(self.trial_reader())?;
        let dose = trial.as_ref().map(TrialReader::read_dose_volume).transpose()?;

        Ok(assemble::assemble(
            self.image.header(),
            &volume,
            rois.as_ref().map(RoiReader::structures),
            trial.as_ref().map(TrialReader::trial).zip(dose),
            &self.options,
        ))
    }
}

fn skip_missing<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PinnacleError::MissingInput(what)) => {
            debug!("Skipping step: no {} was provided", what);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
