//! # pinnacle-reader
//!
//! A reader for Pinnacle treatment-planning exports: the flat image header,
//! the raw voxel volume, the `.roi` structure file and the hierarchical
//! `.Trial` plan file, including the per-slice binary dose files.
//!
//! Everything is parsed into a neutral in-memory model (image series,
//! structure set, dose volume, plan summary) ready to be handed to a DICOM
//! encoder. Encoding the final DICOM objects is left to the caller.
pub mod pinnacle;

// Re-export the main types for convenience
pub use pinnacle::{
    Dataset,
    DatasetPaths,
    assemble::{AssembleOptions, ConversionBundle, StudyIdentity},
    reader::{ImageReader, RoiReader, TrialReader},
    types::{
        error::{PinnacleError, Result},
        models::{
            BeamInfo, ConfigNode, Contour, DoseGridInfo, Entry, HeaderRecord, ImageInfo,
            PatientRepresentation, PrescriptionInfo, Structure, TypedValue,
        },
        volume::{ElementKind, VolumeBuffer, VolumeData},
    },
};
