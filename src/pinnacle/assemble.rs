//! # Domain Model Assembly
//!
//! Pure transforms from parsed files to the neutral records a DICOM encoder
//! consumes. Nothing here touches the filesystem.
//!
//! - [`image_info`] maps the header record to image geometry and identity.
//! - [`dose_grid_info`], [`prescription_info`], [`beam_info`] and
//!   [`patient_representation`] read fixed key paths of the trial tree.
//! - [`structure_set`] numbers structures from 1 in parse order.
//! - [`StudyIdentity`] is the one place identifiers are derived, so image,
//!   structure, dose and plan records share a single frame of reference.
//!
//! Every field has a default; absent keys never fail.

use log::debug;
use twox_hash::XxHash64;

use super::types::models::{
    BeamInfo, ConfigNode, Contour, DoseGridInfo, HeaderRecord, ImageInfo, PatientRepresentation,
    PrescriptionInfo, Structure,
};
use super::types::volume::VolumeBuffer;

/// Organisation root used when none is configured.
pub const DEFAULT_UID_ROOT: &str = "1.2.826.0.1.3680043.8.498";

/// Full-scale value used to derive the dose grid scaling.
const DOSE_SCALE_MAX: f64 = 65535.0;

/// Options for assembling the output records.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleOptions {
    /// Dotted prefix of every derived UID.
    pub uid_root: String,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            uid_root: DEFAULT_UID_ROOT.to_string(),
        }
    }
}

/// Study, series and frame-of-reference identifiers shared by all outputs.
///
/// Derived deterministically from the patient/study/exam identity, so the
/// same dataset always yields the same UIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyIdentity {
    pub study_uid: String,
    pub image_series_uid: String,
    pub structure_series_uid: String,
    pub dose_series_uid: String,
    pub plan_series_uid: String,
    pub frame_of_reference_uid: String,
}

impl StudyIdentity {
    pub fn derive(info: &ImageInfo, options: &AssembleOptions) -> Self {
        let key = format!(
            "{}|{}|{}|{}|{}",
            info.patient_id, info.patient_name, info.study_id, info.exam_id, info.scan_date
        );
        let uid = |seed: u64| derive_uid(&options.uid_root, seed, &key);
        let identity = Self {
            study_uid: uid(1),
            image_series_uid: uid(2),
            structure_series_uid: uid(3),
            dose_series_uid: uid(4),
            plan_series_uid: uid(5),
            frame_of_reference_uid: uid(6),
        };
        debug!("Derived study UID {} for key '{}'", identity.study_uid, key);
        identity
    }
}

fn derive_uid(root: &str, seed: u64, key: &str) -> String {
    let root = root.trim_end_matches('.');
    format!("{}.{}", root, XxHash64::oneshot(seed, key.as_bytes()))
}

/// Maps the image header to geometry and identity, defaulting absent keys.
pub fn image_info(header: &HeaderRecord) -> ImageInfo {
    let dim = |key: &str, default: i64| usize::try_from(header.i64_or(key, default)).unwrap_or(0);
    ImageInfo {
        dimensions: (dim("x_dim", 512), dim("y_dim", 512), dim("z_dim", 1)),
        pixel_spacing: (
            header.f64_or("x_pixdim", 1.0),
            header.f64_or("y_pixdim", 1.0),
            header.f64_or("z_pixdim", 1.0),
        ),
        origin: (
            header.f64_or("x_start", 0.0),
            header.f64_or("y_start", 0.0),
            header.f64_or("z_start", 0.0),
        ),
        patient_position: header.text_or("patient_position", "HFS"),
        modality: header.text_or("modality", "CT"),
        manufacturer: header.text_or("manufacturer", ""),
        model: header.text_or("model", ""),
        patient_name: header.text_or("db_name", ""),
        patient_id: header.text_or("patient_id", ""),
        study_id: header.text_or("study_id", ""),
        exam_id: header.text_or("exam_id", ""),
        scan_date: header.text_or("date", ""),
        datatype: header.i64_or("datatype", 1),
        bytes_per_pixel: header.i64_or("bytes_pix", 2),
    }
}

/// The scope holding the plan keys.
///
/// A file whose only top-level entry is a `Trial` block is read through it, so
/// `Trial ={ DoseGrid ={ ... }; };` and a bare `DoseGrid ={ ... };` are equivalent.
/// When the file holds several `Trial` blocks the first one is used.
pub fn trial_scope(tree: &ConfigNode) -> &ConfigNode {
    let Some(("Trial", entry)) = tree.iter().next().filter(|_| tree.len() == 1) else {
        return tree;
    };
    let trials = entry.nodes();
    if trials.len() > 1 {
        debug!("{} trials found; using the first", trials.len());
    }
    entry.as_node().unwrap_or(tree)
}

/// Reads `DoseGrid.{VoxelSize,Dimension,Origin}.{X,Y,Z}`.
pub fn dose_grid_info(trial: &ConfigNode) -> DoseGridInfo {
    let trial = trial_scope(trial);
    let defaults = DoseGridInfo::default();
    let dim = |axis: &str, default: usize| {
        let path = format!("DoseGrid.Dimension.{}", axis);
        usize::try_from(trial.i64_at(&path, default as i64)).unwrap_or(0)
    };
    let real = |group: &str, axis: &str, default: f64| trial.f64_at(&format!("DoseGrid.{}.{}", group, axis), default);

    DoseGridInfo {
        voxel_size: (
            real("VoxelSize", "X", defaults.voxel_size.0),
            real("VoxelSize", "Y", defaults.voxel_size.1),
            real("VoxelSize", "Z", defaults.voxel_size.2),
        ),
        dimensions: (
            dim("X", defaults.dimensions.0),
            dim("Y", defaults.dimensions.1),
            dim("Z", defaults.dimensions.2),
        ),
        origin: (
            real("Origin", "X", defaults.origin.0),
            real("Origin", "Y", defaults.origin.1),
            real("Origin", "Z", defaults.origin.2),
        ),
    }
}

/// Reads the first `PrescriptionList.Prescription`.
///
/// Later prescriptions are ignored. `None` when the list has none.
pub fn prescription_info(trial: &ConfigNode) -> Option<PrescriptionInfo> {
    let trial = trial_scope(trial);
    let entry = trial.lookup("PrescriptionList.Prescription")?;
    let nodes = entry.nodes();
    if nodes.len() > 1 {
        debug!("{} prescriptions found; using the first", nodes.len());
    }
    let prescription = nodes.first()?;
    let defaults = PrescriptionInfo::default();

    Some(PrescriptionInfo {
        name: prescription.text_at("Name", &defaults.name),
        dose: prescription.f64_at("PrescriptionDose", defaults.dose),
        fractions: prescription.i64_at("NumberOfFractions", defaults.fractions),
        percent: prescription.f64_at("PrescriptionPercent", defaults.percent),
        method: prescription.text_at("Method", &defaults.method),
        point: prescription.text_at("PrescriptionPoint", &defaults.point),
    })
}

/// Reads every child of `BeamList` whose key starts with `Beam`, in file order.
///
/// A repeated `Beam` key contributes one beam per block.
pub fn beam_info(trial: &ConfigNode) -> Vec<BeamInfo> {
    let Some(beam_list) = trial_scope(trial).node("BeamList") else {
        return Vec::new();
    };

    beam_list
        .iter()
        .filter(|(key, _)| key.starts_with("Beam"))
        .flat_map(|(key, entry)| entry.nodes().iter().map(move |beam| (key, beam)))
        .map(|(key, beam)| BeamInfo {
            name: beam.text_at("Name", key),
            energy: beam.f64_at("Energy", 6.0),
            gantry_angle: beam.f64_at("GantryAngle", 0.0),
            collimator_angle: beam.f64_at("CollimatorAngle", 0.0),
            couch_angle: beam.f64_at("CouchAngle", 0.0),
            monitor_units: beam.f64_at("MonitorUnits", 0.0),
            machine: beam.text_at("Machine.Name", "Unknown"),
        })
        .collect()
}

/// Reads the `PatientRepresentation` references.
pub fn patient_representation(trial: &ConfigNode) -> PatientRepresentation {
    let trial = trial_scope(trial);
    let text = |key: &str| trial.text_at(&format!("PatientRepresentation.{}", key), "");
    PatientRepresentation {
        volume_name: text("PatientVolumeName"),
        ct_to_density: text("CtToDensityName"),
        ct_to_density_version: text("CtToDensityVersion"),
        dm_table: text("DMTableName"),
        dm_table_version: text("DMTableVersion"),
    }
}

/// RGB triplet for a Pinnacle colour name; unknown names are white.
pub fn roi_color(name: &str) -> [u8; 3] {
    match name.trim().to_ascii_lowercase().as_str() {
        "red" => [255, 0, 0],
        "green" => [0, 255, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" => [0, 255, 255],
        "magenta" => [255, 0, 255],
        "khaki" => [240, 230, 140],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "brown" => [165, 42, 42],
        _ => [255, 255, 255],
    }
}

/// One axial image plane ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlice {
    /// 1-based.
    pub instance_number: usize,
    /// Patient-space position of the first voxel.
    pub position: (f64, f64, f64),
    pub pixels: Vec<i16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSeries {
    pub info: ImageInfo,
    pub study_uid: String,
    pub series_uid: String,
    pub frame_of_reference_uid: String,
    pub slices: Vec<ImageSlice>,
}

/// Splits the image volume into positioned int16 slices.
pub fn image_series(info: &ImageInfo, volume: &VolumeBuffer, identity: &StudyIdentity) -> ImageSeries {
    let (ox, oy, oz) = info.origin;
    let dz = info.pixel_spacing.2;
    let slices = (0..volume.depth())
        .filter_map(|z| {
            let pixels = volume.plane_i16(z)?;
            Some(ImageSlice {
                instance_number: z + 1,
                position: (ox, oy, oz + z as f64 * dz),
                pixels,
            })
        })
        .collect();

    ImageSeries {
        info: info.clone(),
        study_uid: identity.study_uid.clone(),
        series_uid: identity.image_series_uid.clone(),
        frame_of_reference_uid: identity.frame_of_reference_uid.clone(),
        slices,
    }
}

/// A numbered structure with the contours that carry points.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiEntry {
    /// 1-based, in parse order.
    pub number: usize,
    pub name: String,
    pub color: [u8; 3],
    pub contours: Vec<Contour>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureSet {
    pub study_uid: String,
    pub series_uid: String,
    pub frame_of_reference_uid: String,
    pub rois: Vec<RoiEntry>,
}

/// Numbers structures from 1 in parse order. Contours without points are dropped.
pub fn structure_set(structures: &[Structure], identity: &StudyIdentity) -> StructureSet {
    let rois = structures
        .iter()
        .enumerate()
        .map(|(idx, structure)| RoiEntry {
            number: idx + 1,
            name: structure.name.clone(),
            color: roi_color(&structure.color),
            contours: structure
                .contours
                .iter()
                .filter(|c| !c.points.is_empty())
                .cloned()
                .collect(),
        })
        .collect();

    StructureSet {
        study_uid: identity.study_uid.clone(),
        series_uid: identity.structure_series_uid.clone(),
        frame_of_reference_uid: identity.frame_of_reference_uid.clone(),
        rois,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoseVolume {
    pub grid: DoseGridInfo,
    pub study_uid: String,
    pub series_uid: String,
    pub frame_of_reference_uid: String,
    /// Float32 dose in `(z, y, x)` order.
    pub volume: VolumeBuffer,
}

impl DoseVolume {
    /// Z offset of each plane relative to the first: `index * voxel_size.z`.
    pub fn grid_frame_offsets(&self) -> Vec<f64> {
        (0..self.volume.depth())
            .map(|z| z as f64 * self.grid.voxel_size.2)
            .collect()
    }

    /// Scaling that maps the maximum dose to 65535; 1.0 for an all-zero volume.
    pub fn dose_grid_scaling(&self) -> f64 {
        match self.volume.max_value() {
            Some(max) if max > 0.0 => max / DOSE_SCALE_MAX,
            _ => 1.0,
        }
    }

    /// Dose divided by [`dose_grid_scaling`](Self::dose_grid_scaling), as unsigned integers.
    pub fn scaled_values(&self) -> Vec<u32> {
        let scaling = self.dose_grid_scaling();
        (0..self.volume.depth())
            .filter_map(|z| self.volume.plane_f32(z))
            .flatten()
            .map(|v| (v as f64 / scaling) as u32)
            .collect()
    }
}

pub fn dose_volume(grid: DoseGridInfo, volume: VolumeBuffer, identity: &StudyIdentity) -> DoseVolume {
    DoseVolume {
        grid,
        study_uid: identity.study_uid.clone(),
        series_uid: identity.dose_series_uid.clone(),
        frame_of_reference_uid: identity.frame_of_reference_uid.clone(),
        volume,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanBeam {
    /// 1-based.
    pub number: usize,
    pub info: BeamInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanInfo {
    pub study_uid: String,
    pub series_uid: String,
    pub frame_of_reference_uid: String,
    pub prescription: PrescriptionInfo,
    pub beams: Vec<PlanBeam>,
    pub patient: PatientRepresentation,
}

impl PlanInfo {
    pub fn number_of_fractions(&self) -> i64 {
        self.prescription.fractions
    }
}

/// Summarises the trial as a plan; an absent prescription uses defaults.
pub fn plan(trial: &ConfigNode, identity: &StudyIdentity) -> PlanInfo {
    let prescription = prescription_info(trial).unwrap_or_else(|| {
        debug!("No prescription in trial; using defaults");
        PrescriptionInfo::default()
    });
    let beams = beam_info(trial)
        .into_iter()
        .enumerate()
        .map(|(idx, info)| PlanBeam { number: idx + 1, info })
        .collect();

    PlanInfo {
        study_uid: identity.study_uid.clone(),
        series_uid: identity.plan_series_uid.clone(),
        frame_of_reference_uid: identity.frame_of_reference_uid.clone(),
        prescription,
        beams,
        patient: patient_representation(trial),
    }
}

/// Everything handed to the DICOM encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionBundle {
    pub identity: StudyIdentity,
    pub image: ImageSeries,
    pub structure_set: Option<StructureSet>,
    pub dose: Option<DoseVolume>,
    pub plan: Option<PlanInfo>,
}

/// Assembles every available output from already-parsed inputs.
///
/// `trial` pairs the trial tree with its dose volume.
pub fn assemble(
    header: &HeaderRecord,
    image: &VolumeBuffer,
    structures: Option<&[Structure]>,
    trial: Option<(&ConfigNode, VolumeBuffer)>,
    options: &AssembleOptions,
) -> ConversionBundle {
    let info = image_info(header);
    let identity = StudyIdentity::derive(&info, options);

    let image = image_series(&info, image, &identity);
    let structure_set = structures.map(|s| structure_set(s, &identity));
    let (dose, plan) = match trial {
        Some((tree, dose)) => (
            Some(dose_volume(dose_grid_info(tree), dose, &identity)),
            Some(plan(tree, &identity)),
        ),
        None => (None, None),
    };

    ConversionBundle {
        identity,
        image,
        structure_set,
        dose,
        plan,
    }
}
