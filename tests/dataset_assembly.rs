use pinnacle_reader::pinnacle::assemble::{self, DEFAULT_UID_ROOT};
use pinnacle_reader::pinnacle::format::{block, header, roi};
use pinnacle_reader::{
    AssembleOptions, Dataset, DatasetPaths, ImageReader, PinnacleError, StudyIdentity, TrialReader, VolumeBuffer,
    VolumeData,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "\
x_dim = 2;
y_dim = 2;
z_dim = 2;
datatype = 1;
bytes_pix = 2;
x_pixdim = 0.5;
y_pixdim = 0.5;
z_pixdim = 3.0;
x_start = -10.0;
y_start = -20.0;
z_start = 5.0;
db_name = \"Doe^Jane\";
patient_id = 12345;
study_id = 9;
exam_id = 3;
modality = CT;
";

const ROI: &str = "\
//-----------------------------------------------------
//  Beginning of ROI: Body
//-----------------------------------------------------
roi={
  color: green
  curve={
    points={
      0 0 5
      1 0 5
      1 1 5
    };
  }; // End of curve 1
  curve={
    points={
    };
  }; // End of curve 2
}; // End of roi Body
//-----------------------------------------------------
//  Beginning of ROI: Cord
//-----------------------------------------------------
roi={
  color: teal
}; // End of roi Cord
";

const TRIAL: &str = "\
Trial ={
  DoseGrid .VoxelSize .Z = 2.5;
  DoseGrid .Dimension .X = 2;
  DoseGrid .Dimension .Y = 1;
  DoseGrid .Dimension .Z = 3;
  PrescriptionList ={
    Prescription ={
      PrescriptionDose = 5000;
      NumberOfFractions = 25;
    };
  };
  BeamList ={
    Beam ={
      Name = \"RAO\";
    };
    Beam ={
      Name = \"LAO\";
    };
  };
};
";

fn write_f32(path: &Path, values: &[f32]) {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    fs::write(path, bytes).unwrap();
}

/// Writes a complete dataset and returns its paths.
fn dataset_dir() -> (TempDir, DatasetPaths) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("ImageSet_0.header"), HEADER).unwrap();
    let pixels: Vec<u8> = [10i16, 20, 30, 40, 50, 60, 70, 80]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    fs::write(root.join("ImageSet_0.img"), pixels).unwrap();
    fs::write(root.join("plan.roi"), ROI).unwrap();
    fs::write(root.join("plan.Trial"), TRIAL).unwrap();
    write_f32(&root.join("plan.binary.000"), &[0.0, 655.35]);
    write_f32(&root.join("plan.binary.002"), &[131.07, 0.0]);

    let paths = DatasetPaths::new(root.join("ImageSet_0.header"))
        .with_roi(root.join("plan.roi"))
        .with_trial(root.join("plan.Trial"));
    (dir, paths)
}

#[test]
fn image_series_positions_slices() {
    let (_dir, paths) = dataset_dir();
    let dataset = Dataset::open(paths, &AssembleOptions::default()).unwrap();
    let series = dataset.image_series().unwrap();

    assert_eq!(series.slices.len(), 2);
    assert_eq!(series.slices[0].instance_number, 1);
    assert_eq!(series.slices[0].position, (-10.0, -20.0, 5.0));
    assert_eq!(series.slices[1].position, (-10.0, -20.0, 8.0));
    assert_eq!(series.slices[1].pixels, vec![50, 60, 70, 80]);
    assert_eq!(series.info.patient_name, "Doe^Jane");
    assert_eq!(series.frame_of_reference_uid, dataset.identity().frame_of_reference_uid);
}

#[test]
fn structure_set_numbers_rois_in_parse_order() {
    let (_dir, paths) = dataset_dir();
    let dataset = Dataset::open(paths, &AssembleOptions::default()).unwrap();
    let set = dataset.structure_set().unwrap();

    assert_eq!(set.rois.len(), 2);
    assert_eq!(set.rois[0].number, 1);
    assert_eq!(set.rois[0].name, "Body");
    assert_eq!(set.rois[0].color, [0, 255, 0]);
    assert_eq!(set.rois[0].contours.len(), 1);
    assert_eq!(set.rois[1].number, 2);
    assert_eq!(set.rois[1].color, [255, 255, 255]);
    assert!(set.rois[1].contours.is_empty());
}

#[test]
fn dose_volume_scaling_and_offsets() {
    let (_dir, paths) = dataset_dir();
    let dataset = Dataset::open(paths, &AssembleOptions::default()).unwrap();
    let dose = dataset.dose_volume().unwrap();

    assert_eq!(dose.volume.shape(), (3, 1, 2));
    assert_eq!(dose.grid_frame_offsets(), vec![0.0, 2.5, 5.0]);
    assert_eq!(dose.volume.plane_f32(1), Some(vec![0.0, 0.0]));

    let scaling = dose.dose_grid_scaling();
    assert!((scaling - 655.35f32 as f64 / 65535.0).abs() < 1e-12);
    let scaled = dose.scaled_values();
    assert_eq!(scaled.len(), 6);
    assert_eq!(scaled[0], 0);
    assert!(scaled[1] >= 65534);
    assert!((13106..=13107).contains(&scaled[4]));
}

#[test]
fn zero_dose_uses_unit_scaling() {
    let identity = StudyIdentity::derive(&assemble::image_info(&header::parse("")), &AssembleOptions::default());
    let volume = VolumeBuffer::new((1, 1, 2), VolumeData::Float32(vec![0.0, 0.0])).unwrap();
    let dose = assemble::dose_volume(Default::default(), volume, &identity);

    assert_eq!(dose.dose_grid_scaling(), 1.0);
    assert_eq!(dose.scaled_values(), vec![0, 0]);
}

#[test]
fn plan_summary() {
    let (_dir, paths) = dataset_dir();
    let dataset = Dataset::open(paths, &AssembleOptions::default()).unwrap();
    let plan = dataset.plan().unwrap();

    assert_eq!(plan.prescription.dose_gy(), 50.0);
    assert_eq!(plan.number_of_fractions(), 25);
    assert_eq!(plan.prescription.name, "Prescription_1");
    let beams: Vec<(usize, &str)> = plan.beams.iter().map(|b| (b.number, b.info.name.as_str())).collect();
    assert_eq!(beams, [(1, "RAO"), (2, "LAO")]);
}

#[test]
fn plan_without_prescription_uses_defaults() {
    let identity = StudyIdentity::derive(&assemble::image_info(&header::parse("")), &AssembleOptions::default());
    let plan = assemble::plan(&block::parse("Trial ={\n  Name = 1;\n};"), &identity);

    assert_eq!(plan.prescription.fractions, 1);
    assert_eq!(plan.prescription.percent, 100.0);
    assert!(plan.beams.is_empty());
}

#[test]
fn bundle_with_every_input() {
    let (_dir, paths) = dataset_dir();
    let bundle = Dataset::open(paths, &AssembleOptions::default())
        .unwrap()
        .bundle()
        .unwrap();

    let frame = &bundle.identity.frame_of_reference_uid;
    assert_eq!(&bundle.image.frame_of_reference_uid, frame);
    assert_eq!(&bundle.structure_set.as_ref().unwrap().frame_of_reference_uid, frame);
    assert_eq!(&bundle.dose.as_ref().unwrap().frame_of_reference_uid, frame);
    assert_eq!(&bundle.plan.as_ref().unwrap().frame_of_reference_uid, frame);
}

#[test]
fn missing_inputs_only_fail_their_own_step() {
    let (dir, _) = dataset_dir();
    let paths = DatasetPaths::new(dir.path().join("ImageSet_0.header"));
    let dataset = Dataset::open(paths, &AssembleOptions::default()).unwrap();

    let err = dataset.structure_set().unwrap_err();
    assert!(err.is_missing_input());
    assert!(matches!(dataset.plan(), Err(PinnacleError::MissingInput("trial file"))));
    assert!(dataset.image_series().is_ok());

    let bundle = dataset.bundle().unwrap();
    assert!(bundle.structure_set.is_none());
    assert!(bundle.dose.is_none());
    assert!(bundle.plan.is_none());
    assert_eq!(bundle.image.slices.len(), 2);
}

#[test]
fn bundle_surfaces_format_errors() {
    let (dir, paths) = dataset_dir();
    fs::write(dir.path().join("ImageSet_0.img"), [0u8; 3]).unwrap();
    let dataset = Dataset::open(paths, &AssembleOptions::default()).unwrap();

    assert!(dataset.bundle().unwrap_err().is_format_error());
    assert!(dataset.plan().is_ok());
}

#[test]
fn identifiers_are_deterministic() {
    let info = assemble::image_info(&header::parse(HEADER));
    let options = AssembleOptions::default();
    let first = StudyIdentity::derive(&info, &options);
    let second = StudyIdentity::derive(&info, &options);

    assert_eq!(first, second);
    assert!(first.study_uid.starts_with(DEFAULT_UID_ROOT));
    assert_ne!(first.study_uid, first.image_series_uid);
    assert_ne!(first.dose_series_uid, first.plan_series_uid);

    let other = StudyIdentity::derive(
        &assemble::image_info(&header::parse("patient_id = 54321;")),
        &options,
    );
    assert_ne!(first.study_uid, other.study_uid);

    let custom = StudyIdentity::derive(&info, &AssembleOptions { uid_root: "1.2.3.".into() });
    assert!(custom.study_uid.starts_with("1.2.3."));
    assert!(!custom.study_uid.contains(".."));
}

#[test]
fn pure_assemble_matches_dataset() {
    let (dir, paths) = dataset_dir();
    let options = AssembleOptions::default();
    let from_dataset = Dataset::open(paths, &options).unwrap().bundle().unwrap();

    let root = dir.path();
    let header = header::parse(HEADER);
    let image = ImageReader::new(root.join("ImageSet_0.header"))
        .unwrap()
        .read_volume(None)
        .unwrap();
    let structures = roi::parse(ROI);
    let trial = TrialReader::new(root.join("plan.Trial"), None).unwrap();
    let dose = trial.read_dose_volume().unwrap();

    let bundle = assemble::assemble(&header, &image, Some(structures.as_slice()), Some((trial.trial(), dose)), &options);

    assert_eq!(bundle, from_dataset);
}

#[test]
fn bundle_keeps_the_configured_uid_root() {
    let (_dir, paths) = dataset_dir();
    let options = AssembleOptions { uid_root: "1.2.3".into() };
    let dataset = Dataset::open(paths, &options).unwrap();
    let bundle = dataset.bundle().unwrap();

    assert_eq!(&bundle.identity, dataset.identity());
    assert!(bundle.image.study_uid.starts_with("1.2.3."));
    assert_eq!(bundle.dose.unwrap().series_uid, dataset.identity().dose_series_uid);
    assert_eq!(dataset.roi_reader().unwrap().structure_names(), ["Body", "Cord"]);
}
