use pinnacle_reader::pinnacle::assemble;
use pinnacle_reader::pinnacle::format::header;
use pinnacle_reader::TypedValue;

const HEADER: &str = r#"
// Pinnacle image header
x_dim = 512;
y_dim = 512;
z_dim = 120;
datatype = 1;
bytes_pix = 2;
x_pixdim = 0.0976;
y_pixdim = 0.0976;
z_pixdim = 0.3;
x_start = -25.0;
y_start = -25.0;
z_start = -18.0;
db_name = "Smith^John";
patient_id = 12345;
study_id = :1.2.840.113619
exam_id = 77;
date = :20010101
modality = CT;
manufacturer = "GE MEDICAL SYSTEMS";
patient_position = HFS;
this line has no assignment
"#;

#[test]
fn parses_every_assignment() {
    let record = header::parse(HEADER);

    assert_eq!(record.get("x_dim"), Some(&TypedValue::Integer(512)));
    assert_eq!(record.get("x_pixdim"), Some(&TypedValue::Float(0.0976)));
    assert_eq!(record.get("z_start"), Some(&TypedValue::Float(-18.0)));
    assert_eq!(record.get("db_name"), Some(&TypedValue::Text("Smith^John".into())));
    assert_eq!(record.get("modality"), Some(&TypedValue::Text("CT".into())));
    assert_eq!(record.len(), 19);
    assert!(record.get("this line has no assignment").is_none());
}

#[test]
fn colon_values_are_always_text() {
    let record = header::parse(HEADER);

    assert_eq!(record.get("date"), Some(&TypedValue::Text("20010101".into())));
    assert_eq!(record.get("study_id"), Some(&TypedValue::Text("1.2.840.113619".into())));
}

#[test]
fn packed_statements_on_one_line() {
    let record = header::parse("x_dim=2;y_dim=2;z_dim=1;datatype=1;bytes_pix=2;");

    assert_eq!(record.len(), 5);
    assert_eq!(record.i64_or("x_dim", 0), 2);
    assert_eq!(record.i64_or("bytes_pix", 0), 2);
}

#[test]
fn comments_blank_lines_and_junk_are_skipped() {
    let record = header::parse("\n\n// x_dim = 4;\n = 3;\nno equals\ny_dim = 8; // trailing\n");

    assert_eq!(record.len(), 1);
    assert_eq!(record.get("y_dim"), Some(&TypedValue::Integer(8)));
}

#[test]
fn image_info_applies_header_values() {
    let info = assemble::image_info(&header::parse(HEADER));

    assert_eq!(info.dimensions, (512, 512, 120));
    assert_eq!(info.pixel_spacing, (0.0976, 0.0976, 0.3));
    assert_eq!(info.origin, (-25.0, -25.0, -18.0));
    assert_eq!(info.patient_name, "Smith^John");
    assert_eq!(info.patient_id, "12345");
    assert_eq!(info.exam_id, "77");
    assert_eq!(info.scan_date, "20010101");
    assert_eq!(info.manufacturer, "GE MEDICAL SYSTEMS");
    assert_eq!(info.patient_position, "HFS");
}

#[test]
fn image_info_defaults_for_empty_header() {
    let info = assemble::image_info(&header::parse(""));

    assert_eq!(info.dimensions, (512, 512, 1));
    assert_eq!(info.pixel_spacing, (1.0, 1.0, 1.0));
    assert_eq!(info.origin, (0.0, 0.0, 0.0));
    assert_eq!(info.patient_position, "HFS");
    assert_eq!(info.modality, "CT");
    assert_eq!(info.datatype, 1);
    assert_eq!(info.bytes_per_pixel, 2);
    assert!(info.patient_id.is_empty());
}
