use pinnacle_reader::pinnacle::utils::{coerce_value, decode_text};
use pinnacle_reader::{ElementKind, TypedValue};
use rstest::rstest;
use std::path::Path;

#[rstest]
#[case("\"hello world\"", TypedValue::Text("hello world".into()))]
#[case("\"42\"", TypedValue::Text("42".into()))]
#[case("\"\"", TypedValue::Text(String::new()))]
#[case("42", TypedValue::Integer(42))]
#[case("-7", TypedValue::Integer(-7))]
#[case("  512  ", TypedValue::Integer(512))]
#[case("3.25", TypedValue::Float(3.25))]
#[case("-0.5", TypedValue::Float(-0.5))]
#[case("1e3", TypedValue::Float(1000.0))]
#[case("1.5E-2", TypedValue::Float(0.015))]
#[case("true", TypedValue::Boolean(true))]
#[case("FALSE", TypedValue::Boolean(false))]
#[case("True", TypedValue::Boolean(true))]
#[case("HFS", TypedValue::Text("HFS".into()))]
#[case("Smith^John", TypedValue::Text("Smith^John".into()))]
#[case("", TypedValue::Text(String::new()))]
#[case("-", TypedValue::Text("-".into()))]
#[case("e", TypedValue::Text("e".into()))]
fn coerces_by_token_shape(#[case] token: &str, #[case] expected: TypedValue) {
    assert_eq!(coerce_value(token), expected);
}

#[rstest]
#[case("1.2.3")]
#[case("10.0.17763")]
#[case("5-3")]
#[case("99999999999999999999999")]
fn numeric_shape_that_does_not_parse_stays_text(#[case] token: &str) {
    assert_eq!(coerce_value(token), TypedValue::Text(token.to_string()));
}

#[test]
fn typed_value_views() {
    assert_eq!(TypedValue::Integer(3).as_f64(), Some(3.0));
    assert_eq!(TypedValue::Float(4.0).as_i64(), Some(4));
    assert_eq!(TypedValue::Float(4.5).as_i64(), None);
    assert_eq!(TypedValue::Text("x".into()).as_f64(), None);
    assert_eq!(TypedValue::Boolean(true).as_bool(), Some(true));
    assert_eq!(TypedValue::Text("CT".into()).as_text(), Some("CT"));
    assert_eq!(TypedValue::Float(0.25).to_string(), "0.25");
    assert_eq!(TypedValue::Integer(12345).to_string(), "12345");
}

#[rstest]
#[case(1, 2, ElementKind::Int16)]
#[case(1, 1, ElementKind::Int8)]
#[case(2, 4, ElementKind::Float32)]
#[case(2, 2, ElementKind::Float32)]
#[case(0, 2, ElementKind::Int16)]
#[case(1, 4, ElementKind::Int16)]
#[case(7, 7, ElementKind::Int16)]
fn element_kind_from_header_codes(#[case] datatype: i64, #[case] bytes_pix: i64, #[case] expected: ElementKind) {
    assert_eq!(ElementKind::from_codes(datatype, bytes_pix), expected);
}

#[test]
fn decode_prefers_utf8_and_falls_back_to_single_byte() {
    let (text, encoding) = decode_text("Name = \"Müller\";".as_bytes(), Path::new("a.Trial")).unwrap();
    assert_eq!(encoding, encoding_rs::UTF_8);
    assert!(text.contains("Müller"));

    let latin = b"Name = \"M\xfcller\";";
    let (text, encoding) = decode_text(latin, Path::new("b.Trial")).unwrap();
    assert_eq!(encoding, encoding_rs::WINDOWS_1252);
    assert!(text.contains("Müller"));
}

#[test]
fn decode_strips_utf8_bom() {
    let (text, _) = decode_text(b"\xEF\xBB\xBFx_dim = 1;", Path::new("h.header")).unwrap();
    assert_eq!(text, "x_dim = 1;");
}
