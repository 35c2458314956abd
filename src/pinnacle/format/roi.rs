//! ROI (structure set) file parsing.
//!
//! A `.roi` file is a preamble followed by one section per structure:
//!
//! ```text
//! //-----------------------------------------------------
//! //  Beginning of ROI: GTV
//! //-----------------------------------------------------
//!
//! roi={
//!   name: GTV
//!   color: red
//!   curve={
//!     num_points = 3;
//!     points={
//!       1.0 2.0 3.0
//!       ...
//!     };  // End of points
//!   }; // End of curve 1
//! }; // End of roi GTV
//! ```
//!
//! Properties use either `key: value` or `key = value;`. Every `curve` block
//! becomes one [`Contour`]; the coordinates inside its `points` block are read
//! as whitespace-separated triplets.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::{debug, info, trace};
use regex::Regex;

use crate::pinnacle::types::models::{Contour, Structure, TypedValue};
use crate::pinnacle::utils::{self, coerce_value};

/// Colour assumed for a structure whose `roi` block names none.
pub const DEFAULT_COLOR: &str = "red";

/// Geometric type recorded for every parsed contour.
pub const CLOSED_PLANAR: &str = "CLOSED_PLANAR";

/// Dashed separator used to find the structure name on a section's first line.
const NAME_SEPARATOR: &str = "//-----";

static SECTION_PATTERN: OnceLock<Regex> = OnceLock::new();
static ROI_BLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();
static CURVE_PATTERN: OnceLock<Regex> = OnceLock::new();
static POINTS_PATTERN: OnceLock<Regex> = OnceLock::new();
static TRIPLET_PATTERN: OnceLock<Regex> = OnceLock::new();

fn section_regex() -> &'static Regex {
    SECTION_PATTERN.get_or_init(|| {
        Regex::new(r"//-{3,}\s*//\s*Beginning of ROI:").expect("Invalid ROI section regex pattern")
    })
}

fn roi_block_regex() -> &'static Regex {
    ROI_BLOCK_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)roi\s*=\s*\{(.*?)\};\s*//\s*End of roi").expect("Invalid roi block regex pattern")
    })
}

fn curve_regex() -> &'static Regex {
    CURVE_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)curve\s*=\s*\{(.*?)\};\s*//\s*End of curve").expect("Invalid curve regex pattern")
    })
}

fn points_regex() -> &'static Regex {
    POINTS_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)points\s*=\s*\{(.*?)\};").expect("Invalid points regex pattern")
    })
}

fn triplet_regex() -> &'static Regex {
    TRIPLET_PATTERN.get_or_init(|| {
        Regex::new(r"(-?\d+\.?\d*)\s+(-?\d+\.?\d*)\s+(-?\d+\.?\d*)").expect("Invalid point triplet regex pattern")
    })
}

/// Parses every structure in an ROI file, in file order.
///
/// The number of structures equals the number of `Beginning of ROI:` markers;
/// text before the first marker is discarded.
pub fn parse(content: &str) -> Vec<Structure> {
    let structures: Vec<Structure> = section_regex()
        .split(content)
        .skip(1)
        .enumerate()
        .map(|(idx, section)| parse_section(section, idx + 1))
        .collect();

    info!(
        "ROI file parsed: {} structures, {} contours",
        structures.len(),
        structures.iter().map(|s| s.contours.len()).sum::<usize>()
    );
    structures
}

/// Parses one section. `number` (1-based) only feeds the fallback name.
fn parse_section(section: &str, number: usize) -> Structure {
    let marker_name = section.lines().next().and_then(name_from_marker_line);

    let properties = roi_block_regex()
        .captures(section)
        .and_then(|caps| caps.get(1))
        .map(|body| parse_roi_properties(body.as_str()))
        .unwrap_or_else(|| {
            debug!("ROI section {} has no terminated roi block", number);
            HashMap::new()
        });

    let name = properties
        .get("name")
        .map(ToString::to_string)
        .or(marker_name)
        .unwrap_or_else(|| format!("ROI_{}", number));
    let color = properties
        .get("color")
        .map(ToString::to_string)
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());

    let contours: Vec<Contour> = curve_regex()
        .captures_iter(section)
        .filter_map(|caps| caps.get(1))
        .map(|body| parse_curve(body.as_str()))
        .collect();

    debug!("Structure '{}': {} contours", name, contours.len());

    Structure {
        name,
        color,
        contours,
        properties,
    }
}

/// Text before the dashed separator, or the whole line when there is none.
fn name_from_marker_line(line: &str) -> Option<String> {
    let name = line.split(NAME_SEPARATOR).next().unwrap_or_default().trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Reads `key: value` and `key = value;` lines at the top level of a `roi` block.
///
/// Lines inside nested blocks (`curve`, `points`) are skipped.
fn parse_roi_properties(block: &str) -> HashMap<String, TypedValue> {
    let mut properties = HashMap::new();
    let mut depth: i64 = 0;

    for line in block.lines().map(str::trim) {
        if depth == 0 && !line.starts_with("//") && !line.ends_with('{') {
            if let Some((key, value)) = split_property(line) {
                properties.insert(key.to_string(), coerce_value(value));
            }
        }
        depth += utils::brace_delta(line);
    }

    properties
}

/// Splits on `:` when present, otherwise on `=`.
fn split_property(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':').or_else(|| line.split_once('='))?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key, utils::strip_terminator(value)))
}

/// Parses one `curve` block into a contour.
fn parse_curve(block: &str) -> Contour {
    let mut properties = HashMap::new();
    for line in block.lines().map(str::trim) {
        if line.starts_with("//") || line.contains("points") || line.ends_with('{') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                properties.insert(key.to_string(), coerce_value(utils::strip_terminator(value)));
            }
        }
    }

    let points = points_regex()
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|body| parse_points(body.as_str()))
        .unwrap_or_default();
    trace!("Curve with {} points", points.len());

    Contour {
        geometric_type: CLOSED_PLANAR.to_string(),
        points,
        properties,
    }
}

/// Extracts whitespace-separated `x y z` triplets in encounter order.
fn parse_points(body: &str) -> Vec<[f64; 3]> {
    triplet_regex()
        .captures_iter(body)
        .filter_map(|caps| {
            let x = caps[1].parse::<f64>().ok()?;
            let y = caps[2].parse::<f64>().ok()?;
            let z = caps[3].parse::<f64>().ok()?;
            Some([x, y, z])
        })
        .collect()
}
