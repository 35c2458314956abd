//! Core data structures for parsed Pinnacle files and the derived domain records.
//!
//! This module defines the fundamental types used throughout the library:
//! - Typed scalars produced by value coercion
//! - The flat header record and the hierarchical trial tree
//! - Structures and contours from the ROI file
//! - Flat records extracted from the trial tree (dose grid, prescription, beams)

use std::collections::HashMap;
use std::fmt;

/// A scalar parsed from a text token.
///
/// Produced by [`coerce_value`](crate::pinnacle::utils::coerce_value) and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl TypedValue {
    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Integer(i) => Some(*i as f64),
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of the value. Floats qualify only when they have no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(i) => Some(*i),
            TypedValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypedValue::Integer(i) => write!(f, "{}", i),
            TypedValue::Float(v) => write!(f, "{}", v),
            TypedValue::Boolean(b) => write!(f, "{}", b),
            TypedValue::Text(s) => f.write_str(s),
        }
    }
}

/// Flat `key -> value` mapping parsed from an image header file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderRecord {
    values: HashMap<String, TypedValue>,
}

impl HeaderRecord {
    pub(crate) fn insert(&mut self, key: String, value: TypedValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(TypedValue::as_f64).unwrap_or(default)
    }

    pub fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(TypedValue::as_i64).unwrap_or(default)
    }

    /// Text view of a value; numeric values are rendered, so `patient_id = 12345;`
    /// reads back as `"12345"`.
    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map(ToString::to_string)
            .unwrap_or_else(|| default.to_string())
    }
}

/// One slot of a [`ConfigNode`].
///
/// A key that opens a block more than once at the same scope is promoted from
/// `Node` to `Nodes` at insertion time, keeping first-occurrence order.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Value(TypedValue),
    Node(ConfigNode),
    Nodes(Vec<ConfigNode>),
}

impl Entry {
    pub fn as_value(&self) -> Option<&TypedValue> {
        match self {
            Entry::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The single node, or the first node of a repeated block.
    pub fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            Entry::Node(n) => Some(n),
            Entry::Nodes(nodes) => nodes.first(),
            Entry::Value(_) => None,
        }
    }

    /// Every node held by this entry, in file order. Empty for plain values.
    pub fn nodes(&self) -> &[ConfigNode] {
        match self {
            Entry::Node(n) => std::slice::from_ref(n),
            Entry::Nodes(nodes) => nodes,
            Entry::Value(_) => &[],
        }
    }
}

/// A scope of the hierarchical trial grammar.
///
/// Keys keep their first-insertion order so that lists such as `BeamList`
/// come back in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    entries: Vec<(String, Entry)>,
}

impl ConfigNode {
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn value(&self, key: &str) -> Option<&TypedValue> {
        self.get(key).and_then(Entry::as_value)
    }

    pub fn node(&self, key: &str) -> Option<&ConfigNode> {
        self.get(key).and_then(Entry::as_node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a dotted path such as `DoseGrid.VoxelSize.X`.
    ///
    /// Intermediate segments of a repeated block resolve to its first node.
    pub fn lookup(&self, path: &str) -> Option<&Entry> {
        let mut segments = path.split('.');
        let last = segments.next_back()?;
        let mut current = self;
        for segment in segments {
            current = current.node(segment)?;
        }
        current.get(last)
    }

    pub fn lookup_value(&self, path: &str) -> Option<&TypedValue> {
        self.lookup(path).and_then(Entry::as_value)
    }

    pub fn f64_at(&self, path: &str, default: f64) -> f64 {
        self.lookup_value(path).and_then(TypedValue::as_f64).unwrap_or(default)
    }

    pub fn i64_at(&self, path: &str, default: i64) -> i64 {
        self.lookup_value(path).and_then(TypedValue::as_i64).unwrap_or(default)
    }

    pub fn text_at(&self, path: &str, default: &str) -> String {
        self.lookup_value(path)
            .map(ToString::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Assigns a leaf. A repeated leaf overwrites the previous value.
    pub(crate) fn insert_value(&mut self, key: &str, value: TypedValue) {
        match self.position(key) {
            Some(idx) => self.entries[idx].1 = Entry::Value(value),
            None => self.entries.push((key.to_string(), Entry::Value(value))),
        }
    }

    /// Stores a parsed block, promoting a repeated key to a sequence.
    pub(crate) fn insert_node(&mut self, key: &str, node: ConfigNode) {
        let Some(idx) = self.position(key) else {
            self.entries.push((key.to_string(), Entry::Node(node)));
            return;
        };
        let slot = &mut self.entries[idx].1;
        let previous = std::mem::replace(slot, Entry::Nodes(Vec::new()));
        *slot = match previous {
            Entry::Nodes(mut nodes) => {
                nodes.push(node);
                Entry::Nodes(nodes)
            }
            Entry::Node(first) => Entry::Nodes(vec![first, node]),
            Entry::Value(_) => Entry::Node(node),
        };
    }

    /// Walks (creating as needed) the node for `key`, used for dotted paths.
    ///
    /// A repeated block resolves to its last node. Returns `None` when the key
    /// already holds a plain value.
    pub(crate) fn child_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        let idx = match self.position(key) {
            Some(idx) => idx,
            None => {
                self.entries
                    .push((key.to_string(), Entry::Node(ConfigNode::default())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[idx].1 {
            Entry::Node(node) => Some(node),
            Entry::Nodes(nodes) => nodes.last_mut(),
            Entry::Value(_) => None,
        }
    }
}

/// One contour of a structure: a closed polygon on a single axial plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub geometric_type: String,
    pub points: Vec<[f64; 3]>,
    /// Leaf properties of the `curve` block other than the point list.
    pub properties: HashMap<String, TypedValue>,
}

impl Contour {
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Points flattened as `x0, y0, z0, x1, ...`, the layout DICOM contour data uses.
    pub fn flattened(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| p.iter().copied()).collect()
    }
}

/// A named region of interest parsed from one ROI file section.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub name: String,
    pub color: String,
    pub contours: Vec<Contour>,
    pub properties: HashMap<String, TypedValue>,
}

/// Image geometry and identity read from the image header.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// `(x, y, z)` voxel counts.
    pub dimensions: (usize, usize, usize),
    /// `(x, y, z)` voxel spacing.
    pub pixel_spacing: (f64, f64, f64),
    pub origin: (f64, f64, f64),
    pub patient_position: String,
    pub modality: String,
    pub manufacturer: String,
    pub model: String,
    pub patient_name: String,
    pub patient_id: String,
    pub study_id: String,
    pub exam_id: String,
    pub scan_date: String,
    pub datatype: i64,
    pub bytes_per_pixel: i64,
}

/// Dose lattice geometry from `DoseGrid` in the trial file.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseGridInfo {
    pub voxel_size: (f64, f64, f64),
    /// `(x, y, z)` voxel counts.
    pub dimensions: (usize, usize, usize),
    pub origin: (f64, f64, f64),
}

impl Default for DoseGridInfo {
    fn default() -> Self {
        Self {
            voxel_size: (0.3, 0.3, 0.3),
            dimensions: (1, 1, 1),
            origin: (0.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionInfo {
    pub name: String,
    /// Prescribed dose in cGy.
    pub dose: f64,
    pub fractions: i64,
    pub percent: f64,
    pub method: String,
    pub point: String,
}

impl Default for PrescriptionInfo {
    fn default() -> Self {
        Self {
            name: "Prescription_1".to_string(),
            dose: 0.0,
            fractions: 1,
            percent: 100.0,
            method: "Prescribe".to_string(),
            point: "Isocenter".to_string(),
        }
    }
}

impl PrescriptionInfo {
    /// Prescribed dose converted from cGy to Gy.
    pub fn dose_gy(&self) -> f64 {
        self.dose / 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeamInfo {
    pub name: String,
    pub energy: f64,
    pub gantry_angle: f64,
    pub collimator_angle: f64,
    pub couch_angle: f64,
    pub monitor_units: f64,
    pub machine: String,
}

/// CT-to-density and patient volume references from `PatientRepresentation`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientRepresentation {
    pub volume_name: String,
    pub ct_to_density: String,
    pub ct_to_density_version: String,
    pub dm_table: String,
    pub dm_table_version: String,
}
