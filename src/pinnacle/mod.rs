//! Core Pinnacle export reader module
//!
//! ```text
//! header ─┐
//! volume ─┼─ readers ── assemble ── ConversionBundle
//! roi ────┤
//! trial ──┘ (+ dose slices)
//! ```

pub mod assemble;
pub mod dataset;
pub mod format;
pub mod reader;
pub mod types;
pub mod utils;

pub use dataset::{Dataset, DatasetPaths};
