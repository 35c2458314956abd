//! Custom error types for the pinnacle-reader crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Variants fall into two families:
/// - format errors: the input exists but cannot be read or does not match its metadata
/// - missing input: a conversion step was requested without the file it needs
///
/// Partial data (absent dose slices, empty prescription lists, structures without
/// contours) is never reported through this type.
#[derive(Debug, Error)]
pub enum PinnacleError {
    /// A file could not be opened or read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the candidate text encodings could decode the file.
    #[error("Could not decode {} with any of: {tried}", .path.display())]
    Undecodable { path: PathBuf, tried: String },

    /// A binary buffer is shorter (or longer) than its metadata requires.
    #[error("Size mismatch for {context} in {}: expected {expected} bytes, but found {found} bytes", .path.display())]
    SizeMismatch {
        context: &'static str,
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    /// Declared dimensions are inconsistent with the data they describe.
    #[error("Dimension mismatch for {context}: expected {expected}, but found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// A step was requested whose input file was never supplied.
    #[error("Missing input: no {0} was provided")]
    MissingInput(&'static str),
}

impl PinnacleError {
    /// True for errors caused by unreadable, undecodable or inconsistent input.
    pub fn is_format_error(&self) -> bool {
        !self.is_missing_input()
    }

    /// True when the failing step lacked a required input file.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, PinnacleError::MissingInput(_))
    }
}

/// A convenience `Result` type alias using the crate's `PinnacleError` type.
pub type Result<T> = std::result::Result<T, PinnacleError>;
