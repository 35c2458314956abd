//! Flat image header parsing.
//!
//! An image header is a sequence of `key = value;` lines with `//` comments:
//!
//! ```text
//! x_dim = 512;
//! x_pixdim = 0.0976;
//! db_name = "Smith^John";
//! date = :20010101
//! ```
//!
//! A value introduced by a colon (`key = :TEXT`) is always text, whatever it
//! looks like. Lines without `=` are skipped.

use log::{info, trace};

use crate::pinnacle::types::models::{HeaderRecord, TypedValue};
use crate::pinnacle::utils::{self, coerce_value};

/// Parses header text into a [`HeaderRecord`]. Malformed lines are skipped.
pub fn parse(content: &str) -> HeaderRecord {
    let mut record = HeaderRecord::default();

    for line in utils::statement_lines(content) {
        let Some((key, raw)) = line.split_once('=') else {
            trace!("Skipping header line without '=': {}", line);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let raw = utils::strip_terminator(raw);
        let value = match raw.strip_prefix(':') {
            Some(text) => TypedValue::Text(text.trim().to_string()),
            None => coerce_value(raw),
        };
        trace!("Header {} = {:?}", key, value);
        record.insert(key.to_string(), value);
    }

    info!("Header parsed: {} keys", record.len());
    record
}
