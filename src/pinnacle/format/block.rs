//! # Hierarchical Block Parsing
//!
//! The trial file nests scopes with braces and assigns leaves with `;`:
//!
//! ```text
//! Trial ={
//!   Name = "Plan A";
//!   DoseGrid .VoxelSize .X = 0.4;
//!   BeamList ={
//!     Beam ={
//!       Name = "AP";
//!       GantryAngle = 0;
//!     };
//!   };
//! };
//! ```
//!
//! The parser is a two-state machine over statement lines:
//! - **scan**: a `key = {` line opens a block; a `key = value;` line assigns a leaf;
//!   anything else is ignored.
//! - **in block**: lines are collected while the brace depth stays above zero. The
//!   collected slice is parsed recursively and stored under the block's key.
//!
//! Recursion always works on a bounded sub-slice of the caller's lines, so no
//! cursor is shared between levels. A block whose closing brace never arrives is
//! closed implicitly at end of input.

use log::{debug, info, trace, warn};

use crate::pinnacle::types::models::{ConfigNode, TypedValue};
use crate::pinnacle::utils::{self, coerce_value};

/// Classification of one statement line.
#[derive(Debug, PartialEq)]
enum Statement<'a> {
    /// `key = {`
    BlockStart(&'a str),
    /// `key = value;`
    Assignment(&'a str, &'a str),
    Other,
}

/// Parses hierarchical text into a [`ConfigNode`] tree. Never fails.
pub fn parse(content: &str) -> ConfigNode {
    let lines = utils::statement_lines(content);
    let node = parse_lines(&lines);
    info!("Block tree parsed: {} top-level keys from {} statements", node.len(), lines.len());
    node
}

fn parse_lines(lines: &[&str]) -> ConfigNode {
    let mut node = ConfigNode::default();
    let mut rest = lines;

    while let Some((&line, tail)) = rest.split_first() {
        rest = tail;
        match classify(line) {
            Statement::BlockStart(key) => {
                let (body, remaining) = take_block(rest, key);
                rest = remaining;
                let child = parse_lines(body);
                store_node(&mut node, key, child);
            }
            Statement::Assignment(key, raw) => {
                store_value(&mut node, key, coerce_value(raw));
            }
            Statement::Other => trace!("Ignoring line: {}", line),
        }
    }

    node
}

fn classify(line: &str) -> Statement<'_> {
    let Some((key, raw)) = line.split_once('=') else {
        return Statement::Other;
    };
    let key = key.trim();
    if key.is_empty() {
        return Statement::Other;
    }
    if line.ends_with('{') {
        Statement::BlockStart(key)
    } else if line.contains(';') {
        Statement::Assignment(key, utils::strip_terminator(raw))
    } else {
        Statement::Other
    }
}

/// Splits off the body of a block whose opening line was already consumed.
///
/// Returns `(body, remaining)`. The line that closes the block belongs to neither.
fn take_block<'a, 'b>(lines: &'b [&'a str], key: &str) -> (&'b [&'a str], &'b [&'a str]) {
    let mut depth: i64 = 1;
    for (idx, line) in lines.iter().enumerate() {
        depth += utils::brace_delta(line);
        if depth <= 0 {
            return (&lines[..idx], &lines[idx + 1..]);
        }
    }
    warn!("Block '{}' is not closed before end of input; closing it implicitly", key);
    (lines, &[])
}

/// Walks the dotted prefix of `key`, creating intermediate scopes.
///
/// Returns the scope the last segment belongs in, or `None` when a prefix
/// segment already holds a plain value.
fn scope_for<'n, 'k>(node: &'n mut ConfigNode, key: &'k str) -> Option<(&'n mut ConfigNode, &'k str)> {
    let mut segments: Vec<&str> = key.split('.').map(str::trim).collect();
    let last = segments.pop()?;
    let mut current = node;
    for segment in segments {
        current = current.child_mut(segment)?;
    }
    Some((current, last))
}

fn store_value(node: &mut ConfigNode, key: &str, value: TypedValue) {
    match scope_for(node, key) {
        Some((scope, leaf)) => scope.insert_value(leaf, value),
        None => debug!("Cannot assign '{}': a prefix of the path is a plain value", key),
    }
}

fn store_node(node: &mut ConfigNode, key: &str, child: ConfigNode) {
    match scope_for(node, key) {
        Some((scope, leaf)) => scope.insert_node(leaf, child),
        None => debug!("Cannot store block '{}': a prefix of the path is a plain value", key),
    }
}
