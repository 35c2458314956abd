//! Low-level helpers shared by the text parsers and the file readers.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use encoding_rs::Encoding;
use log::{debug, trace};

use super::types::error::{PinnacleError, Result};
use super::types::models::TypedValue;

/// Encodings tried, in order, when decoding a text file.
///
/// `latin1`, `cp1252` and `iso-8859-1` all resolve to windows-1252 in the
/// WHATWG registry.
pub const TEXT_ENCODING_LABELS: &[&str] = &["utf-8", "latin1", "cp1252", "iso-8859-1"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Converts a raw token into a typed scalar. Never fails.
///
/// Rules, in order:
/// 1. `"quoted"` → Text without the quotes
/// 2. only digits once `.`, `-`, `e`, `E`, `+` are removed → Float if the token
///    contains `.`, `e` or `E`, otherwise Integer
/// 3. `true` / `false` (any case) → Boolean
/// 4. anything else → Text
///
/// A token with numeric shape that does not parse (`1.2.3`, `5-3`, an integer
/// wider than 64 bits) falls back to Text holding the raw token.
pub fn coerce_value(token: &str) -> TypedValue {
    let token = token.trim();

    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        return TypedValue::Text(token[1..token.len() - 1].to_string());
    }

    if has_numeric_shape(token) {
        let parsed = if token.contains(['.', 'e', 'E']) {
            token.parse::<f64>().ok().map(TypedValue::Float)
        } else {
            token.parse::<i64>().ok().map(TypedValue::Integer)
        };
        return parsed.unwrap_or_else(|| {
            trace!("Numeric-looking token '{}' did not parse; keeping it as text", token);
            TypedValue::Text(token.to_string())
        });
    }

    match token.to_ascii_lowercase().as_str() {
        "true" => TypedValue::Boolean(true),
        "false" => TypedValue::Boolean(false),
        _ => TypedValue::Text(token.to_string()),
    }
}

fn has_numeric_shape(token: &str) -> bool {
    let mut rest = token
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | 'e' | 'E' | '+'))
        .peekable();
    rest.peek().is_some() && rest.all(|c| c.is_ascii_digit())
}

/// Resolves an encoding label, falling back to UTF-8 for unknown labels.
pub fn parse_encoding(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or(encoding_rs::UTF_8)
}

/// Decodes `bytes` with the first encoding from [`TEXT_ENCODING_LABELS`] that
/// accepts them without replacement characters.
pub fn decode_text(bytes: &[u8], path: &Path) -> Result<(String, &'static Encoding)> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    for label in TEXT_ENCODING_LABELS {
        let encoding = parse_encoding(label);
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!("Decoded {} as {}", path.display(), encoding.name());
            return Ok((text.into_owned(), encoding));
        }
        trace!("{} is not valid {}", path.display(), label);
    }
    Err(PinnacleError::Undecodable {
        path: path.to_path_buf(),
        tried: TEXT_ENCODING_LABELS.join(", "),
    })
}

/// Reads a whole file into memory; the handle is closed before returning.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| PinnacleError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_file`], but an absent file is `Ok(None)` rather than an error.
pub fn read_optional_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PinnacleError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads and decodes a text file.
pub fn read_text(path: &Path) -> Result<(String, &'static Encoding)> {
    let bytes = read_file(path)?;
    decode_text(&bytes, path)
}

/// Splits text into trimmed statement lines with whole-line `//` comments removed.
///
/// Several statements packed on one physical line are separated (see
/// [`split_statements`]), so `a=1;b=2;` yields two lines.
pub(crate) fn statement_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .flat_map(split_statements)
        .filter(|line| !line.starts_with("//"))
        .collect()
}

/// Breaks one physical line after every `;` and after every `{` that opens a
/// nested assignment. Quoted text is never split, and a `//` comment ends the line.
pub(crate) fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '/' if line[i..].starts_with("//") => {
                push_trimmed(&mut statements, &line[start..i]);
                start = i;
                break;
            }
            ';' => {
                push_trimmed(&mut statements, &line[start..=i]);
                start = i + 1;
            }
            '{' if opens_nested_assignment(&line[i + 1..]) => {
                push_trimmed(&mut statements, &line[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_trimmed(&mut statements, &line[start..]);
    statements
}

/// A `{` opens a nested scope when an `=` follows before the next `;` or `}`.
/// `Color = {1,2,3};` stays a single leaf.
fn opens_nested_assignment(rest: &str) -> bool {
    let end = rest.find([';', '}']).unwrap_or(rest.len());
    rest[..end].contains('=')
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, segment: &'a str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        out.push(segment);
    }
}

/// Net change in brace depth over a line, ignoring braces inside quotes.
pub(crate) fn brace_delta(line: &str) -> i64 {
    let mut in_quotes = false;
    let mut delta = 0;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => delta += 1,
            '}' if !in_quotes => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Strips one trailing `;` terminator and surrounding whitespace from a raw value.
pub(crate) fn strip_terminator(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_suffix(';').unwrap_or(raw).trim_end()
}
