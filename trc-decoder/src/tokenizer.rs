//! Line tokenizer
//!
//! Trace lines are whitespace delimited. There is no quoting or escaping.

use std::borrow::Cow;

/// Comment sentinel of the trace format
pub const COMMENT: char = ';';

/// Split a raw line into tokens
///
/// Returns `None` for blank lines and comment lines, which carry no record.
pub fn tokenize(line: &str) -> Option<Vec<&str>> {
    let line = line.trim();

    if line.is_empty() || line.starts_with(COMMENT) {
        return None;
    }

    Some(line.split_whitespace().collect())
}

/// Decode raw line bytes
///
/// Trace files written on Windows may carry Windows-1252 comments, so bytes
/// that are not valid UTF-8 are read as Latin-1.
pub fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(line) => Cow::Borrowed(line),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}
