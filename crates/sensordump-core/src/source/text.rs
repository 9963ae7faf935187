use std::fs;
use std::path::Path;

use super::SourceError;

/// Extract every decimal token (`-?\d+\.?\d*`) from free text, in order.
///
/// Anything between tokens is ignored, so brackets, commas and labels in
/// the dump do not matter. Exponents are not recognised: `1e5` yields the
/// tokens `1` and `5`.
///
/// # Examples
/// ```
/// use sensordump_core::source::parse_text_dump;
///
/// let values = parse_text_dump("[(1.0, -2.5), z=3.]");
/// assert_eq!(values, vec![1.0, -2.5, 3.0]);
/// ```
pub fn parse_text_dump(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let start = pos;
        let mut cursor = pos;
        if bytes[cursor] == b'-' {
            cursor += 1;
        }
        let digits_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor == digits_start {
            pos = start + 1;
            continue;
        }
        if cursor < bytes.len() && bytes[cursor] == b'.' {
            cursor += 1;
            while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                cursor += 1;
            }
        }
        // The token is ASCII digits with an optional sign and dot, so it always parses.
        if let Ok(value) = text[start..cursor].parse::<f64>() {
            values.push(value);
        }
        pos = cursor;
    }
    values
}

pub fn read_text_dump(path: &Path) -> Result<Vec<f64>, SourceError> {
    let text = fs::read_to_string(path)?;
    Ok(parse_text_dump(&text))
}
