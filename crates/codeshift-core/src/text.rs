//! Text position utilities for byte offset to line:column conversions.
//!
//! Lines and columns are **1-indexed** (matching editor conventions);
//! byte offsets are **0-indexed**. Columns count Unicode scalar values,
//! not bytes, so positions are safe to show to users for non-ASCII source.

use crate::types::Location;

/// Convert a byte offset to 1-indexed line and column.
///
/// Columns count Unicode scalar values (chars), not bytes.
/// If `offset` exceeds the content length, returns the position at the
/// end of the content.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current = 0usize;

    for ch in content.chars() {
        if current >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current += ch.len_utf8();
    }

    (line, col)
}

/// The [`Location`] of a byte offset in `content`.
pub fn location_at(content: &str, offset: usize) -> Location {
    let (line, col) = byte_offset_to_position(content, offset);
    Location::new(line, col)
}

/// Byte offset of the beginning of 1-indexed line `n`.
///
/// Returns 0 for the first line and `content.len()` when `n` is past the
/// last line. Used for windowing source snippets in error rendering.
pub fn line_start_offset(content: &str, n: u32) -> usize {
    if n <= 1 {
        return 0;
    }
    content
        .match_indices('\n')
        .nth(n as usize - 2)
        .map(|(index, _)| index + 1)
        .unwrap_or(content.len())
}
