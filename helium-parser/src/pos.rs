// helium-parser - Source positions for Helium
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Source positions.
//!
//! A [`Position`] is a cursor into one source file. Lines and columns are
//! zero-based internally and rendered one-based in diagnostics.

use smol_str::SmolStr;

/// A location in a source file.
///
/// `line_offset` is the byte offset of the first character of the current
/// line, which lets diagnostics slice the offending line back out of the
/// source without re-scanning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Zero-based line number.
    pub line: u32,
    /// Zero-based column number (bytes from the start of the line).
    pub column: u32,
    /// Byte offset from the start of the source.
    pub char_offset: u32,
    /// Byte offset of the first character of the current line.
    pub line_offset: u32,
    /// Name of the source this position points into, for diagnostics.
    pub origin: SmolStr,
}

impl Position {
    /// Position of the first character of a source.
    pub fn start(origin: &str) -> Self {
        Position {
            line: 0,
            column: 0,
            char_offset: 0,
            line_offset: 0,
            origin: SmolStr::new(origin),
        }
    }
}
