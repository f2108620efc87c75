// helium-parser - Diagnostic rendering for Helium
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Caret diagnostics shared by every pipeline stage.
//!
//! All errors render in the same shape:
//!
//! ```text
//! [err] undefined symbol 'foo' (3, 6) in demo.he:
//!     |
//!     | 0003 x <- foo
//!     | ~~~~~~~~~~^
//! ```

use std::fmt;

use crate::pos::Position;

/// Slice the line starting at `line_offset` out of `source`, without the
/// trailing newline.
pub fn line_at(source: &str, line_offset: u32) -> String {
    source
        .get(line_offset as usize..)
        .and_then(|rest| rest.lines().next())
        .unwrap_or("")
        .to_string()
}

/// Write the standard error block: header, quoted line, caret.
///
/// Lines and columns display one-based; the caret line pads `5 + column`
/// tildes so the caret lands under the offending character in the quoted
/// line (which is prefixed by a four-digit line number and a space).
pub fn write_diagnostic(
    f: &mut fmt::Formatter<'_>,
    message: &str,
    pos: &Position,
    line_text: &str,
) -> fmt::Result {
    writeln!(
        f,
        "[err] {} ({}, {}) in {}:",
        message,
        pos.line + 1,
        pos.column + 1,
        pos.origin
    )?;
    writeln!(f, "\t|")?;
    writeln!(f, "\t| {:04} {}", pos.line + 1, line_text)?;
    write!(f, "\t| {}^", "~".repeat(5 + pos.column as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_at() {
        let source = "first\nsecond\nthird";
        assert_eq!(line_at(source, 0), "first");
        assert_eq!(line_at(source, 6), "second");
        assert_eq!(line_at(source, 13), "third");
    }

    #[test]
    fn test_line_at_out_of_range() {
        assert_eq!(line_at("abc", 99), "");
    }
}
