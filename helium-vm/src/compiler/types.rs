// helium-vm - Bytecode model and compiler for the Helium scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiler error and scope types.

use std::fmt;

use helium_parser::lexer::LexError;
use helium_parser::parser::ParseError;
use helium_parser::pos::Position;
use helium_parser::report;

/// Which load/store opcode a resolved name uses.
///
/// `Local` is a slot in the current program, `Closed` a slot captured from
/// an enclosing function, `Global` a slot in the top-level program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeClass {
    Local,
    Closed,
    Global,
}

/// Compile error with position information.
///
/// Lex and parse errors raised while compiling an `include` convert into
/// this type, keeping the included file's position.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub pos: Position,
    pub line_text: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        report::write_diagnostic(f, &self.message, &self.pos, &self.line_text)
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError {
            message: e.message,
            pos: e.pos,
            line_text: e.line_text,
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError {
            message: e.message,
            pos: e.pos,
            line_text: e.line_text,
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
