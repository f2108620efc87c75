// helium-vm - Bytecode model and compiler for the Helium scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Helium AST to bytecode.
//!
//! Single pass: scope resolution happens while instructions are emitted,
//! against a stack of program frames.

pub mod codegen;
pub mod types;

pub use codegen::{Compiler, compile_source, compile_source_with};
pub use types::{CompileError, Result, ScopeClass};
