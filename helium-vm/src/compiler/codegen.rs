// helium-vm - Bytecode model and compiler for the Helium scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: lowers the syntax tree to bytecode.
//!
//! The compiler walks statements in source order, emitting instructions
//! into the innermost of a stack of program frames. Pushing a frame starts
//! a nested function body; name resolution walks the frame stack instead of
//! chasing parent pointers, so finished programs carry no back-references.
//! Forward jumps are emitted with a zero placeholder and patched inside the
//! construct that produced them.

use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use log::debug;
use smol_str::SmolStr;

use helium_parser::ast::{AstKind, AstNode};
use helium_parser::lexer::lexify;
use helium_parser::parser::Parser;
use helium_parser::pos::Position;
use helium_parser::report;

use crate::opcode::{Instruction, Op};
use crate::program::Program;
use crate::value::Value;

use super::types::{CompileError, Result, ScopeClass};

/// Run the full pipeline over a source text and return the compiled
/// top-level program.
pub fn compile_source(source: &str, origin: &str) -> Result<Program> {
    compile_source_with(Program::new(), source, origin)
}

/// Like [`compile_source`], but compiling into a pre-seeded program so
/// hosts can register natives before user code is compiled.
pub fn compile_source_with(program: Program, source: &str, origin: &str) -> Result<Program> {
    let tokens = lexify(source, origin)?;
    debug!("lexed {} tokens from {}", tokens.len(), origin);

    let block = Parser::parse(&tokens, source)?;
    Compiler::with_program(program, source, origin).compile(&block)
}

/// The bytecode compiler.
pub struct Compiler {
    /// Program frames, innermost last. The first frame is the top level and
    /// is never popped; its locals are the globals of nested functions.
    frames: Vec<Program>,

    /// Source text per origin, for quoting offending lines in errors
    /// raised inside included files.
    sources: HashMap<SmolStr, String>,
}

impl Compiler {
    pub fn new(source: &str, origin: &str) -> Self {
        Compiler::with_program(Program::new(), source, origin)
    }

    pub fn with_program(program: Program, source: &str, origin: &str) -> Self {
        let mut sources = HashMap::new();
        sources.insert(SmolStr::new(origin), source.to_string());
        Compiler {
            frames: vec![program],
            sources,
        }
    }

    /// Compile a statement block into the top-level program and return it.
    pub fn compile(mut self, block: &AstNode) -> Result<Program> {
        self.compile_block(block)?;

        let program = self.frames.pop().unwrap();
        debug!(
            "compiled {} instructions, {} constants",
            program.code.len(),
            program.constants.len()
        );
        Ok(program)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_block(&mut self, block: &AstNode) -> Result<()> {
        for statement in &block.children {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &AstNode) -> Result<()> {
        self.frame().record_line(statement.pos.line);

        match statement.kind {
            AstKind::Assign => self.compile_assignment(statement),
            AstKind::Put => {
                self.compile_table_put(statement)?;
                // TPut leaves the table on the stack; a statement discards it.
                self.emit(Instruction::stack(Op::Pop));
                Ok(())
            }
            AstKind::Loop => self.compile_loop(statement),
            AstKind::Branches => self.compile_branches(statement),
            AstKind::Return => self.compile_return(statement),
            AstKind::Include => self.compile_include(statement),
            _ => {
                // Expression statement (a call or a bare function
                // definition): compile and discard the result.
                self.compile_expression(statement)?;
                self.emit(Instruction::stack(Op::Pop));
                Ok(())
            }
        }
    }

    fn compile_assignment(&mut self, node: &AstNode) -> Result<()> {
        self.compile_expression(&node.children[0])?;
        let (slot, scope) = self.register_variable(&node.value, &node.pos)?;
        self.emit(Instruction::unsigned(store_op(scope), slot));
        Ok(())
    }

    fn compile_loop(&mut self, node: &AstNode) -> Result<()> {
        let start = self.next_index();
        self.compile_expression(&node.children[0])?;

        let exit = self.emit(Instruction::signed(Op::Jif, 0));
        self.compile_block(&node.children[1])?;

        let back = self.jump_target(start, &node.pos)?;
        self.emit(Instruction::signed(Op::Jmp, back));

        let end = self.jump_target(self.next_index(), &node.pos)?;
        self.frame().patch(exit, Instruction::signed(Op::Jif, end));
        Ok(())
    }

    fn compile_branches(&mut self, node: &AstNode) -> Result<()> {
        let mut end_jumps = Vec::new();
        let mut branch = Some(node);

        while let Some(current) = branch {
            if current.value == "alt" {
                self.compile_block(&current.children[0])?;
                branch = None;
            } else {
                self.compile_expression(&current.children[0])?;
                let next = self.emit(Instruction::signed(Op::Jif, 0));

                self.compile_block(&current.children[1])?;
                end_jumps.push(self.emit(Instruction::signed(Op::Jmp, 0)));

                let target = self.jump_target(self.next_index(), &current.pos)?;
                self.frame().patch(next, Instruction::signed(Op::Jif, target));

                branch = current.children.get(2);
            }
        }

        let end = self.jump_target(self.next_index(), &node.pos)?;
        for jump in end_jumps {
            self.frame().patch(jump, Instruction::signed(Op::Jmp, end));
        }
        Ok(())
    }

    fn compile_return(&mut self, node: &AstNode) -> Result<()> {
        self.compile_expression(&node.children[0])?;
        self.emit(Instruction::stack(Op::Ret));
        Ok(())
    }

    /// Compile-time inclusion: read the file, re-enter the pipeline and
    /// compile its top-level statements into the current program.
    fn compile_include(&mut self, node: &AstNode) -> Result<()> {
        let path = &node.children[0];
        if path.kind != AstKind::String {
            return Err(self.error(&node.pos, "include expects a string path"));
        }

        let source = fs::read_to_string(path.value.as_str()).map_err(|e| {
            self.error(
                &path.pos,
                format!("failed to read include '{}': {}", path.value, e),
            )
        })?;

        debug!("including '{}'", path.value);
        let tokens = lexify(&source, path.value.as_str())?;
        let block = Parser::parse(&tokens, &source)?;

        // Register the text before compiling so errors inside the included
        // file can quote their line.
        self.sources.insert(path.value.clone(), source);
        self.compile_block(&block)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expression(&mut self, node: &AstNode) -> Result<()> {
        match node.kind {
            AstKind::Integer => {
                let parsed: i64 = node.value.parse().map_err(|_| {
                    self.error(&node.pos, format!("invalid integer literal '{}'", node.value))
                })?;
                let key = format!("i:{}", node.value);
                let constant = self.constant(&node.pos, &key, Value::Int(parsed))?;
                self.emit(Instruction::unsigned(Op::PushK, constant));
            }

            AstKind::Float => {
                let parsed: f64 = node.value.parse().map_err(|_| {
                    self.error(&node.pos, format!("invalid float literal '{}'", node.value))
                })?;
                let key = format!("f:{}", node.value);
                let constant = self.constant(&node.pos, &key, Value::Float(parsed))?;
                self.emit(Instruction::unsigned(Op::PushK, constant));
            }

            AstKind::Bool => {
                let key = format!("b:{}", node.value);
                let value = Value::Bool(node.value == "true");
                let constant = self.constant(&node.pos, &key, value)?;
                self.emit(Instruction::unsigned(Op::PushK, constant));
            }

            AstKind::String => {
                let key = format!("s:{}", node.value);
                let value = Value::Str(node.value.clone());
                let constant = self.constant(&node.pos, &key, value)?;
                self.emit(Instruction::unsigned(Op::PushK, constant));
            }

            AstKind::Null => {
                let constant = self.constant(&node.pos, "n:null", Value::Null)?;
                self.emit(Instruction::unsigned(Op::PushK, constant));
            }

            AstKind::Reference => {
                let (slot, scope) = self.dereference_variable(&node.value, &node.pos)?;
                self.emit(Instruction::unsigned(load_op(scope), slot));
            }

            AstKind::UnaryExpr => self.compile_unary(node)?,
            AstKind::BinaryExpr => self.compile_binary(node)?,
            AstKind::Call => self.compile_call(node)?,
            AstKind::Function => self.compile_function(node)?,
            AstKind::Table => self.compile_table(node)?,
            AstKind::Get => self.compile_table_get(node)?,

            _ => return Err(self.error(&node.pos, "expression expected")),
        }
        Ok(())
    }

    fn compile_unary(&mut self, node: &AstNode) -> Result<()> {
        match node.value.as_str() {
            // Unary plus is a no-op.
            "+" => self.compile_expression(&node.children[0]),
            "-" => {
                self.compile_expression(&node.children[0])?;
                self.emit(Instruction::stack(Op::Neg));
                Ok(())
            }
            "!" => {
                self.compile_expression(&node.children[0])?;
                self.emit(Instruction::stack(Op::Not));
                Ok(())
            }
            other => Err(self.error(
                &node.pos,
                format!("operator '{}' is not supported", other),
            )),
        }
    }

    fn compile_binary(&mut self, node: &AstNode) -> Result<()> {
        self.compile_expression(&node.children[0])?;
        self.compile_expression(&node.children[1])?;

        let op = match node.value.as_str() {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "%" => Op::Mod,
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "&" | "&&" => Op::And,
            "|" | "||" => Op::Or,
            other => {
                return Err(self.error(
                    &node.pos,
                    format!("operator '{}' is not supported", other),
                ))
            }
        };

        self.emit(Instruction::stack(op));
        Ok(())
    }

    fn compile_call(&mut self, node: &AstNode) -> Result<()> {
        // Callee first, then arguments left to right.
        self.compile_expression(&node.children[0])?;

        let argc = node.children.len() - 1;
        let argc = u16::try_from(argc)
            .map_err(|_| self.error(&node.pos, "too many call arguments"))?;

        for argument in &node.children[1..] {
            self.compile_expression(argument)?;
        }

        self.emit(Instruction::unsigned(Op::Call, argc));
        Ok(())
    }

    /// Compile a function definition into a child program, append it to the
    /// current constant pool and emit the closure construction.
    fn compile_function(&mut self, node: &AstNode) -> Result<()> {
        let params = &node.children[0];
        let body = &node.children[1];

        self.frames.push(Program::with_argc(params.children.len()));
        for param in &params.children {
            self.register_unique_variable_local(&param.value, &param.pos)?;
        }

        self.compile_block(body)?;

        // Falling off the end of a body returns null.
        let null = self.constant(&node.pos, "n:null", Value::Null)?;
        self.emit(Instruction::unsigned(Op::PushK, null));
        self.emit(Instruction::stack(Op::Ret));

        let child = self.frames.pop().unwrap();
        let closed = child.closure_table.len() as u16;

        let constant = self
            .frame()
            .add_program_constant(Value::Program(Rc::new(child)));
        let constant =
            constant.ok_or_else(|| self.error(&node.pos, "too many constants in program"))?;

        self.emit(Instruction::unsigned(Op::PushK, constant));
        self.emit(Instruction::unsigned(Op::Close, closed));
        Ok(())
    }

    fn compile_table(&mut self, node: &AstNode) -> Result<()> {
        self.emit(Instruction::stack(Op::TNew));

        // Each TPut consumes (table, key, value) and leaves the table for
        // the next entry.
        for pair in &node.children {
            self.compile_expression(&pair.children[0])?;
            self.compile_expression(&pair.children[1])?;
            self.emit(Instruction::stack(Op::TPut));
        }
        Ok(())
    }

    fn compile_table_put(&mut self, node: &AstNode) -> Result<()> {
        let (slot, scope) = self.dereference_variable(&node.value, &node.pos)?;
        self.emit(Instruction::unsigned(load_op(scope), slot));

        self.compile_expression(&node.children[0])?;
        self.compile_expression(&node.children[1])?;
        self.emit(Instruction::stack(Op::TPut));
        Ok(())
    }

    fn compile_table_get(&mut self, node: &AstNode) -> Result<()> {
        let (slot, scope) = self.dereference_variable(&node.value, &node.pos)?;
        self.emit(Instruction::unsigned(load_op(scope), slot));

        self.compile_expression(&node.children[0])?;
        self.emit(Instruction::stack(Op::TGet));
        Ok(())
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Resolve a reference. Checks the current frame's locals and captures,
    /// then enclosing function frames (allocating a closed slot on a hit),
    /// then the top-level program's locals.
    fn dereference_variable(&mut self, name: &str, pos: &Position) -> Result<(u16, ScopeClass)> {
        let current = self.frames.len() - 1;

        if let Some(slot) = self.frames[current].lookup_symbol(name) {
            return Ok((slot, ScopeClass::Local));
        }
        if let Some(slot) = self.frames[current].lookup_closed(name) {
            return Ok((slot, ScopeClass::Closed));
        }

        // Enclosing function frames, innermost first; the top-level frame
        // is not a closure scope.
        for index in (1..current).rev() {
            if self.frames[index].lookup_symbol(name).is_some() {
                let slot = self.frames[current].add_closed_slot(name);
                let slot = slot
                    .ok_or_else(|| self.error(pos, "too many closure slots in program"))?;
                return Ok((slot, ScopeClass::Closed));
            }
        }

        if current > 0 {
            if let Some(slot) = self.frames[0].lookup_symbol(name) {
                return Ok((slot, ScopeClass::Global));
            }
        }

        Err(self.error(pos, format!("undefined symbol '{}'", name)))
    }

    /// Resolve an assignment target. Unknown names are implicitly declared
    /// on first assignment, at the top level only.
    fn register_variable(&mut self, name: &str, pos: &Position) -> Result<(u16, ScopeClass)> {
        match self.dereference_variable(name, pos) {
            Ok(resolved) => Ok(resolved),
            Err(_) if self.frames.len() == 1 => {
                let slot = self.frames[0]
                    .add_symbol(name)
                    .ok_or_else(|| self.error(pos, "too many locals in program"))?;
                Ok((slot, ScopeClass::Local))
            }
            Err(err) => Err(err),
        }
    }

    /// Declare a fresh local in the current frame; duplicates are an error.
    /// Used for formal parameters.
    fn register_unique_variable_local(&mut self, name: &str, pos: &Position) -> Result<u16> {
        if self.frame().lookup_symbol(name).is_some() {
            return Err(self.error(pos, format!("duplicate symbol '{}' in scope", name)));
        }

        let slot = self.frame().add_symbol(name);
        slot.ok_or_else(|| self.error(pos, "too many locals in program"))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn frame(&mut self) -> &mut Program {
        self.frames.last_mut().unwrap()
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.frame().emit(instruction)
    }

    fn next_index(&self) -> usize {
        self.frames.last().unwrap().next_index()
    }

    fn constant(&mut self, pos: &Position, key: &str, value: Value) -> Result<u16> {
        let index = self.frame().register_constant(key, value);
        index.ok_or_else(|| self.error(pos, "too many constants in program"))
    }

    fn jump_target(&self, index: usize, pos: &Position) -> Result<i16> {
        i16::try_from(index).map_err(|_| self.error(pos, "jump target out of range"))
    }

    fn error(&self, pos: &Position, message: impl Into<String>) -> CompileError {
        let line_text = self
            .sources
            .get(&pos.origin)
            .map(|source| report::line_at(source, pos.line_offset))
            .unwrap_or_default();
        CompileError {
            message: message.into(),
            pos: pos.clone(),
            line_text,
        }
    }
}

fn load_op(scope: ScopeClass) -> Op {
    match scope {
        ScopeClass::Local => Op::LoadL,
        ScopeClass::Closed => Op::LoadC,
        ScopeClass::Global => Op::LoadG,
    }
}

fn store_op(scope: ScopeClass) -> Op {
    match scope {
        ScopeClass::Local => Op::StorL,
        ScopeClass::Closed => Op::StorC,
        ScopeClass::Global => Op::StorG,
    }
}
