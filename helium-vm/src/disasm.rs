// helium-vm - Bytecode model and compiler for the Helium scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode listings.
//!
//! Renders a compiled program one instruction per line, resolving operands
//! back to constants and symbol names where the tables allow it, then lists
//! nested function programs from the constant pool.

use crate::opcode::{Instruction, Op, OperandKind};
use crate::program::Program;
use crate::value::Value;

/// Render a program and every nested function program it holds.
pub fn disassemble_program(program: &Program) -> String {
    let mut out = String::new();
    write_unit(&mut out, program, "main");
    out
}

fn write_unit(out: &mut String, program: &Program, label: &str) {
    out.push_str(&format!("{} (argc {}):\n", label, program.argc));

    for (index, instruction) in program.code.iter().enumerate() {
        out.push_str(&disassemble(program, index, *instruction));
        out.push('\n');
    }

    for (slot, value) in program.constants.iter().enumerate() {
        if let Value::Program(child) = value {
            if child.native.is_none() {
                out.push('\n');
                write_unit(out, child, &format!("{}.k{}", label, slot));
            }
        }
    }
}

/// Decode one instruction into a listing line.
pub fn disassemble(program: &Program, index: usize, instruction: Instruction) -> String {
    let op = instruction.op();
    let mut line = format!("{:04} {}", index, op.mnemonic());

    match op.operand_kind() {
        OperandKind::Stack => {}
        OperandKind::Unsigned => line.push_str(&format!(" {}", instruction.ux())),
        OperandKind::Signed => line.push_str(&format!(" {}", instruction.sx())),
    }

    match op {
        Op::PushK => {
            if let Some(value) = program.constants.get(instruction.ux() as usize) {
                line.push_str(&format!(" ; {}", value));
            }
        }
        Op::LoadL | Op::StorL => {
            if let Some(name) = program.symbol_name(instruction.ux()) {
                line.push_str(&format!(" ; {}", name));
            }
        }
        Op::LoadC | Op::StorC => {
            if let Some(name) = program.closed_name(instruction.ux()) {
                line.push_str(&format!(" ; {}", name));
            }
        }
        _ => {}
    }

    line
}
